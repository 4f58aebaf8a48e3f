/// Blocking one-byte link between the bootloader and its host.
///
/// On hardware both calls spin on the UART and cannot fail. Hosted
/// implementations report a closed or broken link through `Error`, which
/// ends the command loop.
pub trait ByteTransport {
    type Error;

    fn recv(&mut self) -> Result<u8, Self::Error>;
    fn send(&mut self, b: u8) -> Result<(), Self::Error>;
}

impl<T: ByteTransport + ?Sized> ByteTransport for &mut T {
    type Error = T::Error;

    fn recv(&mut self) -> Result<u8, Self::Error> {
        (**self).recv()
    }

    fn send(&mut self, b: u8) -> Result<(), Self::Error> {
        (**self).send(b)
    }
}

#[cfg(test)]
pub(crate) mod script {
    use std::collections::VecDeque;

    use super::ByteTransport;

    /// Replays a fixed input script and records everything sent.
    #[derive(Debug, Default)]
    pub struct ScriptedTransport {
        pub input: VecDeque<u8>,
        pub output: Vec<u8>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Exhausted;

    impl ScriptedTransport {
        pub fn new(input: &[u8]) -> Self {
            Self {
                input: input.iter().copied().collect(),
                output: Vec::new(),
            }
        }

        pub fn feed(&mut self, bytes: &[u8]) {
            self.input.extend(bytes.iter().copied());
        }

        pub fn take_output(&mut self) -> Vec<u8> {
            std::mem::take(&mut self.output)
        }
    }

    impl ByteTransport for ScriptedTransport {
        type Error = Exhausted;

        fn recv(&mut self) -> Result<u8, Exhausted> {
            self.input.pop_front().ok_or(Exhausted)
        }

        fn send(&mut self, b: u8) -> Result<(), Exhausted> {
            self.output.push(b);
            Ok(())
        }
    }
}
