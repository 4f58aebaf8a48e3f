use heapless::Vec;

/// The flash cursor. Every byte read or written through the protocol
/// advances it by one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AddressRegister(u16);

impl AddressRegister {
    pub const fn new() -> Self {
        Self(0)
    }

    pub fn get(self) -> u16 {
        self.0
    }

    pub fn set(&mut self, addr: u16) {
        self.0 = addr;
    }

    /// Return the current address and move past it.
    pub fn post_increment(&mut self) -> u16 {
        let addr = self.0;
        self.0 = self.0.wrapping_add(1);
        addr
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageError<E> {
    /// The declared count does not fit; nothing was pulled from the source.
    Oversized { count: usize },
    Source(E),
}

/// Fixed-capacity staging area for PROG_MULTI bursts.
#[derive(Debug, Default)]
pub struct TransferBuffer<const N: usize> {
    bytes: Vec<u8, N>,
}

impl<const N: usize> TransferBuffer<N> {
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Stage exactly `count` bytes pulled from `next`.
    ///
    /// The capacity check happens before `next` is called the first time.
    pub fn fill<E, F>(&mut self, count: usize, mut next: F) -> Result<&[u8], StageError<E>>
    where
        F: FnMut() -> Result<u8, E>,
    {
        if count > N {
            return Err(StageError::Oversized { count });
        }

        self.bytes.clear();
        for _ in 0..count {
            let b = next().map_err(StageError::Source)?;
            if self.bytes.push(b).is_err() {
                return Err(StageError::Oversized { count });
            }
        }
        Ok(self.bytes.as_slice())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_register_wraps() {
        let mut a = AddressRegister::new();
        a.set(0xFFFF);
        assert_eq!(a.post_increment(), 0xFFFF);
        assert_eq!(a.get(), 0x0000);

        a.set(0x1234);
        assert_eq!(a.post_increment(), 0x1234);
        assert_eq!(a.get(), 0x1235);
    }

    #[test]
    fn test_fill_rejects_oversize_before_reading() {
        let mut buf: TransferBuffer<4> = TransferBuffer::new();
        let mut pulled = 0;
        let r = buf.fill(5, || -> Result<u8, ()> {
            pulled += 1;
            Ok(0)
        });
        assert_eq!(r, Err(StageError::Oversized { count: 5 }));
        assert_eq!(pulled, 0);
    }

    #[test]
    fn test_fill_at_capacity() {
        let mut buf: TransferBuffer<4> = TransferBuffer::new();
        let mut src = [1u8, 2, 3, 4].into_iter();
        let staged = buf
            .fill(4, || src.next().ok_or("empty"))
            .unwrap()
            .to_vec();
        assert_eq!(staged, vec![1, 2, 3, 4]);

        // A shorter burst replaces, not appends.
        let staged = buf.fill(1, || Ok::<u8, ()>(9)).unwrap().to_vec();
        assert_eq!(staged, vec![9]);
    }

    #[test]
    fn test_fill_propagates_source_error() {
        let mut buf: TransferBuffer<4> = TransferBuffer::new();
        let r = buf.fill(2, || Err::<u8, &str>("closed"));
        assert_eq!(r, Err(StageError::Source("closed")));
    }
}
