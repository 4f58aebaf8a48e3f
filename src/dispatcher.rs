//! The command loop: one transaction per iteration, silence on any error.

use crate::boot::BoardInfo;
use crate::flash::FlashInterface;
use crate::protocol::{self, Command, EOC, INSYNC, OK};
use crate::staging::{AddressRegister, StageError, TransferBuffer};
use crate::transport::ByteTransport;

/// Why a transaction was dropped without an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformed {
    UnknownCommand(u8),
    MissingEoc { command: Command, got: u8 },
    /// PROG_MULTI count above the transfer buffer capacity. The payload the
    /// host sent after the count is still in flight and will be read as
    /// command bytes.
    Oversized { count: usize },
}

/// Outcome of one pass through the command loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    Completed(Command),
    Dropped(Malformed),
    /// REBOOT was received. The device resets instead of acknowledging.
    ResetRequested,
}

enum Abort<E> {
    Drop(Malformed),
    Link(E),
}

pub struct Bootloader<T, F, const N: usize = { protocol::PROG_MULTI_MAX }> {
    transport: T,
    flash: F,
    board: BoardInfo,
    address: AddressRegister,
    buffer: TransferBuffer<N>,
}

impl<T, F, const N: usize> Bootloader<T, F, N>
where
    T: ByteTransport,
    F: FlashInterface,
{
    /// Fresh bootloader state: cursor at zero, empty buffer.
    pub fn new(transport: T, flash: F, board: BoardInfo) -> Self {
        Self {
            transport,
            flash,
            board,
            address: AddressRegister::new(),
            buffer: TransferBuffer::new(),
        }
    }

    pub fn address(&self) -> u16 {
        self.address.get()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Serve transactions until the host asks for a reboot.
    ///
    /// Only returns early if the transport itself fails.
    pub fn run(&mut self) -> Result<(), T::Error> {
        loop {
            if self.step()? == Transaction::ResetRequested {
                tracing::info!("reboot requested");
                return Ok(());
            }
        }
    }

    /// Block for one command byte and carry out that transaction.
    pub fn step(&mut self) -> Result<Transaction, T::Error> {
        match self.transact() {
            Ok(t) => {
                if let Transaction::Completed(command) = t {
                    tracing::trace!(%command, address = self.address.get(), "ok");
                }
                Ok(t)
            }
            Err(Abort::Drop(reason)) => {
                tracing::debug!(?reason, "transaction dropped");
                Ok(Transaction::Dropped(reason))
            }
            Err(Abort::Link(e)) => Err(e),
        }
    }

    fn transact(&mut self) -> Result<Transaction, Abort<T::Error>> {
        let c = self.recv()?;
        let command =
            Command::from_byte(c).ok_or(Abort::Drop(Malformed::UnknownCommand(c)))?;

        if command.eoc_only() {
            self.require_eoc(command)?;
        }

        match command {
            Command::GetSync => {}

            Command::GetDevice => {
                self.send(self.board.board_id)?;
                self.send(self.board.board_frequency)?;
            }

            Command::ChipErase => self.flash.erase_app(),

            Command::ParamErase => self.flash.erase_scratch(),

            Command::LoadAddress => {
                let lo = self.recv()?;
                let hi = self.recv()?;
                // The cursor moves even if the terminator turns out to be wrong.
                self.address.set(u16::from_le_bytes([lo, hi]));
                self.require_eoc(command)?;
            }

            Command::ProgFlash => {
                let b = self.recv()?;
                self.require_eoc(command)?;
                let addr = self.address.post_increment();
                self.flash.write_byte(addr, b);
            }

            Command::ReadFlash => {
                let addr = self.address.post_increment();
                let b = self.flash.read_byte(addr);
                self.send(b)?;
            }

            Command::ProgMulti => {
                let count = self.recv()? as usize;
                let transport = &mut self.transport;
                self.buffer
                    .fill(count, || transport.recv())
                    .map_err(|e| match e {
                        StageError::Oversized { count } => {
                            Abort::Drop(Malformed::Oversized { count })
                        }
                        StageError::Source(e) => Abort::Link(e),
                    })?;
                self.require_eoc(command)?;
                for &b in self.buffer.as_slice() {
                    let addr = self.address.post_increment();
                    self.flash.write_byte(addr, b);
                }
            }

            Command::ReadMulti => {
                let count = self.recv()?;
                self.require_eoc(command)?;
                for _ in 0..count {
                    let addr = self.address.post_increment();
                    let b = self.flash.read_byte(addr);
                    self.send(b)?;
                }
            }

            Command::Reboot => return Ok(Transaction::ResetRequested),
        }

        self.send(INSYNC)?;
        self.send(OK)?;
        Ok(Transaction::Completed(command))
    }

    fn recv(&mut self) -> Result<u8, Abort<T::Error>> {
        self.transport.recv().map_err(Abort::Link)
    }

    fn send(&mut self, b: u8) -> Result<(), Abort<T::Error>> {
        self.transport.send(b).map_err(Abort::Link)
    }

    fn require_eoc(&mut self, command: Command) -> Result<(), Abort<T::Error>> {
        let got = self.recv()?;
        if got != EOC {
            return Err(Abort::Drop(Malformed::MissingEoc { command, got }));
        }
        Ok(())
    }
}
