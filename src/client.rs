//! Host side of the protocol.
//!
//! The device never reports an error; a dropped transaction simply goes
//! unanswered. The client turns that silence into timeouts, recovers by
//! sending SYNC until the device answers, and retries idempotent work.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use crate::protocol::{self, Command, EOC, INSYNC, OK, PROG_MULTI_MAX, READ_MULTI_MAX};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long to wait for a normal reply.
    pub timeout: Duration,
    /// How long to wait for the acknowledgment of an erase.
    pub erase_timeout: Duration,
    /// SYNC probes sent before giving up on a device.
    pub sync_attempts: u32,
    /// Retries per transaction after a timeout or a garbled reply.
    pub retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            erase_timeout: Duration::from_secs(10),
            sync_attempts: 10,
            retries: 3,
        }
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("timed out waiting for reply to {command}")]
    Timeout { command: Command },

    #[error("unexpected reply to {command}: expected 0x{expected:02X}, got 0x{got:02X}")]
    UnexpectedResponse {
        command: Command,
        expected: u8,
        got: u8,
    },

    #[error("device did not answer SYNC after {attempts} attempts")]
    SyncFailed { attempts: u32 },

    #[error("{len} bytes exceed the {max} byte limit of one transaction")]
    TooLong { len: usize, max: usize },

    #[error("verify failed at 0x{addr:04X}: expected 0x{expected:02X}, read 0x{got:02X}")]
    VerifyFailed { addr: u16, expected: u8, got: u8 },
}

impl ClientError {
    /// Whether a resync and another attempt can fix this.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Timeout { .. } | ClientError::UnexpectedResponse { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub board_id: u8,
    pub board_frequency: u8,
}

impl DeviceInfo {
    pub fn board_name(&self) -> &'static str {
        protocol::board_name(self.board_id)
    }

    pub fn frequency_name(&self) -> &'static str {
        protocol::frequency_name(self.board_frequency)
    }
}

/// Talks to a bootloader over any byte stream whose reads time out with
/// `io::ErrorKind::TimedOut`, as serial ports do.
pub struct Uploader<P> {
    port: P,
    config: ClientConfig,
}

impl<P: Read + Write> Uploader<P> {
    pub fn new(port: P, config: ClientConfig) -> Self {
        Self { port, config }
    }

    /// Throw away anything pending, then probe with SYNC until answered.
    pub fn resync(&mut self) -> Result<(), ClientError> {
        let attempts = self.config.sync_attempts.max(1);
        for attempt in 1..=attempts {
            self.discard_input()?;
            match self.sync() {
                Ok(()) => {
                    tracing::debug!(attempt, "in sync");
                    return Ok(());
                }
                Err(e) if e.is_transient() => {
                    tracing::debug!(attempt, "sync probe failed: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        Err(ClientError::SyncFailed { attempts })
    }

    pub fn sync(&mut self) -> Result<(), ClientError> {
        self.send(&[Command::GetSync.byte(), EOC])?;
        self.expect_ack(Command::GetSync, self.deadline())
    }

    pub fn identify(&mut self) -> Result<DeviceInfo, ClientError> {
        self.with_retry(Command::GetDevice, |c| {
            c.send(&[Command::GetDevice.byte(), EOC])?;
            let deadline = c.deadline();
            let board_id = c.recv(Command::GetDevice, deadline)?;
            let board_frequency = c.recv(Command::GetDevice, deadline)?;
            c.expect_ack(Command::GetDevice, deadline)?;
            Ok(DeviceInfo {
                board_id,
                board_frequency,
            })
        })
    }

    pub fn erase_app(&mut self) -> Result<(), ClientError> {
        self.with_retry(Command::ChipErase, |c| {
            c.send(&[Command::ChipErase.byte(), EOC])?;
            let deadline = Instant::now() + c.config.erase_timeout;
            c.expect_ack(Command::ChipErase, deadline)
        })
    }

    pub fn erase_params(&mut self) -> Result<(), ClientError> {
        self.with_retry(Command::ParamErase, |c| {
            c.send(&[Command::ParamErase.byte(), EOC])?;
            let deadline = Instant::now() + c.config.erase_timeout;
            c.expect_ack(Command::ParamErase, deadline)
        })
    }

    pub fn load_address(&mut self, addr: u16) -> Result<(), ClientError> {
        let [lo, hi] = addr.to_le_bytes();
        self.send(&[Command::LoadAddress.byte(), lo, hi, EOC])?;
        self.expect_ack(Command::LoadAddress, self.deadline())
    }

    pub fn prog_byte(&mut self, b: u8) -> Result<(), ClientError> {
        self.send(&[Command::ProgFlash.byte(), b, EOC])?;
        self.expect_ack(Command::ProgFlash, self.deadline())
    }

    pub fn read_byte(&mut self) -> Result<u8, ClientError> {
        self.send(&[Command::ReadFlash.byte(), EOC])?;
        let deadline = self.deadline();
        let b = self.recv(Command::ReadFlash, deadline)?;
        self.expect_ack(Command::ReadFlash, deadline)?;
        Ok(b)
    }

    /// Program up to [`PROG_MULTI_MAX`] bytes at the device cursor.
    ///
    /// Longer runs are refused here: the device would drop the count and
    /// then parse the payload as commands.
    pub fn prog_multi(&mut self, data: &[u8]) -> Result<(), ClientError> {
        if data.len() > PROG_MULTI_MAX {
            return Err(ClientError::TooLong {
                len: data.len(),
                max: PROG_MULTI_MAX,
            });
        }
        let mut frame = Vec::with_capacity(data.len() + 3);
        frame.push(Command::ProgMulti.byte());
        frame.push(data.len() as u8);
        frame.extend_from_slice(data);
        frame.push(EOC);
        self.send(&frame)?;
        self.expect_ack(Command::ProgMulti, self.deadline())
    }

    pub fn read_multi(&mut self, len: usize) -> Result<Vec<u8>, ClientError> {
        if len > READ_MULTI_MAX {
            return Err(ClientError::TooLong {
                len,
                max: READ_MULTI_MAX,
            });
        }
        self.send(&[Command::ReadMulti.byte(), len as u8, EOC])?;
        let deadline = self.deadline();
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.recv(Command::ReadMulti, deadline)?);
        }
        self.expect_ack(Command::ReadMulti, deadline)?;
        Ok(out)
    }

    /// Ask the device to reset. It does not answer.
    pub fn reboot(&mut self) -> Result<(), ClientError> {
        self.send(&[Command::Reboot.byte()])?;
        Ok(())
    }

    /// Position the cursor and program one burst, retrying both together so
    /// a lost acknowledgment never leaves the cursor in doubt.
    pub fn write_chunk(&mut self, addr: u16, data: &[u8]) -> Result<(), ClientError> {
        self.with_retry(Command::ProgMulti, |c| {
            c.load_address(addr)?;
            c.prog_multi(data)
        })
    }

    pub fn read_chunk(&mut self, addr: u16, len: usize) -> Result<Vec<u8>, ClientError> {
        self.with_retry(Command::ReadMulti, |c| {
            c.load_address(addr)?;
            c.read_multi(len)
        })
    }

    /// Program `data` from `addr` in transfer-buffer sized bursts.
    pub fn program<F>(&mut self, addr: u16, data: &[u8], mut on_chunk: F) -> Result<(), ClientError>
    where
        F: FnMut(u16, usize),
    {
        for (i, chunk) in data.chunks(PROG_MULTI_MAX).enumerate() {
            let at = addr.wrapping_add((i * PROG_MULTI_MAX) as u16);
            on_chunk(at, chunk.len());
            self.write_chunk(at, chunk)?;
        }
        Ok(())
    }

    /// Read `data.len()` bytes back from `addr` and compare.
    pub fn verify(&mut self, addr: u16, data: &[u8]) -> Result<(), ClientError> {
        for (i, expected) in data.chunks(READ_MULTI_MAX).enumerate() {
            let at = addr.wrapping_add((i * READ_MULTI_MAX) as u16);
            let got = self.read_chunk(at, expected.len())?;
            if let Some(off) = expected.iter().zip(&got).position(|(e, g)| e != g) {
                return Err(ClientError::VerifyFailed {
                    addr: at.wrapping_add(off as u16),
                    expected: expected[off],
                    got: got[off],
                });
            }
        }
        Ok(())
    }

    fn with_retry<R, F>(&mut self, command: Command, mut op: F) -> Result<R, ClientError>
    where
        F: FnMut(&mut Self) -> Result<R, ClientError>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            match op(self) {
                Ok(r) => return Ok(r),
                Err(e) if e.is_transient() && attempt <= self.config.retries => {
                    tracing::warn!(%command, attempt, "retrying after: {e}");
                    self.resync()?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.config.timeout
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn recv(&mut self, command: Command, deadline: Instant) -> Result<u8, ClientError> {
        let mut b = [0u8; 1];
        loop {
            match self.port.read(&mut b) {
                Ok(1) => return Ok(b[0]),
                Ok(_) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) =>
                {
                    if Instant::now() >= deadline {
                        return Err(ClientError::Timeout { command });
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn expect_ack(&mut self, command: Command, deadline: Instant) -> Result<(), ClientError> {
        for expected in [INSYNC, OK] {
            let got = self.recv(command, deadline)?;
            if got != expected {
                return Err(ClientError::UnexpectedResponse {
                    command,
                    expected,
                    got,
                });
            }
        }
        Ok(())
    }

    /// Read until the line goes quiet for one port timeout.
    fn discard_input(&mut self) -> Result<(), ClientError> {
        let mut buf = [0u8; 64];
        let mut dropped = 0usize;
        loop {
            match self.port.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => dropped += n,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                    ) =>
                {
                    break
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "discarded stale input");
        }
        Ok(())
    }
}
