//! In-process link between a host client and a dispatcher thread.

use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::boot::BoardInfo;
use crate::dispatcher::Bootloader;
use crate::flash::MemoryFlash;
use crate::transport::ByteTransport;

/// Host side: reads time out like a serial port.
pub struct HostEnd {
    rx: Receiver<u8>,
    tx: Sender<u8>,
    timeout: Duration,
}

impl Read for HostEnd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.rx.recv_timeout(self.timeout) {
            Ok(b) => {
                buf[0] = b;
                let mut n = 1;
                while n < buf.len() {
                    match self.rx.try_recv() {
                        Ok(b) => {
                            buf[n] = b;
                            n += 1;
                        }
                        Err(_) => break,
                    }
                }
                Ok(n)
            }
            Err(RecvTimeoutError::Timeout) => Err(io::ErrorKind::TimedOut.into()),
            Err(RecvTimeoutError::Disconnected) => Ok(0),
        }
    }
}

impl Write for HostEnd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for b in buf {
            self.tx
                .send(*b)
                .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

/// Device side: blocks forever, like the UART.
pub struct DeviceEnd {
    rx: Receiver<u8>,
    tx: Sender<u8>,
    sent: usize,
    drop_sends: Vec<usize>,
}

impl ByteTransport for DeviceEnd {
    type Error = Disconnected;

    fn recv(&mut self) -> Result<u8, Disconnected> {
        self.rx.recv().map_err(|_| Disconnected)
    }

    fn send(&mut self, b: u8) -> Result<(), Disconnected> {
        let n = self.sent;
        self.sent += 1;
        if self.drop_sends.contains(&n) {
            return Ok(());
        }
        self.tx.send(b).map_err(|_| Disconnected)
    }
}

pub fn pair(host_timeout: Duration) -> (HostEnd, DeviceEnd) {
    let (to_device, from_host) = mpsc::channel();
    let (to_host, from_device) = mpsc::channel();
    (
        HostEnd {
            rx: from_device,
            tx: to_device,
            timeout: host_timeout,
        },
        DeviceEnd {
            rx: from_host,
            tx: to_host,
            sent: 0,
            drop_sends: Vec::new(),
        },
    )
}

#[derive(Debug, Clone, Default)]
pub struct DeviceOptions {
    /// Indices of device output bytes to lose on the wire.
    pub drop_sends: Vec<usize>,
}

pub struct Device {
    handle: JoinHandle<MemoryFlash>,
}

impl Device {
    /// Wait for the host end to hang up and return the final flash.
    pub fn join(self) -> MemoryFlash {
        self.handle.join().expect("device thread panicked")
    }
}

/// Run a bootloader on its own thread. A REBOOT restarts the command loop
/// with fresh state; the thread ends when the host end is dropped.
pub fn spawn_device(
    flash: MemoryFlash,
    board: BoardInfo,
    opts: DeviceOptions,
    host_timeout: Duration,
) -> (HostEnd, Device) {
    let (host, mut device_end) = pair(host_timeout);
    device_end.drop_sends = opts.drop_sends;

    let handle = thread::spawn(move || {
        let mut flash = flash;
        loop {
            let mut bootloader: Bootloader<_, _> =
                Bootloader::new(&mut device_end, &mut flash, board);
            if bootloader.run().is_err() {
                break;
            }
        }
        flash
    });

    (host, Device { handle })
}
