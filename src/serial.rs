use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use thiserror::Error;

use crate::transport::ByteTransport;

pub const DEFAULT_BAUD: u32 = 115_200;

#[derive(Error, Debug)]
pub enum SerialError {
    #[error("serial port '{port}': {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
}

/// Open a port 8N1 without flow control, which is all the bootloader's UART
/// speaks.
pub fn open_port(
    port_name: &str,
    baud: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, SerialError> {
    let port = serialport::new(port_name, baud)
        .timeout(timeout)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .open()
        .map_err(|e| SerialError::Open {
            port: port_name.to_string(),
            source: e,
        })?;

    tracing::debug!(port = port_name, baud, "serial port open");
    Ok(port)
}

/// Device side of a serial link: receives block until a byte arrives,
/// however long that takes.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    pub fn open(port_name: &str, baud: u32) -> Result<Self, SerialError> {
        let port = open_port(port_name, baud, Duration::from_millis(500))?;
        Ok(Self::new(port))
    }
}

impl ByteTransport for SerialTransport {
    type Error = io::Error;

    fn recv(&mut self) -> Result<u8, io::Error> {
        let mut b = [0u8; 1];
        loop {
            match self.port.read(&mut b) {
                Ok(1) => return Ok(b[0]),
                Ok(_) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn send(&mut self, b: u8) -> Result<(), io::Error> {
        self.port.write_all(&[b])?;
        self.port.flush()
    }
}
