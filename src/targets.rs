use serde::Serialize;
use thiserror::Error;

/// USB vendor ids of the UART bridges these radios ship with.
pub const FTDI_VID: u16 = 0x0403;
pub const SILABS_VID: u16 = 0x10C4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub port_name: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl Target {
    pub fn id(&self) -> String {
        format!("serial:{}", self.port_name)
    }

    /// Whether this port sits behind a known radio UART bridge.
    pub fn is_radio_bridge(&self) -> bool {
        matches!(self.vid, Some(FTDI_VID) | Some(SILABS_VID))
    }
}

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("serial discovery failed: {0}")]
    Serial(#[from] serialport::Error),
}

/// Every serial port the OS reports, radio bridges first.
pub fn discover_targets() -> Result<Vec<Target>, DiscoverError> {
    let mut out: Vec<Target> = Vec::new();

    for p in serialport::available_ports()? {
        let serialport::SerialPortInfo {
            port_name,
            port_type,
        } = p;

        let t = match port_type {
            serialport::SerialPortType::UsbPort(usb) => Target {
                port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                serial_number: usb.serial_number,
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            _ => Target {
                port_name,
                vid: None,
                pid: None,
                serial_number: None,
                manufacturer: None,
                product: None,
            },
        };
        out.push(t);
    }

    sort_targets(&mut out);
    tracing::debug!(count = out.len(), "serial ports discovered");
    Ok(out)
}

fn sort_targets(targets: &mut [Target]) {
    targets.sort_by(|a, b| {
        b.is_radio_bridge()
            .cmp(&a.is_radio_bridge())
            .then_with(|| a.port_name.cmp(&b.port_name))
    });
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn target(port: &str, vid: Option<u16>) -> Target {
        Target {
            port_name: port.to_string(),
            vid,
            pid: vid.map(|_| 0x6001),
            serial_number: None,
            manufacturer: None,
            product: None,
        }
    }

    #[test]
    fn test_target_id_format() {
        assert_eq!(target("COM6", None).id(), "serial:COM6");
        assert_eq!(
            target("/dev/ttyUSB0", Some(FTDI_VID)).id(),
            "serial:/dev/ttyUSB0"
        );
    }

    #[test]
    fn test_radio_bridges_sort_first() {
        let mut ts = vec![
            target("/dev/ttyS0", None),
            target("/dev/ttyUSB1", Some(SILABS_VID)),
            target("/dev/ttyACM0", Some(0x2341)),
            target("/dev/ttyUSB0", Some(FTDI_VID)),
        ];
        sort_targets(&mut ts);
        let names: Vec<&str> = ts.iter().map(|t| t.port_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["/dev/ttyUSB0", "/dev/ttyUSB1", "/dev/ttyACM0", "/dev/ttyS0"]
        );
    }
}
