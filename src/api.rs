use std::io::{Read, Write};
use std::path::Path;

use thiserror::Error;

use crate::{
    client::{ClientConfig, ClientError, DeviceInfo, Uploader},
    flash::{FlashLayout, FLASH_SIZE},
    hex,
    operation::OperationEvent,
    protocol::{self, PROG_MULTI_MAX, READ_MULTI_MAX},
    selector, serial, targets,
    targets::Target,
};

#[derive(Debug, Clone)]
pub enum PortSelection {
    /// Pick the only radio bridge (or the only port) on the system.
    Auto,
    /// Open this port by name without consulting discovery.
    Port(String),
    /// Resolve a selector (`index:0`, `serial:COM6`, ...) against discovery.
    Device(String),
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub baud: u32,
    pub client: ClientConfig,
    pub layout: FlashLayout,

    /// Refuse to erase a device reporting another board id.
    pub expected_board: Option<u8>,

    /// Skip the read-back after programming.
    pub no_verify: bool,
    /// Leave the device in the bootloader after programming.
    pub no_reboot: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            baud: serial::DEFAULT_BAUD,
            client: ClientConfig::default(),
            layout: FlashLayout::default(),
            expected_board: None,
            no_verify: false,
            no_reboot: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UploadErrorKind {
    NoDevice,
    AmbiguousTarget,
    InvalidHex,
    NoSync,
    WriteFailed,
    VerifyFailed,
    BoardMismatch,
    Unexpected,
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("no serial port found")]
    NoTargets,

    #[error("ambiguous target: {message}")]
    AmbiguousTarget { message: String },

    #[error("target discovery failed: {source}")]
    DiscoveryFailed {
        #[source]
        source: targets::DiscoverError,
    },

    #[error("invalid HEX: {source}")]
    InvalidHex {
        #[source]
        source: hex::HexError,
    },

    #[error("{source}")]
    OpenPort {
        #[source]
        source: serial::SerialError,
    },

    #[error("bootloader not responding: {source}")]
    NoSync {
        #[source]
        source: ClientError,
    },

    #[error("board mismatch: expected 0x{expected:02X}, device reports 0x{got:02X}")]
    BoardMismatch { expected: u8, got: u8 },

    #[error("erase failed: {source}")]
    EraseFailed {
        #[source]
        source: ClientError,
    },

    #[error("write failed at 0x{addr:04X}: {source}")]
    WriteFailed {
        addr: u16,
        #[source]
        source: ClientError,
    },

    #[error("verify failed: {source}")]
    VerifyFailed {
        #[source]
        source: ClientError,
    },

    #[error("read of {len} bytes at 0x{addr:04X} runs past the end of flash")]
    ReadOutOfRange { addr: u16, len: usize },

    #[error("{command} failed: {source}")]
    Command {
        command: protocol::Command,
        #[source]
        source: ClientError,
    },
}

impl UploadError {
    pub fn kind(&self) -> UploadErrorKind {
        match self {
            UploadError::NoTargets => UploadErrorKind::NoDevice,
            UploadError::AmbiguousTarget { .. } => UploadErrorKind::AmbiguousTarget,
            UploadError::DiscoveryFailed { .. } => UploadErrorKind::Unexpected,
            UploadError::InvalidHex { .. } => UploadErrorKind::InvalidHex,
            UploadError::OpenPort { .. } => UploadErrorKind::NoDevice,
            UploadError::NoSync { .. } => UploadErrorKind::NoSync,
            UploadError::BoardMismatch { .. } => UploadErrorKind::BoardMismatch,
            UploadError::EraseFailed { .. } | UploadError::WriteFailed { .. } => {
                UploadErrorKind::WriteFailed
            }
            UploadError::VerifyFailed { .. } => UploadErrorKind::VerifyFailed,
            UploadError::ReadOutOfRange { .. } | UploadError::Command { .. } => {
                UploadErrorKind::Unexpected
            }
        }
    }
}

pub struct UploadPlan {
    pub firmware: hex::FirmwareImage,
    pub port: String,
    pub chunks: usize,
}

/// Load the firmware and pick the port, touching nothing on the device.
pub fn plan_upload<F>(
    hex_path: &Path,
    selection: &PortSelection,
    opts: &UploadOptions,
    mut on_event: F,
) -> Result<UploadPlan, UploadError>
where
    F: FnMut(OperationEvent),
{
    let fw = load_firmware(hex_path, opts, &mut on_event)?;
    let port = resolve_port(selection, &mut on_event)?;
    let chunks = count_chunks(&fw);
    Ok(UploadPlan {
        firmware: fw,
        port,
        chunks,
    })
}

/// Program an Intel HEX image into the device behind `selection`.
pub fn flash_image<F>(
    hex_path: &Path,
    selection: &PortSelection,
    opts: &UploadOptions,
    mut on_event: F,
) -> Result<(), UploadError>
where
    F: FnMut(OperationEvent),
{
    let plan = plan_upload(hex_path, selection, opts, &mut on_event)?;
    let mut uploader = open_uploader(&plan.port, opts, &mut on_event)?;
    flash_with(&mut uploader, &plan.firmware, opts, &mut on_event)
}

/// The upload pipeline over an already open link.
#[tracing::instrument(skip_all, fields(segments = fw.segments.len()))]
pub fn flash_with<P, F>(
    uploader: &mut Uploader<P>,
    fw: &hex::FirmwareImage,
    opts: &UploadOptions,
    mut on_event: F,
) -> Result<(), UploadError>
where
    P: Read + Write,
    F: FnMut(OperationEvent),
{
    connect(uploader, &mut on_event)?;

    let info = uploader.identify().map_err(|e| UploadError::Command {
        command: protocol::Command::GetDevice,
        source: e,
    })?;
    on_event(OperationEvent::DeviceIdentified { info });

    if let Some(expected) = opts.expected_board {
        if info.board_id != expected {
            return Err(UploadError::BoardMismatch {
                expected,
                got: info.board_id,
            });
        }
    }

    on_event(OperationEvent::Erase);
    uploader
        .erase_app()
        .map_err(|e| UploadError::EraseFailed { source: e })?;

    let total = count_chunks(fw);
    let mut index = 0usize;
    for seg in &fw.segments {
        let data = fw.segment_data(seg);
        let mut last_addr = seg.addr;
        uploader
            .program(seg.addr, data, |addr, len| {
                last_addr = addr;
                on_event(OperationEvent::Chunk {
                    index,
                    total,
                    addr,
                    len,
                });
                index += 1;
            })
            .map_err(|e| UploadError::WriteFailed {
                addr: last_addr,
                source: e,
            })?;
    }

    if !opts.no_verify {
        let total = fw.segments.len();
        for (i, seg) in fw.segments.iter().enumerate() {
            on_event(OperationEvent::Verify {
                index: i,
                total,
                addr: seg.addr,
                len: seg.len,
            });
            uploader
                .verify(seg.addr, fw.segment_data(seg))
                .map_err(|e| UploadError::VerifyFailed { source: e })?;
        }
    }

    if !opts.no_reboot {
        on_event(OperationEvent::Boot);
        reboot_with(uploader)?;
    }

    on_event(OperationEvent::Done);
    Ok(())
}

pub fn identify<F>(
    selection: &PortSelection,
    opts: &UploadOptions,
    mut on_event: F,
) -> Result<DeviceInfo, UploadError>
where
    F: FnMut(OperationEvent),
{
    let port = resolve_port(selection, &mut on_event)?;
    let mut uploader = open_uploader(&port, opts, &mut on_event)?;
    identify_with(&mut uploader, &mut on_event)
}

pub fn identify_with<P, F>(
    uploader: &mut Uploader<P>,
    mut on_event: F,
) -> Result<DeviceInfo, UploadError>
where
    P: Read + Write,
    F: FnMut(OperationEvent),
{
    connect(uploader, &mut on_event)?;
    let info = uploader.identify().map_err(|e| UploadError::Command {
        command: protocol::Command::GetDevice,
        source: e,
    })?;
    on_event(OperationEvent::DeviceIdentified { info });
    on_event(OperationEvent::Done);
    Ok(info)
}

/// Wipe the radio's stored parameters (the scratch pages).
pub fn erase_params<F>(
    selection: &PortSelection,
    opts: &UploadOptions,
    mut on_event: F,
) -> Result<(), UploadError>
where
    F: FnMut(OperationEvent),
{
    let port = resolve_port(selection, &mut on_event)?;
    let mut uploader = open_uploader(&port, opts, &mut on_event)?;
    erase_params_with(&mut uploader, &mut on_event)
}

pub fn erase_params_with<P, F>(uploader: &mut Uploader<P>, mut on_event: F) -> Result<(), UploadError>
where
    P: Read + Write,
    F: FnMut(OperationEvent),
{
    connect(uploader, &mut on_event)?;
    on_event(OperationEvent::ParamErase);
    uploader
        .erase_params()
        .map_err(|e| UploadError::EraseFailed { source: e })?;
    on_event(OperationEvent::Done);
    Ok(())
}

pub fn reboot<F>(
    selection: &PortSelection,
    opts: &UploadOptions,
    mut on_event: F,
) -> Result<(), UploadError>
where
    F: FnMut(OperationEvent),
{
    let port = resolve_port(selection, &mut on_event)?;
    let mut uploader = open_uploader(&port, opts, &mut on_event)?;
    connect(&mut uploader, &mut on_event)?;
    on_event(OperationEvent::Boot);
    reboot_with(&mut uploader)?;
    on_event(OperationEvent::Done);
    Ok(())
}

/// Read `len` bytes of flash starting at `addr`.
pub fn dump<F>(
    selection: &PortSelection,
    addr: u16,
    len: usize,
    opts: &UploadOptions,
    mut on_event: F,
) -> Result<Vec<u8>, UploadError>
where
    F: FnMut(OperationEvent),
{
    check_read_range(addr, len)?;
    let port = resolve_port(selection, &mut on_event)?;
    let mut uploader = open_uploader(&port, opts, &mut on_event)?;
    dump_with(&mut uploader, addr, len, &mut on_event)
}

pub fn dump_with<P, F>(
    uploader: &mut Uploader<P>,
    addr: u16,
    len: usize,
    mut on_event: F,
) -> Result<Vec<u8>, UploadError>
where
    P: Read + Write,
    F: FnMut(OperationEvent),
{
    check_read_range(addr, len)?;
    connect(uploader, &mut on_event)?;

    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let at = addr.wrapping_add(out.len() as u16);
        let n = (len - out.len()).min(READ_MULTI_MAX);
        on_event(OperationEvent::Read { addr: at, len: n });
        let chunk = uploader
            .read_chunk(at, n)
            .map_err(|e| UploadError::Command {
                command: protocol::Command::ReadMulti,
                source: e,
            })?;
        out.extend_from_slice(&chunk);
    }

    on_event(OperationEvent::Done);
    Ok(out)
}

fn check_read_range(addr: u16, len: usize) -> Result<(), UploadError> {
    if len > FLASH_SIZE - addr as usize {
        return Err(UploadError::ReadOutOfRange { addr, len });
    }
    Ok(())
}

fn load_firmware<F>(
    hex_path: &Path,
    opts: &UploadOptions,
    on_event: &mut F,
) -> Result<hex::FirmwareImage, UploadError>
where
    F: FnMut(OperationEvent),
{
    let fw = hex::FirmwareImage::load(hex_path, &opts.layout)
        .map_err(|e| UploadError::InvalidHex { source: e })?;

    let signed = fw.is_signed(&opts.layout);
    if !signed {
        tracing::warn!("image carries no signature; the device will stay in the bootloader");
    }
    on_event(OperationEvent::HexLoaded {
        bytes: fw.byte_count,
        segments: fw.segments.len(),
        signed,
    });
    Ok(fw)
}

fn count_chunks(fw: &hex::FirmwareImage) -> usize {
    fw.segments
        .iter()
        .map(|s| s.len.div_ceil(PROG_MULTI_MAX))
        .sum()
}

fn open_uploader<F>(
    port: &str,
    opts: &UploadOptions,
    on_event: &mut F,
) -> Result<Uploader<Box<dyn serialport::SerialPort>>, UploadError>
where
    F: FnMut(OperationEvent),
{
    // Short port timeout; the client enforces its own per-reply deadlines.
    let link = serial::open_port(port, opts.baud, std::time::Duration::from_millis(20))
        .map_err(|e| UploadError::OpenPort { source: e })?;
    on_event(OperationEvent::PortOpen {
        port: port.to_string(),
        baud: opts.baud,
    });
    Ok(Uploader::new(link, opts.client.clone()))
}

fn connect<P, F>(uploader: &mut Uploader<P>, on_event: &mut F) -> Result<(), UploadError>
where
    P: Read + Write,
    F: FnMut(OperationEvent),
{
    uploader
        .resync()
        .map_err(|e| UploadError::NoSync { source: e })?;
    on_event(OperationEvent::SyncOk);
    Ok(())
}

fn reboot_with<P: Read + Write>(uploader: &mut Uploader<P>) -> Result<(), UploadError> {
    uploader.reboot().map_err(|e| UploadError::Command {
        command: protocol::Command::Reboot,
        source: e,
    })
}

fn resolve_port<F>(selection: &PortSelection, on_event: &mut F) -> Result<String, UploadError>
where
    F: FnMut(OperationEvent),
{
    let device = match selection {
        PortSelection::Port(name) => {
            on_event(OperationEvent::TargetSelected {
                target_id: format!("serial:{name}"),
            });
            return Ok(name.clone());
        }
        PortSelection::Device(sel) => Some(sel.as_str()),
        PortSelection::Auto => None,
    };

    on_event(OperationEvent::DiscoverStart);
    let targets =
        targets::discover_targets().map_err(|e| UploadError::DiscoveryFailed { source: e })?;
    for (i, t) in targets.iter().cloned().enumerate() {
        on_event(OperationEvent::TargetDetected {
            index: i,
            target: t,
        });
    }
    on_event(OperationEvent::DiscoverDone {
        count: targets.len(),
    });

    let target = select_target(device, &targets)?;
    on_event(OperationEvent::TargetSelected {
        target_id: target.id(),
    });
    Ok(target.port_name.clone())
}

/// Resolve `device` against the discovered ports, or pick one when it is `None`.
pub(crate) fn select_target<'a>(
    device: Option<&str>,
    targets: &'a [Target],
) -> Result<&'a Target, UploadError> {
    if targets.is_empty() {
        return Err(UploadError::NoTargets);
    }

    match device {
        Some(sel) => {
            let parsed =
                selector::parse_selector(sel).map_err(|e| UploadError::AmbiguousTarget {
                    message: e.to_string(),
                })?;
            let idx = selector::resolve_one(&parsed, targets).map_err(|e| {
                UploadError::AmbiguousTarget {
                    message: e.to_string(),
                }
            })?;
            Ok(&targets[idx])
        }

        None => {
            // One radio bridge wins even when other serial ports exist.
            let bridges: Vec<&Target> = targets.iter().filter(|t| t.is_radio_bridge()).collect();
            if bridges.len() == 1 {
                Ok(bridges[0])
            } else if bridges.len() > 1 {
                Err(UploadError::AmbiguousTarget {
                    message: format!(
                        "multiple radio bridges detected ({}); use --device or --port",
                        bridges.len()
                    ),
                })
            } else if targets.len() == 1 {
                Ok(&targets[0])
            } else {
                Err(UploadError::AmbiguousTarget {
                    message: format!(
                        "multiple serial ports detected ({}); use --device or --port",
                        targets.len()
                    ),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::boot::BoardInfo;
    use crate::flash::{FlashInterface, MemoryFlash, APP_SIGNATURE};
    use crate::hex::tests::ihex_record;
    use crate::hex::FirmwareImage;
    use crate::loopback::{self, DeviceOptions};
    use crate::protocol::{BL_VERSION, BOARD_HM_TRP, BOARD_RF50, FREQ_915};
    use crate::targets::tests::target;
    use crate::targets::{FTDI_VID, SILABS_VID};

    fn board() -> BoardInfo {
        BoardInfo {
            board_id: BOARD_HM_TRP,
            board_frequency: FREQ_915,
            bl_version: BL_VERSION,
        }
    }

    fn opts() -> UploadOptions {
        UploadOptions {
            client: ClientConfig {
                timeout: Duration::from_millis(200),
                erase_timeout: Duration::from_millis(500),
                sync_attempts: 5,
                retries: 2,
            },
            ..Default::default()
        }
    }

    fn connect_device(
        flash: MemoryFlash,
        opts: &UploadOptions,
    ) -> (Uploader<loopback::HostEnd>, loopback::Device) {
        let (host, device) = loopback::spawn_device(
            flash,
            board(),
            DeviceOptions::default(),
            Duration::from_millis(20),
        );
        (Uploader::new(host, opts.client.clone()), device)
    }

    fn firmware() -> FirmwareImage {
        let layout = FlashLayout::default();
        let code: Vec<u8> = (0..70u8).collect();
        let hex = [
            ihex_record(0x0400, 0x00, &code[..16]),
            ihex_record(0x0410, 0x00, &code[16..32]),
            ihex_record(0x0420, 0x00, &code[32..48]),
            ihex_record(0x0430, 0x00, &code[48..64]),
            ihex_record(0x0440, 0x00, &code[64..]),
            ihex_record(layout.signature_addr(), 0x00, &APP_SIGNATURE),
            ihex_record(0x0000, 0x01, &[]),
        ]
        .join("\n");
        FirmwareImage::parse(hex.as_bytes(), &layout).unwrap()
    }

    #[test]
    fn test_flash_with_programs_verifies_and_reboots() {
        let opts = opts();
        let mut stale = MemoryFlash::new(FlashLayout::default());
        stale.write_byte(0x3000, 0x00);
        let (mut up, device) = connect_device(stale, &opts);
        let fw = firmware();

        let mut events: Vec<OperationEvent> = Vec::new();
        flash_with(&mut up, &fw, &opts, |e| events.push(e)).unwrap();

        let chunks: Vec<(usize, usize, u16, usize)> = events
            .iter()
            .filter_map(|e| match e {
                OperationEvent::Chunk {
                    index,
                    total,
                    addr,
                    len,
                } => Some((*index, *total, *addr, *len)),
                _ => None,
            })
            .collect();
        assert_eq!(
            chunks,
            vec![
                (0, 4, 0x0400, 32),
                (1, 4, 0x0420, 32),
                (2, 4, 0x0440, 6),
                (3, 4, 0xF7FE, 2),
            ]
        );
        assert!(matches!(events.first(), Some(OperationEvent::SyncOk)));
        assert!(events.iter().any(|e| matches!(
            e,
            OperationEvent::DeviceIdentified { info } if info.board_id == BOARD_HM_TRP
        )));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, OperationEvent::Verify { .. }))
                .count(),
            2
        );
        assert!(matches!(
            &events[events.len() - 2..],
            [OperationEvent::Boot, OperationEvent::Done]
        ));

        // After the reboot the device is back in its command loop.
        up.resync().unwrap();
        drop(up);
        let mut flash = device.join();
        assert!(flash.app_valid());
        assert_eq!(flash.read_byte(0x0445), 69);
        assert_eq!(flash.read_byte(0x3000), 0xFF);
    }

    #[test]
    fn test_flash_with_no_reboot_keeps_device_in_bootloader() {
        let opts = UploadOptions {
            no_reboot: true,
            no_verify: true,
            ..opts()
        };
        let (mut up, device) = connect_device(MemoryFlash::new(FlashLayout::default()), &opts);

        let mut events: Vec<OperationEvent> = Vec::new();
        flash_with(&mut up, &firmware(), &opts, |e| events.push(e)).unwrap();

        assert!(!events.iter().any(|e| matches!(e, OperationEvent::Boot)));
        assert!(!events
            .iter()
            .any(|e| matches!(e, OperationEvent::Verify { .. })));

        // Still the same session, so the data can be read back directly.
        let bytes = dump_with(&mut up, 0x0400, 4, |_| {}).unwrap();
        assert_eq!(bytes, vec![0, 1, 2, 3]);
        drop(up);
        device.join();
    }

    #[test]
    fn test_flash_with_board_mismatch_does_not_erase() {
        let opts = UploadOptions {
            expected_board: Some(BOARD_RF50),
            ..opts()
        };
        let mut flash = MemoryFlash::new(FlashLayout::default());
        flash.write_byte(0x0400, 0x12);
        let (mut up, device) = connect_device(flash, &opts);

        let err = flash_with(&mut up, &firmware(), &opts, |_| {}).unwrap_err();
        assert!(matches!(
            err,
            UploadError::BoardMismatch {
                expected: BOARD_RF50,
                got: BOARD_HM_TRP
            }
        ));
        assert_eq!(err.kind(), UploadErrorKind::BoardMismatch);

        drop(up);
        let mut flash = device.join();
        assert_eq!(flash.read_byte(0x0400), 0x12);
    }

    #[test]
    fn test_dump_spans_several_reads() {
        let opts = opts();
        let mut flash = MemoryFlash::new(FlashLayout::default());
        for i in 0..600u16 {
            flash.write_byte(0x0800 + i, (i % 7) as u8);
        }
        let (mut up, device) = connect_device(flash, &opts);

        let mut reads = Vec::new();
        let bytes = dump_with(&mut up, 0x0800, 600, |e| {
            if let OperationEvent::Read { addr, len } = e {
                reads.push((addr, len));
            }
        })
        .unwrap();

        assert_eq!(bytes.len(), 600);
        assert_eq!(bytes[599], (599 % 7) as u8);
        assert_eq!(reads, vec![(0x0800, 255), (0x08FF, 255), (0x09FE, 90)]);
        drop(up);
        device.join();
    }

    #[test]
    fn test_dump_rejects_reads_past_end_of_flash() {
        let opts = opts();
        let (mut up, device) = connect_device(MemoryFlash::new(FlashLayout::default()), &opts);

        let err = dump_with(&mut up, 0xFFFF, 3, |_| {}).unwrap_err();
        assert!(matches!(
            err,
            UploadError::ReadOutOfRange {
                addr: 0xFFFF,
                len: 3
            }
        ));
        assert!(matches!(
            dump_with(&mut up, 0x0400, usize::MAX, |_| {}),
            Err(UploadError::ReadOutOfRange { .. })
        ));

        let last = dump_with(&mut up, 0xFFFF, 1, |_| {}).unwrap();
        assert_eq!(last, vec![0xFF]);
        drop(up);
        device.join();
    }

    #[test]
    fn test_erase_params_clears_scratch_only() {
        let opts = opts();
        let mut flash = MemoryFlash::new(FlashLayout::default());
        flash.write_byte(0xF800, 0x00);
        flash.write_byte(0x0400, 0x00);
        let (mut up, device) = connect_device(flash, &opts);

        erase_params_with(&mut up, |_| {}).unwrap();
        let info = identify_with(&mut up, |_| {}).unwrap();
        assert_eq!(info.board_frequency, FREQ_915);

        drop(up);
        let mut flash = device.join();
        assert_eq!(flash.read_byte(0xF800), 0xFF);
        assert_eq!(flash.read_byte(0x0400), 0x00);
    }

    #[test]
    fn test_silent_link_maps_to_no_sync() {
        let (host, _device_end) = loopback::pair(Duration::from_millis(10));
        let opts = UploadOptions {
            client: ClientConfig {
                timeout: Duration::from_millis(30),
                sync_attempts: 2,
                ..opts().client
            },
            ..opts()
        };
        let mut up = Uploader::new(host, opts.client.clone());
        let err = identify_with(&mut up, |_| {}).unwrap_err();
        assert_eq!(err.kind(), UploadErrorKind::NoSync);
    }

    #[test]
    fn test_select_target_auto_prefers_single_bridge() {
        let targets = vec![
            target("/dev/ttyS0", None),
            target("/dev/ttyUSB0", Some(FTDI_VID)),
        ];
        let t = select_target(None, &targets).unwrap();
        assert_eq!(t.port_name, "/dev/ttyUSB0");
    }

    #[test]
    fn test_select_target_auto_ambiguous() {
        let targets = vec![
            target("/dev/ttyUSB0", Some(FTDI_VID)),
            target("/dev/ttyUSB1", Some(SILABS_VID)),
        ];
        let err = select_target(None, &targets).unwrap_err();
        assert_eq!(err.kind(), UploadErrorKind::AmbiguousTarget);

        let plain = vec![target("/dev/ttyS0", None), target("/dev/ttyS1", None)];
        assert!(matches!(
            select_target(None, &plain),
            Err(UploadError::AmbiguousTarget { .. })
        ));
    }

    #[test]
    fn test_select_target_by_selector() {
        let targets = vec![
            target("/dev/ttyUSB0", Some(FTDI_VID)),
            target("/dev/ttyUSB1", Some(SILABS_VID)),
        ];
        let t = select_target(Some("index:1"), &targets).unwrap();
        assert_eq!(t.port_name, "/dev/ttyUSB1");

        let t = select_target(Some("/dev/ttyUSB0"), &targets).unwrap();
        assert_eq!(t.port_name, "/dev/ttyUSB0");

        assert!(matches!(
            select_target(None, &[]),
            Err(UploadError::NoTargets)
        ));
    }

    #[test]
    fn test_error_kinds() {
        let e = UploadError::WriteFailed {
            addr: 0x0400,
            source: ClientError::Timeout {
                command: protocol::Command::ProgMulti,
            },
        };
        assert_eq!(e.kind(), UploadErrorKind::WriteFailed);
        assert!(e.to_string().contains("0x0400"));

        let e = UploadError::BoardMismatch {
            expected: BOARD_RF50,
            got: BOARD_HM_TRP,
        };
        assert!(e.to_string().contains("0x4D"));
    }
}
