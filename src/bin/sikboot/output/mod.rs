use crate::cli;

use sikboot::{client::DeviceInfo, operation::OperationEvent, targets};

pub mod human;
pub mod json;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub verbose: bool,
    pub quiet: bool,
    pub json_timestamps: bool,
    pub json_progress: JsonProgressMode,
}

impl OutputOptions {
    fn plain(verbose: bool) -> Self {
        Self {
            verbose,
            quiet: false,
            json_timestamps: false,
            json_progress: JsonProgressMode::Chunks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonProgressMode {
    Chunks,
    Percent,
    None,
}

#[derive(Debug, Clone)]
pub struct DryRunSummary {
    pub bytes: usize,
    pub segments: usize,
    pub chunks: usize,
    pub signed: bool,
    pub port: String,
}

#[derive(Debug, Clone)]
pub enum Event {
    Operation(OperationEvent),
    OperationSummary(OperationSummary),
    DryRun(DryRunSummary),
    ListTargets(Vec<targets::Target>),
    Device(DeviceInfo),
    Dump { addr: u16, data: Vec<u8> },
    Status(String),
    Error { code: i32, message: String },
    HintAmbiguousTargets,
}

#[derive(Debug, Clone)]
pub struct OperationSummary {
    pub operation: &'static str,
    pub exit_code: i32,
    pub message: Option<String>,

    pub port: Option<String>,
    pub device: Option<DeviceInfo>,

    pub chunks: u64,
    pub bytes: u64,
    pub verified: bool,
    pub rebooted: bool,
}

pub struct OperationRecorder {
    operation: &'static str,
    port: Option<String>,
    device: Option<DeviceInfo>,
    chunks: u64,
    bytes: u64,
    verified: bool,
    rebooted: bool,
}

impl OperationRecorder {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            port: None,
            device: None,
            chunks: 0,
            bytes: 0,
            verified: false,
            rebooted: false,
        }
    }

    pub fn observe(&mut self, ev: &OperationEvent) {
        match ev {
            OperationEvent::PortOpen { port, .. } => {
                self.port = Some(port.clone());
            }
            OperationEvent::DeviceIdentified { info } => {
                self.device = Some(*info);
            }
            OperationEvent::Chunk { len, .. } => {
                self.chunks = self.chunks.saturating_add(1);
                self.bytes = self.bytes.saturating_add(*len as u64);
            }
            OperationEvent::Verify { .. } => {
                self.verified = true;
            }
            OperationEvent::Boot => {
                self.rebooted = true;
            }
            _ => {}
        }
    }

    pub fn finish(self, exit_code: i32, message: Option<String>) -> OperationSummary {
        OperationSummary {
            operation: self.operation,
            exit_code,
            message,
            port: self.port,
            device: self.device,
            chunks: self.chunks,
            bytes: self.bytes,
            verified: self.verified && exit_code == 0,
            rebooted: self.rebooted,
        }
    }
}

pub trait Reporter {
    fn emit(&mut self, event: Event);
    fn finish(&mut self);
}

pub fn make_for_flash(args: &cli::FlashArgs) -> Box<dyn Reporter> {
    let json_progress = match args.json_progress {
        cli::JsonProgressArg::Chunks => JsonProgressMode::Chunks,
        cli::JsonProgressArg::Percent => JsonProgressMode::Percent,
        cli::JsonProgressArg::None => JsonProgressMode::None,
    };
    let opts = OutputOptions {
        verbose: args.verbose,
        quiet: args.quiet,
        json_timestamps: args.json_timestamps,
        json_progress,
    };
    if args.json {
        Box::new(json::JsonOutput::new(opts))
    } else {
        Box::new(human::HumanOutput::new(opts))
    }
}

pub fn make_for_device(args: &cli::DeviceArgs) -> Box<dyn Reporter> {
    let opts = OutputOptions {
        json_timestamps: args.json_timestamps,
        ..OutputOptions::plain(args.verbose)
    };
    if args.json {
        Box::new(json::JsonOutput::new(opts))
    } else {
        Box::new(human::HumanOutput::new(opts))
    }
}

pub fn make_for_dump(args: &cli::DumpArgs) -> Box<dyn Reporter> {
    let opts = OutputOptions::plain(args.verbose);
    if args.json {
        Box::new(json::JsonOutput::new(opts))
    } else {
        Box::new(human::HumanOutput::new(opts))
    }
}

pub fn make_for_list(args: &cli::ListArgs) -> Box<dyn Reporter> {
    let opts = OutputOptions::plain(false);
    if args.json {
        Box::new(json::JsonOutput::new(opts))
    } else {
        Box::new(human::HumanOutput::new(opts))
    }
}

pub fn make_for_emulate(args: &cli::EmulateArgs) -> Box<dyn Reporter> {
    Box::new(human::HumanOutput::new(OutputOptions::plain(args.verbose)))
}

pub fn target_to_value(index: usize, t: &targets::Target) -> serde_json::Value {
    let mut v = serde_json::to_value(t)
        .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));
    if let serde_json::Value::Object(obj) = &mut v {
        obj.insert("index".to_string(), serde_json::Value::from(index as u64));
        obj.insert("target_id".to_string(), serde_json::Value::from(t.id()));
    }
    v
}

pub fn device_to_value(info: &DeviceInfo) -> serde_json::Value {
    let mut v = serde_json::to_value(info)
        .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));
    if let serde_json::Value::Object(obj) = &mut v {
        obj.insert("board".to_string(), serde_json::Value::from(info.board_name()));
        obj.insert(
            "frequency".to_string(),
            serde_json::Value::from(info.frequency_name()),
        );
    }
    v
}

pub fn format_target_line(index: usize, t: &targets::Target) -> String {
    match (t.vid, t.pid) {
        (Some(vid), Some(pid)) => format!(
            "[{index}] {} {vid:04X}:{pid:04X} {}",
            t.id(),
            t.product.as_deref().unwrap_or("")
        ),
        _ => format!("[{index}] {}", t.id()),
    }
}

pub fn format_device(info: &DeviceInfo) -> String {
    format!(
        "board {} (0x{:02X}), frequency {} (0x{:02X})",
        info.board_name(),
        info.board_id,
        info.frequency_name(),
        info.board_frequency
    )
}

/// Classic 16 bytes per row hex dump.
pub fn hex_dump_lines(addr: u16, data: &[u8]) -> Vec<String> {
    data.chunks(16)
        .enumerate()
        .map(|(i, row)| {
            let at = addr.wrapping_add((i * 16) as u16);
            let hex: Vec<String> = row.iter().map(|b| format!("{b:02X}")).collect();
            let ascii: String = row
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!("{at:04X}: {:<47} |{ascii}|", hex.join(" "))
        })
        .collect()
}
