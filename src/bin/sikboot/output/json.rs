use std::collections::BTreeMap;
use std::time::Instant;

use sikboot::{operation::OperationEvent, targets};

use crate::output::{
    device_to_value, target_to_value, DryRunSummary, Event, JsonProgressMode, OperationSummary,
    OutputOptions, Reporter,
};

#[derive(serde::Serialize)]
pub struct JsonEvent {
    schema: u32,
    event: &'static str,
    #[serde(flatten)]
    fields: BTreeMap<&'static str, serde_json::Value>,
}

impl JsonEvent {
    pub fn status(event: &'static str) -> Self {
        Self {
            schema: 1,
            event,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_u64(mut self, k: &'static str, v: u64) -> Self {
        self.fields.insert(k, serde_json::Value::from(v));
        self
    }

    pub fn with_str(mut self, k: &'static str, v: &str) -> Self {
        self.fields.insert(k, serde_json::Value::from(v));
        self
    }

    pub fn with_bool(mut self, k: &'static str, v: bool) -> Self {
        self.fields.insert(k, serde_json::Value::from(v));
        self
    }

    pub fn with_value(mut self, k: &'static str, v: serde_json::Value) -> Self {
        self.fields.insert(k, v);
        self
    }
}

pub struct JsonOutput {
    opts: OutputOptions,
    start: Instant,
    last_percent: Option<u64>,
}

impl JsonOutput {
    pub fn new(opts: OutputOptions) -> Self {
        Self {
            opts,
            start: Instant::now(),
            last_percent: None,
        }
    }
}

impl JsonOutput {
    pub(crate) fn render_event_json(&mut self, ev: JsonEvent) -> String {
        let mut ev = ev;
        if self.opts.json_timestamps {
            ev.fields.insert(
                "t_ms",
                serde_json::Value::from(self.start.elapsed().as_millis() as u64),
            );
        }
        serde_json::to_string(&ev).unwrap_or_else(|_| "{}".to_string())
    }

    fn json_event(&mut self, ev: JsonEvent) {
        println!("{}", self.render_event_json(ev));
    }

    fn error_event(&mut self, code: i32, msg: &str) {
        self.json_event(
            JsonEvent::status("error")
                .with_u64("code", code as u64)
                .with_str("message", msg),
        );

        if self.opts.verbose {
            eprintln!("error: {msg}");
        }
    }

    /// Whether a chunk event passes the configured progress throttle.
    pub(crate) fn should_emit_chunk(&mut self, index: usize, total: usize) -> bool {
        match self.opts.json_progress {
            JsonProgressMode::Chunks => true,
            JsonProgressMode::None => false,
            JsonProgressMode::Percent => {
                let total_u64 = total.max(1) as u64;
                let percent = ((index + 1) as u64).saturating_mul(100) / total_u64;
                let emit = index == 0
                    || index + 1 == total
                    || self.last_percent.map(|p| p != percent).unwrap_or(true);
                if emit {
                    self.last_percent = Some(percent);
                }
                emit
            }
        }
    }

    fn emit_operation(&mut self, ev: OperationEvent) {
        match &ev {
            OperationEvent::Erase => {
                self.last_percent = None;
            }
            OperationEvent::Chunk { index, total, .. } => {
                if !self.should_emit_chunk(*index, *total) {
                    return;
                }
            }
            _ => {}
        }

        self.json_event(operation_event_to_json(ev));
    }
}

impl Reporter for JsonOutput {
    fn emit(&mut self, event: Event) {
        match event {
            Event::Operation(ev) => self.emit_operation(ev),
            Event::OperationSummary(summary) => {
                self.json_event(operation_summary_to_json(summary));
            }
            Event::DryRun(summary) => self.json_event(dry_run_to_json(summary)),
            Event::ListTargets(targets) => self.json_event(list_to_json(&targets)),
            Event::Device(info) => {
                self.json_event(
                    JsonEvent::status("device").with_value("device", device_to_value(&info)),
                );
            }
            Event::Dump { addr, data } => self.json_event(dump_to_json(addr, &data)),
            Event::Status(message) => {
                self.json_event(JsonEvent::status("status").with_str("message", &message));
            }
            Event::Error { code, message } => self.error_event(code, &message),
            Event::HintAmbiguousTargets => {}
        }
    }

    fn finish(&mut self) {}
}

pub fn list_to_json(targets: &[targets::Target]) -> JsonEvent {
    JsonEvent::status("list")
        .with_u64("count", targets.len() as u64)
        .with_value(
            "targets",
            serde_json::Value::Array(
                targets
                    .iter()
                    .enumerate()
                    .map(|(i, t)| target_to_value(i, t))
                    .collect(),
            ),
        )
}

pub fn dump_to_json(addr: u16, data: &[u8]) -> JsonEvent {
    let hex: String = data.iter().map(|b| format!("{b:02x}")).collect();
    JsonEvent::status("dump")
        .with_u64("addr", addr as u64)
        .with_u64("len", data.len() as u64)
        .with_str("data", &hex)
}

pub fn dry_run_to_json(summary: DryRunSummary) -> JsonEvent {
    JsonEvent::status("dry_run")
        .with_u64("bytes", summary.bytes as u64)
        .with_u64("segments", summary.segments as u64)
        .with_u64("chunks", summary.chunks as u64)
        .with_bool("signed", summary.signed)
        .with_str("port", &summary.port)
}

pub fn operation_summary_to_json(summary: OperationSummary) -> JsonEvent {
    let OperationSummary {
        operation,
        exit_code,
        message,
        port,
        device,
        chunks,
        bytes,
        verified,
        rebooted,
    } = summary;

    let mut ev = JsonEvent::status("operation_summary")
        .with_str("operation", operation)
        .with_u64("ok", if exit_code == 0 { 1 } else { 0 })
        .with_u64("exit_code", exit_code.max(0) as u64)
        .with_u64("chunks", chunks)
        .with_u64("bytes", bytes)
        .with_bool("verified", verified)
        .with_bool("rebooted", rebooted);

    if let Some(p) = &port {
        ev = ev.with_str("port", p);
    }
    if let Some(d) = &device {
        ev = ev.with_value("device", device_to_value(d));
    }
    if let Some(msg) = &message {
        ev = ev.with_str("message", msg);
    }

    ev
}

pub fn operation_event_to_json(ev: OperationEvent) -> JsonEvent {
    match ev {
        OperationEvent::DiscoverStart => JsonEvent::status("discover_start"),
        OperationEvent::TargetDetected { index, target } => JsonEvent::status("target_detected")
            .with_value("target", target_to_value(index, &target)),
        OperationEvent::DiscoverDone { count } => {
            JsonEvent::status("discover_done").with_u64("count", count as u64)
        }
        OperationEvent::TargetSelected { target_id } => {
            JsonEvent::status("target_selected").with_str("target_id", &target_id)
        }
        OperationEvent::HexLoaded {
            bytes,
            segments,
            signed,
        } => JsonEvent::status("hex_loaded")
            .with_u64("bytes", bytes as u64)
            .with_u64("segments", segments as u64)
            .with_bool("signed", signed),
        OperationEvent::PortOpen { port, baud } => JsonEvent::status("port_open")
            .with_str("port", &port)
            .with_u64("baud", baud as u64),
        OperationEvent::SyncOk => JsonEvent::status("sync_ok"),
        OperationEvent::DeviceIdentified { info } => {
            JsonEvent::status("device_identified").with_value("device", device_to_value(&info))
        }
        OperationEvent::Erase => JsonEvent::status("erase"),
        OperationEvent::ParamErase => JsonEvent::status("param_erase"),
        OperationEvent::Chunk {
            index,
            total,
            addr,
            len,
        } => JsonEvent::status("chunk")
            .with_u64("i", index as u64)
            .with_u64("n", total as u64)
            .with_u64("addr", addr as u64)
            .with_u64("len", len as u64),
        OperationEvent::Verify {
            index,
            total,
            addr,
            len,
        } => JsonEvent::status("verify")
            .with_u64("i", index as u64)
            .with_u64("n", total as u64)
            .with_u64("addr", addr as u64)
            .with_u64("len", len as u64),
        OperationEvent::Read { addr, len } => JsonEvent::status("read")
            .with_u64("addr", addr as u64)
            .with_u64("len", len as u64),
        OperationEvent::Boot => JsonEvent::status("boot"),
        OperationEvent::Done => JsonEvent::status("done"),
    }
}
