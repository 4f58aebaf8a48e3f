use std::io::{IsTerminal, Write};

use sikboot::{operation::OperationEvent, targets};

use crate::output::{
    format_device, format_target_line, hex_dump_lines, DryRunSummary, Event, OperationSummary,
    OutputOptions, Reporter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Quiet,
    Verbose,
    Progress,
}

pub struct HumanOutput {
    opts: OutputOptions,
    is_tty: bool,
    progress_active: bool,
    last_percent: Option<u64>,
    detected: Vec<Option<targets::Target>>,
}

impl HumanOutput {
    pub fn new(opts: OutputOptions) -> Self {
        Self {
            opts,
            is_tty: std::io::stderr().is_terminal(),
            progress_active: false,
            last_percent: None,
            detected: Vec::new(),
        }
    }

    fn mode(&self) -> Mode {
        if self.opts.quiet {
            Mode::Quiet
        } else if self.opts.verbose {
            Mode::Verbose
        } else {
            Mode::Progress
        }
    }

    fn remember_target(&mut self, index: usize, target: targets::Target) {
        if self.detected.len() <= index {
            self.detected.resize_with(index + 1, || None);
        }
        self.detected[index] = Some(target);
    }

    fn finish_line(&mut self) {
        if self.progress_active {
            eprintln!();
            self.progress_active = false;
        }
    }

    fn println(&mut self, msg: &str) {
        if self.mode() == Mode::Quiet {
            return;
        }
        self.finish_line();
        eprintln!("{msg}");
    }

    fn progress_update(&mut self, percent: u64, i: usize, n: usize, addr: u16) {
        if self.mode() != Mode::Progress {
            return;
        }

        if self.is_tty {
            eprint!("\r  programming {percent:3}% ({i}/{n}) @ 0x{addr:04X}");
            let _ = std::io::stderr().flush();
            self.progress_active = true;
            self.last_percent = Some(percent);
            return;
        }

        let last = self.last_percent.unwrap_or(0);
        if percent == 0 || percent == 100 || percent >= last + 10 {
            self.last_percent = Some(percent);
            self.println(&format!("  programming {percent:3}% ({i}/{n})"));
        }
    }

    pub(crate) fn ambiguous_help_lines(detected: &[Option<targets::Target>]) -> Vec<String> {
        detected
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().map(|t| format_target_line(i, t)))
            .collect()
    }

    fn print_ambiguous_help(&mut self) {
        if self.mode() == Mode::Quiet {
            return;
        }

        let lines = Self::ambiguous_help_lines(&self.detected);
        if lines.is_empty() {
            return;
        }

        self.println("");
        self.println("Detected ports:");
        for line in lines {
            self.println(&line);
        }
        self.println(
            "\nHint: use --device index:<n> (e.g. index:0), --port <name>, or run `sikboot list`.",
        );
    }

    fn on_operation_event(&mut self, ev: OperationEvent) {
        match ev {
            OperationEvent::DiscoverStart => {
                if self.mode() == Mode::Verbose {
                    self.println("discover serial ports...");
                }
            }
            OperationEvent::TargetDetected { index, target } => {
                let id = target.id();
                self.remember_target(index, target);
                if self.mode() == Mode::Verbose {
                    self.println(&format!("port[{index}]: {id}"));
                }
            }
            OperationEvent::DiscoverDone { count } => {
                if self.mode() == Mode::Verbose {
                    self.println(&format!("found {count} port(s)"));
                }
            }
            OperationEvent::TargetSelected { target_id } => {
                if self.mode() == Mode::Verbose {
                    self.println(&format!("selected: {target_id}"));
                }
            }
            OperationEvent::HexLoaded {
                bytes,
                segments,
                signed,
            } => {
                if self.mode() != Mode::Quiet {
                    self.println(&format!(
                        "firmware loaded: {bytes} bytes ({segments} segment(s))"
                    ));
                    if !signed {
                        self.println(
                            "warning: image is not signed; the device will stay in the bootloader",
                        );
                    }
                }
            }
            OperationEvent::PortOpen { port, baud } => {
                if self.mode() == Mode::Verbose {
                    self.println(&format!("open {port} @ {baud} baud"));
                } else if self.mode() == Mode::Progress {
                    self.println(&format!("port: {port}"));
                }
            }
            OperationEvent::SyncOk => {
                if self.mode() == Mode::Verbose {
                    self.println("bootloader in sync");
                }
            }
            OperationEvent::DeviceIdentified { info } => {
                if self.mode() != Mode::Quiet {
                    self.println(&format!("device: {}", format_device(&info)));
                }
            }
            OperationEvent::Erase => {
                if self.mode() != Mode::Quiet {
                    self.println("erasing application...");
                }
                self.last_percent = None;
            }
            OperationEvent::ParamErase => {
                if self.mode() != Mode::Quiet {
                    self.println("erasing parameters...");
                }
            }
            OperationEvent::Chunk {
                index,
                total,
                addr,
                len,
            } => {
                if self.mode() == Mode::Verbose {
                    self.println(&format!(
                        "program chunk {}/{} @ 0x{addr:04X} ({len} bytes)",
                        index + 1,
                        total
                    ));
                } else if self.mode() == Mode::Progress {
                    let percent = ((index + 1) as u64 * 100).saturating_div(total.max(1) as u64);
                    self.progress_update(percent, index + 1, total, addr);
                }
            }
            OperationEvent::Verify {
                index,
                total,
                addr,
                len,
            } => {
                if self.mode() == Mode::Verbose {
                    self.println(&format!(
                        "verify segment {}/{} @ 0x{addr:04X} ({len} bytes)",
                        index + 1,
                        total
                    ));
                } else if self.mode() == Mode::Progress && index == 0 {
                    self.println("verifying...");
                }
            }
            OperationEvent::Read { addr, len } => {
                if self.mode() == Mode::Verbose {
                    self.println(&format!("read {len} bytes @ 0x{addr:04X}"));
                }
            }
            OperationEvent::Boot => {
                if self.mode() == Mode::Progress {
                    self.println("rebooting device...");
                } else if self.mode() == Mode::Verbose {
                    self.println("sending REBOOT");
                }
            }
            OperationEvent::Done => {
                self.finish_line();
            }
        }
    }
}

impl Reporter for HumanOutput {
    fn emit(&mut self, event: Event) {
        match event {
            Event::Operation(ev) => self.on_operation_event(ev),
            Event::OperationSummary(summary) => emit_summary(summary, self),
            Event::DryRun(summary) => emit_dry_run(summary, self),
            Event::ListTargets(targets) => emit_list_targets(&targets, self),
            Event::Device(info) => {
                self.finish_line();
                println!("{}", format_device(&info));
            }
            Event::Dump { addr, data } => {
                self.finish_line();
                for line in hex_dump_lines(addr, &data) {
                    println!("{line}");
                }
            }
            Event::Status(message) => self.println(&message),
            Event::Error { code: _, message } => {
                self.finish_line();
                eprintln!("error: {message}");
            }
            Event::HintAmbiguousTargets => self.print_ambiguous_help(),
        }
    }

    fn finish(&mut self) {
        self.finish_line();
    }
}

fn emit_list_targets(targets: &[targets::Target], out: &mut HumanOutput) {
    if targets.is_empty() {
        out.println("No serial ports found");
        return;
    }

    for (i, t) in targets.iter().enumerate() {
        out.println(&format_target_line(i, t));
    }
}

fn emit_summary(summary: OperationSummary, out: &mut HumanOutput) {
    if out.mode() == Mode::Quiet || summary.exit_code != 0 {
        return;
    }
    if summary.chunks > 0 {
        out.println(&format!(
            "ok: {} bytes in {} chunk(s){}",
            summary.bytes,
            summary.chunks,
            if summary.verified { ", verified" } else { "" }
        ));
    } else {
        out.println(&format!("ok: {}", summary.operation));
    }
}

fn emit_dry_run(summary: DryRunSummary, out: &mut HumanOutput) {
    if out.mode() == Mode::Quiet {
        return;
    }

    out.println("Dry run OK");
    out.println(&format!(
        "Firmware: {} bytes, segments={}, chunks={}, signed={}",
        summary.bytes,
        summary.segments,
        summary.chunks,
        if summary.signed { "yes" } else { "no" }
    ));
    out.println(&format!("Port: {}", summary.port));
}
