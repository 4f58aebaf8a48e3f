use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::context::{parse_board, parse_frequency, parse_u16};

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum JsonProgressArg {
    /// Emit a JSON event for every programmed chunk.
    Chunks,
    /// Emit fewer JSON events by throttling chunk output to percent changes.
    Percent,
    /// Do not emit per-chunk progress events.
    None,
}

#[derive(Parser)]
#[command(name = "sikboot")]
#[command(about = "Uploader and emulator for SiK radio bootloaders")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Program an Intel HEX image through the bootloader.
    Flash(FlashArgs),

    /// Report board id and frequency band.
    Identify(DeviceArgs),

    /// Erase the stored radio parameters.
    EraseParams(DeviceArgs),

    /// Leave the bootloader and reset the device.
    Reboot(DeviceArgs),

    /// Read flash contents back.
    Dump(DumpArgs),

    /// List serial ports.
    List(ListArgs),

    /// Serve the bootloader protocol on a serial port from a flash image file.
    Emulate(EmulateArgs),
}

#[derive(Parser, Clone)]
pub struct PortArgs {
    /// Open this serial port directly (e.g. COM6, /dev/ttyUSB0).
    #[arg(long, conflicts_with = "device")]
    pub port: Option<String>,

    /// Select a discovered port (e.g. index:0, serial:/dev/ttyUSB0).
    #[arg(long)]
    pub device: Option<String>,

    /// Serial baud rate.
    #[arg(long, default_value_t = sikboot::serial::DEFAULT_BAUD)]
    pub baud: u32,

    /// Reply timeout per transaction.
    #[arg(long, default_value_t = 500)]
    pub timeout_ms: u64,

    /// Retries per transaction after a timeout or garbled reply.
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// SYNC probes before giving up on the device.
    #[arg(long, default_value_t = 10)]
    pub sync_attempts: u32,
}

#[derive(Parser)]
pub struct FlashArgs {
    /// Path to Intel HEX firmware.
    pub hex: PathBuf,

    #[command(flatten)]
    pub port: PortArgs,

    /// Refuse to flash unless the device reports this board (rf50, hm-trp or a number).
    #[arg(long, value_parser = parse_board)]
    pub board: Option<u8>,

    /// Skip the read-back verification.
    #[arg(long)]
    pub no_verify: bool,

    /// Stay in the bootloader after programming.
    #[arg(long)]
    pub no_reboot: bool,

    /// Time allowed for the application erase.
    #[arg(long, default_value_t = 10000)]
    pub erase_timeout_ms: u64,

    /// Emit JSON line events to stdout.
    #[arg(long)]
    pub json: bool,

    /// Include monotonic timestamps in JSON events (milliseconds since process start).
    #[arg(long, requires = "json")]
    pub json_timestamps: bool,

    /// JSON progress verbosity.
    ///
    /// - chunks: emit every chunk (most verbose)
    /// - percent: emit fewer progress events
    /// - none: no per-chunk progress events
    #[arg(long, value_enum, default_value_t = JsonProgressArg::Percent, requires = "json")]
    pub json_progress: JsonProgressArg,

    /// Validate the image and port selection without touching the device.
    #[arg(long)]
    pub dry_run: bool,

    /// Reduce output (only errors).
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// More logs to stderr.
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Parser)]
pub struct DeviceArgs {
    #[command(flatten)]
    pub port: PortArgs,

    /// Emit JSON line events to stdout.
    #[arg(long)]
    pub json: bool,

    /// Include monotonic timestamps in JSON events (milliseconds since process start).
    #[arg(long, requires = "json")]
    pub json_timestamps: bool,

    /// More logs to stderr.
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Parser)]
pub struct DumpArgs {
    #[command(flatten)]
    pub port: PortArgs,

    /// First address to read (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_u16, default_value = "0x0400")]
    pub addr: u16,

    /// Number of bytes to read.
    #[arg(long, default_value_t = 256)]
    pub len: usize,

    /// Write the raw bytes to this file instead of printing them.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Emit JSON line events to stdout.
    #[arg(long)]
    pub json: bool,

    /// More logs to stderr.
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Emit JSON line output.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct EmulateArgs {
    /// Serial port the host tool talks to.
    pub port: String,

    /// Serial baud rate.
    #[arg(long, default_value_t = sikboot::serial::DEFAULT_BAUD)]
    pub baud: u32,

    /// Raw flash image backing the device (created if missing).
    #[arg(long, default_value = "flash.bin")]
    pub image: PathBuf,

    /// Board id reported by GET_DEVICE (rf50, hm-trp or a number).
    #[arg(long, value_parser = parse_board, default_value = "hm-trp")]
    pub board: u8,

    /// Frequency band (433, 470, 868, 915, none or a number). Defaults to the image's patch byte.
    #[arg(long, value_parser = parse_frequency)]
    pub frequency: Option<u8>,

    /// Hold the boot strap: always stay in the bootloader.
    #[arg(long)]
    pub strap: bool,

    /// Exit after this many resets.
    #[arg(long)]
    pub max_resets: Option<u32>,

    /// Program to start when the bootloader hands off to the application.
    #[arg(long)]
    pub app: Option<PathBuf>,

    /// Arguments passed to the application program.
    #[arg(last = true, requires = "app")]
    pub app_args: Vec<String>,

    /// More logs to stderr.
    #[arg(long, short)]
    pub verbose: bool,
}
