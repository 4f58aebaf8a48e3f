use std::time::Duration;

use sikboot::api::{PortSelection, UploadOptions};
use sikboot::client::ClientConfig;
use sikboot::emulator::EmulatorOptions;
use sikboot::protocol;

use crate::cli;

pub fn port_selection(args: &cli::PortArgs) -> PortSelection {
    if let Some(port) = args.port.clone() {
        PortSelection::Port(port)
    } else if let Some(sel) = args.device.clone() {
        PortSelection::Device(sel)
    } else {
        PortSelection::Auto
    }
}

pub fn client_config(args: &cli::PortArgs) -> ClientConfig {
    ClientConfig {
        timeout: Duration::from_millis(args.timeout_ms),
        sync_attempts: args.sync_attempts,
        retries: args.retries,
        ..Default::default()
    }
}

pub fn upload_opts(args: &cli::PortArgs) -> UploadOptions {
    UploadOptions {
        baud: args.baud,
        client: client_config(args),
        ..Default::default()
    }
}

pub fn flash_opts(args: &cli::FlashArgs) -> UploadOptions {
    let mut opts = upload_opts(&args.port);
    opts.client.erase_timeout = Duration::from_millis(args.erase_timeout_ms);
    opts.expected_board = args.board;
    opts.no_verify = args.no_verify;
    opts.no_reboot = args.no_reboot;
    opts
}

pub fn emulator_opts(args: &cli::EmulateArgs) -> EmulatorOptions {
    EmulatorOptions {
        image: args.image.clone(),
        board_id: args.board,
        board_frequency: args.frequency,
        strap_asserted: args.strap,
        max_resets: args.max_resets,
        ..Default::default()
    }
}

pub fn parse_u16(s: &str) -> Result<u16, String> {
    let s = s.trim();
    let r = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    r.map_err(|e| format!("invalid address '{s}': {e}"))
}

fn parse_u8(s: &str) -> Result<u8, String> {
    let v = parse_u16(s)?;
    u8::try_from(v).map_err(|_| format!("value out of range: {s}"))
}

pub fn parse_board(s: &str) -> Result<u8, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "rf50" => Ok(protocol::BOARD_RF50),
        "hm-trp" | "hmtrp" | "hm_trp" => Ok(protocol::BOARD_HM_TRP),
        other => parse_u8(other),
    }
}

pub fn parse_frequency(s: &str) -> Result<u8, String> {
    match s.trim().to_ascii_lowercase().trim_end_matches("mhz") {
        "433" => Ok(protocol::FREQ_433),
        "470" => Ok(protocol::FREQ_470),
        "868" => Ok(protocol::FREQ_868),
        "915" => Ok(protocol::FREQ_915),
        "none" => Ok(protocol::FREQ_NONE),
        other => parse_u8(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u16_accepts_hex_and_decimal() {
        assert_eq!(parse_u16("0x0400"), Ok(0x0400));
        assert_eq!(parse_u16("1024"), Ok(1024));
        assert!(parse_u16("0x10000").is_err());
        assert!(parse_u16("zz").is_err());
    }

    #[test]
    fn test_parse_board_names_and_numbers() {
        assert_eq!(parse_board("RF50"), Ok(protocol::BOARD_RF50));
        assert_eq!(parse_board("hm-trp"), Ok(protocol::BOARD_HM_TRP));
        assert_eq!(parse_board("0x4e"), Ok(0x4E));
        assert!(parse_board("0x100").is_err());
    }

    #[test]
    fn test_parse_frequency_bands() {
        assert_eq!(parse_frequency("433"), Ok(protocol::FREQ_433));
        assert_eq!(parse_frequency("915MHz"), Ok(protocol::FREQ_915));
        assert_eq!(parse_frequency("none"), Ok(protocol::FREQ_NONE));
        assert_eq!(parse_frequency("0x86"), Ok(protocol::FREQ_868));
    }
}
