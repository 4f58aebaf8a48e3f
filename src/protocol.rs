//! Wire constants for the SiK UART bootloader protocol.
//!
//! Every transaction is a command byte, a fixed argument list and an
//! [`EOC`] terminator. A successful transaction is answered with
//! [`INSYNC`], [`OK`] after any data bytes the command returns.

pub const OK: u8 = 0x10;
/// Defined by the protocol but never sent; a dropped transaction is silent.
pub const FAILED: u8 = 0x11;
pub const INSYNC: u8 = 0x12;
pub const EOC: u8 = 0x20;

pub const GET_SYNC: u8 = 0x21;
pub const GET_DEVICE: u8 = 0x22;
pub const CHIP_ERASE: u8 = 0x23;
pub const LOAD_ADDRESS: u8 = 0x24;
pub const PROG_FLASH: u8 = 0x25;
pub const READ_FLASH: u8 = 0x26;
pub const PROG_MULTI: u8 = 0x27;
pub const READ_MULTI: u8 = 0x28;
pub const PARAM_ERASE: u8 = 0x29;
pub const REBOOT: u8 = 0x30;

/// Transfer buffer capacity on the device.
pub const PROG_MULTI_MAX: usize = 32;
/// Largest count a READ_MULTI can carry.
pub const READ_MULTI_MAX: usize = 255;

pub const BL_VERSION: u8 = 2;

pub const BOARD_RF50: u8 = 0x4D;
pub const BOARD_HM_TRP: u8 = 0x4E;

pub const FREQ_433: u8 = 0x43;
pub const FREQ_470: u8 = 0x47;
pub const FREQ_868: u8 = 0x86;
pub const FREQ_915: u8 = 0x91;
pub const FREQ_NONE: u8 = 0xF0;

/// A recognised command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    GetSync,
    GetDevice,
    ChipErase,
    ParamErase,
    LoadAddress,
    ProgFlash,
    ReadFlash,
    ProgMulti,
    ReadMulti,
    Reboot,
}

impl Command {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            GET_SYNC => Command::GetSync,
            GET_DEVICE => Command::GetDevice,
            CHIP_ERASE => Command::ChipErase,
            PARAM_ERASE => Command::ParamErase,
            LOAD_ADDRESS => Command::LoadAddress,
            PROG_FLASH => Command::ProgFlash,
            READ_FLASH => Command::ReadFlash,
            PROG_MULTI => Command::ProgMulti,
            READ_MULTI => Command::ReadMulti,
            REBOOT => Command::Reboot,
            _ => return None,
        })
    }

    pub fn byte(self) -> u8 {
        match self {
            Command::GetSync => GET_SYNC,
            Command::GetDevice => GET_DEVICE,
            Command::ChipErase => CHIP_ERASE,
            Command::ParamErase => PARAM_ERASE,
            Command::LoadAddress => LOAD_ADDRESS,
            Command::ProgFlash => PROG_FLASH,
            Command::ReadFlash => READ_FLASH,
            Command::ProgMulti => PROG_MULTI,
            Command::ReadMulti => READ_MULTI,
            Command::Reboot => REBOOT,
        }
    }

    /// Commands whose only argument is the EOC marker. The marker is checked
    /// before the command runs.
    pub fn eoc_only(self) -> bool {
        matches!(
            self,
            Command::GetSync
                | Command::GetDevice
                | Command::ChipErase
                | Command::ParamErase
                | Command::ReadFlash
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::GetSync => "GET_SYNC",
            Command::GetDevice => "GET_DEVICE",
            Command::ChipErase => "CHIP_ERASE",
            Command::ParamErase => "PARAM_ERASE",
            Command::LoadAddress => "LOAD_ADDRESS",
            Command::ProgFlash => "PROG_FLASH",
            Command::ReadFlash => "READ_FLASH",
            Command::ProgMulti => "PROG_MULTI",
            Command::ReadMulti => "READ_MULTI",
            Command::Reboot => "REBOOT",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Human readable name of a frequency code, as burned into the bootloader.
pub fn frequency_name(code: u8) -> &'static str {
    match code {
        FREQ_433 => "433MHz",
        FREQ_470 => "470MHz",
        FREQ_868 => "868MHz",
        FREQ_915 => "915MHz",
        FREQ_NONE => "none",
        _ => "unknown",
    }
}

pub fn board_name(id: u8) -> &'static str {
    match id {
        BOARD_RF50 => "RF50",
        BOARD_HM_TRP => "HM-TRP",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_byte_mapping_is_bijective() {
        for b in 0..=u8::MAX {
            if let Some(c) = Command::from_byte(b) {
                assert_eq!(c.byte(), b);
            }
        }
        assert_eq!(Command::from_byte(EOC), None);
        assert_eq!(Command::from_byte(FAILED), None);
    }

    #[test]
    fn test_eoc_only_commands() {
        let eoc_only: Vec<Command> = (0..=u8::MAX)
            .filter_map(Command::from_byte)
            .filter(|c| c.eoc_only())
            .collect();
        assert_eq!(
            eoc_only,
            vec![
                Command::GetSync,
                Command::GetDevice,
                Command::ChipErase,
                Command::ReadFlash,
                Command::ParamErase,
            ]
        );
    }
}
