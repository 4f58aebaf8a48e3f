//! Reset-time policy: run the application, or stay in the bootloader.

use std::path::PathBuf;
use std::process;

use crate::dispatcher::Bootloader;
use crate::flash::{FlashInterface, FlashLayout};
use crate::protocol;
use crate::transport::ByteTransport;

/// Identity reported by GET_DEVICE and handed to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardInfo {
    pub board_id: u8,
    pub board_frequency: u8,
    pub bl_version: u8,
}

impl Default for BoardInfo {
    fn default() -> Self {
        Self {
            board_id: protocol::BOARD_HM_TRP,
            board_frequency: protocol::FREQ_NONE,
            bl_version: protocol::BL_VERSION,
        }
    }
}

/// Snapshot of the reset source flags (RSTSRC layout).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResetSource(pub u8);

impl ResetSource {
    pub const PIN: u8 = 1 << 0;
    pub const POWER_ON: u8 = 1 << 1;
    pub const MISSING_CLOCK: u8 = 1 << 2;
    pub const WATCHDOG: u8 = 1 << 3;
    pub const SOFTWARE: u8 = 1 << 4;
    pub const COMPARATOR: u8 = 1 << 5;
    pub const FLASH_ERROR: u8 = 1 << 6;

    pub fn power_on() -> Self {
        Self(Self::POWER_ON)
    }

    pub fn software() -> Self {
        Self(Self::SOFTWARE)
    }

    pub fn is_flash_error(self) -> bool {
        self.0 & Self::FLASH_ERROR != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootInputs {
    pub reset: ResetSource,
    pub app_valid: bool,
    /// The boot-to-bootloader strap or button is held.
    pub strap_asserted: bool,
}

/// Values the application reads at its own startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handoff {
    pub board_frequency: u8,
    pub bl_version: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootAction {
    Application { entry: u16, handoff: Handoff },
    CommandLoop,
}

/// Transfers control to application code. Never returns.
pub trait Jumper {
    fn jump(&mut self, entry: u16, handoff: &Handoff) -> !;
}

pub fn decide(inputs: &BootInputs, board: &BoardInfo, layout: &FlashLayout) -> BootAction {
    if !inputs.reset.is_flash_error() && inputs.app_valid && !inputs.strap_asserted {
        BootAction::Application {
            entry: layout.app_start,
            handoff: Handoff {
                board_frequency: board.board_frequency,
                bl_version: board.bl_version,
            },
        }
    } else {
        BootAction::CommandLoop
    }
}

/// Bootloader entry.
///
/// Either hands off to the application through `jumper`, or serves
/// commands until the host requests a reboot. `Ok(())` means the device
/// should reset now; the caller re-enters with [`ResetSource::software`].
pub fn start<T, F, J>(
    reset: ResetSource,
    strap_asserted: bool,
    transport: T,
    mut flash: F,
    board: BoardInfo,
    layout: &FlashLayout,
    jumper: &mut J,
) -> Result<(), T::Error>
where
    T: ByteTransport,
    F: FlashInterface,
    J: Jumper + ?Sized,
{
    let inputs = BootInputs {
        reset,
        app_valid: flash.app_valid(),
        strap_asserted,
    };
    tracing::debug!(?inputs, "boot decision");

    match decide(&inputs, &board, layout) {
        BootAction::Application { entry, handoff } => jumper.jump(entry, &handoff),
        BootAction::CommandLoop => {
            tracing::info!(
                board_id = board.board_id,
                frequency = protocol::frequency_name(board.board_frequency),
                "bootloader active"
            );
            let mut bootloader: Bootloader<T, F> = Bootloader::new(transport, flash, board);
            bootloader.run()
        }
    }
}

pub const ENV_BOARD_FREQUENCY: &str = "SIKBOOT_BOARD_FREQUENCY";
pub const ENV_BL_VERSION: &str = "SIKBOOT_BL_VERSION";
pub const ENV_ENTRY: &str = "SIKBOOT_ENTRY";

/// Hand-off for hosted runs: start the application as a child process with
/// the hand-off values in its environment, then exit with its status.
///
/// Without an application command the process just exits.
#[derive(Debug, Clone, Default)]
pub struct ProcessJumper {
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
}

impl Jumper for ProcessJumper {
    fn jump(&mut self, entry: u16, handoff: &Handoff) -> ! {
        tracing::info!(
            entry,
            frequency = handoff.board_frequency,
            bl_version = handoff.bl_version,
            "handing off to application"
        );

        let Some(program) = &self.program else {
            process::exit(0);
        };

        let status = process::Command::new(program)
            .args(&self.args)
            .env(ENV_BOARD_FREQUENCY, handoff.board_frequency.to_string())
            .env(ENV_BL_VERSION, handoff.bl_version.to_string())
            .env(ENV_ENTRY, format!("0x{entry:04X}"))
            .status();

        match status {
            Ok(s) => process::exit(s.code().unwrap_or(1)),
            Err(e) => {
                tracing::error!(program = %program.display(), "failed to start application: {e}");
                process::exit(127);
            }
        }
    }
}
