//! Runs the bootloader core against a file-backed flash image, so host
//! tooling can be exercised without a radio.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::boot::{self, BoardInfo, Jumper, ResetSource};
use crate::flash::{FlashImageError, FlashLayout, MemoryFlash};
use crate::protocol;
use crate::transport::ByteTransport;

#[derive(Debug, Clone)]
pub struct EmulatorOptions {
    /// Raw 64 KiB flash image. Created on first save when missing.
    pub image: PathBuf,
    pub layout: FlashLayout,
    pub board_id: u8,
    /// When unset, the frequency byte patched into the image is reported.
    pub board_frequency: Option<u8>,
    pub strap_asserted: bool,
    /// Stop after this many resets instead of serving forever.
    pub max_resets: Option<u32>,
}

impl Default for EmulatorOptions {
    fn default() -> Self {
        Self {
            image: PathBuf::from("flash.bin"),
            layout: FlashLayout::default(),
            board_id: protocol::BOARD_HM_TRP,
            board_frequency: None,
            strap_asserted: false,
            max_resets: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("flash image: {0}")]
    Image(#[from] FlashImageError),

    #[error("link closed: {0}")]
    Link(#[source] io::Error),
}

pub fn load_image(opts: &EmulatorOptions) -> Result<MemoryFlash, FlashImageError> {
    if !opts.image.exists() {
        tracing::info!(image = %opts.image.display(), "no flash image yet, starting blank");
        return Ok(MemoryFlash::new(opts.layout));
    }
    MemoryFlash::load(opts.layout, &opts.image)
}

/// Power the emulated device on and keep it running across resets.
///
/// The image is written back after every reset and when the link closes.
/// Returns the number of resets served once `max_resets` is reached.
pub fn serve<T, J>(
    mut transport: T,
    opts: &EmulatorOptions,
    jumper: &mut J,
) -> Result<u32, EmulatorError>
where
    T: ByteTransport<Error = io::Error>,
    J: Jumper + ?Sized,
{
    let mut flash = load_image(opts)?;
    let board = BoardInfo {
        board_id: opts.board_id,
        board_frequency: opts
            .board_frequency
            .unwrap_or_else(|| flash.board_frequency()),
        bl_version: protocol::BL_VERSION,
    };

    let mut reset = ResetSource::power_on();
    let mut resets: u32 = 0;
    loop {
        let r = boot::start(
            reset,
            opts.strap_asserted,
            &mut transport,
            &mut flash,
            board,
            &opts.layout,
            jumper,
        );
        flash.save(&opts.image)?;

        match r {
            Ok(()) => {
                resets = resets.saturating_add(1);
                tracing::info!(resets, "software reset");
                if opts.max_resets.is_some_and(|m| resets >= m) {
                    return Ok(resets);
                }
                reset = ResetSource::software();
            }
            Err(e) => return Err(EmulatorError::Link(e)),
        }
    }
}
