//! Flash seam used by the command dispatcher, and an in-memory model of the
//! Si1000 flash array.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

/// The flash primitives the bootloader core relies on.
///
/// Calls are treated as infallible. Out-of-range addresses are the
/// implementation's business to ignore or clamp.
pub trait FlashInterface {
    fn erase_app(&mut self);
    fn erase_scratch(&mut self);
    fn read_byte(&mut self, addr: u16) -> u8;
    fn write_byte(&mut self, addr: u16, value: u8);
    fn app_valid(&mut self) -> bool;
}

impl<F: FlashInterface + ?Sized> FlashInterface for &mut F {
    fn erase_app(&mut self) {
        (**self).erase_app()
    }

    fn erase_scratch(&mut self) {
        (**self).erase_scratch()
    }

    fn read_byte(&mut self, addr: u16) -> u8 {
        (**self).read_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        (**self).write_byte(addr, value)
    }

    fn app_valid(&mut self) -> bool {
        (**self).app_valid()
    }
}

pub const FLASH_SIZE: usize = 0x1_0000;

/// Where the board frequency byte is patched into the bootloader image.
pub const BOARD_FREQUENCY_ADDR: u16 = 0x03FF;

pub const APP_SIGNATURE: [u8; 2] = [0x3D, 0xC2];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashLayout {
    /// First application byte, and the hand-off entry point.
    pub app_start: u16,
    /// End of the application region; start of the scratch (parameter) pages.
    pub scratch_start: u16,
    /// Flash info / lock byte page. Never written through the protocol.
    pub info_page: u16,
    pub page_size: u16,
}

impl Default for FlashLayout {
    fn default() -> Self {
        Self {
            app_start: 0x0400,
            scratch_start: 0xF800,
            info_page: 0xFC00,
            page_size: 0x0400,
        }
    }
}

impl FlashLayout {
    /// Address of the first signature byte, just below the scratch pages.
    pub fn signature_addr(&self) -> u16 {
        self.scratch_start - APP_SIGNATURE.len() as u16
    }

    pub fn in_app(&self, addr: u16) -> bool {
        (self.app_start..self.scratch_start).contains(&addr)
    }

    pub fn writable(&self, addr: u16) -> bool {
        (self.app_start..self.info_page).contains(&addr)
    }
}

#[derive(Error, Debug)]
pub enum FlashImageError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("image is {len} bytes, larger than the {max} byte flash")]
    TooLarge { len: usize, max: usize },
}

/// NOR flash held in memory: erase sets bytes to 0xFF, programming can only
/// clear bits.
#[derive(Clone)]
pub struct MemoryFlash {
    layout: FlashLayout,
    data: Vec<u8>,
}

impl MemoryFlash {
    pub fn new(layout: FlashLayout) -> Self {
        Self {
            layout,
            data: vec![0xFF; FLASH_SIZE],
        }
    }

    pub fn with_data(layout: FlashLayout, initial: &[u8]) -> Result<Self, FlashImageError> {
        if initial.len() > FLASH_SIZE {
            return Err(FlashImageError::TooLarge {
                len: initial.len(),
                max: FLASH_SIZE,
            });
        }
        let mut flash = Self::new(layout);
        flash.data[..initial.len()].copy_from_slice(initial);
        Ok(flash)
    }

    /// Load a raw image file. A missing tail reads as erased flash.
    pub fn load(layout: FlashLayout, path: &Path) -> Result<Self, FlashImageError> {
        let bytes = fs::read(path)?;
        Self::with_data(layout, &bytes)
    }

    pub fn save(&self, path: &Path) -> Result<(), FlashImageError> {
        fs::write(path, &self.data)?;
        Ok(())
    }

    /// Write the application signature so the image counts as valid.
    pub fn sign_app(&mut self) {
        let at = self.layout.signature_addr() as usize;
        for (i, b) in APP_SIGNATURE.iter().enumerate() {
            self.data[at + i] = *b;
        }
    }

    pub fn board_frequency(&self) -> u8 {
        self.data[BOARD_FREQUENCY_ADDR as usize]
    }

    fn erase_range(&mut self, start: u16, end: u16) {
        self.data[start as usize..end as usize].fill(0xFF);
    }
}

impl FlashInterface for MemoryFlash {
    fn erase_app(&mut self) {
        tracing::debug!(
            start = self.layout.app_start,
            end = self.layout.scratch_start,
            "erase application"
        );
        self.erase_range(self.layout.app_start, self.layout.scratch_start);
    }

    fn erase_scratch(&mut self) {
        tracing::debug!(
            start = self.layout.scratch_start,
            end = self.layout.info_page,
            "erase scratch"
        );
        self.erase_range(self.layout.scratch_start, self.layout.info_page);
    }

    fn read_byte(&mut self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        if !self.layout.writable(addr) {
            tracing::trace!(addr, "write outside application/scratch ignored");
            return;
        }
        self.data[addr as usize] &= value;
    }

    fn app_valid(&mut self) -> bool {
        let first = self.data[self.layout.app_start as usize];
        let at = self.layout.signature_addr() as usize;
        first != 0xFF && self.data[at..at + APP_SIGNATURE.len()] == APP_SIGNATURE
    }
}
