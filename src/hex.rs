use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::flash::{FlashLayout, APP_SIGNATURE, FLASH_SIZE};

/// A contiguous run of loaded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub addr: u16,
    pub len: usize,
}

pub struct FirmwareImage {
    pub data: Vec<u8>,
    pub byte_count: usize,
    pub segments: Vec<Segment>,
}

impl FirmwareImage {
    pub fn load(path: &Path, layout: &FlashLayout) -> Result<Self, HexError> {
        let f = File::open(path).map_err(HexError::Io)?;
        Self::parse(BufReader::new(f), layout)
    }

    pub fn parse<R: BufRead>(r: R, layout: &FlashLayout) -> Result<Self, HexError> {
        let mut data = vec![0xFFu8; FLASH_SIZE];
        let mut mask = vec![false; FLASH_SIZE];
        let mut byte_count: usize = 0;

        let mut ext_addr: u32 = 0;

        for (line_no, line) in r.lines().enumerate() {
            let line_no = line_no + 1;
            let line = match line {
                Ok(s) => s,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    return Err(HexError::NotText { line_no });
                }
                Err(e) => return Err(HexError::Io(e)),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(body) = line.strip_prefix(':') else {
                return Err(HexError::InvalidLine {
                    line_no,
                    msg: "missing ':' prefix".to_string(),
                });
            };

            let bytes =
                decode_hex_bytes(body).map_err(|e| HexError::InvalidLine { line_no, msg: e })?;

            if bytes.len() < 5 {
                return Err(HexError::InvalidLine {
                    line_no,
                    msg: "record too short".to_string(),
                });
            }

            let len = bytes[0] as usize;
            let addr = u16::from_be_bytes([bytes[1], bytes[2]]) as u32;
            let rec_type = bytes[3];

            if bytes.len() != 5 + len {
                return Err(HexError::InvalidLine {
                    line_no,
                    msg: format!(
                        "bad length (expected {} bytes after ':', got {})",
                        2 * (5 + len),
                        2 * bytes.len()
                    ),
                });
            }

            let payload = &bytes[4..4 + len];
            let checksum = bytes[4 + len];
            if checksum != checksum_ihex(&bytes[0..4 + len]) {
                return Err(HexError::InvalidChecksum { line_no });
            }

            match rec_type {
                0x00 => {
                    byte_count = byte_count.saturating_add(len);
                    for (i, b) in payload.iter().copied().enumerate() {
                        let abs = ext_addr
                            .checked_add(addr)
                            .and_then(|v| v.checked_add(i as u32))
                            .ok_or(HexError::AddressOverflow { line_no })?;
                        let at = app_offset(abs, layout)
                            .ok_or(HexError::AddressOutOfRange { line_no, addr: abs })?;
                        data[at] = b;
                        mask[at] = true;
                    }
                }
                0x01 => break,
                0x02 => {
                    if len == 2 {
                        let seg = u16::from_be_bytes([payload[0], payload[1]]) as u32;
                        ext_addr = seg << 4;
                    }
                }
                0x04 => {
                    if len == 2 {
                        let hi = u16::from_be_bytes([payload[0], payload[1]]) as u32;
                        ext_addr = hi << 16;
                    }
                }
                _ => {}
            }
        }

        let segments = runs(&mask);
        tracing::debug!(byte_count, segments = segments.len(), "hex parsed");

        Ok(Self {
            data,
            byte_count,
            segments,
        })
    }

    pub fn segment_data(&self, seg: &Segment) -> &[u8] {
        let start = seg.addr as usize;
        &self.data[start..start + seg.len]
    }

    /// Whether the image carries the signature the bootloader checks before
    /// handing off. An unsigned image stays in the bootloader after reboot.
    pub fn is_signed(&self, layout: &FlashLayout) -> bool {
        let at = layout.signature_addr() as usize;
        self.data[layout.app_start as usize] != 0xFF
            && self.data[at..at + APP_SIGNATURE.len()] == APP_SIGNATURE
    }
}

#[derive(Error, Debug)]
pub enum HexError {
    #[error("io: {0}")]
    Io(io::Error),

    #[error(
        "input is not a text Intel HEX file (invalid UTF-8 at line {line_no}); did you pass a .bin?"
    )]
    NotText { line_no: usize },

    #[error("invalid hex line {line_no}: {msg}")]
    InvalidLine { line_no: usize, msg: String },

    #[error("invalid checksum at line {line_no}")]
    InvalidChecksum { line_no: usize },

    #[error("address overflow at line {line_no}")]
    AddressOverflow { line_no: usize },

    #[error("address outside the application region at line {line_no}: 0x{addr:05X}")]
    AddressOutOfRange { line_no: usize, addr: u32 },
}

fn app_offset(addr: u32, layout: &FlashLayout) -> Option<usize> {
    let a = u16::try_from(addr).ok()?;
    if layout.in_app(a) {
        Some(a as usize)
    } else {
        None
    }
}

fn runs(mask: &[bool]) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, used) in mask.iter().copied().enumerate() {
        match (used, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push(Segment {
                    addr: s as u16,
                    len: i - s,
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(Segment {
            addr: s as u16,
            len: mask.len() - s,
        });
    }
    out
}

fn decode_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("odd number of hex digits".to_string());
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let hi = from_hex_digit(bytes[i]).ok_or_else(|| "invalid hex digit".to_string())?;
        let lo = from_hex_digit(bytes[i + 1]).ok_or_else(|| "invalid hex digit".to_string())?;
        out.push((hi << 4) | lo);
        i += 2;
    }
    Ok(out)
}

fn from_hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn checksum_ihex(bytes: &[u8]) -> u8 {
    let sum: u8 = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    (!sum).wrapping_add(1)
}
