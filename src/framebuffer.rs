//! Double-buffered pixel store and the pixel encoder that writes into it.
//!
//! Each half holds one field's worth of rows. A row is 29 16-bit units, and every unit packs four
//! 4-bit codes, lowest nibble first, which the active line generator turns into four samples. The
//! same bits can be read two ways:
//!
//! * single density: one code (0-15) per nibble, 116 pixels per row;
//! * double density: one bit per 2-bit field, 232 black/white pixels per row.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use crate::error::BroadcastError;
use crate::signal::VideoStandard;
use crate::types::PixelCode;

/// Row width in double-density pixels.
pub const WIDTH: usize = 232;

/// Row width in single-density pixels.
pub const SD_WIDTH: usize = WIDTH / 2;

/// 16-bit storage units per row.
pub const ROW_UNITS: usize = WIDTH / 8;

/// Samples one row turns into.
pub const ROW_SAMPLES: usize = ROW_UNITS * 4;

/// Highest valid color code.
pub const MAX_COLOR_CODE: PixelCode = Color::DdWhite as PixelCode;

/// The named palette. Codes 0-15 are single-density levels (what they look like depends on the
/// receiver), 16 and 17 are the two double-density levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    DarkGray,
    StripedGray1,
    Green1,
    Turquoise,
    LightBlue,
    DarkBlue,
    Red,
    StripedGray2,
    Green2,
    White,
    LightYellow,
    BabyBlue1,
    BabyBlue2,
    LightGray,
    LightPink,
    DdBlack = 16,
    DdWhite = 17,
}

impl Color {
    pub const SINGLE_DENSITY: [Color; 16] = [
        Color::Black,
        Color::DarkGray,
        Color::StripedGray1,
        Color::Green1,
        Color::Turquoise,
        Color::LightBlue,
        Color::DarkBlue,
        Color::Red,
        Color::StripedGray2,
        Color::Green2,
        Color::White,
        Color::LightYellow,
        Color::BabyBlue1,
        Color::BabyBlue2,
        Color::LightGray,
        Color::LightPink,
    ];

    pub fn from_code(code: PixelCode) -> Option<Color> {
        match code {
            0..=15 => Some(Self::SINGLE_DENSITY[code as usize]),
            16 => Some(Color::DdBlack),
            17 => Some(Color::DdWhite),
            _ => None,
        }
    }

    pub fn code(self) -> PixelCode {
        self as PixelCode
    }

    pub fn is_double_density(self) -> bool {
        self.code() >= Color::DdBlack.code()
    }
}

/// One of the two framebuffer halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Half {
    A,
    B,
}

impl Half {
    /// The half being transmitted during `frame`.
    pub fn front(frame: u32) -> Half {
        if frame & 1 == 0 { Half::A } else { Half::B }
    }

    /// The half the client may draw into during `frame`.
    pub fn back(frame: u32) -> Half {
        Self::front(frame).other()
    }

    pub fn other(self) -> Half {
        match self {
            Half::A => Half::B,
            Half::B => Half::A,
        }
    }
}

/// Four packed codes. Atomic so the interrupt side can read a row while the main line writes the
/// other half without either holding a lock.
#[derive(Debug, Default)]
pub struct PackedUnit(AtomicU16);

impl PackedUnit {
    pub fn get(&self) -> u16 {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, value: u16) {
        self.0.store(value, Ordering::Relaxed);
    }

    /// Replace the bits under `mask` with `bits`.
    fn update(&self, mask: u16, bits: u16) {
        let value = self.get();
        self.set((value & !mask) | (bits & mask));
    }
}

struct Storage {
    units: Box<[PackedUnit]>,
    height: usize,
}

/// Handle to the shared framebuffer allocation. Clones refer to the same pixels.
#[derive(Clone)]
pub struct Framebuffer {
    storage: Arc<Storage>,
}

impl Framebuffer {
    /// Allocate both halves for `standard`, zeroed.
    pub fn new(standard: VideoStandard) -> Result<Self, BroadcastError> {
        let height = standard.timing().field_height;
        let len = ROW_UNITS * height * 2;

        let mut units = Vec::new();
        units.try_reserve_exact(len).map_err(|_| BroadcastError::Allocation {
            what: "framebuffer",
            bytes: len * std::mem::size_of::<PackedUnit>(),
        })?;
        units.resize_with(len, PackedUnit::default);

        Ok(Self {
            storage: Arc::new(Storage {
                units: units.into_boxed_slice(),
                height,
            }),
        })
    }

    /// Width in double-density pixels.
    pub fn width(&self) -> usize {
        WIDTH
    }

    /// Rows per half.
    pub fn height(&self) -> usize {
        self.storage.height
    }

    /// Size of both halves in bytes.
    pub fn storage_bytes(&self) -> usize {
        self.storage.units.len() * std::mem::size_of::<u16>()
    }

    /// All units of one half.
    pub fn half(&self, half: Half) -> &[PackedUnit] {
        let (a, b) = self.storage.units.split_at(self.storage.units.len() / 2);
        match half {
            Half::A => a,
            Half::B => b,
        }
    }

    /// One row of one half, or `None` past the last row.
    pub fn row(&self, half: Half, row: usize) -> Option<&[PackedUnit]> {
        let start = row * ROW_UNITS;
        self.half(half).get(start..start + ROW_UNITS)
    }
}

/// Pixel encoder bound to one framebuffer half. Hand one out per frame; a canvas kept across a
/// flip ends up drawing into the half being transmitted.
pub struct Canvas {
    fb: Framebuffer,
    half: Half,
}

impl Canvas {
    pub fn new(fb: Framebuffer, half: Half) -> Self {
        Self { fb, half }
    }

    pub fn half(&self) -> Half {
        self.half
    }

    /// Width in double-density pixels. Single-density pixels are twice as wide.
    pub fn width(&self) -> usize {
        self.fb.width()
    }

    pub fn height(&self) -> usize {
        self.fb.height()
    }

    /// Zero every pixel of the half.
    pub fn clear(&mut self) {
        for unit in self.fb.half(self.half) {
            unit.set(0);
        }
    }

    /// Set a pixel. Codes 0-15 are single-density, `x` in `0..width()/2`. Codes 16 and 17 are
    /// double-density black and white, `x` in `0..width()`. Anything out of range is ignored.
    pub fn tack_pixel(&mut self, x: usize, y: usize, code: PixelCode) {
        if y >= self.fb.height() || code > MAX_COLOR_CODE {
            return;
        }
        let units = self.fb.half(self.half);

        if code < Color::DdBlack.code() {
            if x >= SD_WIDTH {
                return;
            }
            let shift = (x % 4) * 4;
            units[y * ROW_UNITS + x / 4].update(0x0f << shift, (code as u16) << shift);
        } else {
            if x >= WIDTH {
                return;
            }
            let bit = 1 << ((x % 8) * 2);
            let value = if code == Color::DdWhite.code() { bit } else { 0 };
            units[y * ROW_UNITS + x / 8].update(bit, value);
        }
    }

    /// Shorthand for `tack_pixel` with a palette entry.
    pub fn set(&mut self, x: usize, y: usize, color: Color) {
        self.tack_pixel(x, y, color.code());
    }

    /// The single-density code at (x, y).
    pub fn pixel(&self, x: usize, y: usize) -> Option<PixelCode> {
        if x >= SD_WIDTH || y >= self.fb.height() {
            return None;
        }
        let unit = self.fb.half(self.half)[y * ROW_UNITS + x / 4].get();
        Some(((unit >> ((x % 4) * 4)) & 0x0f) as PixelCode)
    }

    /// Whether the double-density pixel at (x, y) is white.
    pub fn is_lit(&self, x: usize, y: usize) -> Option<bool> {
        if x >= WIDTH || y >= self.fb.height() {
            return None;
        }
        let unit = self.fb.half(self.half)[y * ROW_UNITS + x / 8].get();
        Some(unit & (1 << ((x % 8) * 2)) != 0)
    }
}
