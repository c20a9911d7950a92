use once_cell::sync::Lazy;
use crate::types::{PixelCode, Sample, SignalFloat, PI};
use crate::signal::{phase, RF_CYCLES_PER_BIT, SAMPLE_BITS, SUBCARRIER_CYCLES_PER_BIT};

/// The number of table entries before the pattern repeats. 44 samples hold exactly 63 cycles of
/// the color subcarrier and 330 cycles of the RF carrier, so wrapping the cursor keeps both phases
/// continuous.
pub const TABLE_ENTRIES: usize = 44;

/// Carrier amplitude at blanking level. Modulation is negative, so sync sits above it and picture
/// content below.
pub const BLANK_AMPLITUDE: SignalFloat = 0.75;

/// Carrier amplitude at peak white.
pub const WHITE_AMPLITUDE: SignalFloat = 0.125;

/// Video level of the sync tip relative to blanking (0.0) and white (1.0).
const SYNC_VIDEO: SignalFloat = -0.4;

const GRAY_VIDEO: SignalFloat = 0.5;

/// Peak deviation of the colorburst around blanking.
const BURST_VIDEO: SignalFloat = 0.2;

/// Something the line generators can emit levels into. The real path modulates into transmission
/// buffers, tests collect the raw levels.
pub trait LevelSink {
    /// Append a single sample of the given level.
    fn put(&mut self, level: Level);

    /// Append `qty` samples of the given level.
    fn fill(&mut self, qty: usize, level: Level) {
        for _ in 0..qty {
            self.put(level);
        }
    }
}

impl LevelSink for Vec<Level> {
    fn put(&mut self, level: Level) {
        self.push(level);
    }
}

/// A column of the waveform table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// A framebuffer code. Each of the four bits lights one quarter of the sample at white level,
    /// lowest bit first.
    Pixel(PixelCode),
    Sync,
    Colorburst,
    Black,
    Gray,
    White,
}

impl Level {
    /// The number of columns in the table.
    pub const COUNT: usize = 21;

    pub fn column(self) -> usize {
        match self {
            Level::Pixel(code) => (code & 0x0f) as usize,
            Level::Sync => 16,
            Level::Colorburst => 17,
            Level::Black => 18,
            Level::Gray => 19,
            Level::White => 20,
        }
    }

    fn from_column(column: usize) -> Level {
        match column {
            16 => Level::Sync,
            17 => Level::Colorburst,
            18 => Level::Black,
            19 => Level::Gray,
            20 => Level::White,
            code => Level::Pixel(code as PixelCode),
        }
    }

    /// The baseband video level at the given bit of a sample, where `subcarrier` is the color
    /// subcarrier phase in cycles.
    fn video(self, bit: usize, subcarrier: SignalFloat) -> SignalFloat {
        match self {
            Level::Pixel(code) => {
                let quarter = bit / (SAMPLE_BITS / 4);
                if code & (1 << quarter) != 0 { 1.0 } else { 0.0 }
            }
            Level::Sync => SYNC_VIDEO,
            Level::Colorburst => BURST_VIDEO * SignalFloat::sin(2.0 * PI * subcarrier + PI),
            Level::Black => 0.0,
            Level::Gray => GRAY_VIDEO,
            Level::White => 1.0,
        }
    }
}

/// Convert a baseband video level into the carrier amplitude (negative modulation).
pub fn video_to_amplitude(video: SignalFloat) -> SignalFloat {
    let video = SignalFloat::clamp(video, SYNC_VIDEO, 1.0);
    BLANK_AMPLITUDE - video * (BLANK_AMPLITUDE - WHITE_AMPLITUDE)
}

/// Convert a carrier amplitude back into a baseband video level.
pub fn amplitude_to_video(amplitude: SignalFloat) -> SignalFloat {
    (BLANK_AMPLITUDE - amplitude) / (BLANK_AMPLITUDE - WHITE_AMPLITUDE)
}

/// Pre-modulated sample words, one row of `Level::COUNT` words per table entry. The table is a
/// ring: consecutive samples take consecutive entries and the cursor wraps at the end.
pub struct WaveformTable {
    words: Box<[Sample]>,
}

static PREMODULATED: Lazy<WaveformTable> = Lazy::new(WaveformTable::new);

impl WaveformTable {
    /// The process-wide table. Built on first use, read-only afterwards.
    pub fn shared() -> &'static WaveformTable {
        &PREMODULATED
    }

    /// Build the table by sigma-delta modulating every level onto the RF carrier.
    ///
    /// The loop error is a phasor at the carrier frequency: each bit goes whichever way pulls the
    /// accumulated error, seen at that bit's carrier phase, back towards zero. The error stays
    /// bounded, so every word carries its target envelope to within a few percent.
    pub fn new() -> Self {
        let mut words = vec![0; TABLE_ENTRIES * Level::COUNT].into_boxed_slice();

        for column in 0..Level::COUNT {
            let level = Level::from_column(column);
            let (mut err_re, mut err_im): (SignalFloat, SignalFloat) = (0.0, 0.0);

            // The first pass only settles the modulator so the ring wraps without a seam.
            for pass in 0..2 {
                for entry in 0..TABLE_ENTRIES {
                    let mut word: Sample = 0;
                    for bit in 0..SAMPLE_BITS {
                        let n = entry * SAMPLE_BITS + bit;
                        let video = level.video(bit, phase(SUBCARRIER_CYCLES_PER_BIT, n));
                        let angle = 2.0 * PI * phase(RF_CYCLES_PER_BIT, n);
                        let (sin, cos) = SignalFloat::sin_cos(angle);
                        let target = video_to_amplitude(video) * cos;

                        let seen = target + err_re * cos + err_im * sin;
                        let out = if seen >= 0.0 { 1.0 } else { -1.0 };
                        err_re += (target - out) * cos;
                        err_im += (target - out) * sin;
                        if out > 0.0 {
                            word |= 1 << (SAMPLE_BITS - 1 - bit);
                        }
                    }
                    if pass == 1 {
                        words[entry * Level::COUNT + column] = word;
                    }
                }
            }
        }

        Self { words }
    }

    /// The sample for `level` at the given table entry.
    pub fn sample(&self, entry: usize, level: Level) -> Sample {
        self.words[(entry % TABLE_ENTRIES) * Level::COUNT + level.column()]
    }

    /// Recover the level of a sample known to come from `entry`. Columns that describe the same
    /// signal (black and pixel code 0, white and pixel code 15) resolve to the pixel code.
    pub fn decode(&self, entry: usize, sample: Sample) -> Option<Level> {
        let start = (entry % TABLE_ENTRIES) * Level::COUNT;
        self.words[start..start + Level::COUNT]
            .iter()
            .position(|&word| word == sample)
            .map(Level::from_column)
    }
}

impl Default for WaveformTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Position of the next sample within the waveform table ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCursor(usize);

impl TableCursor {
    pub fn entry(self) -> usize {
        self.0
    }

    fn advance(&mut self) {
        self.0 += 1;
        if self.0 == TABLE_ENTRIES {
            self.0 = 0;
        }
    }
}

/// Modulates levels straight into a transmission buffer.
pub struct Modulator<'a> {
    table: &'a WaveformTable,
    cursor: &'a mut TableCursor,
    out: &'a mut [Sample],
    pos: usize,
}

impl<'a> Modulator<'a> {
    pub fn new(
        table: &'a WaveformTable,
        cursor: &'a mut TableCursor,
        out: &'a mut [Sample],
    ) -> Self {
        Self { table, cursor, out, pos: 0 }
    }

    /// How many samples have been emitted so far, including any that did not fit.
    pub fn emitted(&self) -> usize {
        self.pos
    }
}

impl<'a> LevelSink for Modulator<'a> {
    fn put(&mut self, level: Level) {
        // A generator overrunning the buffer is a bug, but the interrupt path must not panic.
        if let Some(slot) = self.out.get_mut(self.pos) {
            *slot = self.table.sample(self.cursor.entry(), level);
        }
        self.pos += 1;
        self.cursor.advance();
    }
}
