use crate::signal::VideoStandard;

/// The kind of waveform a single transmitted line carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LineType {
    /// Two equalizing pulses. Starts a field.
    ShortSync = 0,
    /// Two broad pulses of the vertical sync.
    LongSync = 1,
    /// Blanked line with horizontal sync and colorburst.
    Black = 2,
    /// Equalizing pulse, then a broad pulse from mid-line.
    ShortToLong = 3,
    /// Broad pulse, then an equalizing pulse at mid-line.
    LongToShort = 4,
    /// A framebuffer row.
    ActiveLine = 5,
    /// Closes the frame and flips the framebuffer halves.
    EndOfFrame = 6,
}

impl LineType {
    pub fn from_code(code: u8) -> Option<LineType> {
        Some(match code {
            0 => LineType::ShortSync,
            1 => LineType::LongSync,
            2 => LineType::Black,
            3 => LineType::ShortToLong,
            4 => LineType::LongToShort,
            5 => LineType::ActiveLine,
            6 => LineType::EndOfFrame,
            _ => return None,
        })
    }
}

/// Expand runs of line types into packed nibbles, even lines in the low nibble.
const fn pack<const N: usize>(runs: &[(LineType, usize)]) -> [u8; N] {
    let mut table = [0u8; N];
    let mut line = 0;
    let mut run = 0;
    while run < runs.len() {
        let (kind, count) = runs[run];
        let mut i = 0;
        while i < count {
            let code = kind as u8;
            table[line >> 1] |= if line & 1 == 0 { code } else { code << 4 };
            line += 1;
            i += 1;
        }
        run += 1;
    }
    assert!(line <= N * 2, "line runs overflow the table");
    table
}

use LineType::*;

/// NTSC: 525 lines, 220 framebuffer rows per field. The second field's vertical interval is
/// offset by half a line through the transition pulses. The last nibble is never reached.
pub static NTSC_LINE_MAP: [u8; 263] = pack(&[
    // Field one.
    (ShortSync, 3),
    (LongSync, 3),
    (ShortSync, 3),
    (Black, 11),
    (ActiveLine, 220),
    (Black, 22),
    // Field two.
    (ShortSync, 3),
    (ShortToLong, 1),
    (LongSync, 2),
    (LongToShort, 1),
    (ShortSync, 3),
    (Black, 11),
    (ActiveLine, 220),
    (Black, 21),
    (EndOfFrame, 1),
]);

/// PAL: 625 lines, 264 framebuffer rows per field. The last nibble is never reached.
pub static PAL_LINE_MAP: [u8; 313] = pack(&[
    // Field one.
    (LongSync, 2),
    (LongToShort, 1),
    (ShortSync, 2),
    (Black, 17),
    (ActiveLine, 264),
    (Black, 24),
    (ShortSync, 2),
    // Field two.
    (ShortToLong, 1),
    (LongSync, 2),
    (ShortSync, 3),
    (Black, 17),
    (ActiveLine, 264),
    (Black, 23),
    (ShortSync, 2),
    (EndOfFrame, 1),
]);

/// Selects the line type for each position in the frame.
#[derive(Debug, Clone, Copy)]
pub struct VerticalTimingMap {
    codes: &'static [u8],
}

impl VerticalTimingMap {
    pub fn for_standard(standard: VideoStandard) -> Self {
        let codes: &'static [u8] = match standard {
            VideoStandard::Ntsc => &NTSC_LINE_MAP,
            VideoStandard::Pal => &PAL_LINE_MAP,
        };
        Self { codes }
    }

    /// The packed table.
    pub fn codes(&self) -> &'static [u8] {
        self.codes
    }

    /// Number of line positions the table can address.
    pub fn positions(&self) -> usize {
        self.codes.len() * 2
    }

    /// The line type at `line`, counted from the start of the frame. Positions past the end of the
    /// table close the frame so the counters recover.
    pub fn line_type(&self, line: usize) -> LineType {
        let Some(&packed) = self.codes.get(line >> 1) else {
            return LineType::EndOfFrame;
        };
        let code = if line & 1 == 1 { packed >> 4 } else { packed & 0x0f };
        LineType::from_code(code).unwrap_or(LineType::Black)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(standard: VideoStandard) -> Vec<LineType> {
        let map = VerticalTimingMap::for_standard(standard);
        let mut lines = Vec::new();
        for line in 0..map.positions() {
            let kind = map.line_type(line);
            lines.push(kind);
            if kind == EndOfFrame {
                break;
            }
        }
        lines
    }

    #[test]
    fn every_code_is_a_line_type() {
        for standard in [VideoStandard::Ntsc, VideoStandard::Pal] {
            let map = VerticalTimingMap::for_standard(standard);
            for &byte in map.codes() {
                assert!(LineType::from_code(byte & 0x0f).is_some());
                assert!(LineType::from_code(byte >> 4).is_some());
            }
        }
    }

    #[test]
    fn frame_line_counts() {
        assert_eq!(frame(VideoStandard::Ntsc).len(), 525);
        assert_eq!(frame(VideoStandard::Pal).len(), 625);
    }

    #[test]
    fn one_end_of_frame_at_the_end() {
        for standard in [VideoStandard::Ntsc, VideoStandard::Pal] {
            let lines = frame(standard);
            assert_eq!(lines.iter().filter(|&&l| l == EndOfFrame).count(), 1);
            assert_eq!(lines.last(), Some(&EndOfFrame));
        }
    }

    #[test]
    fn active_lines_cover_both_fields() {
        for standard in [VideoStandard::Ntsc, VideoStandard::Pal] {
            let active = frame(standard).iter().filter(|&&l| l == ActiveLine).count();
            assert_eq!(active, 2 * standard.timing().field_height);
        }
    }

    #[test]
    fn vertical_sync_groups() {
        let ntsc = frame(VideoStandard::Ntsc);
        assert_eq!(&ntsc[..9], &[ShortSync, ShortSync, ShortSync, LongSync, LongSync, LongSync,
            ShortSync, ShortSync, ShortSync]);
        assert_eq!(ntsc[265], ShortToLong);
        assert_eq!(ntsc[268], LongToShort);

        let pal = frame(VideoStandard::Pal);
        assert_eq!(&pal[..5], &[LongSync, LongSync, LongToShort, ShortSync, ShortSync]);
        assert_eq!(pal[312], ShortToLong);
    }

    #[test]
    fn nibble_order() {
        // Even positions live in the low nibble.
        assert_eq!(NTSC_LINE_MAP[1], (LongSync as u8) << 4 | ShortSync as u8);
    }

    #[test]
    fn past_the_end_closes_the_frame() {
        let map = VerticalTimingMap::for_standard(VideoStandard::Ntsc);
        assert_eq!(map.line_type(10_000), EndOfFrame);
    }
}
