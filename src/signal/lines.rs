use crate::framebuffer::{Framebuffer, Half, ROW_SAMPLES};
use crate::signal::{Level, LevelSink, LineType, TimingProfile, VideoStandard};

/// Black samples between the horizontal sync and the colorburst of an active line.
const BREEZEWAY: usize = 1;

/// Black samples between the colorburst and the first pixel.
const BURST_TO_PICTURE: usize = 11;

/// Black samples between the sync and the colorburst on blank lines.
const BLANK_BREEZEWAY: usize = 2;

/// Receiver compatibility tweaks. Neither is required by the broadcast standards, but some sets
/// lock on faster with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalPolicy {
    /// Fill blank lines with gray until the field's first picture line.
    pub gray_top_margin: bool,
    /// End each NTSC frame on a line filled with white instead of black.
    pub ntsc_white_tail: bool,
}

impl Default for SignalPolicy {
    fn default() -> Self {
        Self {
            gray_top_margin: true,
            ntsc_white_tail: true,
        }
    }
}

/// What the feeder has to do after a line was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    Continue,
    /// The frame is over: rewind the line counter and advance the frame number.
    FrameComplete,
}

/// Produces the waveform of each line type. Holds the only per-field state, the framebuffer row of
/// the next active line.
#[derive(Debug, Clone)]
pub struct LineGenerator {
    standard: VideoStandard,
    timing: TimingProfile,
    policy: SignalPolicy,
    field_row: usize,
}

impl LineGenerator {
    pub fn new(standard: VideoStandard, policy: SignalPolicy) -> Self {
        Self {
            standard,
            timing: standard.timing(),
            policy,
            field_row: 0,
        }
    }

    pub fn timing(&self) -> &TimingProfile {
        &self.timing
    }

    /// Framebuffer row the next active line will show.
    pub fn field_row(&self) -> usize {
        self.field_row
    }

    /// Emit exactly one line of `kind`. Active lines read from the `front` half of `fb`.
    pub fn emit<S: LevelSink>(
        &mut self,
        kind: LineType,
        sink: &mut S,
        fb: &Framebuffer,
        front: Half,
    ) -> LineEvent {
        match kind {
            LineType::ShortSync => self.short_sync(sink),
            LineType::LongSync => self.long_sync(sink),
            LineType::Black => self.black(sink),
            LineType::ShortToLong => self.short_to_long(sink),
            LineType::LongToShort => self.long_to_short(sink),
            LineType::ActiveLine => self.active_line(sink, fb, front),
            LineType::EndOfFrame => {
                self.end_of_frame(sink);
                return LineEvent::FrameComplete;
            }
        }
        LineEvent::Continue
    }

    /// Black fill for whatever is left of the line after `used` samples.
    fn rest(&self, used: usize) -> usize {
        self.timing.line_len.saturating_sub(used)
    }

    fn short_sync<S: LevelSink>(&mut self, sink: &mut S) {
        let t = self.timing;
        self.field_row = 0;

        sink.fill(t.short_sync, Level::Sync);
        sink.fill(t.long_sync, Level::Black);
        sink.fill(t.short_sync, Level::Sync);
        sink.fill(self.rest(2 * t.short_sync + t.long_sync), Level::Black);
    }

    fn long_sync<S: LevelSink>(&mut self, sink: &mut S) {
        let t = self.timing;
        let gap = match self.standard {
            VideoStandard::Pal => t.short_sync,
            VideoStandard::Ntsc => t.normal_sync,
        };

        sink.fill(t.long_sync, Level::Sync);
        sink.fill(gap, Level::Black);
        sink.fill(t.long_sync, Level::Sync);
        sink.fill(self.rest(2 * t.long_sync + gap), Level::Black);
    }

    fn black<S: LevelSink>(&mut self, sink: &mut S) {
        let t = self.timing;
        let fill = if self.policy.gray_top_margin && self.field_row < 1 {
            Level::Gray
        } else {
            Level::Black
        };

        sink.fill(t.normal_sync, Level::Sync);
        sink.fill(BLANK_BREEZEWAY, Level::Black);
        sink.fill(t.colorburst, Level::Colorburst);
        sink.fill(self.rest(t.normal_sync + BLANK_BREEZEWAY + t.colorburst), fill);
    }

    fn short_to_long<S: LevelSink>(&mut self, sink: &mut S) {
        let t = self.timing;
        let second = t.serration.unwrap_or(t.long_sync);

        sink.fill(t.short_sync, Level::Sync);
        sink.fill(t.long_sync, Level::Black);
        sink.fill(second, Level::Sync);
        sink.fill(self.rest(t.short_sync + t.long_sync + second), Level::Black);
    }

    fn long_to_short<S: LevelSink>(&mut self, sink: &mut S) {
        let t = self.timing;
        let (first, gap) = match t.serration {
            Some(serration) => (serration, t.normal_sync),
            None => (t.long_sync, t.short_sync),
        };

        sink.fill(first, Level::Sync);
        sink.fill(gap, Level::Black);
        sink.fill(t.short_sync, Level::Sync);
        sink.fill(self.rest(first + gap + t.short_sync), Level::Black);
    }

    fn active_line<S: LevelSink>(&mut self, sink: &mut S, fb: &Framebuffer, front: Half) {
        let t = self.timing;

        sink.fill(t.normal_sync, Level::Sync);
        sink.fill(BREEZEWAY, Level::Black);
        sink.fill(t.colorburst, Level::Colorburst);
        sink.fill(BURST_TO_PICTURE, Level::Black);

        match fb.row(front, self.field_row) {
            Some(row) => {
                for unit in row {
                    let packed = unit.get();
                    for nibble in 0..4 {
                        sink.put(Level::Pixel(((packed >> (nibble * 4)) & 0x0f) as u8));
                    }
                }
            }
            // More active lines than rows: show black rather than read past the half.
            None => sink.fill(ROW_SAMPLES, Level::Black),
        }

        sink.fill(
            self.rest(t.normal_sync + BREEZEWAY + t.colorburst + BURST_TO_PICTURE + ROW_SAMPLES),
            Level::Black,
        );
        self.field_row += 1;
    }

    fn end_of_frame<S: LevelSink>(&mut self, sink: &mut S) {
        let t = self.timing;
        match self.standard {
            VideoStandard::Pal => {
                sink.fill(t.short_sync, Level::Sync);
                sink.fill(t.long_sync, Level::Black);
                sink.fill(t.short_sync, Level::Sync);
                sink.fill(self.rest(2 * t.short_sync + t.long_sync), Level::Black);
            }
            VideoStandard::Ntsc => {
                let tail = if self.policy.ntsc_white_tail { Level::White } else { Level::Black };
                sink.fill(t.normal_sync, Level::Sync);
                sink.fill(BLANK_BREEZEWAY, Level::Black);
                sink.fill(t.colorburst, Level::Colorburst);
                sink.fill(self.rest(t.normal_sync + BLANK_BREEZEWAY + t.colorburst), tail);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::Canvas;

    const ALL_TYPES: [LineType; 7] = [
        LineType::ShortSync,
        LineType::LongSync,
        LineType::Black,
        LineType::ShortToLong,
        LineType::LongToShort,
        LineType::ActiveLine,
        LineType::EndOfFrame,
    ];

    fn line(generator: &mut LineGenerator, kind: LineType, fb: &Framebuffer) -> Vec<Level> {
        let mut levels = Vec::new();
        generator.emit(kind, &mut levels, fb, Half::A);
        levels
    }

    /// Lengths of the runs of sync level, in order.
    fn sync_pulses(levels: &[Level]) -> Vec<usize> {
        let mut pulses = Vec::new();
        let mut run = 0;
        for &level in levels.iter().chain(std::iter::once(&Level::Black)) {
            if level == Level::Sync {
                run += 1;
            } else if run > 0 {
                pulses.push(run);
                run = 0;
            }
        }
        pulses
    }

    #[test]
    fn every_line_fills_the_buffer_exactly() {
        for standard in [VideoStandard::Ntsc, VideoStandard::Pal] {
            let fb = Framebuffer::new(standard).unwrap();
            let bare = SignalPolicy { gray_top_margin: false, ntsc_white_tail: false };
            for policy in [SignalPolicy::default(), bare] {
                let mut generator = LineGenerator::new(standard, policy);
                for kind in ALL_TYPES {
                    let levels = line(&mut generator, kind, &fb);
                    assert_eq!(levels.len(), standard.timing().line_len, "{standard:?} {kind:?}");
                }
            }
        }
    }

    #[test]
    fn sync_pulse_shapes() {
        let fb = Framebuffer::new(VideoStandard::Ntsc).unwrap();
        let mut ntsc = LineGenerator::new(VideoStandard::Ntsc, SignalPolicy::default());
        assert_eq!(sync_pulses(&line(&mut ntsc, LineType::ShortSync, &fb)), [6, 6]);
        assert_eq!(sync_pulses(&line(&mut ntsc, LineType::LongSync, &fb)), [73, 73]);
        assert_eq!(sync_pulses(&line(&mut ntsc, LineType::ShortToLong, &fb)), [6, 67]);
        assert_eq!(sync_pulses(&line(&mut ntsc, LineType::LongToShort, &fb)), [67, 6]);
        assert_eq!(sync_pulses(&line(&mut ntsc, LineType::Black, &fb)), [12]);

        let fb = Framebuffer::new(VideoStandard::Pal).unwrap();
        let mut pal = LineGenerator::new(VideoStandard::Pal, SignalPolicy::default());
        assert_eq!(sync_pulses(&line(&mut pal, LineType::ShortSync, &fb)), [5, 5]);
        assert_eq!(sync_pulses(&line(&mut pal, LineType::LongSync, &fb)), [75, 75]);
        assert_eq!(sync_pulses(&line(&mut pal, LineType::ShortToLong, &fb)), [5, 75]);
        assert_eq!(sync_pulses(&line(&mut pal, LineType::LongToShort, &fb)), [75, 5]);
    }

    #[test]
    fn second_equalizing_pulse_sits_mid_line() {
        let fb = Framebuffer::new(VideoStandard::Ntsc).unwrap();
        let mut generator = LineGenerator::new(VideoStandard::Ntsc, SignalPolicy::default());
        let levels = line(&mut generator, LineType::ShortSync, &fb);
        assert_eq!(levels[78], Level::Black);
        assert_eq!(levels[79], Level::Sync);
    }

    #[test]
    fn gray_only_before_the_first_active_line() {
        let fb = Framebuffer::new(VideoStandard::Ntsc).unwrap();
        let mut generator = LineGenerator::new(VideoStandard::Ntsc, SignalPolicy::default());
        line(&mut generator, LineType::ShortSync, &fb);
        assert_eq!(line(&mut generator, LineType::Black, &fb).last(), Some(&Level::Gray));
        assert_eq!(line(&mut generator, LineType::Black, &fb).last(), Some(&Level::Gray));
        line(&mut generator, LineType::ActiveLine, &fb);
        assert_eq!(line(&mut generator, LineType::Black, &fb).last(), Some(&Level::Black));

        let policy = SignalPolicy { gray_top_margin: false, ..Default::default() };
        let mut plain = LineGenerator::new(VideoStandard::Ntsc, policy);
        assert_eq!(line(&mut plain, LineType::Black, &fb).last(), Some(&Level::Black));
    }

    #[test]
    fn ntsc_end_of_frame_tail() {
        let fb = Framebuffer::new(VideoStandard::Ntsc).unwrap();
        let mut generator = LineGenerator::new(VideoStandard::Ntsc, SignalPolicy::default());
        let mut levels = Vec::new();
        let event = generator.emit(LineType::EndOfFrame, &mut levels, &fb, Half::A);
        assert_eq!(event, LineEvent::FrameComplete);
        assert_eq!(levels.last(), Some(&Level::White));
        assert_eq!(levels.iter().filter(|&&l| l == Level::White).count(), 159 - 12 - 2 - 4);

        let policy = SignalPolicy { ntsc_white_tail: false, ..Default::default() };
        let mut plain = LineGenerator::new(VideoStandard::Ntsc, policy);
        assert!(!line(&mut plain, LineType::EndOfFrame, &fb).contains(&Level::White));
    }

    #[test]
    fn pal_end_of_frame_mirrors_short_sync() {
        let fb = Framebuffer::new(VideoStandard::Pal).unwrap();
        let mut generator = LineGenerator::new(VideoStandard::Pal, SignalPolicy::default());
        let end = line(&mut generator, LineType::EndOfFrame, &fb);
        let short = line(&mut generator, LineType::ShortSync, &fb);
        assert_eq!(end, short);
    }

    #[test]
    fn active_line_reads_consecutive_rows() {
        let fb = Framebuffer::new(VideoStandard::Ntsc).unwrap();
        let mut canvas = Canvas::new(fb.clone(), Half::A);
        canvas.tack_pixel(0, 0, 7);
        canvas.tack_pixel(3, 1, 12);

        let mut generator = LineGenerator::new(VideoStandard::Ntsc, SignalPolicy::default());
        line(&mut generator, LineType::ShortSync, &fb);
        let picture_start = 12 + BREEZEWAY + 4 + BURST_TO_PICTURE;

        let first = line(&mut generator, LineType::ActiveLine, &fb);
        assert_eq!(first[picture_start], Level::Pixel(7));
        assert_eq!(first[picture_start + 3], Level::Pixel(0));

        let second = line(&mut generator, LineType::ActiveLine, &fb);
        assert_eq!(second[picture_start], Level::Pixel(0));
        assert_eq!(second[picture_start + 3], Level::Pixel(12));
        assert_eq!(generator.field_row(), 2);
    }

    #[test]
    fn active_line_past_the_last_row_is_black() {
        let fb = Framebuffer::new(VideoStandard::Ntsc).unwrap();
        let mut generator = LineGenerator::new(VideoStandard::Ntsc, SignalPolicy::default());
        for _ in 0..fb.height() {
            line(&mut generator, LineType::ActiveLine, &fb);
        }
        let extra = line(&mut generator, LineType::ActiveLine, &fb);
        assert_eq!(extra.len(), 159);
        assert!(!extra.iter().any(|l| matches!(l, Level::Pixel(_))));
    }
}
