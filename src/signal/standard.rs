use std::time::Duration;

/// The broadcast standard to generate. Fixed for the lifetime of a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoStandard {
    Ntsc,
    Pal,
}

impl VideoStandard {
    /// The timing constants for this standard.
    pub fn timing(self) -> TimingProfile {
        match self {
            VideoStandard::Ntsc => TimingProfile::NTSC,
            VideoStandard::Pal => TimingProfile::PAL,
        }
    }

    /// The number of scan lines in a full interlaced frame.
    pub fn frame_lines(self) -> usize {
        match self {
            VideoStandard::Ntsc => 525,
            VideoStandard::Pal => 625,
        }
    }

    /// Frames per second, used to pace the frame notification timer.
    pub fn frame_rate(self) -> u64 {
        match self {
            VideoStandard::Ntsc => 60,
            VideoStandard::Pal => 50,
        }
    }

    /// The period of the frame notification timer, truncated to whole milliseconds.
    pub fn frame_period(self) -> Duration {
        Duration::from_millis(1000 / self.frame_rate())
    }
}

/// Per-standard durations, all counted in samples (400ns each).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProfile {
    /// Samples in one transmission buffer, which carries exactly one scan line.
    pub line_len: usize,
    /// Equalizing pulse.
    pub short_sync: usize,
    /// Broad (vertical sync) pulse.
    pub long_sync: usize,
    /// Horizontal sync pulse, also used as the gap between NTSC broad pulses.
    pub normal_sync: usize,
    /// NTSC only: the shortened broad pulse bridging equalizing and vertical sync.
    pub serration: Option<usize>,
    pub colorburst: usize,
    /// Framebuffer rows shown per field.
    pub field_height: usize,
}

impl TimingProfile {
    pub const NTSC: TimingProfile = TimingProfile {
        line_len: 159,
        short_sync: 6,
        long_sync: 73,
        normal_sync: 12,
        serration: Some(67),
        colorburst: 4,
        field_height: 220,
    };

    pub const PAL: TimingProfile = TimingProfile {
        line_len: 160,
        short_sync: 5,
        long_sync: 75,
        normal_sync: 10,
        serration: None,
        colorburst: 10,
        field_height: 264,
    };
}
