use std::collections::VecDeque;
use crate::signal::{amplitude_to_video, phase, VideoStandard, RF_CYCLES_PER_BIT, SAMPLE_BITS};
use crate::types::{Sample, SignalFloat, PI};

/// Recovers the carrier envelope from sample words, i.e. what a receiver's detector sees.
pub struct Demodulator {
    /// The carrier at each bit of a word, in phase and in quadrature.
    carrier: [(SignalFloat, SignalFloat); SAMPLE_BITS],
}

impl Demodulator {
    pub fn new() -> Self {
        let mut carrier = [(0.0, 0.0); SAMPLE_BITS];
        for (bit, c) in carrier.iter_mut().enumerate() {
            let angle = 2.0 * PI * phase(RF_CYCLES_PER_BIT, bit);
            *c = (SignalFloat::cos(angle), SignalFloat::sin(angle));
        }
        Self { carrier }
    }

    /// Carrier amplitude over one word, 0.0 to about 1.0.
    pub fn amplitude(&self, sample: Sample) -> SignalFloat {
        // Multiply by the carrier both in and out of phase and integrate; the magnitude is
        // independent of where in the carrier cycle the word started.
        let mut i = 0.0;
        let mut q = 0.0;
        for (bit, &(cos, sin)) in self.carrier.iter().enumerate() {
            let value = if sample & (1 << (SAMPLE_BITS - 1 - bit)) != 0 { 1.0 } else { -1.0 };
            i += value * cos;
            q += value * sin;
        }
        2.0 * SignalFloat::sqrt(i * i + q * q) / SAMPLE_BITS as SignalFloat
    }

    /// Baseband video level: below 0.0 is sync, 1.0 is white.
    pub fn video(&self, sample: Sample) -> SignalFloat {
        amplitude_to_video(self.amplitude(sample))
    }
}

impl Default for Demodulator {
    fn default() -> Self {
        Self::new()
    }
}

/// A crude television: keeps the last frame's worth of demodulated lines and rasterizes them,
/// one transmitted line per row band, both fields stacked.
pub struct Monitor {
    demodulator: Demodulator,
    lines: VecDeque<Vec<SignalFloat>>,
    capacity: usize,
}

impl Monitor {
    pub fn new(standard: VideoStandard) -> Self {
        let capacity = standard.frame_lines();
        Self {
            demodulator: Demodulator::new(),
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push_line(&mut self, samples: &[Sample]) {
        let line = samples.iter().map(|&s| self.demodulator.video(s)).collect();
        self.lines.push_back(line);
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> usize {
        self.lines.len()
    }

    /// Draw into an rgba `frame` of `width` x `height`. `noise` mixes in that fraction of random
    /// signal, like a weak antenna.
    pub fn render(&self, frame: &mut [u8], width: usize, height: usize, noise: SignalFloat) {
        for (idx, pixel) in frame.chunks_exact_mut(4).enumerate().take(width * height) {
            let (x, y) = (idx % width, idx / width);
            let video = self.sample_at(x, y, width, height);
            let video = if noise > 0.0 {
                video * (1.0 - noise) + rand::random::<SignalFloat>() * noise
            } else {
                video
            };

            let luma = SignalFloat::clamp(video * 256.0, 0.0, 255.9) as u8;
            pixel.copy_from_slice(&[luma, luma, luma, 0xff]);
        }
    }

    fn sample_at(&self, x: usize, y: usize, width: usize, height: usize) -> SignalFloat {
        if self.lines.is_empty() {
            return 0.0;
        }
        let line = &self.lines[y * self.lines.len() / height];
        if line.is_empty() {
            return 0.0;
        }
        line[x * line.len() / width]
    }
}
