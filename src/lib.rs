//! channel3 - analog television broadcast synthesized in software
//!
//! Turns a double-buffered framebuffer into a continuous stream of pre-modulated NTSC or PAL
//! samples for a bit-serial DMA peripheral:
//! - per-line-type waveform generators driven by a vertical timing map
//! - an interrupt-side feeder that refills each transmission buffer as it completes
//! - a 16-level / double-density pixel encoder
//! - a software demodulator to preview the signal

pub mod types;
pub mod signal;
pub mod error;
pub mod framebuffer;
pub mod output;
pub mod feeder;
pub mod station;
pub mod monitor;
pub mod picture;

pub use error::BroadcastError;
pub use feeder::{Feeder, FrameCounter};
pub use framebuffer::{Canvas, Color, Framebuffer, Half};
pub use output::{LoopbackOutput, OutputPeripheral, TransmissionPool};
pub use signal::{LineType, SignalPolicy, VideoStandard};
pub use station::{BroadcastConfig, FrameTimer, Station};
