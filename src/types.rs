/// The floating point type used while precomputing waveforms and when demodulating them again in
/// the monitor. Nothing on the interrupt path touches floats; they only appear when building the
/// waveform table once at startup and in the preview decoder.
pub type SignalFloat = f32;

/// Not really a type, but the PI constant to use with SignalFloat.
pub const PI: SignalFloat = std::f64::consts::PI as SignalFloat;

/// One word shifted out by the serial peripheral. Each bit is one period of the bit clock, most
/// significant bit first.
pub type Sample = u32;

/// A 4-bit pixel code as stored in the framebuffer.
pub type PixelCode = u8;

/// The type for an rgba pixel sample.
pub type PixelSample = (u8, u8, u8, u8);
