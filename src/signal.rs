mod standard;
mod waveform;
mod vertical;
mod lines;

pub use standard::*;
pub use waveform::*;
pub use vertical::*;
pub use lines::*;

use crate::types::SignalFloat;

/// The frequency of the serial bit clock in hz. Every bit of a sample lasts one period of this.
pub const BIT_CLOCK_HZ: u64 = 80_000_000;

/// The number of bits in each sample word.
pub const SAMPLE_BITS: usize = 32;

/// The length of time for one sample word in seconds (400ns).
pub const SAMPLE_PERIOD: SignalFloat = SAMPLE_BITS as SignalFloat / BIT_CLOCK_HZ as SignalFloat;

/// The frequency of the channel 3 video carrier in hz.
pub const CHANNEL3_CARRIER_HZ: u64 = 61_250_000;

/// The carrier we actually synthesize. A bit stream clocked at 80MHz has an image of this tone at
/// 61.25MHz, which is what the television tunes to.
pub const RF_CARRIER_HZ: u64 = BIT_CLOCK_HZ - CHANNEL3_CARRIER_HZ;

/// The frequency of the color subcarrier in hz, as the fraction 315MHz / 88. The waveform table is
/// shared between standards, so PAL receivers see an NTSC rate burst; color accuracy is not a goal.
pub const COLOR_SUBCARRIER_HZ: (u64, u64) = (315_000_000, 88);

/// RF carrier cycles per bit as a reduced fraction (15/64).
pub const RF_CYCLES_PER_BIT: (usize, usize) = cycles_per_bit(RF_CARRIER_HZ, 1);

/// Color subcarrier cycles per bit as a reduced fraction (63/1408).
pub const SUBCARRIER_CYCLES_PER_BIT: (usize, usize) =
    cycles_per_bit(COLOR_SUBCARRIER_HZ.0, COLOR_SUBCARRIER_HZ.1);

const fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// `num / den` hz divided by the bit clock, reduced.
const fn cycles_per_bit(num: u64, den: u64) -> (usize, usize) {
    let den = den * BIT_CLOCK_HZ;
    let g = gcd(num, den);
    ((num / g) as usize, (den / g) as usize)
}

/// The fractional part of `bit * num / den` cycles, computed exactly.
pub fn phase((num, den): (usize, usize), bit: usize) -> SignalFloat {
    ((bit * num) % den) as SignalFloat / den as SignalFloat
}
