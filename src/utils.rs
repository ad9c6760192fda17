//! # Some useful functions for simulating link performance
//!
//! The [`random_bits`] and [`random_bits_with`] functions return a given number of random bits;
//! the [`bpsk_slicer`] function slices symbols to bits; the [`error_count`] function returns the
//! number of errors in a sequence with respect to a reference sequence; and the [`tone`] function
//! returns a sampled sinusoid to stand in for a recorded source.
//!
//! # Examples
//!
//! The code below illustrates the usage of the functions in this module.
//! ```
//! use pcmlink::utils;
//!
//! let num_bits = 40;
//! let bits = utils::random_bits(num_bits);
//! let syms: Vec<f64> = bits.iter().map(|&b| 1.0 - 2.0 * f64::from(b)).collect();
//! let bits_hat = utils::bpsk_slicer(&syms);
//! assert_eq!(utils::error_count(&bits_hat, &bits), 0);
//! ```

use std::f64::consts::PI;

use rand::Rng;

use crate::Bit;

/// Returns given number of random bits.
///
/// # Parameters
///
/// - `num_bits`: Number of random bits to be generated.
///
/// # Returns
///
/// - `bits`: Random bits.
#[must_use]
pub fn random_bits(num_bits: usize) -> Vec<Bit> {
    random_bits_with(num_bits, &mut rand::rng())
}

/// Returns given number of random bits drawn from a given random number generator.
///
/// # Parameters
///
/// - `num_bits`: Number of random bits to be generated.
///
/// - `rng`: Random number generator to be used.
///
/// # Returns
///
/// - `bits`: Random bits.
pub fn random_bits_with<R: Rng>(num_bits: usize, rng: &mut R) -> Vec<Bit> {
    (0 .. num_bits)
        .map(|_| Bit::from(rng.random_bool(0.5)))
        .collect()
}

/// Returns BPSK slicer output.
///
/// # Parameters
///
/// - `syms`: Symbols to be sliced. Nonnegative values are mapped to `Zero`, and negative values to
///   `One`.
///
/// # Returns
///
/// - `bits_hat`: Bits obtained by slicing the given symbols.
#[must_use]
pub fn bpsk_slicer(syms: &[f64]) -> Vec<Bit> {
    syms.iter()
        .map(|&x| if x >= 0.0 { Bit::Zero } else { Bit::One })
        .collect()
}

/// Returns number of errors in a sequence with respect to a reference sequence.
///
/// # Parameters
///
/// - `seq`: Sequence in which errors must be counted.
///
/// - `ref_seq`: Reference sequence to which the given sequence is compared.
///
/// # Returns
///
/// - `err_count`: Number of positions in which the two sequences differ. If they are of different
///   lengths, then the longer sequence is effectively truncated to the length of the shorter one.
pub fn error_count<T: PartialEq>(seq: &[T], ref_seq: &[T]) -> usize {
    ref_seq
        .iter()
        .zip(seq.iter())
        .filter(|&(x, y)| x != y)
        .count()
}

/// Returns samples of a unit-amplitude sine wave.
///
/// # Parameters
///
/// - `num_samples`: Number of samples to be generated.
///
/// - `freq`: Tone frequency (Hz).
///
/// - `sample_rate`: Sample rate (Hz).
///
/// # Returns
///
/// - `samples`: Samples `sin(2 * pi * freq * n / sample_rate)` for `n` in `[0, num_samples)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn tone(num_samples: usize, freq: f64, sample_rate: f64) -> Vec<f64> {
    (0 .. num_samples)
        .map(|n| (2.0 * PI * freq * n as f64 / sample_rate).sin())
        .collect()
}
