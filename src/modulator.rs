//! BPSK modulator with zero-order-hold pulse shaping
//!
//! Each bit is held for `samples_per_symbol` consecutive samples and then sets the phase of a
//! cosine carrier: `Zero` maps to phase `0` and `One` to phase `pi`.

use std::f64::consts::PI;

use tracing::debug;

use crate::{Bit, Error, LinkParams};

/// Returns BPSK waveform and link parameters for given bits.
///
/// # Parameters
///
/// - `bits`: Bits to be transmitted.
///
/// - `bit_rate`: Bit rate (bit/s).
///
/// - `carrier_freq`: Carrier frequency (Hz).
///
/// - `sample_rate`: Sample rate (Hz).
///
/// # Returns
///
/// - `waveform`: Modulated carrier, `params.num_samples` samples long.
///
/// - `params`: Link parameters to be shared with the channel and the demodulator.
///
/// # Errors
///
/// Returns an error if `bits` is empty or if the rates leave less than one sample per symbol (see
/// [`LinkParams::new`]).
///
/// # Examples
///
/// ```
/// use pcmlink::{modulator, Bit};
///
/// let bits = [Bit::Zero, Bit::One, Bit::One, Bit::Zero];
/// let (waveform, params) = modulator::modulate(&bits, 50.0, 5000.0, 10000.0)?;
/// assert_eq!(params.samples_per_symbol, 200);
/// assert_eq!(waveform.len(), 800);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn modulate(
    bits: &[Bit],
    bit_rate: f64,
    carrier_freq: f64,
    sample_rate: f64,
) -> Result<(Vec<f64>, LinkParams), Error> {
    let params = LinkParams::new(bits.len(), bit_rate, carrier_freq, sample_rate)?;
    let waveform = modulate_with(bits, &params)?;
    Ok((waveform, params))
}

/// Returns BPSK waveform for given bits on an existing parameter set.
///
/// # Errors
///
/// Returns an error if the number of bits is not equal to `params.num_symbols`.
pub fn modulate_with(bits: &[Bit], params: &LinkParams) -> Result<Vec<f64>, Error> {
    let shaped = baseband(bits, params)?;
    let waveform: Vec<f64> = params
        .time_grid()
        .zip(shaped)
        .map(|(t, x)| (2.0 * PI * params.carrier_freq * t + PI * x).cos())
        .collect();
    debug!(
        num_symbols = params.num_symbols,
        num_samples = params.num_samples,
        carrier_freq = params.carrier_freq,
        "BPSK-modulated bits"
    );
    Ok(waveform)
}

/// Returns zero-order-hold baseband signal, with each bit value (`0.0` or `1.0`) repeated for
/// `params.samples_per_symbol` samples.
///
/// # Errors
///
/// Returns an error if the number of bits is not equal to `params.num_symbols`.
pub fn baseband(bits: &[Bit], params: &LinkParams) -> Result<Vec<f64>, Error> {
    if bits.len() != params.num_symbols {
        return Err(Error::InvalidInput(format!(
            "Expected {} bits for the link parameters (found {})",
            params.num_symbols,
            bits.len()
        )));
    }
    Ok(bits
        .iter()
        .flat_map(|&b| std::iter::repeat(f64::from(b)).take(params.samples_per_symbol))
        .collect())
}
