//! Coherent correlation receiver for BPSK
//!
//! The receiver multiplies the received waveform by a reference carrier normalized by the symbol
//! energy, adds receiver noise drawn from a [`NoiseSource`], integrates over a sliding window of
//! one symbol, samples the integrator output once per symbol and slices the samples to bits. Each
//! stage is available separately so that intermediate waveforms can be inspected.

use std::f64::consts::PI;

use itertools::izip;
use tracing::debug;

use crate::{utils, Bit, Error, LinkParams, NoiseSource};

/// Returns reference carrier `cos(2 * pi * fc * t) / sqrt(E)` over the whole waveform, where `E`
/// is the symbol energy.
#[must_use]
pub fn reference_waveform(params: &LinkParams) -> Vec<f64> {
    let amplitude = 1.0 / params.symbol_energy().sqrt();
    params
        .time_grid()
        .map(|t| amplitude * (2.0 * PI * params.carrier_freq * t).cos())
        .collect()
}

/// Returns correlator output: the product of the received waveform and the reference carrier,
/// plus receiver noise drawn from `noise`.
///
/// # Errors
///
/// Returns an error if the length of `received` is not equal to `params.num_samples`.
pub fn correlate<S: NoiseSource + ?Sized>(
    received: &[f64],
    params: &LinkParams,
    noise: &mut S,
) -> Result<Vec<f64>, Error> {
    if received.len() != params.num_samples {
        return Err(Error::InvalidInput(format!(
            "Expected {} received samples (found {})",
            params.num_samples,
            received.len()
        )));
    }
    let reference = reference_waveform(params);
    let receiver_noise = noise.draw(params.num_samples);
    Ok(izip!(received, &reference, &receiver_noise)
        .map(|(r, phi, n)| r * phi + n)
        .collect())
}

/// Returns full convolution of `correlated` with a length-`samples_per_symbol` window of ones,
/// divided by `samples_per_symbol`. The output is `samples_per_symbol - 1` samples longer than the
/// input. Each output sample sums its window afresh, so rounding does not accumulate along the
/// waveform.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn integrate(correlated: &[f64], params: &LinkParams) -> Vec<f64> {
    let window = params.samples_per_symbol;
    if correlated.is_empty() {
        return Vec::new();
    }
    let last = correlated.len() - 1;
    (0 .. correlated.len() + window - 1)
        .map(|j| {
            let lo = j.saturating_sub(window - 1);
            let hi = j.min(last);
            correlated[lo ..= hi].iter().sum::<f64>() / window as f64
        })
        .collect()
}

/// Returns integrator output sampled once per symbol, at indices `samples_per_symbol - 1`,
/// `2 * samples_per_symbol - 1`, and so on.
///
/// # Errors
///
/// Returns an error if the length of `integrated` is not `num_samples + samples_per_symbol - 1`.
pub fn sample(integrated: &[f64], params: &LinkParams) -> Result<Vec<f64>, Error> {
    let sps = params.samples_per_symbol;
    let expected_len = params.num_samples + sps - 1;
    if integrated.len() != expected_len {
        return Err(Error::InvalidInput(format!(
            "Expected {expected_len} integrator output samples (found {})",
            integrated.len()
        )));
    }
    Ok(integrated.iter().skip(sps - 1).step_by(sps).copied().collect())
}

/// Returns bit decisions for a received BPSK waveform.
///
/// # Parameters
///
/// - `received`: Channel output, `params.num_samples` samples long.
///
/// - `params`: Link parameters used by the modulator.
///
/// - `noise`: Source of receiver noise added at the correlator. Pass the channel used for the
///   transmission to model receiver noise of the same power, or [`crate::Noiseless`] to isolate
///   the receiver from it.
///
/// # Returns
///
/// - `bits_hat`: One decision per symbol, `Zero` for a nonnegative integrator sample and `One`
///   for a negative one.
///
/// # Errors
///
/// Returns an error if the length of `received` is not equal to `params.num_samples`.
///
/// # Examples
///
/// ```
/// use pcmlink::{demodulator, modulator, AwgnChannel, Bit};
/// use Bit::{One, Zero};
///
/// let bits = [Zero, One, One, Zero];
/// let (waveform, params) = modulator::modulate(&bits, 50.0, 5000.0, 10000.0)?;
/// let mut channel = AwgnChannel::seeded(0);
/// let received = channel.apply(&waveform, 100.0, &params)?;
/// let bits_hat = demodulator::demodulate(&received, &params, &mut channel)?;
/// assert_eq!(bits_hat, bits);
/// assert_eq!(demodulator::error_rate(&bits_hat, &bits)?, 0.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn demodulate<S: NoiseSource + ?Sized>(
    received: &[f64],
    params: &LinkParams,
    noise: &mut S,
) -> Result<Vec<Bit>, Error> {
    let correlated = correlate(received, params, noise)?;
    let integrated = integrate(&correlated, params);
    let sampled = sample(&integrated, params)?;
    let bits_hat = utils::bpsk_slicer(&sampled);
    debug!(
        num_samples = params.num_samples,
        num_symbols = bits_hat.len(),
        "Demodulated BPSK waveform"
    );
    Ok(bits_hat)
}

/// Returns fraction of positions in which recovered bits differ from reference bits.
///
/// # Errors
///
/// Returns an error if the two sequences have different lengths or are empty.
#[allow(clippy::cast_precision_loss)]
pub fn error_rate(bits_hat: &[Bit], bits: &[Bit]) -> Result<f64, Error> {
    if bits_hat.len() != bits.len() {
        return Err(Error::InvalidInput(format!(
            "Expected {} recovered bits (found {})",
            bits.len(),
            bits_hat.len()
        )));
    }
    if bits.is_empty() {
        return Err(Error::InvalidInput(
            "Error rate is undefined for empty bit sequences".to_string(),
        ));
    }
    Ok(utils::error_count(bits_hat, bits) as f64 / bits.len() as f64)
}
