//! Additive white Gaussian noise (AWGN) channel
//!
//! The [`AwgnChannel`] measures the power of each waveform it carries and adds independent
//! zero-mean Gaussian noise whose power sits the requested number of decibels below it. The random
//! number generator is supplied by the caller, so a seeded generator gives reproducible runs and
//! separate channel instances can be used from separate threads.
//!
//! # Examples
//!
//! ```
//! use pcmlink::{modulator, AwgnChannel, Bit};
//!
//! let bits = [Bit::One, Bit::Zero, Bit::Zero, Bit::One];
//! let (waveform, params) = modulator::modulate(&bits, 50.0, 1000.0, 8000.0)?;
//! let mut channel = AwgnChannel::seeded(42);
//! let received = channel.apply(&waveform, 10.0, &params)?;
//! assert_eq!(received.len(), waveform.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use itertools::Itertools;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::debug;

use crate::{Error, LinkParams};

/// Source of additive noise samples
pub trait NoiseSource {
    /// Returns `len` independent noise samples.
    fn draw(&mut self, len: usize) -> Vec<f64>;
}

/// Noise source that only ever returns zeros
#[derive(Clone, Eq, PartialEq, Debug, Copy, Default)]
pub struct Noiseless;

impl NoiseSource for Noiseless {
    fn draw(&mut self, len: usize) -> Vec<f64> {
        vec![0.0; len]
    }
}

/// AWGN channel driven by a caller-supplied random number generator
#[derive(Clone, Debug)]
pub struct AwgnChannel<R = StdRng> {
    /// Random number generator for the noise samples
    rng: R,
    /// Noise power set by the most recent call to `apply`
    noise_power: f64,
}

impl AwgnChannel<StdRng> {
    /// Returns channel whose noise is generated from a seeded `StdRng`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> AwgnChannel<R> {
    /// Returns channel drawing noise from the given random number generator. Until the first call
    /// to [`AwgnChannel::apply`] its noise power is zero.
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            noise_power: 0.0,
        }
    }

    /// Returns noise power calibrated by the most recent call to [`AwgnChannel::apply`].
    #[must_use]
    pub fn noise_power(&self) -> f64 {
        self.noise_power
    }

    /// Returns channel output for a given input waveform.
    ///
    /// # Parameters
    ///
    /// - `signal`: Channel input, `params.num_samples` samples long.
    ///
    /// - `snr_db`: Ratio (dB) of the mean squared amplitude of `signal` to the noise power. A
    ///   value of `f64::INFINITY` gives a noiseless channel.
    ///
    /// - `params`: Link parameters of the waveform.
    ///
    /// # Returns
    ///
    /// - `noisy_signal`: Sum of `signal` and freshly drawn noise samples. The calibrated noise
    ///   power is retained, so later calls to [`NoiseSource::draw`] produce noise of the same
    ///   power.
    ///
    /// # Errors
    ///
    /// Returns an error if the length of `signal` is not equal to `params.num_samples`, or if
    /// `snr_db` is NaN or negative infinity.
    pub fn apply(
        &mut self,
        signal: &[f64],
        snr_db: f64,
        params: &LinkParams,
    ) -> Result<Vec<f64>, Error> {
        if signal.len() != params.num_samples {
            return Err(Error::InvalidInput(format!(
                "Expected {} channel input samples (found {})",
                params.num_samples,
                signal.len()
            )));
        }
        if snr_db.is_nan() || (snr_db.is_infinite() && snr_db < 0.0) {
            return Err(Error::InvalidParameter(format!(
                "SNR must be a number above negative infinity (found {snr_db} dB)"
            )));
        }
        let signal_power = signal_power(signal);
        self.noise_power = signal_power / 10f64.powf(0.1 * snr_db);
        debug!(
            signal_power,
            noise_power = self.noise_power,
            snr_db,
            "Calibrated AWGN"
        );
        let noise = self.draw(signal.len());
        Ok(signal.iter().zip_eq(noise).map(|(x, n)| x + n).collect())
    }
}

impl<R: Rng> NoiseSource for AwgnChannel<R> {
    fn draw(&mut self, len: usize) -> Vec<f64> {
        let sigma = self.noise_power.sqrt();
        (0 .. len)
            .map(|_| sigma * self.rng.sample::<f64, _>(StandardNormal))
            .collect()
    }
}

/// Returns mean squared amplitude of a signal (`0.0` for an empty signal).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn signal_power(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|x| x * x).sum::<f64>() / signal.len() as f64
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::{modulator, utils};

    fn test_waveform() -> (Vec<f64>, LinkParams) {
        let bits = utils::random_bits_with(16, &mut StdRng::seed_from_u64(0));
        modulator::modulate(&bits, 100.0, 1000.0, 8000.0).unwrap()
    }

    #[test]
    fn test_signal_power() {
        assert_float_eq!(signal_power(&[]), 0.0, abs <= 1e-12);
        assert_float_eq!(signal_power(&[1.0, -1.0, 3.0, 0.0]), 2.75, abs <= 1e-12);
    }

    #[test]
    fn test_noiseless() {
        assert!(Noiseless.draw(0).is_empty());
        assert_eq!(Noiseless.draw(5), [0.0; 5]);
    }

    #[test]
    fn test_apply_invalid_inputs() {
        let (waveform, params) = test_waveform();
        let mut channel = AwgnChannel::seeded(1);
        assert!(matches!(
            channel.apply(&waveform[1 ..], 10.0, &params),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            channel.apply(&waveform, f64::NAN, &params),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            channel.apply(&waveform, f64::NEG_INFINITY, &params),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn test_apply_noise_power() {
        let (waveform, params) = test_waveform();
        let snr_db = 10.0;
        let expected_noise_power = signal_power(&waveform) / 10.0;
        let mut channel = AwgnChannel::seeded(2);
        let num_trials = 100;
        let mut noise_sum = 0.0;
        let mut noise_energy = 0.0;
        for _ in 0 .. num_trials {
            let received = channel.apply(&waveform, snr_db, &params).unwrap();
            assert_float_eq!(channel.noise_power(), expected_noise_power, rmax <= 1e-12);
            for (y, x) in received.iter().zip(&waveform) {
                noise_sum += y - x;
                noise_energy += (y - x) * (y - x);
            }
        }
        let num_samples = (num_trials * params.num_samples) as f64;
        let noise_mean = noise_sum / num_samples;
        let noise_var = noise_energy / num_samples - noise_mean * noise_mean;
        assert!(noise_mean.abs() < 0.01);
        assert!(noise_var > 0.9 * expected_noise_power && noise_var < 1.1 * expected_noise_power);
    }

    #[test]
    fn test_apply_draws_fresh_noise() {
        let (waveform, params) = test_waveform();
        let mut channel = AwgnChannel::seeded(3);
        let received1 = channel.apply(&waveform, 0.0, &params).unwrap();
        let received2 = channel.apply(&waveform, 0.0, &params).unwrap();
        assert_ne!(received1, received2);
    }

    #[test]
    fn test_apply_is_reproducible_for_seed() {
        let (waveform, params) = test_waveform();
        let received1 = AwgnChannel::seeded(4)
            .apply(&waveform, 3.0, &params)
            .unwrap();
        let received2 = AwgnChannel::seeded(4)
            .apply(&waveform, 3.0, &params)
            .unwrap();
        assert_eq!(received1, received2);
    }

    #[test]
    fn test_apply_infinite_snr() {
        let (waveform, params) = test_waveform();
        let mut channel = AwgnChannel::seeded(5);
        let received = channel.apply(&waveform, f64::INFINITY, &params).unwrap();
        assert_float_eq!(channel.noise_power(), 0.0, abs <= 1e-300);
        assert_float_eq!(received, waveform, abs_all <= 1e-300);
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn test_draw_uses_calibrated_power() {
        let mut channel = AwgnChannel::seeded(6);
        assert!(channel.draw(10).iter().all(|&n| n.abs() <= 1e-300));
        let (waveform, params) = test_waveform();
        channel.apply(&waveform, 0.0, &params).unwrap();
        let noise = channel.draw(100_000);
        let power = signal_power(&noise);
        let expected = channel.noise_power();
        assert!(power > 0.95 * expected && power < 1.05 * expected);
    }
}
