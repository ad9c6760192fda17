//! Link orchestration: single encode/modulate/channel/demodulate/decode passes over a source, and
//! BER-versus-SNR simulations over random bit frames

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{demodulator, modulator, pcm, utils, AwgnChannel, Error, LinkParams};

/// Configuration of a PCM-over-BPSK link
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct LinkConfig {
    /// Bit rate (bit/s)
    pub bit_rate: f64,
    /// Carrier frequency (Hz)
    pub carrier_freq: f64,
    /// Sample rate (Hz)
    pub sample_rate: f64,
    /// Ratio (dB) of signal power to noise power at the channel output
    pub snr_db: f64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bit_rate: 50.0,
            carrier_freq: 5000.0,
            sample_rate: 10000.0,
            snr_db: 10.0,
        }
    }
}

impl LinkConfig {
    /// Returns link configuration read from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold a valid configuration.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Outcome of one pass over the link
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct LinkReport {
    /// Source samples reconstructed from the recovered bits
    pub decoded: Vec<f64>,
    /// Companding scale used by the codec
    pub scale: f64,
    /// Number of transmitted bits
    pub num_bits: usize,
    /// Number of bits recovered in error
    pub num_bit_errors: usize,
    /// Fraction of bits recovered in error
    pub bit_error_rate: f64,
}

impl LinkReport {
    /// Saves report to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Returns report of one pass of a source sample sequence over the link.
///
/// # Parameters
///
/// - `samples`: Source samples.
///
/// - `config`: Link configuration.
///
/// - `rng`: Random number generator for the channel and receiver noise.
///
/// # Errors
///
/// Returns an error if the samples cannot be encoded (empty, all zero or not finite) or if the
/// configuration is invalid.
pub fn run_link<R: Rng>(
    samples: &[f64],
    config: &LinkConfig,
    rng: R,
) -> Result<LinkReport, Error> {
    let (bits, scale) = pcm::encode(samples)?;
    let (waveform, params) = modulator::modulate(
        &bits,
        config.bit_rate,
        config.carrier_freq,
        config.sample_rate,
    )?;
    let mut channel = AwgnChannel::new(rng);
    let received = channel.apply(&waveform, config.snr_db, &params)?;
    let bits_hat = demodulator::demodulate(&received, &params, &mut channel)?;
    let bit_error_rate = demodulator::error_rate(&bits_hat, &bits)?;
    let decoded = pcm::decode(&bits_hat, scale)?;
    let num_bit_errors = utils::error_count(&bits_hat, &bits);
    info!(
        num_samples = samples.len(),
        num_bits = bits.len(),
        num_bit_errors,
        bit_error_rate,
        snr_db = config.snr_db,
        "Completed link pass"
    );
    Ok(LinkReport {
        decoded,
        scale,
        num_bits: bits.len(),
        num_bit_errors,
        bit_error_rate,
    })
}

/// Parameters for BPSK-AWGN link simulation over random bit frames
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct SimParams {
    /// Number of bits per frame
    pub num_bits_per_frame: u32,
    /// Number of frames to be transmitted
    pub num_frames: u32,
    /// Bit rate (bit/s)
    pub bit_rate: f64,
    /// Carrier frequency (Hz)
    pub carrier_freq: f64,
    /// Sample rate (Hz)
    pub sample_rate: f64,
    /// Ratio (dB) of signal power to noise power at the channel output
    pub snr_db: f64,
}

/// Results from BPSK-AWGN link simulation
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct SimResults {
    /// Simulation parameters
    pub params: SimParams,
    /// Number of bits transmitted
    pub num_bits: u64,
    /// Number of bit errors
    pub num_bit_errors: u64,
    /// Number of frames transmitted
    pub num_frames: u32,
    /// Number of frames with at least one bit error
    pub num_frame_errors: u32,
}

impl SimResults {
    /// Returns bit error rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ber(&self) -> f64 {
        if self.num_bits == 0 {
            return 0.0;
        }
        self.num_bit_errors as f64 / self.num_bits as f64
    }

    /// Returns frame error rate.
    #[must_use]
    pub fn fer(&self) -> f64 {
        if self.num_frames == 0 {
            return 0.0;
        }
        f64::from(self.num_frame_errors) / f64::from(self.num_frames)
    }
}

/// Runs BPSK-AWGN link simulations in parallel and saves the results to a JSON file.
///
/// # Parameters
///
/// - `all_params`: Parameters for each simulation point.
///
/// - `seed`: Seed for the random number generators. Point `i` uses its own generator seeded
///   with `seed + i`, so results are reproducible for a given seed.
///
/// - `json_filename`: Name of JSON file to which results must be saved.
///
/// # Returns
///
/// - `all_results`: Results for each simulation point, in the order of `all_params`.
///
/// # Errors
///
/// Returns an error if any simulation parameters are invalid or if the results cannot be saved.
pub fn run_bpsk_awgn_sims(
    all_params: &[SimParams],
    seed: u64,
    json_filename: &str,
) -> Result<Vec<SimResults>, Error> {
    let all_results = all_params
        .par_iter()
        .enumerate()
        .map(|(idx, params)| run_bpsk_awgn_sim(params, seed.wrapping_add(idx as u64)))
        .collect::<Result<Vec<SimResults>, Error>>()?;
    save_all_results(&all_results, json_filename)?;
    Ok(all_results)
}

/// Runs one BPSK-AWGN link simulation over random bit frames.
///
/// # Errors
///
/// Returns an error if the simulation parameters are invalid.
pub fn run_bpsk_awgn_sim(params: &SimParams, seed: u64) -> Result<SimResults, Error> {
    check_sim_params(params)?;
    let link_params = LinkParams::new(
        params.num_bits_per_frame as usize,
        params.bit_rate,
        params.carrier_freq,
        params.sample_rate,
    )?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut results = SimResults {
        params: *params,
        num_bits: 0,
        num_bit_errors: 0,
        num_frames: 0,
        num_frame_errors: 0,
    };
    for _ in 0 .. params.num_frames {
        let bits = utils::random_bits_with(link_params.num_symbols, &mut rng);
        let waveform = modulator::modulate_with(&bits, &link_params)?;
        let mut channel = AwgnChannel::new(&mut rng);
        let received = channel.apply(&waveform, params.snr_db, &link_params)?;
        let bits_hat = demodulator::demodulate(&received, &link_params, &mut channel)?;
        let num_bit_errors = utils::error_count(&bits_hat, &bits);
        results.num_bits += bits.len() as u64;
        results.num_bit_errors += num_bit_errors as u64;
        results.num_frames += 1;
        if num_bit_errors > 0 {
            results.num_frame_errors += 1;
        }
    }
    info!(
        snr_db = params.snr_db,
        num_bits = results.num_bits,
        num_bit_errors = results.num_bit_errors,
        ber = results.ber(),
        fer = results.fer(),
        "Completed simulation point"
    );
    Ok(results)
}

/// Checks validity of simulation parameters.
fn check_sim_params(params: &SimParams) -> Result<(), Error> {
    if params.num_bits_per_frame == 0 {
        return Err(Error::InvalidInput(
            "Number of bits per frame cannot be zero".to_string(),
        ));
    }
    if params.num_frames == 0 {
        return Err(Error::InvalidInput(
            "Number of frames cannot be zero".to_string(),
        ));
    }
    if params.snr_db.is_nan() {
        return Err(Error::InvalidParameter("SNR cannot be NaN".to_string()));
    }
    Ok(())
}

/// Saves all simulation results to a JSON file.
fn save_all_results(all_results: &[SimResults], json_filename: &str) -> Result<(), Error> {
    let writer = BufWriter::new(File::create(json_filename)?);
    serde_json::to_writer_pretty(writer, all_results)?;
    Ok(())
}
