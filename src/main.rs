//! This crate passes a source sample sequence over a PCM-companded BPSK link with an AWGN channel,
//! or simulates the BER-versus-SNR performance of the link over random bit frames. Parameters are
//! specified on the command line, and results are saved to a JSON file.
//!
//! Build the executable with `cargo build --release` and then run `./target/release/pcmlink -h`
//! for help on the command-line interface.

#![warn(
    clippy::complexity,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_allocation,
    unused_import_braces,
    unused_qualifications
)]

use std::fs::File;
use std::io::BufReader;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{crate_name, crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use pcmlink::link;
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Main function
fn main() -> Result<()> {
    let timer = Instant::now();
    let matches = command_line_parser().get_matches();
    init_logging(matches.get_count("verbose"));
    match matches.subcommand() {
        Some(("link", sub_matches)) => run_link(sub_matches)?,
        Some(("sweep", sub_matches)) => run_sweep(sub_matches)?,
        _ => unreachable!("a subcommand is required"),
    }
    info!("Elapsed time: {:.3?}", timer.elapsed());
    Ok(())
}

/// Installs the global log subscriber, with `RUST_LOG` taking precedence over the verbosity flag.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns command line parser.
fn command_line_parser() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about("Passes PCM-coded samples over a BPSK link with an AWGN channel")
        .subcommand_required(true)
        .arg(verbose())
        .subcommand(
            Command::new("link")
                .about("Passes a source sample sequence over the link once")
                .arg(input_filename())
                .arg(num_tone_samples())
                .arg(tone_freq())
                .arg(tone_sample_rate())
                .arg(config_filename())
                .arg(bit_rate())
                .arg(carrier_freq())
                .arg(sample_rate())
                .arg(snr_db())
                .arg(seed())
                .arg(json_filename("report.json")),
        )
        .subcommand(
            Command::new("sweep")
                .about("Evaluates the bit error rate of the link over a range of SNR values")
                .arg(num_bits_per_frame())
                .arg(num_frames())
                .arg(bit_rate())
                .arg(carrier_freq())
                .arg(sample_rate())
                .arg(first_snr_db())
                .arg(snr_step_db())
                .arg(num_snr())
                .arg(seed())
                .arg(json_filename("results.json")),
        )
}

/// Returns argument for log verbosity.
fn verbose() -> Arg {
    Arg::new("verbose")
        .short('v')
        .action(ArgAction::Count)
        .global(true)
        .help("Increase log verbosity (repeat for more)")
}

/// Returns argument for name of JSON file holding source samples.
fn input_filename() -> Arg {
    Arg::new("input_filename")
        .short('i')
        .help("Name of JSON file holding an array of source samples (a tone is used if absent)")
}

/// Returns argument for number of samples in the synthetic tone.
fn num_tone_samples() -> Arg {
    Arg::new("num_tone_samples")
        .short('n')
        .value_parser(value_parser!(usize))
        .default_value("64")
        .help("Number of samples in the synthetic tone")
}

/// Returns argument for synthetic tone frequency.
fn tone_freq() -> Arg {
    Arg::new("tone_freq")
        .short('q')
        .value_parser(value_parser!(f64))
        .default_value("440.0")
        .help("Synthetic tone frequency (Hz)")
}

/// Returns argument for synthetic tone sample rate.
fn tone_sample_rate() -> Arg {
    Arg::new("tone_sample_rate")
        .short('t')
        .value_parser(value_parser!(f64))
        .default_value("8000.0")
        .help("Synthetic tone sample rate (Hz), independent of the link sample rate")
}

/// Returns argument for name of JSON file holding the link configuration.
fn config_filename() -> Arg {
    Arg::new("config_filename")
        .short('g')
        .help("Name of JSON file holding the link configuration (overrides -b, -c, -s and -r)")
}

/// Returns argument for bit rate.
fn bit_rate() -> Arg {
    Arg::new("bit_rate")
        .short('b')
        .value_parser(value_parser!(f64))
        .default_value("50.0")
        .help("Bit rate (bit/s)")
}

/// Returns argument for carrier frequency.
fn carrier_freq() -> Arg {
    Arg::new("carrier_freq")
        .short('c')
        .value_parser(value_parser!(f64))
        .default_value("5000.0")
        .help("Carrier frequency (Hz)")
}

/// Returns argument for sample rate.
fn sample_rate() -> Arg {
    Arg::new("sample_rate")
        .short('s')
        .value_parser(value_parser!(f64))
        .default_value("10000.0")
        .help("Sample rate (Hz)")
}

/// Returns argument for SNR (dB).
fn snr_db() -> Arg {
    Arg::new("snr_db")
        .short('r')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("10.0")
        .help("SNR (dB)")
}

/// Returns argument for random number generator seed.
fn seed() -> Arg {
    Arg::new("seed")
        .short('e')
        .value_parser(value_parser!(u64))
        .help("Seed for the noise generator (drawn from the OS if absent)")
}

/// Returns argument for number of bits per frame.
fn num_bits_per_frame() -> Arg {
    Arg::new("num_bits_per_frame")
        .short('k')
        .value_parser(value_parser!(u32))
        .default_value("100")
        .help("Number of bits per frame")
}

/// Returns argument for number of frames per SNR value.
fn num_frames() -> Arg {
    Arg::new("num_frames")
        .short('m')
        .value_parser(value_parser!(u32))
        .default_value("100")
        .help("Number of frames to be transmitted per SNR value")
}

/// Returns argument for first SNR (dB).
fn first_snr_db() -> Arg {
    Arg::new("first_snr_db")
        .short('r')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("-25.0")
        .help("First SNR (dB)")
}

/// Returns argument for SNR step (dB).
fn snr_step_db() -> Arg {
    Arg::new("snr_step_db")
        .short('p')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("2.0")
        .help("SNR step (dB)")
}

/// Returns argument for number of SNR values.
fn num_snr() -> Arg {
    Arg::new("num_snr")
        .short('n')
        .value_parser(value_parser!(u32))
        .default_value("8")
        .help("Number of SNR values")
}

/// Returns argument for name of JSON file to which results must be saved.
fn json_filename(default: &'static str) -> Arg {
    Arg::new("json_filename")
        .short('f')
        .default_value(default)
        .help("Name of JSON file to which results must be saved")
}

/// Passes the source over the link once and saves the report.
fn run_link(matches: &ArgMatches) -> Result<()> {
    let samples = source_samples_from_matches(matches)?;
    let config = link_config_from_matches(matches)?;
    let rng = rng_from_matches(matches);
    let report = link::run_link(&samples, &config, rng)?;
    let json_filename = json_filename_from_matches(matches);
    report.save_json(&json_filename)?;
    info!(
        bit_error_rate = report.bit_error_rate,
        json_filename = %json_filename,
        "Saved link report"
    );
    Ok(())
}

/// Runs the SNR sweep and saves the results.
fn run_sweep(matches: &ArgMatches) -> Result<()> {
    let seed = match matches.get_one::<u64>("seed") {
        Some(&seed) => seed,
        None => rand::random(),
    };
    let json_filename = json_filename_from_matches(matches);
    let all_results = link::run_bpsk_awgn_sims(&all_sim_params(matches), seed, &json_filename)?;
    info!(
        num_points = all_results.len(),
        seed,
        json_filename = %json_filename,
        "Saved simulation results"
    );
    Ok(())
}

/// Returns source samples, read from a JSON file if one is given and synthesized otherwise.
fn source_samples_from_matches(matches: &ArgMatches) -> Result<Vec<f64>> {
    if let Some(input_filename) = matches.get_one::<String>("input_filename") {
        let file = File::open(input_filename)
            .with_context(|| format!("Cannot open source file {input_filename}"))?;
        return serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Cannot parse source samples from {input_filename}"));
    }
    // OK to unwrap: All arguments below have default values.
    let num_samples: usize = *matches.get_one("num_tone_samples").unwrap();
    let freq: f64 = *matches.get_one("tone_freq").unwrap();
    let sample_rate: f64 = *matches.get_one("tone_sample_rate").unwrap();
    Ok(pcmlink::utils::tone(num_samples, freq, sample_rate))
}

/// Returns link configuration, read from a JSON file if one is given and taken from the
/// command-line arguments otherwise.
fn link_config_from_matches(matches: &ArgMatches) -> Result<link::LinkConfig> {
    if let Some(config_filename) = matches.get_one::<String>("config_filename") {
        return link::LinkConfig::from_json_file(config_filename)
            .with_context(|| format!("Cannot load link configuration from {config_filename}"));
    }
    // OK to unwrap: All arguments below have default values.
    Ok(link::LinkConfig {
        bit_rate: *matches.get_one("bit_rate").unwrap(),
        carrier_freq: *matches.get_one("carrier_freq").unwrap(),
        sample_rate: *matches.get_one("sample_rate").unwrap(),
        snr_db: *matches.get_one("snr_db").unwrap(),
    })
}

/// Returns random number generator, seeded from the command line if a seed is given.
fn rng_from_matches(matches: &ArgMatches) -> StdRng {
    match matches.get_one::<u64>("seed") {
        Some(&seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Returns simulation parameters based on command-line arguments.
fn all_sim_params(matches: &ArgMatches) -> Vec<link::SimParams> {
    // OK to unwrap: All arguments below have default values.
    all_snr_db_from_matches(matches)
        .into_iter()
        .map(|snr_db| link::SimParams {
            num_bits_per_frame: *matches.get_one("num_bits_per_frame").unwrap(),
            num_frames: *matches.get_one("num_frames").unwrap(),
            bit_rate: *matches.get_one("bit_rate").unwrap(),
            carrier_freq: *matches.get_one("carrier_freq").unwrap(),
            sample_rate: *matches.get_one("sample_rate").unwrap(),
            snr_db,
        })
        .collect()
}

/// Returns all SNR (dB) values.
fn all_snr_db_from_matches(matches: &ArgMatches) -> Vec<f64> {
    let first_snr_db: f64 = *matches.get_one("first_snr_db").unwrap();
    let snr_step_db: f64 = *matches.get_one("snr_step_db").unwrap();
    let num_snr: u32 = *matches.get_one("num_snr").unwrap();
    (0 .. num_snr)
        .map(|n| first_snr_db + snr_step_db * f64::from(n))
        .collect()
}

/// Returns name of JSON file to which results must be saved.
fn json_filename_from_matches(matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("json_filename")
        .unwrap()
        .to_string()
}
