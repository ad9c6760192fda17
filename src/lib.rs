//! This crate simulates one hop of a digital communication link. A real-valued source sample
//! sequence is companded into 8-bit PCM codewords (sign, 3-bit segment, 4-bit mantissa), the
//! resulting bits are BPSK-modulated onto a sampled carrier, the waveform is corrupted by additive
//! white Gaussian noise calibrated to a target signal-to-noise ratio, and a coherent correlation
//! receiver recovers hard bit decisions from which the source samples are reconstructed. The bit
//! error rate of the hop is measured end to end.
//!
//! # Examples
//!
//! ```
//! use pcmlink::{link, utils};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let samples = utils::tone(16, 440.0, 8000.0);
//! let config = link::LinkConfig::default();
//! let report = link::run_link(&samples, &config, StdRng::seed_from_u64(7))?;
//! assert_eq!(report.decoded.len(), samples.len());
//! assert_eq!(report.num_bits, 8 * samples.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

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

use serde::{Deserialize, Serialize};

pub mod channel;
pub mod demodulator;
pub mod link;
pub mod modulator;
pub mod params;
pub mod pcm;
pub mod utils;

pub use channel::{AwgnChannel, NoiseSource, Noiseless};
pub use params::LinkParams;
pub use pcm::Codeword;

/// Enumeration of binary symbol values
#[derive(Clone, Eq, Hash, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub enum Bit {
    /// Binary symbol `0`
    Zero = 0,
    /// Binary symbol `1`
    One = 1,
}

impl From<bool> for Bit {
    fn from(value: bool) -> Self {
        if value {
            Bit::One
        } else {
            Bit::Zero
        }
    }
}

impl From<Bit> for f64 {
    fn from(bit: Bit) -> Self {
        match bit {
            Bit::Zero => 0.0,
            Bit::One => 1.0,
        }
    }
}

/// Custom error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Source samples from which no companding scale can be derived
    #[error("{0}")]
    DegenerateInput(String),
    /// Codeword bit count or field value that cannot be decoded
    #[error("{0}")]
    MalformedCodeword(String),
    /// Link or channel parameter out of range
    #[error("{0}")]
    InvalidParameter(String),
    /// Invalid input error
    #[error("{0}")]
    InvalidInput(String),
    /// File read/write error
    #[error("{0}")]
    FileReadWriteError(#[from] std::io::Error),
    /// Serde read/write error
    #[error("{0}")]
    SerdeReadWriteError(#[from] serde_json::Error),
}
