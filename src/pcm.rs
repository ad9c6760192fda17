//! PCM source codec with 8-segment piecewise-linear companding
//!
//! Each source sample is normalized by the largest magnitude in its sequence onto the scale
//! `[0, 2048]` and mapped to an 8-bit codeword made up of a sign bit, a 3-bit segment index and a
//! 4-bit mantissa. Segments are narrow near zero and double in width towards full scale, so small
//! samples are quantized with finer resolution than large ones. The [`encode`] function flattens
//! the codewords of a sample sequence into a bit sequence, and the [`decode`] function rebuilds
//! the samples from such a bit sequence.
//!
//! # Examples
//!
//! ```
//! use pcmlink::pcm;
//!
//! let samples = [0.25, -1.0, 0.5, 0.0];
//! let (bits, scale) = pcm::encode(&samples)?;
//! assert_eq!(bits.len(), 8 * samples.len());
//! let samples_hat = pcm::decode(&bits, scale)?;
//! assert_eq!(samples_hat.len(), samples.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Bit, Error};

/// Number of bits in one codeword
pub const CODEWORD_LEN: usize = 8;

/// Normalized magnitude of a full-scale sample
pub const FULL_SCALE: f64 = 2048.0;

/// Lower breakpoint of each segment on the normalized scale (the upper breakpoint of the last
/// segment is [`FULL_SCALE`])
pub const SEGMENT_BASE: [u16; 8] = [0, 16, 32, 64, 128, 256, 512, 1024];

/// Quantization step within each segment
pub const SEGMENT_STEP: [u16; 8] = [1, 1, 2, 4, 8, 16, 32, 64];

/// Reconstruction level, in steps above the segment base, for each mantissa value
pub const MANTISSA_RECON: [f64; 16] = [
    0.0, 1.5, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5, 8.5, 9.5, 10.5, 11.5, 12.5, 13.5, 14.5, 15.5,
];

/// Companded representation of one source sample
#[derive(Clone, Eq, Hash, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct Codeword {
    /// Whether the sample is negative (sign bit `1`)
    negative: bool,
    /// Segment index in `[0, 8)`
    segment: u8,
    /// Mantissa in `[0, 16)`
    mantissa: u8,
}

impl Codeword {
    /// Returns codeword with the given fields.
    ///
    /// # Parameters
    ///
    /// - `negative`: Whether the sign bit is set.
    ///
    /// - `segment`: Segment index, must be in `[0, 8)`.
    ///
    /// - `mantissa`: Mantissa, must be in `[0, 16)`.
    ///
    /// # Errors
    ///
    /// Returns an error if `segment` or `mantissa` is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use pcmlink::Codeword;
    ///
    /// let codeword = Codeword::new(true, 3, 5)?;
    /// assert_eq!(u8::from(codeword), 0b1011_0101);
    /// assert!(Codeword::new(false, 8, 0).is_err());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(negative: bool, segment: u8, mantissa: u8) -> Result<Self, Error> {
        if usize::from(segment) >= SEGMENT_BASE.len() {
            return Err(Error::MalformedCodeword(format!(
                "Segment index must be in the range [0, {}) (found {segment})",
                SEGMENT_BASE.len()
            )));
        }
        if usize::from(mantissa) >= MANTISSA_RECON.len() {
            return Err(Error::MalformedCodeword(format!(
                "Mantissa must be in the range [0, {}) (found {mantissa})",
                MANTISSA_RECON.len()
            )));
        }
        Ok(Self {
            negative,
            segment,
            mantissa,
        })
    }

    /// Returns codeword parsed from 8 bits laid out as sign, segment (MSB first) and mantissa (MSB
    /// first).
    ///
    /// # Errors
    ///
    /// Returns an error if `bits` does not hold exactly 8 bits.
    pub fn from_bits(bits: &[Bit]) -> Result<Self, Error> {
        if bits.len() != CODEWORD_LEN {
            return Err(Error::MalformedCodeword(format!(
                "Expected {CODEWORD_LEN} bits per codeword (found {})",
                bits.len()
            )));
        }
        let byte = bits
            .iter()
            .fold(0u8, |acc, &b| (acc << 1) | u8::from(b == Bit::One));
        Ok(Self::from(byte))
    }

    /// Returns the 8 bits of the codeword, sign bit first.
    #[must_use]
    pub fn to_bits(self) -> [Bit; CODEWORD_LEN] {
        let byte = u8::from(self);
        std::array::from_fn(|i| Bit::from(byte & (0x80 >> i) != 0))
    }

    /// Returns whether the sign bit is set.
    #[must_use]
    pub fn is_negative(self) -> bool {
        self.negative
    }

    /// Returns the segment index.
    #[must_use]
    pub fn segment(self) -> u8 {
        self.segment
    }

    /// Returns the mantissa.
    #[must_use]
    pub fn mantissa(self) -> u8 {
        self.mantissa
    }

    /// Returns the reconstructed magnitude as a fraction of full scale.
    #[must_use]
    pub fn magnitude(self) -> f64 {
        let segment = usize::from(self.segment);
        (f64::from(SEGMENT_BASE[segment])
            + f64::from(SEGMENT_STEP[segment]) * MANTISSA_RECON[usize::from(self.mantissa)])
            / FULL_SCALE
    }

    /// Returns the reconstructed sample for a sequence encoded with the given scale.
    #[must_use]
    pub fn value(self, scale: f64) -> f64 {
        let sign = if self.negative { -1.0 } else { 1.0 };
        sign * self.magnitude() * scale
    }

    /// Returns codeword quantizing a magnitude `q` on the normalized scale `[0, 2048]`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from_normalized(negative: bool, q: f64) -> Self {
        let segment = segment_of(q);
        let base = f64::from(SEGMENT_BASE[segment]);
        let step = f64::from(SEGMENT_STEP[segment]);
        // Level `floor((q - base) / step) + 1` lies in [1, 16] and is carried as level - 1. A
        // level below 1 from rounding at a breakpoint gives an all-zero mantissa.
        let mantissa = ((q - base) / step).floor().clamp(0.0, 15.0);
        Self {
            negative,
            segment: segment as u8,
            mantissa: mantissa as u8,
        }
    }
}

impl From<u8> for Codeword {
    fn from(byte: u8) -> Self {
        Self {
            negative: byte & 0x80 != 0,
            segment: (byte >> 4) & 0x07,
            mantissa: byte & 0x0f,
        }
    }
}

impl From<Codeword> for u8 {
    fn from(codeword: Codeword) -> Self {
        (u8::from(codeword.negative) << 7) | (codeword.segment << 4) | codeword.mantissa
    }
}

/// Returns index of the segment containing a normalized magnitude.
///
/// # Parameters
///
/// - `q`: Magnitude on the normalized scale `[0, 2048]`.
///
/// # Returns
///
/// - `segment`: The index `k` such that `SEGMENT_BASE[k] <= q < SEGMENT_BASE[k + 1]`, with full
///   scale belonging to the last segment. Values below zero map to segment `0`.
///
/// # Examples
///
/// ```
/// use pcmlink::pcm::segment_of;
///
/// assert_eq!(segment_of(0.0), 0);
/// assert_eq!(segment_of(16.0), 1);
/// assert_eq!(segment_of(100.0), 3);
/// assert_eq!(segment_of(2048.0), 7);
/// ```
#[must_use]
pub fn segment_of(q: f64) -> usize {
    SEGMENT_BASE
        .iter()
        .rposition(|&base| q >= f64::from(base))
        .unwrap_or(0)
}

/// Returns PCM bits and companding scale for a sample sequence.
///
/// # Parameters
///
/// - `samples`: Source samples to be encoded.
///
/// # Returns
///
/// - `bits`: Concatenated 8-bit codewords, one per sample, each laid out as sign bit, 3-bit
///   segment index and 4-bit mantissa (MSB first).
///
/// - `scale`: Largest sample magnitude, needed by [`decode`].
///
/// # Errors
///
/// Returns an error if `samples` is empty, if every sample is zero, or if any sample is not
/// finite.
///
/// # Examples
///
/// ```
/// use pcmlink::{pcm, Bit};
/// use Bit::{One, Zero};
///
/// let (bits, scale) = pcm::encode(&[-2.0])?;
/// assert_eq!(scale, 2.0);
/// assert_eq!(bits, [One, One, One, One, One, One, One, One]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn encode(samples: &[f64]) -> Result<(Vec<Bit>, f64), Error> {
    if samples.is_empty() {
        return Err(Error::DegenerateInput(
            "Cannot encode an empty sample sequence".to_string(),
        ));
    }
    if let Some((index, x)) = samples.iter().enumerate().find(|(_, x)| !x.is_finite()) {
        return Err(Error::InvalidInput(format!(
            "Sample {index} is not finite (found {x})"
        )));
    }
    let scale = samples.iter().fold(0f64, |acc, x| acc.max(x.abs()));
    if scale <= 0.0 {
        return Err(Error::DegenerateInput(
            "All samples are zero, so no companding scale exists".to_string(),
        ));
    }
    let bits: Vec<Bit> = samples
        .iter()
        .flat_map(|&x| Codeword::from_normalized(x < 0.0, FULL_SCALE * (x.abs() / scale)).to_bits())
        .collect();
    debug!(num_samples = samples.len(), scale, "PCM-encoded samples");
    Ok((bits, scale))
}

/// Returns samples reconstructed from PCM bits.
///
/// # Parameters
///
/// - `bits`: Concatenated 8-bit codewords as produced by [`encode`].
///
/// - `scale`: Companding scale returned by [`encode`].
///
/// # Returns
///
/// - `samples`: One reconstructed sample per codeword.
///
/// # Errors
///
/// Returns an error if the number of bits is not a multiple of `8` or if `scale` is not a
/// positive finite number.
pub fn decode(bits: &[Bit], scale: f64) -> Result<Vec<f64>, Error> {
    if bits.len() % CODEWORD_LEN != 0 {
        return Err(Error::MalformedCodeword(format!(
            "Expected a multiple of {CODEWORD_LEN} codeword bits (found {})",
            bits.len()
        )));
    }
    if !(scale.is_finite() && scale > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "Companding scale must be positive and finite (found {scale})"
        )));
    }
    let samples = bits
        .chunks_exact(CODEWORD_LEN)
        .map(|chunk| Codeword::from_bits(chunk).map(|codeword| codeword.value(scale)))
        .collect::<Result<Vec<f64>, Error>>()?;
    debug!(num_samples = samples.len(), scale, "PCM-decoded samples");
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use Bit::{One, Zero};

    #[test]
    fn test_tables() {
        // Each segment spans 16 steps and ends where the next one starts
        for k in 0 .. 8 {
            let upper = if k < 7 { SEGMENT_BASE[k + 1] } else { 2048 };
            assert_eq!(upper - SEGMENT_BASE[k], 16 * SEGMENT_STEP[k]);
        }
    }

    #[test]
    fn test_segment_of() {
        assert_eq!(segment_of(-1.0), 0);
        assert_eq!(segment_of(15.99), 0);
        assert_eq!(segment_of(16.0), 1);
        assert_eq!(segment_of(31.99), 1);
        assert_eq!(segment_of(32.0), 2);
        assert_eq!(segment_of(128.0), 4);
        assert_eq!(segment_of(1023.9), 6);
        assert_eq!(segment_of(1024.0), 7);
        assert_eq!(segment_of(2048.0), 7);
    }

    #[test]
    fn test_segment_of_is_monotonic() {
        let mut prev = 0;
        for i in 0 ..= 8192 {
            let segment = segment_of(0.25 * f64::from(i));
            assert!(segment >= prev);
            prev = segment;
        }
        assert_eq!(prev, 7);
    }

    #[test]
    fn test_codeword_new() {
        // Invalid inputs
        assert!(matches!(
            Codeword::new(false, 8, 0),
            Err(Error::MalformedCodeword(_))
        ));
        assert!(matches!(
            Codeword::new(true, 0, 16),
            Err(Error::MalformedCodeword(_))
        ));
        // Valid inputs
        let codeword = Codeword::new(true, 7, 15).unwrap();
        assert!(codeword.is_negative());
        assert_eq!(codeword.segment(), 7);
        assert_eq!(codeword.mantissa(), 15);
    }

    #[test]
    fn test_codeword_bytes() {
        let codeword = Codeword::from(0b1011_0101);
        assert_eq!(codeword, Codeword::new(true, 3, 5).unwrap());
        assert_eq!(u8::from(codeword), 0b1011_0101);
        for byte in 0 ..= u8::MAX {
            assert_eq!(u8::from(Codeword::from(byte)), byte);
        }
    }

    #[test]
    fn test_codeword_bits() {
        let codeword = Codeword::new(false, 1, 4).unwrap();
        assert_eq!(
            codeword.to_bits(),
            [Zero, Zero, Zero, One, Zero, One, Zero, Zero]
        );
        assert_eq!(Codeword::from_bits(&codeword.to_bits()).unwrap(), codeword);
        // Invalid inputs
        assert!(Codeword::from_bits(&[One; 7]).is_err());
        assert!(Codeword::from_bits(&[One; 9]).is_err());
    }

    #[test]
    fn test_codeword_magnitude() {
        assert_float_eq!(Codeword::from(0x00).magnitude(), 0.0, abs <= 1e-12);
        assert_float_eq!(Codeword::from(0x70).magnitude(), 0.5, abs <= 1e-12);
        assert_float_eq!(Codeword::from(0x7f).magnitude(), 2016.0 / 2048.0, abs <= 1e-12);
        assert_float_eq!(Codeword::from(0x14).magnitude(), 20.5 / 2048.0, abs <= 1e-12);
        assert_float_eq!(Codeword::from(0x94).value(4.0), -20.5 / 512.0, abs <= 1e-12);
    }

    #[test]
    fn test_encode() {
        // Invalid inputs
        assert!(matches!(encode(&[]), Err(Error::DegenerateInput(_))));
        assert!(matches!(
            encode(&[0.0, -0.0, 0.0]),
            Err(Error::DegenerateInput(_))
        ));
        assert!(matches!(
            encode(&[1.0, f64::NAN]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            encode(&[f64::INFINITY]),
            Err(Error::InvalidInput(_))
        ));
        // Valid inputs
        let (bits, scale) = encode(&[1.0, -0.5, 0.0, 0.01]).unwrap();
        assert_float_eq!(scale, 1.0, abs <= 1e-12);
        assert_eq!(
            bits,
            [
                Zero, One, One, One, One, One, One, One, // 2048: segment 7, top level
                One, One, One, One, Zero, Zero, Zero, Zero, // -1024: segment 7, bottom level
                Zero, Zero, Zero, Zero, Zero, Zero, Zero, Zero, // 0
                Zero, Zero, Zero, One, Zero, One, Zero, Zero, // 20.48: segment 1, mantissa 4
            ]
        );
    }

    #[test]
    fn test_encode_negative_zero_is_nonnegative() {
        let (bits, _) = encode(&[-0.0, 1.0]).unwrap();
        assert_eq!(bits[0], Zero);
    }

    #[test]
    fn test_decode() {
        // Invalid inputs
        assert!(matches!(
            decode(&[Zero; 12], 1.0),
            Err(Error::MalformedCodeword(_))
        ));
        assert!(matches!(
            decode(&[Zero; 8], 0.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            decode(&[Zero; 8], f64::NAN),
            Err(Error::InvalidParameter(_))
        ));
        // Valid inputs
        assert!(decode(&[], 1.0).unwrap().is_empty());
        let (bits, scale) = encode(&[2.0, -1.0, 0.0, 0.02]).unwrap();
        assert_float_eq!(
            decode(&bits, scale).unwrap(),
            [2.0 * 2016.0 / 2048.0, -1.0, 0.0, 2.0 * 20.5 / 2048.0].to_vec(),
            abs_all <= 1e-12
        );
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_round_trip_error_bound() {
        let mut rng = StdRng::seed_from_u64(11);
        let samples: Vec<f64> = (0 .. 5000).map(|_| rng.random_range(-3.0 .. 3.0)).collect();
        let (bits, scale) = encode(&samples).unwrap();
        assert_eq!(bits.len(), 8 * samples.len());
        let samples_hat = decode(&bits, scale).unwrap();
        assert_eq!(samples_hat.len(), samples.len());
        for (&x, &x_hat) in samples.iter().zip(&samples_hat) {
            let segment = segment_of(FULL_SCALE * (x.abs() / scale));
            let bound = f64::from(SEGMENT_STEP[segment]) * (scale / FULL_SCALE);
            assert!((x_hat - x).abs() <= bound + 1e-12);
            assert!(x_hat == 0.0 || x_hat.signum() == x.signum());
        }
    }

    #[test]
    fn test_round_trip_near_max_magnitude() {
        // Codewords depend only on the ratio of each sample to the scale
        let big = 2f64.powi(1020);
        let (bits, scale) = encode(&[big, 0.5 * big, -0.75 * big]).unwrap();
        let (unit_bits, unit_scale) = encode(&[1.0, 0.5, -0.75]).unwrap();
        assert_eq!(bits, unit_bits);
        assert_float_eq!(scale, big, rmax <= 1e-15);
        assert_float_eq!(unit_scale, 1.0, abs <= 1e-15);
        // Round-trip error stays within one step of the sample's segment
        let samples = [f64::MAX, 1e306, 5e305, -f64::MAX / 3.0, 1e300];
        let (bits, scale) = encode(&samples).unwrap();
        assert_float_eq!(scale, f64::MAX, rmax <= 1e-15);
        let samples_hat = decode(&bits, scale).unwrap();
        for (&x, &x_hat) in samples.iter().zip(&samples_hat) {
            assert!(x_hat.is_finite());
            let segment = segment_of(FULL_SCALE * (x.abs() / scale));
            let bound = f64::from(SEGMENT_STEP[segment]) * (scale / FULL_SCALE);
            assert!((x_hat - x).abs() <= bound * (1.0 + 1e-12));
            assert!(x_hat.signum() == x.signum());
        }
    }

    #[test]
    fn test_round_trip_small_samples_keep_resolution() {
        // Samples within the first segment come back within one unit on the normalized scale
        let samples = [1.0, 0.001, -0.004, 0.0075];
        let (bits, scale) = encode(&samples).unwrap();
        let samples_hat = decode(&bits, scale).unwrap();
        for (&x, &x_hat) in samples.iter().zip(&samples_hat) {
            if x.abs() < 16.0 / FULL_SCALE {
                assert!((x_hat - x).abs() <= 1.0 / FULL_SCALE);
            }
        }
    }
}
