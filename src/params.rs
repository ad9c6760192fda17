//! Parameters shared by every stage of a BPSK link

use serde::{Deserialize, Serialize};

use crate::Error;

/// Modulation order (binary phase-shift keying)
pub const MODULATION_ORDER: u32 = 2;

/// Parameters of one link instance, computed once from the bit rate, carrier frequency, sample
/// rate and number of transmitted symbols
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct LinkParams {
    /// Bit rate (bit/s)
    pub bit_rate: f64,
    /// Modulation order
    pub modulation_order: u32,
    /// Symbol rate (symbol/s)
    pub symbol_rate: f64,
    /// Carrier frequency (Hz)
    pub carrier_freq: f64,
    /// Sample rate (Hz)
    pub sample_rate: f64,
    /// Number of samples per symbol
    pub samples_per_symbol: usize,
    /// Number of transmitted symbols
    pub num_symbols: usize,
    /// Total number of samples in the waveform
    pub num_samples: usize,
}

impl LinkParams {
    /// Returns parameters for a link carrying a given number of symbols.
    ///
    /// # Parameters
    ///
    /// - `num_symbols`: Number of symbols (equivalently, bits) to be transmitted.
    ///
    /// - `bit_rate`: Bit rate (bit/s).
    ///
    /// - `carrier_freq`: Carrier frequency (Hz).
    ///
    /// - `sample_rate`: Sample rate (Hz).
    ///
    /// # Errors
    ///
    /// Returns an error if `num_symbols` is `0`, if the bit rate or sample rate is not a positive
    /// finite number, if the carrier frequency is negative or not finite, or if the sample rate is
    /// less than the symbol rate (which would leave less than one sample per symbol).
    ///
    /// # Examples
    ///
    /// ```
    /// use pcmlink::LinkParams;
    ///
    /// let params = LinkParams::new(4, 50.0, 5000.0, 10000.0)?;
    /// assert_eq!(params.samples_per_symbol, 200);
    /// assert_eq!(params.num_samples, 800);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(
        num_symbols: usize,
        bit_rate: f64,
        carrier_freq: f64,
        sample_rate: f64,
    ) -> Result<Self, Error> {
        if num_symbols == 0 {
            return Err(Error::InvalidInput(
                "Number of symbols must be a positive integer".to_string(),
            ));
        }
        if !(bit_rate.is_finite() && bit_rate > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "Bit rate must be positive and finite (found {bit_rate})"
            )));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "Sample rate must be positive and finite (found {sample_rate})"
            )));
        }
        if !(carrier_freq.is_finite() && carrier_freq >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "Carrier frequency must be nonnegative and finite (found {carrier_freq})"
            )));
        }
        let symbol_rate = bit_rate * f64::from(MODULATION_ORDER).log2();
        let samples_per_symbol = (sample_rate / symbol_rate).floor();
        if samples_per_symbol < 1.0 {
            return Err(Error::InvalidParameter(format!(
                "Sample rate {sample_rate} Hz gives less than one sample per symbol at symbol \
                 rate {symbol_rate} symbol/s"
            )));
        }
        let samples_per_symbol = samples_per_symbol as usize;
        let num_samples = num_symbols.checked_mul(samples_per_symbol).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "{num_symbols} symbols of {samples_per_symbol} samples overflow the sample count"
            ))
        })?;
        Ok(Self {
            bit_rate,
            modulation_order: MODULATION_ORDER,
            symbol_rate,
            carrier_freq,
            sample_rate,
            samples_per_symbol,
            num_symbols,
            num_samples,
        })
    }

    /// Returns sampling instant (s) of the sample with the given index.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn time(&self, index: usize) -> f64 {
        index as f64 / self.sample_rate
    }

    /// Returns sampling instants (s) of all samples in the waveform.
    pub fn time_grid(&self) -> impl Iterator<Item = f64> + '_ {
        (0 .. self.num_samples).map(|index| self.time(index))
    }

    /// Returns energy per bit used to normalize the receiver reference.
    #[must_use]
    pub fn energy_per_bit(&self) -> f64 {
        self.bit_rate * f64::from(self.modulation_order) / self.symbol_rate
    }

    /// Returns symbol energy used to normalize the receiver reference.
    #[must_use]
    pub fn symbol_energy(&self) -> f64 {
        self.energy_per_bit() * self.symbol_rate
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn test_new() {
        // Invalid inputs
        assert!(matches!(
            LinkParams::new(0, 50.0, 5000.0, 10000.0),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            LinkParams::new(4, 0.0, 5000.0, 10000.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            LinkParams::new(4, -50.0, 5000.0, 10000.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            LinkParams::new(4, 50.0, 5000.0, 0.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            LinkParams::new(4, 50.0, -1.0, 10000.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            LinkParams::new(4, 50.0, f64::NAN, 10000.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            LinkParams::new(4, 10000.0, 5000.0, 9999.0),
            Err(Error::InvalidParameter(_))
        ));
        // Valid inputs
        let params = LinkParams::new(4, 50.0, 5000.0, 10000.0).unwrap();
        assert_eq!(params.modulation_order, 2);
        assert_float_eq!(params.symbol_rate, 50.0, abs <= 1e-12);
        assert_eq!(params.samples_per_symbol, 200);
        assert_eq!(params.num_symbols, 4);
        assert_eq!(params.num_samples, 800);
        // One sample per symbol is the smallest usable grid
        let params = LinkParams::new(3, 10000.0, 0.0, 10000.0).unwrap();
        assert_eq!(params.samples_per_symbol, 1);
        assert_eq!(params.num_samples, 3);
    }

    #[test]
    fn test_samples_per_symbol_is_floored() {
        let params = LinkParams::new(2, 30.0, 1000.0, 100.0).unwrap();
        assert_eq!(params.samples_per_symbol, 3);
        assert_eq!(params.num_samples, 6);
    }

    #[test]
    fn test_time_grid() {
        let params = LinkParams::new(2, 1000.0, 500.0, 4000.0).unwrap();
        let time: Vec<f64> = params.time_grid().collect();
        assert_float_eq!(
            time,
            [0.0, 0.00025, 0.0005, 0.00075, 0.001, 0.00125, 0.0015, 0.00175].to_vec(),
            abs_all <= 1e-15
        );
        assert_float_eq!(params.time(3), 0.00075, abs <= 1e-15);
    }

    #[test]
    fn test_energy() {
        let params = LinkParams::new(4, 50.0, 5000.0, 10000.0).unwrap();
        assert_float_eq!(params.energy_per_bit(), 2.0, abs <= 1e-12);
        assert_float_eq!(params.symbol_energy(), 100.0, abs <= 1e-12);
    }
}
