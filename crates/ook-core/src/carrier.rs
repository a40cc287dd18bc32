//! Quantized carrier lookup table
//!
//! One period of a complex carrier, sampled at the radio's sample rate and
//! stored as interleaved signed 8-bit I/Q pairs:
//!
//! ```text
//! entry[k] = amp · exp(-j·(2π·k·F/F_S + π/2))
//! table    = [I0, Q0, I1, Q1, ..., I(N-1), Q(N-1)]     N = round(F_S / F)
//! ```
//!
//! The fixed π/2 offset makes the first active sample start at I = 0,
//! Q = -amp, which is the polarity the transmit path expects.
//!
//! Both the period length and every component are rounded half-to-even, so
//! e.g. a period of 2.5 samples becomes 2 and a component of -2.5 becomes -2.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OokError, Result};

/// Largest amplitude representable in a signed 8-bit component
pub const MAX_AMPLITUDE: f64 = i8::MAX as f64;

/// Longest carrier period accepted, in I/Q pairs
pub const MAX_PERIOD: usize = 1 << 20;

/// Carrier table parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarrierTableBuilder {
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Carrier frequency in Hz (relative to the radio's centre frequency)
    pub carrier_freq: f64,
    /// Peak amplitude of each component, `0.0..=127.0`
    pub amplitude: f64,
}

impl CarrierTableBuilder {
    /// Create a builder at full 8-bit amplitude
    pub fn new(sample_rate: f64, carrier_freq: f64) -> Self {
        Self {
            sample_rate,
            carrier_freq,
            amplitude: MAX_AMPLITUDE,
        }
    }

    /// Set the peak amplitude
    pub fn amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Check parameters without building
    pub fn validate(&self) -> Result<()> {
        let Self {
            sample_rate,
            carrier_freq,
            amplitude,
        } = *self;

        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(OokError::InvalidParameter(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        if !carrier_freq.is_finite() || carrier_freq <= 0.0 {
            return Err(OokError::InvalidParameter(format!(
                "carrier frequency must be positive, got {carrier_freq}"
            )));
        }
        if carrier_freq > sample_rate / 2.0 {
            return Err(OokError::InvalidParameter(format!(
                "carrier frequency {carrier_freq} Hz exceeds Nyquist limit {} Hz",
                sample_rate / 2.0
            )));
        }
        if !amplitude.is_finite() || !(0.0..=MAX_AMPLITUDE).contains(&amplitude) {
            return Err(OokError::InvalidParameter(format!(
                "amplitude must be within 0..={MAX_AMPLITUDE}, got {amplitude}"
            )));
        }
        let period = (sample_rate / carrier_freq).round_ties_even();
        if period > MAX_PERIOD as f64 {
            return Err(OokError::InvalidParameter(format!(
                "carrier period of {period} samples exceeds {MAX_PERIOD}"
            )));
        }
        Ok(())
    }

    /// Number of I/Q pairs in one carrier period
    pub fn period(&self) -> Result<usize> {
        self.validate()?;
        Ok((self.sample_rate / self.carrier_freq).round_ties_even() as usize)
    }

    /// Build the quantized table
    pub fn build(&self) -> Result<CarrierTable> {
        let period = self.period()?;
        let amp = self.amplitude;

        let mut entries = Vec::with_capacity(period * 2);
        for k in 0..period {
            let theta = -(2.0 * PI * k as f64 * self.carrier_freq / self.sample_rate + FRAC_PI_2);
            entries.push(quantize(amp * theta.cos()));
            entries.push(quantize(amp * theta.sin()));
        }

        let table = CarrierTable {
            entries,
            params: *self,
        };
        debug!(
            period,
            sample_rate = self.sample_rate,
            carrier_freq = self.carrier_freq,
            amplitude = self.amplitude,
            "built carrier table"
        );
        Ok(table)
    }
}

fn quantize(value: f64) -> i8 {
    value.round_ties_even().clamp(i8::MIN as f64, i8::MAX as f64) as i8
}

/// One quantized carrier period, interleaved I/Q
///
/// Immutable once built. Share it between generators through an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct CarrierTable {
    entries: Vec<i8>,
    params: CarrierTableBuilder,
}

impl CarrierTable {
    /// Interleaved entries, I first
    pub fn as_slice(&self) -> &[i8] {
        &self.entries
    }

    /// Number of interleaved entries (twice the period)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a built table
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of I/Q pairs in one carrier period
    pub fn period(&self) -> usize {
        self.entries.len() / 2
    }

    /// Entry at `index` wrapped onto the table
    #[inline]
    pub fn entry(&self, index: usize) -> i8 {
        self.entries[index % self.entries.len()]
    }

    /// In-phase components
    pub fn in_phase(&self) -> Vec<i8> {
        self.entries.iter().step_by(2).copied().collect()
    }

    /// Quadrature components
    pub fn quadrature(&self) -> Vec<i8> {
        self.entries.iter().skip(1).step_by(2).copied().collect()
    }

    /// Iterate `(I, Q)` pairs
    pub fn pairs(&self) -> impl Iterator<Item = (i8, i8)> + '_ {
        self.entries.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// Parameters the table was built from
    pub fn params(&self) -> &CarrierTableBuilder {
        &self.params
    }
}

impl fmt::Display for CarrierTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "I: {:?}", self.in_phase())?;
        writeln!(f, "Q: {:?}", self.quadrature())?;
        write!(f, "period: {}", self.period())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_rate_table() {
        let table = CarrierTableBuilder::new(8.0, 2.0).amplitude(10.0).build().unwrap();

        assert_eq!(table.period(), 4);
        assert_eq!(table.len(), 8);
        assert_eq!(table.as_slice(), &[0, -10, -10, 0, 0, 10, 10, 0]);
    }

    #[test]
    fn test_table_traces_one_rotation() {
        let table = CarrierTableBuilder::new(8.0, 2.0).amplitude(10.0).build().unwrap();
        let step = -2.0 * PI * 2.0 / 8.0;

        let pairs: Vec<(i8, i8)> = table.pairs().collect();
        for (i, q) in &pairs {
            assert!((-10..=10).contains(i));
            assert!((-10..=10).contains(q));
        }

        let mut total = 0.0;
        for k in 0..pairs.len() {
            let (i0, q0) = pairs[k];
            let (i1, q1) = pairs[(k + 1) % pairs.len()];
            let a0 = (q0 as f64).atan2(i0 as f64);
            let a1 = (q1 as f64).atan2(i1 as f64);
            let mut diff = a1 - a0;
            while diff > PI {
                diff -= 2.0 * PI;
            }
            while diff <= -PI {
                diff += 2.0 * PI;
            }
            assert!((diff - step).abs() < 0.15, "step {k}: {diff} vs {step}");
            total += diff;
        }
        assert!((total + 2.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_first_sample_polarity() {
        let table = CarrierTableBuilder::new(2_000_000.0, 14_000.0).build().unwrap();
        assert_eq!(table.entry(0), 0);
        assert_eq!(table.entry(1), -127);
    }

    #[test]
    fn test_period_rounds_half_to_even() {
        // 5 / 2 = 2.5 -> 2
        assert_eq!(CarrierTableBuilder::new(5.0, 2.0).period().unwrap(), 2);
        // 7 / 2 = 3.5 -> 4
        assert_eq!(CarrierTableBuilder::new(7.0, 2.0).period().unwrap(), 4);
        // 2e6 / 14e3 = 142.86 -> 143
        assert_eq!(CarrierTableBuilder::new(2_000_000.0, 14_000.0).period().unwrap(), 143);
    }

    #[test]
    fn test_quantize_half_to_even() {
        assert_eq!(quantize(2.5), 2);
        assert_eq!(quantize(3.5), 4);
        assert_eq!(quantize(-2.5), -2);
        assert_eq!(quantize(-0.4), 0);
        assert_eq!(quantize(127.4), 127);
    }

    #[test]
    fn test_components_within_amplitude() {
        let table = CarrierTableBuilder::new(1_000_000.0, 33_000.0)
            .amplitude(100.0)
            .build()
            .unwrap();
        assert!(table.as_slice().iter().all(|&v| (-100..=100).contains(&v)));
        assert_eq!(table.in_phase().len(), table.period());
        assert_eq!(table.quadrature().len(), table.period());
    }

    #[test]
    fn test_invalid_parameters() {
        let cases = [
            CarrierTableBuilder::new(8.0, 0.0),
            CarrierTableBuilder::new(8.0, 5.0),
            CarrierTableBuilder::new(0.0, 1.0),
            CarrierTableBuilder::new(-8.0, 2.0),
            CarrierTableBuilder::new(8.0, f64::NAN),
            CarrierTableBuilder::new(8.0, 2.0).amplitude(200.0),
            CarrierTableBuilder::new(8.0, 2.0).amplitude(-1.0),
            CarrierTableBuilder::new(2_000_000.0, 1e-9),
            CarrierTableBuilder::new(f64::MAX, f64::MIN_POSITIVE),
        ];
        for builder in cases {
            assert!(
                matches!(builder.build(), Err(OokError::InvalidParameter(_))),
                "{builder:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_period_limit() {
        let slowest = CarrierTableBuilder::new(MAX_PERIOD as f64, 1.0);
        assert_eq!(slowest.period().unwrap(), MAX_PERIOD);

        let too_slow = CarrierTableBuilder::new((MAX_PERIOD + 1) as f64, 1.0);
        assert!(matches!(too_slow.period(), Err(OokError::InvalidParameter(_))));
        assert!(matches!(too_slow.validate(), Err(OokError::InvalidParameter(_))));
    }

    #[test]
    fn test_nyquist_carrier_allowed() {
        let table = CarrierTableBuilder::new(8.0, 4.0).amplitude(10.0).build().unwrap();
        assert_eq!(table.period(), 2);
    }

    #[test]
    fn test_display_lists_components() {
        let table = CarrierTableBuilder::new(8.0, 2.0).amplitude(10.0).build().unwrap();
        let text = table.to_string();
        assert!(text.contains("I: [0, -10, 0, 10]"));
        assert!(text.contains("Q: [-10, 0, 10, 0]"));
        assert!(text.ends_with("period: 4"));
    }
}
