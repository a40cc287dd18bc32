//! OOK waveform synthesis
//!
//! Expands a symbol string into interleaved I/Q samples:
//!
//! | Symbol | Output                                   | Phase counter      |
//! |--------|------------------------------------------|--------------------|
//! | `1`    | `symbol_len` carrier table entries       | `+= symbol_len`    |
//! | `0`    | `symbol_len` zeros                       | `+= symbol_len`    |
//! | `p`    | `pause_len` zeros                        | `+= pause_len`     |
//! | other  | nothing, reported as malformed           | unchanged          |
//!
//! Lengths are counted in interleaved entries, so a symbol of `n` complex
//! samples emits `2n` values.
//!
//! The carrier table is indexed by a running [`PhaseCounter`] rather than
//! restarting at zero for every active symbol. The counter also advances
//! through silence, so a `1` after any run of `0`/`p` resumes the carrier as
//! if it had kept running underneath.

use std::convert::Infallible;
use std::ops::ControlFlow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::buffer::SampleBuffer;
use crate::carrier::{CarrierTable, CarrierTableBuilder, MAX_AMPLITUDE};
use crate::error::{OokError, Result};

/// One transmitted unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// Carrier on for one symbol period (`1`)
    Active,
    /// Carrier off for one symbol period (`0`)
    Inactive,
    /// Carrier off for one pause period (`p`)
    Pause,
}

impl Symbol {
    /// Character used in symbol strings
    pub fn as_char(self) -> char {
        match self {
            Symbol::Active => '1',
            Symbol::Inactive => '0',
            Symbol::Pause => 'p',
        }
    }
}

impl TryFrom<char> for Symbol {
    type Error = char;

    fn try_from(c: char) -> std::result::Result<Self, char> {
        match c {
            '1' => Ok(Symbol::Active),
            '0' => Ok(Symbol::Inactive),
            'p' => Ok(Symbol::Pause),
            other => Err(other),
        }
    }
}

/// A character outside the symbol alphabet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedSymbol {
    /// Offending character
    pub symbol: char,
    /// Character index within the symbol string
    pub position: usize,
}

impl From<MalformedSymbol> for OokError {
    fn from(m: MalformedSymbol) -> Self {
        OokError::MalformedSymbol {
            symbol: m.symbol,
            position: m.position,
        }
    }
}

/// Report every character that is not `1`, `0` or `p`
pub fn validate(packet: &str) -> Vec<MalformedSymbol> {
    packet
        .chars()
        .enumerate()
        .filter(|(_, c)| Symbol::try_from(*c).is_err())
        .map(|(position, symbol)| MalformedSymbol { symbol, position })
        .collect()
}

/// Running count of entries emitted since the start of a packet
///
/// Selects the carrier table entry for each active sample. Lives for a
/// single [`WaveformGenerator::generate`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseCounter(usize);

impl PhaseCounter {
    /// Counter at phase zero
    pub fn new() -> Self {
        Self(0)
    }

    /// Entries counted so far
    pub fn value(&self) -> usize {
        self.0
    }

    /// Account for `entries` emitted (or silently elapsed) entries
    pub fn advance(&mut self, entries: usize) {
        self.0 += entries;
    }

    /// Table index for the `offset`-th entry of the current symbol
    #[inline]
    pub fn table_index(&self, offset: usize, table_len: usize) -> usize {
        (offset + self.0) % table_len
    }
}

/// OOK modulation parameters
///
/// `symbol_len` and `pause_len` are in complex samples; the generator
/// doubles them for the interleaved layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OokParams {
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Carrier frequency in Hz
    pub carrier_freq: f64,
    /// Samples per `0`/`1` symbol
    pub symbol_len: usize,
    /// Samples per `p` pause
    pub pause_len: usize,
    /// Peak component amplitude
    pub amplitude: f64,
}

impl Default for OokParams {
    fn default() -> Self {
        Self {
            sample_rate: 2_000_000.0,
            carrier_freq: 14_000.0,
            symbol_len: 800,
            pause_len: 20_000,
            amplitude: MAX_AMPLITUDE,
        }
    }
}

impl OokParams {
    /// Builder: set sample rate
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Builder: set carrier frequency
    pub fn with_carrier_freq(mut self, carrier_freq: f64) -> Self {
        self.carrier_freq = carrier_freq;
        self
    }

    /// Builder: set symbol length in samples
    pub fn with_symbol_len(mut self, symbol_len: usize) -> Self {
        self.symbol_len = symbol_len;
        self
    }

    /// Builder: set pause length in samples
    pub fn with_pause_len(mut self, pause_len: usize) -> Self {
        self.pause_len = pause_len;
        self
    }

    /// Builder: set amplitude
    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Carrier table parameters
    pub fn carrier(&self) -> CarrierTableBuilder {
        CarrierTableBuilder::new(self.sample_rate, self.carrier_freq).amplitude(self.amplitude)
    }

    /// Symbol duration in seconds
    pub fn symbol_duration(&self) -> f64 {
        self.symbol_len as f64 / self.sample_rate
    }

    /// Pause duration in seconds
    pub fn pause_duration(&self) -> f64 {
        self.pause_len as f64 / self.sample_rate
    }
}

/// Result of a permissive generation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Synthesis {
    /// Samples for every valid symbol
    pub samples: SampleBuffer,
    /// Characters that were skipped
    pub malformed: Vec<MalformedSymbol>,
}

impl Synthesis {
    /// True when every character was a valid symbol
    pub fn is_clean(&self) -> bool {
        self.malformed.is_empty()
    }
}

/// OOK waveform generator
#[derive(Debug, Clone)]
pub struct WaveformGenerator {
    table: Arc<CarrierTable>,
    /// Entries per `0`/`1` symbol (already doubled)
    symbol_len: usize,
    /// Entries per `p` (already doubled)
    pause_len: usize,
}

impl WaveformGenerator {
    /// Build a carrier table and a generator from parameters
    pub fn new(params: &OokParams) -> Result<Self> {
        let table = params.carrier().build()?;
        Ok(Self::with_table(
            Arc::new(table),
            params.symbol_len,
            params.pause_len,
        ))
    }

    /// Generator over an existing, possibly shared, carrier table
    ///
    /// `symbol_len` and `pause_len` are in complex samples.
    pub fn with_table(table: Arc<CarrierTable>, symbol_len: usize, pause_len: usize) -> Self {
        Self {
            table,
            symbol_len: symbol_len * 2,
            pause_len: pause_len * 2,
        }
    }

    /// Carrier table in use
    pub fn table(&self) -> &Arc<CarrierTable> {
        &self.table
    }

    /// Entries emitted per `0`/`1`
    pub fn symbol_len(&self) -> usize {
        self.symbol_len
    }

    /// Entries emitted per `p`
    pub fn pause_len(&self) -> usize {
        self.pause_len
    }

    /// Output length for `packet`, skipping malformed characters
    pub fn samples_for(&self, packet: &str) -> usize {
        packet
            .chars()
            .filter_map(|c| Symbol::try_from(c).ok())
            .map(|s| self.entries_for(s))
            .sum()
    }

    /// Airtime of a buffer in seconds
    pub fn duration(&self, samples: &SampleBuffer) -> f64 {
        samples.complex_len() as f64 / self.table.params().sample_rate
    }

    /// Generate samples, skipping and reporting malformed characters
    pub fn generate(&self, packet: &str) -> Synthesis {
        let mut malformed = Vec::new();
        let result = self.synthesize(packet, |m| -> ControlFlow<Infallible> {
            warn!(symbol = %m.symbol, position = m.position, "unknown symbol skipped");
            malformed.push(m);
            ControlFlow::Continue(())
        });
        let samples = match result {
            Ok(samples) => samples,
            Err(never) => match never {},
        };

        debug!(
            symbols = packet.chars().count(),
            entries = samples.len(),
            malformed = malformed.len(),
            "generated OOK packet"
        );
        Synthesis { samples, malformed }
    }

    /// Generate samples, failing on the first malformed character
    pub fn generate_strict(&self, packet: &str) -> Result<SampleBuffer> {
        self.synthesize(packet, ControlFlow::Break).map_err(OokError::from)
    }

    fn entries_for(&self, symbol: Symbol) -> usize {
        match symbol {
            Symbol::Active | Symbol::Inactive => self.symbol_len,
            Symbol::Pause => self.pause_len,
        }
    }

    /// Expand `packet`; `on_malformed` decides whether to stop at a bad character
    fn synthesize<B, F>(
        &self,
        packet: &str,
        mut on_malformed: F,
    ) -> std::result::Result<SampleBuffer, B>
    where
        F: FnMut(MalformedSymbol) -> ControlFlow<B>,
    {
        let table = self.table.as_slice();
        let mut out = SampleBuffer::with_capacity(self.samples_for(packet));
        let mut ctr = PhaseCounter::new();

        for (position, c) in packet.chars().enumerate() {
            match Symbol::try_from(c) {
                Ok(Symbol::Active) => {
                    for i in 0..self.symbol_len {
                        out.push(table[ctr.table_index(i, table.len())]);
                    }
                    ctr.advance(self.symbol_len);
                }
                Ok(Symbol::Inactive) => {
                    out.push_silence(self.symbol_len);
                    ctr.advance(self.symbol_len);
                }
                Ok(Symbol::Pause) => {
                    out.push_silence(self.pause_len);
                    ctr.advance(self.pause_len);
                }
                Err(symbol) => {
                    let report = MalformedSymbol { symbol, position };
                    if let ControlFlow::Break(b) = on_malformed(report) {
                        return Err(b);
                    }
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> WaveformGenerator {
        // Period 4 pairs = 8 entries; 3 samples per symbol = 6 entries
        let params = OokParams::default()
            .with_sample_rate(8.0)
            .with_carrier_freq(2.0)
            .with_amplitude(10.0)
            .with_symbol_len(3)
            .with_pause_len(5);
        WaveformGenerator::new(&params).unwrap()
    }

    #[test]
    fn test_inactive_is_silence() {
        let wg = small();
        let out = wg.generate("0");
        assert_eq!(out.samples.len(), 6);
        assert!(out.samples.as_slice().iter().all(|&s| s == 0));
        assert!(out.is_clean());
    }

    #[test]
    fn test_pause_is_silence() {
        let wg = small();
        let out = wg.generate("p");
        assert_eq!(out.samples.len(), 10);
        assert!(out.samples.as_slice().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_active_reads_table() {
        let wg = small();
        let out = wg.generate("1");
        assert_eq!(out.samples.as_slice(), &[0, -10, -10, 0, 0, 10]);
    }

    #[test]
    fn test_consecutive_actives_are_phase_continuous() {
        let wg = small();
        let table = wg.table().clone();
        let sl = wg.symbol_len();
        let out = wg.generate("11");

        assert_eq!(out.samples.as_slice()[sl], table.entry(sl % table.len()));
        assert_ne!(out.samples.as_slice()[sl..sl + 2], table.as_slice()[0..2]);

        for (k, &s) in out.samples.as_slice().iter().enumerate() {
            assert_eq!(s, table.entry(k));
        }
    }

    #[test]
    fn test_phase_advances_through_silence() {
        let wg = small();
        let table = wg.table().clone();
        let sl = wg.symbol_len();
        let pl = wg.pause_len();
        let out = wg.generate("10p1");

        let start = 2 * sl + pl;
        let second = &out.samples.as_slice()[start..start + sl];
        for (i, &s) in second.iter().enumerate() {
            assert_eq!(s, table.entry(start + i));
        }
    }

    #[test]
    fn test_malformed_is_reported_and_skipped() {
        let wg = small();
        let out = wg.generate("1q0");

        assert_eq!(
            out.malformed,
            vec![MalformedSymbol { symbol: 'q', position: 1 }]
        );
        assert_eq!(out.samples.len(), 2 * wg.symbol_len());
        assert_eq!(out.samples, wg.generate("10").samples);
    }

    #[test]
    fn test_malformed_does_not_advance_phase() {
        let wg = small();
        assert_eq!(wg.generate("1x1").samples, wg.generate("11").samples);
    }

    #[test]
    fn test_permissive_keeps_every_valid_symbol() {
        let wg = small();
        let packet = "x1y0zp1?";
        let out = wg.generate(packet);

        assert_eq!(out.malformed.len(), 4);
        assert_eq!(out.samples.len(), wg.samples_for(packet));
        assert_eq!(out.samples, wg.generate("10p1").samples);
    }

    #[test]
    fn test_strict_mode_aborts() {
        let wg = small();
        let err = wg.generate_strict("10?1").unwrap_err();
        assert!(matches!(
            err,
            OokError::MalformedSymbol { symbol: '?', position: 2 }
        ));
        assert_eq!(wg.generate_strict("10p1").unwrap(), wg.generate("10p1").samples);
    }

    #[test]
    fn test_generation_is_stateless_across_calls() {
        let wg = small();
        let first = wg.generate("1101");
        let _ = wg.generate("1");
        let again = wg.generate("1101");
        assert_eq!(first, again);
    }

    #[test]
    fn test_samples_for_and_duration() {
        let params = OokParams::default();
        let wg = WaveformGenerator::new(&params).unwrap();
        assert_eq!(wg.samples_for("10p"), 1600 + 1600 + 40_000);
        assert_eq!(wg.samples_for("1?"), 1600);

        let out = wg.generate("1p");
        assert_eq!(out.samples.len(), wg.samples_for("1p"));
        let expected = (800.0 + 20_000.0) / 2_000_000.0;
        assert!((wg.duration(&out.samples) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_empty_packet() {
        let wg = small();
        let out = wg.generate("");
        assert!(out.samples.is_empty());
        assert!(out.is_clean());
    }

    #[test]
    fn test_validate() {
        assert!(validate("10p").is_empty());
        let bad = validate("1ab0");
        assert_eq!(bad.len(), 2);
        assert_eq!(bad[0], MalformedSymbol { symbol: 'a', position: 1 });
        assert_eq!(bad[1], MalformedSymbol { symbol: 'b', position: 2 });
    }

    #[test]
    fn test_symbol_chars() {
        for c in ['1', '0', 'p'] {
            assert_eq!(Symbol::try_from(c).unwrap().as_char(), c);
        }
        assert_eq!(Symbol::try_from('P'), Err('P'));
    }

    #[test]
    fn test_phase_counter() {
        let mut ctr = PhaseCounter::new();
        assert_eq!(ctr.table_index(3, 8), 3);
        ctr.advance(6);
        assert_eq!(ctr.value(), 6);
        assert_eq!(ctr.table_index(3, 8), 1);
    }

    #[test]
    fn test_shared_table_across_threads() {
        let wg = small();
        let table = wg.table().clone();
        let expected = wg.generate("1011p1").samples;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let table = Arc::clone(&table);
                std::thread::spawn(move || {
                    WaveformGenerator::with_table(table, 3, 5).generate("1011p1").samples
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_random_packets_length() {
        use rand::Rng;

        let wg = small();
        let alphabet = ['1', '0', 'p', 'z'];
        let mut rng = rand::thread_rng();

        for _ in 0..50 {
            let len = rng.gen_range(0..30);
            let packet: String = (0..len).map(|_| alphabet[rng.gen_range(0..4)]).collect();
            let out = wg.generate(&packet);

            let expected: usize = packet
                .chars()
                .map(|c| match c {
                    '1' | '0' => 6,
                    'p' => 10,
                    _ => 0,
                })
                .sum();
            assert_eq!(out.samples.len(), expected);
            assert_eq!(out.malformed.len(), packet.matches('z').count());
        }
    }
}
