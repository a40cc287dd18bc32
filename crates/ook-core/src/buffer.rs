//! Interleaved signed 8-bit I/Q sample buffer
//!
//! The layout is `I, Q, I, Q, ...`, one `i8` per component, which is what
//! a HackRF-class transmitter consumes and what `hackrf_transfer -t` reads
//! from disk.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::Result;

/// Generated baseband samples, interleaved I/Q
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleBuffer {
    samples: Vec<i8>,
}

impl SampleBuffer {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty buffer with room for `capacity` components
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Number of components (twice the number of complex samples)
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples have been emitted
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of complex samples
    pub fn complex_len(&self) -> usize {
        self.samples.len() / 2
    }

    /// Interleaved components
    pub fn as_slice(&self) -> &[i8] {
        &self.samples
    }

    /// Take ownership of the components
    pub fn into_inner(self) -> Vec<i8> {
        self.samples
    }

    /// Iterate `(I, Q)` pairs
    pub fn iq_pairs(&self) -> impl Iterator<Item = (i8, i8)> + '_ {
        self.samples.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// Append the contents of another buffer
    pub fn extend_from(&mut self, other: &SampleBuffer) {
        self.samples.extend_from_slice(&other.samples);
    }

    /// Concatenate `count` copies for back-to-back replay
    pub fn repeat(&self, count: usize) -> SampleBuffer {
        Self {
            samples: self.samples.repeat(count),
        }
    }

    /// Two's-complement bytes as handed to the transmitter
    pub fn to_bytes(&self) -> Vec<u8> {
        self.samples.iter().map(|&s| s as u8).collect()
    }

    /// Rebuild a buffer from raw two's-complement bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            samples: bytes.iter().map(|&b| b as i8).collect(),
        }
    }

    /// Write raw int8 I/Q to `writer`
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Read raw int8 I/Q until EOF
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Write raw int8 I/Q to a file, replacing it
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }

    /// Read a raw int8 I/Q file
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }

    pub(crate) fn push(&mut self, sample: i8) {
        self.samples.push(sample);
    }

    pub(crate) fn push_silence(&mut self, count: usize) {
        self.samples.resize(self.samples.len() + count, 0);
    }
}

impl From<Vec<i8>> for SampleBuffer {
    fn from(samples: Vec<i8>) -> Self {
        Self { samples }
    }
}

impl AsRef<[i8]> for SampleBuffer {
    fn as_ref(&self) -> &[i8] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat() {
        let buf = SampleBuffer::from(vec![1, -1]);
        assert_eq!(buf.repeat(3).as_slice(), &[1, -1, 1, -1, 1, -1]);
        assert!(buf.repeat(0).is_empty());
    }

    #[test]
    fn test_bytes_are_twos_complement() {
        let buf = SampleBuffer::from(vec![0, -1, 127, -128]);
        assert_eq!(buf.to_bytes(), vec![0x00, 0xFF, 0x7F, 0x80]);
        assert_eq!(SampleBuffer::from_bytes(&buf.to_bytes()), buf);
    }

    #[test]
    fn test_iq_pairs() {
        let buf = SampleBuffer::from(vec![1, 2, 3, 4]);
        let pairs: Vec<_> = buf.iq_pairs().collect();
        assert_eq!(pairs, vec![(1, 2), (3, 4)]);
        assert_eq!(buf.complex_len(), 2);
    }

    #[test]
    fn test_write_and_read_stream() {
        let buf = SampleBuffer::from(vec![0, -127, 5, 9]);
        let mut raw = Vec::new();
        buf.write_to(&mut raw).unwrap();
        assert_eq!(raw, vec![0x00, 0x81, 0x05, 0x09]);

        let back = SampleBuffer::read_from(raw.as_slice()).unwrap();
        assert_eq!(back, buf);
    }

    #[test]
    fn test_push_silence() {
        let mut buf = SampleBuffer::new();
        buf.push(3);
        buf.push_silence(4);
        assert_eq!(buf.as_slice(), &[3, 0, 0, 0, 0]);
    }
}
