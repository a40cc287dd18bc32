//! Symbol substitution encoding
//!
//! Maps each character of an application message to a replacement string,
//! e.g. pulse-width encoding where a logical `0` is sent as `100` and a
//! logical `1` as `110`. Characters without a mapping pass through
//! verbatim, which lets control symbols such as the `p` pause marker flow
//! straight into the waveform generator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{OokError, Result};

/// Character-to-string substitution table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEncoder {
    table: HashMap<char, String>,
}

impl SymbolEncoder {
    /// Create an empty encoder (identity mapping)
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulse-width encoding used by JZFR22-style doorbells: `0 -> 100`, `1 -> 110`
    pub fn pwm_doorbell() -> Self {
        Self::new().map('0', "100").map('1', "110")
    }

    /// Builder: add or replace a mapping
    pub fn map(mut self, from: char, to: impl Into<String>) -> Self {
        self.table.insert(from, to.into());
        self
    }

    /// Parse `"0=100,1=110"` style mapping lists
    ///
    /// Each entry is a single source character, `=`, and its replacement
    /// (which may be empty). Whitespace around entries is ignored.
    pub fn parse_pairs(pairs: &str) -> Result<Self> {
        let mut encoder = Self::new();
        for entry in pairs.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (from, to) = entry.split_once('=').ok_or_else(|| {
                OokError::InvalidParameter(format!("mapping entry '{entry}' is missing '='"))
            })?;
            let mut chars = from.chars();
            let key = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(OokError::InvalidParameter(format!(
                        "mapping key '{from}' must be a single character"
                    )))
                }
            };
            encoder.table.insert(key, to.to_string());
        }
        Ok(encoder)
    }

    /// Replacement for `c`, if mapped
    pub fn get(&self, c: char) -> Option<&str> {
        self.table.get(&c).map(String::as_str)
    }

    /// Number of mapped characters
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when no characters are mapped
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Encode a message
    ///
    /// Mapped characters are replaced in input order; unmapped ones are
    /// echoed unchanged. Nothing is dropped.
    pub fn encode(&self, message: &str) -> String {
        let mut out = String::with_capacity(message.len() * 3);
        for c in message.chars() {
            match self.table.get(&c) {
                Some(replacement) => out.push_str(replacement),
                None => out.push(c),
            }
        }
        out
    }
}

impl From<HashMap<char, String>> for SymbolEncoder {
    fn from(table: HashMap<char, String>) -> Self {
        Self { table }
    }
}

impl<S: Into<String>> FromIterator<(char, S)> for SymbolEncoder {
    fn from_iter<I: IntoIterator<Item = (char, S)>>(iter: I) -> Self {
        Self {
            table: iter.into_iter().map(|(c, s)| (c, s.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_mapped() {
        let enc = SymbolEncoder::pwm_doorbell();
        assert_eq!(enc.encode("01"), "100110");
    }

    #[test]
    fn test_unmapped_passthrough() {
        let enc = SymbolEncoder::pwm_doorbell();
        assert_eq!(enc.encode("0x1"), "100x110");
        assert_eq!(enc.encode("1p"), "110p");
    }

    #[test]
    fn test_doorbell_frame() {
        let enc = SymbolEncoder::pwm_doorbell();
        let packet = enc.encode("01100110") + "1p";
        assert_eq!(packet, "1001101101001001101101001p");
    }

    #[test]
    fn test_identity_when_empty() {
        let enc = SymbolEncoder::new();
        assert!(enc.is_empty());
        assert_eq!(enc.encode("10p?"), "10p?");
        assert_eq!(enc.encode(""), "");
    }

    #[test]
    fn test_no_recursive_substitution() {
        // Replacement text is not re-encoded
        let enc: SymbolEncoder = [('a', "b"), ('b', "c")].into_iter().collect();
        assert_eq!(enc.encode("ab"), "bc");
    }

    #[test]
    fn test_overlapping_targets() {
        let enc = SymbolEncoder::new().map('x', "1").map('y', "1").map('z', "");
        assert_eq!(enc.encode("xyz0"), "110");
    }

    #[test]
    fn test_parse_pairs() {
        let enc = SymbolEncoder::parse_pairs("0=100, 1=110").unwrap();
        assert_eq!(enc, SymbolEncoder::pwm_doorbell());

        let enc = SymbolEncoder::parse_pairs("s=").unwrap();
        assert_eq!(enc.get('s'), Some(""));

        assert!(SymbolEncoder::parse_pairs("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_pairs_rejects_bad_entries() {
        assert!(matches!(
            SymbolEncoder::parse_pairs("0:100"),
            Err(OokError::InvalidParameter(_))
        ));
        assert!(matches!(
            SymbolEncoder::parse_pairs("01=100"),
            Err(OokError::InvalidParameter(_))
        ));
        assert!(matches!(
            SymbolEncoder::parse_pairs("=100"),
            Err(OokError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_random_messages_preserve_unmapped() {
        use rand::Rng;

        let enc = SymbolEncoder::pwm_doorbell();
        let alphabet = ['0', '1', 'p', 'x'];
        let mut rng = rand::thread_rng();

        for _ in 0..100 {
            let len = rng.gen_range(0..40);
            let msg: String = (0..len).map(|_| alphabet[rng.gen_range(0..4)]).collect();
            let encoded = enc.encode(&msg);

            let mapped = msg.chars().filter(|c| *c == '0' || *c == '1').count();
            assert_eq!(encoded.chars().count(), msg.chars().count() + 2 * mapped);

            let passthrough: String = msg.chars().filter(|c| *c == 'p' || *c == 'x').collect();
            let survived: String = encoded.chars().filter(|c| *c == 'p' || *c == 'x').collect();
            assert_eq!(passthrough, survived);
        }
    }
}
