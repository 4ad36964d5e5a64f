//! Fixed-length perceptual fingerprints.
//!
//! A [`Fingerprint`] is a bitstring packed MSB-first into bytes. The canonical
//! serialized form is a string of `'0'`/`'1'` characters, one per bit, which
//! is what serde produces. A packed hexadecimal form is available for compact
//! storage; it needs the bit length to round-trip.
//!
//! Comparing fingerprints of different lengths is an error. Hashes computed
//! on different grids are never silently truncated or padded.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CardprintError, Result};

/// An immutable perceptual fingerprint. Equality is bit-exact.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl Fingerprint {
    /// Build a fingerprint from individual bits.
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let mut bytes = Vec::new();
        let mut bit_len = 0usize;

        for bit in bits {
            if bit_len % 8 == 0 {
                bytes.push(0u8);
            }
            if bit {
                let last = bytes.len() - 1;
                bytes[last] |= 0x80 >> (bit_len % 8);
            }
            bit_len += 1;
        }

        Self { bytes, bit_len }
    }

    /// Build a fingerprint from packed MSB-first bytes holding `bit_len` bits.
    ///
    /// Padding bits past `bit_len` in the final byte must be zero.
    pub fn from_packed(bytes: Vec<u8>, bit_len: usize) -> Result<Self> {
        let expected = bit_len.div_ceil(8);
        if bytes.len() != expected {
            return Err(CardprintError::InvalidFingerprint(format!(
                "{} packed bytes cannot hold exactly {bit_len} bits",
                bytes.len()
            )));
        }

        let padding = expected * 8 - bit_len;
        if padding > 0 {
            let mask = (1u8 << padding) - 1;
            if bytes[expected - 1] & mask != 0 {
                return Err(CardprintError::InvalidFingerprint(
                    "non-zero padding bits".into(),
                ));
            }
        }

        Ok(Self { bytes, bit_len })
    }

    /// Parse the canonical `'0'`/`'1'` string form.
    pub fn from_bit_str(s: &str) -> Result<Self> {
        let mut invalid = None;
        let fingerprint = Self::from_bits(s.chars().enumerate().map_while(|(i, c)| match c {
            '0' => Some(false),
            '1' => Some(true),
            other => {
                invalid = Some((i, other));
                None
            }
        }));

        match invalid {
            Some((i, c)) => Err(CardprintError::InvalidFingerprint(format!(
                "unexpected character {c:?} at position {i}"
            ))),
            None => Ok(fingerprint),
        }
    }

    /// Parse the packed hexadecimal form.
    pub fn from_hex(hex_str: &str, bit_len: usize) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| CardprintError::InvalidFingerprint(format!("Invalid hex string: {e}")))?;
        Self::from_packed(bytes, bit_len)
    }

    /// Render the canonical `'0'`/`'1'` string form.
    pub fn to_bit_string(&self) -> String {
        self.iter().map(|b| if b { '1' } else { '0' }).collect()
    }

    /// Render the packed hexadecimal form.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Packed MSB-first bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.bit_len
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// Bit at `index`, or `None` past the end.
    pub fn bit(&self, index: usize) -> Option<bool> {
        (index < self.bit_len).then(|| self.bytes[index / 8] & (0x80 >> (index % 8)) != 0)
    }

    /// Iterate over bits in order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.bit_len).map(move |i| self.bytes[i / 8] & (0x80 >> (i % 8)) != 0)
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.bytes.iter().map(|b| b.count_ones()).sum()
    }

    /// Count of differing bit positions.
    ///
    /// # Errors
    ///
    /// Returns [`CardprintError::FingerprintLength`] if the lengths differ.
    pub fn hamming_distance(&self, other: &Self) -> Result<u32> {
        if self.bit_len != other.bit_len {
            return Err(CardprintError::FingerprintLength {
                expected: self.bit_len,
                actual: other.bit_len,
            });
        }
        Ok(hamming_distance(&self.bytes, &other.bytes))
    }

    /// `1 - distance / len`, clamped to `[0, 1]`.
    ///
    /// Two empty fingerprints are considered identical.
    pub fn similarity(&self, other: &Self) -> Result<f64> {
        let distance = self.hamming_distance(other)?;
        Ok(similarity_from_distance(distance, self.bit_len))
    }

    /// Check whether `other` is at least `min_similarity` similar.
    pub fn is_similar(&self, other: &Self, min_similarity: f64) -> Result<bool> {
        Ok(self.similarity(other)? >= min_similarity)
    }
}

/// Count differing bits between two equally sized packed buffers.
///
/// Bytes beyond the shorter buffer are ignored; callers validate lengths.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Convert a Hamming distance over `bit_len` bits into a similarity in `[0, 1]`.
pub fn similarity_from_distance(distance: u32, bit_len: usize) -> f64 {
    if bit_len == 0 {
        return 1.0;
    }
    (1.0 - f64::from(distance) / bit_len as f64).clamp(0.0, 1.0)
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bit_string())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fingerprint")
            .field("bits", &self.bit_len)
            .field("hex", &self.to_hex())
            .finish()
    }
}

impl FromStr for Fingerprint {
    type Err = CardprintError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_bit_str(s)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = CardprintError;

    fn try_from(s: String) -> Result<Self> {
        Self::from_bit_str(&s)
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.to_bit_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_string_roundtrip() {
        let fp = Fingerprint::from_bit_str("1011001110").unwrap();
        assert_eq!(fp.len(), 10);
        assert_eq!(fp.to_bit_string(), "1011001110");
        assert_eq!(fp.as_bytes(), &[0b1011_0011, 0b1000_0000]);
    }

    #[test]
    fn test_invalid_character_rejected() {
        let err = Fingerprint::from_bit_str("01x0").unwrap_err();
        assert!(err.to_string().contains("'x' at position 2"), "{err}");
    }

    #[test]
    fn test_empty_string_is_empty_fingerprint() {
        let fp = Fingerprint::from_bit_str("").unwrap();
        assert!(fp.is_empty());
        assert_eq!(fp.count_ones(), 0);
    }

    #[test]
    fn test_hamming_distance_identical() {
        let a = Fingerprint::from_bit_str("1100101011110000").unwrap();
        assert_eq!(a.hamming_distance(&a).unwrap(), 0);
        assert_eq!(a.similarity(&a).unwrap(), 1.0);
    }

    #[test]
    fn test_hamming_distance_symmetric() {
        let a = Fingerprint::from_bit_str("110010101").unwrap();
        let b = Fingerprint::from_bit_str("011010011").unwrap();
        assert_eq!(a.hamming_distance(&b).unwrap(), 4);
        assert_eq!(b.hamming_distance(&a).unwrap(), 4);
    }

    #[test]
    fn test_hamming_distance_length_mismatch_is_error() {
        let a = Fingerprint::from_bit_str("0000").unwrap();
        let b = Fingerprint::from_bit_str("00000").unwrap();
        let err = a.hamming_distance(&b).unwrap_err();
        assert!(matches!(
            err,
            CardprintError::FingerprintLength {
                expected: 4,
                actual: 5
            }
        ));
    }

    #[test]
    fn test_similarity_inverted() {
        let a = Fingerprint::from_bit_str("0000000000").unwrap();
        let b = Fingerprint::from_bit_str("1111111111").unwrap();
        assert_eq!(a.similarity(&b).unwrap(), 0.0);
        assert!(!a.is_similar(&b, 0.5).unwrap());
    }

    #[test]
    fn test_hex_roundtrip() {
        let fp = Fingerprint::from_bit_str("110111101010110110111").unwrap();
        let hex = fp.to_hex();
        assert_eq!(hex, "deadb8");
        let restored = Fingerprint::from_hex(&hex, 21).unwrap();
        assert_eq!(restored, fp);
    }

    #[test]
    fn test_hex_with_dirty_padding_rejected() {
        assert!(Fingerprint::from_hex("ff", 4).is_err());
        assert!(Fingerprint::from_hex("f0", 4).is_ok());
        assert!(Fingerprint::from_hex("f0f0", 4).is_err());
    }

    #[test]
    fn test_bit_access() {
        let fp = Fingerprint::from_bit_str("0010").unwrap();
        assert_eq!(fp.bit(2), Some(true));
        assert_eq!(fp.bit(3), Some(false));
        assert_eq!(fp.bit(4), None);
        assert_eq!(fp.count_ones(), 1);
    }

    #[test]
    fn test_serde_uses_bit_string() {
        let fp = Fingerprint::from_bit_str("0110").unwrap();
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, "\"0110\"");
        let restored: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, fp);
        assert!(serde_json::from_str::<Fingerprint>("\"01x0\"").is_err());
    }
}
