// Path: crates/services/src/status/bitstring.rs

//! The fixed-length bit array underlying every status list.
//!
//! Bits are addressed most-significant-first within each byte, matching the
//! StatusList 2021 encoding. The transport form is gzip of the raw byte
//! array, then unpadded base64url; `encode` and `decode` are exact
//! inverses.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use covenant_types::error::StatusError;
use covenant_types::{MAX_STATUS_LIST_LENGTH, MIN_STATUS_LIST_LENGTH};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// A fixed-length bit array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitstring {
    bytes: Vec<u8>,
    len: usize,
}

impl Bitstring {
    /// Creates an all-zero bitstring of `len` bits.
    ///
    /// `len` must be a positive multiple of 8 within
    /// [`MIN_STATUS_LIST_LENGTH`], [`MAX_STATUS_LIST_LENGTH`].
    pub fn new(len: usize) -> Result<Self, StatusError> {
        if len % 8 != 0 || !(MIN_STATUS_LIST_LENGTH..=MAX_STATUS_LIST_LENGTH).contains(&len) {
            return Err(StatusError::InvalidLength(len));
        }
        Ok(Self {
            bytes: vec![0u8; len / 8],
            len,
        })
    }

    /// The number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the bitstring has zero length. Never true for a validly
    /// constructed instance.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads the bit at `index`.
    pub fn get(&self, index: usize) -> Result<bool, StatusError> {
        let (byte, mask) = self.position(index)?;
        Ok(self.bytes.get(byte).copied().unwrap_or(0) & mask != 0)
    }

    /// Writes the bit at `index`.
    pub fn set(&mut self, index: usize, value: bool) -> Result<(), StatusError> {
        let (byte, mask) = self.position(index)?;
        let slot = self
            .bytes
            .get_mut(byte)
            .ok_or(StatusError::OutOfRange {
                index,
                length: self.len,
            })?;
        if value {
            *slot |= mask;
        } else {
            *slot &= !mask;
        }
        Ok(())
    }

    /// The number of set bits.
    pub fn count_set(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Encodes to the transport form: base64url (no padding) of the
    /// gzipped byte array.
    pub fn encode(&self) -> Result<String, StatusError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&self.bytes)
            .and_then(|_| encoder.finish())
            .map(|gz| URL_SAFE_NO_PAD.encode(gz))
            .map_err(|e| StatusError::MalformedEncoding(format!("gzip encode: {e}")))
    }

    /// Decodes the transport form produced by [`Bitstring::encode`].
    ///
    /// When `expected_len` is given, a decoded payload of any other length
    /// is rejected.
    pub fn decode(encoded: &str, expected_len: Option<usize>) -> Result<Self, StatusError> {
        let gz = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| StatusError::MalformedEncoding(format!("base64url: {e}")))?;
        let mut bytes = Vec::new();
        GzDecoder::new(gz.as_slice())
            .read_to_end(&mut bytes)
            .map_err(|e| StatusError::MalformedEncoding(format!("gzip decode: {e}")))?;
        let len = bytes.len() * 8;
        if let Some(expected) = expected_len {
            if len != expected {
                return Err(StatusError::MalformedEncoding(format!(
                    "decoded length {len} bits, expected {expected}"
                )));
            }
        }
        if bytes.is_empty() {
            return Err(StatusError::MalformedEncoding(
                "empty bitstring payload".to_string(),
            ));
        }
        Ok(Self { bytes, len })
    }

    fn position(&self, index: usize) -> Result<(usize, u8), StatusError> {
        if index >= self.len {
            return Err(StatusError::OutOfRange {
                index,
                length: self.len,
            });
        }
        Ok((index / 8, 0x80u8 >> (index % 8)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_length() {
        assert!(Bitstring::new(1024).is_ok());
        assert!(Bitstring::new(131_072).is_ok());
        for bad in [0usize, 7, 1023, 1025, 512, MAX_STATUS_LIST_LENGTH + 8] {
            assert!(Bitstring::new(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn set_get_round_trip_with_sparse_indices() {
        use std::collections::HashSet;

        for len in [1024usize, 8192, 131_072] {
            let mut bits = Bitstring::new(len).unwrap();
            // A deterministic pseudo-random scatter of up to 1000 indices.
            let mut indices = HashSet::new();
            let mut x: usize = 7;
            while indices.len() < 1000 {
                x = (x.wrapping_mul(1103515245).wrapping_add(12345)) % len;
                indices.insert(x);
            }
            for &i in &indices {
                bits.set(i, true).unwrap();
            }
            let decoded = Bitstring::decode(&bits.encode().unwrap(), Some(len)).unwrap();
            for i in 0..len {
                assert_eq!(decoded.get(i).unwrap(), indices.contains(&i), "bit {i}");
            }
            assert_eq!(decoded.count_set(), indices.len());
        }
    }

    #[test]
    fn encode_decode_identity_on_empty_list() {
        let bits = Bitstring::new(8192).unwrap();
        let decoded = Bitstring::decode(&bits.encode().unwrap(), None).unwrap();
        assert_eq!(bits, decoded);
        assert_eq!(decoded.count_set(), 0);
    }

    #[test]
    fn out_of_range_is_typed() {
        let mut bits = Bitstring::new(1024).unwrap();
        assert!(matches!(
            bits.get(1024),
            Err(StatusError::OutOfRange { index: 1024, .. })
        ));
        assert!(matches!(
            bits.set(usize::MAX, true),
            Err(StatusError::OutOfRange { .. })
        ));
    }

    #[test]
    fn malformed_encodings_are_rejected() {
        for bad in ["", "!!!!", "AAAA", "SGVsbG8"] {
            assert!(
                matches!(
                    Bitstring::decode(bad, None),
                    Err(StatusError::MalformedEncoding(_))
                ),
                "{bad:?} should be rejected"
            );
        }
        // Valid payload, wrong declared length.
        let bits = Bitstring::new(1024).unwrap();
        let encoded = bits.encode().unwrap();
        assert!(Bitstring::decode(&encoded, Some(2048)).is_err());
    }

    #[test]
    fn clearing_a_bit_restores_zero() {
        let mut bits = Bitstring::new(1024).unwrap();
        bits.set(9, true).unwrap();
        assert!(bits.get(9).unwrap());
        bits.set(9, false).unwrap();
        assert!(!bits.get(9).unwrap());
        assert_eq!(bits.count_set(), 0);
    }
}
