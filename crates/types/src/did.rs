// Path: crates/types/src/did.rs

//! Decentralized identifier parsing and validation.
//!
//! The kernel does not resolve DID documents; it validates the syntactic
//! shape of identifiers it is handed (issuers, actors) and builds DID URLs
//! for verification methods embedded in credential proofs.

use crate::error::CoreError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A syntactically validated decentralized identifier (`did:<method>:<id>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Did {
    raw: String,
    method_end: usize,
}

impl Did {
    /// Parses and validates a DID string.
    ///
    /// The method segment must be non-empty lowercase alphanumerics; the
    /// method-specific identifier must be non-empty and free of whitespace.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let rest = s
            .strip_prefix("did:")
            .ok_or_else(|| CoreError::InvalidDid(format!("missing did: prefix in {s:?}")))?;
        let (method, id) = rest
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidDid(format!("missing method separator in {s:?}")))?;
        if method.is_empty() || !method.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return Err(CoreError::InvalidDid(format!("invalid method {method:?}")));
        }
        if id.is_empty() || id.bytes().any(|b| b.is_ascii_whitespace()) {
            return Err(CoreError::InvalidDid(format!(
                "invalid method-specific id in {s:?}"
            )));
        }
        Ok(Self {
            raw: s.to_string(),
            method_end: 4 + method.len(),
        })
    }

    /// The full identifier string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The DID method segment (e.g. `key`, `web`).
    pub fn method(&self) -> &str {
        &self.raw[4..self.method_end]
    }

    /// Builds the DID URL of a verification method under this identifier.
    pub fn verification_method(&self, fragment: &str) -> String {
        format!("{}#{}", self.raw, fragment)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Did {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Did::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_dids() {
        let did = Did::parse("did:web:issuer.example.com").unwrap();
        assert_eq!(did.method(), "web");
        assert_eq!(
            did.verification_method("key-1"),
            "did:web:issuer.example.com#key-1"
        );
    }

    #[test]
    fn rejects_malformed_dids() {
        for bad in ["", "did:", "did:web", "did::abc", "did:WEB:abc", "did:web: x"] {
            assert!(Did::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
