//! Transaction id generation.
//!
//! Every request carries a caller-chosen correlation id. Ids are derived
//! from 10 cryptographically random bytes, each mapped through a fixed
//! 33-character alphabet that leaves out visually ambiguous glyphs
//! (`l`, `o`, `0`), yielding a fixed-length textual id.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;

use crate::error::ProtocolError;

/// Alphabet used for transaction ids. 33 characters, no `l`, `o` or `0`.
pub const TRANSACTION_ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyz123456789";

/// Length of a generated transaction id, in characters.
pub const TRANSACTION_LEN: usize = 10;

/// A request correlation id.
///
/// Unique among currently pending requests on a connection; the random
/// construction makes collisions vanishingly unlikely even across the
/// lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    /// Generates a fresh random transaction id.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TRANSACTION_LEN];
        rand::rng().fill_bytes(&mut bytes);

        let id = bytes
            .iter()
            .map(|b| TRANSACTION_ALPHABET[*b as usize % TRANSACTION_ALPHABET.len()] as char)
            .collect();
        Self(id)
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id, returning the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TransactionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TransactionId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == TRANSACTION_LEN
            && s.bytes().all(|b| TRANSACTION_ALPHABET.contains(&b));
        if !valid {
            return Err(ProtocolError::InvalidTransactionId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn alphabet_has_33_characters() {
        assert_eq!(TRANSACTION_ALPHABET.len(), 33);
        assert!(!TRANSACTION_ALPHABET.contains(&b'l'));
        assert!(!TRANSACTION_ALPHABET.contains(&b'o'));
        assert!(!TRANSACTION_ALPHABET.contains(&b'0'));
    }

    #[test]
    fn generated_ids_are_fixed_length() {
        for _ in 0..100 {
            let id = TransactionId::generate();
            assert_eq!(id.as_str().len(), TRANSACTION_LEN);
            assert!(
                id.as_str()
                    .bytes()
                    .all(|b| TRANSACTION_ALPHABET.contains(&b))
            );
        }
    }

    #[test]
    fn one_million_ids_have_no_duplicates() {
        let mut seen = HashSet::with_capacity(1_000_000);
        for _ in 0..1_000_000 {
            assert!(seen.insert(TransactionId::generate().into_string()));
        }
    }

    #[test]
    fn parse_roundtrip() {
        let id = TransactionId::generate();
        let parsed: TransactionId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("".parse::<TransactionId>().is_err());
        assert!("short".parse::<TransactionId>().is_err());
        // Right length, but `0` is not in the alphabet.
        assert!("abcdefghi0".parse::<TransactionId>().is_err());
    }
}
