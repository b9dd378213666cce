//! Ledger references and invitation tokens.

use sha2::{Digest, Sha256};
use uuid::Uuid;

const SPLIT_PREFIX: &str = "splt-";
const SPLIT_SUFFIX_LEN: usize = 10;

/// Generates unique identifiers handed out by the engine.
pub trait ReferenceGenerator: Send + Sync + std::fmt::Debug {
    /// A unique ledger reference for one side of a split settlement.
    fn split_reference(&self) -> String;

    /// A raw invitation token (hex of 32 random bytes).
    fn invitation_token(&self) -> String;
}

/// Default generator built on UUID v4 randomness.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomReferences;

impl ReferenceGenerator for RandomReferences {
    fn split_reference(&self) -> String {
        let random = Uuid::new_v4().simple().to_string();
        format!("{SPLIT_PREFIX}{}", &random[..SPLIT_SUFFIX_LEN])
    }

    fn invitation_token(&self) -> String {
        let mut bytes = [0_u8; 32];
        bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
        bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
        hex::encode(bytes)
    }
}

/// Hex SHA-256 of a raw token. Only the hash is persisted.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_references_are_prefixed_and_distinct() {
        let generator = RandomReferences;
        let a = generator.split_reference();
        let b = generator.split_reference();
        assert!(a.starts_with("splt-"));
        assert_eq!(a.len(), SPLIT_PREFIX.len() + SPLIT_SUFFIX_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn tokens_are_64_hex_chars() {
        let token = RandomReferences.invitation_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn token_hash_is_stable_sha256() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(hash_token("abc"), "abc");
    }
}
