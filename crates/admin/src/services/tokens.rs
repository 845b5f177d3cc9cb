//! Bearer token generation and hashing.
//!
//! Tokens are 256 random bits, URL-safe base64 encoded. Only the SHA-256
//! hex digest is ever stored.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// A freshly generated token and the digest to store.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Shown to the operator once, never stored.
    pub token: String,
    /// SHA-256 hex digest of `token`.
    pub hash: String,
}

impl IssuedToken {
    /// Generate a new random token.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);
        let hash = hash_token(&token);
        Self { token, hash }
    }
}

/// SHA-256 hex digest of a bearer token.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_hex() {
        let hash = hash_token("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_generated_tokens_differ() {
        let a = IssuedToken::generate();
        let b = IssuedToken::generate();
        assert_ne!(a.token, b.token);
        assert_eq!(a.hash, hash_token(&a.token));
        assert_eq!(a.token.len(), 43);
    }
}
