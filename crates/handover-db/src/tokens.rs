//! Sign-in token generation. Only the SHA-256 digest of a token is stored.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes per token (hex-encoded to twice this length).
pub const TOKEN_BYTES: usize = 32;

/// A freshly generated token and the digest to persist.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub hash: String,
}

pub fn generate() -> IssuedToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let hash = hash(&token);
    IssuedToken { token, hash }
}

pub fn hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.trim().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique_and_hashed() {
        let a = generate();
        let b = generate();
        assert_ne!(a.token, b.token);
        assert_eq!(a.token.len(), TOKEN_BYTES * 2);
        assert_eq!(a.hash, hash(&a.token));
        assert_ne!(a.hash, a.token);
    }

    #[test]
    fn test_hash_ignores_surrounding_whitespace() {
        assert_eq!(hash("abc"), hash(" abc\n"));
    }
}
