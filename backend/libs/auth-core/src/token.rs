use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub struct Minted {
    pub token: String,
    pub hash: Vec<u8>,
}

/// Mint an opaque bearer token: 32 random bytes, URL-safe base64 without
/// padding. Only the hash is meant to be stored.
pub fn mint() -> Minted {
    let mut raw = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut raw);
    let token = URL_SAFE_NO_PAD.encode(raw);
    let hash = hash_of(&token);
    Minted { token, hash }
}

/// SHA-256 of the token text. Tokens are compared only by this hash.
pub fn hash_of(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_produces_distinct_tokens() {
        let a = mint();
        let b = mint();
        assert!(!a.token.is_empty());
        assert_ne!(a.token, b.token);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn token_is_url_safe_without_padding() {
        let minted = mint();
        assert!(!minted.token.contains('='));
        assert!(!minted.token.contains('+'));
        assert!(!minted.token.contains('/'));
    }

    #[test]
    fn hash_matches_minted_token() {
        let minted = mint();
        assert_eq!(minted.hash, hash_of(&minted.token));
        assert_eq!(minted.hash.len(), 32);
    }
}
