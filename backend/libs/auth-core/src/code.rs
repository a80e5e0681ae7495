use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a 6-digit one-time code and its SHA-256 hash.
pub fn generate() -> (String, Vec<u8>) {
    let mut raw = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut raw);
    let n = u32::from_be_bytes(raw) % 1_000_000;
    let code = format!("{n:06}");
    let hash = hash_of(&code);
    (code, hash)
}

pub fn hash_of(code: &str) -> Vec<u8> {
    Sha256::digest(code.as_bytes()).to_vec()
}
