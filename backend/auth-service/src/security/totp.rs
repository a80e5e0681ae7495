use rand::RngCore;
use totp_lite::{totp_custom, Sha1, DEFAULT_STEP};

const ALPHABET: base32::Alphabet = base32::Alphabet::Rfc4648 { padding: false };
const DIGITS: u32 = 6;

/// Generate a shared secret: 10 random bytes, RFC 4648 base32, no padding.
pub fn generate_secret() -> String {
    let mut raw = [0u8; 10];
    rand::thread_rng().fill_bytes(&mut raw);
    base32::encode(ALPHABET, &raw)
}

/// RFC 6238 validation over the current 30-second window, accepting one
/// step of clock skew on either side.
pub fn validate(secret: &str, code: &str) -> bool {
    let Some(secret_bytes) = base32::decode(ALPHABET, secret) else {
        return false;
    };
    let now = unix_now();
    let step = now / DEFAULT_STEP;
    (step.saturating_sub(1)..=step + 1)
        .any(|s| totp_custom::<Sha1>(DEFAULT_STEP, DIGITS, &secret_bytes, s * DEFAULT_STEP) == code)
}

/// Code for an arbitrary unix timestamp. Used by authenticator clients in
/// tests to produce the value a phone app would show.
pub fn code_at(secret: &str, unix_seconds: u64) -> Option<String> {
    let secret_bytes = base32::decode(ALPHABET, secret)?;
    Some(totp_custom::<Sha1>(
        DEFAULT_STEP,
        DIGITS,
        &secret_bytes,
        unix_seconds,
    ))
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
