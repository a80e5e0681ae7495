use crate::error::{AuthError, AuthResult};

/// Hash a password with bcrypt at the default cost.
pub fn hash(password: &str) -> AuthResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AuthError::Internal(format!("hash password: {e}")))
}

/// Constant-time bcrypt comparison. Any malformed stored hash counts as a
/// mismatch.
pub fn verify(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
