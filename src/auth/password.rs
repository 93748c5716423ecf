use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

/// Only the first 72 bytes of a password are significant. Stored hashes were
/// produced under that limit, so hashing and verifying both cut at the same place.
pub const MAX_PASSWORD_BYTES: usize = 72;

fn significant_bytes(plain: &str) -> &[u8] {
    let bytes = plain.as_bytes();
    &bytes[..bytes.len().min(MAX_PASSWORD_BYTES)]
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(significant_bytes(plain), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Returns false for a wrong password and for a stored hash that cannot be parsed.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(significant_bytes(plain), &parsed)
        .is_ok()
}
