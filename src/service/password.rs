use argon2::{password_hash::PasswordHash, Argon2, PasswordHasher, PasswordVerifier};
use rand::RngCore;

use crate::service::ServiceError;

/// Minimum length accepted when a password is (re)set through the reset or
/// change flows.
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn hash(password: &str) -> Result<String, ServiceError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = argon2::password_hash::SaltString::encode_b64(&salt)
        .map_err(ServiceError::internal)?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(ServiceError::internal)?
        .to_string();
    Ok(hash)
}

/// One-way check of `password` against a stored PHC hash string. Intentionally
/// expensive; callers must not assume it is cheap.
pub fn verify(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash("s3cret!").expect("hash");
        assert!(verify(&hash, "s3cret!"));
        assert!(!verify(&hash, "s3cret"));
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(!verify("not-a-phc-string", "anything"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash("same").expect("hash");
        let b = hash("same").expect("hash");
        assert_ne!(a, b);
    }
}
