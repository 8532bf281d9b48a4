use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;

const CREDENTIAL_LEN: usize = 32;
const SALT_LEN: usize = 16;

const ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iterations must be non-zero"),
};

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

#[derive(thiserror::Error, Debug)]
pub enum PasswordError {
    #[error("Failed to generate salt")]
    SaltGeneration,
}

/// Hashes a password with PBKDF2-HMAC-SHA256 and a random salt.
///
/// Stored format: `pbkdf2-sha256$<iterations>$<salt hex>$<digest hex>`
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let rng = SystemRandom::new();

    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| PasswordError::SaltGeneration)?;

    let mut digest = [0u8; CREDENTIAL_LEN];
    pbkdf2::derive(ALGORITHM, ITERATIONS, &salt, password.as_bytes(), &mut digest);

    Ok(format!(
        "pbkdf2-sha256${}${}${}",
        ITERATIONS,
        hex::encode(salt),
        hex::encode(digest)
    ))
}

/// Verifies a password against a stored hash. Malformed stored values
/// simply fail verification.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');

    let (Some(scheme), Some(iterations), Some(salt_hex), Some(digest_hex), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    if scheme != "pbkdf2-sha256" {
        return false;
    }

    let Some(iterations) = iterations.parse::<u32>().ok().and_then(NonZeroU32::new) else {
        return false;
    };

    let (Ok(salt), Ok(digest)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
        return false;
    };

    pbkdf2::verify(ALGORITHM, iterations, &salt, password.as_bytes(), &digest).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("correct horse battery staple").unwrap();

        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hash1 = hash_password("same password").unwrap();
        let hash2 = hash_password("same password").unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password("same password", &hash1));
        assert!(verify_password("same password", &hash2));
    }

    #[test]
    fn test_malformed_stored_hash_fails() {
        assert!(!verify_password("anything", ""));
        assert!(!verify_password("anything", "plaintext"));
        assert!(!verify_password("anything", "pbkdf2-sha256$abc$zz$zz"));
        assert!(!verify_password("anything", "bcrypt$100000$00$00"));
    }
}
