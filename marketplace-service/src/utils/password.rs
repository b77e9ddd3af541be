use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Newtype for password to prevent accidental logging
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Hash a password using Argon2
///
/// Uses the Argon2id variant with secure default parameters. The salt is
/// generated per call and encoded into the hash string.
pub fn hash_password(password: &Password) -> Result<String, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against a stored hash.
///
/// Returns Ok(()) if the password matches, Err otherwise.
pub fn verify_password(password: &Password, password_hash: &str) -> Result<(), anyhow::Error> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .map_err(|_| anyhow::anyhow!("Password verification failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_produces_argon2_string() {
        let password = Password::new("harvest-day-2025".to_string());
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password_roundtrip() {
        let password = Password::new("harvest-day-2025".to_string());
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(verify_password(&password, &hash).is_ok());

        let wrong = Password::new("wrong-password".to_string());
        assert!(verify_password(&wrong, &hash).is_err());
    }

    #[test]
    fn test_salting_makes_hashes_differ() {
        let password = Password::new("harvest-day-2025".to_string());
        let hash1 = hash_password(&password).expect("Failed to hash password");
        let hash2 = hash_password(&password).expect("Failed to hash password");

        assert_ne!(hash1, hash2);
        assert!(verify_password(&password, &hash1).is_ok());
        assert!(verify_password(&password, &hash2).is_ok());
    }

    #[test]
    fn test_debug_does_not_leak() {
        let password = Password::new("top-secret".to_string());
        assert_eq!(format!("{:?}", password), "Password(***)");
    }
}
