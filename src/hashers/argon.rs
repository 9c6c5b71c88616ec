use crate::core::{
    error::{Error, Result},
    hasher::Hasher,
};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Argon2id with the crate's default parameters; hashes are stored as PHC
/// strings so the salt and parameters travel with them.
#[derive(Debug, Clone, Default)]
pub(crate) struct Argon2Hasher;

impl Hasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::wrap("failed to hash password".into(), 500, e))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            Error::wrap("invalid password hash format".into(), 500, e)
        })?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                Err(Error::wrap("failed to verify password".into(), 500, e))
            }
        }
    }
}
