//! Argon2id implementation of `PasswordHasher`.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use domains::{DomainError, DomainResult, PasswordHasher};
use tracing::warn;

/// Stores hashes in PHC string format, so parameters travel with the hash.
#[derive(Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Argon2id with explicit costs (memory in KiB, iterations, lanes).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> DomainResult<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None).map_err(DomainError::internal)?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> DomainResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(DomainError::internal)
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(err) => {
                warn!(%err, "stored password hash is malformed");
                return false;
            }
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_hashed_password() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash("straightouttacompton").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("straightouttacompton", &hash));
        assert!(!hasher.verify("straightoutta", &hash));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let hasher = Argon2Hasher::new();
        let a = hasher.hash("same-password").unwrap();
        let b = hasher.hash("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hashes_carry_their_parameters() {
        let cheap = Argon2Hasher::with_params(8, 1, 1).unwrap();
        let hash = cheap.hash("straightouttacompton").unwrap();
        assert!(hash.contains("m=8,t=1,p=1"));
        // Verification reads the costs from the hash, not from the hasher.
        assert!(Argon2Hasher::new().verify("straightouttacompton", &hash));
    }

    #[test]
    fn invalid_params_are_an_error() {
        assert!(Argon2Hasher::with_params(0, 0, 0).is_err());
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!Argon2Hasher::new().verify("anything", "not-a-phc-string"));
    }
}
