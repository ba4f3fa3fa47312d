use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::error;

use crate::config::PasswordConfig;

/// Salted Argon2id hashing over a SHA-256 pre-digest, so the slow hash always
/// sees a fixed 64-byte input regardless of password length.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(cfg: &PasswordConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {}", e))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(pre_digest(plain).as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    pub fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        // Parameters come from the PHC string, not from self.
        Ok(self
            .argon2()
            .verify_password(pre_digest(plain).as_bytes(), &parsed)
            .is_ok())
    }
}

fn pre_digest(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}

#[cfg(test)]
pub(crate) fn test_hasher() -> Argon2Hasher {
    Argon2Hasher::new(&PasswordConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("cheap params are valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hasher = test_hasher();
        let password = "Secur3P@ssw0rd!";
        let hash = hasher.hash(password).expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn same_password_hashes_differently() {
        let hasher = test_hasher();
        let a = hasher.hash("password123").unwrap();
        let b = hasher.hash("password123").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("password123", &a).unwrap());
        assert!(hasher.verify("password123", &b).unwrap());
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hasher = test_hasher();
        let hash = hasher.hash("correct-horse-battery-staple").unwrap();
        assert!(!hasher.verify("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = test_hasher().verify("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn never_embeds_plaintext() {
        let hasher = test_hasher();
        let hash = hasher.hash("plaintext-marker").unwrap();
        assert!(!hash.contains("plaintext-marker"));
    }

    #[test]
    fn pre_digest_is_fixed_length_hex() {
        let short = pre_digest("a");
        let long = pre_digest(&"ü".repeat(500));
        assert_eq!(short.len(), 64);
        assert_eq!(long.len(), 64);
        assert!(long.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn long_passwords_differing_late_do_not_collide() {
        let hasher = test_hasher();
        let base = "x".repeat(100);
        let hash = hasher.hash(&format!("{}a", base)).unwrap();
        assert!(!hasher.verify(&format!("{}b", base), &hash).unwrap());
    }

    #[test]
    fn rejects_invalid_params() {
        let err = Argon2Hasher::new(&PasswordConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        })
        .unwrap_err();
        assert!(err.to_string().contains("argon2"));
    }
}
