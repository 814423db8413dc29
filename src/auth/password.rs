use sha2::{Digest, Sha256};
use uuid::Uuid;

const SCHEME: &str = "sha256";
pub const DEFAULT_ITERATIONS: u32 = 10_000;

/// Salted, iterated SHA-256 password hashing.
///
/// Hashes are self-describing (`sha256$<iterations>$<salt>$<digest>`), so the
/// iteration count can change without invalidating stored credentials.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn hash(&self, password: &str) -> String {
        let salt = Uuid::new_v4();
        let digest = derive(password.as_bytes(), salt.as_bytes(), self.iterations);
        format!(
            "{}${}${}${}",
            SCHEME,
            self.iterations,
            hex::encode(salt.as_bytes()),
            hex::encode(digest)
        )
    }

    /// Check a password against a stored hash. Malformed hashes never verify.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let parts: Vec<&str> = stored.split('$').collect();
        let [scheme, iterations, salt, digest] = parts.as_slice() else {
            return false;
        };
        if *scheme != SCHEME {
            return false;
        }
        let (Ok(iterations), Ok(salt), Ok(expected)) =
            (iterations.parse::<u32>(), hex::decode(salt), hex::decode(digest))
        else {
            return false;
        };

        let actual = derive(password.as_bytes(), &salt, iterations.max(1));
        constant_time_eq(&actual, &expected)
    }
}

fn derive(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut digest: [u8; 32] = Sha256::new()
        .chain_update(salt)
        .chain_update(password)
        .finalize()
        .into();
    for _ in 1..iterations {
        digest = Sha256::new()
            .chain_update(digest)
            .chain_update(salt)
            .finalize()
            .into();
    }
    digest
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(10);
        let stored = hasher.hash("hunter22");
        assert!(stored.starts_with("sha256$10$"));
        assert!(hasher.verify("hunter22", &stored));
        assert!(!hasher.verify("hunter23", &stored));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = PasswordHasher::new(10);
        assert_ne!(hasher.hash("same"), hasher.hash("same"));
    }

    #[test]
    fn test_verify_uses_stored_iterations() {
        let stored = PasswordHasher::new(5).hash("secret");
        assert!(PasswordHasher::new(50).verify("secret", &stored));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let hasher = PasswordHasher::default();
        assert!(!hasher.verify("x", ""));
        assert!(!hasher.verify("x", "bcrypt$10$aa$bb"));
        assert!(!hasher.verify("x", "sha256$ten$aa$bb"));
        assert!(!hasher.verify("x", "sha256$10$zz$bb"));
    }
}
