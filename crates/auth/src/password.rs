//! Password hashing (Argon2id, PHC string format).

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::AuthError;

/// Hashes and verifies account passwords.
///
/// Every call to [`CredentialStore::hash`] draws a fresh salt, so equal
/// passwords never produce equal digests.
#[derive(Clone, Default)]
pub struct CredentialStore {
    argon2: Argon2<'static>,
}

impl core::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialStore").field("algorithm", &"argon2id").finish()
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// `false` on any mismatch, including a digest that does not parse.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            tracing::warn!("stored password digest is not a valid PHC string");
            return false;
        };

        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hash_then_verify() {
        let store = CredentialStore::new();
        let digest = store.hash("hunter22").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(store.verify("hunter22", &digest));
        assert!(!store.verify("hunter23", &digest));
    }

    #[test]
    fn salts_differ_per_call() {
        let store = CredentialStore::new();
        let a = store.hash("same").unwrap();
        let b = store.hash("same").unwrap();
        assert_ne!(a, b);
        assert!(store.verify("same", &a));
        assert!(store.verify("same", &b));
    }

    #[test]
    fn malformed_digest_is_a_mismatch() {
        let store = CredentialStore::new();
        assert!(!store.verify("anything", ""));
        assert!(!store.verify("anything", "not-a-phc-string"));
        assert!(!store.verify("anything", "$argon2id$v=19$broken"));
    }

    proptest! {
        // Argon2 is deliberately slow; a handful of cases is enough.
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn verify_only_accepts_the_hashed_plaintext(a in ".{0,32}", b in ".{0,32}") {
            let store = CredentialStore::new();
            let digest = store.hash(&a).unwrap();
            prop_assert!(store.verify(&a, &digest));
            prop_assert_eq!(store.verify(&b, &digest), a == b);
        }
    }
}
