//! Owner Credentials
//!
//! The single management account. The password is hashed with Argon2 at
//! startup and verified on every login attempt.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use argon2::Argon2;

/// Hash a plaintext password with a random salt
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// The owner account, held in server state
#[derive(Debug, Clone)]
pub struct OwnerCredentials {
    pub username: String,
    password_hash: String,
}

impl OwnerCredentials {
    /// Build the credentials from a plaintext password (hashed here)
    pub fn new(username: String, password: &str) -> Result<Self, argon2::password_hash::Error> {
        Ok(Self {
            username,
            password_hash: hash_password(password)?,
        })
    }

    /// Check a login attempt against the stored credentials
    pub fn verify(&self, username: &str, password: &str) -> bool {
        if username != self.username {
            return false;
        }
        let Ok(parsed) = PasswordHash::new(&self.password_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_correct_password() {
        let owner = OwnerCredentials::new("asha".to_string(), "sarees@2024").unwrap();
        assert!(owner.verify("asha", "sarees@2024"));
    }

    #[test]
    fn rejects_a_wrong_password() {
        let owner = OwnerCredentials::new("asha".to_string(), "sarees@2024").unwrap();
        assert!(!owner.verify("asha", "sarees@2025"));
    }

    #[test]
    fn rejects_a_wrong_username() {
        let owner = OwnerCredentials::new("asha".to_string(), "sarees@2024").unwrap();
        assert!(!owner.verify("admin", "sarees@2024"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }
}
