//! Lookup Hash Allocator
//!
//! Eight characters drawn uniformly from digits 1-9 and lowercase a-z.
//! Zero is excluded from the alphabet to avoid 0/o confusion when the
//! token is read aloud or typed from a printed bill. Allocation verifies
//! the token against active bills and retries on collision; the unique
//! index on `bill.url_hash` backstops concurrent allocations.

use rand::Rng;

use crate::db::repository::BillRepository;
use crate::utils::{AppError, AppResult};

pub const HASH_LEN: usize = 8;
const ALPHABET: &[u8] = b"123456789abcdefghijklmnopqrstuvwxyz";
const MAX_ATTEMPTS: usize = 5;

/// Generate a candidate token without checking for collisions.
///
/// All-digit tokens share the legacy `YYMMDDNN` id shape and would be
/// classified as old ids by the public resolver, so those are rerolled.
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    loop {
        let token: String = (0..HASH_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        if !token.bytes().all(|b| b.is_ascii_digit()) {
            return token;
        }
    }
}

#[derive(Clone)]
pub struct HashAllocator {
    bills: BillRepository,
}

impl HashAllocator {
    pub fn new(bills: BillRepository) -> Self {
        Self { bills }
    }

    /// Allocate a token not carried by any active bill.
    ///
    /// Collisions are vanishingly rare (35^8 space), so attempt exhaustion
    /// points at a broken random source rather than a full table.
    pub async fn allocate(&self) -> AppResult<String> {
        for _ in 0..MAX_ATTEMPTS {
            let token = generate_token();
            if self.bills.find_by_hash(&token).await?.is_none() {
                return Ok(token);
            }
            tracing::warn!(token = %token, "Lookup hash collision, retrying");
        }
        Err(AppError::internal(
            "Could not allocate a unique lookup hash",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_eight_chars_from_the_alphabet() {
        for _ in 0..200 {
            let token = generate_token();
            assert_eq!(token.len(), HASH_LEN);
            assert!(token.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn tokens_never_contain_zero() {
        for _ in 0..200 {
            assert!(!generate_token().contains('0'));
        }
    }

    #[test]
    fn tokens_always_carry_a_letter() {
        // An all-digit token would be taken for a legacy bill id
        for _ in 0..200 {
            let token = generate_token();
            assert!(token.chars().any(|c| c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn tokens_match_the_public_lookup_shape() {
        // The resolver classifies 8 lowercase alphanumerics as hashes;
        // every generated token must fall in that set.
        for _ in 0..200 {
            let token = generate_token();
            assert!(
                token
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            );
        }
    }
}
