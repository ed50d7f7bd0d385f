//! Per-recipient identifier tokens for URL personalization.
//!
//! Tokens are random alphanumeric strings. There is no collision detection;
//! at the default length of 8 the collision probability across a campaign is
//! negligible.

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::CampaignError;

/// Shortest allowed token.
pub const MIN_LENGTH: usize = 1;

/// Longest allowed token, matching the length of a canonical UUID.
pub const MAX_LENGTH: usize = 36;

/// Validate a configured token length.
pub fn check_length(length: usize) -> Result<(), CampaignError> {
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
        return Err(CampaignError::Config(format!(
            "token length {length} out of range {MIN_LENGTH}..={MAX_LENGTH}"
        )));
    }
    Ok(())
}

/// Generate a random token of exactly `length` characters from `[A-Za-z0-9]`.
pub fn generate(length: usize) -> Result<String, CampaignError> {
    check_length(length)?;
    let token = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    Ok(token)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generate_exact_length() {
        for length in [1, 4, 8, 36] {
            let token = generate(length).unwrap();
            assert_eq!(token.len(), length);
        }
    }

    #[test]
    fn test_generate_alphanumeric_only() {
        let token = generate(36).unwrap();
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_rejects_out_of_range() {
        assert!(generate(0).is_err());
        assert!(generate(37).is_err());
    }

    #[test]
    fn test_tokens_pairwise_distinct() {
        let tokens: HashSet<String> = (0..64).map(|_| generate(12).unwrap()).collect();
        assert_eq!(tokens.len(), 64);
    }
}
