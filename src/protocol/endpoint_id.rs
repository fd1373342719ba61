//! Endpoint id derivation
//!
//! The assistant only accepts endpoint ids made of `[A-Za-z0-9_-]` with at most
//! 256 characters. Friendly names that already fit (after spaces become
//! underscores) are used as-is; anything else is prefixed with a truncated
//! SHA-256 of the original name so distinct names stay distinct.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

/// Maximum endpoint id length accepted by the assistant
pub const MAX_ENDPOINT_ID_LEN: usize = 256;

/// Number of hex characters of the hash kept as prefix
const HASH_PREFIX_LEN: usize = 16;

static VALID_ENDPOINT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,256}$").expect("valid regex"));

/// Check whether the given string is a valid endpoint id
#[must_use]
pub fn is_valid_endpoint_id(id: &str) -> bool {
    VALID_ENDPOINT_ID.is_match(id)
}

/// Derive a stable endpoint id from a friendly name
#[must_use]
pub fn endpoint_id(friendly_name: &str) -> String {
    let candidate = friendly_name.replace(' ', "_");
    if is_valid_endpoint_id(&candidate) {
        return candidate;
    }

    let hash = hex::encode(Sha256::digest(friendly_name.as_bytes()));
    let sanitized: String = candidate
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Every character is ASCII at this point, so byte truncation is safe
    let mut id = format!("{}-{sanitized}", &hash[..HASH_PREFIX_LEN]);
    id.truncate(MAX_ENDPOINT_ID_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_become_underscores() {
        assert_eq!(endpoint_id("Living Room Light"), "Living_Room_Light");
    }

    #[test]
    fn valid_names_pass_through() {
        assert_eq!(endpoint_id("kitchen-dimmer_2"), "kitchen-dimmer_2");
    }

    #[test]
    fn invalid_characters_are_hashed() {
        let id = endpoint_id("Küche Licht");
        assert!(is_valid_endpoint_id(&id));
        assert!(id.ends_with("-K_che_Licht"));
        assert_eq!(id.len(), HASH_PREFIX_LEN + 1 + "K_che_Licht".len());
    }

    #[test]
    fn derivation_is_deterministic() {
        assert_eq!(endpoint_id("Bad/Licht"), endpoint_id("Bad/Licht"));
        assert_ne!(endpoint_id("Bad/Licht"), endpoint_id("Bad.Licht"));
    }

    #[test]
    fn long_names_are_capped() {
        let name = "ä".repeat(400);
        let id = endpoint_id(&name);
        assert_eq!(id.len(), MAX_ENDPOINT_ID_LEN);
        assert!(is_valid_endpoint_id(&id));

        let plain = "a".repeat(300);
        let id = endpoint_id(&plain);
        assert_eq!(id.len(), MAX_ENDPOINT_ID_LEN);
        assert!(is_valid_endpoint_id(&id));
    }

    #[test]
    fn empty_name_still_yields_valid_id() {
        let id = endpoint_id("");
        assert!(is_valid_endpoint_id(&id));
    }
}
