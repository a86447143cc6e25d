//! SHA-256 helpers and salted password digests.
//!
//! Stored format: `<salt>$<sha256(salt || password) as lowercase hex>`.

use sha2::{Digest, Sha256};
use uuid::Uuid;

const SEPARATOR: char = '$';

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    to_hex(&Sha256::digest(bytes))
}

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    hash_password_with_salt(password, &salt)
}

/// Hashes `password` with a caller-provided salt.
pub fn hash_password_with_salt(password: &str, salt: &str) -> String {
    let salted = [salt.as_bytes(), password.as_bytes()].concat();
    format!("{salt}{SEPARATOR}{}", sha256_hex(&salted))
}

/// Checks `password` against a stored `salt$hex` digest.
///
/// Malformed stored values never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, _)) = stored.split_once(SEPARATOR) else {
        return false;
    };
    let expected = hash_password_with_salt(password, salt);
    constant_time_eq(expected.as_bytes(), stored.as_bytes())
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::{hash_password, hash_password_with_salt, sha256_hex, verify_password};

    #[test]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn hashed_password_verifies_and_rejects_wrong_input() {
        let stored = hash_password("s3cret");
        assert!(verify_password("s3cret", &stored));
        assert!(!verify_password("S3cret", &stored));
    }

    #[test]
    fn same_salt_is_deterministic_and_fresh_salts_differ() {
        assert_eq!(
            hash_password_with_salt("pw", "salt"),
            hash_password_with_salt("pw", "salt")
        );
        assert_ne!(hash_password("pw"), hash_password("pw"));
    }

    #[test]
    fn password_digest_is_sha256_of_salt_then_password() {
        assert_eq!(
            hash_password_with_salt("bc", "a"),
            format!("a${}", sha256_hex(b"abc"))
        );
    }

    #[test]
    fn malformed_stored_digest_never_verifies() {
        assert!(!verify_password("pw", "no-separator"));
        assert!(!verify_password("pw", ""));
    }
}
