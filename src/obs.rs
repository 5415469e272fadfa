//! Log helpers that keep customer contact details out of the logs.

use sha2::{Digest, Sha256};

/// Short, stable fingerprint of a phone number for log correlation.
///
/// Only the digits are hashed, so `+91 98765-43210` and `919876543210`
/// share a fingerprint.
pub fn phone_fingerprint(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let mut hasher = Sha256::new();
    hasher.update(digits.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..12].to_string()
}
