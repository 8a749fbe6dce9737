//! Cryptographic utilities for API key hashing and opaque token material.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Prefix carried by every API key issued to a provider portal or admin console.
pub const API_KEY_PREFIX: &str = "ak_";

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extracts the prefix from an API key (first 8 characters after "ak_").
pub fn extract_key_prefix(key: &str) -> Option<&str> {
    if key.starts_with(API_KEY_PREFIX) && key.len() >= 11 {
        key.get(3..11)
    } else {
        None
    }
}

/// Returns `len` bytes from the thread-local CSPRNG encoded as unpadded base64url.
///
/// The thread RNG is seeded from the operating system, so the output is
/// suitable for bearer secrets such as card verification tokens.
pub fn random_url_safe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Length of the unpadded base64url encoding of `len` bytes.
pub const fn url_safe_encoded_len(len: usize) -> usize {
    (len * 4 + 2) / 3
}

/// Whether every character belongs to the base64url alphabet.
pub fn is_url_safe_alphabet(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
