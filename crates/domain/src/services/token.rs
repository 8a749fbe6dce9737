//! Verification token and QR payload codec.
//!
//! Tokens are opaque bearer secrets: `mc_` followed by 32 CSPRNG bytes in
//! unpadded base64url. They carry no card or member identifiers.

use shared::crypto::{is_url_safe_alphabet, random_url_safe, url_safe_encoded_len};

pub const TOKEN_PREFIX: &str = "mc_";
pub const TOKEN_ENTROPY_BYTES: usize = 32;
pub const TOKEN_LEN: usize = TOKEN_PREFIX.len() + url_safe_encoded_len(TOKEN_ENTROPY_BYTES);

/// Generates a fresh verification token.
pub fn generate_token() -> String {
    format!("{}{}", TOKEN_PREFIX, random_url_safe(TOKEN_ENTROPY_BYTES))
}

/// Returns the token if it is well formed.
pub fn parse_token(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    let body = raw.strip_prefix(TOKEN_PREFIX)?;
    if raw.len() == TOKEN_LEN && is_url_safe_alphabet(body) {
        Some(raw)
    } else {
        None
    }
}

/// Extracts the token from scanned QR data.
///
/// Accepts a bare token or a URL whose query string carries `token=<token>`.
pub fn token_from_qr(data: &str) -> Option<&str> {
    let data = data.trim();
    if let Some(token) = parse_token(data) {
        return Some(token);
    }

    let (_, query) = data.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    query
        .split('&')
        .filter_map(|pair| pair.strip_prefix("token="))
        .find_map(parse_token)
}

/// Builds the payload encoded into a card's QR code.
pub fn qr_payload(token: &str, verification_base_url: Option<&str>) -> String {
    match verification_base_url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(base) => {
            let separator = if base.contains('?') { '&' } else { '?' };
            format!("{}{}token={}", base, separator, token)
        }
        None => token.to_string(),
    }
}
