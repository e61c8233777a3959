//! Base64url helpers tolerant of padding and of the standard alphabet.

use crate::error::Error;

/// Decode base64url, accepting padded or unpadded input. Characters from the
/// standard alphabet (`+`, `/`) are normalized to their url-safe counterparts.
pub fn decode(data: impl AsRef<[u8]>) -> Result<Vec<u8>, Error> {
    let normalized: Vec<u8> = data
        .as_ref()
        .iter()
        .filter(|&&c| c != b'=' && !c.is_ascii_whitespace())
        .map(|&c| match c {
            b'+' => b'-',
            b'/' => b'_',
            c => c,
        })
        .collect();
    Ok(base64::decode_config(&normalized, base64::URL_SAFE_NO_PAD)?)
}

/// Encode as unpadded base64url.
pub fn encode(data: impl AsRef<[u8]>) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}
