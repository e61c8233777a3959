//! SMART Health Card numeric QR encoding.
//!
//! A JWS compact serialization is carried as decimal digits: every character
//! becomes two digits holding its code point minus 45.
//!
//! See: <https://spec.smarthealth.cards/#encoding-chunks-as-qr-codes>

use crate::error::{DecodeStage, Error};

pub const URI_PREFIX: &str = "shc:/";

const OFFSET: u32 = 45;

/// Convert the numeric form into the JWS compact serialization.
pub fn to_jws(digits: &str) -> Result<String, Error> {
    let bytes = digits.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(Error::decode(
            DecodeStage::Shc,
            format!("odd number of digits ({})", bytes.len()),
        ));
    }
    bytes
        .chunks(2)
        .map(|pair| {
            let (hi, lo) = (pair[0], pair[1]);
            if !hi.is_ascii_digit() || !lo.is_ascii_digit() {
                return Err(Error::decode(
                    DecodeStage::Shc,
                    format!("non-digit in pair {:?}", String::from_utf8_lossy(pair)),
                ));
            }
            let value = ((hi - b'0') * 10 + (lo - b'0')) as u32;
            char::from_u32(value + OFFSET)
                .ok_or_else(|| Error::decode(DecodeStage::Shc, "invalid code point"))
        })
        .collect()
}

/// Convert a JWS compact serialization into the numeric form.
pub fn from_jws(jws: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(jws.len() * 2);
    for c in jws.chars() {
        let value = (c as u32)
            .checked_sub(OFFSET)
            .filter(|v| *v <= 99)
            .ok_or_else(|| {
                Error::decode(
                    DecodeStage::Shc,
                    format!("character {:?} cannot be numerically encoded", c),
                )
            })?;
        out.push_str(&format!("{:02}", value));
    }
    Ok(out)
}

/// Build a single-chunk `shc:/` URI for a JWS.
pub fn encode_uri(jws: &str) -> Result<String, Error> {
    Ok(format!("{}{}", URI_PREFIX, from_jws(jws)?))
}

/// Whether the text starts with the `shc:/` scheme (case insensitive).
pub fn has_prefix(text: &str) -> bool {
    text.len() >= URI_PREFIX.len()
        && text.as_bytes()[..URI_PREFIX.len()].eq_ignore_ascii_case(URI_PREFIX.as_bytes())
}

/// Strip the scheme from a single-chunk `shc:/` URI and recover the JWS.
pub fn decode_uri(uri: &str) -> Result<String, Error> {
    let digits = strip_prefix(uri)?;
    if digits.contains('/') {
        return Err(Error::decode(
            DecodeStage::Shc,
            "chunked card; reassemble chunks first",
        ));
    }
    to_jws(digits)
}

fn strip_prefix(uri: &str) -> Result<&str, Error> {
    let uri = uri.trim();
    if !has_prefix(uri) {
        return Err(Error::decode(DecodeStage::Shc, "missing shc:/ prefix"));
    }
    Ok(&uri[URI_PREFIX.len()..])
}

/// Reassemble a chunked card (`shc:/<index>/<total>/<digits>`) into a single
/// `shc:/` URI. Chunks may be given in any order.
pub fn assemble_chunks<S: AsRef<str>>(chunks: &[S]) -> Result<String, Error> {
    if let [single] = chunks {
        let body = strip_prefix(single.as_ref())?;
        if !body.contains('/') {
            return Ok(format!("{}{}", URI_PREFIX, body));
        }
    }
    let mut parts: Vec<Option<&str>> = Vec::new();
    for chunk in chunks {
        let body = strip_prefix(chunk.as_ref())?;
        let mut fields = body.splitn(3, '/');
        let (index, total, digits) = match (fields.next(), fields.next(), fields.next()) {
            (Some(i), Some(n), Some(d)) => (i, n, d),
            _ => return Err(Error::decode(DecodeStage::Shc, "malformed chunk header")),
        };
        let parse = |s: &str| {
            s.parse::<usize>()
                .map_err(|e| Error::decode(DecodeStage::Shc, format!("chunk header: {}", e)))
        };
        let (index, total) = (parse(index)?, parse(total)?);
        if total == 0 || total > chunks.len() {
            return Err(Error::decode(
                DecodeStage::Shc,
                format!("card of {} chunks, {} supplied", total, chunks.len()),
            ));
        }
        if parts.is_empty() {
            parts = vec![None; total];
        }
        if total != parts.len() || index == 0 || index > total {
            return Err(Error::decode(
                DecodeStage::Shc,
                format!("chunk {}/{} does not fit a {}-chunk card", index, total, parts.len()),
            ));
        }
        parts[index - 1] = Some(digits);
    }
    let mut uri = String::from(URI_PREFIX);
    for (i, part) in parts.iter().enumerate() {
        uri.push_str(part.ok_or_else(|| {
            Error::decode(DecodeStage::Shc, format!("missing chunk {}", i + 1))
        })?);
    }
    Ok(uri)
}
