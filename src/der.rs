// http://luca.ntop.org/Teaching/Appunti/asn1.html
// https://en.wikipedia.org/wiki/Distinguished_Encoding_Rules#BER_encoding
// ISO/IEC 8825-1:2015 (E)
// https://tools.ietf.org/html/rfc3279#section-2.2.3 (Ecdsa-Sig-Value)

use crate::error::Error;

const TAG_INTEGER: u8 = 0x02;
const TAG_SEQUENCE: u8 = 0x10;

pub type DER = Vec<u8>;

/// Unsigned big-endian integer contents.
#[derive(Debug, Clone)]
pub struct Integer(pub Vec<u8>);

/// ECDSA signature as an ASN.1 `SEQUENCE { r INTEGER, s INTEGER }`.
#[derive(Debug, Clone)]
pub struct EcdsaSigValue {
    pub r: Integer,
    pub s: Integer,
}

fn trim_bytes(bytes: &[u8]) -> Vec<u8> {
    // Remove leading zeros from an array.
    match bytes.iter().position(|&x| x != 0) {
        Some(n) => bytes[n..].to_vec(),
        None => vec![0],
    }
}

fn encode(tag: u8, constructed: bool, contents: Vec<u8>) -> Vec<u8> {
    // prepare an ASN1 tag-length-value
    let id = tag
        // set bit for constructed (vs primitive)
        | match constructed {
            true => 0x20,
            false => 0,
        };
    let len = contents.len();
    let len_bytes = trim_bytes(&len.to_be_bytes());
    if len <= 127 {
        return [vec![id, len_bytes[0]], contents].concat();
    }
    [vec![id, 0x80 | len_bytes.len() as u8], len_bytes, contents].concat()
}

impl From<Integer> for DER {
    fn from(integer: Integer) -> Self {
        let mut contents = trim_bytes(&integer.0);
        // keep the value positive
        if contents[0] & 0x80 != 0 {
            contents.insert(0, 0);
        }
        encode(TAG_INTEGER, false, contents)
    }
}

impl From<EcdsaSigValue> for DER {
    fn from(sig: EcdsaSigValue) -> Self {
        encode(
            TAG_SEQUENCE,
            true,
            [DER::from(sig.r), DER::from(sig.s)].concat(),
        )
    }
}

/// Convert a fixed-width `r || s` ECDSA signature to its DER form.
pub fn ecdsa_raw_to_der(raw: &[u8]) -> Result<DER, Error> {
    if raw.is_empty() || raw.len() % 2 != 0 {
        return Err(Error::SignatureMismatch);
    }
    let (r, s) = raw.split_at(raw.len() / 2);
    Ok(DER::from(EcdsaSigValue {
        r: Integer(r.to_vec()),
        s: Integer(s.to_vec()),
    }))
}
