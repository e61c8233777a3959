//! DEFLATE decompression for the compressed credential payloads.
//!
//! EU DCC payloads are zlib-wrapped, SMART Health Card JWS payloads are raw
//! DEFLATE (`"zip": "DEF"`).

use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};

use crate::error::{DecodeStage, Error};

/// Upper bound on decompressed size. Credentials are small; anything larger
/// is treated as a decompression bomb.
pub const MAX_INFLATED_LEN: u64 = 1024 * 1024;

/// Compression wrapper around the DEFLATE stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapper {
    /// RFC 1950 zlib framing.
    Zlib,
    /// RFC 1951 raw DEFLATE.
    Raw,
}

/// Whether the bytes start with a plausible zlib header (CMF/FLG pair).
pub fn has_zlib_header(data: &[u8]) -> bool {
    match data {
        [cmf, flg, ..] => cmf & 0x0F == 8 && ((*cmf as u16) << 8 | *flg as u16) % 31 == 0,
        _ => false,
    }
}

pub fn inflate(data: &[u8], wrapper: Wrapper) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    let result = match wrapper {
        Wrapper::Zlib => ZlibDecoder::new(data)
            .take(MAX_INFLATED_LEN + 1)
            .read_to_end(&mut out),
        Wrapper::Raw => DeflateDecoder::new(data)
            .take(MAX_INFLATED_LEN + 1)
            .read_to_end(&mut out),
    };
    result.map_err(|e| Error::decode(DecodeStage::Inflate, e))?;
    if out.len() as u64 > MAX_INFLATED_LEN {
        return Err(Error::decode(
            DecodeStage::Inflate,
            format!("inflated payload exceeds {} bytes", MAX_INFLATED_LEN),
        ));
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) fn deflate(data: &[u8], wrapper: Wrapper) -> Vec<u8> {
    use flate2::write::{DeflateEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;
    match wrapper {
        Wrapper::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        Wrapper::Raw => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zlib_and_raw() {
        let data = b"{\"iss\":\"https://example.org\"}".repeat(4);
        let zlib = deflate(&data, Wrapper::Zlib);
        assert!(has_zlib_header(&zlib));
        assert_eq!(inflate(&zlib, Wrapper::Zlib).unwrap(), data);
        let raw = deflate(&data, Wrapper::Raw);
        assert_eq!(inflate(&raw, Wrapper::Raw).unwrap(), data);
    }

    #[test]
    fn garbage_is_an_error() {
        let err = inflate(b"\xff\xff\xff\xff", Wrapper::Raw).unwrap_err();
        assert_eq!(err.stage(), Some(DecodeStage::Inflate));
        assert!(!has_zlib_header(b"\xd2\x84"));
    }

    #[test]
    fn bomb_is_rejected() {
        let data = vec![0u8; (MAX_INFLATED_LEN + 10) as usize];
        let zlib = deflate(&data, Wrapper::Zlib);
        assert!(inflate(&zlib, Wrapper::Zlib).is_err());
    }
}
