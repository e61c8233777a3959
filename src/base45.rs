//! Base45 text encoding of binary data.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc9285>

use crate::error::{DecodeStage, Error};

const ALPHABET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

fn value_of(c: u8) -> Option<u32> {
    ALPHABET.iter().position(|&a| a == c).map(|i| i as u32)
}

/// Encode bytes into Base45 text.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() / 2 * 3 + 2);
    for chunk in data.chunks(2) {
        match *chunk {
            [a, b] => {
                let n = (a as u32) * 256 + b as u32;
                out.push(ALPHABET[(n % 45) as usize] as char);
                out.push(ALPHABET[(n / 45 % 45) as usize] as char);
                out.push(ALPHABET[(n / 2025) as usize] as char);
            }
            [a] => {
                let n = a as u32;
                out.push(ALPHABET[(n % 45) as usize] as char);
                out.push(ALPHABET[(n / 45) as usize] as char);
            }
            _ => unreachable!(),
        }
    }
    out
}

/// Decode Base45 text into bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, Error> {
    let input = text.as_bytes();
    let mut out = Vec::with_capacity(input.len() / 3 * 2 + 1);
    for chunk in input.chunks(3) {
        let mut digits = [0u32; 3];
        for (digit, &c) in digits.iter_mut().zip(chunk) {
            *digit = value_of(c).ok_or_else(|| {
                Error::decode(
                    DecodeStage::Base45,
                    format!("invalid character {:?}", c as char),
                )
            })?;
        }
        match chunk.len() {
            3 => {
                let n = digits[0] + digits[1] * 45 + digits[2] * 2025;
                if n > 0xFFFF {
                    return Err(Error::decode(
                        DecodeStage::Base45,
                        format!("triplet value {} out of range", n),
                    ));
                }
                out.push((n >> 8) as u8);
                out.push((n & 0xFF) as u8);
            }
            2 => {
                let n = digits[0] + digits[1] * 45;
                if n > 0xFF {
                    return Err(Error::decode(
                        DecodeStage::Base45,
                        format!("trailing pair value {} out of range", n),
                    ));
                }
                out.push(n as u8);
            }
            _ => {
                return Err(Error::decode(
                    DecodeStage::Base45,
                    "dangling single character",
                ))
            }
        }
    }
    Ok(out)
}
