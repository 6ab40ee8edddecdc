//! Serde adapter serializing byte buffers as lowercase hex strings.
//!
//! Raw byte fields (for example bucket-grid face visibility masks) would
//! otherwise serialize as JSON arrays of numbers; a hex string keeps the
//! export compact and diffable. Use with `#[serde(with = "riftfile_common::hex")]`.

use serde::{de, Deserialize, Deserializer, Serializer};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Serialize bytes as a lowercase hex string.
pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize] as char);
        out.push(HEX_DIGITS[(b & 0xF) as usize] as char);
    }
    serializer.serialize_str(&out)
}

/// Deserialize a hex string back into bytes.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let text = String::deserialize(deserializer)?;
    if text.len() % 2 != 0 {
        return Err(de::Error::custom("hex string has odd length"));
    }

    let nibble = |c: u8| -> Result<u8, D::Error> {
        match c {
            b'0'..=b'9' => Ok(c - b'0'),
            b'a'..=b'f' => Ok(c - b'a' + 10),
            b'A'..=b'F' => Ok(c - b'A' + 10),
            _ => Err(de::Error::custom(format!("invalid hex digit {:?}", c as char))),
        }
    };

    text.as_bytes()
        .chunks_exact(2)
        .map(|pair| Ok(nibble(pair[0])? << 4 | nibble(pair[1])?))
        .collect()
}
