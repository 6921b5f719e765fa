//! Peer Wire Format
//!
//! A lookup is addressed entirely by its URL path:
//!
//! ```text
//! <peer base url><base path><escaped group>/<escaped key>
//! http://10.0.0.2:8001/_peercache/scores/Tom
//! ```
//!
//! The response body is a protobuf-compatible message with a single
//! length-delimited field:
//!
//! ```text
//! message GetResponse { bytes value = 1; }
//! ```
//!
//! Unknown fields are skipped so that newer peers may append fields.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Tag byte for field 1, wire type 2 (length-delimited)
const VALUE_TAG: u64 = (1 << 3) | WIRE_LEN;

const WIRE_VARINT: u64 = 0;
const WIRE_FIXED64: u64 = 1;
const WIRE_LEN: u64 = 2;
const WIRE_FIXED32: u64 = 5;

/// Longest legal varint encoding of a u64
const MAX_VARINT_LEN: usize = 10;

// =============================================================================
// Request
// =============================================================================

/// Lookup of `key` in the group named `group`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    pub group: String,
    pub key: String,
}

impl GetRequest {
    pub fn new(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            key: key.into(),
        }
    }

    /// Path under `base_path`, each segment percent-escaped
    pub fn to_path(&self, base_path: &str) -> String {
        format!(
            "{}{}/{}",
            base_path,
            urlencoding::encode(&self.group),
            urlencoding::encode(&self.key)
        )
    }

    /// Parse a raw (still escaped) request path
    pub fn from_path(path: &str, base_path: &str) -> Result<Self> {
        let rest = path
            .strip_prefix(base_path)
            .ok_or_else(|| Error::BadRequest(format!("unexpected path: {}", path)))?;

        let (group, key) = rest
            .split_once('/')
            .ok_or_else(|| Error::BadRequest(format!("expected <group>/<key>, got {}", rest)))?;

        Ok(Self {
            group: unescape(group)?,
            key: unescape(key)?,
        })
    }
}

fn unescape(segment: &str) -> Result<String> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|e| Error::BadRequest(format!("invalid escape in {:?}: {}", segment, e)))
}

// =============================================================================
// Response
// =============================================================================

/// Value returned by a peer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetResponse {
    pub value: Bytes,
}

impl GetResponse {
    pub fn new(value: Bytes) -> Self {
        Self { value }
    }

    /// Serialize. An empty value encodes to an empty message.
    pub fn encode(&self) -> Bytes {
        if self.value.is_empty() {
            return Bytes::new();
        }
        let mut buf = BytesMut::with_capacity(1 + MAX_VARINT_LEN + self.value.len());
        put_varint(&mut buf, VALUE_TAG);
        put_varint(&mut buf, self.value.len() as u64);
        buf.put_slice(&self.value);
        buf.freeze()
    }

    /// Parse a message. The returned value shares `buf`'s storage.
    pub fn decode(buf: Bytes) -> Result<Self> {
        let mut value = Bytes::new();
        let mut pos = 0;

        while pos < buf.len() {
            let tag = read_varint(&buf, &mut pos)?;
            let field = tag >> 3;
            let wire_type = tag & 0x7;
            if field == 0 {
                return Err(Error::Decode("field number 0".to_string()));
            }

            match wire_type {
                WIRE_VARINT => {
                    read_varint(&buf, &mut pos)?;
                }
                WIRE_FIXED64 => skip(&buf, &mut pos, 8)?,
                WIRE_FIXED32 => skip(&buf, &mut pos, 4)?,
                WIRE_LEN => {
                    let len = read_varint(&buf, &mut pos)?;
                    let len = usize::try_from(len)
                        .map_err(|_| Error::Decode(format!("length {} too large", len)))?;
                    let start = pos;
                    skip(&buf, &mut pos, len)?;
                    if field == 1 {
                        // Last occurrence wins
                        value = buf.slice(start..pos);
                    }
                }
                other => {
                    return Err(Error::Decode(format!("unsupported wire type {}", other)));
                }
            }
        }

        Ok(Self { value })
    }
}

fn put_varint(buf: &mut BytesMut, mut v: u64) {
    while v >= 0x80 {
        buf.put_u8((v as u8) | 0x80);
        v >>= 7;
    }
    buf.put_u8(v as u8);
}

fn read_varint(buf: &[u8], pos: &mut usize) -> Result<u64> {
    let mut result: u64 = 0;
    for i in 0..MAX_VARINT_LEN {
        let byte = *buf
            .get(*pos)
            .ok_or_else(|| Error::Decode("truncated varint".to_string()))?;
        *pos += 1;

        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(Error::Decode("varint overflows u64".to_string()));
        }
        result |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(Error::Decode("varint too long".to_string()))
}

fn skip(buf: &[u8], pos: &mut usize, n: usize) -> Result<()> {
    let end = pos
        .checked_add(n)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| Error::Decode(format!("truncated field: need {} bytes", n)))?;
    *pos = end;
    Ok(())
}
