//! On-disk template encoding.
//!
//! A record is the postcard encoding of `(version, identity, embedding)`:
//!
//! ```text
//! varint(u16 version = 1)
//! varint(len) utf-8 identity bytes
//! varint(n)   n x f32, little-endian IEEE-754
//! ```
//!
//! Floats are stored bit-exact. The identity is kept alongside the vector so
//! a file renamed or copied under the wrong key is detected on read.

use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::error::CodecError;
use crate::identity::Identity;

pub const FORMAT_VERSION: u16 = 1;

#[derive(Serialize)]
struct RecordRef<'a> {
    identity: &'a str,
    embedding: &'a [f32],
}

#[derive(Deserialize)]
struct Record {
    identity: String,
    embedding: Vec<f32>,
}

pub fn encode(identity: &Identity, embedding: &Embedding) -> Result<Vec<u8>, postcard::Error> {
    postcard::to_allocvec(&(
        FORMAT_VERSION,
        RecordRef {
            identity: identity.as_str(),
            embedding: embedding.as_slice(),
        },
    ))
}

pub fn decode(bytes: &[u8], expected: &Identity) -> Result<Embedding, CodecError> {
    let (version, rest) = postcard::take_from_bytes::<u16>(bytes)?;
    if version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let (record, rest) = postcard::take_from_bytes::<Record>(rest)?;
    if !rest.is_empty() {
        return Err(CodecError::TrailingBytes(rest.len()));
    }
    if record.identity != expected.as_str() {
        return Err(CodecError::IdentityMismatch {
            expected: expected.to_string(),
            found: record.identity,
        });
    }

    Ok(Embedding::new(record.embedding)?)
}
