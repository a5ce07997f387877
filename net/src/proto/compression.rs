use std::io::{Read, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use super::error::{ProtoError, Result};

pub(crate) fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .map_err(|err| ProtoError::Compression(err.to_string()))?;
    encoder
        .finish()
        .map_err(|err| ProtoError::Compression(err.to_string()))
}

/// Inflates `data`, refusing output that differs from the declared length.
pub(crate) fn decompress(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    // Read one byte past the declared size so oversized payloads are caught
    // without inflating them completely.
    let mut decoder = ZlibDecoder::new(data).take(expected as u64 + 1);
    decoder
        .read_to_end(&mut out)
        .map_err(|err| ProtoError::Compression(err.to_string()))?;

    if out.len() != expected {
        return Err(ProtoError::CompressedLength {
            declared: expected,
            actual: out.len(),
        });
    }
    Ok(out)
}
