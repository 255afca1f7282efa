//! Entry compression methods and decoders.
//!
//! Archives tag each entry with a [`CompressionMethod`] parsed from their
//! directory table; at open time the tag selects which concrete byte-source
//! construction path runs. The only codec implemented in this crate is the
//! legacy [`lzss`] scheme; Zip entries delegate to `flate2` for inflation.

pub mod lzss;

use crate::{Error, Result};

/// How an archive entry's bytes are stored.
///
/// Parsed once from the directory table at mount time and never inspected
/// from the entry bytes themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Entry bytes are stored verbatim.
    Store,
    /// Legacy LZSS sliding-window compression.
    Lzss,
    /// Deflate, carrying the expected CRC-32 of the plaintext.
    #[cfg(feature = "zip")]
    Deflate {
        /// CRC-32 of the uncompressed bytes, from the central directory.
        crc: u32,
    },
}

/// Decodes one entry's packed bytes into exactly `expected_len` plaintext
/// bytes.
///
/// A pure function of its inputs; holds no state across calls. Any output
/// length mismatch is [`Error::InvalidFormat`], never silent truncation or
/// padding.
pub fn decode(method: CompressionMethod, input: &[u8], expected_len: u64) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::Store => {
            if input.len() as u64 != expected_len {
                return Err(Error::InvalidFormat(format!(
                    "stored entry is {} bytes, table says {}",
                    input.len(),
                    expected_len
                )));
            }
            let mut out = Vec::new();
            out.try_reserve_exact(input.len())
                .map_err(|_| Error::OutOfMemory {
                    requested: input.len(),
                })?;
            out.extend_from_slice(input);
            Ok(out)
        }
        CompressionMethod::Lzss => lzss::decode(input, expected_len),
        #[cfg(feature = "zip")]
        CompressionMethod::Deflate { crc } => inflate(input, expected_len, crc),
    }
}

/// Inflates a raw deflate stream and verifies the plaintext CRC-32.
#[cfg(feature = "zip")]
fn inflate(input: &[u8], expected_len: u64, crc: u32) -> Result<Vec<u8>> {
    use std::io::Read;

    let requested = usize::try_from(expected_len)
        .map_err(|_| Error::InvalidFormat("entry too large for this platform".into()))?;
    let mut out = Vec::new();
    out.try_reserve_exact(requested)
        .map_err(|_| Error::OutOfMemory { requested })?;

    // Read one byte past the expected length so an over-long stream is
    // detected instead of silently clipped.
    let mut decoder = flate2::read::DeflateDecoder::new(input).take(expected_len + 1);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::InvalidFormat(format!("corrupt deflate stream: {}", e)))?;

    if out.len() as u64 != expected_len {
        return Err(Error::InvalidFormat(format!(
            "deflate stream decoded to {} bytes, table says {}",
            out.len(),
            expected_len
        )));
    }

    let actual = crc32fast::hash(&out);
    if actual != crc {
        return Err(Error::InvalidFormat(format!(
            "CRC mismatch: expected {:#010x}, got {:#010x}",
            crc, actual
        )));
    }
    Ok(out)
}
