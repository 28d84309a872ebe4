//! Conversion of fetched tile images into storable payloads.
//!
//! Tile servers answer with whatever format they like (JPEG, PNG, WebP). The
//! cache stores a normalized payload produced by a [`TileEncoder`]. Encoding
//! failures abort the cache write only; the fetched image is still shown.

use std::io::Cursor;

use bytes::Bytes;
use image::ImageFormat;
use thiserror::Error;

/// Errors that can occur while encoding a tile payload.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Fetched bytes are not a decodable image.
    #[error("Failed to decode fetched image: {0}")]
    Decode(String),

    /// Image could not be written in the target format.
    #[error("Failed to encode tile payload: {0}")]
    Encode(String),

    /// Encoding task panicked or was cancelled.
    #[error("Encoding task failed: {0}")]
    Task(String),
}

/// Turns fetched image bytes into the payload written to the store.
pub trait TileEncoder: Send + Sync {
    /// Encode `fetched` into a storable payload.
    fn encode(&self, fetched: &[u8]) -> Result<Bytes, EncodeError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Re-encodes every tile as PNG.
///
/// The payload is always a lossless PNG regardless of the server's format,
/// which keeps stored tiles uniform.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngEncoder;

impl TileEncoder for PngEncoder {
    fn encode(&self, fetched: &[u8]) -> Result<Bytes, EncodeError> {
        let image =
            image::load_from_memory(fetched).map_err(|e| EncodeError::Decode(e.to_string()))?;

        let mut out = Cursor::new(Vec::with_capacity(fetched.len()));
        image
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| EncodeError::Encode(e.to_string()))?;

        Ok(Bytes::from(out.into_inner()))
    }

    fn name(&self) -> &str {
        "png"
    }
}

/// Stores fetched bytes unchanged.
///
/// Rejects empty bodies, which tile servers sometimes return with a 200.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawEncoder;

impl TileEncoder for RawEncoder {
    fn encode(&self, fetched: &[u8]) -> Result<Bytes, EncodeError> {
        if fetched.is_empty() {
            return Err(EncodeError::Encode("empty payload".to_string()));
        }
        Ok(Bytes::copy_from_slice(fetched))
    }

    fn name(&self) -> &str {
        "raw"
    }
}
