//! Engine result and error types.

use bytes::Bytes;
use thiserror::Error;

use crate::fetch::FetchError;
use crate::store::{Revision, StoredTile};

/// A 1x1 transparent GIF served for offline misses.
///
/// Two-colour palette with a graphic control extension marking index 0 as
/// transparent, and a single pixel of index 0.
pub const PLACEHOLDER_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

/// Image handed back to the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileImage {
    /// Empty stand-in for a tile that is not cached and may not be fetched.
    Placeholder,
    /// Encoded image bytes, either stored or freshly fetched.
    Data(Bytes),
}

impl TileImage {
    pub fn bytes(&self) -> Bytes {
        match self {
            TileImage::Placeholder => Bytes::from_static(PLACEHOLDER_GIF),
            TileImage::Data(bytes) => bytes.clone(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, TileImage::Placeholder)
    }
}

/// Where a resolved image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOrigin {
    Placeholder,
    /// A stored entry served without touching the network.
    Cache,
    Network,
    /// A stale entry served because the refetch failed.
    StaleFallback,
}

/// Result of the save procedure. Never raised as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Revision),
    /// Saving was not attempted.
    Skipped,
    EncodeFailed,
    /// Another writer updated the key between the re-read and the put.
    Conflict,
    StoreFailed,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }
}

/// A completed tile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTile {
    pub image: TileImage,
    pub origin: TileOrigin,
    pub save: SaveOutcome,
}

impl ResolvedTile {
    pub(crate) fn new(image: TileImage, origin: TileOrigin) -> Self {
        Self {
            image,
            origin,
            save: SaveOutcome::Skipped,
        }
    }

    pub(crate) fn with_save(mut self, save: SaveOutcome) -> Self {
        self.save = save;
        self
    }
}

/// Errors surfaced to the display for a single tile.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Empty key or URL.
    #[error("Invalid tile request: {0}")]
    InvalidRequest(String),

    /// The fetch failed and nothing was cached to fall back to.
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
}

/// Per-request progress through the engine.
#[derive(Debug)]
pub(crate) enum RequestState {
    Lookup,
    Fetching { stale: Option<StoredTile> },
    Saving { fetched: Bytes, prior: Option<Revision> },
    Done(ResolvedTile),
}
