//! Coordinate type definitions

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels supported by slippy-map tile servers
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 24;

/// Standard tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Tile coordinates in the Web Mercator / Slippy Map system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Y coordinate (north-south), 0 at north
    pub row: u32,
    /// X coordinate (east-west), 0 at west
    pub col: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoord {
    pub fn new(zoom: u8, col: u32, row: u32) -> Self {
        Self { row, col, zoom }
    }

    /// Number of tiles along each edge of the grid at this zoom.
    pub fn grid_size(&self) -> u64 {
        1u64.checked_shl(u32::from(self.zoom)).unwrap_or(u64::MAX)
    }

    /// Checks that the zoom is supported and `col`/`row` lie inside the grid.
    pub fn validate(&self) -> Result<(), CoordError> {
        if self.zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(self.zoom));
        }
        let size = self.grid_size();
        if u64::from(self.col) >= size || u64::from(self.row) >= size {
            return Err(CoordError::InvalidTile(*self));
        }
        Ok(())
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}

/// Geographic bounding box in degrees.
///
/// Boxes crossing the antimeridian are not supported; `west` must not exceed
/// `east`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Creates a bounding box, validating ranges and ordering.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, CoordError> {
        for lat in [south, north] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(CoordError::InvalidLatitude(lat));
            }
        }
        for lon in [west, east] {
            if !(MIN_LON..=MAX_LON).contains(&lon) {
                return Err(CoordError::InvalidLongitude(lon));
            }
        }
        if south > north || west > east {
            return Err(CoordError::InvalidBounds(format!(
                "{},{},{},{}",
                south, west, north, east
            )));
        }
        Ok(Self {
            south,
            west,
            north,
            east,
        })
    }

    /// North-east corner as (lat, lon).
    pub fn north_east(&self) -> (f64, f64) {
        (self.north, self.east)
    }

    /// South-west corner as (lat, lon).
    pub fn south_west(&self) -> (f64, f64) {
        (self.south, self.west)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

/// Parses `south,west,north,east`.
impl FromStr for BoundingBox {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(CoordError::InvalidBounds(s.to_string()));
        }

        let mut values = [0.0_f64; 4];
        for (slot, part) in values.iter_mut().zip(parts.iter()) {
            *slot = part
                .parse()
                .map_err(|_| CoordError::InvalidBounds(s.to_string()))?;
        }

        Self::new(values[0], values[1], values[2], values[3])
    }
}

/// Inclusive rectangle of tile indices at a single zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub min_row: u32,
    pub max_row: u32,
    pub min_col: u32,
    pub max_col: u32,
}

impl TileRange {
    /// Number of tiles in the rectangle.
    pub fn len(&self) -> u64 {
        let rows = (self.max_row - self.min_row) as u64 + 1;
        let cols = (self.max_col - self.min_col) as u64 + 1;
        rows * cols
    }

    /// A range always covers at least one tile.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, tile: &TileCoord) -> bool {
        tile.zoom == self.zoom
            && (self.min_row..=self.max_row).contains(&tile.row)
            && (self.min_col..=self.max_col).contains(&tile.col)
    }

    /// Iterates tiles in row-major order (outer rows, inner columns).
    pub fn tiles(&self) -> TileRangeIter {
        TileRangeIter {
            range: *self,
            row: self.min_row,
            col: self.min_col,
            done: false,
        }
    }
}

/// Row-major iterator over a [`TileRange`].
#[derive(Debug, Clone)]
pub struct TileRangeIter {
    range: TileRange,
    row: u32,
    col: u32,
    done: bool,
}

impl Iterator for TileRangeIter {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let tile = TileCoord {
            row: self.row,
            col: self.col,
            zoom: self.range.zoom,
        };

        if self.col < self.range.max_col {
            self.col += 1;
        } else if self.row < self.range.max_row {
            self.col = self.range.min_col;
            self.row += 1;
        } else {
            self.done = true;
        }

        Some(tile)
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is outside the valid range
    InvalidLatitude(f64),
    /// Longitude is outside valid range (-180.0 to 180.0)
    InvalidLongitude(f64),
    /// Zoom level is outside the supported range
    InvalidZoom(u8),
    /// Bounding box could not be parsed or is inverted
    InvalidBounds(String),
    /// Column or row lies outside the grid at the tile's zoom
    InvalidTile(TileCoord),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "Invalid latitude: {} (must be between {} and {})",
                    lat, MIN_LAT, MAX_LAT
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between {} and {})",
                    lon, MIN_LON, MAX_LON
                )
            }
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between {} and {})",
                    zoom, MIN_ZOOM, MAX_ZOOM
                )
            }
            CoordError::InvalidBounds(bounds) => {
                write!(
                    f,
                    "Invalid bounding box: '{}' (expected south,west,north,east)",
                    bounds
                )
            }
            CoordError::InvalidTile(tile) => {
                write!(
                    f,
                    "Invalid tile: {} (column and row must be below {} at zoom {})",
                    tile,
                    tile.grid_size(),
                    tile.zoom
                )
            }
        }
    }
}

impl std::error::Error for CoordError {}
