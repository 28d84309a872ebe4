//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates, and the tile-grid geometry used to
//! enumerate the tiles covering a bounding box.

mod types;

pub use types::{
    BoundingBox, CoordError, TileCoord, TileRange, TileRangeIter, DEFAULT_TILE_SIZE, MAX_LAT,
    MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Half the Web Mercator world width in meters (EPSG:3857).
pub const MERCATOR_ORIGIN_SHIFT: f64 = 20_037_508.342_789_244;

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 24)
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let grid = TileGrid::default();
    let (x, y) = grid.project(lat, lon, zoom);
    Ok(grid.tile_at(x, y, zoom))
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.col as f64 / n * 360.0 - 180.0;

    let y = tile.row as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Returns the tile's extent in EPSG:3857 meters as `(min_x, min_y, max_x, max_y)`.
pub fn tile_mercator_bounds(tile: &TileCoord) -> (f64, f64, f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);
    let span = 2.0 * MERCATOR_ORIGIN_SHIFT / n;

    let min_x = -MERCATOR_ORIGIN_SHIFT + tile.col as f64 * span;
    let max_y = MERCATOR_ORIGIN_SHIFT - tile.row as f64 * span;

    (min_x, max_y - span, min_x + span, max_y)
}

/// Tile-grid geometry of a map: pixel projection and tile size.
///
/// This is the coordinate context a cached layer needs before it can seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    tile_size: u32,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl TileGrid {
    /// Creates a grid with the given tile edge length in pixels.
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size: tile_size.max(1),
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Projects a lat/lon to global pixel coordinates at `zoom`.
    ///
    /// Latitude is clamped to the Web Mercator range.
    pub fn project(&self, lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
        let lat = lat.clamp(MIN_LAT, MAX_LAT);
        let scale = self.tile_size as f64 * 2.0_f64.powi(zoom as i32);

        let x = (lon + 180.0) / 360.0 * scale;
        let lat_rad = lat * PI / 180.0;
        let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * scale;

        (x, y)
    }

    /// Tile containing a global pixel position, clamped to the grid edge.
    fn tile_at(&self, x: f64, y: f64, zoom: u8) -> TileCoord {
        let last = (1u64 << zoom).saturating_sub(1) as f64;
        let size = self.tile_size as f64;

        let col = (x / size).floor().clamp(0.0, last) as u32;
        let row = (y / size).floor().clamp(0.0, last) as u32;

        TileCoord { row, col, zoom }
    }

    /// Computes the inclusive tile rectangle covering `bbox` at `zoom`.
    pub fn tile_range(&self, bbox: &BoundingBox, zoom: u8) -> Result<TileRange, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }

        let (ne_lat, ne_lon) = bbox.north_east();
        let (sw_lat, sw_lon) = bbox.south_west();

        let (ne_x, ne_y) = self.project(ne_lat, ne_lon, zoom);
        let (sw_x, sw_y) = self.project(sw_lat, sw_lon, zoom);

        let ne = self.tile_at(ne_x, ne_y, zoom);
        let sw = self.tile_at(sw_x, sw_y, zoom);

        Ok(TileRange {
            zoom,
            min_row: ne.row.min(sw.row),
            max_row: ne.row.max(sw.row),
            min_col: ne.col.min(sw.col),
            max_col: ne.col.max(sw.col),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_york_city_at_zoom_16() {
        let tile = to_tile_coords(40.7128, -74.0060, 16).unwrap();
        assert_eq!(tile.row, 24640);
        assert_eq!(tile.col, 19295);
        assert_eq!(tile.zoom, 16);
    }

    #[test]
    fn test_invalid_latitude() {
        let result = to_tile_coords(90.0, 0.0, 10);
        assert!(matches!(
            result.unwrap_err(),
            CoordError::InvalidLatitude(_)
        ));
    }

    #[test]
    fn test_invalid_zoom() {
        let result = to_tile_coords(0.0, 0.0, MAX_ZOOM + 1);
        assert!(matches!(result.unwrap_err(), CoordError::InvalidZoom(_)));
    }

    #[test]
    fn test_east_edge_is_clamped_to_last_column() {
        let tile = to_tile_coords(0.0, 180.0, 3).unwrap();
        assert_eq!(tile.col, 7);
    }

    #[test]
    fn test_tile_to_lat_lon_at_equator() {
        let tile = TileCoord {
            row: 512,
            col: 512,
            zoom: 10,
        };

        let (lat, lon) = tile_to_lat_lon(&tile);
        assert!(lat.abs() < 1.0, "Should be near equator");
        assert!(lon.abs() < 1.0, "Should be near prime meridian");
    }

    #[test]
    fn test_tile_range_two_by_two() {
        let bbox = BoundingBox::new(-1.0, 1.0, 1.0, 46.0).unwrap();
        let range = TileGrid::default().tile_range(&bbox, 3).unwrap();

        assert_eq!((range.min_row, range.max_row), (3, 4));
        assert_eq!((range.min_col, range.max_col), (4, 5));
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn test_tile_range_iterates_row_major() {
        let range = TileRange {
            zoom: 5,
            min_row: 10,
            max_row: 11,
            min_col: 20,
            max_col: 22,
        };

        let tiles: Vec<(u32, u32)> = range.tiles().map(|t| (t.row, t.col)).collect();
        assert_eq!(
            tiles,
            vec![(10, 20), (10, 21), (10, 22), (11, 20), (11, 21), (11, 22)]
        );
    }

    #[test]
    fn test_tile_range_point_bbox_is_single_tile() {
        let bbox = BoundingBox::new(51.5, -0.12, 51.5, -0.12).unwrap();
        let range = TileGrid::default().tile_range(&bbox, 12).unwrap();
        assert_eq!(range.len(), 1);
    }

    #[test]
    fn test_tile_size_does_not_change_indices() {
        let bbox = BoundingBox::new(40.0, -75.0, 41.0, -73.0).unwrap();
        let small = TileGrid::new(256).tile_range(&bbox, 9).unwrap();
        let large = TileGrid::new(512).tile_range(&bbox, 9).unwrap();
        assert_eq!(small, large);
    }

    #[test]
    fn test_validate_tile_inside_grid() {
        assert!(TileCoord::new(3, 7, 7).validate().is_ok());
        assert!(TileCoord::new(0, 0, 0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_row_and_col_outside_grid() {
        let tile = TileCoord::new(3, 0, 9);
        assert_eq!(tile.validate(), Err(CoordError::InvalidTile(tile)));
        assert!(TileCoord::new(3, 8, 0).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_huge_zoom() {
        assert_eq!(
            TileCoord::new(200, 0, 0).validate(),
            Err(CoordError::InvalidZoom(200))
        );
        assert_eq!(TileCoord::new(200, 0, 0).grid_size(), u64::MAX);
    }

    #[test]
    fn test_mercator_bounds_of_world_tile() {
        let (min_x, min_y, max_x, max_y) = tile_mercator_bounds(&TileCoord::new(0, 0, 0));
        assert!((min_x + MERCATOR_ORIGIN_SHIFT).abs() < 1e-6);
        assert!((min_y + MERCATOR_ORIGIN_SHIFT).abs() < 1e-6);
        assert!((max_x - MERCATOR_ORIGIN_SHIFT).abs() < 1e-6);
        assert!((max_y - MERCATOR_ORIGIN_SHIFT).abs() < 1e-6);
    }

    #[test]
    fn test_bbox_parse() {
        let bbox: BoundingBox = "45.0, 5.5, 46.0, 7.25".parse().unwrap();
        assert_eq!(bbox.south, 45.0);
        assert_eq!(bbox.east, 7.25);
    }

    #[test]
    fn test_bbox_rejects_inverted() {
        assert!(matches!(
            BoundingBox::new(46.0, 5.0, 45.0, 6.0),
            Err(CoordError::InvalidBounds(_))
        ));
        assert!("1,2,3".parse::<BoundingBox>().is_err());
    }

    proptest! {
        #[test]
        fn prop_range_contains_corner_tiles(
            south in -80.0f64..80.0,
            height in 0.0f64..4.0,
            west in -179.0f64..170.0,
            width in 0.0f64..8.0,
            zoom in 0u8..14,
        ) {
            let north = (south + height).min(85.0);
            let east = (west + width).min(180.0);
            let bbox = BoundingBox::new(south, west, north, east).unwrap();
            let range = TileGrid::default().tile_range(&bbox, zoom).unwrap();

            let sw = to_tile_coords(south, west, zoom).unwrap();
            let ne = to_tile_coords(north, east, zoom).unwrap();
            prop_assert!(range.contains(&sw));
            prop_assert!(range.contains(&ne));
            prop_assert_eq!(range.tiles().count() as u64, range.len());
        }
    }
}
