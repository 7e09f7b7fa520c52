//! Region bounding boxes and the tile grid they cover.

use crate::error::{Result, StitchError};
use crate::filename::TileCoord;

/// A geographic bounding box in decimal degrees (WGS84).
///
/// `start` is the southwest corner, `end` the northeast corner; both axes
/// must satisfy `start <= end`. A degenerate box (`start == end`) is valid
/// and covers the single tile containing the point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Southern boundary latitude.
    pub start_lat: f64,
    /// Western boundary longitude.
    pub start_lon: f64,
    /// Northern boundary latitude.
    pub end_lat: f64,
    /// Eastern boundary longitude.
    pub end_lon: f64,
}

impl Region {
    /// Create a validated region.
    ///
    /// # Errors
    ///
    /// Returns [`StitchError::InvalidRegion`] if `start > end` on either
    /// axis. Nothing is read or fetched for an invalid region.
    pub fn new(start_lat: f64, start_lon: f64, end_lat: f64, end_lon: f64) -> Result<Self> {
        if start_lat > end_lat || start_lon > end_lon {
            return Err(StitchError::InvalidRegion {
                start_lat,
                start_lon,
                end_lat,
                end_lon,
            });
        }
        Ok(Self {
            start_lat,
            start_lon,
            end_lat,
            end_lon,
        })
    }

    /// The full 1° × 1° region of a single tile.
    pub fn tile(coord: TileCoord) -> Self {
        Self {
            start_lat: coord.lat as f64,
            start_lon: coord.lon as f64,
            end_lat: (coord.lat + 1) as f64,
            end_lon: (coord.lon + 1) as f64,
        }
    }

    /// Latitude span in degrees.
    pub fn lat_span(&self) -> f64 {
        self.end_lat - self.start_lat
    }

    /// Longitude span in degrees.
    pub fn lon_span(&self) -> f64 {
        self.end_lon - self.start_lon
    }

    /// Iterate over every tile touching this region.
    ///
    /// The order is fixed and load-bearing for the assembler: the outer
    /// loop walks latitude south to north from `floor(start_lat)`, the
    /// inner loop walks longitude west to east from `floor(start_lon)`.
    /// Each call returns a fresh iterator, so the sequence is restartable.
    pub fn tiles(&self) -> TileIter {
        TileIter::new(self)
    }
}

/// Lazy, finite iterator over the integer tile coordinates covered by a
/// [`Region`], in south-to-north (outer) / west-to-east (inner) order.
#[derive(Debug, Clone)]
pub struct TileIter {
    lat_min: i32,
    lat_max: i32,
    lon_min: i32,
    lon_max: i32,
    lat: i32,
    lon: i32,
}

impl TileIter {
    fn new(region: &Region) -> Self {
        let lat_min = region.start_lat.floor() as i32;
        let lon_min = region.start_lon.floor() as i32;
        // The last tile row/column is the largest integer strictly below
        // the end boundary; a degenerate axis still covers its one tile.
        let lat_max = last_tile(region.end_lat).max(lat_min);
        let lon_max = last_tile(region.end_lon).max(lon_min);

        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            lat: lat_min,
            lon: lon_min,
        }
    }
}

/// Largest whole degree strictly below `end`: a boundary exactly on a tile
/// corner does not pull in the next tile.
fn last_tile(end: f64) -> i32 {
    let floor = end.floor();
    if end == floor {
        floor as i32 - 1
    } else {
        floor as i32
    }
}

impl Iterator for TileIter {
    type Item = TileCoord;

    fn next(&mut self) -> Option<TileCoord> {
        if self.lat > self.lat_max {
            return None;
        }

        let coord = TileCoord::new(self.lat, self.lon);

        if self.lon < self.lon_max {
            self.lon += 1;
        } else {
            self.lon = self.lon_min;
            self.lat += 1;
        }

        Some(coord)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.lat > self.lat_max {
            return (0, Some(0));
        }
        let cols = (self.lon_max - self.lon_min + 1) as usize;
        let full_rows = (self.lat_max - self.lat) as usize;
        let remaining = full_rows * cols + (self.lon_max - self.lon + 1) as usize;
        (remaining, Some(remaining))
    }
}
