//! Tile naming: conversion between coordinates and SRTM `.hgt` filenames.
//!
//! SRTM files follow the naming convention `{N|S}{lat}{E|W}{lon}.hgt`:
//!
//! - Latitude: 2 digits with N/S prefix (e.g., N35, S12)
//! - Longitude: 3 digits with E/W prefix (e.g., E138, W077)
//!
//! The name identifies the **southwest corner** of the 1° × 1° tile.

use std::fmt;

use crate::error::{Result, StitchError};

/// Length of the bare tile token, e.g. `N37W123`.
const TOKEN_LEN: usize = 7;

/// Integer (latitude, longitude) pair identifying a tile's southwest corner.
///
/// # Examples
///
/// ```
/// use hgtstitch::TileCoord;
///
/// let coord = TileCoord::new(37, -123);
/// assert_eq!(coord.filename(), "N37W123");
/// assert_eq!(TileCoord::parse("/data/N37W123.hgt").unwrap(), coord);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Southwest corner latitude, whole degrees.
    pub lat: i32,
    /// Southwest corner longitude, whole degrees.
    pub lon: i32,
}

impl TileCoord {
    /// Create a tile coordinate from whole-degree latitude and longitude.
    pub fn new(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }

    /// The tile containing the given point (floor of each axis).
    ///
    /// ```
    /// use hgtstitch::TileCoord;
    ///
    /// assert_eq!(TileCoord::from_point(35.5, 138.7), TileCoord::new(35, 138));
    /// assert_eq!(TileCoord::from_point(-12.3, -77.1), TileCoord::new(-13, -78));
    /// ```
    pub fn from_point(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.floor() as i32,
            lon: lon.floor() as i32,
        }
    }

    /// The bare tile token, e.g. `"N37W123"` or `"S13W078"`.
    pub fn filename(&self) -> String {
        format!(
            "{}{:02}{}{:03}",
            if self.lat >= 0 { 'N' } else { 'S' },
            self.lat.abs(),
            if self.lon >= 0 { 'E' } else { 'W' },
            self.lon.abs()
        )
    }

    /// The canonical on-disk filename, e.g. `"N37W123.hgt"`.
    pub fn hgt_name(&self) -> String {
        format!("{}.hgt", self.filename())
    }

    /// Parse a tile coordinate from a filename.
    ///
    /// Accepts a bare token (`N37W123`), a filename (`N37W123.hgt`), or a
    /// full path; only the trailing token is considered. Hemisphere letters
    /// are case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`StitchError::InvalidName`] if the token is the wrong
    /// length, the hemisphere letters are not `N`/`S` and `E`/`W`, or the
    /// digit fields are not numeric.
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = || StitchError::InvalidName {
            name: name.to_string(),
        };

        // Strip any path prefix, then the extension.
        let token = name
            .rsplit('/')
            .next()
            .unwrap_or(name)
            .rsplit('\\')
            .next()
            .unwrap_or(name);
        let token = token.strip_suffix(".hgt").unwrap_or(token);

        if token.len() != TOKEN_LEN || !token.is_ascii() {
            return Err(invalid());
        }

        let bytes = token.as_bytes();

        let lat_sign = match bytes[0] {
            b'N' | b'n' => 1,
            b'S' | b's' => -1,
            _ => return Err(invalid()),
        };
        let lon_sign = match bytes[3] {
            b'E' | b'e' => 1,
            b'W' | b'w' => -1,
            _ => return Err(invalid()),
        };

        let lat: i32 = token[1..3].parse().map_err(|_| invalid())?;
        let lon: i32 = token[4..7].parse().map_err(|_| invalid())?;

        Ok(Self {
            lat: lat * lat_sign,
            lon: lon * lon_sign,
        })
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename())
    }
}

/// Check whether a filename parses as a valid tile name.
///
/// ```
/// use hgtstitch::filename::is_valid_filename;
///
/// assert!(is_valid_filename("N37W123.hgt"));
/// assert!(!is_valid_filename("heightmap.hgt"));
/// ```
pub fn is_valid_filename(name: &str) -> bool {
    TileCoord::parse(name).is_ok()
}
