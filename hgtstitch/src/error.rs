//! Error types for the hgtstitch library.

use std::path::PathBuf;
use thiserror::Error;

use crate::filename::TileCoord;

/// Errors that can occur while assembling SRTM regions.
///
/// Every variant is terminal for the request that raised it: the library
/// never retries on its own, and a failed region request delivers exactly
/// one failure to its callback. Re-submitting the request is the only
/// recovery path.
#[derive(Error, Debug)]
pub enum StitchError {
    /// IO error when reading or writing tile files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A tile filename could not be parsed into coordinates.
    #[error("invalid tile name: {name:?} (expected [N|S]LL[E|W]LLL, e.g. N37W123)")]
    InvalidName { name: String },

    /// A tile file is malformed: wrong byte length, non-square sample
    /// count, or a read past the end of the data.
    #[error("corrupt tile {path}: {reason}")]
    CorruptTile { path: PathBuf, reason: String },

    /// Sibling tiles within one request report different resolutions.
    #[error(
        "resolution mismatch: tile {tile} has {found} cells per degree, expected {expected}"
    )]
    ResolutionMismatch {
        tile: TileCoord,
        expected: usize,
        found: usize,
    },

    /// A tile required by the requested region has no local source.
    #[error("missing tile {tile} for requested region")]
    MissingTile { tile: TileCoord },

    /// Downloading or persisting a remote tile failed.
    #[error("fetch failed for tile {tile}: {reason}")]
    Fetch { tile: TileCoord, reason: String },

    /// The requested bounding box is not ordered start <= end per axis.
    #[error(
        "invalid region: ({start_lat}, {start_lon})..({end_lat}, {end_lon}) \
         must satisfy start <= end on both axes"
    )]
    InvalidRegion {
        start_lat: f64,
        start_lon: f64,
        end_lat: f64,
        end_lon: f64,
    },
}

/// Result type alias using [`StitchError`].
pub type Result<T> = std::result::Result<T, StitchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StitchError::InvalidName {
            name: "X37W123".to_string(),
        };
        assert!(err.to_string().contains("X37W123"));

        let err = StitchError::CorruptTile {
            path: PathBuf::from("N37W123.hgt"),
            reason: "odd byte length".to_string(),
        };
        assert!(err.to_string().contains("N37W123.hgt"));
        assert!(err.to_string().contains("odd byte length"));

        let err = StitchError::MissingTile {
            tile: TileCoord::new(37, -123),
        };
        assert!(err.to_string().contains("N37W123"));

        let err = StitchError::InvalidRegion {
            start_lat: 38.0,
            start_lon: -122.0,
            end_lat: 37.0,
            end_lon: -123.0,
        };
        assert!(err.to_string().contains("38"));
    }
}
