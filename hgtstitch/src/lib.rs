//! # hgtstitch — SRTM region assembly
//!
//! Assembles elevation data for an arbitrary geographic bounding box from
//! 1° × 1° SRTM-style `.hgt` tiles named by their southwest corner
//! (`N37W123.hgt`). A requested region may span several tiles; each tile
//! contributes only a sub-window of its rows and columns, and tiles missing
//! locally are fetched, decompressed and persisted before assembly. The
//! result is a single contiguous north-up grid of 16-bit samples.
//!
//! ## Quick start
//!
//! ```ignore
//! use hgtstitch::RegionService;
//!
//! let service = RegionService::new("/data/srtm")?;
//!
//! // Local single-tile shortcut, synchronous:
//! let grid = service.load_file("/data/srtm/N37W123.hgt")?;
//! assert_eq!(grid.start_lat_lon(), (37.0, -123.0));
//!
//! // Multi-tile region with automatic fetching, callback-based:
//! service.load_region(37.25, -123.5, 38.75, -121.0, |result| {
//!     if let Ok(grid) = result {
//!         println!("stitched {} x {} samples", grid.width(), grid.height());
//!     }
//! });
//! ```
//!
//! ## Tile format
//!
//! Each `.hgt` file holds `n × n` signed 16-bit big-endian samples stored
//! row-major from the northwest corner (`n` is 3601 for SRTM1, 1201 for
//! SRTM3; any exact square is accepted). Sample posts sit on cell corners,
//! so a tile covers `n - 1` cells per degree and shares its edge posts with
//! its neighbors. The value `-32768` marks voids and is passed through.
//!
//! ## Failure model
//!
//! Region requests are all-or-nothing: a missing, corrupt or unfetchable
//! tile fails the whole request, and the completion callback fires exactly
//! once with either the finished grid or the first error. Nothing is
//! retried internally.

pub mod assemble;
pub mod download;
pub mod error;
pub mod filename;
pub mod grid;
pub mod region;
pub mod service;
pub mod tile;

// Re-export main types at crate root for convenience
pub use assemble::assemble;
pub use download::{FetchConfig, Fetcher, DEFAULT_BASE_URL};
pub use error::{Result, StitchError};
pub use filename::{is_valid_filename, TileCoord};
pub use grid::{Region, TileIter};
pub use region::RegionGrid;
pub use service::{LoadCallback, RegionService, RegionServiceBuilder};
pub use tile::{TileSource, Window, VOID_VALUE};
