//! Tile sources: memory-mapped `.hgt` files and windowed sample reads.
//!
//! An `.hgt` file holds `n × n` signed 16-bit big-endian samples, row-major
//! from the **northwest** corner. The grid is post-spaced: sample posts sit
//! on cell corners, so a tile spans `d = n - 1` cells per degree and its
//! northernmost row and easternmost column duplicate the first row/column
//! of the northern and eastern neighbor tiles. Windowed reads therefore
//! cover `[0, d)` rows and columns per tile; the duplicated edge posts are
//! contributed by the neighbor that owns them.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::{Result, StitchError};
use crate::filename::TileCoord;

/// Value indicating no data (void) in SRTM files. Passed through unchanged.
pub const VOID_VALUE: i16 = -32768;

/// A read-only, memory-mapped elevation tile.
#[derive(Debug)]
pub struct TileSource {
    /// Memory-mapped file data.
    data: Mmap,
    /// Where the file lives, kept for error reporting.
    path: PathBuf,
    /// Samples per side (`n`), derived from the file length.
    samples: usize,
    /// Southwest corner of the tile.
    coord: TileCoord,
}

impl TileSource {
    /// Open and validate a tile file.
    ///
    /// The byte length must be `2 * n^2` for an exact integer `n >= 2`;
    /// anything else is a [`StitchError::CorruptTile`].
    pub fn open<P: AsRef<Path>>(path: P, coord: TileCoord) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;

        // SAFETY: the mapping is read-only and tile files are never
        // modified after the fetcher's atomic rename publishes them.
        let data = unsafe { Mmap::map(&file)? };

        let corrupt = |reason: String| StitchError::CorruptTile {
            path: path.clone(),
            reason,
        };

        let len = data.len();
        if len == 0 || len % 2 != 0 {
            return Err(corrupt(format!("byte length {len} is not a multiple of 2")));
        }

        let sample_count = len / 2;
        let samples = (sample_count as f64).sqrt().round() as usize;
        if samples * samples != sample_count {
            return Err(corrupt(format!(
                "{sample_count} samples do not form a square grid"
            )));
        }
        if samples < 2 {
            return Err(corrupt(format!("{samples} samples per side, need at least 2")));
        }

        Ok(Self {
            data,
            path,
            samples,
            coord,
        })
    }

    /// Samples per side of the raw grid (`n`, e.g. 3601 for SRTM1).
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Cells per degree (`n - 1`, e.g. 3600 for SRTM1). This is the tile's
    /// effective resolution once the post-spacing overlap is excluded.
    pub fn cells(&self) -> usize {
        self.samples - 1
    }

    /// Southwest corner of the tile.
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a rectangular window of samples.
    ///
    /// `lat_range` and `lon_range` are absolute degree ranges that must lie
    /// within this tile's one-degree square. The returned [`Window`] is
    /// row-major with **row 0 at the southern edge** of the window; callers
    /// that want north-up output (see `assemble`) flip rows when copying.
    ///
    /// Window sizing uses the same round-to-nearest convention as the
    /// assembler's output buffer: `round(span * cells())` rows/columns.
    pub fn read_window(&self, lat_range: (f64, f64), lon_range: (f64, f64)) -> Result<Window> {
        let d = self.cells();

        let seek_lat = (frac(lat_range.0) * d as f64).floor() as usize;
        let seek_lon = (frac(lon_range.0) * d as f64).floor() as usize;
        let height = ((lat_range.1 - lat_range.0) * d as f64).round() as usize;
        let width = ((lon_range.1 - lon_range.0) * d as f64).round() as usize;

        let mut samples = Vec::with_capacity(width * height);

        // Window rows count from the south edge, but storage is addressed
        // from the north edge with an (d + 1)-sample stride, hence the
        // `d - (seek_lat + row)` inversion. This mapping is byte-exact:
        // do not reorder it.
        for row in 0..height {
            let storage_row = d
                .checked_sub(seek_lat + row)
                .ok_or_else(|| self.corrupt(format!("window row {row} outside tile grid")))?;

            let offset = 2 * (storage_row * (d + 1) + seek_lon);
            let end = offset + 2 * width;
            if end > self.data.len() {
                return Err(self.corrupt(format!(
                    "short read: need bytes {offset}..{end} of {}",
                    self.data.len()
                )));
            }

            samples.extend(
                self.data[offset..end]
                    .chunks_exact(2)
                    .map(|b| i16::from_be_bytes([b[0], b[1]])),
            );
        }

        Ok(Window {
            samples,
            width,
            height,
        })
    }

    fn corrupt(&self, reason: String) -> StitchError {
        StitchError::CorruptTile {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Fractional part in `[0, 1)`, correct for negative coordinates.
fn frac(v: f64) -> f64 {
    v - v.floor()
}

/// A decoded sub-window of one tile.
///
/// Row-major; row 0 is the **southernmost** row of the window.
#[derive(Debug, Clone)]
pub struct Window {
    samples: Vec<i16>,
    width: usize,
    height: usize,
}

impl Window {
    /// Window width in samples.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Window height in samples.
    pub fn height(&self) -> usize {
        self.height
    }

    /// One window row, south-indexed.
    pub fn row(&self, row: usize) -> &[i16] {
        let start = row * self.width;
        &self.samples[start..start + self.width]
    }
}
