pub mod check;
pub mod info;
pub mod list;
pub mod region;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Resolve the tile directory from the CLI flag or environment.
pub fn resolve_data_dir(data_dir: Option<PathBuf>) -> Result<PathBuf> {
    match data_dir {
        Some(dir) => Ok(dir),
        None => std::env::var("HGTSTITCH_DATA_DIR")
            .map(PathBuf::from)
            .context("no tile directory: use --data-dir or set HGTSTITCH_DATA_DIR"),
    }
}
