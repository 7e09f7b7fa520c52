use anyhow::{Context, Result};
use hgtstitch::{RegionService, TileCoord, VOID_VALUE};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct TileInfo {
    tile: String,
    path: String,
    width: usize,
    height: usize,
    start_lat: f64,
    start_lon: f64,
    end_lat: f64,
    end_lon: f64,
    min_elevation: Option<i16>,
    max_elevation: Option<i16>,
    void_samples: u64,
}

pub fn run(data_dir: Option<PathBuf>, tile: String, json: bool) -> Result<()> {
    // Accept a bare tile name, a filename, or a full path.
    let path = if tile.contains('/') || tile.contains('\\') {
        PathBuf::from(&tile)
    } else {
        let name = if tile.ends_with(".hgt") {
            tile.clone()
        } else {
            format!("{tile}.hgt")
        };
        super::resolve_data_dir(data_dir)?.join(name)
    };

    let coord = TileCoord::parse(&path.to_string_lossy())
        .with_context(|| format!("cannot parse tile coordinates from {}", path.display()))?;

    let service = RegionService::new(path.parent().unwrap_or(path.as_path()))?;
    let grid = service
        .load_file(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let mut min = i16::MAX;
    let mut max = i16::MIN;
    let mut voids = 0u64;
    for &sample in grid.as_slice() {
        if sample == VOID_VALUE {
            voids += 1;
        } else {
            min = min.min(sample);
            max = max.max(sample);
        }
    }
    let has_data = min <= max;

    let info = TileInfo {
        tile: coord.filename(),
        path: path.display().to_string(),
        width: grid.width(),
        height: grid.height(),
        start_lat: grid.start_lat_lon().0,
        start_lon: grid.start_lat_lon().1,
        end_lat: grid.end_lat_lon().0,
        end_lon: grid.end_lat_lon().1,
        min_elevation: has_data.then_some(min),
        max_elevation: has_data.then_some(max),
        void_samples: voids,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Tile: {}", info.tile);
    println!("Path: {}", info.path);
    println!();
    println!("Grid: {} x {} samples", info.width, info.height);
    println!(
        "Coverage: ({}, {}) .. ({}, {})",
        info.start_lat, info.start_lon, info.end_lat, info.end_lon
    );
    if let (Some(min), Some(max)) = (info.min_elevation, info.max_elevation) {
        println!("Min elevation: {min}m");
        println!("Max elevation: {max}m");
    }
    if info.void_samples > 0 {
        let total = (info.width * info.height) as f64;
        println!(
            "Void samples: {} ({:.1}%)",
            info.void_samples,
            info.void_samples as f64 / total * 100.0
        );
    }

    Ok(())
}
