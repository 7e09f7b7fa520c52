use anyhow::{Context, Result};
use hgtstitch::{RegionGrid, RegionService};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Serialize)]
struct RegionMeta {
    start_lat: f64,
    start_lon: f64,
    end_lat: f64,
    end_lon: f64,
    width: usize,
    height: usize,
    sample_format: &'static str,
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    data_dir: Option<PathBuf>,
    base_url: Option<String>,
    start_lat: f64,
    start_lon: f64,
    end_lat: f64,
    end_lon: f64,
    output: PathBuf,
    json: bool,
) -> Result<()> {
    let data_dir = super::resolve_data_dir(data_dir)?;

    let mut builder = RegionService::builder(&data_dir);
    if let Some(base_url) = base_url {
        builder = builder.base_url(base_url);
    }
    let service = builder.build()?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(format!(
        "stitching ({start_lat}, {start_lon}) .. ({end_lat}, {end_lon})"
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let runtime = tokio::runtime::Runtime::new()?;
    let grid = runtime
        .block_on(service.load_region_async(start_lat, start_lon, end_lat, end_lon))
        .context("region load failed")?;

    spinner.finish_with_message(format!(
        "stitched {} x {} samples",
        grid.width(),
        grid.height()
    ));

    write_grid(&grid, &output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote {}", output.display());

    if json {
        let meta = RegionMeta {
            start_lat,
            start_lon,
            end_lat,
            end_lon,
            width: grid.width(),
            height: grid.height(),
            sample_format: "int16 big-endian, row-major, north row first",
        };
        let meta_path = output.with_extension("json");
        std::fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)?;
        println!("Wrote {}", meta_path.display());
    }

    Ok(())
}

/// Write the grid in the same sample layout as .hgt files: big-endian
/// 16-bit, row-major, northernmost row first.
fn write_grid(grid: &RegionGrid, output: &PathBuf) -> Result<()> {
    let mut bytes = Vec::with_capacity(grid.as_slice().len() * 2);
    for &sample in grid.as_slice() {
        bytes.extend_from_slice(&sample.to_be_bytes());
    }
    let mut file = std::fs::File::create(output)?;
    file.write_all(&bytes)?;
    Ok(())
}
