//! Region assembly: stitching per-tile windows into one output grid.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Result, StitchError};
use crate::filename::TileCoord;
use crate::grid::Region;
use crate::region::RegionGrid;
use crate::tile::TileSource;

/// Stitch every tile touching `region` into a single [`RegionGrid`].
///
/// `sources` must contain an entry for every tile the region's iterator
/// yields; a missing entry fails the whole request with
/// [`StitchError::MissingTile`] — partial results are never produced. All
/// tiles must agree on cells-per-degree or the request fails with
/// [`StitchError::ResolutionMismatch`].
///
/// The output buffer is sized `round(span * cells)` per axis and addressed
/// north-up (row 0 = northernmost), while tile windows arrive south-up, so
/// rows are flipped as they are copied in.
pub fn assemble(sources: &HashMap<TileCoord, TileSource>, region: &Region) -> Result<RegionGrid> {
    // Validate presence and resolution before any allocation or copy. The
    // iterator's first yield is the region's southwest tile, which fixes
    // the expected resolution for all of its siblings.
    let southwest = TileCoord::from_point(region.start_lat, region.start_lon);
    let d = sources
        .get(&southwest)
        .ok_or(StitchError::MissingTile { tile: southwest })?
        .cells();
    for coord in region.tiles() {
        let source = sources
            .get(&coord)
            .ok_or(StitchError::MissingTile { tile: coord })?;
        if source.cells() != d {
            return Err(StitchError::ResolutionMismatch {
                tile: coord,
                expected: d,
                found: source.cells(),
            });
        }
    }

    let width = (region.lon_span() * d as f64).round() as usize;
    let height = (region.lat_span() * d as f64).round() as usize;
    let mut data = vec![0i16; width * height];

    debug!(
        width,
        height,
        cells_per_degree = d,
        "assembling region ({}, {})..({}, {})",
        region.start_lat,
        region.start_lon,
        region.end_lat,
        region.end_lon
    );

    for coord in region.tiles() {
        let source = &sources[&coord];

        // Overlap of the request with this tile's one-degree square.
        let lat0 = region.start_lat.max(coord.lat as f64);
        let lat1 = region.end_lat.min((coord.lat + 1) as f64);
        let lon0 = region.start_lon.max(coord.lon as f64);
        let lon1 = region.end_lon.min((coord.lon + 1) as f64);

        let window = source.read_window((lat0, lat1), (lon0, lon1))?;
        if window.width() == 0 || window.height() == 0 {
            continue;
        }

        // Placement of this tile's contribution inside the output grid,
        // counted in cells from the region's southwest corner.
        let col_off = ((lon0 - region.start_lon) * d as f64).round() as usize;
        let row_off = ((lat0 - region.start_lat) * d as f64).round() as usize;

        let copy_width = window.width().min(width.saturating_sub(col_off));
        for r in 0..window.height() {
            let south_row = row_off + r;
            if south_row >= height {
                break;
            }
            let dest_row = height - 1 - south_row;
            let dest = dest_row * width + col_off;
            data[dest..dest + copy_width].copy_from_slice(&window.row(r)[..copy_width]);
        }
    }

    Ok(RegionGrid::new(data, width, height, *region))
}
