//! The stitched output container.

use crate::grid::Region;

/// A stitched, contiguous grid of elevation samples for one region request.
///
/// Row-major with **row 0 as the northernmost requested row**, matching how
/// heightmap consumers address imagery. The grid is immutable once built
/// and owned solely by the caller.
///
/// For a region spanning `s` degrees on an axis at `d` cells per degree the
/// grid has `round(s * d)` samples on that axis.
#[derive(Debug)]
pub struct RegionGrid {
    data: Vec<i16>,
    width: usize,
    height: usize,
    region: Region,
}

impl RegionGrid {
    pub(crate) fn new(data: Vec<i16>, width: usize, height: usize, region: Region) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
            region,
        }
    }

    /// Grid width in samples.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in samples.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The bounding box this grid was assembled for.
    pub fn region(&self) -> Region {
        self.region
    }

    /// Southwest corner of the originating request, `(lat, lon)`.
    pub fn start_lat_lon(&self) -> (f64, f64) {
        (self.region.start_lat, self.region.start_lon)
    }

    /// Northeast corner of the originating request, `(lat, lon)`.
    pub fn end_lat_lon(&self) -> (f64, f64) {
        (self.region.end_lat, self.region.end_lon)
    }

    /// Sample at `(x, y)` where `x` counts from the west edge and `y` from
    /// the north edge. Out-of-range indices return `0` rather than failing.
    pub fn get(&self, x: usize, y: usize) -> i16 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.data[y * self.width + x]
    }

    /// Unchecked-by-contract sample access: `(x, y)` must be in range.
    pub fn get_raw(&self, x: usize, y: usize) -> i16 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x]
    }

    /// The raw sample buffer, row-major, north row first.
    pub fn as_slice(&self) -> &[i16] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> RegionGrid {
        let region = Region::new(37.0, -123.0, 38.0, -122.0).unwrap();
        RegionGrid::new(vec![1, 2, 3, 4, 5, 6], 3, 2, region)
    }

    #[test]
    fn test_get() {
        let g = grid();
        assert_eq!(g.get(0, 0), 1);
        assert_eq!(g.get(2, 0), 3);
        assert_eq!(g.get(0, 1), 4);
        assert_eq!(g.get(2, 1), 6);
    }

    #[test]
    fn test_get_out_of_range_is_zero() {
        let g = grid();
        assert_eq!(g.get(3, 0), 0);
        assert_eq!(g.get(0, 2), 0);
        assert_eq!(g.get(usize::MAX, usize::MAX), 0);
    }

    #[test]
    fn test_bounds() {
        let g = grid();
        assert_eq!(g.width(), 3);
        assert_eq!(g.height(), 2);
        assert_eq!(g.start_lat_lon(), (37.0, -123.0));
        assert_eq!(g.end_lat_lon(), (38.0, -122.0));
        assert_eq!(g.as_slice().len(), 6);
    }
}
