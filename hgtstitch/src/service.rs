//! The caller-facing region service and in-flight request tracking.
//!
//! [`RegionService`] is the high-level entry point: synchronous single-file
//! loads, and asynchronous multi-tile region loads that fetch missing tiles
//! concurrently and deliver the stitched result through a completion
//! callback invoked exactly once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::assemble::assemble;
use crate::download::{FetchConfig, Fetcher};
use crate::error::{Result, StitchError};
use crate::filename::{is_valid_filename, TileCoord};
use crate::grid::Region;
use crate::region::RegionGrid;
use crate::tile::TileSource;

/// Completion callback for an asynchronous region load.
pub type LoadCallback = Box<dyn FnOnce(Result<RegionGrid>) + Send + 'static>;

/// High-level service for loading elevation regions.
///
/// # Example
///
/// ```ignore
/// use hgtstitch::RegionService;
///
/// let service = RegionService::new("/data/srtm")?;
///
/// // Synchronous, local-only single tile:
/// let tile = service.load_file("/data/srtm/N37W123.hgt")?;
///
/// // Asynchronous multi-tile region (fetches missing tiles):
/// service.load_region(37.0, -123.0, 38.5, -121.5, |result| {
///     match result {
///         Ok(grid) => println!("{} x {} samples", grid.width(), grid.height()),
///         Err(e) => eprintln!("region load failed: {e}"),
///     }
/// });
/// ```
#[derive(Clone)]
pub struct RegionService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    data_dir: PathBuf,
    fetcher: Fetcher,
}

impl ServiceInner {
    /// Open a [`TileSource`] for every tile the region touches.
    fn open_sources(&self, region: &Region) -> Result<HashMap<TileCoord, TileSource>> {
        let mut sources = HashMap::new();
        for coord in region.tiles() {
            let path = self.data_dir.join(coord.hgt_name());
            if !path.exists() {
                return Err(StitchError::MissingTile { tile: coord });
            }
            sources.insert(coord, TileSource::open(path, coord)?);
        }
        Ok(sources)
    }

    fn assemble_local(&self, region: &Region) -> Result<RegionGrid> {
        let sources = self.open_sources(region)?;
        assemble(&sources, region)
    }
}

impl RegionService {
    /// Create a service over a local tile directory with the default
    /// fetch configuration.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        Self::builder(data_dir).build()
    }

    /// Create a builder for more configuration options.
    pub fn builder<P: AsRef<Path>>(data_dir: P) -> RegionServiceBuilder {
        RegionServiceBuilder::new(data_dir)
    }

    /// The local tile directory.
    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    /// Whether a filename parses as a valid tile name.
    pub fn is_valid_filename(name: &str) -> bool {
        is_valid_filename(name)
    }

    /// Load a single `.hgt` file as a full 1° × 1° region.
    ///
    /// Synchronous and local-only: no fetching. The tile's coordinates are
    /// parsed from the filename; the result covers
    /// `(lat, lon)..(lat + 1, lon + 1)`.
    ///
    /// # Errors
    ///
    /// [`StitchError::InvalidName`] for an unparseable filename,
    /// [`StitchError::Io`] if the file cannot be read, or
    /// [`StitchError::CorruptTile`] for a malformed file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<RegionGrid> {
        let coord = TileCoord::parse(&path.as_ref().to_string_lossy())?;
        self.load_file_with_coords(path, coord.lat, coord.lon)
    }

    /// Load a single `.hgt` file with explicit southwest-corner
    /// coordinates, for files that do not follow the naming convention.
    pub fn load_file_with_coords<P: AsRef<Path>>(
        &self,
        path: P,
        lat: i32,
        lon: i32,
    ) -> Result<RegionGrid> {
        let coord = TileCoord::new(lat, lon);
        let source = TileSource::open(path, coord)?;
        let region = Region::tile(coord);
        let sources = HashMap::from([(coord, source)]);
        assemble(&sources, &region)
    }

    /// Load an arbitrary bounding box, fetching missing tiles.
    ///
    /// Never blocks the caller. If the box is malformed the callback is
    /// invoked synchronously with [`StitchError::InvalidRegion`]. If every
    /// tile is already local, assembly runs and the callback fires before
    /// this method returns. Otherwise one fetch task is spawned per missing
    /// tile and the callback runs on whichever task settles last; a tokio
    /// runtime must be current in that case.
    ///
    /// The callback is invoked exactly once. Any single tile failure fails
    /// the whole request — remaining fetches still settle first, but
    /// assembly is skipped and the callback receives the first error. There
    /// is no cancellation; an in-flight request runs to completion.
    pub fn load_region<F>(
        &self,
        start_lat: f64,
        start_lon: f64,
        end_lat: f64,
        end_lon: f64,
        callback: F,
    ) where
        F: FnOnce(Result<RegionGrid>) + Send + 'static,
    {
        let region = match Region::new(start_lat, start_lon, end_lat, end_lon) {
            Ok(region) => region,
            Err(e) => {
                warn!("rejecting malformed region request: {e}");
                callback(Err(e));
                return;
            }
        };

        let missing: Vec<TileCoord> = region
            .tiles()
            .filter(|&coord| !self.inner.fetcher.local_path(coord).exists())
            .collect();

        if missing.is_empty() {
            callback(self.inner.assemble_local(&region));
            return;
        }

        debug!(
            tiles = missing.len(),
            "region needs remote tiles, spawning fetches"
        );

        let pending = PendingLoad::new(region, missing.len(), Box::new(callback));
        for coord in missing {
            let inner = Arc::clone(&self.inner);
            let pending = Arc::clone(&pending);
            tokio::spawn(async move {
                let outcome = inner.fetcher.ensure_local(coord).await.map(|_| ());
                pending.settle(outcome, || inner.assemble_local(&pending.region));
            });
        }
    }

    /// Future-based variant of [`load_region`](Self::load_region).
    pub async fn load_region_async(
        &self,
        start_lat: f64,
        start_lon: f64,
        end_lat: f64,
        end_lon: f64,
    ) -> Result<RegionGrid> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.load_region(start_lat, start_lon, end_lat, end_lon, move |result| {
            let _ = tx.send(result);
        });
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(StitchError::Io(std::io::Error::other(
                "region load callback was dropped",
            ))),
        }
    }
}

/// State of one in-flight multi-tile request.
///
/// The outstanding-fetch counter is the single synchronization point: the
/// decrement that observes the last outstanding fetch performs assembly
/// and fires the callback, so the callback can only ever run once.
struct PendingLoad {
    region: Region,
    remaining: AtomicUsize,
    error: Mutex<Option<StitchError>>,
    callback: Mutex<Option<LoadCallback>>,
}

impl PendingLoad {
    fn new(region: Region, fetches: usize, callback: LoadCallback) -> Arc<Self> {
        Arc::new(Self {
            region,
            remaining: AtomicUsize::new(fetches),
            error: Mutex::new(None),
            callback: Mutex::new(Some(callback)),
        })
    }

    /// Record one settled fetch. The final settle assembles (unless any
    /// fetch failed) and delivers the result.
    fn settle(&self, outcome: Result<()>, finish: impl FnOnce() -> Result<RegionGrid>) {
        if let Err(e) = outcome {
            let mut slot = self.error.lock().unwrap();
            // Keep the first failure; later ones add nothing.
            if slot.is_none() {
                *slot = Some(e);
            }
        }

        if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }

        let Some(callback) = self.callback.lock().unwrap().take() else {
            return;
        };
        let result = match self.error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => finish(),
        };
        callback(result);
    }
}

/// Builder for [`RegionService`].
///
/// # Example
///
/// ```ignore
/// use hgtstitch::{FetchConfig, RegionService};
///
/// let service = RegionService::builder("/data/srtm")
///     .base_url("https://tiles.example.com/srtm")
///     .timeout_secs(60)
///     .build()?;
/// ```
pub struct RegionServiceBuilder {
    data_dir: PathBuf,
    fetch_config: FetchConfig,
}

impl RegionServiceBuilder {
    /// Create a new builder with the specified tile directory.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            fetch_config: FetchConfig::default(),
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `HGTSTITCH_DATA_DIR` | Directory holding `.hgt` tiles | Required |
    /// | `HGTSTITCH_BASE_URL` | Remote dataset base URL | AWS skadi |
    /// | `HGTSTITCH_TIMEOUT_SECS` | HTTP timeout in seconds | 300 |
    ///
    /// # Errors
    ///
    /// Returns an error if `HGTSTITCH_DATA_DIR` is not set.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("HGTSTITCH_DATA_DIR").map_err(|_| {
            StitchError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "HGTSTITCH_DATA_DIR environment variable not set",
            ))
        })?;

        let mut builder = Self::new(PathBuf::from(data_dir));
        if let Ok(base_url) = std::env::var("HGTSTITCH_BASE_URL") {
            builder.fetch_config.base_url = base_url;
        }
        if let Some(timeout) = std::env::var("HGTSTITCH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            builder.fetch_config.timeout_secs = timeout;
        }
        Ok(builder)
    }

    /// Override the tile directory.
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the remote dataset base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.fetch_config.base_url = base_url.into();
        self
    }

    /// Set the HTTP request timeout.
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.fetch_config.timeout_secs = timeout_secs;
        self
    }

    /// Replace the whole fetch configuration.
    pub fn fetch_config(mut self, config: FetchConfig) -> Self {
        self.fetch_config = config;
        self
    }

    /// Build the [`RegionService`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<RegionService> {
        let fetcher = Fetcher::new(&self.data_dir, self.fetch_config)?;
        Ok(RegionService {
            inner: Arc::new(ServiceInner {
                data_dir: self.data_dir,
                fetcher,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::AtomicU32;
    use tempfile::TempDir;

    const N: usize = 5; // 4 cells per degree

    fn write_tile(dir: &Path, coord: TileCoord, fill: i16) {
        let mut data = Vec::with_capacity(N * N * 2);
        for _ in 0..N * N {
            data.extend_from_slice(&fill.to_be_bytes());
        }
        std::fs::File::create(dir.join(coord.hgt_name()))
            .unwrap()
            .write_all(&data)
            .unwrap();
    }

    fn service(dir: &Path) -> RegionService {
        // Unroutable loopback port so accidental fetches fail fast and
        // locally instead of reaching out to the real dataset.
        RegionService::builder(dir)
            .base_url("http://127.0.0.1:1")
            .timeout_secs(5)
            .build()
            .unwrap()
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let coord = TileCoord::new(37, -123);
        write_tile(dir.path(), coord, 250);

        let grid = service(dir.path())
            .load_file(dir.path().join("N37W123.hgt"))
            .unwrap();

        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.start_lat_lon(), (37.0, -123.0));
        assert_eq!(grid.end_lat_lon(), (38.0, -122.0));
        assert_eq!(grid.get(0, 0), 250);
    }

    #[test]
    fn test_load_file_invalid_name() {
        let dir = TempDir::new().unwrap();
        let err = service(dir.path())
            .load_file(dir.path().join("heightmap.hgt"))
            .unwrap_err();
        assert!(matches!(err, StitchError::InvalidName { .. }), "{err}");
    }

    #[test]
    fn test_load_file_with_coords() {
        let dir = TempDir::new().unwrap();
        write_tile(dir.path(), TileCoord::new(37, -123), 7);
        // Same file, told it sits elsewhere.
        let grid = service(dir.path())
            .load_file_with_coords(dir.path().join("N37W123.hgt"), -34, 151)
            .unwrap();
        assert_eq!(grid.start_lat_lon(), (-34.0, 151.0));
        assert_eq!(grid.end_lat_lon(), (-33.0, 152.0));
    }

    #[test]
    fn test_load_region_all_local_fires_synchronously() {
        let dir = TempDir::new().unwrap();
        write_tile(dir.path(), TileCoord::new(37, -123), 11);
        write_tile(dir.path(), TileCoord::new(37, -122), 22);

        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_cb = Arc::clone(&calls);
        service(dir.path()).load_region(37.0, -123.0, 38.0, -121.0, move |result| {
            let grid = result.unwrap();
            assert_eq!(grid.width(), 8);
            assert_eq!(grid.height(), 4);
            assert_eq!(grid.get(0, 0), 11);
            assert_eq!(grid.get(7, 0), 22);
            calls_in_cb.fetch_add(1, Ordering::SeqCst);
        });

        // No fetches were needed, so the callback already ran.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_load_region_invalid_box() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_cb = Arc::clone(&calls);
        service(dir.path()).load_region(38.0, -123.0, 37.0, -122.0, move |result| {
            assert!(matches!(
                result.unwrap_err(),
                StitchError::InvalidRegion { .. }
            ));
            calls_in_cb.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_region_fetch_failure_fails_whole_request() {
        let dir = TempDir::new().unwrap();
        // Western tile local, eastern tile missing; the fetch will hit an
        // unroutable endpoint and fail.
        write_tile(dir.path(), TileCoord::new(37, -123), 11);

        let err = service(dir.path())
            .load_region_async(37.0, -123.0, 38.0, -121.0)
            .await
            .unwrap_err();
        assert!(matches!(err, StitchError::Fetch { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_load_region_async_all_local() {
        let dir = TempDir::new().unwrap();
        write_tile(dir.path(), TileCoord::new(0, 0), 5);

        let grid = service(dir.path())
            .load_region_async(0.0, 0.0, 1.0, 1.0)
            .await
            .unwrap();
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.get(2, 2), 5);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_are_independent() {
        let dir = TempDir::new().unwrap();
        write_tile(dir.path(), TileCoord::new(37, -123), 1);
        write_tile(dir.path(), TileCoord::new(40, -100), 2);

        let service = service(dir.path());
        let a = service.load_region_async(37.0, -123.0, 38.0, -122.0);
        let b = service.load_region_async(40.0, -100.0, 41.0, -99.0);
        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.unwrap().get(0, 0), 1);
        assert_eq!(b.unwrap().get(0, 0), 2);
    }

    #[test]
    fn test_pending_load_success_path() {
        let region = Region::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let fired = Arc::new(AtomicU32::new(0));
        let fired_in_cb = Arc::clone(&fired);
        let pending = PendingLoad::new(
            region,
            3,
            Box::new(move |result| {
                assert!(result.is_ok());
                fired_in_cb.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let finish =
            || Ok(RegionGrid::new(vec![0i16; 16], 4, 4, region));

        pending.settle(Ok(()), finish);
        pending.settle(Ok(()), finish);
        assert_eq!(fired.load(Ordering::SeqCst), 0, "callback fired early");
        pending.settle(Ok(()), finish);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pending_load_failure_skips_assembly() {
        let region = Region::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let fired = Arc::new(AtomicU32::new(0));
        let fired_in_cb = Arc::clone(&fired);
        let pending = PendingLoad::new(
            region,
            3,
            Box::new(move |result| {
                // The first recorded failure is the one delivered.
                assert!(matches!(
                    result.unwrap_err(),
                    StitchError::Fetch { tile, .. } if tile == TileCoord::new(0, 1)
                ));
                fired_in_cb.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let must_not_assemble = || -> Result<RegionGrid> {
            panic!("assembly must be skipped after a fetch failure");
        };

        pending.settle(Ok(()), must_not_assemble);
        pending.settle(
            Err(StitchError::Fetch {
                tile: TileCoord::new(0, 1),
                reason: "HTTP status 404".to_string(),
            }),
            must_not_assemble,
        );
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        pending.settle(
            Err(StitchError::Fetch {
                tile: TileCoord::new(0, 2),
                reason: "HTTP status 404".to_string(),
            }),
            must_not_assemble,
        );
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_builder_from_env_requires_data_dir() {
        // Only assert the missing-variable error; setting process-global
        // env vars would race with other tests.
        if std::env::var("HGTSTITCH_DATA_DIR").is_err() {
            assert!(RegionServiceBuilder::from_env().is_err());
        }
    }
}
