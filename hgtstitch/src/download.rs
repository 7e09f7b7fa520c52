//! Tile fetching: download, decompress, and persist missing tiles.
//!
//! Remote tiles are served gzip-compressed under a per-latitude directory,
//! e.g. `<base>/N37/N37W123.hgt.gz`. The default base URL points at the AWS
//! Open Data terrain tiles ("skadi") dataset, which follows exactly that
//! layout and requires no authentication.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use flate2::read::GzDecoder;
use tracing::{debug, info, warn};

use crate::error::{Result, StitchError};
use crate::filename::TileCoord;

/// Default remote dataset: AWS terrain tiles, skadi (SRTM-derived) layout.
pub const DEFAULT_BASE_URL: &str = "https://s3.amazonaws.com/elevation-tiles-prod/skadi";

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Minimum size of a well-formed gzip stream: 10-byte header plus the
/// 8-byte CRC32/ISIZE trailer.
const GZIP_MIN_LEN: usize = 18;

/// Configuration for fetching remote tiles.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base URL of the dataset; tiles resolve to
    /// `{base_url}/{lat_dir}/{name}.hgt.gz`.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl FetchConfig {
    /// Create a configuration for a custom dataset base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// The download URL for one tile.
    ///
    /// The latitude directory is the `N`/`S` token of the tile name, so
    /// `N37W123` resolves to `{base}/N37/N37W123.hgt.gz`.
    pub fn url_for(&self, coord: TileCoord) -> String {
        let name = coord.filename();
        format!(
            "{}/{}/{}.hgt.gz",
            self.base_url.trim_end_matches('/'),
            &name[..3],
            name
        )
    }
}

/// Downloads missing tiles into the local tile directory.
///
/// A tile already present locally is reused as-is; there is no freshness
/// or integrity policy beyond "the file exists". Failed fetches are not
/// retried — the owning request fails and the caller may re-submit.
pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
    data_dir: PathBuf,
}

impl Fetcher {
    /// Create a fetcher writing into `data_dir`.
    pub fn new<P: AsRef<Path>>(data_dir: P, config: FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StitchError::Io(std::io::Error::other(e)))?;

        Ok(Self {
            client,
            config,
            data_dir: data_dir.as_ref().to_path_buf(),
        })
    }

    /// The canonical local path for a tile.
    pub fn local_path(&self, coord: TileCoord) -> PathBuf {
        self.data_dir.join(coord.hgt_name())
    }

    /// Ensure a tile exists locally, downloading it if necessary.
    ///
    /// Resolves immediately when the file is already on disk. Otherwise
    /// issues a single GET, inflates the gzip payload, and persists it
    /// under the canonical path via a temp-file rename so that concurrent
    /// readers never observe a partially written tile.
    ///
    /// # Errors
    ///
    /// Any of a non-success HTTP status, transport failure, malformed gzip
    /// payload, or write failure is a [`StitchError::Fetch`]. No retries.
    pub async fn ensure_local(&self, coord: TileCoord) -> Result<PathBuf> {
        let path = self.local_path(coord);
        if path.exists() {
            debug!(tile = %coord, "tile already local");
            return Ok(path);
        }

        let fetch_err = |reason: String| StitchError::Fetch {
            tile: coord,
            reason,
        };

        let url = self.config.url_for(coord);
        info!(tile = %coord, %url, "downloading tile");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| fetch_err(format!("transport error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(tile = %coord, %status, "tile download rejected");
            return Err(fetch_err(format!("HTTP status {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_err(format!("failed to read body: {e}")))?;

        let raw = inflate_gzip(coord, &body)?;

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| fetch_err(format!("cannot create tile directory: {e}")))?;

        // Unique temp name per writer: two requests racing on the same
        // missing tile each publish an identical file via atomic rename.
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let tmp = self
            .data_dir
            .join(format!(".{}.{:x}.part", coord.filename(), nonce));

        tokio::fs::write(&tmp, &raw)
            .await
            .map_err(|e| fetch_err(format!("write failed: {e}")))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(fetch_err(format!("rename failed: {e}")));
        }

        info!(tile = %coord, bytes = raw.len(), "tile persisted");
        Ok(path)
    }
}

/// Inflate a gzip payload into a buffer pre-sized from the trailer.
///
/// The last 4 bytes of a gzip stream hold the uncompressed size as a
/// little-endian u32 (the ISIZE field); the output buffer is allocated to
/// exactly that size and the stream must fill it completely.
fn inflate_gzip(coord: TileCoord, bytes: &[u8]) -> Result<Vec<u8>> {
    let fetch_err = |reason: String| StitchError::Fetch {
        tile: coord,
        reason,
    };

    if bytes.len() < GZIP_MIN_LEN {
        return Err(fetch_err(format!(
            "gzip payload of {} bytes is too short",
            bytes.len()
        )));
    }

    let mut isize_field = [0u8; 4];
    isize_field.copy_from_slice(&bytes[bytes.len() - 4..]);
    let expected = u32::from_le_bytes(isize_field) as usize;

    let mut raw = vec![0u8; expected];
    let mut decoder = GzDecoder::new(bytes);
    decoder
        .read_exact(&mut raw)
        .map_err(|e| fetch_err(format!("gzip inflate failed: {e}")))?;

    // The stream must end exactly where the trailer said it would.
    let mut probe = [0u8; 1];
    match decoder.read(&mut probe) {
        Ok(0) => Ok(raw),
        Ok(_) => Err(fetch_err(
            "gzip stream longer than its size field".to_string(),
        )),
        Err(e) => Err(fetch_err(format!("gzip trailer check failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_url_for() {
        let config = FetchConfig::default();
        assert_eq!(
            config.url_for(TileCoord::new(37, -123)),
            format!("{DEFAULT_BASE_URL}/N37/N37W123.hgt.gz")
        );

        let config = FetchConfig::with_base_url("https://tiles.example.com/srtm/");
        assert_eq!(
            config.url_for(TileCoord::new(-12, -77)),
            "https://tiles.example.com/srtm/S12/S12W077.hgt.gz"
        );
    }

    #[test]
    fn test_inflate_roundtrip() {
        let coord = TileCoord::new(37, -123);
        let payload: Vec<u8> = (0..200u16).flat_map(|v| v.to_be_bytes()).collect();
        let inflated = inflate_gzip(coord, &gzip(&payload)).unwrap();
        assert_eq!(inflated, payload);
    }

    #[test]
    fn test_inflate_rejects_truncated() {
        let coord = TileCoord::new(37, -123);
        let err = inflate_gzip(coord, &[0x1f, 0x8b, 0x08]).unwrap_err();
        assert!(matches!(err, StitchError::Fetch { .. }), "{err}");

        // Valid header but the deflate stream is cut off.
        let mut compressed = gzip(&[7u8; 1024]);
        let trailer: Vec<u8> = compressed.split_off(compressed.len() - 8);
        compressed.truncate(compressed.len() / 2);
        compressed.extend_from_slice(&trailer);
        assert!(inflate_gzip(coord, &compressed).is_err());
    }

    #[test]
    fn test_inflate_rejects_not_gzip() {
        let coord = TileCoord::new(37, -123);
        assert!(inflate_gzip(coord, &[0u8; 64]).is_err());
    }

    #[tokio::test]
    async fn test_ensure_local_reuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let coord = TileCoord::new(37, -123);
        std::fs::write(dir.path().join(coord.hgt_name()), [0u8; 8]).unwrap();

        // Unroutable base URL: this must never be contacted.
        let fetcher = Fetcher::new(
            dir.path(),
            FetchConfig::with_base_url("http://invalid.invalid"),
        )
        .unwrap();

        let path = fetcher.ensure_local(coord).await.unwrap();
        assert_eq!(path, dir.path().join("N37W123.hgt"));
    }

    #[test]
    fn test_local_path() {
        let dir = TempDir::new().unwrap();
        let fetcher = Fetcher::new(dir.path(), FetchConfig::default()).unwrap();
        assert_eq!(
            fetcher.local_path(TileCoord::new(0, 0)),
            dir.path().join("N00E000.hgt")
        );
    }
}
