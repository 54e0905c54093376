//! Fetching and decoding region sources off the compositor's task.

use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use teaser_common::error::{TeaserError, TeaserResult};

use crate::http::HttpTransport;
use crate::region::RegionId;

/// Retrieves the raw bytes behind a source reference.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &str) -> TeaserResult<Vec<u8>>;

    /// Fetcher name for logs.
    fn name(&self) -> &str;
}

/// Reads local paths and `file://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFetcher;

#[async_trait::async_trait]
impl SourceFetcher for FsFetcher {
    async fn fetch(&self, source: &str) -> TeaserResult<Vec<u8>> {
        let path = local_path(source)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| TeaserError::load(format!("{}: {e}", path.display())))
    }

    fn name(&self) -> &str {
        "fs"
    }
}

/// Dispatches on the source's scheme: `http://` and `https://` go over the
/// network, plain paths and `file://` URLs are read from disk.
#[derive(Debug, Clone)]
pub struct HostFetcher {
    http: HttpTransport,
}

impl HostFetcher {
    pub fn new(http: HttpTransport) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl SourceFetcher for HostFetcher {
    async fn fetch(&self, source: &str) -> TeaserResult<Vec<u8>> {
        match source_scheme(source).as_deref() {
            Some("http" | "https") => self.http.get(source).await,
            Some("file") | None => FsFetcher.fetch(source).await,
            Some(other) => Err(TeaserError::load(format!(
                "{source}: unsupported scheme {other:?}"
            ))),
        }
    }

    fn name(&self) -> &str {
        "host"
    }
}

/// URL scheme of `source`, or `None` for plain filesystem paths. Single
/// letter schemes are Windows drive letters.
fn source_scheme(source: &str) -> Option<String> {
    match Url::parse(source) {
        Ok(url) if url.scheme().len() > 1 => Some(url.scheme().to_string()),
        _ => None,
    }
}

fn local_path(source: &str) -> TeaserResult<PathBuf> {
    if source_scheme(source).as_deref() == Some("file") {
        let url = Url::parse(source).map_err(|e| TeaserError::load(format!("{source}: {e}")))?;
        return url
            .to_file_path()
            .map_err(|_| TeaserError::load(format!("{source}: not a local file URL")));
    }
    Ok(PathBuf::from(source))
}

/// Decode encoded image bytes to RGBA.
pub fn decode_image(bytes: &[u8]) -> TeaserResult<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| TeaserError::load(format!("decode failed: {e}")))
}

/// Result of one region load, queued back to the compositor.
#[derive(Debug)]
pub(crate) struct LoadCompletion {
    pub region: RegionId,
    pub generation: u64,
    pub result: Result<RgbaImage, String>,
}

async fn fetch_and_decode(fetcher: Arc<dyn SourceFetcher>, source: String) -> TeaserResult<RgbaImage> {
    let bytes = fetcher.fetch(&source).await?;
    tokio::task::spawn_blocking(move || decode_image(&bytes))
        .await
        .unwrap_or_else(|e| Err(TeaserError::load(format!("decode task failed: {e}"))))
}

/// Start loading `source` for `region` on the current tokio runtime.
///
/// Exactly one [`LoadCompletion`] is queued per call, even when the fetch
/// or decode panics.
pub(crate) fn spawn_load(
    fetcher: Arc<dyn SourceFetcher>,
    completions: UnboundedSender<LoadCompletion>,
    region: RegionId,
    generation: u64,
    source: String,
) -> TeaserResult<()> {
    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|e| TeaserError::load(format!("cannot load {source}: {e}")))?;

    let work = runtime.spawn(fetch_and_decode(Arc::clone(&fetcher), source.clone()));
    runtime.spawn(async move {
        let result = work
            .await
            .unwrap_or_else(|e| Err(TeaserError::load(format!("load task failed: {e}"))));

        match &result {
            Ok(image) => tracing::debug!(
                %region,
                generation,
                source = %source,
                fetcher = fetcher.name(),
                width = image.width(),
                height = image.height(),
                "Source loaded"
            ),
            Err(e) => tracing::warn!(%region, generation, source = %source, error = %e, "Source failed to load"),
        }

        // The compositor may have been dropped; nothing left to notify.
        let _ = completions.send(LoadCompletion {
            region,
            generation,
            result: result.map_err(|e| e.to_string()),
        });
    });
    Ok(())
}
