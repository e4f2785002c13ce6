//! Image resolution for the preview
//!
//! Every image in a freshly rendered preview starts out [`ImageState::Pending`].
//! The [`ImageResolver`] walks the configured [`RetryPolicy`] (a direct load,
//! then an anonymous full fetch whose body must look like an image) and
//! settles each one on `Loaded` or `Fallback`. Resolution never fails: every
//! error, timeout or task panic ends in `Fallback`.

use crate::config::{ImageConfig, LoadMode};
use crate::error::{ImageError, ImageResult};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Boxed future returned by [`ImageFetcher`] implementations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Load state of one preview image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageState {
    #[default]
    Pending,
    Loaded,
    /// Replaced by a placeholder; final for the render cycle
    Fallback,
}

impl ImageState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, ImageState::Pending)
    }
}

/// An image of the current render cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    pub src: String,
    pub alt: String,
    pub state: ImageState,
}

impl ImageSlot {
    pub fn pending(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: alt.into(),
            state: ImageState::Pending,
        }
    }
}

/// Ordered load attempts and the time allowed for each
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub modes: Vec<LoadMode>,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ImageConfig) -> Self {
        Self {
            modes: config.retry_modes.clone(),
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ImageConfig::default())
    }
}

/// An image reference plus the directory relative paths resolve against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub src: String,
    pub base_dir: Option<PathBuf>,
}

impl ImageRequest {
    pub fn new(src: impl Into<String>, base_dir: Option<PathBuf>) -> Self {
        Self {
            src: src.into(),
            base_dir,
        }
    }
}

/// A single load attempt for an image reference
pub trait ImageFetcher: Send + Sync {
    fn fetch<'a>(&'a self, request: &'a ImageRequest, mode: LoadMode) -> BoxFuture<'a, ImageResult<()>>;
}

/// Drives the per-image state machine
#[derive(Clone)]
pub struct ImageResolver {
    fetcher: Arc<dyn ImageFetcher>,
    policy: RetryPolicy,
}

impl ImageResolver {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, policy: RetryPolicy) -> Self {
        Self { fetcher, policy }
    }

    /// Resolve one image to `Loaded` or `Fallback`
    ///
    /// The attempts run on their own task so a panicking fetcher still
    /// settles the image.
    pub async fn resolve(&self, request: ImageRequest) -> ImageState {
        let fetcher = self.fetcher.clone();
        let policy = self.policy.clone();
        let src = request.src.clone();

        let attempts = tokio::spawn(async move { run_attempts(fetcher.as_ref(), &policy, &request).await });

        match attempts.await {
            Ok(state) => state,
            Err(e) => {
                log::warn!("Image task for {} aborted: {}", src, e);
                ImageState::Fallback
            }
        }
    }
}

impl std::fmt::Debug for ImageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResolver")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

async fn run_attempts(fetcher: &dyn ImageFetcher, policy: &RetryPolicy, request: &ImageRequest) -> ImageState {
    for &mode in &policy.modes {
        let attempt = tokio::time::timeout(policy.attempt_timeout, fetcher.fetch(request, mode)).await;
        match attempt {
            Ok(Ok(())) => {
                log::debug!("Image {} loaded ({:?})", request.src, mode);
                return ImageState::Loaded;
            }
            Ok(Err(e)) => log::debug!("Image {} failed ({:?}): {}", request.src, mode, e),
            Err(_) => log::debug!(
                "Image {} failed ({:?}): {}",
                request.src,
                mode,
                ImageError::Timeout(policy.attempt_timeout.as_millis() as u64)
            ),
        }
    }

    log::warn!("Image not available: {}", request.src);
    ImageState::Fallback
}

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Svg,
    Bmp,
    Ico,
}

impl ImageFormat {
    /// MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Svg => "image/svg+xml",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Ico => "image/x-icon",
        }
    }

    /// Detect format from magic bytes
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageFormat::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::Webp);
        }

        if data.starts_with(b"BM") && data.len() >= 14 {
            return Some(ImageFormat::Bmp);
        }

        if data.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
            return Some(ImageFormat::Ico);
        }

        let head = String::from_utf8_lossy(&data[..data.len().min(512)]);
        if head.contains("<svg") {
            return Some(ImageFormat::Svg);
        }

        None
    }

    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "webp" => Some(ImageFormat::Webp),
            "svg" => Some(ImageFormat::Svg),
            "bmp" => Some(ImageFormat::Bmp),
            "ico" => Some(ImageFormat::Ico),
            _ => None,
        }
    }

    fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Where an image reference points
#[derive(Debug, Clone, PartialEq, Eq)]
enum ImageSource {
    Remote(Url),
    Local(PathBuf),
    /// `data:` URL with its media type
    Inline(String),
}

fn classify(request: &ImageRequest) -> ImageResult<ImageSource> {
    let src = request.src.trim();
    if src.is_empty() {
        return Err(ImageError::InvalidReference("empty source".to_string()));
    }

    match Url::parse(src) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(ImageSource::Remote(url)),
            "file" => url
                .to_file_path()
                .map(ImageSource::Local)
                .map_err(|_| ImageError::InvalidReference(src.to_string())),
            "data" => {
                let media_type = url.path().split([';', ',']).next().unwrap_or_default();
                Ok(ImageSource::Inline(media_type.to_lowercase()))
            }
            other => Err(ImageError::InvalidReference(format!("unsupported scheme '{}'", other))),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let relative = src.split(['?', '#']).next().unwrap_or(src);
            let path = match &request.base_dir {
                Some(base) => base.join(relative),
                None => PathBuf::from(relative),
            };
            Ok(ImageSource::Local(path))
        }
        Err(e) => Err(ImageError::InvalidReference(format!("{}: {}", src, e))),
    }
}

/// Network and filesystem backed fetcher
///
/// `Direct` checks that the reference exists (HEAD request, or a file with an
/// image extension). `CrossOrigin` fetches the whole body and sniffs it.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> ImageResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mdpress/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ImageError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    async fn fetch_remote(&self, url: Url, mode: LoadMode) -> ImageResult<()> {
        let request = match mode {
            LoadMode::Direct => self.client.head(url),
            LoadMode::CrossOrigin => self.client.get(url),
        };
        let response = request
            .send()
            .await
            .map_err(|e| ImageError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Status(status.as_u16()));
        }
        if mode == LoadMode::Direct {
            return Ok(());
        }

        let declared_image = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_start().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false);
        if declared_image {
            return Ok(());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ImageError::Network(e.to_string()))?;
        sniff(&body)
    }

    async fn fetch_local(path: PathBuf, mode: LoadMode) -> ImageResult<()> {
        match mode {
            LoadMode::Direct => {
                let metadata = tokio::fs::metadata(&path).await?;
                if !metadata.is_file() {
                    return Err(ImageError::InvalidReference(path.display().to_string()));
                }
                ImageFormat::from_path(&path)
                    .map(|_| ())
                    .ok_or(ImageError::InvalidFormat)
            }
            LoadMode::CrossOrigin => {
                let data = tokio::fs::read(&path).await?;
                sniff(&data)
            }
        }
    }
}

fn sniff(data: &[u8]) -> ImageResult<()> {
    let format = ImageFormat::from_bytes(data).ok_or(ImageError::InvalidFormat)?;
    log::debug!("Content sniffed as {}", format.mime_type());
    Ok(())
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch<'a>(&'a self, request: &'a ImageRequest, mode: LoadMode) -> BoxFuture<'a, ImageResult<()>> {
        Box::pin(async move {
            match classify(request)? {
                ImageSource::Remote(url) => self.fetch_remote(url, mode).await,
                ImageSource::Local(path) => Self::fetch_local(path, mode).await,
                ImageSource::Inline(media_type) if media_type.starts_with("image/") => Ok(()),
                ImageSource::Inline(_) => Err(ImageError::InvalidFormat),
            }
        })
    }
}
