//! Configuration management for mdpress
//!
//! Handles loading, saving, and managing application configuration.
//! Configuration is persisted as JSON under the user's config directory.

use crate::error::{ConfigError, ConfigResult};
use crate::file_handler;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier used for the config directory
pub const APP_ID: &str = "mdpress";

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Quiet window before a preview render fires, in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// How long a notification stays visible, in milliseconds
pub const DEFAULT_NOTIFICATION_MS: u64 = 3000;

/// Per-attempt image load timeout, in milliseconds
pub const DEFAULT_IMAGE_TIMEOUT_MS: u64 = 10_000;

/// Largest document the preview will parse (in bytes) - 10MB
pub const MAX_RENDER_SIZE: usize = 10 * 1024 * 1024;

/// Placeholder shown when the document is blank
pub const EMPTY_PREVIEW_TEXT: &str = "Start typing Markdown to see the preview...";

/// Filename stem used when the document has no top-level heading
pub const DEFAULT_EXPORT_NAME: &str = "document";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preview rendering configuration
    pub preview: PreviewConfig,

    /// Image resolution configuration
    pub images: ImageConfig,

    /// PDF export configuration
    pub export: ExportConfig,

    /// Notification configuration
    pub notifications: NotificationConfig,
}

impl Config {
    /// Load configuration from the default location, or return defaults
    pub fn load() -> ConfigResult<Self> {
        let path = Self::config_dir()?.join(CONFIG_FILE_NAME);
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;
        let config: Config =
            serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;

        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveError(e.to_string()))?;
        file_handler::write_file_atomic_sync(path, json.as_bytes())
            .map_err(|e| ConfigError::SaveError(e.to_string()))
    }

    /// Get the configuration directory path
    pub fn config_dir() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_ID))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Reject values that would stall or break the pipeline
    pub fn validate(&self) -> ConfigResult<()> {
        if self.images.retry_modes.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "images.retry_modes".to_string(),
                reason: "at least one load mode is required".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.export.image_quality) {
            return Err(ConfigError::InvalidValue {
                key: "export.image_quality".to_string(),
                reason: "must be between 0 and 1".to_string(),
            });
        }
        if self.export.margins_mm.iter().any(|m| *m < 0.0 || !m.is_finite()) {
            return Err(ConfigError::InvalidValue {
                key: "export.margins_mm".to_string(),
                reason: "margins must be finite and non-negative".to_string(),
            });
        }
        Ok(())
    }
}

/// Preview rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Trailing debounce window for edits
    pub debounce_ms: u64,

    /// Text shown for a blank document
    pub empty_placeholder: String,

    /// Largest document the parser is handed
    pub max_document_bytes: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            empty_placeholder: EMPTY_PREVIEW_TEXT.to_string(),
            max_document_bytes: MAX_RENDER_SIZE,
        }
    }
}

/// How an image load is attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadMode {
    /// Plain load of the reference as written
    Direct,
    /// Anonymous fetch of the full body, checked for image content
    CrossOrigin,
}

/// Image resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Timeout for a single load attempt
    pub attempt_timeout_ms: u64,

    /// Ordered attempts before falling back to the placeholder
    pub retry_modes: Vec<LoadMode>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: DEFAULT_IMAGE_TIMEOUT_MS,
            retry_modes: vec![LoadMode::Direct, LoadMode::CrossOrigin],
        }
    }
}

/// Page format for exported documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
}

impl PageFormat {
    /// Page size in millimetres, portrait
    pub fn size_mm(&self) -> (f32, f32) {
        match self {
            PageFormat::A4 => (210.0, 297.0),
            PageFormat::Letter => (215.9, 279.4),
        }
    }
}

/// Page orientation for exported documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// PDF export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Margins in millimetres: top, right, bottom, left
    pub margins_mm: [f32; 4],

    /// Paper size
    pub page_format: PageFormat,

    /// Paper orientation
    pub orientation: Orientation,

    /// Image encoding name recorded in the export options
    pub image_type: String,

    /// Image quality target between 0 and 1
    pub image_quality: f32,

    /// Compress content streams
    pub compress: bool,

    /// Filename stem when no heading is present
    pub default_name: String,

    /// Directory exported files are written to
    pub output_dir: Option<PathBuf>,

    /// Elements that must not be split across pages
    pub avoid_break_selectors: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            margins_mm: [10.0, 10.0, 10.0, 10.0],
            page_format: PageFormat::A4,
            orientation: Orientation::Portrait,
            image_type: "jpeg".to_string(),
            image_quality: 0.98,
            compress: true,
            default_name: DEFAULT_EXPORT_NAME.to_string(),
            output_dir: None,
            avoid_break_selectors: ["h1", "h2", "h3", "h4", "h5", "h6", "li", "p", "pre", "blockquote", "tr"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// How long a notification stays before it is dismissed
    pub duration_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_NOTIFICATION_MS,
        }
    }
}
