//! mdpress - Markdown editor core with live preview and PDF export
//!
//! The editor session lives in [`app::App`], a message-driven controller with
//! no UI of its own. A front end sends [`message::Message`]s for edits, toolbar
//! actions, file loads and export requests, pumps the app's channel, and reads
//! back [`state::AppState`] to draw the preview and notifications.
//!
//! The `mdpress` binary is one such front end.

pub mod app;
pub mod config;
pub mod editor;
pub mod error;
pub mod file_handler;
pub mod markdown;
pub mod message;
pub mod state;
pub mod utils;

pub use app::{App, Services};
pub use config::Config;
pub use error::{AppError, AppResult};
