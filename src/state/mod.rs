//! State management module for mdpress
//!
//! This module contains all application state types organized by concern:
//! - `app_state`: Root application state container
//! - `editor_state`: Document text and selection
//! - `notifications`: Transient user-facing messages

mod app_state;
mod editor_state;
mod notifications;

pub use app_state::*;
pub use editor_state::*;
pub use notifications::*;
