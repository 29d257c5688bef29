//! # taskdeck-settings
//!
//! Configuration for the taskdeck client, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`TaskdeckSettings::default()`]
//! 2. **User file**: `~/.taskdeck/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `TASKDECK_*` overrides (highest priority)
//!
//! There is no global instance: the binary loads settings once and hands
//! the pieces to whatever needs them.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, load_with, settings_path};
pub use types::*;
