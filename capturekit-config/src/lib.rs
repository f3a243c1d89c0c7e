//! CaptureKit configuration
//!
//! Two kinds of configuration feed a capture session:
//!
//! - The **capture document** ([`CaptureConfig`]): a JSON file of variables and
//!   categories, read from the storage root and edited by the user.
//! - The **settings** ([`CaptureSettings`]): options such as the document
//!   path and date patterns, layered with figment from defaults, settings
//!   files, `CAPTUREKIT_*` environment variables and command line overrides.
//!
//! ```no_run
//! use capturekit_config::{SettingsLoader, SettingsOverrides};
//!
//! let settings = SettingsLoader::for_root(".").load(&SettingsOverrides::default())?;
//! println!("capture document: {}", settings.config_path);
//! # Ok::<(), capturekit_config::ConfigError>(())
//! ```

pub mod discovery;
pub mod error;
pub mod sample;
pub mod settings;
pub mod sort;
pub mod types;

pub use discovery::{SettingsDiscovery, SettingsFile, SettingsFormat, SettingsScope, SETTINGS_DIR};
pub use error::{ConfigError, ConfigResult};
pub use sample::{sample_config_text, sample_config_value};
pub use settings::{CaptureSettings, SettingsLoader, SettingsOverrides, ENV_PREFIX};
pub use sort::{backup_path, sort_categories, take_sort_request, SORT_VARIABLE};
pub use types::{CaptureConfig, Category, Field, Flag, FormatOptions, FormatSpec, NoteTarget};
