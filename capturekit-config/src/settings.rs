//! Capture settings loaded with figment
//!
//! Sources are merged in precedence order (later sources override earlier ones):
//! 1. Built-in defaults
//! 2. Global settings file (`~/.capturekit/settings.*`)
//! 3. Project settings file (`<root>/.capturekit/settings.*`)
//! 4. `CAPTUREKIT_*` environment variables
//! 5. Command line overrides

use crate::{
    discovery::{SettingsDiscovery, SettingsFile, SettingsFormat},
    ConfigResult,
};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, trace};

/// Environment variable prefix for settings
pub const ENV_PREFIX: &str = "CAPTUREKIT_";

pub const DEFAULT_CONFIG_PATH: &str = "capture/config.json";
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";
pub const DEFAULT_TIME_FORMAT: &str = "HH:mm:ss";
pub const DEFAULT_SEPARATOR: &str = "-";
pub const DEFAULT_MAX_RESOLUTION_STEPS: usize = 256;

/// Options surface of a capture session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Capture document, relative to the storage root; may contain `var(...)`
    pub config_path: String,
    /// Moment-style pattern for the `date` stamp
    pub date_format: String,
    /// Moment-style pattern for the `time` stamp
    pub time_format: String,
    /// Separator for the exported `writeableLine`
    pub exported_separator: String,
    pub sort_ascending: bool,
    /// Load the configuration and seed variables, then stop
    pub skip_capture: bool,
    pub debug: bool,
    /// Abort a required yes/no field that gets no boolean answer
    pub strict_yes_no: bool,
    /// Substitutions allowed per resolution before giving up
    pub max_resolution_steps: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            config_path: DEFAULT_CONFIG_PATH.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            exported_separator: DEFAULT_SEPARATOR.to_string(),
            sort_ascending: true,
            skip_capture: false,
            debug: false,
            strict_yes_no: false,
            max_resolution_steps: DEFAULT_MAX_RESOLUTION_STEPS,
        }
    }
}

/// Command line overrides. Unset fields leave lower layers untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported_separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_ascending: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_capture: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_yes_no: Option<bool>,
}

/// Loads [`CaptureSettings`] from every layer. Nothing is cached, so edits
/// to settings files are picked up on the next load.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    discovery: SettingsDiscovery,
    env_prefix: String,
}

impl SettingsLoader {
    /// Loader for a capture root
    pub fn for_root(root: impl AsRef<Path>) -> Self {
        Self::with_discovery(SettingsDiscovery::for_root(root))
    }

    pub fn with_discovery(discovery: SettingsDiscovery) -> Self {
        Self {
            discovery,
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Use another environment prefix
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Merge every layer and extract the settings
    pub fn load(&self, overrides: &SettingsOverrides) -> ConfigResult<CaptureSettings> {
        let settings: CaptureSettings = self.build_figment(overrides).extract()?;
        debug!(
            config_path = %settings.config_path,
            debug = settings.debug,
            "Loaded capture settings"
        );
        Ok(settings)
    }

    fn build_figment(&self, overrides: &SettingsOverrides) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(CaptureSettings::default()));

        for file in self.discovery.discover_all() {
            trace!("Merging settings file {}", file.path.display());
            figment = figment.merge(file_provider(&file));
        }

        figment
            .merge(Env::prefixed(&self.env_prefix).map(|key| key.as_str().to_lowercase().into()))
            .merge(Serialized::defaults(overrides))
    }
}

fn file_provider(file: &SettingsFile) -> Figment {
    match file.format {
        SettingsFormat::Toml => Figment::from(Toml::file(&file.path)),
        SettingsFormat::Yaml => Figment::from(Yaml::file(&file.path)),
        SettingsFormat::Json => Figment::from(Json::file(&file.path)),
    }
}
