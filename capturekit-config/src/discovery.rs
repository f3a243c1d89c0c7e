//! Settings file discovery
//!
//! Settings live in a `.capturekit/` directory, either in the user's home
//! directory (global) or under the capture root (project). Each directory may
//! hold one `settings.{toml,yaml,yml,json}` file per format.

use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Directory name searched in the home directory and in the capture root
pub const SETTINGS_DIR: &str = ".capturekit";

const FILE_NAMES: [&str; 4] = [
    "settings.toml",
    "settings.yaml",
    "settings.yml",
    "settings.json",
];

/// A discovered settings file
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsFile {
    pub path: PathBuf,
    pub format: SettingsFormat,
    pub scope: SettingsScope,
    /// Higher values take precedence when merged
    pub priority: u8,
}

impl SettingsFile {
    pub fn new(path: PathBuf, format: SettingsFormat, scope: SettingsScope) -> Self {
        let priority = scope.priority();
        Self {
            path,
            format,
            scope,
            priority,
        }
    }
}

/// Settings file format detected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    Toml,
    Yaml,
    Json,
}

impl SettingsFormat {
    /// Detect format from a file extension, case-insensitively
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Where a settings file was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsScope {
    /// `~/.capturekit/`
    Global,
    /// `<root>/.capturekit/`
    Project,
}

impl SettingsScope {
    pub fn priority(self) -> u8 {
        match self {
            Self::Global => 10,
            Self::Project => 20,
        }
    }
}

/// Finds settings files in the global and project directories
#[derive(Debug, Clone, Default)]
pub struct SettingsDiscovery {
    global_dir: Option<PathBuf>,
    project_dir: Option<PathBuf>,
}

impl SettingsDiscovery {
    /// Discovery for a capture root, using the home directory for globals
    pub fn for_root(root: impl AsRef<Path>) -> Self {
        Self {
            global_dir: dirs::home_dir().map(|home| home.join(SETTINGS_DIR)),
            project_dir: Some(root.as_ref().join(SETTINGS_DIR)),
        }
    }

    /// Discovery over explicit directories (either may be absent)
    pub fn with_directories(global_dir: Option<PathBuf>, project_dir: Option<PathBuf>) -> Self {
        Self {
            global_dir,
            project_dir,
        }
    }

    /// All settings files, lowest priority first so later ones override
    /// when merged
    pub fn discover_all(&self) -> Vec<SettingsFile> {
        let mut files = Vec::new();

        if let Some(dir) = &self.global_dir {
            files.extend(search_directory(dir, SettingsScope::Global));
        }
        if let Some(dir) = &self.project_dir {
            files.extend(search_directory(dir, SettingsScope::Project));
        }

        files.sort_by_key(|f| f.priority);

        debug!("Discovered {} settings files", files.len());
        for file in &files {
            trace!("Found settings: {} ({:?})", file.path.display(), file.format);
        }
        files
    }
}

fn search_directory(dir: &Path, scope: SettingsScope) -> Vec<SettingsFile> {
    if !dir.exists() {
        trace!("Settings directory does not exist: {}", dir.display());
        return Vec::new();
    }
    if !dir.is_dir() {
        warn!("Path exists but is not a directory: {}", dir.display());
        return Vec::new();
    }

    FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .filter(|candidate| candidate.is_file())
        .filter_map(|candidate| classify(candidate, scope))
        .collect()
}

fn classify(path: PathBuf, scope: SettingsScope) -> Option<SettingsFile> {
    let format = SettingsFormat::from_extension(path.extension()?.to_str()?)?;
    Some(SettingsFile::new(path, format, scope))
}
