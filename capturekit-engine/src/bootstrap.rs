//! Loading the capture document from storage
//!
//! The document lives at the (variable-resolved) `config_path` setting. A
//! missing document is created empty; an empty or non-object document offers
//! to write the sample configuration instead of capturing. A document that
//! sets `variables.sortCategories` to `true` is backed up, sorted and
//! rewritten before use.

use crate::{
    paths::{ensure_folder, normalize, PathMode},
    prompt::PromptProvider,
    resolver::Resolver,
    storage::{FileHandle, Storage},
    CaptureError,
};
use capturekit_config::{
    backup_path, sample_config_text, sort_categories, take_sort_request, CaptureConfig,
    CaptureSettings, ConfigError,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Result of [`load_config`]
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded { config: CaptureConfig, path: String },
    /// No usable document; the sample was written at `path`
    SampleCreated { path: String },
    /// No usable document and the sample was declined
    NotConfigured { path: String },
}

/// What a sort did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortReport {
    pub path: String,
    pub backup: String,
    pub categories: usize,
}

/// Resolve and normalize the `config_path` setting
pub fn config_path(settings: &CaptureSettings, resolver: &Resolver) -> Result<String, CaptureError> {
    let resolved = resolver.resolve(&settings.config_path)?;
    normalize(&resolved, PathMode::File).ok_or_else(|| {
        error!(path = %settings.config_path, "Invalid path for configuration");
        ConfigError::invalid_path("configuration", resolved).into()
    })
}

/// Read and parse an existing document. Missing files and documents that
/// are not JSON objects are [`ConfigError::NotConfigured`].
pub async fn read_config(storage: &dyn Storage, path: &str) -> Result<CaptureConfig, CaptureError> {
    let not_configured = || ConfigError::NotConfigured {
        path: path.to_string(),
    };
    let file = storage.exists(path).await?.ok_or_else(not_configured)?;
    let content = storage.read(&file).await?;
    let config = CaptureConfig::parse(&content)?.ok_or_else(not_configured)?;
    Ok(config)
}

/// Write the sample configuration. A document with content is only replaced
/// when `force` is set. Returns whether the sample was written.
pub async fn write_sample(
    storage: &dyn Storage,
    path: &str,
    force: bool,
) -> Result<bool, CaptureError> {
    let sample = sample_config_text()?;
    match storage.exists(path).await? {
        Some(file) => {
            let content = storage.read(&file).await?;
            if !content.trim().is_empty() && !force {
                warn!(path, "Configuration already exists; not replacing it");
                return Ok(false);
            }
            storage.write(&file, &sample).await?;
        }
        None => {
            ensure_folder(storage, path).await?;
            storage.create(path, &sample).await?;
        }
    }
    info!(path, "Created sample configuration file");
    Ok(true)
}

/// Locate, read and prepare the capture document for a session
pub async fn load_config(
    settings: &CaptureSettings,
    resolver: &Resolver,
    storage: &dyn Storage,
    prompts: &dyn PromptProvider,
) -> Result<LoadOutcome, CaptureError> {
    info!(path = %settings.config_path, "Reading configuration file");
    let path = config_path(settings, resolver)?;

    let file = match storage.exists(&path).await? {
        Some(file) => file,
        None => {
            warn!(path = %path, "No config file found");
            debug!(path = %path, "Creating config file");
            ensure_folder(storage, &path).await?;
            let file = storage.create(&path, "").await?;
            debug!(path = %path, "Created empty config file");
            file
        }
    };

    let content = storage.read(&file).await?;
    let Some(mut config) = CaptureConfig::parse(&content)? else {
        let body = format!("Create sample file at \"{path}\"?");
        if prompts.yes_no("No configuration file found!", &body).await == Some(true) {
            storage.write(&file, &sample_config_text()?).await?;
            info!(path = %path, "Created sample configuration file");
            return Ok(LoadOutcome::SampleCreated { path });
        }
        return Ok(LoadOutcome::NotConfigured { path });
    };

    if take_sort_request(&mut config) {
        info!("Found \"sortCategories\" set to \"true\" in config; sorting");
        sort_with_backup(storage, &file, &mut config, settings.sort_ascending).await?;
    }

    Ok(LoadOutcome::Loaded { config, path })
}

/// Back up, sort and rewrite the document at `path`
pub async fn sort_config(
    storage: &dyn Storage,
    path: &str,
    ascending: bool,
) -> Result<SortReport, CaptureError> {
    let file = storage
        .exists(path)
        .await?
        .ok_or_else(|| ConfigError::NotConfigured {
            path: path.to_string(),
        })?;
    let mut config = read_config(storage, path).await?;
    take_sort_request(&mut config);
    sort_with_backup(storage, &file, &mut config, ascending).await
}

async fn sort_with_backup(
    storage: &dyn Storage,
    file: &FileHandle,
    config: &mut CaptureConfig,
    ascending: bool,
) -> Result<SortReport, CaptureError> {
    if config.categories.is_none() {
        error!("Missing categories section in config");
        return Err(ConfigError::MissingCategories.into());
    }

    let path = file.path().to_string();
    let backup = backup_path(&path)?;
    let snapshot = config.to_pretty_json()?;
    info!(path = %backup, "Creating backup for config");
    match storage.exists(&backup).await? {
        Some(existing) => storage.write(&existing, &snapshot).await?,
        None => {
            storage.create(&backup, &snapshot).await?;
        }
    }

    let categories = sort_categories(config, ascending)?;
    storage.write(file, &config.to_pretty_json()?).await?;
    info!(path = %path, categories, ascending, "Sorted categories");

    Ok(SortReport {
        path,
        backup,
        categories,
    })
}
