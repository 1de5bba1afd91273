use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use super::models::RuntimeSettings;

pub const BACKEND_URL_ENV: &str = "RESUME_SCREENER_BACKEND_URL";
pub const TIMEOUT_ENV: &str = "RESUME_SCREENER_TIMEOUT_SECONDS";

pub struct SettingsStore {
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::new_with_path(settings_path())
    }

    pub fn new_with_path(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub async fn load(&self) -> anyhow::Result<RuntimeSettings> {
        if !tokio::fs::try_exists(&self.file_path)
            .await
            .unwrap_or(false)
        {
            debug!(path = %self.file_path.display(), "no settings file, using defaults");
            return Ok(RuntimeSettings::default());
        }

        let content = tokio::fs::read_to_string(&self.file_path)
            .await
            .with_context(|| {
                format!("failed to read settings file {}", self.file_path.display())
            })?;

        let parsed = serde_json::from_str::<RuntimeSettings>(&content).with_context(|| {
            format!("invalid JSON in settings file {}", self.file_path.display())
        })?;

        Ok(parsed.sanitized())
    }

    pub async fn save(&self, settings: &RuntimeSettings) -> anyhow::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(settings)?;
        tokio::fs::write(&self.file_path, json)
            .await
            .with_context(|| {
                format!("failed to write settings file {}", self.file_path.display())
            })?;
        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies `RESUME_SCREENER_*` overrides on top of persisted settings.
pub fn apply_env_overrides(settings: RuntimeSettings) -> anyhow::Result<RuntimeSettings> {
    apply_overrides(
        settings,
        std::env::var(BACKEND_URL_ENV).ok(),
        std::env::var(TIMEOUT_ENV).ok(),
    )
}

fn apply_overrides(
    mut settings: RuntimeSettings,
    backend_url: Option<String>,
    timeout_seconds: Option<String>,
) -> anyhow::Result<RuntimeSettings> {
    if let Some(url) = backend_url.filter(|v| !v.trim().is_empty()) {
        settings.backend_base_url = url;
    }

    if let Some(raw) = timeout_seconds.filter(|v| !v.trim().is_empty()) {
        settings.request_timeout_seconds = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds"))?;
    }

    Ok(settings.sanitized())
}

fn settings_path() -> PathBuf {
    app_data_root().join("screener-settings.json")
}

pub fn app_data_root() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(local_app_data) = std::env::var("LOCALAPPDATA") {
            return PathBuf::from(local_app_data).join("ResumeScreener");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = dirs::home_dir() {
            return home
                .join("Library")
                .join("Application Support")
                .join("ResumeScreener");
        }
    }

    if let Some(path) = dirs::data_local_dir() {
        return path.join("ResumeScreener");
    }

    PathBuf::from(".").join("ResumeScreener")
}
