use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use super::backend_client::BackendClient;
use super::errors::CoreError;
use super::export;
use super::matcher::JobMatcher;
use super::models::{HealthStatus, MatchResult, RuntimeSettings, UploadedFile};
use super::results_view::ResultsView;
use super::settings_store::{apply_env_overrides, SettingsStore};
use super::upload::UploadController;

/// One screening session: the upload controller feeding resume text into the job matcher.
pub struct ScreenerService {
    settings: RuntimeSettings,
    backend: Arc<BackendClient>,
    upload: UploadController,
    matcher: JobMatcher,
}

impl ScreenerService {
    pub fn new(settings: RuntimeSettings) -> Result<Self, CoreError> {
        let settings = settings.sanitized();
        let backend = Arc::new(BackendClient::from_settings(&settings)?);
        info!(backend = %backend.base_url(), "screener session ready");

        Ok(Self {
            upload: UploadController::new(Arc::clone(&backend)),
            matcher: JobMatcher::new(Arc::clone(&backend), settings.default_threshold),
            settings,
            backend,
        })
    }

    /// Loads persisted settings, applies environment overrides and an optional URL override.
    pub async fn from_store(
        store: &SettingsStore,
        backend_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let mut settings = apply_env_overrides(store.load().await?)?;
        if let Some(url) = backend_url {
            settings.backend_base_url = url;
        }

        Ok(Self::new(settings)?)
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn upload(&self) -> &UploadController {
        &self.upload
    }

    pub fn matcher(&self) -> &JobMatcher {
        &self.matcher
    }

    pub async fn select_file(&self, file: UploadedFile) {
        self.upload.select_file(file).await;
    }

    pub async fn upload_resume(&self) -> Result<String, CoreError> {
        self.upload.upload().await.map(|resume| resume.text)
    }

    pub async fn generate_summary(&self) -> Result<String, CoreError> {
        self.upload.generate_summary().await
    }

    /// Compares the current resume text (copied out of the upload controller) against every job.
    pub async fn compare_all(&self) -> Result<Vec<MatchResult>, CoreError> {
        let resume = self.upload.resume().await;
        self.matcher.compare_all(resume).await
    }

    pub async fn results_view(&self) -> ResultsView {
        self.matcher.snapshot().await.view()
    }

    pub async fn export_csv(&self) -> anyhow::Result<Option<PathBuf>> {
        let results = self.matcher.results().await;
        export::write_csv(&results, &self.settings.export_dir()).await
    }

    pub async fn export_xlsx(&self) -> anyhow::Result<Option<PathBuf>> {
        let results = self.matcher.results().await;
        export::write_xlsx(&results, &self.settings.export_dir()).await
    }

    pub async fn health(&self) -> HealthStatus {
        self.backend.health().await
    }

    pub async fn reset(&self) {
        self.upload.reset().await;
        self.matcher.reset().await;
    }
}
