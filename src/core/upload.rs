use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::backend_client::BackendClient;
use super::errors::CoreError;
use super::inflight::RequestSequence;
use super::models::{ResumeSnapshot, UploadedFile};

pub const NO_FILE_MESSAGE: &str = "Please select a file before uploading.";
pub const NO_TEXT_MESSAGE: &str = "No text was extracted from the resume. Try a different file.";
pub const NO_RESUME_TEXT_MESSAGE: &str = "No resume text available to summarize.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadState {
    pub file: Option<UploadedFile>,
    pub resume_text: String,
    pub resume_id: Option<String>,
    pub summary: Option<String>,
    pub error: Option<String>,
}

/// Owns the selected file, the extracted resume text and its summary.
///
/// Every action starts from a neutral state: uploading clears text, summary and error;
/// summarizing clears the previous summary and error. Only the latest request of each
/// kind may write its outcome back.
pub struct UploadController {
    backend: Arc<BackendClient>,
    state: RwLock<UploadState>,
    uploads: RequestSequence,
    summaries: RequestSequence,
}

impl UploadController {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self {
            backend,
            state: RwLock::new(UploadState::default()),
            uploads: RequestSequence::new(),
            summaries: RequestSequence::new(),
        }
    }

    pub async fn select_file(&self, file: UploadedFile) {
        debug!(file_name = %file.file_name, "resume file selected");
        let mut state = self.state.write().await;
        state.file = Some(file);
    }

    pub async fn upload(&self) -> Result<ResumeSnapshot, CoreError> {
        let ticket = self.uploads.issue();
        let file = {
            let mut state = self.state.write().await;
            state.error = None;
            state.resume_text.clear();
            state.resume_id = None;
            state.summary = None;
            state.file.clone()
        };

        let Some(file) = file else {
            return Err(self.record_error(CoreError::validation(NO_FILE_MESSAGE)).await);
        };

        let outcome = self
            .backend
            .extract_resume(&file)
            .await
            .and_then(|extracted| match extracted.text {
                Some(text) if !text.trim().is_empty() => Ok(ResumeSnapshot {
                    text,
                    resume_id: extracted.resume_id,
                }),
                _ => Err(CoreError::Extraction(NO_TEXT_MESSAGE.to_string())),
            });

        if !self.uploads.is_latest(ticket) {
            debug!(file_name = %file.file_name, "discarding superseded upload response");
            return outcome;
        }

        match outcome {
            Ok(resume) => {
                info!(
                    file_name = %file.file_name,
                    chars = resume.text.chars().count(),
                    "resume text extracted"
                );
                let mut state = self.state.write().await;
                state.resume_text = resume.text.clone();
                state.resume_id = resume.resume_id.clone();
                state.summary = None;
                state.error = None;
                Ok(resume)
            }
            Err(err) => Err(self.record_error(err).await),
        }
    }

    pub async fn generate_summary(&self) -> Result<String, CoreError> {
        let ticket = self.summaries.issue();
        let resume_text = {
            let mut state = self.state.write().await;
            state.error = None;
            state.summary = None;
            state.resume_text.clone()
        };

        if resume_text.trim().is_empty() {
            return Err(self
                .record_error(CoreError::validation(NO_RESUME_TEXT_MESSAGE))
                .await);
        }

        let outcome = self.backend.summarize(&resume_text).await;
        if !self.summaries.is_latest(ticket) {
            debug!("discarding superseded summary response");
            return outcome;
        }

        match outcome {
            Ok(summary) => {
                let mut state = self.state.write().await;
                if state.resume_text != resume_text {
                    debug!("resume text changed while summarizing, dropping summary");
                    return Ok(summary);
                }
                state.summary = Some(summary.clone());
                Ok(summary)
            }
            Err(err) => Err(self.record_error(err).await),
        }
    }

    /// Résumé text handed to the matcher, copied out of the controller.
    pub async fn resume(&self) -> ResumeSnapshot {
        let state = self.state.read().await;
        ResumeSnapshot {
            text: state.resume_text.clone(),
            resume_id: state.resume_id.clone(),
        }
    }

    pub async fn snapshot(&self) -> UploadState {
        self.state.read().await.clone()
    }

    pub async fn reset(&self) {
        self.uploads.issue();
        self.summaries.issue();
        *self.state.write().await = UploadState::default();
    }

    async fn record_error(&self, err: CoreError) -> CoreError {
        match &err {
            CoreError::Validation(_) | CoreError::Extraction(_) => warn!("{err}"),
            _ => error!("{err}"),
        }

        let mut state = self.state.write().await;
        state.error = Some(err.user_message());
        err
    }
}
