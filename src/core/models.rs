use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const TEXT_MIME: &str = "text/plain";
pub const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// File chosen by the user, held until the next selection or a reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub media_type: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let media_type = media_type_for(&file_name).to_string();
        Self {
            file_name,
            media_type,
            content,
        }
    }

    pub async fn from_path(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = path.into();
        let content = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read resume file {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("resume")
            .to_string();

        Ok(Self::new(file_name, content))
    }
}

pub fn media_type_for(file_name: &str) -> &'static str {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|v| v.to_str())
        .map(|v| v.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => PDF_MIME,
        "docx" => DOCX_MIME,
        "txt" => TEXT_MIME,
        _ => OCTET_STREAM_MIME,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    pub description: String,
}

impl JobPosting {
    pub fn empty() -> Self {
        Self {
            id: JobId::new(),
            title: String::new(),
            description: String::new(),
        }
    }

    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobField {
    Title,
    Description,
}

/// Score and keywords returned by the backend for one job. The score is not recomputed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub title: String,
    pub score: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryRequest<'a> {
    pub resume: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchJobPayload<'a> {
    pub title: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchMultipleRequest<'a> {
    pub resume: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_id: Option<&'a str>,
    pub jobs: Vec<MatchJobPayload<'a>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResumeResponse {
    pub resume_text: Option<String>,
    #[serde(default)]
    pub resume_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryResponse {
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchMultipleResponse {
    pub results: Option<Vec<MatchResult>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub reachable: bool,
    pub status: Option<String>,
    pub tesseract_version: Option<String>,
    pub tesseract_error: Option<String>,
    /// Why the backend could not be reached.
    pub error: Option<String>,
}

/// Extracted resume as handed from the upload controller to the matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeSnapshot {
    pub text: String,
    pub resume_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    pub backend_base_url: String,
    pub request_timeout_seconds: u64,
    pub default_threshold: f64,
    pub export_dir: Option<PathBuf>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            backend_base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_seconds: 60,
            default_threshold: 0.0,
            export_dir: None,
        }
    }
}

impl RuntimeSettings {
    pub fn sanitized(mut self) -> Self {
        let trimmed = self.backend_base_url.trim().trim_end_matches('/');
        self.backend_base_url = if trimmed.is_empty() {
            RuntimeSettings::default().backend_base_url
        } else {
            trimmed.to_string()
        };
        self.request_timeout_seconds = self.request_timeout_seconds.max(1);
        if !self.default_threshold.is_finite() {
            self.default_threshold = 0.0;
        }
        self
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
