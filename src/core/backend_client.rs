use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::errors::{BackendOperation, CoreError};
use super::models::{
    HealthStatus, MatchJobPayload, MatchMultipleRequest, MatchMultipleResponse, MatchResult,
    RuntimeSettings, SummaryRequest, SummaryResponse, UploadResumeResponse, UploadedFile,
};

const UPLOAD_PATH: &str = "upload_resume";
const SUMMARY_PATH: &str = "resume_summary";
const MATCH_MULTIPLE_PATH: &str = "match_multiple";
const PING_PATH: &str = "ping";
const TESSERACT_PATH: &str = "check_tesseract";
const RESUME_FIELD: &str = "resume";

#[derive(Debug, Deserialize)]
struct PingResponse {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TesseractResponse {
    tesseract_version: Option<String>,
    error: Option<String>,
}

/// Raw extraction outcome; deciding whether the text is usable is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedResume {
    pub text: Option<String>,
    pub resume_id: Option<String>,
}

pub struct BackendClient {
    client: Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(client: Client, base_url: &str) -> Result<Self, CoreError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(&format!("{trimmed}/"))
            .map_err(|err| CoreError::InvalidSettings(format!("backend url {trimmed:?}: {err}")))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(CoreError::InvalidSettings(format!(
                "backend url {trimmed:?} must use http or https"
            )));
        }

        Ok(Self { client, base_url })
    }

    pub fn from_settings(settings: &RuntimeSettings) -> Result<Self, CoreError> {
        let client = Client::builder()
            .user_agent(concat!("ResumeScreener/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.request_timeout_seconds.max(1)))
            .build()
            .map_err(|err| CoreError::InvalidSettings(format!("failed to build HTTP client: {err}")))?;

        Self::new(client, &settings.backend_base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn extract_resume(&self, file: &UploadedFile) -> Result<ExtractedResume, CoreError> {
        let operation = BackendOperation::Extract;
        let part = Part::bytes(file.content.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.media_type)
            .map_err(|err| CoreError::backend(operation, err))?;
        let form = Form::new().part(RESUME_FIELD, part);

        debug!(
            file_name = %file.file_name,
            media_type = %file.media_type,
            bytes = file.content.len(),
            "uploading resume"
        );

        let response = self
            .client
            .post(self.endpoint(UPLOAD_PATH, operation)?)
            .multipart(form)
            .send()
            .await
            .map_err(|err| transport_error(operation, err))?;

        let payload: UploadResumeResponse = read_json(operation, response).await?;
        Ok(ExtractedResume {
            text: payload.resume_text,
            resume_id: payload.resume_id,
        })
    }

    pub async fn summarize(&self, resume_text: &str) -> Result<String, CoreError> {
        let operation = BackendOperation::Summarize;
        let response = self
            .client
            .post(self.endpoint(SUMMARY_PATH, operation)?)
            .json(&SummaryRequest {
                resume: resume_text,
            })
            .send()
            .await
            .map_err(|err| transport_error(operation, err))?;

        let payload: SummaryResponse = read_json(operation, response).await?;
        payload
            .summary
            .ok_or_else(|| CoreError::backend(operation, "response missing summary"))
    }

    pub async fn match_multiple(
        &self,
        resume_text: &str,
        resume_id: Option<&str>,
        jobs: &[MatchJobPayload<'_>],
    ) -> Result<Vec<MatchResult>, CoreError> {
        let operation = BackendOperation::Compare;
        let request = MatchMultipleRequest {
            resume: resume_text,
            resume_id,
            jobs: jobs.to_vec(),
        };

        debug!(jobs = jobs.len(), "submitting jobs for comparison");

        let response = self
            .client
            .post(self.endpoint(MATCH_MULTIPLE_PATH, operation)?)
            .json(&request)
            .send()
            .await
            .map_err(|err| transport_error(operation, err))?;

        let payload: MatchMultipleResponse = read_json(operation, response).await?;
        payload
            .results
            .ok_or_else(|| CoreError::backend(operation, "no results returned"))
    }

    pub async fn ping(&self) -> Result<Option<String>, CoreError> {
        let operation = BackendOperation::Health;
        let response = self
            .client
            .get(self.endpoint(PING_PATH, operation)?)
            .send()
            .await
            .map_err(|err| transport_error(operation, err))?;

        let payload: PingResponse = read_json(operation, response).await?;
        Ok(payload.status)
    }

    pub async fn check_tesseract(&self) -> Result<Result<String, String>, CoreError> {
        let operation = BackendOperation::Health;
        let response = self
            .client
            .get(self.endpoint(TESSERACT_PATH, operation)?)
            .send()
            .await
            .map_err(|err| transport_error(operation, err))?;

        let payload: TesseractResponse = read_json(operation, response).await?;
        match (payload.tesseract_version, payload.error) {
            (Some(version), _) => Ok(Ok(version)),
            (None, Some(error)) => Ok(Err(error)),
            (None, None) => Err(CoreError::backend(
                operation,
                "response missing tesseract_version",
            )),
        }
    }

    /// Pings the backend and its OCR dependency. Never fails; unreachable backends report `reachable: false`.
    pub async fn health(&self) -> HealthStatus {
        let status = match self.ping().await {
            Ok(status) => status,
            Err(err) => {
                warn!("backend ping failed: {err}");
                return HealthStatus {
                    reachable: false,
                    status: None,
                    tesseract_version: None,
                    tesseract_error: None,
                    error: Some(err.user_message()),
                };
            }
        };

        let (tesseract_version, tesseract_error) = match self.check_tesseract().await {
            Ok(Ok(version)) => (Some(version), None),
            Ok(Err(error)) => (None, Some(error)),
            Err(err) => {
                warn!("tesseract check failed: {err}");
                (None, Some(err.to_string()))
            }
        };

        HealthStatus {
            reachable: true,
            status,
            tesseract_version,
            tesseract_error,
            error: None,
        }
    }

    fn endpoint(&self, path: &str, operation: BackendOperation) -> Result<Url, CoreError> {
        self.base_url
            .join(path)
            .map_err(|err| CoreError::backend(operation, err))
    }
}

fn transport_error(operation: BackendOperation, err: reqwest::Error) -> CoreError {
    warn!("{operation} transport failure: {err}");
    CoreError::backend(operation, err)
}

async fn read_json<T: DeserializeOwned>(
    operation: BackendOperation,
    response: Response,
) -> Result<T, CoreError> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        warn!(status = status.as_u16(), %body, "{operation} rejected by backend");
        return Err(CoreError::BackendStatus {
            operation,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str::<T>(&body).map_err(|err| {
        warn!(%body, "{operation} returned malformed JSON: {err}");
        CoreError::backend(operation, format!("malformed response: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;

    fn client_for(url: &str) -> BackendClient {
        BackendClient::new(Client::new(), url).unwrap()
    }

    #[test]
    fn endpoints_keep_base_path_prefix() {
        let client = client_for("https://screener.example.com/api");
        let url = client
            .endpoint(UPLOAD_PATH, BackendOperation::Extract)
            .unwrap();
        assert_eq!(url.as_str(), "https://screener.example.com/api/upload_resume");

        let with_slash = client_for("https://screener.example.com/api/");
        assert_eq!(with_slash.base_url().as_str(), "https://screener.example.com/api/");
    }

    #[test]
    fn rejects_non_http_base_url() {
        assert!(matches!(
            BackendClient::new(Client::new(), "ftp://screener.example.com"),
            Err(CoreError::InvalidSettings(_))
        ));
        assert!(BackendClient::new(Client::new(), "not a url").is_err());
    }

    #[tokio::test]
    async fn extract_resume_posts_multipart_resume_field() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/upload_resume")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=.*".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="resume"; filename="cv.txt""#.to_string()),
                Matcher::Regex("Senior Rust engineer".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"resume_text":"Senior Rust engineer","resume_id":"r-1"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let file = UploadedFile::new("cv.txt", b"Senior Rust engineer".to_vec());
        let extracted = client.extract_resume(&file).await.unwrap();

        mock.assert_async().await;
        assert_eq!(extracted.text.as_deref(), Some("Senior Rust engineer"));
        assert_eq!(extracted.resume_id.as_deref(), Some("r-1"));
    }

    #[tokio::test]
    async fn match_multiple_sends_jobs_in_order() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/match_multiple")
            .match_body(Matcher::Json(json!({
                "resume": "python sql",
                "jobs": [
                    { "title": "Engineer", "description": "python" },
                    { "title": "Analyst", "description": "sql" }
                ]
            })))
            .with_status(200)
            .with_body(
                json!({
                    "results": [
                        { "title": "Engineer", "score": 80, "keywords": ["python"] },
                        { "title": "Analyst", "score": 55.5, "keywords": ["sql"] }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server.url());
        let jobs = [
            MatchJobPayload {
                title: "Engineer",
                description: "python",
            },
            MatchJobPayload {
                title: "Analyst",
                description: "sql",
            },
        ];
        let results = client.match_multiple("python sql", None, &jobs).await.unwrap();

        mock.assert_async().await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].score, 80.0);
        assert_eq!(results[1].keywords, vec!["sql".to_string()]);
    }

    #[tokio::test]
    async fn missing_results_field_is_backend_error() {
        let mut server = Server::new_async().await;
        let _match_multiple = server
            .mock("POST", "/match_multiple")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = client_for(&server.url());
        let jobs = [MatchJobPayload {
            title: "Engineer",
            description: "python",
        }];
        let err = client.match_multiple("python", None, &jobs).await.unwrap_err();

        assert!(err.is_backend());
        assert!(err.to_string().contains("no results returned"));
    }

    #[tokio::test]
    async fn non_success_status_keeps_body_for_logs() {
        let mut server = Server::new_async().await;
        let _resume_summary = server
            .mock("POST", "/resume_summary")
            .with_status(400)
            .with_body(r#"{"error":"Resume text missing"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let err = client.summarize("").await.unwrap_err();

        match err {
            CoreError::BackendStatus { status, body, .. } => {
                assert_eq!(status, 400);
                assert!(body.contains("Resume text missing"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn health_reports_tesseract_error_without_failing() {
        let mut server = Server::new_async().await;
        let _ping = server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;
        let _check_tesseract = server
            .mock("GET", "/check_tesseract")
            .with_status(200)
            .with_body(r#"{"error":"tesseract not found"}"#)
            .create_async()
            .await;

        let health = client_for(&server.url()).health().await;

        assert!(health.reachable);
        assert_eq!(health.status.as_deref(), Some("ok"));
        assert_eq!(health.tesseract_version, None);
        assert_eq!(health.tesseract_error.as_deref(), Some("tesseract not found"));
    }

    #[tokio::test]
    async fn health_marks_failed_ping_unreachable() {
        let mut server = Server::new_async().await;
        let _ping = server
            .mock("GET", "/ping")
            .with_status(503)
            .create_async()
            .await;

        let health = client_for(&server.url()).health().await;
        assert!(!health.reachable);
        assert_eq!(
            health.error.as_deref(),
            Some(BackendOperation::Health.failure_message())
        );
        assert_eq!(health.tesseract_error, None);
    }
}
