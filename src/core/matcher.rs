use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::backend_client::BackendClient;
use super::errors::{BackendOperation, CoreError};
use super::inflight::{InFlight, RequestSequence, RequestTicket};
use super::models::{JobField, JobId, JobPosting, MatchJobPayload, MatchResult, ResumeSnapshot};
use super::results_view::{filter_by_threshold, ResultsView};

pub const NO_JOBS_MESSAGE: &str = "Add at least one job description before comparing.";
pub const NO_RESUME_MESSAGE: &str = "Upload a resume before comparing it against jobs.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatcherState {
    pub jobs: Vec<JobPosting>,
    pub results: Vec<MatchResult>,
    /// Jobs exactly as submitted; `compared_jobs[i]` produced `results[i]`.
    pub compared_jobs: Vec<JobPosting>,
    pub threshold: f64,
    pub error: Option<String>,
    pub compared_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatcherSnapshot {
    pub state: MatcherState,
    pub loading: bool,
}

impl MatcherSnapshot {
    pub fn view(&self) -> ResultsView {
        ResultsView::build(
            &self.state.results,
            &self.state.compared_jobs,
            self.state.threshold,
        )
    }
}

pub struct JobMatcher {
    backend: Arc<BackendClient>,
    state: RwLock<MatcherState>,
    comparisons: RequestSequence,
    in_flight: InFlight,
}

impl JobMatcher {
    pub fn new(backend: Arc<BackendClient>, threshold: f64) -> Self {
        Self {
            backend,
            state: RwLock::new(MatcherState {
                threshold,
                ..MatcherState::default()
            }),
            comparisons: RequestSequence::new(),
            in_flight: InFlight::new(),
        }
    }

    pub async fn add_job(&self) -> JobId {
        self.push_job(JobPosting::empty()).await
    }

    pub async fn add_posting(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> JobId {
        self.push_job(JobPosting::new(title, description)).await
    }

    async fn push_job(&self, job: JobPosting) -> JobId {
        let id = job.id;
        self.state.write().await.jobs.push(job);
        id
    }

    /// Returns false when the posting no longer exists.
    pub async fn remove_job(&self, id: JobId) -> bool {
        let mut state = self.state.write().await;
        let before = state.jobs.len();
        state.jobs.retain(|job| job.id != id);
        before != state.jobs.len()
    }

    pub async fn remove_at(&self, index: usize) -> bool {
        let mut state = self.state.write().await;
        if index >= state.jobs.len() {
            debug!(index, "ignoring removal of stale job index");
            return false;
        }
        state.jobs.remove(index);
        true
    }

    pub async fn update_job(&self, id: JobId, field: JobField, value: impl Into<String>) -> bool {
        let mut state = self.state.write().await;
        match state.jobs.iter_mut().find(|job| job.id == id) {
            Some(job) => {
                set_field(job, field, value.into());
                true
            }
            None => false,
        }
    }

    pub async fn update_at(&self, index: usize, field: JobField, value: impl Into<String>) -> bool {
        let mut state = self.state.write().await;
        match state.jobs.get_mut(index) {
            Some(job) => {
                set_field(job, field, value.into());
                true
            }
            None => false,
        }
    }

    /// Non-finite thresholds fall back to 0.
    pub async fn set_threshold(&self, threshold: f64) {
        let threshold = if threshold.is_finite() {
            threshold
        } else {
            warn!(%threshold, "ignoring non-finite threshold");
            0.0
        };
        self.state.write().await.threshold = threshold;
    }

    pub async fn filtered_results(&self) -> Vec<MatchResult> {
        let state = self.state.read().await;
        filter_by_threshold(&state.results, state.threshold)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_active()
    }

    pub async fn snapshot(&self) -> MatcherSnapshot {
        MatcherSnapshot {
            state: self.state.read().await.clone(),
            loading: self.is_loading(),
        }
    }

    pub async fn results(&self) -> Vec<MatchResult> {
        self.state.read().await.results.clone()
    }

    /// Scores every posting against the resume in one backend call.
    ///
    /// Prior results and error are cleared first. The loading flag is held for the whole
    /// call and released on every exit path.
    pub async fn compare_all(&self, resume: ResumeSnapshot) -> Result<Vec<MatchResult>, CoreError> {
        let ticket = self.comparisons.issue();
        let _loading = self.in_flight.enter();

        let jobs = {
            let mut state = self.state.write().await;
            state.error = None;
            state.results.clear();
            state.compared_jobs.clear();
            state.compared_at = None;
            state.jobs.clone()
        };

        if jobs.is_empty() {
            return Err(self.record_error(CoreError::validation(NO_JOBS_MESSAGE)).await);
        }

        if resume.text.trim().is_empty() {
            return Err(self.record_error(CoreError::validation(NO_RESUME_MESSAGE)).await);
        }

        let payload: Vec<MatchJobPayload<'_>> = jobs
            .iter()
            .map(|job| MatchJobPayload {
                title: &job.title,
                description: &job.description,
            })
            .collect();

        let outcome = self
            .backend
            .match_multiple(&resume.text, resume.resume_id.as_deref(), &payload)
            .await
            .and_then(|results| {
                if results.len() == jobs.len() {
                    Ok(results)
                } else {
                    Err(CoreError::backend(
                        BackendOperation::Compare,
                        format!(
                            "expected {} results, backend returned {}",
                            jobs.len(),
                            results.len()
                        ),
                    ))
                }
            });

        self.settle(ticket, jobs, outcome).await
    }

    pub async fn reset(&self) {
        self.comparisons.issue();
        let mut state = self.state.write().await;
        let threshold = state.threshold;
        *state = MatcherState {
            threshold,
            ..MatcherState::default()
        };
    }

    async fn settle(
        &self,
        ticket: RequestTicket,
        jobs: Vec<JobPosting>,
        outcome: Result<Vec<MatchResult>, CoreError>,
    ) -> Result<Vec<MatchResult>, CoreError> {
        if !self.comparisons.is_latest(ticket) {
            debug!("discarding superseded comparison response");
            return outcome;
        }

        match outcome {
            Ok(results) => {
                info!(jobs = jobs.len(), "comparison completed");
                let mut state = self.state.write().await;
                state.results = results.clone();
                state.compared_jobs = jobs;
                state.compared_at = Some(Utc::now());
                Ok(results)
            }
            Err(err) => Err(self.record_error(err).await),
        }
    }

    async fn record_error(&self, err: CoreError) -> CoreError {
        match &err {
            CoreError::Validation(_) => warn!("{err}"),
            _ => error!("{err}"),
        }

        self.state.write().await.error = Some(err.user_message());
        err
    }
}

fn set_field(job: &mut JobPosting, field: JobField, value: String) {
    match field {
        JobField::Title => job.title = value,
        JobField::Description => job.description = value,
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;

    fn matcher(url: &str) -> JobMatcher {
        let backend = BackendClient::new(reqwest::Client::new(), url).unwrap();
        JobMatcher::new(Arc::new(backend), 0.0)
    }

    fn resume(text: &str) -> ResumeSnapshot {
        ResumeSnapshot {
            text: text.to_string(),
            resume_id: None,
        }
    }

    fn result(title: &str, score: f64, keywords: &[&str]) -> MatchResult {
        MatchResult {
            title: title.to_string(),
            score,
            keywords: keywords.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn list_operations_preserve_order_and_ignore_stale_targets() {
        let matcher = matcher("http://127.0.0.1:5000");
        let first = matcher.add_job().await;
        let second = matcher.add_posting("Analyst", "SQL reporting").await;

        assert!(matcher.update_job(first, JobField::Title, "Engineer").await);
        assert!(matcher.update_at(0, JobField::Description, "Rust services").await);

        assert!(matcher.remove_job(second).await);
        assert!(!matcher.remove_job(second).await);
        assert!(!matcher.remove_at(5).await);
        assert!(!matcher.update_job(second, JobField::Title, "ghost").await);
        assert!(!matcher.update_at(3, JobField::Title, "ghost").await);

        let jobs = matcher.snapshot().await.state.jobs;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, first);
        assert_eq!(jobs[0].title, "Engineer");
        assert_eq!(jobs[0].description, "Rust services");

        assert!(matcher.remove_at(0).await);
        assert!(matcher.snapshot().await.state.jobs.is_empty());
    }

    #[tokio::test]
    async fn compare_with_no_jobs_never_calls_backend() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/match_multiple")
            .expect(0)
            .create_async()
            .await;

        let matcher = matcher(&server.url());
        let err = matcher.compare_all(resume("python")).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, CoreError::Validation(_)));
        let snapshot = matcher.snapshot().await;
        assert!(!snapshot.loading);
        assert_eq!(snapshot.state.error.as_deref(), Some(NO_JOBS_MESSAGE));
    }

    #[tokio::test]
    async fn compare_with_empty_resume_never_calls_backend() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/match_multiple")
            .expect(0)
            .create_async()
            .await;

        let matcher = matcher(&server.url());
        matcher.add_posting("Engineer", "python").await;
        let err = matcher.compare_all(resume("   ")).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(!matcher.is_loading());
    }

    #[tokio::test]
    async fn compare_stores_results_aligned_with_submitted_jobs() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/match_multiple")
            .match_body(Matcher::PartialJson(json!({
                "resume": "python sql",
                "resume_id": "resume-7",
                "jobs": [
                    { "title": "Engineer", "description": "Python services" },
                    { "title": "Analyst", "description": "SQL dashboards" }
                ]
            })))
            .with_status(200)
            .with_body(
                json!({
                    "results": [
                        { "title": "Engineer", "score": 80, "keywords": ["python"] },
                        { "title": "Analyst", "score": 35.5, "keywords": ["sql"] }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let matcher = matcher(&server.url());
        matcher.add_posting("Engineer", "Python services").await;
        matcher.add_posting("Analyst", "SQL dashboards").await;

        let results = matcher
            .compare_all(ResumeSnapshot {
                text: "python sql".to_string(),
                resume_id: Some("resume-7".to_string()),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(results.len(), 2);

        let snapshot = matcher.snapshot().await;
        assert!(!snapshot.loading);
        assert_eq!(snapshot.state.error, None);
        assert!(snapshot.state.compared_at.is_some());
        assert_eq!(snapshot.state.compared_jobs[1].description, "SQL dashboards");
        assert_eq!(snapshot.state.results[1].title, "Analyst");
    }

    #[tokio::test]
    async fn failed_compare_clears_loading_and_results() {
        let mut server = Server::new_async().await;
        let _match_multiple = server
            .mock("POST", "/match_multiple")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let matcher = matcher(&server.url());
        matcher.add_posting("Engineer", "python").await;
        let err = matcher.compare_all(resume("python")).await.unwrap_err();

        assert!(err.is_backend());
        let snapshot = matcher.snapshot().await;
        assert!(!snapshot.loading);
        assert!(snapshot.state.results.is_empty());
        assert_eq!(
            snapshot.state.error.as_deref(),
            Some(BackendOperation::Compare.failure_message())
        );
    }

    #[tokio::test]
    async fn malformed_or_missing_results_are_backend_errors() {
        let mut server = Server::new_async().await;
        let missing = server
            .mock("POST", "/match_multiple")
            .with_status(200)
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let matcher = matcher(&server.url());
        matcher.add_posting("Engineer", "python").await;
        let err = matcher.compare_all(resume("python")).await.unwrap_err();
        assert!(err.to_string().contains("no results returned"));
        assert!(!matcher.is_loading());
        missing.remove_async().await;

        let _malformed = server
            .mock("POST", "/match_multiple")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;
        let err = matcher.compare_all(resume("python")).await.unwrap_err();
        assert!(err.is_backend());
        assert!(!matcher.is_loading());
    }

    #[tokio::test]
    async fn result_count_mismatch_is_rejected() {
        let mut server = Server::new_async().await;
        let _match_multiple = server
            .mock("POST", "/match_multiple")
            .with_status(200)
            .with_body(json!({ "results": [] }).to_string())
            .create_async()
            .await;

        let matcher = matcher(&server.url());
        matcher.add_posting("Engineer", "python").await;
        let err = matcher.compare_all(resume("python")).await.unwrap_err();

        assert!(err.to_string().contains("expected 1 results"));
        assert!(matcher.results().await.is_empty());
    }

    #[tokio::test]
    async fn superseded_outcome_is_not_applied() {
        let matcher = matcher("http://127.0.0.1:5000");
        let jobs = vec![JobPosting::new("Engineer", "python")];

        let stale = matcher.comparisons.issue();
        let latest = matcher.comparisons.issue();

        let returned = matcher
            .settle(stale, jobs.clone(), Ok(vec![result("Engineer", 10.0, &[])]))
            .await
            .unwrap();
        assert_eq!(returned[0].score, 10.0);
        assert!(matcher.results().await.is_empty());

        matcher
            .settle(latest, jobs, Ok(vec![result("Engineer", 90.0, &["python"])]))
            .await
            .unwrap();
        assert_eq!(matcher.results().await[0].score, 90.0);

        let err = matcher
            .settle(
                stale,
                Vec::new(),
                Err(CoreError::backend(BackendOperation::Compare, "late failure")),
            )
            .await
            .unwrap_err();
        assert!(err.is_backend());
        assert_eq!(matcher.snapshot().await.state.error, None);
    }

    #[tokio::test]
    async fn threshold_filters_without_touching_stored_results() {
        let matcher = matcher("http://127.0.0.1:5000");
        let latest = matcher.comparisons.issue();
        matcher
            .settle(
                latest,
                vec![
                    JobPosting::new("A", "a"),
                    JobPosting::new("B", "b"),
                    JobPosting::new("C", "c"),
                ],
                Ok(vec![
                    result("A", 20.0, &[]),
                    result("B", 50.0, &[]),
                    result("C", 80.0, &[]),
                ]),
            )
            .await
            .unwrap();

        matcher.set_threshold(50.0).await;
        let visible: Vec<String> = matcher
            .filtered_results()
            .await
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(visible, vec!["B", "C"]);
        assert_eq!(matcher.results().await.len(), 3);

        matcher.set_threshold(90.0).await;
        assert!(matcher.filtered_results().await.is_empty());
    }

    #[tokio::test]
    async fn non_finite_threshold_falls_back_to_zero() {
        let matcher = matcher("http://127.0.0.1:5000");
        let latest = matcher.comparisons.issue();
        matcher
            .settle(
                latest,
                vec![JobPosting::new("A", "a")],
                Ok(vec![result("A", 50.0, &[])]),
            )
            .await
            .unwrap();

        for threshold in [f64::NAN, f64::INFINITY] {
            matcher.set_threshold(threshold).await;
            let snapshot = matcher.snapshot().await;
            assert_eq!(snapshot.state.threshold, 0.0);
            assert_eq!(matcher.filtered_results().await.len(), 1);
            assert_eq!(snapshot.view().rows.len(), 1);
        }
    }

    #[tokio::test]
    async fn reset_clears_jobs_and_results_but_keeps_threshold() {
        let matcher = matcher("http://127.0.0.1:5000");
        matcher.add_job().await;
        matcher.set_threshold(30.0).await;
        matcher.reset().await;

        let state = matcher.snapshot().await.state;
        assert!(state.jobs.is_empty());
        assert_eq!(state.threshold, 30.0);
    }
}
