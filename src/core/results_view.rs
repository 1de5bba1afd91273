use serde::Serialize;

use super::highlight::{highlight, HighlightSegment};
use super::models::{JobId, JobPosting, MatchResult};

pub const CHART_TITLE: &str = "Resume Match Scores by Job";
pub const CHART_SERIES_LABEL: &str = "Match Score (%)";

pub fn filter_by_threshold(results: &[MatchResult], threshold: f64) -> Vec<MatchResult> {
    results
        .iter()
        .filter(|result| passes(result, threshold))
        .cloned()
        .collect()
}

/// False for NaN on either side.
fn passes(result: &MatchResult, threshold: f64) -> bool {
    result.score >= threshold
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub title: String,
    pub score: f64,
    pub keywords: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreChart {
    pub title: String,
    pub series_label: String,
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightedDescription {
    pub job_id: JobId,
    pub title: String,
    pub segments: Vec<HighlightSegment>,
}

/// Everything the results panel shows for the current threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsView {
    pub threshold: f64,
    pub total_results: usize,
    pub rows: Vec<ResultRow>,
    pub chart: ScoreChart,
    pub descriptions: Vec<HighlightedDescription>,
}

impl ResultsView {
    /// `compared_jobs[i]` must be the posting that produced `results[i]`. Pairing happens
    /// before filtering so a hidden result never shifts another row's description.
    pub fn build(results: &[MatchResult], compared_jobs: &[JobPosting], threshold: f64) -> Self {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        let mut data = Vec::new();
        let mut descriptions = Vec::new();

        for (index, result) in results.iter().enumerate() {
            if !passes(result, threshold) {
                continue;
            }

            rows.push(ResultRow {
                title: result.title.clone(),
                score: result.score,
                keywords: if result.keywords.is_empty() {
                    "None".to_string()
                } else {
                    result.keywords.join(", ")
                },
            });
            labels.push(result.title.clone());
            data.push(result.score);

            if let Some(job) = compared_jobs.get(index) {
                descriptions.push(HighlightedDescription {
                    job_id: job.id,
                    title: result.title.clone(),
                    segments: highlight(&job.description, &result.keywords),
                });
            }
        }

        Self {
            threshold,
            total_results: results.len(),
            rows,
            chart: ScoreChart {
                title: CHART_TITLE.to_string(),
                series_label: CHART_SERIES_LABEL.to_string(),
                labels,
                data,
            },
            descriptions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_results == 0
    }
}
