use std::fmt::Write;

use crossterm::style::Stylize;

use crate::core::highlight::HighlightSegment;
use crate::core::models::HealthStatus;
use crate::core::results_view::{ResultRow, ResultsView, ScoreChart};

const BAR_WIDTH: usize = 40;
const TABLE_HEADERS: [&str; 3] = ["Job Title", "Match Score (%)", "Matched Keywords"];

pub fn results(view: &ResultsView, color: bool) -> String {
    if view.is_empty() {
        return "No results yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Minimum Match Score (%): {} ({} of {} shown)\n",
        view.threshold,
        view.rows.len(),
        view.total_results
    );
    out.push_str(&table(&view.rows));
    out.push('\n');
    out.push_str(&chart(&view.chart, color));

    if !view.descriptions.is_empty() {
        out.push_str("\nHighlighted Job Descriptions\n");
        for description in &view.descriptions {
            let _ = writeln!(out, "\n{}", heading(&description.title, color));
            let _ = writeln!(out, "{}", segments(&description.segments, color));
        }
    }

    out
}

pub fn table(rows: &[ResultRow]) -> String {
    let cells: Vec<[String; 3]> = rows
        .iter()
        .map(|row| [row.title.clone(), row.score.to_string(), row.keywords.clone()])
        .collect();

    let mut widths = TABLE_HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let line = |out: &mut String, values: [&str; 3]| {
        let text = format!(
            "{:<w0$} | {:>w1$} | {}",
            values[0],
            values[1],
            values[2],
            w0 = widths[0],
            w1 = widths[1]
        );
        out.push_str(text.trim_end());
        out.push('\n');
    };

    line(&mut out, TABLE_HEADERS);
    let _ = writeln!(
        out,
        "{}-+-{}-+-{}",
        "-".repeat(widths[0]),
        "-".repeat(widths[1]),
        "-".repeat(widths[2])
    );
    for row in &cells {
        line(&mut out, [row[0].as_str(), row[1].as_str(), row[2].as_str()]);
    }

    out
}

/// Horizontal bars scaled so that 100% fills `BAR_WIDTH` columns.
pub fn chart(chart: &ScoreChart, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", heading(&chart.title, color));

    let label_width = chart
        .labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0);

    for (label, score) in chart.labels.iter().zip(chart.data.iter()) {
        let filled = ((score.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
        let bar = "█".repeat(filled);
        let bar = if color {
            bar.cyan().to_string()
        } else {
            bar
        };
        let _ = writeln!(out, "{label:<label_width$} {bar} {score}");
    }

    out
}

pub fn segments(segments: &[HighlightSegment], color: bool) -> String {
    segments
        .iter()
        .map(|segment| match (segment.highlighted, color) {
            (false, _) => segment.text.clone(),
            (true, true) => segment.text.as_str().black().on_yellow().bold().to_string(),
            (true, false) => format!("[{}]", segment.text),
        })
        .collect()
}

pub fn health(status: &HealthStatus) -> String {
    let mut out = String::new();
    if !status.reachable {
        let _ = writeln!(out, "Backend: unreachable");
        if let Some(error) = &status.error {
            let _ = writeln!(out, "  {error}");
        }
        return out;
    }

    let _ = writeln!(
        out,
        "Backend: {}",
        status.status.as_deref().unwrap_or("reachable")
    );
    match (&status.tesseract_version, &status.tesseract_error) {
        (Some(version), _) => {
            let _ = writeln!(out, "Tesseract: {version}");
        }
        (None, Some(error)) => {
            let _ = writeln!(out, "Tesseract: unavailable ({error})");
        }
        (None, None) => {
            let _ = writeln!(out, "Tesseract: unknown");
        }
    }
    out
}

fn heading(text: &str, color: bool) -> String {
    if color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{JobPosting, MatchResult};

    fn view() -> ResultsView {
        let results = vec![
            MatchResult {
                title: "Engineer".to_string(),
                score: 80.0,
                keywords: vec!["python".to_string(), "sql".to_string()],
            },
            MatchResult {
                title: "Analyst".to_string(),
                score: 20.0,
                keywords: Vec::new(),
            },
        ];
        let jobs = vec![
            JobPosting::new("Engineer", "Python and SQL"),
            JobPosting::new("Analyst", "Excel"),
        ];
        ResultsView::build(&results, &jobs, 0.0)
    }

    #[test]
    fn table_aligns_columns() {
        let table = table(&view().rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Job Title"));
        assert!(lines[2].contains("python, sql"));
        assert!(lines[3].ends_with("None"));
        assert_eq!(
            lines[0].find('|'),
            lines[2].find('|'),
            "column separators should line up"
        );
    }

    #[test]
    fn chart_scales_bars_to_score() {
        let chart = chart(&view().chart, false);
        let lines: Vec<&str> = chart.lines().collect();

        assert_eq!(lines[0], "Resume Match Scores by Job");
        assert_eq!(lines[1].matches('█').count(), 32);
        assert_eq!(lines[2].matches('█').count(), 8);
    }

    #[test]
    fn plain_segments_bracket_keywords() {
        let rendered = segments(&view().descriptions[0].segments, false);
        assert_eq!(rendered, "[Python] and [SQL]");
    }

    #[test]
    fn unreachable_backend_reports_ping_error_under_backend() {
        let status = HealthStatus {
            reachable: false,
            status: None,
            tesseract_version: None,
            tesseract_error: None,
            error: Some("Could not reach the server.".to_string()),
        };
        assert_eq!(
            health(&status),
            "Backend: unreachable\n  Could not reach the server.\n"
        );

        let status = HealthStatus {
            reachable: true,
            status: Some("ok".to_string()),
            tesseract_version: None,
            tesseract_error: Some("tesseract not found".to_string()),
            error: None,
        };
        assert_eq!(
            health(&status),
            "Backend: ok\nTesseract: unavailable (tesseract not found)\n"
        );
    }

    #[test]
    fn empty_view_has_placeholder() {
        let empty = ResultsView::build(&[], &[], 0.0);
        assert_eq!(results(&empty, false), "No results yet.\n");
    }
}
