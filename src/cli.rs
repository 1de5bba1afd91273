use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use tracing::info;

use crate::core::errors::CoreError;
use crate::core::models::{RuntimeSettings, UploadedFile};
use crate::core::service::ScreenerService;
use crate::core::settings_store::SettingsStore;
use crate::render;

#[derive(Parser)]
#[command(name = "resume-screener")]
#[command(about = "Extract, summarize and score a resume against job descriptions", long_about = None)]
pub struct Cli {
    /// Backend base URL for this run (overrides settings and environment)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a resume and print the extracted text
    Extract {
        /// Resume file (.pdf, .docx or .txt)
        file: PathBuf,
    },
    /// Upload a resume and print a generated summary
    Summarize { file: PathBuf },
    /// Score a resume against one or more job descriptions
    Match(MatchArgs),
    /// Check backend and OCR availability
    Health,
    /// Show or change persisted settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Args)]
struct MatchArgs {
    file: PathBuf,

    /// Job as TITLE=PATH, where PATH holds the description text (repeatable)
    #[arg(short, long = "job", value_name = "TITLE=PATH")]
    jobs: Vec<String>,

    /// JSON array of {"title", "description"} objects
    #[arg(long, value_name = "PATH")]
    jobs_file: Option<PathBuf>,

    /// Minimum match score (%) for a result to be shown
    #[arg(short, long, value_parser = parse_threshold)]
    threshold: Option<f64>,

    /// Also print a resume summary before matching
    #[arg(long)]
    summary: bool,

    /// Write all results to a CSV file
    #[arg(long)]
    csv: bool,

    /// Write all results to an Excel workbook
    #[arg(long)]
    xlsx: bool,

    /// Directory for exported files
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Print the results view as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long)]
        backend_url: Option<String>,
        #[arg(long)]
        timeout_seconds: Option<u64>,
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,
        #[arg(long, value_name = "DIR")]
        export_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Deserialize)]
struct JobInput {
    title: String,
    #[serde(default)]
    description: String,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let store = SettingsStore::new();
        let color = !self.no_color && std::io::stdout().is_terminal();

        match self.command {
            Commands::Extract { file } => {
                let service = ScreenerService::from_store(&store, self.backend_url).await?;
                let text = upload(&service, &file).await?;
                println!("{text}");
            }
            Commands::Summarize { file } => {
                let service = ScreenerService::from_store(&store, self.backend_url).await?;
                upload(&service, &file).await?;
                println!("{}", service.generate_summary().await?);
            }
            Commands::Match(args) => run_match(&store, self.backend_url, args, color).await?,
            Commands::Health => {
                let service = ScreenerService::from_store(&store, self.backend_url).await?;
                let status = service.health().await;
                print!("{}", render::health(&status));
                if !status.reachable {
                    bail!("backend at {} is unreachable", service.settings().backend_base_url);
                }
            }
            Commands::Settings { action } => run_settings(&store, action).await?,
        }

        Ok(())
    }
}

async fn upload(service: &ScreenerService, file: &Path) -> Result<String> {
    service.select_file(UploadedFile::from_path(file).await?).await;
    Ok(service.upload_resume().await?)
}

async fn run_match(
    store: &SettingsStore,
    backend_url: Option<String>,
    args: MatchArgs,
    color: bool,
) -> Result<()> {
    let jobs = collect_jobs(&args.jobs, args.jobs_file.as_deref()).await?;
    let service = ScreenerService::from_store(store, backend_url).await?;

    upload(&service, &args.file).await?;
    if args.summary {
        println!("Summary\n{}\n", service.generate_summary().await?);
    }

    for job in jobs {
        service.matcher().add_posting(job.title, job.description).await;
    }
    if let Some(threshold) = args.threshold {
        service.matcher().set_threshold(threshold).await;
    }

    let results = service.compare_all().await?;
    info!(results = results.len(), "comparison finished");

    let view = service.results_view().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", render::results(&view, color));
    }

    if args.csv || args.xlsx {
        let dir = args
            .export_dir
            .unwrap_or_else(|| service.settings().export_dir());
        let written = export_to(&service, &dir, args.csv, args.xlsx).await?;
        for path in written {
            eprintln!("Wrote {}", path.display());
        }
    }

    Ok(())
}

async fn export_to(
    service: &ScreenerService,
    dir: &Path,
    csv: bool,
    xlsx: bool,
) -> Result<Vec<PathBuf>> {
    use crate::core::export;

    let results = service.matcher().results().await;
    let mut written = Vec::new();
    if csv {
        written.extend(export::write_csv(&results, dir).await?);
    }
    if xlsx {
        written.extend(export::write_xlsx(&results, dir).await?);
    }
    Ok(written)
}

async fn collect_jobs(job_args: &[String], jobs_file: Option<&Path>) -> Result<Vec<JobInput>> {
    let mut jobs = Vec::new();

    if let Some(path) = jobs_file {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read jobs file {}", path.display()))?;
        let parsed: Vec<JobInput> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse jobs file {}", path.display()))?;
        jobs.extend(parsed);
    }

    for arg in job_args {
        let (title, path) = parse_job_arg(arg)?;
        let description = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read job description {}", path.display()))?;
        jobs.push(JobInput { title, description });
    }

    Ok(jobs)
}

fn parse_job_arg(value: &str) -> Result<(String, PathBuf)> {
    let (title, path) = value
        .split_once('=')
        .ok_or_else(|| anyhow!("job must be given as TITLE=PATH, got `{value}`"))?;
    if path.trim().is_empty() {
        bail!("job `{title}` has no description path");
    }
    Ok((title.trim().to_string(), PathBuf::from(path.trim())))
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if !threshold.is_finite() {
        return Err(format!("threshold must be a finite number, got `{value}`"));
    }
    Ok(threshold)
}

async fn run_settings(store: &SettingsStore, action: SettingsAction) -> Result<()> {
    let mut settings = store.load().await?;

    if let SettingsAction::Set {
        backend_url,
        timeout_seconds,
        threshold,
        export_dir,
    } = action
    {
        if let Some(url) = backend_url {
            settings.backend_base_url = url;
        }
        if let Some(timeout) = timeout_seconds {
            settings.request_timeout_seconds = timeout;
        }
        if let Some(threshold) = threshold {
            settings.default_threshold = threshold;
        }
        if let Some(dir) = export_dir {
            settings.export_dir = Some(dir);
        }

        // Validates the URL before anything is written.
        ScreenerService::new(settings.clone())?;
        store.save(&settings).await?;
        settings = store.load().await?;
    }

    print_settings(store, &settings)
}

fn print_settings(store: &SettingsStore, settings: &RuntimeSettings) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    eprintln!("Settings file: {}", store.path().display());
    Ok(())
}

/// Message shown to the user when a command fails.
pub fn failure_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<CoreError>() {
        Some(core) => core.user_message(),
        None => format!("{err:#}"),
    }
}
