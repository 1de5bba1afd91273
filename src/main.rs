use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match resume_screener_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("Error: {}", resume_screener_lib::cli::failure_message(&err));
            ExitCode::FAILURE
        }
    }
}
