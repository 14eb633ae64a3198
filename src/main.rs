use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use youtrack_link::{app, cli::Args};

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args = Args::parse();

    match app::run(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            // Attaches the message to the workflow run, like core.setFailed
            println!("::error::{}", escape_workflow_data(&err.to_string()));
            ExitCode::FAILURE
        }
    }
}

fn escape_workflow_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
