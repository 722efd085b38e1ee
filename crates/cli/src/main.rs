use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use qgjob_cli::args::{Cli, Command};
use qgjob_cli::client::{ClientError, JobClient};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ClientError>() {
                Some(ClientError::JobNotFound(_)) => eprintln!("{e}"),
                _ => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = JobClient::new(&cli.server)?;

    match cli.command {
        Command::Submit(args) => {
            let payload = args.into_payload();
            println!("Submitting job: {}", serde_json::to_string(&payload)?);
            let job_id = client.submit(&payload).await?;
            println!("Job submitted. Job ID: {job_id}");
        }
        Command::Status { job_id } => {
            let record = client.status(&job_id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}
