use clap::{Parser, Subcommand, ValueEnum};
use qgjob_core::job::{JobPayload, DEFAULT_PRIORITY};

/// Default base URL of the job server.
pub const DEFAULT_SERVER: &str = "http://localhost:8000";

#[derive(Parser, Debug)]
#[command(name = "qgjob")]
#[command(version)]
#[command(about = "Submit test jobs and check their status")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Base URL of the job server
    #[arg(long, global = true, env = "QGJOB_SERVER", default_value = DEFAULT_SERVER)]
    pub server: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a test job
    Submit(SubmitArgs),

    /// Check the status of a job
    Status {
        /// Job ID returned by `submit`
        #[arg(long)]
        job_id: String,
    },
}

#[derive(clap::Args, Debug)]
pub struct SubmitArgs {
    /// Organization ID
    #[arg(long)]
    pub org_id: String,

    /// App version ID
    #[arg(long)]
    pub app_version_id: String,

    /// Path to the test script
    #[arg(long = "test")]
    pub test_path: String,

    /// Job priority (higher = more urgent)
    #[arg(long, default_value_t = DEFAULT_PRIORITY)]
    pub priority: i32,

    /// Target environment
    #[arg(long, value_enum)]
    pub target: Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Emulator,
    Device,
    Browserstack,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emulator => "emulator",
            Self::Device => "device",
            Self::Browserstack => "browserstack",
        }
    }
}

impl SubmitArgs {
    pub fn into_payload(self) -> JobPayload {
        JobPayload {
            org_id: self.org_id,
            app_version_id: self.app_version_id,
            test_path: self.test_path,
            priority: self.priority,
            target: self.target.as_str().to_string(),
        }
    }
}
