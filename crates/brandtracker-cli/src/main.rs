mod analyze;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "brandtracker")]
#[command(about = "Sponsor screen-time analysis for match footage")]
struct Cli {
    /// Base URL of the analysis service
    #[arg(long, global = true, env = "BRANDTRACKER_API_URL")]
    api_url: Option<String>,

    /// Seconds between status queries
    #[arg(long, global = true, env = "BRANDTRACKER_POLL_INTERVAL_SECS")]
    poll_interval_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit a video and wait for its sponsor report
    Analyze {
        /// Remote video URL for the service to download
        #[arg(long)]
        url: Option<String>,
        /// Local video file to upload
        #[arg(long)]
        file: Option<PathBuf>,
        /// Abandon the job if it has not finished after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Print the current status of a job
    Status {
        /// Job id returned at submission
        id: String,
    },
    /// Fetch and render the report of a completed job
    Report {
        /// Job id returned at submission
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loaded before parsing so `.env` values also feed the clap env fallbacks.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = brandtracker_core::load_app_config_from_env()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(secs) = cli.poll_interval_secs {
        anyhow::ensure!(secs > 0, "--poll-interval-secs must be greater than zero");
        config.poll_interval_secs = secs;
    }

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze {
            url,
            file,
            timeout_secs,
        } => analyze::run_analyze(&config, url, file.as_deref(), timeout_secs).await,
        Commands::Status { id } => analyze::run_status(&config, &id).await,
        Commands::Report { id } => analyze::run_report(&config, &id).await,
    }
}
