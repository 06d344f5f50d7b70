use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use perspective_prism::{
    config::{Config, LogFormat},
    service::AnalysisService,
    transcript::extract_video_id,
};

#[derive(Parser)]
#[command(name = "perspective-prism", version, about = "Multi-perspective claim analysis for videos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a video and print the job's final status as JSON
    Analyze {
        /// YouTube video URL
        video_url: String,
        /// Status polling interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        poll_ms: u64,
    },
    /// Print the video id parsed from a URL
    VideoId {
        /// YouTube video URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::VideoId { url } = &cli.command {
        println!("{}", extract_video_id(url)?);
        return Ok(());
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = ?config.llm.provider,
        "Perspective Prism starting..."
    );

    let service = match AnalysisService::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to initialize analysis service");
            return Err(e.into());
        }
    };

    if let Command::Analyze { video_url, poll_ms } = cli.command {
        let job_id = service.create_job(&video_url).await?;
        info!(job_id = %job_id, "Waiting for analysis to finish");

        let status = service
            .wait_for_job(&job_id, Duration::from_millis(poll_ms.max(10)))
            .await?;
        println!("{}", serde_json::to_string_pretty(&status)?);

        service.shutdown().await;
        // Non-zero exit for a FAILED job
        status.check()?;
        return Ok(());
    }

    service.shutdown().await;
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
