use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use speechdub::config::Settings;
use speechdub::interactive::prompt_missing_credentials;
use speechdub::{print_summary, DubRequest, Dubber, DubbingClient, Session};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Correlation id used by the connection check; a miss is expected.
const CONNECTION_TEST_ID: &str = "connection-test";

#[derive(Parser)]
#[command(name = "speechdub")]
#[command(version, about = "Dub audio through the SpeechLab API")]
#[command(long_about = "Submit an audio file URL to SpeechLab for dubbing, wait for the job to finish, and print a sharing link.")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Dub a publicly reachable audio file
    Dub {
        /// Public URL of the source audio
        audio_url: String,

        /// Target language code (e.g., es, fr, de)
        #[arg(short, long)]
        target: String,

        /// Project name (defaults to a timestamped name)
        #[arg(short, long)]
        name: Option<String>,

        /// Source language code (overrides SPEECHLAB_SOURCE_LANGUAGE)
        #[arg(short, long)]
        source: Option<String>,

        /// Maximum minutes to wait for the job
        #[arg(long)]
        max_wait_minutes: Option<u64>,

        /// Seconds between status checks
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate credentials and test the API connection
    Check,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().context("Failed to load configuration")?;
    init_logging(cli.verbose || settings.debug);

    prompt_missing_credentials(&mut settings)?;

    match cli.command {
        Command::Dub {
            audio_url,
            target,
            name,
            source,
            max_wait_minutes,
            interval_secs,
            json,
        } => {
            if let Some(source) = source {
                settings.source_language = source;
            }
            if let Some(minutes) = max_wait_minutes {
                settings.max_wait_time_minutes = minutes;
            }
            if let Some(secs) = interval_secs {
                settings.check_interval_seconds = secs;
            }
            settings
                .validate()
                .context("Configuration validation failed")?;

            let dubber = Dubber::from_settings(&settings, Session::new())?;

            info!("Audio:    {}", audio_url);
            info!("Target:   {}", target);
            info!("Source:   {}", settings.source_language);
            info!(
                "Max wait: {} minutes, checking every {}s",
                settings.max_wait_time_minutes, settings.check_interval_seconds
            );

            let mut request = DubRequest::new(audio_url, target);
            if let Some(name) = name {
                request = request.with_project_name(name);
            }

            let pb = spinner("Dubbing (this may take several minutes)...");
            let outcome = dubber.dub_with_stats(Some(&request)).await;
            pb.finish_and_clear();

            let (result, stats) = outcome.context("Failed to complete dubbing")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(&result, &stats);
            }
        }
        Command::Check => {
            let client = DubbingClient::from_settings(&settings, Session::new())
                .context("Credential validation failed")?;

            client
                .authenticate()
                .await
                .context("Failed to connect to SpeechLab API")?;
            client
                .fetch(CONNECTION_TEST_ID)
                .await
                .context("Failed to connect to SpeechLab API")?;

            println!("SpeechLab API connection test successful");
        }
    }

    Ok(())
}
