/// Soul Headless - plays a demo queue against a simulated sink
use clap::{Parser, Subcommand};
use soul_audio::SignalChain;
use soul_headless::{HeadlessConfig, HeadlessPlayer};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "soul-headless")]
#[command(about = "Soul headless playback controller demo", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./headless.toml when present)
    #[arg(short, long, global = true, env = "SOUL_HEADLESS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the configured demo queue
    Play {
        /// Stop after this many wall-clock seconds
        #[arg(short, long)]
        limit: Option<u64>,
    },
    /// List equalizer presets and their band gains
    Presets,
    /// Validate configuration and print the effective settings
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soul_headless=info,soul_playback=info,soul_audio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { limit } => {
            let config = HeadlessConfig::load(cli.config.as_deref())?;
            play(config, limit).await?;
        }
        Commands::Presets => {
            for name in SignalChain::preset_names() {
                let gains = SignalChain::preset_gains(name)?;
                let formatted: Vec<String> = gains.iter().map(|g| format!("{:+.0}", g)).collect();
                println!("{:<14} {}", name, formatted.join(" "));
            }
        }
        Commands::CheckConfig => {
            let config = HeadlessConfig::load(cli.config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn play(config: HeadlessConfig, limit: Option<u64>) -> anyhow::Result<()> {
    info!(
        tracks = config.demo.tracks.len(),
        environment = ?config.runtime.environment,
        "Starting headless player"
    );

    let player = HeadlessPlayer::new(config)?;
    let shutdown = async move {
        match limit {
            Some(seconds) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    () = tokio::time::sleep(Duration::from_secs(seconds)) => {}
                }
            }
            None => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    };

    let summary = player.run(shutdown).await?;

    info!(
        played = summary.tracks_started.len(),
        queue_ended = summary.queue_ended,
        "Run finished"
    );
    for entry in &summary.play_log {
        info!(
            track = %entry.track_id,
            plays = entry.plays,
            listened_secs = entry.listened.as_secs_f64(),
            "Play log"
        );
    }

    Ok(())
}
