use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use game_client::{
    build_http_client, game::DECAY_INTERVAL, load_settings, HttpImageDownloader,
    RoundOrchestrator, UnsplashClient,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    time::{self, MissedTickBehavior},
};
use tracing_subscriber::EnvFilter;

mod commands;
mod controller;

use commands::{parse_command, HELP};
use controller::GameController;

#[derive(Parser, Debug)]
#[command(about = "Find the odd image out before the score runs out")]
struct Args {
    #[arg(long, default_value = "find_or_lose.toml")]
    config: PathBuf,
    /// Overrides the access token from the config file and environment.
    #[arg(long)]
    access_token: Option<String>,
    #[arg(long, default_value = "find_or_lose_tiles")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config);
    if let Some(token) = args.access_token {
        settings.access_token = token;
    }
    settings.validate().context("invalid configuration")?;

    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("failed to create '{}'", args.out_dir.display()))?;

    let http = build_http_client(&settings)?;
    let (round_tx, mut round_rx) = mpsc::unbounded_channel();
    let rounds = RoundOrchestrator::new(
        Arc::new(UnsplashClient::new(http.clone(), &settings)),
        Arc::new(HttpImageDownloader::new(http)),
        Arc::new(round_tx),
    );
    let mut controller = GameController::new(rounds, &args.out_dir);

    let mut decay = time::interval(DECAY_INTERVAL);
    decay.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Find or Lose. Tiles are written to {}", args.out_dir.display());
    println!("{HELP}");

    loop {
        let decay_was_running = controller.decay_running();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    Some(command) => {
                        if !controller.handle_command(command) {
                            break;
                        }
                    }
                    None => println!("Unknown command. {HELP}"),
                }
            }
            Some(event) = round_rx.recv() => controller.handle_round_event(event).await?,
            _ = decay.tick(), if decay_was_running => controller.tick(),
        }
        if !decay_was_running && controller.decay_running() {
            decay.reset();
        }
    }

    Ok(())
}
