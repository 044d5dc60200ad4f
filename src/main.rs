use std::path::PathBuf;

mod app;
mod cache;
mod config;
mod db;
mod duration;
mod error;
mod feed;
mod models;
mod quota;
mod services;
mod sync;
#[cfg(test)]
mod testing;
mod youtube;

use app::App;
use config::Config;
use error::{AppError, Result};

const USAGE: &str = "usage: subfeed [--config <path>] [--sync | --set-credential <access> <refresh> | --fast-lane <channel_id> <on|off>]";

enum Command {
    Run,
    Sync,
    SetCredential { access: String, refresh: String },
    FastLane { channel_id: String, enabled: bool },
}

fn parse_args(args: &[String]) -> Result<(Option<PathBuf>, Command)> {
    let mut config_path = None;
    let mut command = Command::Run;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--sync" => {
                command = Command::Sync;
                i += 1;
            }
            "--set-credential" if i + 2 < args.len() => {
                command = Command::SetCredential {
                    access: args[i + 1].clone(),
                    refresh: args[i + 2].clone(),
                };
                i += 3;
            }
            "--fast-lane" if i + 2 < args.len() => {
                let enabled = match args[i + 2].as_str() {
                    "on" => true,
                    "off" => false,
                    _ => return Err(AppError::Config(USAGE.to_string())),
                };
                command = Command::FastLane {
                    channel_id: args[i + 1].clone(),
                    enabled,
                };
                i += 3;
            }
            _ => return Err(AppError::Config(USAGE.to_string())),
        }
    }

    Ok((config_path, command))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, command) = parse_args(&args)?;

    let config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    let app = App::new(&config).await?;

    match command {
        Command::Run => app.run().await?,
        Command::Sync => {
            let result = app.sync_once().await?;
            println!("Synced subscriptions: {} added, {} removed", result.added, result.removed);
        }
        Command::SetCredential { access, refresh } => {
            app.set_credential(&access, &refresh).await?;
            println!("Credential stored");
        }
        Command::FastLane { channel_id, enabled } => {
            app.set_fast_lane(&channel_id, enabled).await?;
            println!("Fast lane {} for {}", if enabled { "on" } else { "off" }, channel_id);
        }
    }

    Ok(())
}
