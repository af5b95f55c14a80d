//! Hexfall headless simulator.
//!
//! Plays bot-only matches and prints one JSON summary per match on stdout.
//!
//! Environment:
//! - `HEXFALL_CONFIG`: path to a JSON game config
//! - `HEXFALL_SEED`: seed of the first match, later matches count up from it
//! - `HEXFALL_GAMES`: number of matches (default 1)
//! - `HEXFALL_MAX_TURNS`: turn limit per match (default 500)
//! - `HEXFALL_BOTS`: `easy` or `medium` (default medium)

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{bail, Context};
use hexfall_core::{BotDifficulty, GameConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod runner;
mod summary;

use runner::MatchRunner;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match std::env::var("HEXFALL_CONFIG") {
        Ok(path) => GameConfig::from_path(&path)
            .with_context(|| format!("loading config from {path}"))?,
        Err(_) => GameConfig::default(),
    };
    let base_seed = match env_var::<u64>("HEXFALL_SEED")? {
        Some(seed) => seed,
        None => config.seed.unwrap_or_else(rand::random),
    };
    let games = env_var::<u32>("HEXFALL_GAMES")?.unwrap_or(1);
    let max_turns = env_var::<u32>("HEXFALL_MAX_TURNS")?.unwrap_or(500);
    let difficulty = match std::env::var("HEXFALL_BOTS") {
        Ok(raw) => parse_difficulty(&raw)?,
        Err(_) => BotDifficulty::Medium,
    };

    info!(games, base_seed, max_turns, ?difficulty, "Starting Hexfall simulation...");

    let mut wins: BTreeMap<String, u32> = BTreeMap::new();
    let mut unfinished = 0;
    for game in 0..games {
        config.seed = Some(base_seed.wrapping_add(u64::from(game)));
        let summary = MatchRunner::new(config.clone(), difficulty, max_turns)?
            .run()
            .with_context(|| format!("match {game} failed"))?;

        println!("{}", serde_json::to_string(&summary)?);

        match summary.winner() {
            Some(winner) => {
                let name = summary
                    .players
                    .iter()
                    .find(|p| p.id == winner)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                *wins.entry(name).or_default() += 1;
            }
            None => unfinished += 1,
        }
    }

    info!(?wins, unfinished, "Simulation finished");
    Ok(())
}

/// Read and parse an optional environment variable
fn env_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid {name}: {raw:?}")),
        Err(_) => Ok(None),
    }
}

fn parse_difficulty(raw: &str) -> anyhow::Result<BotDifficulty> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "easy" => Ok(BotDifficulty::Easy),
        "medium" => Ok(BotDifficulty::Medium),
        other => bail!("unknown bot difficulty {other:?}"),
    }
}
