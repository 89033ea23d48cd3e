//! Werewolf with AI players.
//!
//! Runs one nine-player game. Every seat is played by Claude unless `--human`
//! hands a seat to the terminal.
//!
//! ```bash
//! cargo run -p werewolf -- --human Player3 --seed 42
//! ```

use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use werewolf_core::agents::{ClaudePlayer, HumanPlayer, LlmConfig};
use werewolf_core::memory::KeywordEpisodeStore;
use werewolf_core::{Agent, Game, GameConfig, GameEvent, Language, SpeakingOrderPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = parse_config_from_args(&args, GameConfig::from_env()?)?;
    let llm = LlmConfig::from_env().context("AI players need an Anthropic API key")?;

    let mut agents: HashMap<String, Arc<dyn Agent>> = HashMap::new();
    for name in &config.players {
        let agent: Arc<dyn Agent> = if config.human_player.as_deref() == Some(name.as_str()) {
            Arc::new(HumanPlayer::new(name.clone()))
        } else {
            Arc::new(ClaudePlayer::new(llm.clone())?)
        };
        agents.insert(name.clone(), agent);
    }

    let human = config.human_player.clone();
    let moderated = config.speaking_order == SpeakingOrderPolicy::Moderator;
    let log_dir = config.log_dir.clone();
    info!(
        players = config.players.len(),
        max_rounds = config.max_rounds,
        order = ?config.speaking_order,
        human = human.as_deref().unwrap_or("none"),
        "starting game"
    );
    let (tx, mut rx) = mpsc::unbounded_channel::<GameEvent>();

    let mut game = Game::new(config, agents)?
        .with_store(Arc::new(KeywordEpisodeStore::new()))
        .with_events(tx);
    if moderated {
        game = game.with_moderator(Arc::new(ClaudePlayer::new(llm)?));
    }

    if let Some(human) = &human {
        if let Some(role) = game.state().player_role(human) {
            println!("You are {human}. Your role: {role}");
        }
    }

    // A human only sees what their seat could see until the game is over.
    let spectator = human.is_none();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if spectator || event.is_public() {
                println!("{event}");
            }
        }
    });

    let report = game.run().await;
    let saved = game.save_transcript().await;
    drop(game);
    printer.await.ok();

    println!();
    println!("Outcome: {} after {} round(s)", report.outcome, report.rounds_played);
    match saved {
        Some(dir) => println!("Transcript saved to {}", dir.display()),
        None => warn!(dir = %log_dir.display(), "game finished without a saved transcript"),
    }

    Ok(())
}

/// Apply command-line overrides on top of the environment configuration.
fn parse_config_from_args(args: &[String], mut config: GameConfig) -> anyhow::Result<GameConfig> {
    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--human", Some(name)) => {
                config = config.with_human_player(name.clone());
                i += 1;
            }
            ("--seed", Some(seed)) => {
                config = config.with_seed(seed.parse().with_context(|| format!("invalid seed: {seed}"))?);
                i += 1;
            }
            ("--max-rounds", Some(rounds)) => {
                let rounds = rounds
                    .parse()
                    .with_context(|| format!("invalid round count: {rounds}"))?;
                config = config.with_max_rounds(rounds);
                i += 1;
            }
            ("--lang", Some(code)) => {
                config = config.with_language(Language::from_code(code));
                i += 1;
            }
            ("--order", Some(order)) => {
                let policy = match order.to_lowercase().as_str() {
                    "roster" => SpeakingOrderPolicy::RosterOrder,
                    "rotating" => SpeakingOrderPolicy::Rotating,
                    "moderator" => SpeakingOrderPolicy::Moderator,
                    other => anyhow::bail!("unknown speaking order: {other}"),
                };
                config = config.with_speaking_order(policy);
                i += 1;
            }
            ("--log-dir", Some(dir)) => {
                config = config.with_log_dir(dir.clone());
                i += 1;
            }
            (flag, None) if flag.starts_with("--") => anyhow::bail!("{flag} needs a value"),
            (other, _) => anyhow::bail!("unknown argument: {other} (try --help)"),
        }
        i += 1;
    }
    Ok(config)
}

fn print_help() {
    println!("Werewolf - nine AI players, one moderator");
    println!();
    println!("USAGE:");
    println!("  werewolf [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help              Show this help message");
    println!("  --human <NAME>          Play the seat NAME yourself (e.g. Player3)");
    println!("  --seed <N>              Seed the role shuffle");
    println!("  --max-rounds <N>        Stop after N rounds (default: 10)");
    println!("  --lang <en|zh>          Prompt language (default: en)");
    println!("  --order <POLICY>        Speaking order: roster, rotating, moderator");
    println!("  --log-dir <DIR>         Where transcripts are saved (default: logs)");
    println!();
    println!("ENVIRONMENT:");
    println!("  ANTHROPIC_API_KEY       Required for AI players");
    println!("  WEREWOLF_MODEL          Claude model to use");
    println!("  GAME_LANG, WEREWOLF_MAX_ROUNDS, WEREWOLF_SEED, WEREWOLF_LOG_DIR");
    println!("  RUST_LOG                Log filter (default: info)");
    println!();
    println!("EXAMPLES:");
    println!("  werewolf                               # Watch nine AI players");
    println!("  werewolf --human Player3 --seed 42     # Take a seat");
}
