use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use robomafia::agents::Agent;
use robomafia::agents::rule::RuleAgent;
use robomafia::driver::Driver;
use robomafia::engine::config::Config;
use robomafia::roles::faction::Faction;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

/// Run a batch of bot-only games and append one summary per line.
#[derive(Parser)]
struct Args {
    /// Number of games to simulate.
    #[arg(long, default_value_t = 10)]
    games: usize,
    /// Path to a JSON config; defaults to the five-player setup.
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSONL output, one game summary per line, appended.
    #[arg(long, default_value = "games_log.jsonl")]
    out: PathBuf,
    /// Base RNG seed; game i uses seed + i per seat.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    robomafia::log();
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let mut out = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.out)
        .with_context(|| format!("open {}", args.out.display()))?;

    let mut wins: BTreeMap<String, usize> = BTreeMap::new();
    let mut truncated = 0usize;
    for game in 0..args.games {
        let mut agents: BTreeMap<String, Box<dyn Agent>> = BTreeMap::new();
        for (i, seat) in config.roles.iter().enumerate() {
            let seed = args
                .seed
                .wrapping_add(game as u64)
                .wrapping_mul(31)
                .wrapping_add(i as u64);
            agents.insert(seat.name.clone(), Box::new(RuleAgent::new(seed)));
        }
        let mut driver = Driver::new(config.clone(), agents)?;
        let summary = driver.run();
        match summary.winner {
            Some(winner) => *wins.entry(winner.to_string()).or_insert(0) += 1,
            None => truncated += 1,
        }
        serde_json::to_writer(&mut out, &summary)
            .with_context(|| format!("write summary for game {}", summary.game_id))?;
        writeln!(out)?;
        log::info!(
            "[simulate] game {}/{} finished: winner {:?}, {} days",
            game + 1,
            args.games,
            summary.winner,
            summary.day_count
        );
    }

    println!();
    println!("{}", format!("Simulated {} games", args.games).bold());
    for faction in [Faction::Town, Faction::Mafia, Faction::Neutral] {
        let count = wins.get(&faction.to_string()).copied().unwrap_or(0);
        if count > 0 || faction != Faction::Neutral {
            println!("  {:<8} {}", faction.to_string(), count);
        }
    }
    if truncated > 0 {
        println!("{}", format!("  truncated {}", truncated).yellow());
    }
    println!("Summaries appended to {}", args.out.display());
    Ok(())
}
