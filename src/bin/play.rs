use clap::Parser;
use colored::Colorize;
use robomafia::agents::Agent;
use robomafia::agents::human::Human;
use robomafia::agents::rule::RuleAgent;
use robomafia::driver::Driver;
use robomafia::engine::config::Config;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Play one game at the terminal against rule-based bots.
#[derive(Parser)]
struct Args {
    /// Path to a JSON config; defaults to the five-player setup.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Which seat the human takes; defaults to the first seat.
    #[arg(long)]
    seat: Option<String>,
    /// RNG seed for the bots.
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
    let seat = args
        .seat
        .clone()
        .or_else(|| config.roles.first().map(|s| s.name.clone()))
        .ok_or_else(|| anyhow::anyhow!("config has no seats"))?;

    let mut agents: BTreeMap<String, Box<dyn Agent>> = BTreeMap::new();
    for (i, roster_seat) in config.roles.iter().enumerate() {
        if roster_seat.name == seat {
            agents.insert(seat.clone(), Box::new(Human::new()));
        } else {
            agents.insert(
                roster_seat.name.clone(),
                Box::new(RuleAgent::new(args.seed.wrapping_add(i as u64))),
            );
        }
    }

    let mut driver = Driver::new(config, agents)?;
    let summary = driver.run();

    println!();
    match summary.winner {
        Some(winner) => println!(
            "{}",
            format!("Game Over! Winner: {}", winner.to_string().to_uppercase())
                .green()
                .bold()
        ),
        None => println!("{}", "Game truncated without a winner.".yellow()),
    }
    println!("Days played: {}", summary.day_count);
    for (name, role) in &summary.final_roles {
        let status = if summary.alive_at_end.contains(name) {
            "alive".green()
        } else {
            "dead".red()
        };
        println!("  {:<12} {:<12} {}", name, role, status);
    }
    Ok(())
}
