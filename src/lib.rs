//! Turn-based Mafia simulator for autonomous agents.
//!
//! The core is the orchestration engine: the phase state machine, turn-order
//! scheduling, night-action resolution, and the per-player observation model.
//! Decision-making lives behind the [`agents::Agent`] trait, so rule-based
//! bots, scripted harnesses, humans at a terminal, and LLM-backed players all
//! drive the same engine.

pub mod agents;
pub mod driver;
pub mod engine;
pub mod game;
pub mod roles;

/// Day counter. The game opens on night 0; each dawn increments it.
pub type Day = usize;
/// Turn counter within a single phase.
pub type Turn = usize;

/// Discussion turns each alive player gets before voting can begin.
pub const MIN_DISCUSSION_TURNS: usize = 2;
/// Question rounds a single player may initiate per day.
pub const QUESTION_ROUNDS_PER_DAY: usize = 3;
/// How many recent messages an observation carries.
pub const MESSAGE_WINDOW: usize = 20;
/// Default bound on driver steps before a game is truncated.
pub const MAX_STEPS: usize = 100;

/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}
