pub mod config;
pub mod moderator;
pub mod tags;
