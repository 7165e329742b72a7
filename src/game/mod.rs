pub mod action;
pub mod message;
pub mod observation;
pub mod phase;
pub mod player;
pub mod state;
