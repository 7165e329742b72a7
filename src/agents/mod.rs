pub mod human;
pub mod rule;
pub mod scripted;

use crate::game::action::Action;
use crate::game::observation::Observation;

/// A decision maker for one seat. The driver shows each pending agent its
/// observation, then asks for exactly one action. Implementations never see
/// the game state directly.
pub trait Agent {
    fn observe(&mut self, observation: &Observation);
    fn act(&mut self) -> Action;
    /// Called between games when the same agent plays a batch.
    fn reset(&mut self) {}
}
