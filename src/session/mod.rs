//! Training session orchestration
//!
//! - `controller` - [`SessionController`], the turn state machine
//! - `scheduler` - [`EffectScheduler`], generation-tagged delayed effects

pub mod controller;
pub mod scheduler;

pub use controller::{SessionContext, SessionController, TurnOutcome, TurnPhase};
pub use scheduler::EffectScheduler;
