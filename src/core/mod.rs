//! Core module - error taxonomy, settings and logging
//!
//! Infrastructure shared by every other module:
//!
//! - [`error`] - [`TrainerError`] and the [`TrainerResult`] alias
//! - [`settings_persistence`] - [`TrainerSettings`] loaded from the user config dir
//! - [`logging`] - tracing subscriber installation for the binary

pub mod error;
pub mod logging;
pub mod settings_persistence;

pub use error::{TrainerError, TrainerResult};
pub use settings_persistence::{TrainerSettings, TurnDelays};
