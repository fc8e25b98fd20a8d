//! Learning mode decision logic

pub mod resolver;

pub use resolver::{LearnOutcome, LearningResolver};
