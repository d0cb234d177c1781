//! Core reinforcement learning traits and types for tabula
//!
//! This crate provides the foundational abstractions of the learning loop:
//! bounded [`Domain`]s, the [`Mdp`] and [`Environment`] contracts, the
//! [`Learner`] interface and the episode-driving [`EnvironmentIterator`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod domain;
pub mod environment;
pub mod error;
pub mod iterator;
pub mod learner;
pub mod mdp;

// Re-export core traits and types
pub use domain::{Boundary, Domain, DomainSpec, ElementType, Scalar};
pub use environment::{Environment, EnvironmentConfig, EpisodeSummary, Step, StepInfo};
pub use error::{RLError, Result};
pub use iterator::{EnvironmentIterator, IteratorConfig, StepHandle, StepOutcome};
pub use learner::{argmax, Learner, TrainRecord};
pub use mdp::{ensure_action, Mdp};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Domain, Environment, EnvironmentIterator, IteratorConfig, Learner, Mdp, Result, Scalar,
        Step, TrainRecord,
    };
}
