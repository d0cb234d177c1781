//! Agents and learners for tabula
//!
//! This crate provides the decision-making side of the learning loop:
//! - [`Agent`]: acts on a shared [`tabula_core::Mdp`] through a [`Policy`]
//!   and keeps a per-action reward history
//! - [`QTable`]: tabular Q-learning over discrete states and actions
//! - [`Trainer`]: runs any [`tabula_core::Learner`] over whole episodes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod policy;
pub mod q_table;
pub mod trainer;

// Re-export agents
pub use agent::Agent;
pub use q_table::{QTable, QTableParams};
pub use trainer::{Trainer, TrainingReport};

// Re-export policy components
pub use policy::{greedy_action, CustomPolicy, Epsilon, Policy, PolicyConfig, PolicyKind};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Agent, Policy, PolicyConfig, QTable, QTableParams, Trainer, TrainingReport};
    pub use tabula_core::prelude::*;
}
