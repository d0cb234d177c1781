//! Reference environments for tabula
//!
//! This crate provides small, fully specified problems to exercise the
//! learning loop:
//! - [`Bandit`]: stateless multi-armed Bernoulli bandit ([`tabula_core::Mdp`])
//! - [`FrozenLake`]: episodic grid world ([`tabula_core::Environment`])
//! - [`TimeLimit`]: caps episode length of any environment

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bandit;
pub mod frozen_lake;
pub mod wrappers;

// Re-export environments
pub use bandit::{Bandit, BanditConfig};
pub use frozen_lake::{FrozenLake, FrozenLakeConfig, MAP_4X4};
pub use wrappers::TimeLimit;

// Re-export core types
pub use tabula_core::{Environment, EnvironmentConfig, Mdp, Step, StepInfo};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Bandit, BanditConfig, FrozenLake, FrozenLakeConfig, TimeLimit};
    pub use tabula_core::prelude::*;
}
