//! Environment traits and types

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Domain, Result};

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step<S> {
    /// State reached by the step
    pub new_state: S,
    /// Reward signal
    pub reward: f64,
    /// Whether the episode is done
    pub done: bool,
    /// Whether the episode was cut short (e.g., time limit)
    pub truncated: bool,
    /// Additional info from the environment
    pub info: StepInfo,
}

impl<S> Step<S> {
    /// A non-terminal step with no extra info
    pub fn new(new_state: S, reward: f64) -> Self {
        Self {
            new_state,
            reward,
            done: false,
            truncated: false,
            info: StepInfo::default(),
        }
    }

    /// Mark the step as ending the episode
    #[must_use]
    pub fn done(mut self, done: bool) -> Self {
        self.done = done;
        self
    }
}

/// Additional information from a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Custom fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StepInfo {
    /// Attach a field
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Summary of a completed episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Episode number, starting at 1
    pub id: usize,
    /// Total reward
    pub total_reward: f64,
    /// Number of steps
    pub steps: usize,
    /// Whether episode was truncated
    pub truncated: bool,
    /// Start time
    pub start_time: chrono::DateTime<chrono::Utc>,
    /// End time
    pub end_time: chrono::DateTime<chrono::Utc>,
}

/// Configuration for environments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Random seed
    pub seed: Option<u64>,
    /// Maximum episode steps
    pub max_steps: Option<usize>,
    /// Environment specific parameters
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl EnvironmentConfig {
    /// Decode the environment specific parameters into `T`
    pub fn params<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            self.params.clone(),
        ))?)
    }
}

/// Core environment trait.
///
/// The episodic counterpart of [`crate::Mdp`]: `reset` starts an episode and
/// `step` advances it until a step reports `done`. Bounding episode length is
/// the environment's responsibility.
pub trait Environment {
    /// State type
    type State: Clone + Debug;
    /// Action type
    type Action: Clone + Debug;

    /// Get the state space (if available)
    fn states(&self) -> Option<&Domain> {
        None
    }

    /// Get the action space
    fn actions(&self) -> &Domain;

    /// Reset the environment
    fn reset(&mut self) -> Result<Self::State>;

    /// Take a step in the environment
    fn step(&mut self, action: Self::Action) -> Result<Step<Self::State>>;

    /// Render the environment (optional)
    fn render(&self) -> Result<()> {
        Ok(())
    }

    /// Close the environment
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Params {
        size: usize,
        #[serde(default)]
        slippery: bool,
    }

    #[test]
    fn config_params_decode_from_flattened_fields() {
        let config: EnvironmentConfig =
            serde_json::from_str(r#"{"seed": 3, "size": 4, "slippery": true}"#).unwrap();
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.max_steps, None);
        assert_eq!(
            config.params::<Params>().unwrap(),
            Params {
                size: 4,
                slippery: true
            }
        );
    }

    #[test]
    fn missing_params_surface_as_serialization_errors() {
        let config = EnvironmentConfig::default();
        assert!(matches!(
            config.params::<Params>(),
            Err(crate::RLError::Serialization(_))
        ));
    }

    #[test]
    fn step_builder_sets_flags() {
        let step = Step::new(2_usize, 1.0).done(true);
        assert!(step.done);
        assert!(!step.truncated);
        assert_eq!(StepInfo::default().with("hole", true).fields.len(), 1);
    }
}
