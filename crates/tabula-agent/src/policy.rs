//! Action-selection policies for MDP-bound agents
//!
//! A [`Policy`] is a tagged variant carrying its own configuration. It is
//! validated when it is built, so dispatch at decision time is a plain
//! exhaustive match.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use tabula_core::{argmax, Mdp, RLError, Result, Scalar};

/// Exploration probability, guaranteed to lie in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Epsilon(f64);

impl Epsilon {
    /// Validate an exploration probability.
    ///
    /// Fails with [`RLError::Precondition`] outside `[0, 1]` (NaN included).
    pub fn new(value: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RLError::Precondition(format!(
                "epsilon must lie in [0, 1], got {value}"
            )))
        }
    }

    /// The probability
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Epsilon {
    type Error = RLError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Epsilon {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

/// Names of the implemented policy variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Caller-supplied decision function
    Custom,
    /// Maximal one-step reward
    Greedy,
    /// Greedy with probability `1 - epsilon`, uniform otherwise
    EpsilonGreedy,
}

impl PolicyKind {
    /// Every implemented variant
    pub const ALL: [PolicyKind; 3] = [Self::Custom, Self::Greedy, Self::EpsilonGreedy];

    /// Configuration name of the variant
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Greedy => "greedy",
            Self::EpsilonGreedy => "epsilon-greedy",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = RLError;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|kind| kind.name()).collect();
                RLError::Configuration(format!(
                    "the policy {name} is not one of the implemented policies: {known:?}"
                ))
            })
    }
}

/// Caller-supplied decision function
pub type CustomPolicy<M> = Box<dyn Fn(&M) -> Result<Scalar>>;

/// How an agent picks its next action
pub enum Policy<M> {
    /// Evaluate `reward` for every action and take the first maximal one.
    ///
    /// Requires an enumerable (integer) action domain.
    Greedy,
    /// One Bernoulli draw per decision: with probability `epsilon` a
    /// uniformly sampled action, otherwise the greedy one
    EpsilonGreedy {
        /// Exploration probability
        epsilon: Epsilon,
    },
    /// Delegate to a function of the MDP; its result is not validated
    Custom(CustomPolicy<M>),
}

impl<M> Policy<M> {
    /// Greedy policy
    #[must_use]
    pub fn greedy() -> Self {
        Self::Greedy
    }

    /// Epsilon-greedy policy, failing for `epsilon` outside `[0, 1]`
    pub fn epsilon_greedy(epsilon: f64) -> Result<Self> {
        Ok(Self::EpsilonGreedy {
            epsilon: Epsilon::new(epsilon)?,
        })
    }

    /// Custom policy
    pub fn custom(decide: impl Fn(&M) -> Result<Scalar> + 'static) -> Self {
        Self::Custom(Box::new(decide))
    }

    /// Variant name
    #[must_use]
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Greedy => PolicyKind::Greedy,
            Self::EpsilonGreedy { .. } => PolicyKind::EpsilonGreedy,
            Self::Custom(_) => PolicyKind::Custom,
        }
    }
}

impl<M: Mdp> Policy<M> {
    /// Choose an action for the current state of `env`
    pub fn decide<R: Rng + ?Sized>(&self, env: &M, rng: &mut R) -> Result<Scalar> {
        match self {
            Self::Greedy => greedy_action(env),
            Self::EpsilonGreedy { epsilon } => {
                if rng.gen_bool(epsilon.value()) {
                    trace!(epsilon = epsilon.value(), "exploring");
                    env.actions()
                        .sample_with(1, rng)?
                        .pop()
                        .ok_or_else(|| RLError::EmptyDomain(env.actions().to_string()))
                } else {
                    greedy_action(env)
                }
            }
            Self::Custom(decide) => decide(env),
        }
    }
}

impl<M> fmt::Debug for Policy<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Greedy => f.write_str("Greedy"),
            Self::EpsilonGreedy { epsilon } => f
                .debug_struct("EpsilonGreedy")
                .field("epsilon", &epsilon.value())
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// The first action, in enumeration order, with maximal `reward`
pub fn greedy_action<M: Mdp + ?Sized>(env: &M) -> Result<Scalar> {
    let rewards = env
        .actions()
        .values()?
        .map(|action| env.reward(action).map(|reward| (action, reward)))
        .collect::<Result<Vec<_>>>()?;
    argmax(rewards).ok_or_else(|| RLError::EmptyDomain(env.actions().to_string()))
}

/// Serializable policy selection, e.g. `{"policy": "epsilon-greedy", "epsilon": 0.1}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Variant name: `greedy`, `epsilon-greedy` or `custom`
    pub policy: String,
    /// Exploration probability for `epsilon-greedy`
    #[serde(default)]
    pub epsilon: Option<f64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Greedy.name().to_string(),
            epsilon: None,
        }
    }
}

impl PolicyConfig {
    /// Build the configured policy.
    ///
    /// Unknown names and `custom` (which needs a function, not a config) fail
    /// with [`RLError::Configuration`]; `epsilon-greedy` without a valid
    /// epsilon fails with [`RLError::Precondition`].
    pub fn build<M>(&self) -> Result<Policy<M>> {
        match self.policy.parse::<PolicyKind>()? {
            PolicyKind::Greedy => Ok(Policy::Greedy),
            PolicyKind::EpsilonGreedy => {
                let epsilon = self.epsilon.ok_or_else(|| {
                    RLError::Precondition("provide epsilon for the epsilon-greedy policy".to_string())
                })?;
                Policy::epsilon_greedy(epsilon)
            }
            PolicyKind::Custom => Err(RLError::Configuration(
                "a custom policy needs a decision function; build it with Policy::custom".to_string(),
            )),
        }
    }
}
