//! Multi-armed Bernoulli bandit

use std::cell::RefCell;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, Distribution};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tabula_core::{ensure_action, Domain, Mdp, RLError, Result, Scalar};

/// Configuration for [`Bandit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BanditConfig {
    /// Number of arms, numbered `1..=n_arms`
    pub n_arms: usize,
    /// Payout probability of each arm; drawn uniformly from `[0, 1)` when absent
    pub probabilities: Option<Vec<f64>>,
    /// Random seed
    pub seed: Option<u64>,
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            n_arms: 2,
            probabilities: None,
            seed: None,
        }
    }
}

/// Stateless bandit: pulling arm `a` pays 1 with probability `p[a]`, else 0
#[derive(Debug)]
pub struct Bandit {
    actions: Domain,
    probabilities: Vec<f64>,
    arms: Vec<Bernoulli>,
    rng: RefCell<StdRng>,
}

impl Bandit {
    /// Create a bandit from its configuration
    pub fn new(config: &BanditConfig) -> Result<Self> {
        if config.n_arms == 0 {
            return Err(RLError::Configuration(
                "a bandit needs at least one arm".to_string(),
            ));
        }
        let mut rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        let probabilities = match &config.probabilities {
            Some(probabilities) if probabilities.len() != config.n_arms => {
                return Err(RLError::DimensionMismatch {
                    expected: config.n_arms,
                    actual: probabilities.len(),
                })
            }
            Some(probabilities) => probabilities.clone(),
            None => (0..config.n_arms).map(|_| rng.gen::<f64>()).collect(),
        };
        let arms = probabilities
            .iter()
            .map(|&p| {
                Bernoulli::new(p).map_err(|_| {
                    RLError::Configuration(format!("arm probability {p} is outside [0, 1]"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let n_arms = i64::try_from(config.n_arms)
            .map_err(|_| RLError::Configuration(format!("too many arms: {}", config.n_arms)))?;
        debug!(n_arms, ?probabilities, "bandit created");

        Ok(Self {
            actions: Domain::closed(1, n_arms)?,
            probabilities,
            arms,
            rng: RefCell::new(rng),
        })
    }

    /// Bandit with the given payout probabilities
    pub fn with_probabilities(probabilities: Vec<f64>, seed: Option<u64>) -> Result<Self> {
        Self::new(&BanditConfig {
            n_arms: probabilities.len(),
            probabilities: Some(probabilities),
            seed,
        })
    }

    /// Number of arms
    #[must_use]
    pub fn n_arms(&self) -> usize {
        self.arms.len()
    }

    /// Payout probability of each arm, arm 1 first
    #[must_use]
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Arm with the highest payout probability, lowest on ties
    #[must_use]
    pub fn optimal_arm(&self) -> Scalar {
        let index = tabula_core::argmax(self.probabilities.iter().copied().enumerate()).unwrap_or(0);
        Scalar::Integer(i64::try_from(index + 1).unwrap_or(i64::MAX))
    }

    fn arm(&self, action: Scalar) -> Result<&Bernoulli> {
        ensure_action(self, action)?;
        action
            .as_index()
            .and_then(|arm| arm.checked_sub(1))
            .and_then(|index| self.arms.get(index))
            .ok_or_else(|| RLError::InvalidAction(format!("{action} is not an arm")))
    }
}

impl Mdp for Bandit {
    type State = ();

    fn states(&self) -> Option<&Domain> {
        None
    }

    fn actions(&self) -> &Domain {
        &self.actions
    }

    fn current_state(&self) -> Option<&()> {
        None
    }

    fn transition(&mut self, action: Scalar) -> Result<(Option<()>, f64)> {
        Ok((None, self.reward(action)?))
    }

    fn reward(&self, action: Scalar) -> Result<f64> {
        let arm = self.arm(action)?;
        let mut rng = self
            .rng
            .try_borrow_mut()
            .map_err(|_| RLError::Environment("bandit random source is in use".to_string()))?;
        Ok(if arm.sample(&mut *rng) { 1.0 } else { 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn arms_are_numbered_from_one() {
        let bandit = Bandit::with_probabilities(vec![0.5, 0.5, 0.5], Some(1)).unwrap();
        assert_eq!(bandit.actions().to_string(), "[1, 3]");
        assert!(bandit.reward(Scalar::Integer(1)).is_ok());
        assert!(bandit.reward(Scalar::Integer(3)).is_ok());
        assert!(matches!(
            bandit.reward(Scalar::Integer(0)),
            Err(RLError::InvalidAction(_))
        ));
        assert!(matches!(
            bandit.reward(Scalar::Integer(4)),
            Err(RLError::InvalidAction(_))
        ));
    }

    #[test]
    fn rewards_follow_arm_probabilities() {
        let mut bandit = Bandit::with_probabilities(vec![0.0, 1.0, 0.3], Some(7)).unwrap();
        for _ in 0..100 {
            assert_eq!(bandit.reward(Scalar::Integer(1)).unwrap(), 0.0);
            assert_eq!(bandit.transition(Scalar::Integer(2)).unwrap(), (None, 1.0));
        }
        let pulls = 10_000;
        let hits: f64 = (0..pulls)
            .map(|_| bandit.reward(Scalar::Integer(3)).unwrap())
            .sum();
        assert_abs_diff_eq!(hits / f64::from(pulls), 0.3, epsilon = 0.03);
    }

    #[test]
    fn random_probabilities_are_reproducible() {
        let config = BanditConfig {
            n_arms: 5,
            probabilities: None,
            seed: Some(42),
        };
        let a = Bandit::new(&config).unwrap();
        let b = Bandit::new(&config).unwrap();
        assert_eq!(a.probabilities(), b.probabilities());
        assert_eq!(a.n_arms(), 5);
        assert!(a.probabilities().iter().all(|p| (0.0..1.0).contains(p)));
    }

    #[test]
    fn optimal_arm_is_one_based() {
        let bandit = Bandit::with_probabilities(vec![0.2, 0.7, 0.7, 0.1], None).unwrap();
        assert_eq!(bandit.optimal_arm(), Scalar::Integer(2));
    }

    #[test]
    fn invalid_configurations_fail() {
        assert!(matches!(
            Bandit::new(&BanditConfig {
                n_arms: 0,
                ..BanditConfig::default()
            }),
            Err(RLError::Configuration(_))
        ));
        assert!(matches!(
            Bandit::new(&BanditConfig {
                n_arms: 3,
                probabilities: Some(vec![0.5]),
                seed: None,
            }),
            Err(RLError::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        ));
        assert!(matches!(
            Bandit::with_probabilities(vec![0.5, 1.5], None),
            Err(RLError::Configuration(_))
        ));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: BanditConfig = serde_json::from_str(r#"{"probabilities": [0.1, 0.9]}"#).unwrap();
        assert_eq!(config.n_arms, 2);
        assert_eq!(Bandit::new(&config).unwrap().optimal_arm(), Scalar::Integer(2));
    }
}
