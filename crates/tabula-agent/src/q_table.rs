//! Tabular Q-learning
//!
//! [`QTable`] keeps one expected-return estimate per (state, action) pair in
//! a dense `state_dim x action_dim` table and learns it with the one-step
//! Q-learning update:
//!
//! ```text
//! target     = reward + discount_factor * max_a' Q[new_state, a']
//! Q[s, a]   += learning_rate * (target - Q[s, a])
//! ```
//!
//! Values are accumulated in double precision and never clipped; diverging
//! parameter combinations are the caller's concern.

use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use tabula_core::{argmax, Environment, Learner, RLError, Result, TrainRecord};

/// Hyper-parameters of a [`QTable`], each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QTableParams {
    /// Exploration rate, available to callers scheduling their own exploration
    pub exploration_rate: f64,
    /// Weight of the best next-state value in the update target
    pub discount_factor: f64,
    /// Step size towards the update target
    pub learning_rate: f64,
}

impl Default for QTableParams {
    fn default() -> Self {
        Self {
            exploration_rate: 0.5,
            discount_factor: 0.9,
            learning_rate: 0.1,
        }
    }
}

impl QTableParams {
    /// Fail with [`RLError::Configuration`] unless every parameter is in `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("exploration_rate", self.exploration_rate),
            ("discount_factor", self.discount_factor),
            ("learning_rate", self.learning_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RLError::Configuration(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Dense action-value table for discrete states and actions
#[derive(Debug, Clone)]
pub struct QTable {
    table: Array2<f64>,
    params: QTableParams,
    explore: bool,
    rng: StdRng,
}

impl QTable {
    /// Zero-initialized table seeded from system entropy
    pub fn new(state_dim: usize, action_dim: usize, params: QTableParams) -> Result<Self> {
        Self::with_rng(state_dim, action_dim, params, StdRng::from_entropy())
    }

    /// Zero-initialized table with a reproducible noise stream
    pub fn with_seed(
        state_dim: usize,
        action_dim: usize,
        params: QTableParams,
        seed: u64,
    ) -> Result<Self> {
        Self::with_rng(state_dim, action_dim, params, StdRng::seed_from_u64(seed))
    }

    /// Table sized from an environment's state and action domains.
    ///
    /// Both domains must be integer domains; states and actions are used as
    /// row and column indices directly.
    pub fn for_env<E: Environment>(env: &E, params: QTableParams) -> Result<Self> {
        let state_dim = env
            .states()
            .and_then(tabula_core::Domain::cardinality)
            .ok_or_else(|| {
                RLError::Unsupported("a Q-table needs a finite integer state domain".to_string())
            })?;
        let action_dim = env.actions().cardinality().ok_or_else(|| {
            RLError::Unsupported("a Q-table needs a finite integer action domain".to_string())
        })?;
        Self::new(state_dim, action_dim, params)
    }

    fn with_rng(
        state_dim: usize,
        action_dim: usize,
        params: QTableParams,
        rng: StdRng,
    ) -> Result<Self> {
        params.validate()?;
        if state_dim == 0 || action_dim == 0 {
            return Err(RLError::Configuration(format!(
                "Q-table dimensions must be positive, got {state_dim}x{action_dim}"
            )));
        }
        Ok(Self {
            table: Array2::zeros((state_dim, action_dim)),
            params,
            explore: true,
            rng,
        })
    }

    /// Number of states (rows)
    #[must_use]
    pub fn state_dim(&self) -> usize {
        self.table.nrows()
    }

    /// Number of actions (columns)
    #[must_use]
    pub fn action_dim(&self) -> usize {
        self.table.ncols()
    }

    /// Hyper-parameters
    #[must_use]
    pub fn params(&self) -> &QTableParams {
        &self.params
    }

    /// Read-only view of the whole table
    #[must_use]
    pub fn table(&self) -> ArrayView2<'_, f64> {
        self.table.view()
    }

    /// Whether [`Learner::act`] adds exploration noise (the default)
    #[must_use]
    pub fn explores(&self) -> bool {
        self.explore
    }

    /// Switch [`Learner::act`] between noisy and deterministic selection
    pub fn set_explore(&mut self, explore: bool) {
        self.explore = explore;
    }

    fn check_state(&self, state: usize) -> Result<()> {
        if state < self.state_dim() {
            Ok(())
        } else {
            Err(RLError::InvalidState(format!(
                "state {state} is outside a table of {} states",
                self.state_dim()
            )))
        }
    }

    fn check_action(&self, action: usize) -> Result<()> {
        if action < self.action_dim() {
            Ok(())
        } else {
            Err(RLError::InvalidAction(format!(
                "action {action} is outside a table of {} actions",
                self.action_dim()
            )))
        }
    }

    /// One Q-learning update from `record`.
    ///
    /// Returns the temporal-difference error `target - Q[state, action]`
    /// measured before the update.
    pub fn train(&mut self, record: &TrainRecord<usize, usize>) -> Result<f64> {
        let TrainRecord {
            state,
            action,
            new_state,
            reward,
        } = *record;
        self.check_state(state)?;
        self.check_action(action)?;

        let old_value = self.table[[state, action]];
        let max_future_reward = self.max_expected_reward_for_state(new_state)?;
        let td_error = reward + self.params.discount_factor * max_future_reward - old_value;
        self.table[[state, action]] += self.params.learning_rate * td_error;

        trace!(state, action, new_state, reward, td_error, "q-table update");
        Ok(td_error)
    }

    /// Pick an action for `state`.
    ///
    /// With `stochastic`, independent standard-normal noise is added to every
    /// action value before taking the argmax. This is the table's own
    /// exploration mechanism, separate from epsilon-greedy. Without it the
    /// argmax is deterministic, ties going to the lowest index.
    pub fn act(&mut self, state: usize, stochastic: bool) -> Result<usize> {
        self.check_state(state)?;
        let row = self.table.row(state);
        let best = if stochastic {
            let rng = &mut self.rng;
            argmax(
                row.iter()
                    .enumerate()
                    .map(|(action, &value)| (action, value + rng.sample::<f64, _>(StandardNormal)))
                    .collect::<Vec<_>>(),
            )
        } else {
            argmax(row.iter().copied().enumerate())
        };
        best.ok_or_else(|| RLError::InvalidState(format!("state {state} has no actions")))
    }

    /// Expected long-term reward of `action` in `state`
    pub fn state_action_value(&self, state: usize, action: usize) -> Result<f64> {
        self.check_state(state)?;
        self.check_action(action)?;
        Ok(self.table[[state, action]])
    }

    /// Largest action value in `state`
    pub fn max_expected_reward_for_state(&self, state: usize) -> Result<f64> {
        Ok(self
            .q_values(state)?
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max))
    }

    /// Every action value in `state`
    pub fn q_values(&self, state: usize) -> Result<ArrayView1<'_, f64>> {
        self.check_state(state)?;
        Ok(self.table.row(state))
    }
}

impl Learner<usize, usize> for QTable {
    fn act(&mut self, state: &usize) -> Result<usize> {
        let explore = self.explore;
        QTable::act(self, *state, explore)
    }

    fn train(&mut self, record: &TrainRecord<usize, usize>) -> Result<()> {
        QTable::train(self, record).map(|_| ())
    }
}
