//! Markov Decision Process contract

use std::fmt::Debug;

use crate::{Domain, RLError, Result, Scalar};

/// A Markov Decision Process: bounded states and actions, a transition
/// function and a reward function.
///
/// `transition` and `reward` must agree: for the same action in the same
/// state they follow the same reward distribution. Implementors must accept
/// every value the [`Mdp::actions`] domain can produce.
pub trait Mdp {
    /// State type
    type State: Clone + Debug;

    /// The state space, if the process has one (stateless bandits do not)
    fn states(&self) -> Option<&Domain>;

    /// The action space
    fn actions(&self) -> &Domain;

    /// The state the process is currently in
    fn current_state(&self) -> Option<&Self::State>;

    /// Apply `action`, advancing the current state.
    ///
    /// Returns the new state (if the process has states) and the reward.
    fn transition(&mut self, action: Scalar) -> Result<(Option<Self::State>, f64)>;

    /// Reward for `action` from the current state, without changing it.
    ///
    /// Used for exhaustive lookahead by greedy action selection.
    fn reward(&self, action: Scalar) -> Result<f64>;

    /// Return the process to its initial state
    fn reset(&mut self) -> Result<Option<Self::State>> {
        Ok(self.current_state().cloned())
    }
}

/// Fail with [`RLError::InvalidAction`] unless `action` is in the action
/// domain of `mdp`
pub fn ensure_action<M: Mdp + ?Sized>(mdp: &M, action: Scalar) -> Result<()> {
    if mdp.actions().contains(action) {
        Ok(())
    } else {
        Err(RLError::InvalidAction(format!(
            "{action} is not in the action domain {}",
            mdp.actions()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        actions: Domain,
        position: i64,
    }

    impl Mdp for Counter {
        type State = i64;

        fn states(&self) -> Option<&Domain> {
            None
        }

        fn actions(&self) -> &Domain {
            &self.actions
        }

        fn current_state(&self) -> Option<&i64> {
            Some(&self.position)
        }

        fn transition(&mut self, action: Scalar) -> Result<(Option<i64>, f64)> {
            let reward = self.reward(action)?;
            self.position += action.as_i64().unwrap_or_default();
            Ok((Some(self.position), reward))
        }

        fn reward(&self, action: Scalar) -> Result<f64> {
            ensure_action(self, action)?;
            Ok(action.as_f64())
        }
    }

    #[test]
    fn reward_leaves_state_untouched() {
        let mut mdp = Counter {
            actions: Domain::closed(-1, 1).unwrap(),
            position: 0,
        };
        assert_eq!(mdp.reward(Scalar::Integer(1)).unwrap(), 1.0);
        assert_eq!(mdp.current_state(), Some(&0));

        let (state, reward) = mdp.transition(Scalar::Integer(1)).unwrap();
        assert_eq!(state, Some(1));
        assert_eq!(reward, 1.0);
        assert_eq!(mdp.reset().unwrap(), Some(1));
    }

    #[test]
    fn actions_outside_the_domain_are_rejected() {
        let mut mdp = Counter {
            actions: Domain::closed(-1, 1).unwrap(),
            position: 0,
        };
        assert!(matches!(
            mdp.transition(Scalar::Integer(2)),
            Err(RLError::InvalidAction(_))
        ));
        assert_eq!(mdp.current_state(), Some(&0));
    }
}
