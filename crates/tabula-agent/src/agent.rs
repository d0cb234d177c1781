//! MDP-bound agent with policy dispatch and reward bookkeeping

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::trace;

use tabula_core::{Mdp, RLError, Result, Scalar};

use crate::policy::{Policy, PolicyConfig, PolicyKind};

/// An agent acting on a shared MDP.
///
/// The MDP is shared, not owned: callers keep their own handle and may
/// inspect or drive it between decisions. The policy is fixed at
/// construction; only the reward history grows.
pub struct Agent<M: Mdp> {
    env: Rc<RefCell<M>>,
    policy: Policy<M>,
    reward_history: Vec<(Scalar, Vec<f64>)>,
    rng: StdRng,
}

impl<M: Mdp> Agent<M> {
    /// Create an agent seeded from system entropy
    pub fn new(env: Rc<RefCell<M>>, policy: Policy<M>) -> Self {
        Self::with_rng(env, policy, StdRng::from_entropy())
    }

    /// Create an agent with a reproducible random stream
    pub fn with_seed(env: Rc<RefCell<M>>, policy: Policy<M>, seed: u64) -> Self {
        Self::with_rng(env, policy, StdRng::seed_from_u64(seed))
    }

    /// Create an agent from a serializable policy configuration
    pub fn from_config(env: Rc<RefCell<M>>, config: &PolicyConfig) -> Result<Self> {
        Ok(Self::new(env, config.build()?))
    }

    fn with_rng(env: Rc<RefCell<M>>, policy: Policy<M>, rng: StdRng) -> Self {
        Self {
            env,
            policy,
            reward_history: Vec::new(),
            rng,
        }
    }

    /// Best action for the state the MDP is currently in, per the policy
    pub fn policy(&mut self) -> Result<Scalar> {
        let env = self.env.try_borrow().map_err(|_| {
            RLError::Environment("environment is mutably borrowed elsewhere".to_string())
        })?;
        let action = self.policy.decide(&*env, &mut self.rng)?;
        trace!(policy = %self.policy.kind(), %action, "action selected");
        Ok(action)
    }

    /// Choose an action, apply it to the MDP and record the reward
    pub fn step(&mut self) -> Result<(Scalar, f64)> {
        let action = self.policy()?;
        let (_, reward) = self
            .env
            .try_borrow_mut()
            .map_err(|_| RLError::Environment("environment is borrowed elsewhere".to_string()))?
            .transition(action)?;
        self.record(action, reward);
        Ok((action, reward))
    }

    /// History key for `action`: the value in the element type of the
    /// action domain, so `Real(2.0)` and `Integer(2)` share one entry
    fn key(&self, action: Scalar) -> Scalar {
        self.env
            .try_borrow()
            .ok()
            .and_then(|env| action.coerce_to(env.actions().element_type()))
            .unwrap_or(action)
    }

    /// Append a reward observed for `action`
    pub fn record(&mut self, action: Scalar, reward: f64) {
        let action = self.key(action);
        match self.reward_history.iter_mut().find(|(a, _)| *a == action) {
            Some((_, rewards)) => rewards.push(reward),
            None => self.reward_history.push((action, vec![reward])),
        }
    }

    /// Rewards recorded for `action`, oldest first
    #[must_use]
    pub fn reward_history(&self, action: Scalar) -> &[f64] {
        let action = self.key(action);
        self.reward_history
            .iter()
            .find(|(a, _)| *a == action)
            .map_or(&[][..], |(_, rewards)| rewards.as_slice())
    }

    /// Mean reward recorded for `action`.
    ///
    /// Fails with [`RLError::NoHistory`] when nothing was recorded for it.
    pub fn value(&self, action: Scalar) -> Result<f64> {
        let rewards = self.reward_history(action);
        if rewards.is_empty() {
            return Err(RLError::NoHistory(action.to_string()));
        }
        #[allow(clippy::cast_precision_loss)]
        let count = rewards.len() as f64;
        Ok(rewards.iter().sum::<f64>() / count)
    }

    /// Actions with recorded rewards, in first-seen order
    pub fn recorded_actions(&self) -> impl Iterator<Item = Scalar> + '_ {
        self.reward_history.iter().map(|(action, _)| *action)
    }

    /// Variant of the configured policy
    #[must_use]
    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    /// Shared handle to the MDP
    #[must_use]
    pub fn env(&self) -> Rc<RefCell<M>> {
        Rc::clone(&self.env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tabula_core::{ensure_action, Domain};

    /// Deterministic arms paying their index squared; arm 3 pays the most.
    struct Squares {
        actions: Domain,
        pulls: usize,
    }

    impl Squares {
        fn shared() -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self {
                actions: Domain::closed(0, 3).unwrap(),
                pulls: 0,
            }))
        }
    }

    impl Mdp for Squares {
        type State = usize;

        fn states(&self) -> Option<&Domain> {
            None
        }

        fn actions(&self) -> &Domain {
            &self.actions
        }

        fn current_state(&self) -> Option<&usize> {
            Some(&self.pulls)
        }

        fn transition(&mut self, action: Scalar) -> Result<(Option<usize>, f64)> {
            let reward = self.reward(action)?;
            self.pulls += 1;
            Ok((Some(self.pulls), reward))
        }

        fn reward(&self, action: Scalar) -> Result<f64> {
            ensure_action(self, action)?;
            Ok(action.as_f64().powi(2))
        }
    }

    #[test]
    fn greedy_picks_the_best_arm() {
        let mut agent = Agent::new(Squares::shared(), Policy::greedy());
        assert_eq!(agent.policy().unwrap(), Scalar::Integer(3));
    }

    #[test]
    fn epsilon_zero_matches_greedy() {
        let env = Squares::shared();
        let mut greedy = Agent::with_seed(Rc::clone(&env), Policy::greedy(), 1);
        let mut eps = Agent::with_seed(env, Policy::epsilon_greedy(0.0).unwrap(), 1);
        for _ in 0..200 {
            assert_eq!(eps.policy().unwrap(), greedy.policy().unwrap());
        }
    }

    #[test]
    fn epsilon_one_samples_uniformly() {
        let mut agent = Agent::with_seed(Squares::shared(), Policy::epsilon_greedy(1.0).unwrap(), 5);
        let trials = 8_000;
        let mut counts = [0_usize; 4];
        for _ in 0..trials {
            let action = agent.policy().unwrap();
            counts[action.as_index().unwrap()] += 1;
        }
        // Greedy would pick arm 3 every time; uniform gives ~2000 each.
        for count in counts {
            assert!((1_700..=2_300).contains(&count), "counts = {counts:?}");
        }
    }

    #[test]
    fn step_transitions_the_shared_mdp_and_records_history() {
        let env = Squares::shared();
        let mut agent = Agent::new(Rc::clone(&env), Policy::greedy());
        for _ in 0..3 {
            assert_eq!(agent.step().unwrap(), (Scalar::Integer(3), 9.0));
        }
        assert_eq!(env.borrow().pulls, 3);
        assert_eq!(agent.reward_history(Scalar::Integer(3)), &[9.0, 9.0, 9.0]);
        assert_relative_eq!(agent.value(Scalar::Integer(3)).unwrap(), 9.0);
    }

    #[test]
    fn value_averages_and_fails_without_history() {
        let mut agent = Agent::new(Squares::shared(), Policy::greedy());
        agent.record(Scalar::Integer(1), 1.0);
        agent.record(Scalar::Integer(1), 0.0);
        agent.record(Scalar::Integer(2), 4.0);
        assert_relative_eq!(agent.value(Scalar::Integer(1)).unwrap(), 0.5);
        assert!(matches!(
            agent.value(Scalar::Integer(0)),
            Err(RLError::NoHistory(_))
        ));
        let seen: Vec<Scalar> = agent.recorded_actions().collect();
        assert_eq!(seen, vec![Scalar::Integer(1), Scalar::Integer(2)]);
    }

    #[test]
    fn custom_policy_sees_the_mdp() {
        let env = Squares::shared();
        let mut agent = Agent::new(
            Rc::clone(&env),
            Policy::custom(|mdp: &Squares| Ok(Scalar::Integer(i64::try_from(mdp.pulls % 4).unwrap_or(0)))),
        );
        assert_eq!(agent.policy_kind(), PolicyKind::Custom);
        assert_eq!(agent.step().unwrap().0, Scalar::Integer(0));
        assert_eq!(agent.step().unwrap().0, Scalar::Integer(1));
    }

    #[test]
    fn real_and_integer_spellings_share_history() {
        let env = Squares::shared();
        let mut agent = Agent::new(
            Rc::clone(&env),
            Policy::custom(|_: &Squares| Ok(Scalar::Real(2.0))),
        );
        assert_eq!(agent.step().unwrap(), (Scalar::Real(2.0), 4.0));
        agent.record(Scalar::Integer(2), 0.0);
        assert_eq!(agent.reward_history(Scalar::Integer(2)), &[4.0, 0.0]);
        assert_eq!(agent.reward_history(Scalar::Real(2.0)), &[4.0, 0.0]);
        assert_relative_eq!(agent.value(Scalar::Real(2.0)).unwrap(), 2.0);
        let seen: Vec<Scalar> = agent.recorded_actions().collect();
        assert_eq!(seen, vec![Scalar::Integer(2)]);

        // Non-integral reals stay distinct from every integer action.
        agent.record(Scalar::Real(2.5), 1.0);
        assert_eq!(agent.reward_history(Scalar::Real(2.5)), &[1.0]);
        assert_eq!(agent.reward_history(Scalar::Integer(2)).len(), 2);
    }

    #[test]
    fn borrow_conflicts_are_errors() {
        let env = Squares::shared();
        let mut agent = Agent::new(Rc::clone(&env), Policy::greedy());
        let _guard = env.borrow_mut();
        assert!(matches!(agent.policy(), Err(RLError::Environment(_))));
    }

    #[test]
    fn invalid_configuration_fails_at_construction() {
        let config = PolicyConfig {
            policy: "boltzmann".to_string(),
            epsilon: None,
        };
        assert!(matches!(
            Agent::from_config(Squares::shared(), &config),
            Err(RLError::Configuration(_))
        ));
    }
}
