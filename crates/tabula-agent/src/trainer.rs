//! Episode-level training driver

use serde::{Deserialize, Serialize};
use tracing::info;

use tabula_core::{Environment, EnvironmentIterator, EpisodeSummary, IteratorConfig, Learner, Result};

/// Outcome of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Total reward of each episode, in order
    pub episode_rewards: Vec<f64>,
    /// Per-episode summaries
    pub episodes: Vec<EpisodeSummary>,
}

impl TrainingReport {
    /// Mean episode reward, zero for an empty run
    #[must_use]
    pub fn mean_reward(&self) -> f64 {
        if self.episode_rewards.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.episode_rewards.len() as f64;
        self.episode_rewards.iter().sum::<f64>() / count
    }

    /// Mean reward over the last `window` episodes
    #[must_use]
    pub fn recent_mean_reward(&self, window: usize) -> f64 {
        let start = self.episode_rewards.len().saturating_sub(window);
        let recent = &self.episode_rewards[start..];
        if recent.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = recent.len() as f64;
        recent.iter().sum::<f64>() / count
    }

    /// Episode with the highest total reward, earliest on ties
    #[must_use]
    pub fn best_episode(&self) -> Option<&EpisodeSummary> {
        self.episodes.iter().reduce(|best, episode| {
            if episode.total_reward > best.total_reward {
                episode
            } else {
                best
            }
        })
    }

    /// Steps taken across all episodes
    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.episodes.iter().map(|episode| episode.steps).sum()
    }
}

/// Runs a learner over a fixed number of episodes
#[derive(Debug)]
pub struct Trainer<L> {
    learner: L,
    config: IteratorConfig,
}

impl<L> Trainer<L> {
    /// Create a trainer
    pub fn new(learner: L, config: IteratorConfig) -> Self {
        Self { learner, config }
    }

    /// Drive `config.num_episodes` complete episodes of `env`, training the
    /// learner on every step
    pub fn train<E>(&mut self, env: E) -> Result<TrainingReport>
    where
        E: Environment,
        L: Learner<E::State, E::Action>,
    {
        info!(episodes = self.config.num_episodes, "training started");
        let mut iter = EnvironmentIterator::new(env, self.config.clone())?;
        iter.run(&mut self.learner)?;

        let report = TrainingReport {
            episode_rewards: iter.episode_rewards().to_vec(),
            episodes: iter.episodes().to_vec(),
        };
        info!(
            episodes = report.episode_rewards.len(),
            steps = report.total_steps(),
            mean_reward = report.mean_reward(),
            "training finished"
        );
        Ok(report)
    }

    /// The learner
    pub fn learner(&self) -> &L {
        &self.learner
    }

    /// Mutable access to the learner, e.g. to switch off exploration
    pub fn learner_mut(&mut self) -> &mut L {
        &mut self.learner
    }

    /// Consume the trainer, returning the learner
    pub fn into_learner(self) -> L {
        self.learner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tabula_core::{Domain, Step, TrainRecord};

    /// Walk right along a corridor of `len` cells; reaching the end pays 1
    struct Corridor {
        len: usize,
        position: usize,
        states: Domain,
        actions: Domain,
    }

    impl Corridor {
        fn new(len: usize) -> Self {
            Self {
                len,
                position: 0,
                states: Domain::closed(0, i64::try_from(len).unwrap() - 1).unwrap(),
                actions: Domain::closed(0, 1).unwrap(),
            }
        }
    }

    impl Environment for Corridor {
        type State = usize;
        type Action = usize;

        fn states(&self) -> Option<&Domain> {
            Some(&self.states)
        }

        fn actions(&self) -> &Domain {
            &self.actions
        }

        fn reset(&mut self) -> Result<usize> {
            self.position = 0;
            Ok(0)
        }

        fn step(&mut self, action: usize) -> Result<Step<usize>> {
            if action == 1 {
                self.position += 1;
            } else {
                self.position = self.position.saturating_sub(1);
            }
            let done = self.position + 1 == self.len;
            let reward = if done { 1.0 } else { 0.0 };
            Ok(Step::new(self.position, reward).done(done))
        }
    }

    struct AlwaysRight {
        trained: usize,
    }

    impl Learner<usize, usize> for AlwaysRight {
        fn act(&mut self, _state: &usize) -> Result<usize> {
            Ok(1)
        }

        fn train(&mut self, _record: &TrainRecord<usize, usize>) -> Result<()> {
            self.trained += 1;
            Ok(())
        }
    }

    #[test]
    fn trains_on_every_step_of_every_episode() {
        let mut trainer = Trainer::new(AlwaysRight { trained: 0 }, IteratorConfig::episodes(4));
        let report = trainer.train(Corridor::new(5)).unwrap();
        assert_eq!(report.episode_rewards, vec![1.0; 4]);
        assert_eq!(report.total_steps(), 16);
        assert_eq!(trainer.learner().trained, 16);
        assert_relative_eq!(report.mean_reward(), 1.0);
        assert_eq!(report.best_episode().map(|e| e.id), Some(1));
    }

    #[test]
    fn q_table_learns_the_corridor() {
        use crate::{QTable, QTableParams};

        let env = Corridor::new(6);
        let params = QTableParams {
            learning_rate: 0.5,
            ..QTableParams::default()
        };
        let table = QTable::with_seed(6, 2, params, 17).unwrap();
        assert_eq!(QTable::for_env(&env, params).unwrap().state_dim(), 6);
        let mut trainer = Trainer::new(table, IteratorConfig::episodes(500));
        trainer.train(env).unwrap();

        let table = trainer.learner_mut();
        table.set_explore(false);
        for state in 0..5 {
            assert_eq!(table.act(state, false).unwrap(), 1, "state {state}");
        }
    }

    #[test]
    fn empty_reports_are_neutral() {
        let report = TrainingReport {
            episode_rewards: vec![],
            episodes: vec![],
        };
        assert_relative_eq!(report.mean_reward(), 0.0);
        assert_relative_eq!(report.recent_mean_reward(10), 0.0);
        assert!(report.best_episode().is_none());
    }

    #[test]
    fn recent_mean_uses_the_tail() {
        let report = TrainingReport {
            episode_rewards: vec![0.0, 0.0, 1.0, 3.0],
            episodes: vec![],
        };
        assert_relative_eq!(report.recent_mean_reward(2), 2.0);
        assert_relative_eq!(report.recent_mean_reward(100), 1.0);
    }
}
