//! Episode-driving control loop
//!
//! [`EnvironmentIterator`] runs a fixed number of complete episodes against
//! an [`Environment`]. Each step is a strict request/response pair:
//! [`EnvironmentIterator::begin_step`] hands out a [`StepHandle`], and the
//! caller answers it with exactly one action through
//! [`EnvironmentIterator::complete_step`] before the next step can begin.
//!
//! ```ignore
//! let mut iter = EnvironmentIterator::new(env, IteratorConfig::episodes(500))?;
//! while let Some(handle) = iter.begin_step()? {
//!     let action = table.act(*iter.current_state()?, true)?;
//!     let outcome = iter.complete_step(handle, action)?;
//!     table.train(&outcome.record())?;
//! }
//! println!("{:?}", iter.episode_rewards());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Environment, EpisodeSummary, Learner, RLError, Result, StepInfo, TrainRecord};

/// Configuration for an [`EnvironmentIterator`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IteratorConfig {
    /// Number of complete episodes to run
    pub num_episodes: usize,
    /// Call [`Environment::render`] before every step
    #[serde(default)]
    pub render: bool,
    /// Emit an `info` record at the end of every episode
    #[serde(default = "default_log_episodes")]
    pub log_episodes: bool,
}

static NEXT_ITERATOR_ID: AtomicU64 = AtomicU64::new(1);

fn default_log_episodes() -> bool {
    true
}

impl IteratorConfig {
    /// Run `num_episodes` episodes with default settings
    #[must_use]
    pub fn episodes(num_episodes: usize) -> Self {
        Self {
            num_episodes,
            ..Self::default()
        }
    }
}

impl Default for IteratorConfig {
    fn default() -> Self {
        Self {
            num_episodes: 1,
            render: false,
            log_episodes: default_log_episodes(),
        }
    }
}

/// Permission to submit one action for one step.
///
/// Not cloneable: it is consumed by [`EnvironmentIterator::complete_step`].
#[derive(Debug)]
#[must_use = "a begun step must be completed before the next one can begin"]
pub struct StepHandle {
    iterator_id: u64,
    episode_id: usize,
    index: usize,
}

impl StepHandle {
    /// Episode this step belongs to, starting at 1
    pub fn episode_id(&self) -> usize {
        self.episode_id
    }

    /// Step index within the episode, starting at 0
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Everything observed while completing one step
#[derive(Debug, Clone)]
pub struct StepOutcome<S, A> {
    /// Episode the step belonged to
    pub episode_id: usize,
    /// Step index within the episode
    pub index: usize,
    /// State the action was taken in
    pub state: S,
    /// Action submitted
    pub action: A,
    /// State reached
    pub new_state: S,
    /// Reward for this step
    pub reward: f64,
    /// Whether the step ended the episode
    pub done: bool,
    /// Whether the episode was cut short
    pub truncated: bool,
    /// Extra information from the environment
    pub info: StepInfo,
}

impl<S: Clone, A: Clone> StepOutcome<S, A> {
    /// The learning record for this step
    #[must_use]
    pub fn record(&self) -> TrainRecord<S, A> {
        TrainRecord {
            state: self.state.clone(),
            action: self.action.clone(),
            new_state: self.new_state.clone(),
            reward: self.reward,
        }
    }
}

/// Drives exactly `num_episodes` complete episodes.
///
/// Not restartable: once every episode has reached `done`,
/// [`begin_step`](Self::begin_step) keeps returning `None`.
pub struct EnvironmentIterator<E: Environment> {
    id: u64,
    env: E,
    config: IteratorConfig,
    episode_id: usize,
    episode_rewards: Vec<f64>,
    episodes: Vec<EpisodeSummary>,
    state: Option<E::State>,
    new_state: Option<E::State>,
    step_reward: Option<f64>,
    done: bool,
    total_episode_reward: f64,
    step_index: usize,
    episode_start: DateTime<Utc>,
    pending: Option<usize>,
    needs_reset: bool,
    finished: bool,
}

impl<E: Environment> EnvironmentIterator<E> {
    /// Create an iterator and reset the environment for the first episode
    pub fn new(env: E, config: IteratorConfig) -> Result<Self> {
        let mut iter = Self {
            id: NEXT_ITERATOR_ID.fetch_add(1, Ordering::Relaxed),
            env,
            episode_id: 0,
            episode_rewards: Vec::new(),
            episodes: Vec::new(),
            config,
            state: None,
            new_state: None,
            step_reward: None,
            done: false,
            total_episode_reward: 0.0,
            step_index: 0,
            episode_start: Utc::now(),
            pending: None,
            needs_reset: false,
            finished: false,
        };
        if iter.config.num_episodes == 0 {
            iter.finished = true;
        } else {
            iter.reset()?;
        }
        Ok(iter)
    }

    fn reset(&mut self) -> Result<()> {
        self.state = Some(self.env.reset()?);
        self.total_episode_reward = 0.0;
        self.episode_id += 1;
        self.new_state = None;
        self.step_reward = None;
        self.done = false;
        self.step_index = 0;
        self.episode_start = Utc::now();
        debug!(episode_id = self.episode_id, "environment reset");
        Ok(())
    }

    /// Request the next step.
    ///
    /// Returns `None` once all episodes are complete. Fails with
    /// [`RLError::Protocol`] while a previously begun step is outstanding.
    ///
    /// The first step of every episode after the first resets the
    /// environment. A failed reset is returned here and retried by the next
    /// call; the finished episode is never replayed.
    pub fn begin_step(&mut self) -> Result<Option<StepHandle>> {
        if let Some(index) = self.pending {
            return Err(RLError::Protocol(format!(
                "step {index} of episode {} was begun but never completed",
                self.episode_id
            )));
        }
        if self.finished {
            return Ok(None);
        }
        if self.needs_reset {
            self.reset()?;
            self.needs_reset = false;
        }
        if let Some(new_state) = &self.new_state {
            self.state = Some(new_state.clone());
        }
        if self.config.render {
            self.env.render()?;
        }
        self.pending = Some(self.step_index);
        Ok(Some(StepHandle {
            iterator_id: self.id,
            episode_id: self.episode_id,
            index: self.step_index,
        }))
    }

    /// Submit the action for a begun step and advance the environment.
    ///
    /// When the step ends the episode, its total reward is recorded and the
    /// next [`begin_step`](Self::begin_step) starts the following episode,
    /// if any remain.
    pub fn complete_step(
        &mut self,
        handle: StepHandle,
        action: E::Action,
    ) -> Result<StepOutcome<E::State, E::Action>> {
        match self.pending {
            Some(index)
                if handle.iterator_id == self.id
                    && handle.episode_id == self.episode_id
                    && handle.index == index => {}
            Some(_) => {
                return Err(RLError::Protocol(format!(
                    "handle for step {} of episode {} does not match the step in progress",
                    handle.index, handle.episode_id
                )))
            }
            None => {
                return Err(RLError::Protocol(
                    "no step in progress; call begin_step first".to_string(),
                ))
            }
        }
        self.pending = None;

        let state = self.current_state()?.clone();
        let step = self.env.step(action.clone())?;

        self.new_state = Some(step.new_state.clone());
        self.step_reward = Some(step.reward);
        self.done = step.done;
        self.total_episode_reward += step.reward;
        self.step_index += 1;

        let outcome = StepOutcome {
            episode_id: handle.episode_id,
            index: handle.index,
            state,
            action,
            new_state: step.new_state,
            reward: step.reward,
            done: step.done,
            truncated: step.truncated,
            info: step.info,
        };

        if step.done {
            self.finish_episode(step.truncated);
        }
        Ok(outcome)
    }

    fn finish_episode(&mut self, truncated: bool) {
        self.episode_rewards.push(self.total_episode_reward);
        self.episodes.push(EpisodeSummary {
            id: self.episode_id,
            total_reward: self.total_episode_reward,
            steps: self.step_index,
            truncated,
            start_time: self.episode_start,
            end_time: Utc::now(),
        });
        if self.config.log_episodes {
            info!(
                episode_id = self.episode_id,
                steps = self.step_index,
                reward = self.total_episode_reward,
                "episode finished"
            );
        }

        if self.episode_id < self.config.num_episodes {
            self.needs_reset = true;
        } else {
            self.finished = true;
        }
    }

    /// Run one full episode with `learner`, training it on every step.
    ///
    /// Returns the episode's total reward.
    pub fn run_episode<L>(&mut self, learner: &mut L) -> Result<f64>
    where
        L: Learner<E::State, E::Action>,
    {
        loop {
            let handle = self.begin_step()?.ok_or_else(|| {
                RLError::Protocol("all episodes have already completed".to_string())
            })?;
            let action = learner.act(self.current_state()?)?;
            let outcome = self.complete_step(handle, action)?;
            learner.train(&outcome.record())?;
            if outcome.done {
                return Ok(self.episode_rewards.last().copied().unwrap_or_default());
            }
        }
    }

    /// Run every remaining episode with `learner`
    pub fn run<L>(&mut self, learner: &mut L) -> Result<&[f64]>
    where
        L: Learner<E::State, E::Action>,
    {
        while !self.finished {
            self.run_episode(learner)?;
        }
        Ok(&self.episode_rewards)
    }

    /// State the next action will be taken in
    pub fn current_state(&self) -> Result<&E::State> {
        self.state
            .as_ref()
            .ok_or_else(|| RLError::Protocol("iterator has no current state".to_string()))
    }

    /// Current state, if an episode has started
    pub fn state(&self) -> Option<&E::State> {
        self.state.as_ref()
    }

    /// State reached by the last step of the current episode
    pub fn new_state(&self) -> Option<&E::State> {
        self.new_state.as_ref()
    }

    /// Reward of the last completed step
    pub fn step_reward(&self) -> Option<f64> {
        self.step_reward
    }

    /// Whether the last completed step ended its episode
    pub fn done(&self) -> bool {
        self.done
    }

    /// Number of episodes started
    pub fn episode_id(&self) -> usize {
        self.episode_id
    }

    /// Reward accumulated so far in the current episode
    pub fn total_episode_reward(&self) -> f64 {
        self.total_episode_reward
    }

    /// Total reward of every completed episode, in order
    pub fn episode_rewards(&self) -> &[f64] {
        &self.episode_rewards
    }

    /// Summaries of every completed episode, in order
    pub fn episodes(&self) -> &[EpisodeSummary] {
        &self.episodes
    }

    /// Whether every episode has completed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Configured number of episodes
    pub fn num_episodes(&self) -> usize {
        self.config.num_episodes
    }

    /// The driven environment
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Consume the iterator, returning the environment
    pub fn into_inner(self) -> E {
        self.env
    }
}
