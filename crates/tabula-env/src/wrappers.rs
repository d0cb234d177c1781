//! Environment wrappers

use tracing::trace;

use tabula_core::{Domain, Environment, RLError, Result, Step};

/// Time limit wrapper.
///
/// Ends an episode after `max_steps` steps, marking the final step as
/// truncated unless the inner environment ended the episode itself.
#[derive(Debug)]
pub struct TimeLimit<E> {
    env: E,
    max_steps: usize,
    steps: usize,
}

impl<E> TimeLimit<E> {
    /// Create a new time limit wrapper; `max_steps` must be positive
    pub fn new(env: E, max_steps: usize) -> Result<Self> {
        if max_steps == 0 {
            return Err(RLError::Configuration(
                "a time limit needs at least one step".to_string(),
            ));
        }
        Ok(Self {
            env,
            max_steps,
            steps: 0,
        })
    }

    /// Step limit per episode
    #[must_use]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Steps taken in the current episode
    #[must_use]
    pub fn elapsed(&self) -> usize {
        self.steps
    }

    /// Inner environment
    pub fn inner(&self) -> &E {
        &self.env
    }

    /// Unwrap the inner environment
    pub fn into_inner(self) -> E {
        self.env
    }
}

impl<E: Environment> Environment for TimeLimit<E> {
    type State = E::State;
    type Action = E::Action;

    fn states(&self) -> Option<&Domain> {
        self.env.states()
    }

    fn actions(&self) -> &Domain {
        self.env.actions()
    }

    fn reset(&mut self) -> Result<Self::State> {
        self.steps = 0;
        self.env.reset()
    }

    fn step(&mut self, action: Self::Action) -> Result<Step<Self::State>> {
        self.steps += 1;
        let mut step = self.env.step(action)?;

        if self.steps >= self.max_steps && !step.done {
            trace!(max_steps = self.max_steps, "episode truncated");
            step.truncated = true;
            step.done = true;
        }

        Ok(step)
    }

    fn render(&self) -> Result<()> {
        self.env.render()
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }
}
