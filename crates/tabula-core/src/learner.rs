//! Learner contract and training records

use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One observed transition, the input of a single learning update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRecord<S, A> {
    /// State the action was taken in
    pub state: S,
    /// Action taken
    pub action: A,
    /// State reached
    pub new_state: S,
    /// Reward received
    pub reward: f64,
}

/// Something that picks actions and learns from the transitions they cause
pub trait Learner<S, A> {
    /// Select an action for `state`
    fn act(&mut self, state: &S) -> Result<A>;

    /// Learn from one transition
    fn train(&mut self, record: &TrainRecord<S, A>) -> Result<()>;
}

/// First item with the maximal value.
///
/// Ties resolve to the earliest item; NaN values never win against a number.
pub fn argmax<T, F: Float>(items: impl IntoIterator<Item = (T, F)>) -> Option<T> {
    let mut best: Option<(T, F)> = None;
    for (item, value) in items {
        let better = match &best {
            None => true,
            Some((_, current)) => value > *current || (current.is_nan() && !value.is_nan()),
        };
        if better {
            best = Some((item, value));
        }
    }
    best.map(|(item, _)| item)
}
