//! Example: tabular Q-learning on FrozenLake
//!
//! Run with: `RUST_LOG=info cargo run -p tabula-env --example frozen_lake_q_learning`

use tabula_agent::{QTable, QTableParams, Trainer};
use tabula_core::{Environment, IteratorConfig};
use tabula_env::{FrozenLake, FrozenLakeConfig, TimeLimit};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let lake = FrozenLakeConfig {
        slippery: false,
        ..FrozenLakeConfig::default()
    };
    let env = TimeLimit::new(FrozenLake::new(&lake, Some(42))?, 100)?;

    let table = QTable::with_seed(16, 4, QTableParams::default(), 42)?;
    let config = IteratorConfig {
        num_episodes: 20_000,
        render: false,
        log_episodes: false,
    };
    let mut trainer = Trainer::new(table, config);
    let report = trainer.train(env)?;

    info!(
        mean_reward = report.mean_reward(),
        last_1000 = report.recent_mean_reward(1_000),
        steps = report.total_steps(),
        "training complete"
    );

    // Walk the learned greedy policy once.
    let mut table = trainer.into_learner();
    let mut env = TimeLimit::new(FrozenLake::new(&lake, Some(7))?, 100)?;
    let mut state = env.reset()?;
    let mut path = vec![state];
    loop {
        let action = table.act(state, false)?;
        let step = env.step(action)?;
        state = step.new_state;
        path.push(state);
        if step.done {
            println!("Greedy walk: {path:?} (reward {})", step.reward);
            break;
        }
    }

    for state in 0..16 {
        println!("state {state:2}: {:.3?}", table.q_values(state)?.to_vec());
    }

    Ok(())
}
