//! Example: epsilon-greedy agent on a Bernoulli bandit
//!
//! Run with: `cargo run -p tabula-env --example bandit_epsilon_greedy`

use std::cell::RefCell;
use std::rc::Rc;

use tabula_agent::{Agent, PolicyConfig};
use tabula_core::{config, Mdp, Scalar};
use tabula_env::{Bandit, BanditConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let bandit: BanditConfig = config::from_json_str(
        r#"{"n_arms": 5, "probabilities": [0.1, 0.3, 0.8, 0.5, 0.2], "seed": 42}"#,
    )?;
    let policy: PolicyConfig = config::from_json_str(r#"{"policy": "epsilon-greedy", "epsilon": 0.1}"#)?;

    let env = Rc::new(RefCell::new(Bandit::new(&bandit)?));
    let mut agent = Agent::from_config(Rc::clone(&env), &policy)?;

    let pulls = 5_000;
    let mut total = 0.0;
    for _ in 0..pulls {
        let (_, reward) = agent.step()?;
        total += reward;
    }
    info!(pulls, total, "finished pulling");

    let arms: Vec<Scalar> = env.borrow().actions().values()?.collect();
    for arm in arms {
        let count = agent.reward_history(arm).len();
        match agent.value(arm) {
            Ok(value) => println!("arm {arm}: {count:5} pulls, estimated payout {value:.3}"),
            Err(_) => println!("arm {arm}: never pulled"),
        }
    }
    println!(
        "best arm: {}, average reward: {:.3}",
        env.borrow().optimal_arm(),
        total / f64::from(pulls)
    );

    Ok(())
}
