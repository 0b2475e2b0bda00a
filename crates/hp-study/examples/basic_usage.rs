//! Minimize a noisy parabola with server-side TPE sampling and median pruning.
//!
//! Needs a reachable server; the first run prompts for its address and an
//! API token and stores them in `~/.hopaasrc`.

use hp_study::{MedianPruner, Study, Suggestion, TpeSampler};

fn main() -> anyhow::Result<()> {
    let mut study = Study::builder("examples::x_squared")
        .property("x", Suggestion::uniform(-50.0, 50.0))
        .property("optimizer", Suggestion::categorical(["adam", "sgd"]))
        .property("epochs", 10)
        .sampler(TpeSampler::default().with_startup_trials(10))
        .pruner(MedianPruner::default())
        .connect()?;

    for _ in 0..5 {
        study.trial(|trial| -> anyhow::Result<()> {
            let x: f64 = trial.get_as("x")?;
            let epochs: i64 = trial.get_as("epochs")?;
            for epoch in 1..=epochs {
                trial.set_loss(x * x + 100.0 / epoch as f64);
                if trial.should_prune()? {
                    println!("trial {} pruned at step {}", trial.id(), trial.step());
                    break;
                }
            }
            Ok(())
        })?;
    }

    println!("best trial: {}", study.best_trial_id()?);
    for (id, trial) in study.trials() {
        println!("{id}: {:?} loss={:?}", trial.state, trial.loss);
    }
    Ok(())
}
