use std::fs;

use anyhow::{Context, Result};
use msr_model::Operation;

use super::{boot_in_memory, load};

pub fn plan(config_paths: &[String]) -> Result<()> {
    let (loaded, settings) = load(config_paths)?;
    let ops = msr_config::boot_operations(&settings)?;
    println!("config_hash={}", loaded.config_hash);
    for op in &ops {
        println!("{op}");
    }
    println!("operations={}", ops.len());
    Ok(())
}

pub fn apply(config_paths: &[String], script: &str, composite: bool, reload: bool) -> Result<()> {
    let (_, settings) = load(config_paths)?;
    let raw = fs::read_to_string(script).with_context(|| format!("read script failed: {script}"))?;
    let ops: Vec<Operation> =
        serde_json::from_str(&raw).with_context(|| format!("parse script failed: {script}"))?;

    let mut controller = boot_in_memory(&settings)?;

    let outcomes = if composite {
        vec![controller
            .execute_composite(ops)
            .context("composite operation failed")?]
    } else {
        let mut outcomes = Vec::with_capacity(ops.len());
        for op in ops {
            let label = op.to_string();
            let outcome = controller
                .execute(op)
                .with_context(|| format!("operation failed: {label}"))?;
            outcomes.push(outcome);
        }
        outcomes
    };

    for outcome in &outcomes {
        for w in &outcome.warnings {
            println!("warning={w}");
        }
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&outcomes).context("serialize outcomes failed")?
    );

    if reload && controller.state() == msr_reconcile::ProcessState::ReloadRequired {
        controller.reload().context("reload failed")?;
        println!("reloaded=true");
    }
    println!("process_state={:?}", controller.state());
    Ok(())
}
