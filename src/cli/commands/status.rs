//! Implementation of the `assay status` command.
//!
//! Renders a read-only snapshot of the last checkpoint. This is exactly
//! the consumer role the checkpoint wire format exists for: no solver
//! state is touched.

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::ports::CheckpointStore;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging;
use crate::infrastructure::persistence::JsonFileStore;

pub async fn execute(json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    logging::init(&config.logging);

    let store = JsonFileStore::new(&config.persistence.path);
    let Some(checkpoint) = store
        .load()
        .await
        .context("Failed to read checkpoint")?
    else {
        if json_mode {
            println!("{}", serde_json::json!({ "checkpoint": null }));
        } else {
            println!(
                "No checkpoint at {}. Run `assay run` to start a search.",
                config.persistence.path
            );
        }
        return Ok(());
    };

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&checkpoint)?);
        return Ok(());
    }

    let restored = checkpoint
        .restore(config.solver.num_options)
        .context("Checkpoint does not match the configured run shape")?;

    println!(
        "Best score: {}/{}   Confirmed: {}/{}   Trials: {}   Stuck counter: {}",
        restored.best.score,
        restored.model.num_slots(),
        restored.confirmed.confirmed_count(),
        restored.model.num_slots(),
        restored.total_trials,
        restored.stuck_counter,
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Slot",
        "Best option",
        "Confirmed",
        "Top probability",
        "Entropy",
    ]);

    for slot in 0..restored.model.num_slots() {
        let confidence = restored.model.confidence(slot)?;
        let confirmed = restored
            .confirmed
            .get(slot)
            .map_or_else(|| "-".to_string(), |option| option.to_string());
        table.add_row(vec![
            slot.to_string(),
            restored.best.answers.option(slot)?.to_string(),
            confirmed,
            format!("{:.2}", confidence.top_probability),
            format!("{:.2}", confidence.entropy_ratio),
        ]);
    }

    println!("{table}");
    Ok(())
}
