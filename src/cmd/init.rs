//! Database initialization command: `idea-playground init`.

use std::path::Path;

use anyhow::{Context, Result, bail};
use idea_playground::service::server::open_store;
use playground_common::DIMENSIONS_CONFIG_KEY;
use serde_json::Value;

/// Create the database at `db_path`. With `dimensions`, store that JSON
/// file as the dimensions registry.
pub fn cmd_init(db_path: &Path, dimensions: Option<&Path>) -> Result<()> {
    let registry = dimensions.map(read_registry).transpose()?;

    let handle = open_store(db_path)?;
    if let Some(registry) = registry {
        handle
            .lock_sync()?
            .set_config(DIMENSIONS_CONFIG_KEY, &registry)
            .context("Failed to store dimensions registry")?;
        println!("Dimensions registry stored");
    }

    println!("Idea database initialized at {}", db_path.display());
    Ok(())
}

fn read_registry(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    if !value.is_object() {
        bail!("{} must contain a JSON object", path.display());
    }
    Ok(value)
}
