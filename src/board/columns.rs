use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ColumnError;

/// One board column: an inclusive readiness range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessColumn {
    /// Range key as written in the registry, e.g. `"3-4"`.
    pub key: String,
    pub title: String,
    /// `"Readiness 3-4"`.
    pub range_label: String,
    pub description: String,
    pub min_readiness: i64,
    pub max_readiness: i64,
}

impl ReadinessColumn {
    pub fn new(key: &str, description: &str, min_readiness: i64, max_readiness: i64) -> Self {
        Self {
            key: key.to_string(),
            title: column_title(key),
            range_label: format!("Readiness {}", key),
            description: description.to_string(),
            min_readiness,
            max_readiness,
        }
    }

    pub fn contains(&self, readiness: i64) -> bool {
        (self.min_readiness..=self.max_readiness).contains(&readiness)
    }
}

/// Display title for a range key. Unknown ranges get `Level {key}`.
pub fn column_title(key: &str) -> String {
    match key {
        "1-2" => "Research Phase".to_string(),
        "3-4" => "Concept Development".to_string(),
        "5-6" => "Implementation".to_string(),
        "7-8" => "Prototype".to_string(),
        "9-10" => "Ready to Deploy".to_string(),
        other => format!("Level {}", other),
    }
}

/// The five built-in columns covering readiness 1..=10.
pub fn default_columns() -> Vec<ReadinessColumn> {
    [
        ("1-2", "Research question only", 1, 2),
        ("3-4", "Concept defined, needs development", 3, 4),
        ("5-6", "Design complete, implementation started", 5, 6),
        ("7-8", "Working prototype/draft", 7, 8),
        ("9-10", "Ready to deploy/publish", 9, 10),
    ]
    .into_iter()
    .map(|(key, description, min, max)| ReadinessColumn::new(key, description, min, max))
    .collect()
}

fn parse_range(key: &str) -> Result<(i64, i64), ColumnError> {
    let invalid = || ColumnError::InvalidRange {
        range: key.to_string(),
    };
    let (min, max) = key.split_once('-').ok_or_else(invalid)?;
    let min: i64 = min.trim().parse().map_err(|_| invalid())?;
    let max: i64 = max.trim().parse().map_err(|_| invalid())?;
    if min > max {
        return Err(invalid());
    }
    Ok((min, max))
}

/// Derive columns from `dimensions_registry.core_dimensions.readiness.scale`.
///
/// Columns come back sorted by their lower bound. The ranges must be
/// contiguous and non-overlapping so every readiness between the first
/// minimum and the last maximum lands in exactly one column.
pub fn columns_from_registry(registry: &Value) -> Result<Vec<ReadinessColumn>, ColumnError> {
    let scale = registry
        .pointer("/dimensions_registry/core_dimensions/readiness/scale")
        .and_then(Value::as_object)
        .ok_or(ColumnError::MissingScale)?;
    if scale.is_empty() {
        return Err(ColumnError::EmptyScale);
    }

    let mut columns = Vec::with_capacity(scale.len());
    for (key, description) in scale {
        let (min, max) = parse_range(key)?;
        let description = description
            .as_str()
            .ok_or_else(|| ColumnError::InvalidDescription { range: key.clone() })?;
        columns.push(ReadinessColumn::new(key, description, min, max));
    }
    columns.sort_by_key(|c| c.min_readiness);

    for pair in columns.windows(2) {
        if pair[0].max_readiness.checked_add(1) != Some(pair[1].min_readiness) {
            return Err(ColumnError::NotContiguous {
                previous: pair[0].key.clone(),
                next: pair[1].key.clone(),
            });
        }
    }
    Ok(columns)
}

/// Columns from the registry, or the built-in defaults if it cannot be used.
pub fn resolve_columns(registry: &Value) -> Vec<ReadinessColumn> {
    match columns_from_registry(registry) {
        Ok(columns) => columns,
        Err(e) => {
            tracing::warn!(error = %e, "Falling back to default readiness columns");
            default_columns()
        }
    }
}
