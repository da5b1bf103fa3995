//! Core data model: reasoning steps, data artefacts, failure findings.

pub mod artefact;
pub mod failure;
pub mod step;

pub use artefact::*;
pub use failure::*;
pub use step::*;

use std::collections::HashMap;

/// Best-effort decode of a reasoning trace from raw JSON.
///
/// Malformed entries are skipped with a warning rather than failing the
/// whole trace; analysis of the remaining steps proceeds normally.
pub fn trace_from_value(value: &serde_json::Value) -> Vec<ReasoningStep> {
    let Some(items) = value.as_array() else {
        tracing::warn!("reasoning trace is not an array; treating as empty");
        return Vec::new();
    };

    let mut steps = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match serde_json::from_value::<ReasoningStep>(item.clone()) {
            Ok(step) => steps.push(step),
            Err(error) => {
                tracing::warn!(index = idx, %error, "skipping malformed reasoning step");
            }
        }
    }
    steps
}

/// Best-effort decode of a data-artefact context from raw JSON.
///
/// Entries that do not deserialize as [`DataArtefact`] are skipped.
pub fn context_from_value(value: &serde_json::Value) -> HashMap<String, DataArtefact> {
    let Some(entries) = value.as_object() else {
        tracing::warn!("data context is not an object; treating as empty");
        return HashMap::new();
    };

    let mut context = HashMap::with_capacity(entries.len());
    for (id, item) in entries {
        match serde_json::from_value::<DataArtefact>(item.clone()) {
            Ok(artefact) => {
                context.insert(id.clone(), artefact);
            }
            Err(error) => {
                tracing::warn!(artefact_id = %id, %error, "skipping malformed data artefact");
            }
        }
    }
    context
}
