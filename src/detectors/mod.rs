//! Post-hoc failure detectors.
//!
//! Each detector is a pure, synchronous function over an immutable trace
//! snapshot: no I/O, no wall-clock reads, deterministic given identical
//! inputs, and safe to run in parallel across independent traces. Every
//! detector degrades gracefully on malformed input: a bad unit is
//! skipped, never an abort.

pub mod behaviour;
pub mod leakage;
pub mod safety;
pub mod tool_misuse;

pub use behaviour::{detect_behaviour_failures, BehaviourConfig};
pub use leakage::{detect_data_leakage, DataLeakageConfig};
pub use safety::{detect_safety_violations, SafetyDetectorConfig};
pub use tool_misuse::{
    detect_tool_misuse, IntentPolicy, IntentRule, KeywordIntentPolicy, ToolMisuseConfig,
};

use std::collections::HashMap;
use std::hash::Hash;

use crate::schema::ReasoningStep;

/// Content tokens that flag an observation as an error even when the
/// explicit `error` field is absent.
pub(crate) const ERROR_MARKERS: [&str; 4] = ["invalid", "unknown", "not found", "error"];

/// Steps whose content the end user could see.
pub(crate) fn user_visible_steps(
    trace: &[ReasoningStep],
) -> impl Iterator<Item = &ReasoningStep> {
    trace.iter().filter(|step| step.kind.is_user_visible())
}

/// Canonical serialization of a tool input for grouping keys.
///
/// serde_json's default map is BTreeMap-backed, so object keys serialize
/// sorted and the result is stable across runs. A missing input groups as
/// `"null"`.
pub(crate) fn canonical_input(input: Option<&serde_json::Value>) -> String {
    match input {
        Some(value) => serde_json::to_string(value).unwrap_or_else(|_| value.to_string()),
        None => "null".to_string(),
    }
}

/// Error text for an observation step: the explicit `error` field when
/// present, otherwise the first 200 chars of lowercased content when it
/// carries an error marker token.
pub(crate) fn observation_error_text(step: &ReasoningStep) -> Option<String> {
    if let Some(error) = &step.error {
        let trimmed = error.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    let lowered = step.content.to_lowercase();
    if ERROR_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        Some(truncate_chars(&lowered, 200))
    } else {
        None
    }
}

/// Char-boundary-safe prefix of at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Grouping that preserves first-appearance order of keys, so finding
/// order is append order rather than hash order.
pub(crate) struct InsertionGroups<K> {
    index: HashMap<K, usize>,
    groups: Vec<(K, Vec<String>)>,
}

impl<K: Eq + Hash + Clone> InsertionGroups<K> {
    pub(crate) fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, key: K, step_id: String) {
        match self.index.get(&key) {
            Some(&at) => self.groups[at].1.push(step_id),
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push((key, vec![step_id]));
            }
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &Vec<String>)> {
        self.groups.iter().map(|(key, ids)| (key, ids))
    }
}
