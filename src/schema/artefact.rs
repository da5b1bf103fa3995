//! Data artefacts: tool-produced data with a sensitivity classification.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Sensitivity classification for an artefact, ordered by severity.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SensitivityLevel {
    Public,
    Internal,
    Sensitive,
    HighlySensitive,
}

/// A piece of data a tool produced, tracked independently of the trace
/// step that produced it so multiple steps can reference the same
/// artefact.
///
/// Created exactly once when a tool result is registered and never
/// mutated thereafter. The run's [`VisibilityTracker`] owns all artefact
/// instances; consumers only read by ID via `visible_data_ids`.
///
/// [`VisibilityTracker`]: crate::visibility::VisibilityTracker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataArtefact {
    pub id: String,
    /// Human-readable provenance tag, e.g. `"tool:banking.get_account_balance"`.
    pub source: String,
    /// Structured key-value data, the actual values that might leak.
    pub payload: serde_json::Value,
    pub sensitivity: SensitivityLevel,
    /// Per-field overrides for payloads with mixed-sensitivity fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields_sensitivity: BTreeMap<String, SensitivityLevel>,
}

impl DataArtefact {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        payload: serde_json::Value,
        sensitivity: SensitivityLevel,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            payload,
            sensitivity,
            fields_sensitivity: BTreeMap::new(),
        }
    }
}
