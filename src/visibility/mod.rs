//! Per-run registry of data artefacts and the set currently visible to
//! the agent.
//!
//! Intended usage: keep exactly one tracker per agent run (the
//! [`RunContext`](crate::trace::RunContext) does this). When a tool call
//! returns data, register one or more artefacts via
//! [`VisibilityTracker::register_tool_result`]; their IDs join the visible
//! set. Before each reasoning step, snapshot the visible IDs and attach
//! them to the step so the analysis layer can reconstruct visibility.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::schema::{DataArtefact, SensitivityLevel};

/// Tracker-internal sensitivity scale, ordered.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DataSensitivity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl DataSensitivity {
    /// Map to the analysis-side 4-value ordinal. Strictly monotone:
    /// `none < low < medium < high` maps onto
    /// `PUBLIC < INTERNAL < SENSITIVE < HIGHLY_SENSITIVE`.
    pub fn to_level(self) -> SensitivityLevel {
        match self {
            Self::None => SensitivityLevel::Public,
            Self::Low => SensitivityLevel::Internal,
            Self::Medium => SensitivityLevel::Sensitive,
            Self::High => SensitivityLevel::HighlySensitive,
        }
    }
}

/// High-level kind of data a tool produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtefactKind {
    UserMessage,
    RetrievedChunk,
    SqlRowset,
    HttpResponse,
    FileContents,
    ToolOutput,
    ModelOutput,
}

/// A registered artefact: provenance, classification, and payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtefactInstance {
    pub id: String,
    pub kind: ArtefactKind,
    /// Concrete tool name that produced the data, e.g. `"banking.sql_query"`.
    pub source_tool: String,
    pub sensitivity: DataSensitivity,
    /// Classifier tags, e.g. `["PII", "internal"]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Structured values that might leak into model output.
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields_sensitivity: BTreeMap<String, DataSensitivity>,
}

impl ArtefactInstance {
    /// Convert into the analysis-side [`DataArtefact`] shape.
    pub fn to_artefact(&self) -> DataArtefact {
        DataArtefact {
            id: self.id.clone(),
            source: format!("tool:{}", self.source_tool),
            payload: self.payload.clone(),
            sensitivity: self.sensitivity.to_level(),
            fields_sensitivity: self
                .fields_sensitivity
                .iter()
                .map(|(field, sensitivity)| (field.clone(), sensitivity.to_level()))
                .collect(),
        }
    }
}

/// Options for [`VisibilityTracker::register_tool_result`].
#[derive(Debug, Clone, Builder)]
pub struct RegisterToolResult {
    /// Concrete tool name (e.g. `"banking.get_account_balance"`).
    #[builder(into)]
    pub tool_name: String,
    pub kind: ArtefactKind,
    /// Sensitivity override; defaults to [`DataSensitivity::None`].
    pub sensitivity: Option<DataSensitivity>,
    pub tags: Option<Vec<String>>,
    /// Stable identifier; a salted synthetic ID is generated when omitted.
    #[builder(into)]
    pub artefact_id: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub fields_sensitivity: Option<BTreeMap<String, DataSensitivity>>,
}

/// Per-run registry mapping artefact ID to [`ArtefactInstance`], plus the
/// set of artefact IDs currently visible to the agent.
#[derive(Debug, Clone, Default)]
pub struct VisibilityTracker {
    artefacts: HashMap<String, ArtefactInstance>,
    visible: BTreeSet<String>,
}

impl VisibilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an artefact for a tool result, store it, and mark it visible.
    ///
    /// Pure in-memory creation; no failure modes. The returned instance is
    /// a copy of the registered record.
    pub fn register_tool_result(&mut self, request: RegisterToolResult) -> ArtefactInstance {
        let id = request
            .artefact_id
            .unwrap_or_else(|| format!("artefact:{}:{}", request.kind, Uuid::new_v4().simple()));

        let instance = ArtefactInstance {
            id: id.clone(),
            kind: request.kind,
            source_tool: request.tool_name,
            sensitivity: request.sensitivity.unwrap_or_default(),
            tags: request.tags.unwrap_or_default(),
            payload: request
                .payload
                .unwrap_or(serde_json::Value::Object(serde_json::Map::new())),
            fields_sensitivity: request.fields_sensitivity.unwrap_or_default(),
        };

        self.artefacts.insert(id.clone(), instance.clone());
        self.visible.insert(id);
        instance
    }

    /// Add existing artefact IDs to the visible set. Idempotent.
    pub fn mark_visible<I, S>(&mut self, artefact_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible.extend(artefact_ids.into_iter().map(Into::into));
    }

    /// Remove artefact IDs from the visible set. Hiding an ID that was
    /// never visible is a no-op.
    pub fn mark_hidden<I, S>(&mut self, artefact_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in artefact_ids {
            self.visible.remove(id.as_ref());
        }
    }

    /// Currently visible artefact IDs, lexicographically sorted.
    pub fn snapshot_visible_ids(&self) -> Vec<String> {
        self.visible.iter().cloned().collect()
    }

    /// Look up a registered artefact by ID.
    pub fn artefact(&self, artefact_id: &str) -> Option<&ArtefactInstance> {
        self.artefacts.get(artefact_id)
    }

    /// Number of registered artefacts.
    pub fn len(&self) -> usize {
        self.artefacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artefacts.is_empty()
    }

    /// Visible artefacts carrying the maximum sensitivity level.
    pub fn visible_high_sensitivity(&self) -> Vec<&ArtefactInstance> {
        self.visible
            .iter()
            .filter_map(|id| self.artefacts.get(id))
            .filter(|artefact| artefact.sensitivity == DataSensitivity::High)
            .collect()
    }

    /// Export the full registry as an analysis-side data context.
    pub fn data_context(&self) -> HashMap<String, DataArtefact> {
        self.artefacts
            .iter()
            .map(|(id, instance)| (id.clone(), instance.to_artefact()))
            .collect()
    }

    /// Write the current visibility snapshot into a metadata mapping under
    /// the `visible_data` key.
    pub fn attach_visible_to_metadata(
        &self,
        metadata: &mut serde_json::Map<String, serde_json::Value>,
    ) {
        metadata.insert(
            "visible_data".to_string(),
            serde_json::Value::from(self.snapshot_visible_ids()),
        );
    }

    /// Reconstruct a tracker from stored `visible_data` metadata.
    ///
    /// Only the visible IDs are restored; the artefact registry is empty,
    /// so detail lookups on the reconstructed tracker will not succeed.
    pub fn from_metadata(metadata: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut tracker = Self::new();
        if let Some(ids) = metadata.get("visible_data").and_then(|v| v.as_array()) {
            for value in ids {
                if let Some(id) = value.as_str() {
                    if !id.is_empty() {
                        tracker.visible.insert(id.to_string());
                    }
                }
            }
        }
        tracker
    }

    /// One line per visible artefact, for judge prompts and debug logs.
    pub fn describe_visible(&self) -> String {
        if self.visible.is_empty() {
            return "No artefacts are currently visible to the agent.".to_string();
        }

        let mut out = String::new();
        for (i, id) in self.visible.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            match self.artefacts.get(id) {
                Some(artefact) => {
                    let _ = write!(
                        out,
                        "- {}: kind={} (sensitivity={}",
                        artefact.id, artefact.kind, artefact.sensitivity
                    );
                    if !artefact.tags.is_empty() {
                        let _ = write!(out, "; tags=[{}]", artefact.tags.join(", "));
                    }
                    out.push(')');
                }
                None => {
                    let _ = write!(out, "- {id}");
                }
            }
        }
        out
    }
}
