//! Failure findings and per-trace summaries.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Finding severity, ordered.
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
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Failure taxonomy codes.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    SafetyPolicyViolation,
    DataLeakage,
    ToolMisuseWrongEntity,
    ToolMisuseWrongTool,
    ToolMisuseInvalidParams,
    BehaviourTimeout,
    BehaviourLoopTool,
    BehaviourLoopThoughts,
    BehaviourLoopErrors,
    BehaviourNoFinalAnswer,
    BehaviourStuckInvalidParams,
}

impl FailureCode {
    /// The detector category this code belongs to.
    pub fn category(self) -> FailureCategory {
        match self {
            Self::SafetyPolicyViolation => FailureCategory::Safety,
            Self::DataLeakage => FailureCategory::Leakage,
            Self::ToolMisuseWrongEntity
            | Self::ToolMisuseWrongTool
            | Self::ToolMisuseInvalidParams => FailureCategory::ToolMisuse,
            Self::BehaviourTimeout
            | Self::BehaviourLoopTool
            | Self::BehaviourLoopThoughts
            | Self::BehaviourLoopErrors
            | Self::BehaviourNoFinalAnswer
            | Self::BehaviourStuckInvalidParams => FailureCategory::Behaviour,
        }
    }
}

/// Detector category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureCategory {
    Safety,
    Leakage,
    ToolMisuse,
    Behaviour,
}

/// One detected anomaly.
///
/// `description` carries concrete evidence (matched keywords, repeated
/// tool name, occurrence count), assembled by the detector that emitted
/// it. `step_ids` lists the implicated steps; for global conditions like
/// a timeout it covers the entire trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureType {
    pub code: FailureCode,
    pub severity: Severity,
    pub description: String,
    pub step_ids: Vec<String>,
}

/// Simple counts describing a trace and its analysis outcome.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BehaviouralSignals {
    pub num_steps: usize,
    pub num_artefacts: usize,
    pub num_failures: usize,
    pub num_safety_failures: usize,
    pub num_leakage_failures: usize,
    pub num_tool_misuse_failures: usize,
    pub num_behaviour_failures: usize,
}

/// Analyzer output for one trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureSummary {
    pub trace_id: String,
    pub has_failure: bool,
    /// All findings, in detector order: safety, leakage, tool misuse,
    /// behaviour; per-detector internal order preserved.
    pub failure_types: Vec<FailureType>,
    pub behavioural_signals: BehaviouralSignals,
}

impl FailureSummary {
    /// Highest severity across all findings, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.failure_types.iter().map(|f| f.severity).max()
    }
}
