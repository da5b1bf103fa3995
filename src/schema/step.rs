//! Reasoning-trace step types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// What a single trace step represents.
///
/// `Action` is a tool invocation request; `Observation` is the
/// corresponding tool result or error; `LlmOutput` is raw model text
/// generated outside tool calls; `FinalAnswer` is the terminal
/// user-visible response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepKind {
    Thought,
    Action,
    Observation,
    LlmOutput,
    FinalAnswer,
}

impl StepKind {
    /// Whether a step of this kind carries text the end user could see.
    pub fn is_user_visible(self) -> bool {
        matches!(self, Self::LlmOutput | Self::FinalAnswer)
    }
}

/// One step in an agent's execution trace.
///
/// `step_index` is the canonical ordering: zero-based and contiguous in
/// the order steps were appended. `visible_data_ids` is a point-in-time
/// snapshot of the artefact IDs visible when the step was recorded, sorted
/// lexicographically and immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReasoningStep {
    pub id: String,
    pub step_index: usize,
    pub kind: StepKind,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub visible_data_ids: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ReasoningStep {
    /// Create a step with a fresh ID and the current wall-clock timestamp.
    pub fn new(step_index: usize, kind: StepKind, content: impl Into<String>) -> Self {
        Self {
            id: format!("step:{}:{}", step_index, Uuid::new_v4().simple()),
            step_index,
            kind,
            timestamp: now_epoch_seconds(),
            content: content.into(),
            tool_name: None,
            tool_input: None,
            tool_output: None,
            error: None,
            visible_data_ids: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach tool invocation details.
    pub fn with_tool(
        mut self,
        tool_name: impl Into<String>,
        tool_input: Option<serde_json::Value>,
        tool_output: Option<serde_json::Value>,
    ) -> Self {
        self.tool_name = Some(tool_name.into());
        self.tool_input = tool_input;
        self.tool_output = tool_output;
        self
    }

    /// Attach a tool failure message.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Override the recorded timestamp (epoch seconds).
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the visibility snapshot for this step, sorted for stable output.
    pub fn with_visible(mut self, mut ids: Vec<String>) -> Self {
        ids.sort();
        self.visible_data_ids = ids;
        self
    }

    /// Merge entries into the step's metadata bag.
    pub fn with_metadata(
        mut self,
        entries: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) -> Self {
        self.metadata.extend(entries);
        self
    }
}

/// Current wall-clock time as seconds since the Unix epoch.
pub fn now_epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
