//! Reasoning-trace accumulation for one agent run.
//!
//! [`TraceRecorder`] is the append-only step log; [`RunContext`] pairs it
//! with a [`VisibilityTracker`](crate::visibility::VisibilityTracker) and
//! makes both reachable ambiently within the run's task scope.

mod context;

pub use context::{current, record_step, register_tool_result, scope, RunContext};

use bon::Builder;

use crate::schema::{now_epoch_seconds, ReasoningStep, StepKind};
use uuid::Uuid;

/// Everything a caller supplies for a step; the recorder fills in the ID,
/// index, timestamp, and visibility snapshot.
#[derive(Debug, Clone, Builder)]
pub struct StepDraft {
    pub kind: StepKind,
    #[builder(into)]
    pub content: String,
    #[builder(into)]
    pub tool_name: Option<String>,
    pub tool_input: Option<serde_json::Value>,
    pub tool_output: Option<serde_json::Value>,
    #[builder(into)]
    pub error: Option<String>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Append-only log of [`ReasoningStep`] for one run.
#[derive(Debug, Clone, Default)]
pub struct TraceRecorder {
    steps: Vec<ReasoningStep>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    ///
    /// Assigns `step_index = current length`, a fresh unique ID, the
    /// wall-clock timestamp, and the supplied visibility snapshot. Entries
    /// are never removed.
    pub fn append(&mut self, draft: StepDraft, visible_ids: Vec<String>) -> &ReasoningStep {
        let step_index = self.steps.len();
        let mut visible = visible_ids;
        visible.sort();

        self.steps.push(ReasoningStep {
            id: format!("step:{}:{}", step_index, Uuid::new_v4().simple()),
            step_index,
            kind: draft.kind,
            timestamp: now_epoch_seconds(),
            content: draft.content,
            tool_name: draft.tool_name,
            tool_input: draft.tool_input,
            tool_output: draft.tool_output,
            error: draft.error,
            visible_data_ids: visible,
            metadata: draft.metadata.unwrap_or_default(),
        });

        self.steps.last().expect("step was just pushed")
    }

    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<ReasoningStep> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Total conversion from a raw tool input/output string to structured
/// key-value data.
///
/// Strings that parse as a JSON object pass through; everything else is
/// wrapped as `{"raw": <string>}` so downstream flattening always sees an
/// object.
pub fn coerce_structured(raw: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        _ => serde_json::json!({ "raw": raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_assigns_contiguous_indices() {
        let mut recorder = TraceRecorder::new();
        for i in 0..3 {
            let step = recorder.append(
                StepDraft::builder()
                    .kind(StepKind::Thought)
                    .content(format!("t{i}"))
                    .build(),
                vec![],
            );
            assert_eq!(step.step_index, i);
        }
        assert_eq!(recorder.len(), 3);
    }

    #[test]
    fn append_sorts_visibility_snapshot() {
        let mut recorder = TraceRecorder::new();
        let step = recorder.append(
            StepDraft::builder()
                .kind(StepKind::LlmOutput)
                .content("x")
                .build(),
            vec!["b".into(), "a".into()],
        );
        assert_eq!(step.visible_data_ids, vec!["a", "b"]);
    }

    #[test]
    fn coerce_keeps_json_objects() {
        assert_eq!(
            coerce_structured(r#"{"account_identifier": "acct-1"}"#),
            json!({"account_identifier": "acct-1"})
        );
    }

    #[test]
    fn coerce_wraps_everything_else() {
        assert_eq!(coerce_structured("plain text"), json!({"raw": "plain text"}));
        assert_eq!(coerce_structured("[1, 2]"), json!({"raw": "[1, 2]"}));
        assert_eq!(coerce_structured("42"), json!({"raw": "42"}));
    }
}
