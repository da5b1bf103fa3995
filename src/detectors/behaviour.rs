//! Behaviour detector: timeouts, loops, missing final answers, and stuck
//! states.

use crate::schema::{FailureCode, FailureType, ReasoningStep, Severity, StepKind};

use super::{canonical_input, observation_error_text, truncate_chars, InsertionGroups};

/// Thresholds for the behaviour checks.
#[derive(Debug, Clone, Copy)]
pub struct BehaviourConfig {
    /// Elapsed trace duration (seconds) beyond which an unanswered run is
    /// a timeout.
    pub timeout_seconds: f64,
    /// Identical repetitions before a loop finding fires.
    pub loop_min_repetitions: usize,
    /// Repeated identical errors that, with no final answer, mean the
    /// agent is stuck.
    pub invalid_param_min_repetitions: usize,
}

impl Default for BehaviourConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 120.0,
            loop_min_repetitions: 3,
            invalid_param_min_repetitions: 2,
        }
    }
}

fn normalise_text(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn all_step_ids(trace: &[ReasoningStep]) -> Vec<String> {
    trace.iter().map(|s| s.id.clone()).collect()
}

/// Detect behavioural failures over a completed trace.
///
/// The timeout check is a passive judgment of wall-clock time already
/// recorded on the steps, not an active timer. An empty trace produces no
/// findings.
pub fn detect_behaviour_failures(
    trace: &[ReasoningStep],
    config: &BehaviourConfig,
) -> Vec<FailureType> {
    let mut failures = Vec::new();

    let (Some(first), Some(last)) = (trace.first(), trace.last()) else {
        return failures;
    };

    let has_final_answer = trace.iter().any(|s| s.kind == StepKind::FinalAnswer);

    // A. Timeout without a final answer.
    let duration = (last.timestamp - first.timestamp).max(0.0);
    if duration > config.timeout_seconds && !has_final_answer {
        failures.push(FailureType {
            code: FailureCode::BehaviourTimeout,
            severity: if duration > config.timeout_seconds * 2.0 {
                Severity::High
            } else {
                Severity::Medium
            },
            description: format!(
                "Trace duration {duration:.1}s exceeded timeout threshold ({:.0}s) without a final answer.",
                config.timeout_seconds
            ),
            step_ids: all_step_ids(trace),
        });
    }

    // B. Loops: identical tool calls, identical model outputs, repeated
    // identical errors.
    let mut action_groups: InsertionGroups<(String, String)> = InsertionGroups::new();
    let mut thought_groups: InsertionGroups<String> = InsertionGroups::new();
    let mut error_groups: InsertionGroups<(String, String)> = InsertionGroups::new();

    for step in trace {
        match step.kind {
            StepKind::Action => {
                let tool_name = step.tool_name.clone().unwrap_or_default();
                let key_input = canonical_input(step.tool_input.as_ref());
                action_groups.push((tool_name, key_input), step.id.clone());
            }
            StepKind::LlmOutput => {
                let content = normalise_text(&step.content);
                if !content.is_empty() {
                    thought_groups.push(content, step.id.clone());
                }
            }
            StepKind::Observation => {
                if let Some(error_text) = observation_error_text(step) {
                    let tool_name = step.tool_name.clone().unwrap_or_default();
                    error_groups.push((tool_name, error_text), step.id.clone());
                }
            }
            _ => {}
        }
    }

    for ((tool_name, _), step_ids) in action_groups.iter() {
        if step_ids.len() >= config.loop_min_repetitions {
            let shown_tool = if tool_name.is_empty() {
                "unknown"
            } else {
                tool_name.as_str()
            };
            failures.push(FailureType {
                code: FailureCode::BehaviourLoopTool,
                severity: Severity::Medium,
                description: format!(
                    "Identical tool call to {shown_tool} repeated {} times without evident progress.",
                    step_ids.len()
                ),
                step_ids: step_ids.clone(),
            });
        }
    }

    for (norm_text, step_ids) in thought_groups.iter() {
        if step_ids.len() >= config.loop_min_repetitions {
            failures.push(FailureType {
                code: FailureCode::BehaviourLoopThoughts,
                severity: Severity::Medium,
                description: format!(
                    "Identical model output/thought repeated {} times: {}",
                    step_ids.len(),
                    truncate_chars(norm_text, 160)
                ),
                step_ids: step_ids.clone(),
            });
        }
    }

    for ((tool_name, error_text), step_ids) in error_groups.iter() {
        if step_ids.len() >= config.loop_min_repetitions {
            let shown_tool = if tool_name.is_empty() {
                "unknown"
            } else {
                tool_name.as_str()
            };
            failures.push(FailureType {
                code: FailureCode::BehaviourLoopErrors,
                severity: Severity::High,
                description: format!(
                    "Repeated tool errors for {shown_tool}: '{}' occurred {} times.",
                    truncate_chars(error_text, 160),
                    step_ids.len()
                ),
                step_ids: step_ids.clone(),
            });
        }
    }

    // C. No final answer anywhere in the trace.
    if !has_final_answer {
        failures.push(FailureType {
            code: FailureCode::BehaviourNoFinalAnswer,
            severity: Severity::Medium,
            description: "Trace completed without a final_answer step.".to_string(),
            step_ids: all_step_ids(trace),
        });
    }

    // D. Stuck on invalid params: repeated errors plus no resolution.
    // Layered on top of the error-loop finding, not replacing it.
    let has_repeated_errors = error_groups
        .iter()
        .any(|(_, step_ids)| step_ids.len() >= config.invalid_param_min_repetitions);
    if has_repeated_errors && !has_final_answer {
        failures.push(FailureType {
            code: FailureCode::BehaviourStuckInvalidParams,
            severity: Severity::High,
            description:
                "Agent repeatedly called tools with invalid parameters and never produced a final answer."
                    .to_string(),
            step_ids: all_step_ids(trace),
        });
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalise_collapses_whitespace_and_case() {
        assert_eq!(normalise_text("  Check\n the  BALANCE "), "check the balance");
    }

    #[test]
    fn empty_trace_short_circuits() {
        assert!(detect_behaviour_failures(&[], &BehaviourConfig::default()).is_empty());
    }

    #[test]
    fn timeout_severity_doubles_at_twice_threshold() {
        let mk = |end: f64| {
            vec![
                ReasoningStep::new(0, StepKind::Thought, "start").with_timestamp(0.0),
                ReasoningStep::new(1, StepKind::Observation, "working").with_timestamp(end),
            ]
        };
        let config = BehaviourConfig::default();

        let medium = detect_behaviour_failures(&mk(121.0), &config);
        let timeout = medium
            .iter()
            .find(|f| f.code == FailureCode::BehaviourTimeout)
            .unwrap();
        assert_eq!(timeout.severity, Severity::Medium);

        let high = detect_behaviour_failures(&mk(241.0), &config);
        let timeout = high
            .iter()
            .find(|f| f.code == FailureCode::BehaviourTimeout)
            .unwrap();
        assert_eq!(timeout.severity, Severity::High);
    }

    #[test]
    fn final_answer_suppresses_timeout() {
        let trace = vec![
            ReasoningStep::new(0, StepKind::Thought, "start").with_timestamp(0.0),
            ReasoningStep::new(1, StepKind::FinalAnswer, "done").with_timestamp(500.0),
        ];
        let failures = detect_behaviour_failures(&trace, &BehaviourConfig::default());
        assert!(failures
            .iter()
            .all(|f| f.code != FailureCode::BehaviourTimeout));
    }
}
