//! Analyzer: runs every failure detector over one completed trace.

use std::collections::HashMap;

use crate::detectors::{
    detect_behaviour_failures, detect_data_leakage, detect_safety_violations,
    detect_tool_misuse, BehaviourConfig, DataLeakageConfig, SafetyDetectorConfig,
    ToolMisuseConfig,
};
use crate::schema::{BehaviouralSignals, DataArtefact, FailureSummary, FailureType, ReasoningStep};

/// Detector configuration bundle.
///
/// `analyze` is a pure function of its inputs: no I/O, no mutation, no
/// wall-clock reads beyond the timestamps already embedded in the steps.
/// Identical inputs produce byte-identical finding lists, order included.
#[derive(Debug, Default)]
pub struct FailureAnalyzer {
    pub safety: SafetyDetectorConfig,
    pub leakage: DataLeakageConfig,
    pub tool_misuse: ToolMisuseConfig,
    pub behaviour: BehaviourConfig,
}

impl FailureAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run all detectors over a single trace, in the fixed order safety,
    /// leakage, tool misuse, behaviour, preserving per-detector internal
    /// order.
    pub fn analyze(
        &self,
        trace_id: &str,
        reasoning_trace: &[ReasoningStep],
        data_context: &HashMap<String, DataArtefact>,
    ) -> FailureSummary {
        let safety = detect_safety_violations(reasoning_trace, &self.safety);
        let leakage = detect_data_leakage(reasoning_trace, data_context, &self.leakage);
        let tool_misuse = detect_tool_misuse(reasoning_trace, &self.tool_misuse);
        let behaviour = detect_behaviour_failures(reasoning_trace, &self.behaviour);

        let behavioural_signals = BehaviouralSignals {
            num_steps: reasoning_trace.len(),
            num_artefacts: data_context.len(),
            num_failures: safety.len() + leakage.len() + tool_misuse.len() + behaviour.len(),
            num_safety_failures: safety.len(),
            num_leakage_failures: leakage.len(),
            num_tool_misuse_failures: tool_misuse.len(),
            num_behaviour_failures: behaviour.len(),
        };

        let failure_types: Vec<FailureType> = safety
            .into_iter()
            .chain(leakage)
            .chain(tool_misuse)
            .chain(behaviour)
            .collect();

        if !failure_types.is_empty() {
            tracing::debug!(
                trace_id,
                num_failures = failure_types.len(),
                "trace analysis found failures"
            );
        }

        FailureSummary {
            trace_id: trace_id.to_string(),
            has_failure: !failure_types.is_empty(),
            failure_types,
            behavioural_signals,
        }
    }
}

/// Run all detectors with default configurations.
pub fn analyze_trace(
    trace_id: &str,
    reasoning_trace: &[ReasoningStep],
    data_context: &HashMap<String, DataArtefact>,
) -> FailureSummary {
    FailureAnalyzer::new().analyze(trace_id, reasoning_trace, data_context)
}
