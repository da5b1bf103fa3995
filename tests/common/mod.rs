//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use glasswatch::prelude::*;

pub fn step(index: usize, kind: StepKind, content: &str) -> ReasoningStep {
    ReasoningStep::new(index, kind, content).with_timestamp(index as f64)
}

pub fn action(index: usize, tool: &str, input: serde_json::Value) -> ReasoningStep {
    step(index, StepKind::Action, &format!("Calling tool {tool}")).with_tool(
        tool,
        Some(input),
        None,
    )
}

pub fn observation(
    index: usize,
    tool: &str,
    input: serde_json::Value,
    output: &str,
) -> ReasoningStep {
    step(index, StepKind::Observation, output).with_tool(
        tool,
        Some(input),
        Some(serde_json::json!({ "raw": output })),
    )
}

pub fn failed_observation(
    index: usize,
    tool: &str,
    input: serde_json::Value,
    error: &str,
) -> ReasoningStep {
    step(index, StepKind::Observation, &format!("Tool {tool} raised an error."))
        .with_tool(tool, Some(input), None)
        .with_error(error)
}

pub fn artefact(
    id: &str,
    payload: serde_json::Value,
    sensitivity: SensitivityLevel,
) -> DataArtefact {
    DataArtefact::new(id, format!("tool:{id}"), payload, sensitivity)
}

pub fn context_of(artefacts: Vec<DataArtefact>) -> HashMap<String, DataArtefact> {
    artefacts
        .into_iter()
        .map(|a| (a.id.clone(), a))
        .collect()
}
