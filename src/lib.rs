//! Glasswatch: failure analysis for tool-using LLM agents.
//!
//! Captures a structured reasoning trace (thoughts, tool calls, tool
//! results, final answer) for one agent run, tracks which data artefacts
//! were visible to the agent at each step, and runs a battery of post-hoc
//! detectors over completed traces to flag safety violations, data
//! leakage, tool misuse, and behavioural anomalies.
//!
//! # Quick Start
//!
//! ```
//! use glasswatch::prelude::*;
//!
//! let trace = vec![ReasoningStep::new(0, StepKind::FinalAnswer, "All done.")];
//! let summary = glasswatch::analyzer::analyze_trace("trace-1", &trace, &Default::default());
//! assert!(!summary.has_failure);
//! ```
//!
//! During a live run, create a [`trace::RunContext`], enter it with
//! [`trace::scope`], and let tools register artefacts and record steps
//! through the ambient accessors. After the run, hand the accumulated
//! trace and data context to [`analyzer::analyze_trace`].

pub mod analyzer;
pub mod detectors;
pub mod error;
pub mod prelude;
pub mod schema;
pub mod trace;
pub mod visibility;
