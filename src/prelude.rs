//! Convenient re-exports of the most commonly used types.

pub use crate::analyzer::{analyze_trace, FailureAnalyzer};
pub use crate::detectors::{
    BehaviourConfig, DataLeakageConfig, IntentPolicy, IntentRule, KeywordIntentPolicy,
    SafetyDetectorConfig, ToolMisuseConfig,
};
pub use crate::error::{GlasswatchError, Result};
pub use crate::schema::{
    BehaviouralSignals, DataArtefact, FailureCategory, FailureCode, FailureSummary, FailureType,
    ReasoningStep, SensitivityLevel, Severity, StepKind,
};
pub use crate::trace::{RunContext, StepDraft, TraceRecorder};
pub use crate::visibility::{
    ArtefactInstance, ArtefactKind, DataSensitivity, RegisterToolResult, VisibilityTracker,
};
