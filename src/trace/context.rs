//! Run-scoped execution context: one tracker and one recorder per agent
//! run, reachable ambiently within the run's task scope.
//!
//! The context is task-local, never a process-wide singleton: concurrent
//! runs on the same runtime each see only their own tracker/recorder, and
//! sub-calls made inside [`scope`] inherit the same context. All ambient
//! accessors degrade to no-ops when no run is active: tracing is
//! best-effort and must never abort the host agent run.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::schema::{DataArtefact, ReasoningStep, StepKind};
use crate::visibility::{ArtefactInstance, RegisterToolResult, VisibilityTracker};

use super::{coerce_structured, StepDraft, TraceRecorder};

tokio::task_local! {
    static CURRENT_RUN: Arc<RunContext>;
}

/// Mutable state for one agent run.
///
/// Touched only by the single logical flow of control executing the run,
/// so the mutexes are uncontended; they exist to keep the shared handle
/// `Send + Sync` for spawned sub-tasks.
#[derive(Debug, Default)]
pub struct RunContext {
    tracker: Mutex<VisibilityTracker>,
    recorder: Mutex<TraceRecorder>,
}

/// Recover the guard even if a panic poisoned the lock; abandoned state is
/// still only read best-effort.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool result artefact and mark it visible.
    pub fn register_tool_result(&self, request: RegisterToolResult) -> ArtefactInstance {
        lock_unpoisoned(&self.tracker).register_tool_result(request)
    }

    /// Run a closure against the run's visibility tracker.
    pub fn with_tracker<R>(&self, f: impl FnOnce(&mut VisibilityTracker) -> R) -> R {
        f(&mut lock_unpoisoned(&self.tracker))
    }

    /// Append a step, snapshotting the currently visible artefact IDs.
    pub fn record_step(&self, draft: StepDraft) -> ReasoningStep {
        let visible = lock_unpoisoned(&self.tracker).snapshot_visible_ids();
        lock_unpoisoned(&self.recorder).append(draft, visible).clone()
    }

    /// Record raw model text generated outside tool calls.
    pub fn record_llm_output(&self, content: impl Into<String>) -> ReasoningStep {
        self.record_step(
            StepDraft::builder()
                .kind(StepKind::LlmOutput)
                .content(content)
                .build(),
        )
    }

    /// Record an intermediate model thought.
    pub fn record_thought(&self, content: impl Into<String>) -> ReasoningStep {
        self.record_step(
            StepDraft::builder()
                .kind(StepKind::Thought)
                .content(content)
                .build(),
        )
    }

    /// Record the terminal user-visible response.
    pub fn record_final_answer(&self, content: impl Into<String>) -> ReasoningStep {
        self.record_step(
            StepDraft::builder()
                .kind(StepKind::FinalAnswer)
                .content(content)
                .build(),
        )
    }

    /// Record a tool invocation request.
    pub fn record_action(&self, tool_name: &str, raw_input: &str) -> ReasoningStep {
        self.record_step(
            StepDraft::builder()
                .kind(StepKind::Action)
                .content(format!("Calling tool {tool_name}"))
                .tool_name(tool_name)
                .tool_input(coerce_structured(raw_input))
                .build(),
        )
    }

    /// Record a successful tool result.
    pub fn record_observation(
        &self,
        tool_name: &str,
        raw_input: &str,
        raw_output: &str,
    ) -> ReasoningStep {
        self.record_step(
            StepDraft::builder()
                .kind(StepKind::Observation)
                .content(raw_output)
                .tool_name(tool_name)
                .tool_input(coerce_structured(raw_input))
                .tool_output(coerce_structured(raw_output))
                .build(),
        )
    }

    /// Record a failed tool call.
    pub fn record_tool_error(
        &self,
        tool_name: &str,
        raw_input: &str,
        error: impl Into<String>,
    ) -> ReasoningStep {
        self.record_step(
            StepDraft::builder()
                .kind(StepKind::Observation)
                .content(format!("Tool {tool_name} raised an error."))
                .tool_name(tool_name)
                .tool_input(coerce_structured(raw_input))
                .error(error)
                .build(),
        )
    }

    /// Clone out the accumulated trace and data context for analysis.
    pub fn snapshot(&self) -> (Vec<ReasoningStep>, HashMap<String, DataArtefact>) {
        let trace = lock_unpoisoned(&self.recorder).steps().to_vec();
        let context = lock_unpoisoned(&self.tracker).data_context();
        (trace, context)
    }

    /// Consume the context, yielding the trace and data context.
    pub fn finish(self) -> (Vec<ReasoningStep>, HashMap<String, DataArtefact>) {
        let trace = self
            .recorder
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .into_steps();
        let context = self
            .tracker
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .data_context();
        (trace, context)
    }
}

/// Run a future with `context` as the ambient run context.
///
/// Everything awaited inside, including tool implementations and
/// callback handlers, can reach the context via [`current`] without it
/// being threaded through every call.
pub async fn scope<F>(context: Arc<RunContext>, future: F) -> F::Output
where
    F: Future,
{
    CURRENT_RUN.scope(context, future).await
}

/// The ambient run context, if a run is active in this task scope.
pub fn current() -> Option<Arc<RunContext>> {
    CURRENT_RUN.try_with(Arc::clone).ok()
}

/// Append a step to the ambient run's trace.
///
/// Silent no-op (returning `None`) when no run is active: tracing being
/// disabled must never raise.
pub fn record_step(draft: StepDraft) -> Option<ReasoningStep> {
    match current() {
        Some(context) => Some(context.record_step(draft)),
        None => {
            tracing::debug!("no active run context; reasoning step dropped");
            None
        }
    }
}

/// Register an artefact with the ambient run's tracker.
///
/// Silent no-op (returning `None`) when no run is active.
pub fn register_tool_result(request: RegisterToolResult) -> Option<ArtefactInstance> {
    match current() {
        Some(context) => Some(context.register_tool_result(request)),
        None => {
            tracing::debug!("no active run context; artefact registration dropped");
            None
        }
    }
}
