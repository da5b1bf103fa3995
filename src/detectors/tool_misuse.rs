//! Tool-misuse detector: inconsistent entity identifiers, missing
//! expected tool calls for the inferred intent, and repeated failing
//! calls with identical parameters.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::schema::{FailureCode, FailureType, ReasoningStep, Severity, StepKind};

use super::{canonical_input, observation_error_text, InsertionGroups};

/// Tool-input keys treated as entity identifiers.
const ENTITY_KEYS: [&str; 3] = ["account_identifier", "account_id", "customer_id"];

/// Maps coarse user intents to the tools expected to serve them.
///
/// The detector only knows intents as opaque strings; the policy decides
/// how they are inferred and which tools satisfy them, so domain-specific
/// keyword maps stay out of the detector itself.
pub trait IntentPolicy: Send + Sync {
    /// Infer coarse intents from early model output, deduplicated in
    /// order of first appearance.
    fn infer_intents(&self, trace: &[ReasoningStep]) -> Vec<String>;

    /// Tools expected for an intent; `None` when the policy has no
    /// expectation for it.
    fn expected_tools(&self, intent: &str) -> Option<&[String]>;
}

/// One keyword rule: any keyword present maps to the intent.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub intent: String,
    pub keywords: Vec<String>,
    pub expected_tools: Vec<String>,
}

impl IntentRule {
    pub fn new<I, K, T>(intent: I, keywords: K, expected_tools: T) -> Self
    where
        I: Into<String>,
        K: IntoIterator<Item = &'static str>,
        T: IntoIterator<Item = &'static str>,
    {
        Self {
            intent: intent.into(),
            keywords: keywords.into_iter().map(String::from).collect(),
            expected_tools: expected_tools.into_iter().map(String::from).collect(),
        }
    }
}

/// Keyword-based intent policy over the first three user-visible texts.
#[derive(Debug, Clone)]
pub struct KeywordIntentPolicy {
    rules: Vec<IntentRule>,
}

impl KeywordIntentPolicy {
    pub fn new(rules: Vec<IntentRule>) -> Self {
        Self { rules }
    }

    /// The retail-banking demo mapping.
    pub fn banking() -> Self {
        Self::new(vec![
            IntentRule::new(
                "balance",
                ["balance", "available"],
                ["banking.get_account_balance"],
            ),
            IntentRule::new(
                "transactions",
                ["transaction", "spend", "spending"],
                ["banking.get_recent_transactions"],
            ),
            IntentRule::new(
                "product",
                ["card", "product", "offer", "recommend"],
                ["banking.recommend_products"],
            ),
        ])
    }
}

impl IntentPolicy for KeywordIntentPolicy {
    fn infer_intents(&self, trace: &[ReasoningStep]) -> Vec<String> {
        let mut texts: Vec<String> = Vec::new();
        for step in trace {
            if step.kind.is_user_visible() {
                let content = step.content.trim();
                if !content.is_empty() {
                    texts.push(content.to_lowercase());
                }
            }
            if texts.len() >= 3 {
                break;
            }
        }

        if texts.is_empty() {
            return Vec::new();
        }
        let blob = texts.join("\n");

        self.rules
            .iter()
            .filter(|rule| rule.keywords.iter().any(|kw| blob.contains(kw.as_str())))
            .map(|rule| rule.intent.clone())
            .collect()
    }

    fn expected_tools(&self, intent: &str) -> Option<&[String]> {
        self.rules
            .iter()
            .find(|rule| rule.intent == intent)
            .map(|rule| rule.expected_tools.as_slice())
    }
}

/// Configuration for the tool-misuse detector.
pub struct ToolMisuseConfig {
    /// Minimum identical failing calls before `TOOL_MISUSE_INVALID_PARAMS`
    /// fires.
    pub min_repeated_errors: usize,
    pub intent_policy: Box<dyn IntentPolicy>,
}

impl Default for ToolMisuseConfig {
    fn default() -> Self {
        Self {
            min_repeated_errors: 2,
            intent_policy: Box::new(KeywordIntentPolicy::banking()),
        }
    }
}

impl fmt::Debug for ToolMisuseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolMisuseConfig")
            .field("min_repeated_errors", &self.min_repeated_errors)
            .field("intent_policy", &"..")
            .finish()
    }
}

/// Detect tool-misuse patterns from action/observation steps.
pub fn detect_tool_misuse(
    trace: &[ReasoningStep],
    config: &ToolMisuseConfig,
) -> Vec<FailureType> {
    let mut failures = Vec::new();

    let actions: Vec<&ReasoningStep> = trace
        .iter()
        .filter(|s| s.kind == StepKind::Action)
        .collect();
    let observations: Vec<&ReasoningStep> = trace
        .iter()
        .filter(|s| s.kind == StepKind::Observation)
        .collect();

    // A. Wrong entity: the same tool invoked with more than one distinct
    // identifier value.
    let mut per_tool_index: HashMap<&str, usize> = HashMap::new();
    let mut per_tool_entities: Vec<(&str, BTreeSet<String>)> = Vec::new();

    for step in &actions {
        let Some(tool_name) = step.tool_name.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };
        let Some(input) = step.tool_input.as_ref().and_then(|v| v.as_object()) else {
            continue;
        };

        let identifiers: Vec<String> = ENTITY_KEYS
            .iter()
            .filter_map(|key| input.get(*key)?.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect();
        if identifiers.is_empty() {
            continue;
        }

        let at = *per_tool_index.entry(tool_name).or_insert_with(|| {
            per_tool_entities.push((tool_name, BTreeSet::new()));
            per_tool_entities.len() - 1
        });
        per_tool_entities[at].1.extend(identifiers);
    }

    for (tool_name, values) in &per_tool_entities {
        if values.len() <= 1 {
            continue;
        }

        let step_ids: Vec<String> = actions
            .iter()
            .filter(|s| s.tool_name.as_deref() == Some(*tool_name))
            .map(|s| s.id.clone())
            .collect();
        failures.push(FailureType {
            code: FailureCode::ToolMisuseWrongEntity,
            severity: Severity::Medium,
            description: format!(
                "Tool {tool_name} was called with multiple distinct identifiers: {}",
                values.iter().cloned().collect::<Vec<_>>().join(", ")
            ),
            step_ids,
        });
    }

    // B. Wrong tool for the inferred intent.
    let intents = config.intent_policy.infer_intents(trace);
    let used_tools: HashSet<&str> = actions
        .iter()
        .filter_map(|s| s.tool_name.as_deref())
        .filter(|t| !t.is_empty())
        .collect();

    for intent in &intents {
        let Some(expected) = config.intent_policy.expected_tools(intent) else {
            continue;
        };
        if expected.is_empty() || expected.iter().any(|t| used_tools.contains(t.as_str())) {
            continue;
        }

        failures.push(FailureType {
            code: FailureCode::ToolMisuseWrongTool,
            severity: Severity::Medium,
            description: format!(
                "User intent appears to be '{intent}', but none of the expected tools were called: {}.",
                expected.join(", ")
            ),
            step_ids: actions.iter().map(|s| s.id.clone()).collect(),
        });
    }

    // C. Repeated invalid parameters: the same tool+input failing twice
    // or more.
    let mut error_groups: InsertionGroups<(String, String)> = InsertionGroups::new();
    for step in &observations {
        let Some(_error_text) = observation_error_text(step) else {
            continue;
        };
        let tool_name = step.tool_name.clone().unwrap_or_default();
        let key_input = canonical_input(step.tool_input.as_ref());
        error_groups.push((tool_name, key_input), step.id.clone());
    }

    for ((tool_name, _), step_ids) in error_groups.iter() {
        if step_ids.len() < config.min_repeated_errors {
            continue;
        }

        let shown_tool = if tool_name.is_empty() {
            "unknown"
        } else {
            tool_name.as_str()
        };
        failures.push(FailureType {
            code: FailureCode::ToolMisuseInvalidParams,
            severity: Severity::High,
            description: format!(
                "Tool {shown_tool} was called repeatedly with the same parameters that caused errors (occurrences={}).",
                step_ids.len()
            ),
            step_ids: step_ids.clone(),
        });
    }

    failures
}
