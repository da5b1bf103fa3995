//! Tool-misuse detector scenarios.

mod common;

use common::*;
use glasswatch::detectors::{
    detect_tool_misuse, IntentPolicy, IntentRule, KeywordIntentPolicy, ToolMisuseConfig,
};
use glasswatch::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn distinct_identifiers_for_one_tool_flag_wrong_entity() {
    let trace = vec![
        action(0, "banking.get_account_balance", json!({"account_identifier": "acct-1"})),
        action(1, "banking.get_account_balance", json!({"account_identifier": "acct-2"})),
    ];

    let failures = detect_tool_misuse(&trace, &ToolMisuseConfig::default());
    let wrong_entity: Vec<_> = failures
        .iter()
        .filter(|f| f.code == FailureCode::ToolMisuseWrongEntity)
        .collect();

    assert_eq!(wrong_entity.len(), 1);
    assert_eq!(wrong_entity[0].severity, Severity::Medium);
    assert!(wrong_entity[0].description.contains("acct-1, acct-2"));
    assert_eq!(
        wrong_entity[0].step_ids,
        vec![trace[0].id.clone(), trace[1].id.clone()]
    );
}

#[test]
fn same_identifier_does_not_flag_wrong_entity() {
    let trace = vec![
        action(0, "banking.get_account_balance", json!({"account_identifier": "acct-1"})),
        action(1, "banking.get_account_balance", json!({"account_identifier": "acct-1"})),
    ];

    let failures = detect_tool_misuse(&trace, &ToolMisuseConfig::default());
    assert!(failures
        .iter()
        .all(|f| f.code != FailureCode::ToolMisuseWrongEntity));
}

#[test]
fn balance_intent_without_balance_tool_flags_wrong_tool() {
    let trace = vec![
        step(0, StepKind::LlmOutput, "The user wants their available balance."),
        action(1, "banking.recommend_products", json!({"customer_id": "c-1"})),
    ];

    let failures = detect_tool_misuse(&trace, &ToolMisuseConfig::default());
    let wrong_tool: Vec<_> = failures
        .iter()
        .filter(|f| f.code == FailureCode::ToolMisuseWrongTool)
        .collect();

    assert_eq!(wrong_tool.len(), 1);
    assert!(wrong_tool[0].description.contains("'balance'"));
    assert!(wrong_tool[0]
        .description
        .contains("banking.get_account_balance"));
    assert_eq!(wrong_tool[0].step_ids, vec![trace[1].id.clone()]);
}

#[test]
fn wrong_tool_fires_even_with_no_actions_at_all() {
    let trace = vec![step(
        0,
        StepKind::FinalAnswer,
        "I cannot look up transactions right now.",
    )];

    let failures = detect_tool_misuse(&trace, &ToolMisuseConfig::default());
    let wrong_tool: Vec<_> = failures
        .iter()
        .filter(|f| f.code == FailureCode::ToolMisuseWrongTool)
        .collect();

    assert_eq!(wrong_tool.len(), 1);
    assert!(wrong_tool[0].step_ids.is_empty());
}

#[test]
fn expected_tool_called_suppresses_wrong_tool() {
    let trace = vec![
        step(0, StepKind::LlmOutput, "Checking your balance now."),
        action(1, "banking.get_account_balance", json!({"account_identifier": "acct-1"})),
    ];

    let failures = detect_tool_misuse(&trace, &ToolMisuseConfig::default());
    assert!(failures
        .iter()
        .all(|f| f.code != FailureCode::ToolMisuseWrongTool));
}

#[test]
fn repeated_failures_with_same_input_flag_invalid_params() {
    let input = json!({"account_identifier": "acct-404"});
    let trace = vec![
        failed_observation(0, "banking.get_account_balance", input.clone(), "unknown account"),
        failed_observation(1, "banking.get_account_balance", input.clone(), "unknown account"),
    ];

    let failures = detect_tool_misuse(&trace, &ToolMisuseConfig::default());
    let invalid: Vec<_> = failures
        .iter()
        .filter(|f| f.code == FailureCode::ToolMisuseInvalidParams)
        .collect();

    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].severity, Severity::High);
    assert!(invalid[0].description.contains("occurrences=2"));
    assert_eq!(invalid[0].step_ids.len(), 2);
}

#[test]
fn error_markers_in_content_count_without_explicit_error_field() {
    let input = json!({"account_identifier": "acct-404"});
    let trace = vec![
        observation(0, "banking.get_account_balance", input.clone(), "Account not found"),
        observation(1, "banking.get_account_balance", input.clone(), "Account not found"),
    ];

    let failures = detect_tool_misuse(&trace, &ToolMisuseConfig::default());
    assert!(failures
        .iter()
        .any(|f| f.code == FailureCode::ToolMisuseInvalidParams));
}

#[test]
fn single_failure_is_not_enough_for_invalid_params() {
    let trace = vec![failed_observation(
        0,
        "banking.get_account_balance",
        json!({"account_identifier": "acct-404"}),
        "unknown account",
    )];

    let failures = detect_tool_misuse(&trace, &ToolMisuseConfig::default());
    assert!(failures
        .iter()
        .all(|f| f.code != FailureCode::ToolMisuseInvalidParams));
}

#[test]
fn different_inputs_failing_do_not_group_together() {
    let trace = vec![
        failed_observation(
            0,
            "banking.get_account_balance",
            json!({"account_identifier": "acct-a"}),
            "unknown account",
        ),
        failed_observation(
            1,
            "banking.get_account_balance",
            json!({"account_identifier": "acct-b"}),
            "unknown account",
        ),
    ];

    let failures = detect_tool_misuse(&trace, &ToolMisuseConfig::default());
    assert!(failures
        .iter()
        .all(|f| f.code != FailureCode::ToolMisuseInvalidParams));
}

#[test]
fn custom_keyword_rules_replace_banking_map() {
    let policy = KeywordIntentPolicy::new(vec![IntentRule::new(
        "weather",
        ["forecast", "rain"],
        ["weather.lookup"],
    )]);
    let config = ToolMisuseConfig {
        min_repeated_errors: 2,
        intent_policy: Box::new(policy),
    };

    let trace = vec![step(0, StepKind::LlmOutput, "Will it rain tomorrow?")];
    let failures = detect_tool_misuse(&trace, &config);

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].code, FailureCode::ToolMisuseWrongTool);
    assert!(failures[0].description.contains("weather.lookup"));
}

#[test]
fn fully_custom_policies_plug_into_the_detector() {
    struct FixedPolicy {
        expected: Vec<String>,
    }

    impl IntentPolicy for FixedPolicy {
        fn infer_intents(&self, _trace: &[ReasoningStep]) -> Vec<String> {
            vec!["escalation".to_string()]
        }

        fn expected_tools(&self, intent: &str) -> Option<&[String]> {
            (intent == "escalation").then_some(self.expected.as_slice())
        }
    }

    let config = ToolMisuseConfig {
        min_repeated_errors: 2,
        intent_policy: Box::new(FixedPolicy {
            expected: vec!["support.open_ticket".to_string()],
        }),
    };

    let trace = vec![step(0, StepKind::FinalAnswer, "done")];
    let failures = detect_tool_misuse(&trace, &config);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].description.contains("support.open_ticket"));
}
