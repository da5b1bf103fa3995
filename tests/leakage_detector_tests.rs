//! Data-leakage detector scenarios.

mod common;

use common::*;
use glasswatch::detectors::{detect_data_leakage, DataLeakageConfig};
use glasswatch::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn highly_sensitive_ssn_in_final_answer_is_high_with_artefact_path() {
    let ssn = artefact(
        "artefact:sql:1",
        json!({"ssn": "123-45-6789"}),
        SensitivityLevel::HighlySensitive,
    );
    let trace = vec![step(
        0,
        StepKind::FinalAnswer,
        "The SSN on file is 123-45-6789.",
    )
    .with_visible(vec!["artefact:sql:1".into()])];

    let failures = detect_data_leakage(&trace, &context_of(vec![ssn]), &Default::default());
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].code, FailureCode::DataLeakage);
    assert_eq!(failures[0].severity, Severity::High);
    assert!(failures[0].description.contains("artefact:sql:1:ssn"));
    assert_eq!(failures[0].step_ids, vec![trace[0].id.clone()]);
}

#[test]
fn sensitive_artefact_match_without_pii_is_medium() {
    let balance = artefact(
        "artefact:sql:2",
        json!({"note": "preferred customer tier gold"}),
        SensitivityLevel::Sensitive,
    );
    let trace = vec![step(
        0,
        StepKind::LlmOutput,
        "You are in the preferred customer tier gold bracket.",
    )
    .with_visible(vec!["artefact:sql:2".into()])];

    let failures = detect_data_leakage(&trace, &context_of(vec![balance]), &Default::default());
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].severity, Severity::Medium);
}

#[test]
fn high_severity_is_sticky_across_later_checks() {
    // A HIGHLY_SENSITIVE artefact hit first, then a merely SENSITIVE one:
    // the step severity must stay HIGH.
    let secret = artefact(
        "artefact:a",
        json!({"token": "zz-secret-token"}),
        SensitivityLevel::HighlySensitive,
    );
    let note = artefact(
        "artefact:b",
        json!({"note": "gold tier"}),
        SensitivityLevel::Sensitive,
    );
    let trace = vec![step(
        0,
        StepKind::FinalAnswer,
        "Use zz-secret-token; you are gold tier.",
    )
    .with_visible(vec!["artefact:a".into(), "artefact:b".into()])];

    let failures =
        detect_data_leakage(&trace, &context_of(vec![secret, note]), &Default::default());
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].severity, Severity::High);
}

#[test]
fn public_artefact_match_alone_stays_low() {
    let doc = artefact(
        "artefact:doc",
        json!({"headline": "rates unchanged this quarter"}),
        SensitivityLevel::Public,
    );
    let trace = vec![step(
        0,
        StepKind::FinalAnswer,
        "News: rates unchanged this quarter.",
    )
    .with_visible(vec!["artefact:doc".into()])];

    let failures = detect_data_leakage(&trace, &context_of(vec![doc]), &Default::default());
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].severity, Severity::Low);
}

#[test]
fn values_outside_length_window_are_ignored() {
    let tiny_and_huge = artefact(
        "artefact:x",
        json!({"pin": "12", "blob": "x".repeat(300)}),
        SensitivityLevel::HighlySensitive,
    );
    let trace = vec![
        step(0, StepKind::FinalAnswer, &format!("pin 12 blob {}", "x".repeat(300)))
            .with_visible(vec!["artefact:x".into()]),
    ];

    let failures = detect_data_leakage(
        &trace,
        &context_of(vec![tiny_and_huge]),
        &DataLeakageConfig::default(),
    );
    assert!(failures.is_empty());
}

#[test]
fn unregistered_artefact_ids_are_silently_skipped() {
    let trace = vec![step(0, StepKind::FinalAnswer, "Nothing sensitive here at all.")
        .with_visible(vec!["artefact:ghost".into()])];

    let failures = detect_data_leakage(&trace, &Default::default(), &Default::default());
    assert!(failures.is_empty());
}

#[test]
fn pii_pattern_without_artefacts_forces_high() {
    let trace = vec![step(
        0,
        StepKind::LlmOutput,
        "Reach me at jane.doe@example.com or 555-123-4567.",
    )];

    let failures = detect_data_leakage(&trace, &Default::default(), &Default::default());
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].severity, Severity::High);
    assert!(failures[0]
        .description
        .contains("email_address, phone_number"));
}

#[test]
fn leakage_probe_metadata_forces_high_when_leaks_observed() {
    let mut step = step(0, StepKind::FinalAnswer, "All good, nothing leaked here!");
    step.metadata.insert(
        "leakage_probe".to_string(),
        json!({"leaks": 2, "total": 5}),
    );

    let failures = detect_data_leakage(&[step], &Default::default(), &Default::default());
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].severity, Severity::High);
    assert!(failures[0]
        .description
        .contains("2 of 5 simulated attacks"));
}

#[test]
fn leakage_probe_with_zero_leaks_reports_but_stays_low() {
    let mut step = step(0, StepKind::FinalAnswer, "Everything held.");
    step.metadata.insert(
        "leak_probe".to_string(),
        json!({"num_leaks": 0, "num_attacks": 4}),
    );

    let failures = detect_data_leakage(&[step], &Default::default(), &Default::default());
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].severity, Severity::Low);
    assert!(failures[0].description.contains("0 of 4"));
}

#[test]
fn nested_payload_paths_appear_in_evidence() {
    let nested = artefact(
        "artefact:n",
        json!({"customer": {"contact": {"city": "Innsbruck"}}, "codes": ["alpha-1", "beta-2"]}),
        SensitivityLevel::HighlySensitive,
    );
    let trace = vec![step(0, StepKind::FinalAnswer, "They live in Innsbruck, code beta-2.")
        .with_visible(vec!["artefact:n".into()])];

    let failures = detect_data_leakage(&trace, &context_of(vec![nested]), &Default::default());
    assert_eq!(failures.len(), 1);
    assert!(failures[0]
        .description
        .contains("artefact:n:customer.contact.city"));
    assert!(failures[0].description.contains("artefact:n:codes[1]"));
}
