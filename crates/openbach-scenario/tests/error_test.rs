// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error type tests for openbach-scenario.

use openbach_scenario::{OperationKind, ScenarioError, UnknownName};

#[test]
fn test_invalid_operator_display() {
    let err = ScenarioError::InvalidOperator {
        operator: "~".to_string(),
        reason: "expected one of =, !=".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "invalid operator '~': expected one of =, !="
    );
}

#[test]
fn test_payload_mismatch_display() {
    let err = ScenarioError::PayloadMismatch {
        expected: OperationKind::If,
        found: OperationKind::While,
    };
    let display = err.to_string();
    assert!(display.contains("payload mismatch"));
    assert!(display.contains("'if'"));
    assert!(display.contains("'while'"));
}

#[test]
fn test_foreign_operation_display() {
    let err = ScenarioError::ForeignOperation {
        scenario: "main".to_string(),
        index: 4,
    };
    assert_eq!(
        err.to_string(),
        "operation handle #4 does not belong to scenario 'main'"
    );
}

#[test]
fn test_unknown_reference_display() {
    let err = UnknownName("dst".to_string()).at(2);
    assert_eq!(
        err,
        ScenarioError::UnknownReference {
            name: "dst".to_string(),
            operation: 2
        }
    );
    assert_eq!(err.to_string(), "unknown reference '$dst' in operation #2");
}

#[test]
fn test_wait_cycle_display() {
    let err = ScenarioError::WaitCycle {
        cycle: vec![0, 2, 1, 0],
    };
    assert_eq!(
        err.to_string(),
        "wait cycle between operations #0 -> #2 -> #1 -> #0"
    );
}

#[test]
fn test_invalid_target_display() {
    let err = ScenarioError::InvalidTarget {
        operation: 5,
        target: 0,
        expected: OperationKind::StartJobInstance,
        found: OperationKind::Reboot,
    };
    let display = err.to_string();
    assert!(display.contains("#5"));
    assert!(display.contains("'start_job_instance'"));
    assert!(display.contains("#0 is 'reboot'"));
}

#[test]
fn test_reserved_job_name_display() {
    let err = ScenarioError::ReservedJobName {
        operation: 3,
        job: "offset".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "operation #3 starts job 'offset', which is a reserved payload key"
    );
}

#[test]
fn test_sub_scenario_display_includes_source() {
    let err = ScenarioError::SubScenario {
        name: "Reboot".to_string(),
        operation: 1,
        source: Box::new(ScenarioError::Unconfigured {
            operation: 0,
            kind: OperationKind::Reboot,
        }),
    };
    assert_eq!(
        err.to_string(),
        "sub-scenario 'Reboot' in operation #1: operation #0 (reboot) was never configured"
    );
}

#[test]
fn test_serialization_error_from_serde() {
    let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: ScenarioError = serde_err.into();
    assert!(matches!(err, ScenarioError::Serialization(_)));
    assert!(err.to_string().starts_with("serialization error"));
}

#[test]
fn test_errors_are_std_errors() {
    fn assert_error<E: std::error::Error + Send + Sync + 'static>() {}
    assert_error::<ScenarioError>();
    assert_error::<UnknownName>();
}
