// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Validation tests: builder output is clean, hand-written documents are not.

use openbach_scenario::{
    OperationKind, Sample, ScenarioDocument, ValidationError, ValidationWarning,
    parse_scenario_document, validate_document,
};
use serde_json::{Value, json};
use strum::IntoEnumIterator;

fn function(id: usize, action: &str, payload: Value, launched: Value) -> Value {
    let mut function = json!({
        "id": id,
        "label": format!("#{}", id),
        "wait": {"time": 0, "launched_ids": launched, "finished_ids": []},
        "on_fail": {}
    });
    function[action] = payload;
    function
}

fn document(arguments: Value, functions: Vec<Value>) -> ScenarioDocument {
    parse_scenario_document(&json!({
        "name": "hand written",
        "description": "",
        "arguments": arguments,
        "constants": {},
        "openbach_functions": functions
    }))
    .unwrap()
}

#[test]
fn test_samples_validate_clean() {
    for sample in Sample::iter() {
        let built = sample.scenario().unwrap().build().unwrap();
        let result = validate_document(&built);
        assert!(result.is_ok(), "{}: {:?}", sample, result.errors);
        assert!(!result.has_warnings(), "{}: {:?}", sample, result.warnings);
    }
}

#[test]
fn test_built_document_survives_text_round_trip() {
    let scenario = openbach_scenario::samples::looping().unwrap();
    let text = scenario.to_json_string(true).unwrap();
    let parsed = ScenarioDocument::from_json_str(&text).unwrap();
    assert_eq!(parsed, scenario.build().unwrap());
    assert_eq!(parsed.function(1).unwrap().action.kind(), OperationKind::While);
}

#[test]
fn test_id_mismatch() {
    let doc = document(
        json!({}),
        vec![function(3, "reboot", json!({"entity_name": "Agent A"}), json!([]))],
    );
    let result = validate_document(&doc);
    assert!(
        result
            .errors
            .contains(&ValidationError::IdMismatch { position: 0, id: 3 })
    );
}

#[test]
fn test_unknown_reference_and_self_wait() {
    let doc = document(
        json!({}),
        vec![
            function(0, "reboot", json!({"entity_name": "Agent A"}), json!([0])),
            function(1, "stop_job_instance", json!({"openbach_function_id": 7}), json!([])),
        ],
    );
    let result = validate_document(&doc);
    assert!(result.has_errors());
    assert!(
        result
            .errors
            .contains(&ValidationError::SelfWait { function_id: 0 })
    );
    assert!(result.errors.iter().any(|e| matches!(
        e,
        ValidationError::UnknownFunction {
            function_id: 1,
            referenced_id: 7,
            ..
        }
    )));
}

#[test]
fn test_wait_cycle_detected() {
    let doc = document(
        json!({}),
        vec![
            function(0, "reboot", json!({"entity_name": "A"}), json!([1])),
            function(1, "reboot", json!({"entity_name": "B"}), json!([0])),
        ],
    );
    let result = validate_document(&doc);
    let cycle = result.errors.iter().find_map(|e| match e {
        ValidationError::WaitCycle { cycle } => Some(cycle.clone()),
        _ => None,
    });
    assert_eq!(cycle, Some(vec![0, 1, 0]));
    assert!(result.errors.iter().any(|e| e.to_string().starts_with("[E012]")));
}

#[test]
fn test_stop_target_kind_checked() {
    let doc = document(
        json!({}),
        vec![
            function(0, "reboot", json!({"entity_name": "A"}), json!([])),
            function(1, "stop_scenario_instance", json!({"openbach_function_id": 0}), json!([])),
        ],
    );
    let result = validate_document(&doc);
    assert!(result.errors.contains(&ValidationError::InvalidStopTarget {
        function_id: 1,
        target_id: 0,
        expected: OperationKind::StartScenarioInstance,
        found: OperationKind::Reboot,
    }));
}

#[test]
fn test_undeclared_token_and_unused_argument() {
    let doc = document(
        json!({"agent": "unused"}),
        vec![function(0, "reboot", json!({"entity_name": "$other"}), json!([]))],
    );
    let result = validate_document(&doc);
    assert!(result.errors.contains(&ValidationError::UndeclaredToken {
        function_id: 0,
        name: "other".to_string()
    }));
    assert!(result.warnings.contains(&ValidationWarning::UnusedArgument {
        name: "agent".to_string()
    }));
}

#[test]
fn test_empty_and_shared_bodies_warn() {
    let condition = json!({"type": "value", "value": true});
    let doc = document(
        json!({}),
        vec![
            function(
                0,
                "if",
                json!({
                    "condition": condition,
                    "openbach_functions_true": [2],
                    "openbach_functions_false": []
                }),
                json!([]),
            ),
            function(
                1,
                "while",
                json!({
                    "condition": condition,
                    "openbach_functions_while": [2],
                    "openbach_functions_end": []
                }),
                json!([]),
            ),
            function(2, "reboot", json!({"entity_name": "A"}), json!([])),
            function(
                3,
                "if",
                json!({
                    "condition": condition,
                    "openbach_functions_true": [],
                    "openbach_functions_false": []
                }),
                json!([]),
            ),
        ],
    );
    let result = validate_document(&doc);
    assert!(result.is_ok());
    assert!(result.warnings.contains(&ValidationWarning::SharedBody {
        function_id: 2,
        owners: vec![0, 1]
    }));
    assert!(result.warnings.contains(&ValidationWarning::EmptyBodies {
        function_id: 3,
        kind: OperationKind::If
    }));
}
