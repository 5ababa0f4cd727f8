// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wire Schema Generation
//!
//! Generates the JSON Schema of the scenario document from the Rust type
//! definitions in `document.rs` using schemars.

use schemars::schema_for;
use serde_json::{Value, json};
use strum::IntoEnumIterator;

use crate::condition::BinaryOperator;
use crate::document::{ScenarioDocument, WIRE_FORMAT_VERSION};
use crate::operation::OperationKind;

/// Operand tags understood by the runtime.
pub const OPERAND_TYPES: [&str; 3] = ["value", "database", "statistic"];

/// Generate the scenario document schema with the operator and kind catalogs.
pub fn generate_wire_schema() -> Value {
    let schema = schema_for!(ScenarioDocument);
    let mut schema_json = serde_json::to_value(&schema).unwrap_or(Value::Null);

    if let Value::Object(ref mut map) = schema_json {
        map.insert("version".to_string(), json!(WIRE_FORMAT_VERSION));
        map.insert(
            "operationKinds".to_string(),
            json!(OperationKind::iter().map(|k| k.to_string()).collect::<Vec<_>>()),
        );
        map.insert(
            "conditionOperators".to_string(),
            json!(BinaryOperator::all_tags()),
        );
        map.insert("operandTypes".to_string(), json!(OPERAND_TYPES));
    }

    schema_json
}
