// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! OpenBACH Scenario Builder
//!
//! Builds OpenBACH scenarios as in-memory graphs and serializes them into the
//! JSON document the controller consumes:
//! - [`Scenario`] holds named, parameterized operations in insertion order
//! - Operations wait on each other, branch on conditions and loop
//! - [`Scenario::build`] assigns dense ids, resolves references and
//!   substitutes constants, leaving `$argument` tokens for the runtime
//! - [`validate_document`] checks documents that did not come from the builder
//!
//! ```
//! use openbach_scenario::{OperationKind, Reboot, Scenario, Wait};
//!
//! let mut scenario = Scenario::new("Reboot", "Reboot one agent");
//! scenario.add_argument("agent", "Entity to reboot");
//! let reboot = scenario.add_operation(OperationKind::Reboot, Wait::new());
//! scenario.operation_mut(reboot)?.configure(Reboot::new("$agent"))?;
//!
//! let document = scenario.serialize()?;
//! assert_eq!(document["openbach_functions"][0]["reboot"]["entity_name"], "$agent");
//! # Ok::<(), openbach_scenario::ScenarioError>(())
//! ```

pub mod condition;
pub mod document;
pub mod error;
pub mod operation;
pub mod samples;
pub mod scenario;
pub mod schema;
pub mod token;
pub mod validation;

mod serializer;

pub use condition::{BinaryOperator, Condition, Expression, NOT_OPERATOR, Operand};
pub use document::{
    ActionDocument, FunctionDocument, ScenarioDocument, WIRE_FORMAT_VERSION, WaitDocument,
};
pub use error::{Result, ScenarioError};
pub use operation::{
    OnFail, Operation, OperationHandle, OperationKind, Payload, Reboot, StartJobInstance,
    StartScenarioInstance, SubScenario, Wait,
};
pub use samples::Sample;
pub use scenario::Scenario;
pub use schema::generate_wire_schema;
pub use token::{Declarations, Token, UnknownName};
pub use validation::{ValidationError, ValidationResult, ValidationWarning, validate_document};

// ============================================================================
// Parsing Functions
// ============================================================================

/// Parse a scenario document from a JSON value
pub fn parse_scenario_document(json: &serde_json::Value) -> std::result::Result<ScenarioDocument, String> {
    serde_json::from_value(json.clone()).map_err(|e| format!("Failed to parse scenario: {}", e))
}
