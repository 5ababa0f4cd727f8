// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for openbach-scenario.

use thiserror::Error;

use crate::operation::OperationKind;

/// Result type using ScenarioError.
pub type Result<T> = std::result::Result<T, ScenarioError>;

/// Errors raised while assembling or building a scenario.
///
/// `InvalidOperator` and `PayloadMismatch` are returned by the call that
/// caused them. Every other variant is only produced by
/// [`Scenario::build`](crate::Scenario::build), which never mutates the
/// scenario, so the caller can fix the problem and build again.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScenarioError {
    /// Condition operator is not part of the operator table.
    #[error("invalid operator '{operator}': {reason}")]
    InvalidOperator { operator: String, reason: String },

    /// Payload does not match the kind the operation was created with.
    #[error("payload mismatch: operation is '{expected}' but was configured as '{found}'")]
    PayloadMismatch {
        expected: OperationKind,
        found: OperationKind,
    },

    /// Operation handle belongs to another scenario.
    #[error("operation handle #{index} does not belong to scenario '{scenario}'")]
    ForeignOperation { scenario: String, index: usize },

    /// `$name` token declared neither as argument nor as constant.
    #[error("unknown reference '${name}' in operation #{operation}")]
    UnknownReference { name: String, operation: usize },

    /// Argument or constant name declared twice.
    #[error("duplicate {table} name '{name}'")]
    DuplicateName { table: &'static str, name: String },

    /// Operation lists itself in its own wait block.
    #[error("operation #{operation} waits on itself")]
    SelfWait { operation: usize },

    /// Wait references form a cycle.
    #[error("wait cycle between operations {}", format_ids(.cycle))]
    WaitCycle { cycle: Vec<usize> },

    /// Operation was added but never configured.
    #[error("operation #{operation} ({kind}) was never configured")]
    Unconfigured { operation: usize, kind: OperationKind },

    /// Stop operation targets an operation of the wrong kind.
    #[error(
        "operation #{operation} can only target '{expected}' operations, but #{target} is '{found}'"
    )]
    InvalidTarget {
        operation: usize,
        target: usize,
        expected: OperationKind,
        found: OperationKind,
    },

    /// Job name collides with a fixed key of the `start_job_instance` payload.
    #[error("operation #{operation} starts job '{job}', which is a reserved payload key")]
    ReservedJobName { operation: usize, job: String },

    /// Embedded sub-scenario failed to build.
    #[error("sub-scenario '{name}' in operation #{operation}: {source}")]
    SubScenario {
        name: String,
        operation: usize,
        source: Box<ScenarioError>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ScenarioError {
    fn from(err: serde_json::Error) -> Self {
        ScenarioError::Serialization(err.to_string())
    }
}

fn format_ids(ids: &[usize]) -> String {
    ids.iter()
        .map(|id| format!("#{}", id))
        .collect::<Vec<_>>()
        .join(" -> ")
}
