// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
// Wire document types
//
// These types mirror the JSON consumed by the OpenBACH controller. The builder
// produces them, `parse_scenario_document` reads them back, and schemars
// derives the published JSON Schema from them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::time::Duration;

use crate::operation::{OnFail, OperationKind};

/// Wire format version - bump when making breaking changes
pub const WIRE_FORMAT_VERSION: &str = "2.0.0";

// ============================================================================
// Root
// ============================================================================

/// A built scenario, ready to be sent to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioDocument {
    /// Scenario name
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Launch-time arguments, name to description, in declaration order
    #[serde(default)]
    pub arguments: Map<String, Value>,

    /// Build-time constants, name to value, in declaration order
    #[serde(default)]
    pub constants: Map<String, Value>,

    /// Operations; `openbach_functions[i].id == i`
    #[serde(default)]
    pub openbach_functions: Vec<FunctionDocument>,
}

impl ScenarioDocument {
    /// Parse a document from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("Failed to parse scenario: {}", e))
    }

    /// Function with the given id, if any.
    pub fn function(&self, id: usize) -> Option<&FunctionDocument> {
        self.openbach_functions.iter().find(|f| f.id == id)
    }
}

/// One operation of the scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FunctionDocument {
    /// Position of the operation in `openbach_functions`
    pub id: usize,

    /// Human-readable label, `#<id>` unless customized
    pub label: String,

    /// Kind-specific payload, keyed by the kind name
    #[serde(flatten)]
    pub action: ActionDocument,

    /// Scheduling dependencies
    #[serde(default)]
    pub wait: WaitDocument,

    /// Failure policy, always empty
    #[serde(default)]
    pub on_fail: OnFailDocument,
}

/// Scheduling dependencies of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WaitDocument {
    /// Delay in seconds applied once the references are satisfied
    #[schemars(with = "f64")]
    pub time: Number,

    /// Ids that must have been launched
    #[serde(default)]
    pub launched_ids: Vec<usize>,

    /// Ids that must have finished
    #[serde(default)]
    pub finished_ids: Vec<usize>,
}

impl Default for WaitDocument {
    fn default() -> Self {
        Self {
            time: Number::from(0),
            launched_ids: Vec::new(),
            finished_ids: Vec::new(),
        }
    }
}

impl WaitDocument {
    /// Every referenced id, launched first.
    pub fn referenced_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.launched_ids
            .iter()
            .chain(self.finished_ids.iter())
            .copied()
    }
}

/// Failure policy block. Reserved; always `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OnFailDocument {}

impl From<OnFail> for OnFailDocument {
    fn from(_: OnFail) -> Self {
        OnFailDocument {}
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Payload of a function, externally tagged by its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionDocument {
    StartJobInstance(StartJobInstanceDocument),
    StopJobInstance(StopFunctionDocument),
    StopJobInstances(StopFunctionsDocument),
    StartScenarioInstance(StartScenarioInstanceDocument),
    StopScenarioInstance(StopFunctionDocument),
    Reboot(RebootDocument),
    If(IfDocument),
    While(WhileDocument),
}

impl ActionDocument {
    /// Kind of the payload.
    pub fn kind(&self) -> OperationKind {
        match self {
            ActionDocument::StartJobInstance(_) => OperationKind::StartJobInstance,
            ActionDocument::StopJobInstance(_) => OperationKind::StopJobInstance,
            ActionDocument::StopJobInstances(_) => OperationKind::StopJobInstances,
            ActionDocument::StartScenarioInstance(_) => OperationKind::StartScenarioInstance,
            ActionDocument::StopScenarioInstance(_) => OperationKind::StopScenarioInstance,
            ActionDocument::Reboot(_) => OperationKind::Reboot,
            ActionDocument::If(_) => OperationKind::If,
            ActionDocument::While(_) => OperationKind::While,
        }
    }

    /// Ids of the operations a stop payload targets.
    pub fn target_ids(&self) -> Vec<usize> {
        match self {
            ActionDocument::StopJobInstance(stop) | ActionDocument::StopScenarioInstance(stop) => {
                vec![stop.openbach_function_id]
            }
            ActionDocument::StopJobInstances(stop) => stop.openbach_function_ids.clone(),
            _ => vec![],
        }
    }

    /// Branch/loop bodies as `(first, second)`, for `if` and `while`.
    pub fn bodies(&self) -> Option<(&[usize], &[usize])> {
        match self {
            ActionDocument::If(branch) => Some((
                branch.openbach_functions_true.as_slice(),
                branch.openbach_functions_false.as_slice(),
            )),
            ActionDocument::While(looping) => Some((
                looping.openbach_functions_while.as_slice(),
                looping.openbach_functions_end.as_slice(),
            )),
            _ => None,
        }
    }
}

/// Fixed keys of the `start_job_instance` payload; no job may use these names.
pub const JOB_PAYLOAD_KEYS: [&str; 3] = ["entity_name", "offset", "interval"];

/// `start_job_instance` payload.
///
/// The job arguments sit under a key named after the job:
/// ```json
/// {"entity_name": "Agent A", "offset": 0, "fping": {"destination_ip": "$dst"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StartJobInstanceDocument {
    /// Entity (agent) running the job
    pub entity_name: Value,

    /// Delay in seconds applied by the agent before starting the job
    #[schemars(with = "f64")]
    pub offset: Number,

    /// Restart period in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub interval: Option<Number>,

    /// Single entry: job name to job arguments
    #[serde(flatten)]
    pub job: Map<String, Value>,
}

impl StartJobInstanceDocument {
    /// Name of the started job.
    pub fn job_name(&self) -> Option<&str> {
        self.job.keys().next().map(String::as_str)
    }
}

/// `stop_job_instance` / `stop_scenario_instance` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StopFunctionDocument {
    /// Id of the operation whose job or scenario is stopped
    pub openbach_function_id: usize,
}

/// `stop_job_instances` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StopFunctionsDocument {
    /// Ids of the operations whose jobs are stopped
    pub openbach_function_ids: Vec<usize>,
}

/// `start_scenario_instance` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StartScenarioInstanceDocument {
    /// Scenario name, or the whole embedded scenario document
    pub scenario_name: Value,

    /// Values given to the sub-scenario arguments
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// `reboot` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RebootDocument {
    /// Entity (agent) to reboot
    pub entity_name: Value,
}

/// `if` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IfDocument {
    /// Condition tree
    pub condition: Value,

    /// Ids run when the condition holds
    #[serde(default)]
    pub openbach_functions_true: Vec<usize>,

    /// Ids run when the condition does not hold
    #[serde(default)]
    pub openbach_functions_false: Vec<usize>,
}

/// `while` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WhileDocument {
    /// Condition tree, evaluated before each iteration
    pub condition: Value,

    /// Ids run on each iteration
    #[serde(default)]
    pub openbach_functions_while: Vec<usize>,

    /// Ids run once the loop exits
    #[serde(default)]
    pub openbach_functions_end: Vec<usize>,
}

/// Render a duration as seconds: an integer when whole, a float otherwise.
pub fn seconds(duration: Duration) -> Number {
    if duration.subsec_nanos() == 0 {
        Number::from(duration.as_secs())
    } else {
        Number::from_f64(duration.as_secs_f64()).unwrap_or_else(|| Number::from(duration.as_secs()))
    }
}
