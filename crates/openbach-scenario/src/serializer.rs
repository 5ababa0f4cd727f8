// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Scenario to wire document.
//!
//! One deterministic pass over the arena:
//! 1. ids are insertion indices, labels default to `#<id>`
//! 2. wait handles become ids, in the order they were added
//! 3. branch and loop bodies become ids, in the order they were given
//! 4. constants are substituted, argument tokens are kept for the runtime

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::document::{
    ActionDocument, FunctionDocument, IfDocument, JOB_PAYLOAD_KEYS, RebootDocument,
    ScenarioDocument, StartJobInstanceDocument, StartScenarioInstanceDocument,
    StopFunctionDocument, StopFunctionsDocument, WaitDocument, WhileDocument, seconds,
};
use crate::error::{Result, ScenarioError};
use crate::operation::{Operation, OperationHandle, Payload, SubScenario};
use crate::scenario::Scenario;
use crate::token::{Declarations, Token};
use crate::validation::{find_wait_cycle, stop_target_kind};

pub(crate) fn build_document(scenario: &Scenario) -> Result<ScenarioDocument> {
    check_unique_names(scenario)?;
    let declarations = scenario.declarations();

    let waits = scenario
        .operations()
        .iter()
        .enumerate()
        .map(|(index, operation)| build_wait(scenario, index, operation))
        .collect::<Result<Vec<_>>>()?;

    let dependencies: Vec<Vec<usize>> = waits
        .iter()
        .map(|wait| wait.referenced_ids().collect())
        .collect();
    if let Some(cycle) = find_wait_cycle(&dependencies) {
        return Err(ScenarioError::WaitCycle { cycle });
    }

    let mut functions = Vec::with_capacity(waits.len());
    for ((index, operation), wait) in scenario.operations().iter().enumerate().zip(waits) {
        functions.push(FunctionDocument {
            id: index,
            label: operation
                .label()
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", index)),
            action: build_action(scenario, &declarations, index, operation)?,
            wait,
            on_fail: operation.on_fail().into(),
        });
    }

    let document = ScenarioDocument {
        name: scenario.name().to_string(),
        description: scenario.description().to_string(),
        arguments: scenario
            .raw_arguments()
            .iter()
            .map(|(name, description)| (name.clone(), Value::String(description.clone())))
            .collect(),
        constants: scenario
            .raw_constants()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
        openbach_functions: functions,
    };

    tracing::debug!(
        scenario = %document.name,
        functions = document.openbach_functions.len(),
        arguments = document.arguments.len(),
        constants = document.constants.len(),
        "Built scenario"
    );

    Ok(document)
}

fn check_unique_names(scenario: &Scenario) -> Result<()> {
    let duplicate = |table: &'static str, name: &str| ScenarioError::DuplicateName {
        table,
        name: name.to_string(),
    };

    let mut arguments = HashSet::new();
    for (name, _) in scenario.raw_arguments() {
        if !arguments.insert(name.as_str()) {
            return Err(duplicate("argument", name));
        }
    }

    let mut constants = HashSet::new();
    for (name, _) in scenario.raw_constants() {
        if !constants.insert(name.as_str()) {
            return Err(duplicate("constant", name));
        }
        if arguments.contains(name.as_str()) {
            return Err(duplicate("argument and constant", name));
        }
    }

    Ok(())
}

fn build_wait(scenario: &Scenario, index: usize, operation: &Operation) -> Result<WaitDocument> {
    let resolve_all = |handles: &[OperationHandle]| {
        handles
            .iter()
            .map(|handle| scenario.resolve(*handle))
            .collect::<Result<Vec<_>>>()
    };

    let wait = operation.wait();
    let launched_ids = resolve_all(wait.launched())?;
    let finished_ids = resolve_all(wait.finished())?;

    if launched_ids.contains(&index) || finished_ids.contains(&index) {
        return Err(ScenarioError::SelfWait { operation: index });
    }

    Ok(WaitDocument {
        time: seconds(wait.delay()),
        launched_ids,
        finished_ids,
    })
}

fn build_action(
    scenario: &Scenario,
    declarations: &Declarations,
    index: usize,
    operation: &Operation,
) -> Result<ActionDocument> {
    let payload = operation
        .payload()
        .ok_or_else(|| ScenarioError::Unconfigured {
            operation: index,
            kind: operation.kind(),
        })?;

    let resolve_body = |handles: &[OperationHandle]| {
        handles
            .iter()
            .map(|handle| scenario.resolve(*handle))
            .collect::<Result<Vec<_>>>()
    };

    let action = match payload {
        Payload::StartJobInstance(job) => {
            if JOB_PAYLOAD_KEYS.contains(&job.job_name()) {
                return Err(ScenarioError::ReservedJobName {
                    operation: index,
                    job: job.job_name().to_string(),
                });
            }
            let arguments = resolve_named(job.arguments(), declarations, index)?;
            let mut job_entry = Map::new();
            job_entry.insert(job.job_name().to_string(), Value::Object(arguments));
            ActionDocument::StartJobInstance(StartJobInstanceDocument {
                entity_name: job
                    .entity_name()
                    .resolve(declarations)
                    .map_err(|e| e.at(index))?,
                offset: seconds(job.offset_duration()),
                interval: job.interval_duration().map(seconds),
                job: job_entry,
            })
        }
        Payload::StopJobInstance(target) => {
            ActionDocument::StopJobInstance(StopFunctionDocument {
                openbach_function_id: resolve_target(scenario, operation, index, *target)?,
            })
        }
        Payload::StopJobInstances(targets) => {
            ActionDocument::StopJobInstances(StopFunctionsDocument {
                openbach_function_ids: targets
                    .iter()
                    .map(|target| resolve_target(scenario, operation, index, *target))
                    .collect::<Result<Vec<_>>>()?,
            })
        }
        Payload::StartScenarioInstance(start) => {
            let scenario_name = match start.scenario() {
                SubScenario::Named(name) => Value::String(name.clone()),
                SubScenario::Embedded(sub) => {
                    let document = sub.build().map_err(|source| ScenarioError::SubScenario {
                        name: sub.name().to_string(),
                        operation: index,
                        source: Box::new(source),
                    })?;
                    serde_json::to_value(document)?
                }
            };
            ActionDocument::StartScenarioInstance(StartScenarioInstanceDocument {
                scenario_name,
                arguments: resolve_named(start.arguments(), declarations, index)?,
            })
        }
        Payload::StopScenarioInstance(target) => {
            ActionDocument::StopScenarioInstance(StopFunctionDocument {
                openbach_function_id: resolve_target(scenario, operation, index, *target)?,
            })
        }
        Payload::Reboot(reboot) => ActionDocument::Reboot(RebootDocument {
            entity_name: reboot
                .entity_name()
                .resolve(declarations)
                .map_err(|e| e.at(index))?,
        }),
        Payload::If(condition) => ActionDocument::If(IfDocument {
            condition: condition.build(declarations).map_err(|e| e.at(index))?,
            openbach_functions_true: resolve_body(operation.first_body())?,
            openbach_functions_false: resolve_body(operation.second_body())?,
        }),
        Payload::While(condition) => ActionDocument::While(WhileDocument {
            condition: condition.build(declarations).map_err(|e| e.at(index))?,
            openbach_functions_while: resolve_body(operation.first_body())?,
            openbach_functions_end: resolve_body(operation.second_body())?,
        }),
    };

    Ok(action)
}

fn resolve_named(
    entries: &[(String, Token)],
    declarations: &Declarations,
    index: usize,
) -> Result<Map<String, Value>> {
    entries
        .iter()
        .map(|(name, token)| {
            token
                .resolve(declarations)
                .map(|value| (name.clone(), value))
                .map_err(|e| e.at(index))
        })
        .collect()
}

fn resolve_target(
    scenario: &Scenario,
    operation: &Operation,
    index: usize,
    target: OperationHandle,
) -> Result<usize> {
    let target_id = scenario.resolve(target)?;
    let found = scenario.operations()[target_id].kind();
    match stop_target_kind(operation.kind()) {
        Some(expected) if expected != found => Err(ScenarioError::InvalidTarget {
            operation: index,
            target: target_id,
            expected,
            found,
        }),
        _ => Ok(target_id),
    }
}
