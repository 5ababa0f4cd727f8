// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Structural validation of wire documents.
//!
//! Documents produced by [`Scenario::build`](crate::Scenario::build) pass these
//! checks by construction. The checks matter for documents read from disk or
//! written by hand before they are sent to the controller:
//! - Ids are dense and match positions
//! - Wait, branch and stop references point to existing operations
//! - Waits do not form cycles
//! - `$name` tokens are declared

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::document::{ActionDocument, ScenarioDocument};
use crate::operation::OperationKind;
use crate::token::placeholder_name;

// ============================================================================
// Validation Result Types
// ============================================================================

/// Result of document validation containing errors and warnings.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Hard errors; the controller would reject the document.
    pub errors: Vec<ValidationError>,
    /// Soft warnings that indicate a likely mistake.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are allowed).
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns true if there are any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns true if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Merge another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

// ============================================================================
// Validation Errors
// ============================================================================

/// Errors that can occur during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ValidationError {
    // === Identity Errors ===
    /// Function id does not match its position.
    IdMismatch { position: usize, id: usize },
    /// Name declared both as argument and constant.
    DuplicateName { name: String },

    // === Reference Errors ===
    /// Reference to an id no function carries.
    UnknownFunction {
        function_id: usize,
        field: &'static str,
        referenced_id: usize,
    },
    /// Function waits on itself.
    SelfWait { function_id: usize },
    /// Waits form a cycle.
    WaitCycle { cycle: Vec<usize> },
    /// Stop function targets a function of the wrong kind.
    InvalidStopTarget {
        function_id: usize,
        target_id: usize,
        expected: OperationKind,
        found: OperationKind,
    },

    // === Token Errors ===
    /// `$name` token neither an argument nor a constant.
    UndeclaredToken { function_id: usize, name: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::IdMismatch { position, id } => write!(
                f,
                "[E001] Function at position {} has id {}; ids must match positions",
                position, id
            ),
            ValidationError::DuplicateName { name } => write!(
                f,
                "[E002] '{}' is declared both as an argument and as a constant",
                name
            ),
            ValidationError::UnknownFunction {
                function_id,
                field,
                referenced_id,
            } => write!(
                f,
                "[E010] Function {} references unknown function {} in '{}'",
                function_id, referenced_id, field
            ),
            ValidationError::SelfWait { function_id } => {
                write!(f, "[E011] Function {} waits on itself", function_id)
            }
            ValidationError::WaitCycle { cycle } => write!(
                f,
                "[E012] Wait cycle: {}",
                cycle
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ")
            ),
            ValidationError::InvalidStopTarget {
                function_id,
                target_id,
                expected,
                found,
            } => write!(
                f,
                "[E013] Function {} must target a '{}' function, but {} is '{}'",
                function_id, expected, target_id, found
            ),
            ValidationError::UndeclaredToken { function_id, name } => write!(
                f,
                "[E020] Function {} uses '${}' which is neither an argument nor a constant",
                function_id, name
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// Validation Warnings
// ============================================================================

/// Warnings that don't prevent submission.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ValidationWarning {
    /// Function listed in the bodies of several control-flow functions.
    SharedBody {
        function_id: usize,
        owners: Vec<usize>,
    },
    /// `if`/`while` with nothing to run.
    EmptyBodies { function_id: usize, kind: OperationKind },
    /// Argument declared but never used.
    UnusedArgument { name: String },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::SharedBody {
                function_id,
                owners,
            } => write!(
                f,
                "[W001] Function {} appears in the bodies of functions {}",
                function_id,
                owners
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ValidationWarning::EmptyBodies { function_id, kind } => write!(
                f,
                "[W002] '{}' function {} has both bodies empty",
                kind, function_id
            ),
            ValidationWarning::UnusedArgument { name } => {
                write!(f, "[W003] Argument '{}' is never referenced", name)
            }
        }
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Run every check on a document.
pub fn validate_document(document: &ScenarioDocument) -> ValidationResult {
    let mut result = ValidationResult::default();

    result.merge(validate_identity(document));
    result.merge(validate_references(document));
    result.merge(validate_wait_graph(document));
    result.merge(validate_tokens(document));
    result.merge(validate_bodies(document));

    tracing::debug!(
        scenario = %document.name,
        functions = document.openbach_functions.len(),
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "Validated scenario document"
    );

    result
}

fn validate_identity(document: &ScenarioDocument) -> ValidationResult {
    let mut result = ValidationResult::default();

    for (position, function) in document.openbach_functions.iter().enumerate() {
        if function.id != position {
            result.errors.push(ValidationError::IdMismatch {
                position,
                id: function.id,
            });
        }
    }

    for name in document.arguments.keys() {
        if document.constants.contains_key(name) {
            result
                .errors
                .push(ValidationError::DuplicateName { name: name.clone() });
        }
    }

    result
}

fn validate_references(document: &ScenarioDocument) -> ValidationResult {
    let mut result = ValidationResult::default();
    let kinds: HashMap<usize, OperationKind> = document
        .openbach_functions
        .iter()
        .map(|f| (f.id, f.action.kind()))
        .collect();

    for function in &document.openbach_functions {
        let id = function.id;
        let mut check = |field: &'static str, referenced_id: usize| {
            if !kinds.contains_key(&referenced_id) {
                result.errors.push(ValidationError::UnknownFunction {
                    function_id: id,
                    field,
                    referenced_id,
                });
            }
        };

        for &referenced in &function.wait.launched_ids {
            check("launched_ids", referenced);
        }
        for &referenced in &function.wait.finished_ids {
            check("finished_ids", referenced);
        }
        match &function.action {
            ActionDocument::If(branch) => {
                for &referenced in &branch.openbach_functions_true {
                    check("openbach_functions_true", referenced);
                }
                for &referenced in &branch.openbach_functions_false {
                    check("openbach_functions_false", referenced);
                }
            }
            ActionDocument::While(looping) => {
                for &referenced in &looping.openbach_functions_while {
                    check("openbach_functions_while", referenced);
                }
                for &referenced in &looping.openbach_functions_end {
                    check("openbach_functions_end", referenced);
                }
            }
            ActionDocument::StopJobInstance(_) | ActionDocument::StopScenarioInstance(_) => {
                for referenced in function.action.target_ids() {
                    check("openbach_function_id", referenced);
                }
            }
            ActionDocument::StopJobInstances(_) => {
                for referenced in function.action.target_ids() {
                    check("openbach_function_ids", referenced);
                }
            }
            _ => {}
        }

        if function.wait.referenced_ids().any(|referenced| referenced == id) {
            result
                .errors
                .push(ValidationError::SelfWait { function_id: id });
        }

        if let Some(expected) = stop_target_kind(function.action.kind()) {
            for target in function.action.target_ids() {
                if let Some(&found) = kinds.get(&target) {
                    if found != expected {
                        result.errors.push(ValidationError::InvalidStopTarget {
                            function_id: id,
                            target_id: target,
                            expected,
                            found,
                        });
                    }
                }
            }
        }
    }

    result
}

fn validate_wait_graph(document: &ScenarioDocument) -> ValidationResult {
    let mut result = ValidationResult::default();
    let positions: HashMap<usize, usize> = document
        .openbach_functions
        .iter()
        .enumerate()
        .map(|(position, f)| (f.id, position))
        .collect();

    // Self waits and dangling ids are reported by validate_references.
    let dependencies: Vec<Vec<usize>> = document
        .openbach_functions
        .iter()
        .enumerate()
        .map(|(position, f)| {
            f.wait
                .referenced_ids()
                .filter_map(|id| positions.get(&id).copied())
                .filter(|&dependency| dependency != position)
                .collect()
        })
        .collect();

    if let Some(cycle) = find_wait_cycle(&dependencies) {
        let cycle = cycle
            .into_iter()
            .map(|position| document.openbach_functions[position].id)
            .collect();
        result.errors.push(ValidationError::WaitCycle { cycle });
    }

    result
}

fn validate_tokens(document: &ScenarioDocument) -> ValidationResult {
    let mut result = ValidationResult::default();
    let mut used: HashSet<String> = HashSet::new();

    for function in &document.openbach_functions {
        let mut names = Vec::new();
        match &function.action {
            // An embedded scenario declares its own names.
            ActionDocument::StartScenarioInstance(start) => {
                for value in start.arguments.values() {
                    collect_placeholders(value, &mut names);
                }
            }
            action => {
                if let Ok(value) = serde_json::to_value(action) {
                    collect_placeholders(&value, &mut names);
                }
            }
        }

        for name in names {
            if !document.arguments.contains_key(&name) && !document.constants.contains_key(&name)
            {
                result.errors.push(ValidationError::UndeclaredToken {
                    function_id: function.id,
                    name: name.clone(),
                });
            }
            used.insert(name);
        }
    }

    for name in document.arguments.keys() {
        if !used.contains(name) {
            result
                .warnings
                .push(ValidationWarning::UnusedArgument { name: name.clone() });
        }
    }

    result
}

fn validate_bodies(document: &ScenarioDocument) -> ValidationResult {
    let mut result = ValidationResult::default();
    let mut owners: HashMap<usize, Vec<usize>> = HashMap::new();

    for function in &document.openbach_functions {
        if let Some((first, second)) = function.action.bodies() {
            if first.is_empty() && second.is_empty() {
                result.warnings.push(ValidationWarning::EmptyBodies {
                    function_id: function.id,
                    kind: function.action.kind(),
                });
            }
            for &member in first.iter().chain(second.iter()) {
                let entry = owners.entry(member).or_default();
                if !entry.contains(&function.id) {
                    entry.push(function.id);
                }
            }
        }
    }

    let mut shared: Vec<(usize, Vec<usize>)> = owners
        .into_iter()
        .filter(|(_, owners)| owners.len() > 1)
        .collect();
    shared.sort_by_key(|(function_id, _)| *function_id);
    for (function_id, owners) in shared {
        result.warnings.push(ValidationWarning::SharedBody {
            function_id,
            owners,
        });
    }

    result
}

// ============================================================================
// Helpers
// ============================================================================

/// Kind a stop operation must point at, `None` for other kinds.
pub fn stop_target_kind(kind: OperationKind) -> Option<OperationKind> {
    match kind {
        OperationKind::StopJobInstance | OperationKind::StopJobInstances => {
            Some(OperationKind::StartJobInstance)
        }
        OperationKind::StopScenarioInstance => Some(OperationKind::StartScenarioInstance),
        _ => None,
    }
}

/// Find a cycle in a dependency graph.
///
/// `dependencies[i]` lists the positions node `i` waits on. Returns the
/// positions along the first cycle found, closed by repeating its first
/// node. Out-of-range positions are ignored.
pub fn find_wait_cycle(dependencies: &[Vec<usize>]) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; dependencies.len()];

    for start in 0..dependencies.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        marks[start] = Mark::InProgress;
        // (node, index of the next dependency to visit)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let Some(&dependency) = dependencies[node].get(frame.1) else {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            if dependency >= dependencies.len() {
                continue;
            }
            match marks[dependency] {
                Mark::Unvisited => {
                    marks[dependency] = Mark::InProgress;
                    stack.push((dependency, 0));
                }
                Mark::InProgress => {
                    let from = stack
                        .iter()
                        .position(|(n, _)| *n == dependency)
                        .unwrap_or(0);
                    let mut cycle: Vec<usize> = stack[from..].iter().map(|(n, _)| *n).collect();
                    cycle.push(dependency);
                    return Some(cycle);
                }
                Mark::Done => {}
            }
        }
    }

    None
}

fn collect_placeholders(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::String(text) => {
            if let Some(name) = placeholder_name(text) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_placeholders(item, names);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_placeholders(item, names);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> ScenarioDocument {
        serde_json::from_value(value).unwrap()
    }

    fn reboot(id: usize, launched: Vec<usize>, finished: Vec<usize>) -> Value {
        json!({
            "id": id,
            "label": format!("#{}", id),
            "reboot": {"entity_name": "Agent A"},
            "wait": {"time": 0, "launched_ids": launched, "finished_ids": finished},
            "on_fail": {}
        })
    }

    #[test]
    fn test_find_wait_cycle_none() {
        assert_eq!(find_wait_cycle(&[vec![], vec![0], vec![0, 1]]), None);
    }

    #[test]
    fn test_find_wait_cycle_found() {
        let cycle = find_wait_cycle(&[vec![2], vec![0], vec![1]]).unwrap();
        assert_eq!(cycle, vec![0, 2, 1, 0]);
    }

    #[test]
    fn test_find_wait_cycle_ignores_out_of_range() {
        assert_eq!(find_wait_cycle(&[vec![7]]), None);
    }

    #[test]
    fn test_valid_document() {
        let doc = document(json!({
            "name": "ok",
            "openbach_functions": [reboot(0, vec![], vec![]), reboot(1, vec![0], vec![])]
        }));
        let result = validate_document(&doc);
        assert!(result.is_ok(), "{:?}", result.errors);
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_id_mismatch() {
        let doc = document(json!({
            "name": "ids",
            "openbach_functions": [reboot(1, vec![], vec![])]
        }));
        let result = validate_document(&doc);
        assert!(
            result
                .errors
                .contains(&ValidationError::IdMismatch { position: 0, id: 1 })
        );
    }

    #[test]
    fn test_unknown_and_self_references() {
        let doc = document(json!({
            "name": "refs",
            "openbach_functions": [reboot(0, vec![0], vec![5])]
        }));
        let result = validate_document(&doc);
        assert!(
            result
                .errors
                .contains(&ValidationError::SelfWait { function_id: 0 })
        );
        assert!(result.errors.contains(&ValidationError::UnknownFunction {
            function_id: 0,
            field: "finished_ids",
            referenced_id: 5,
        }));
    }

    #[test]
    fn test_wait_cycle() {
        let doc = document(json!({
            "name": "cycle",
            "openbach_functions": [reboot(0, vec![], vec![1]), reboot(1, vec![0], vec![])]
        }));
        let result = validate_document(&doc);
        assert!(
            result
                .errors
                .contains(&ValidationError::WaitCycle { cycle: vec![0, 1, 0] })
        );
    }

    #[test]
    fn test_error_display_codes() {
        let err = ValidationError::WaitCycle {
            cycle: vec![0, 1, 0],
        };
        assert_eq!(err.to_string(), "[E012] Wait cycle: 0 -> 1 -> 0");
        let warning = ValidationWarning::UnusedArgument {
            name: "agentA".to_string(),
        };
        assert!(warning.to_string().starts_with("[W003]"));
    }

    #[test]
    fn test_merge() {
        let mut result = ValidationResult::default();
        result.merge(ValidationResult {
            errors: vec![ValidationError::SelfWait { function_id: 2 }],
            warnings: vec![],
        });
        assert!(result.has_errors());
        assert!(!result.is_ok());
    }
}
