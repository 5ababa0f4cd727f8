// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The scenario graph container.
//!
//! A [`Scenario`] is an arena of [`Operation`]s plus the names it declares.
//! Operations are addressed through [`OperationHandle`]s holding their
//! insertion index; ids only exist in the built document.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::document::ScenarioDocument;
use crate::error::{Result, ScenarioError};
use crate::operation::{Operation, OperationHandle, OperationKind, Wait};
use crate::serializer;
use crate::token::Declarations;

static NEXT_SCENARIO_ID: AtomicU64 = AtomicU64::new(1);

fn next_scenario_id() -> u64 {
    NEXT_SCENARIO_ID.fetch_add(1, Ordering::Relaxed)
}

/// Named, described, parameterized graph of operations.
///
/// A clone gets its own identity. Handles issued by the source before the
/// clone was taken stay valid on the clone; handles issued afterwards, by the
/// source or by a sibling clone, are foreign to it.
#[derive(Debug)]
pub struct Scenario {
    id: u64,
    // (scenario id, operation count at clone time) for every ancestor
    ancestors: Vec<(u64, usize)>,
    name: String,
    description: String,
    arguments: Vec<(String, String)>,
    constants: Vec<(String, Value)>,
    operations: Vec<Operation>,
}

impl Scenario {
    /// Empty scenario.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: next_scenario_id(),
            ancestors: Vec::new(),
            name: name.into(),
            description: description.into(),
            arguments: Vec::new(),
            constants: Vec::new(),
            operations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declare an argument, resolved by the runtime when the scenario is launched.
    ///
    /// Duplicate names are reported by [`build`](Self::build).
    pub fn add_argument(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> &mut Self {
        self.arguments.push((name.into(), description.into()));
        self
    }

    /// Declare a constant, substituted into payloads by [`build`](Self::build).
    pub fn add_constant(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.constants.push((name.into(), value.into()));
        self
    }

    /// Declared arguments, in declaration order.
    pub fn arguments(&self) -> impl Iterator<Item = (&str, &str)> {
        self.arguments
            .iter()
            .map(|(name, description)| (name.as_str(), description.as_str()))
    }

    /// Declared constants, in declaration order.
    pub fn constants(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.constants
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Append an operation and return its handle.
    pub fn add_operation(&mut self, kind: OperationKind, wait: Wait) -> OperationHandle {
        let handle = OperationHandle {
            scenario: self.id,
            index: self.operations.len(),
        };
        self.operations.push(Operation::new(kind, wait));
        handle
    }

    /// Whether the handle was issued by this scenario, or by an ancestor
    /// before this scenario was cloned from it.
    pub fn owns(&self, handle: OperationHandle) -> bool {
        if handle.index >= self.operations.len() {
            return false;
        }
        handle.scenario == self.id
            || self
                .ancestors
                .iter()
                .any(|&(id, boundary)| id == handle.scenario && handle.index < boundary)
    }

    pub fn operation(&self, handle: OperationHandle) -> Result<&Operation> {
        self.check_owned(handle)?;
        Ok(&self.operations[handle.index])
    }

    /// Mutable access, used to configure the operation.
    pub fn operation_mut(&mut self, handle: OperationHandle) -> Result<&mut Operation> {
        self.check_owned(handle)?;
        Ok(&mut self.operations[handle.index])
    }

    /// Operations in insertion order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Handles of every operation, in insertion order.
    pub fn handles(&self) -> impl Iterator<Item = OperationHandle> + '_ {
        (0..self.operations.len()).map(|index| OperationHandle {
            scenario: self.id,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Declaration table used to classify `$name` tokens.
    pub fn declarations(&self) -> Declarations {
        let declarations = self
            .arguments
            .iter()
            .fold(Declarations::new(), |decl, (name, _)| decl.with_argument(name));
        self.constants
            .iter()
            .fold(declarations, |decl, (name, value)| {
                decl.with_constant(name, value.clone())
            })
    }

    /// Resolve every reference and produce the wire document.
    ///
    /// Never mutates the scenario; calling it twice yields equal documents.
    pub fn build(&self) -> Result<ScenarioDocument> {
        serializer::build_document(self)
    }

    /// [`build`](Self::build), as a JSON value.
    pub fn serialize(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.build()?)?)
    }

    /// [`build`](Self::build), as JSON text.
    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        let document = self.build()?;
        let text = if pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(text)
    }

    pub(crate) fn resolve(&self, handle: OperationHandle) -> Result<usize> {
        self.check_owned(handle)?;
        Ok(handle.index)
    }

    pub(crate) fn raw_arguments(&self) -> &[(String, String)] {
        &self.arguments
    }

    pub(crate) fn raw_constants(&self) -> &[(String, Value)] {
        &self.constants
    }

    fn check_owned(&self, handle: OperationHandle) -> Result<()> {
        if self.owns(handle) {
            Ok(())
        } else {
            Err(ScenarioError::ForeignOperation {
                scenario: self.name.clone(),
                index: handle.index,
            })
        }
    }
}

impl Clone for Scenario {
    fn clone(&self) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push((self.id, self.operations.len()));
        Self {
            id: next_scenario_id(),
            ancestors,
            name: self.name.clone(),
            description: self.description.clone(),
            arguments: self.arguments.clone(),
            constants: self.constants.clone(),
            operations: self.operations.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Reboot;

    #[test]
    fn test_handles_are_insertion_indices() {
        let mut scenario = Scenario::new("s", "");
        let a = scenario.add_operation(OperationKind::Reboot, Wait::new());
        let b = scenario.add_operation(OperationKind::Reboot, Wait::new());
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(scenario.len(), 2);
        assert_eq!(scenario.handles().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut first = Scenario::new("first", "");
        let mut second = Scenario::new("second", "");
        let handle = first.add_operation(OperationKind::Reboot, Wait::new());
        second.add_operation(OperationKind::Reboot, Wait::new());

        assert!(first.owns(handle));
        assert!(!second.owns(handle));
        assert_eq!(
            second.operation_mut(handle).unwrap_err(),
            ScenarioError::ForeignOperation {
                scenario: "second".to_string(),
                index: 0
            }
        );
    }

    #[test]
    fn test_clone_accepts_source_handles() {
        let mut scenario = Scenario::new("s", "");
        let handle = scenario.add_operation(OperationKind::Reboot, Wait::new());
        let mut copy = scenario.clone();
        copy.operation_mut(handle)
            .unwrap()
            .configure(Reboot::new("Agent A"))
            .unwrap();
        assert!(copy.operation(handle).unwrap().payload().is_some());
        assert!(scenario.operation(handle).unwrap().payload().is_none());
    }

    #[test]
    fn test_sibling_clones_do_not_share_handles() {
        let mut template = Scenario::new("template", "");
        let shared = template.add_operation(OperationKind::Reboot, Wait::new());

        let mut a = template.clone();
        let mut b = template.clone();
        let only_a = a.add_operation(OperationKind::Reboot, Wait::new());
        let only_b = b.add_operation(OperationKind::Reboot, Wait::new());

        assert!(a.owns(shared) && b.owns(shared));
        assert!(a.owns(only_a) && !b.owns(only_a));
        assert!(b.owns(only_b) && !a.owns(only_b));

        let late = template.add_operation(OperationKind::Reboot, Wait::new());
        assert!(template.owns(late));
        assert!(!a.owns(late));
        assert!(!template.owns(only_a));
    }

    #[test]
    fn test_grandchild_accepts_every_ancestor_handle() {
        let mut template = Scenario::new("template", "");
        let first = template.add_operation(OperationKind::Reboot, Wait::new());
        let mut child = template.clone();
        let second = child.add_operation(OperationKind::Reboot, Wait::new());
        let mut grandchild = child.clone();
        let third = grandchild.add_operation(OperationKind::Reboot, Wait::new());

        assert!(grandchild.owns(first));
        assert!(grandchild.owns(second));
        assert!(grandchild.owns(third));
        assert!(!child.owns(third));
    }

    #[test]
    fn test_declarations() {
        let mut scenario = Scenario::new("s", "");
        scenario
            .add_argument("agentA", "first agent")
            .add_constant("count", 3);
        let decl = scenario.declarations();
        assert!(decl.is_argument("agentA"));
        assert_eq!(decl.constant("count"), Some(&Value::from(3)));
        assert_eq!(
            scenario.arguments().collect::<Vec<_>>(),
            vec![("agentA", "first agent")]
        );
    }

    #[test]
    fn test_scenario_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Scenario>();
    }
}
