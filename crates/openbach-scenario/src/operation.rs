// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Operations ("openbach functions"): one node of the scenario graph.
//!
//! Operations are only created through
//! [`Scenario::add_operation`](crate::Scenario::add_operation), which hands
//! back an [`OperationHandle`]. The handle is what other operations store in
//! their wait blocks and branch bodies; it is turned into an id when the
//! scenario is built.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::condition::Condition;
use crate::error::{Result, ScenarioError};
use crate::scenario::Scenario;
use crate::token::Token;

// ============================================================================
// Kind and handle
// ============================================================================

/// The closed set of operation kinds, named as on the wire.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    /// Start a job on an entity
    StartJobInstance,
    /// Stop the job started by one operation
    StopJobInstance,
    /// Stop the jobs started by several operations
    StopJobInstances,
    /// Launch another scenario
    StartScenarioInstance,
    /// Stop a scenario launched by another operation
    StopScenarioInstance,
    /// Reboot an entity
    Reboot,
    /// Conditional branch
    If,
    /// Conditional loop
    While,
}

/// Lightweight reference to an operation of a given scenario.
///
/// Carries the insertion index and the identity of the owning scenario so a
/// handle used with the wrong scenario is detected at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationHandle {
    pub(crate) scenario: u64,
    pub(crate) index: usize,
}

impl OperationHandle {
    /// Insertion index inside the owning scenario. Becomes the operation id.
    pub fn index(&self) -> usize {
        self.index
    }
}

// ============================================================================
// Wait specification
// ============================================================================

/// When an operation may start.
///
/// The operation starts `delay` after every `launched` operation has started
/// and every `finished` operation has completed. With no references the delay
/// counts from the scenario start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wait {
    delay: Duration,
    launched: Vec<OperationHandle>,
    finished: Vec<OperationHandle>,
}

impl Wait {
    /// Start immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for these operations to be launched.
    pub fn on_launched(mut self, operations: impl IntoIterator<Item = OperationHandle>) -> Self {
        for operation in operations {
            self.add_launched(operation);
        }
        self
    }

    /// Wait for these operations to be finished.
    pub fn on_finished(mut self, operations: impl IntoIterator<Item = OperationHandle>) -> Self {
        for operation in operations {
            self.add_finished(operation);
        }
        self
    }

    /// Additional delay once the references are satisfied.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Additional delay, in whole seconds.
    pub fn with_delay_secs(self, seconds: u64) -> Self {
        self.with_delay(Duration::from_secs(seconds))
    }

    /// Add a launched reference. Already present handles are ignored.
    pub fn add_launched(&mut self, operation: OperationHandle) {
        if !self.launched.contains(&operation) {
            self.launched.push(operation);
        }
    }

    /// Add a finished reference. Already present handles are ignored.
    pub fn add_finished(&mut self, operation: OperationHandle) {
        if !self.finished.contains(&operation) {
            self.finished.push(operation);
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn launched(&self) -> &[OperationHandle] {
        &self.launched
    }

    pub fn finished(&self) -> &[OperationHandle] {
        &self.finished
    }

    /// Every referenced handle, launched first.
    pub fn references(&self) -> impl Iterator<Item = &OperationHandle> {
        self.launched.iter().chain(self.finished.iter())
    }
}

/// Failure policy. Always empty; kept so the wire block exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OnFail;

// ============================================================================
// Payloads
// ============================================================================

/// Arguments of a job or of a sub-scenario launch, in insertion order.
pub type NamedTokens = Vec<(String, Token)>;

fn set_named(entries: &mut NamedTokens, name: String, value: Token) {
    match entries.iter_mut().find(|(existing, _)| *existing == name) {
        Some((_, slot)) => *slot = value,
        None => entries.push((name, value)),
    }
}

/// Start a job on an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct StartJobInstance {
    job_name: String,
    entity_name: Token,
    offset: Duration,
    interval: Option<Duration>,
    arguments: NamedTokens,
}

impl StartJobInstance {
    pub fn new(job_name: impl Into<String>, entity_name: impl Into<Token>) -> Self {
        Self {
            job_name: job_name.into(),
            entity_name: entity_name.into(),
            offset: Duration::ZERO,
            interval: None,
            arguments: Vec::new(),
        }
    }

    /// Set a job argument. Setting the same name again replaces the value.
    pub fn argument(mut self, name: impl Into<String>, value: impl Into<Token>) -> Self {
        set_named(&mut self.arguments, name.into(), value.into());
        self
    }

    /// Delay applied by the agent before starting the job.
    pub fn offset(mut self, offset: Duration) -> Self {
        self.offset = offset;
        self
    }

    /// Restart the job at this period.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn entity_name(&self) -> &Token {
        &self.entity_name
    }

    pub fn offset_duration(&self) -> Duration {
        self.offset
    }

    pub fn interval_duration(&self) -> Option<Duration> {
        self.interval
    }

    pub fn arguments(&self) -> &[(String, Token)] {
        &self.arguments
    }
}

/// Scenario launched by a `start_scenario_instance` operation.
#[derive(Debug, Clone)]
pub enum SubScenario {
    /// Scenario already known by the controller.
    Named(String),
    /// Scenario built along with its parent and sent inline.
    Embedded(Box<Scenario>),
}

impl SubScenario {
    pub fn name(&self) -> &str {
        match self {
            SubScenario::Named(name) => name,
            SubScenario::Embedded(scenario) => scenario.name(),
        }
    }
}

impl From<&str> for SubScenario {
    fn from(name: &str) -> Self {
        SubScenario::Named(name.to_string())
    }
}

impl From<String> for SubScenario {
    fn from(name: String) -> Self {
        SubScenario::Named(name)
    }
}

impl From<Scenario> for SubScenario {
    fn from(scenario: Scenario) -> Self {
        SubScenario::Embedded(Box::new(scenario))
    }
}

/// Launch another scenario.
#[derive(Debug, Clone)]
pub struct StartScenarioInstance {
    scenario: SubScenario,
    arguments: NamedTokens,
}

impl StartScenarioInstance {
    pub fn new(scenario: impl Into<SubScenario>) -> Self {
        Self {
            scenario: scenario.into(),
            arguments: Vec::new(),
        }
    }

    /// Value given to one of the sub-scenario arguments.
    pub fn argument(mut self, name: impl Into<String>, value: impl Into<Token>) -> Self {
        set_named(&mut self.arguments, name.into(), value.into());
        self
    }

    pub fn scenario(&self) -> &SubScenario {
        &self.scenario
    }

    pub fn arguments(&self) -> &[(String, Token)] {
        &self.arguments
    }
}

/// Reboot an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Reboot {
    entity_name: Token,
}

impl Reboot {
    pub fn new(entity_name: impl Into<Token>) -> Self {
        Self {
            entity_name: entity_name.into(),
        }
    }

    pub fn entity_name(&self) -> &Token {
        &self.entity_name
    }
}

/// Kind-specific configuration of an operation.
#[derive(Debug, Clone)]
pub enum Payload {
    StartJobInstance(StartJobInstance),
    /// Target must be a `start_job_instance` operation.
    StopJobInstance(OperationHandle),
    /// Targets must be `start_job_instance` operations.
    StopJobInstances(Vec<OperationHandle>),
    StartScenarioInstance(StartScenarioInstance),
    /// Target must be a `start_scenario_instance` operation.
    StopScenarioInstance(OperationHandle),
    Reboot(Reboot),
    If(Condition),
    While(Condition),
}

impl Payload {
    /// Kind this payload configures.
    pub fn kind(&self) -> OperationKind {
        match self {
            Payload::StartJobInstance(_) => OperationKind::StartJobInstance,
            Payload::StopJobInstance(_) => OperationKind::StopJobInstance,
            Payload::StopJobInstances(_) => OperationKind::StopJobInstances,
            Payload::StartScenarioInstance(_) => OperationKind::StartScenarioInstance,
            Payload::StopScenarioInstance(_) => OperationKind::StopScenarioInstance,
            Payload::Reboot(_) => OperationKind::Reboot,
            Payload::If(_) => OperationKind::If,
            Payload::While(_) => OperationKind::While,
        }
    }

    /// Operations the payload points at.
    pub fn targets(&self) -> Vec<OperationHandle> {
        match self {
            Payload::StopJobInstance(target) | Payload::StopScenarioInstance(target) => {
                vec![*target]
            }
            Payload::StopJobInstances(targets) => targets.clone(),
            _ => vec![],
        }
    }
}

impl From<StartJobInstance> for Payload {
    fn from(payload: StartJobInstance) -> Self {
        Payload::StartJobInstance(payload)
    }
}

impl From<StartScenarioInstance> for Payload {
    fn from(payload: StartScenarioInstance) -> Self {
        Payload::StartScenarioInstance(payload)
    }
}

impl From<Reboot> for Payload {
    fn from(payload: Reboot) -> Self {
        Payload::Reboot(payload)
    }
}

// ============================================================================
// Operation
// ============================================================================

/// One node of the scenario graph, owned by its scenario.
#[derive(Debug, Clone)]
pub struct Operation {
    kind: OperationKind,
    label: Option<String>,
    payload: Option<Payload>,
    wait: Wait,
    on_fail: OnFail,
    // if: true/false branches, while: loop body/after loop
    first_body: Vec<OperationHandle>,
    second_body: Vec<OperationHandle>,
}

impl Operation {
    pub(crate) fn new(kind: OperationKind, wait: Wait) -> Self {
        Self {
            kind,
            label: None,
            payload: None,
            wait,
            on_fail: OnFail,
            first_body: Vec::new(),
            second_body: Vec::new(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Custom label, if one was set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Replace the default `#<id>` label.
    pub fn set_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = Some(label.into());
        self
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn wait(&self) -> &Wait {
        &self.wait
    }

    pub fn wait_mut(&mut self) -> &mut Wait {
        &mut self.wait
    }

    pub fn on_fail(&self) -> OnFail {
        self.on_fail
    }

    /// Set the payload. The last call wins.
    pub fn configure(&mut self, payload: impl Into<Payload>) -> Result<&mut Self> {
        let payload = payload.into();
        self.expect_kind(payload.kind())?;
        self.payload = Some(payload);
        Ok(self)
    }

    /// Set the predicate of an `if` or `while` operation.
    pub fn configure_condition(&mut self, condition: Condition) -> Result<&mut Self> {
        let payload = match self.kind {
            OperationKind::If => Payload::If(condition),
            OperationKind::While => Payload::While(condition),
            _ => Payload::If(condition),
        };
        self.configure(payload)
    }

    /// Operations run when the condition holds.
    pub fn configure_if_true(
        &mut self,
        operations: impl IntoIterator<Item = OperationHandle>,
    ) -> Result<&mut Self> {
        self.expect_kind(OperationKind::If)?;
        self.first_body = operations.into_iter().collect();
        Ok(self)
    }

    /// Operations run when the condition does not hold.
    pub fn configure_if_false(
        &mut self,
        operations: impl IntoIterator<Item = OperationHandle>,
    ) -> Result<&mut Self> {
        self.expect_kind(OperationKind::If)?;
        self.second_body = operations.into_iter().collect();
        Ok(self)
    }

    /// Operations run on each iteration.
    pub fn configure_while_body(
        &mut self,
        operations: impl IntoIterator<Item = OperationHandle>,
    ) -> Result<&mut Self> {
        self.expect_kind(OperationKind::While)?;
        self.first_body = operations.into_iter().collect();
        Ok(self)
    }

    /// Operations run once the loop exits.
    pub fn configure_while_end(
        &mut self,
        operations: impl IntoIterator<Item = OperationHandle>,
    ) -> Result<&mut Self> {
        self.expect_kind(OperationKind::While)?;
        self.second_body = operations.into_iter().collect();
        Ok(self)
    }

    /// True branch of an `if`, loop body of a `while`.
    pub fn first_body(&self) -> &[OperationHandle] {
        &self.first_body
    }

    /// False branch of an `if`, after-loop list of a `while`.
    pub fn second_body(&self) -> &[OperationHandle] {
        &self.second_body
    }

    fn expect_kind(&self, found: OperationKind) -> Result<()> {
        if found == self.kind {
            Ok(())
        } else {
            Err(ScenarioError::PayloadMismatch {
                expected: self.kind,
                found,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Operand;
    use std::str::FromStr;

    fn handle(index: usize) -> OperationHandle {
        OperationHandle {
            scenario: 0,
            index,
        }
    }

    fn condition() -> Condition {
        Condition::new("=", Operand::value(1), Operand::value(1)).unwrap()
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(OperationKind::StartJobInstance.to_string(), "start_job_instance");
        assert_eq!(OperationKind::If.as_ref(), "if");
        assert_eq!(
            OperationKind::from_str("stop_scenario_instance").unwrap(),
            OperationKind::StopScenarioInstance
        );
        assert_eq!(
            serde_json::to_value(OperationKind::StopJobInstances).unwrap(),
            serde_json::json!("stop_job_instances")
        );
    }

    #[test]
    fn test_wait_deduplicates_and_keeps_order() {
        let wait = Wait::new()
            .on_finished([handle(3), handle(1), handle(3)])
            .on_launched([handle(2)])
            .with_delay_secs(10);
        assert_eq!(wait.finished(), &[handle(3), handle(1)]);
        assert_eq!(wait.launched(), &[handle(2)]);
        assert_eq!(wait.delay(), Duration::from_secs(10));
        assert_eq!(wait.references().count(), 3);
    }

    #[test]
    fn test_configure_matching_kind() {
        let mut op = Operation::new(OperationKind::Reboot, Wait::new());
        op.configure(Reboot::new("Agent A")).unwrap();
        assert_eq!(op.payload().map(Payload::kind), Some(OperationKind::Reboot));
    }

    #[test]
    fn test_configure_mismatch() {
        let mut op = Operation::new(OperationKind::Reboot, Wait::new());
        let err = op
            .configure(StartJobInstance::new("fping", "Agent A"))
            .unwrap_err();
        assert_eq!(
            err,
            ScenarioError::PayloadMismatch {
                expected: OperationKind::Reboot,
                found: OperationKind::StartJobInstance,
            }
        );
        assert!(op.payload().is_none());
    }

    #[test]
    fn test_configure_last_write_wins() {
        let mut op = Operation::new(OperationKind::StartJobInstance, Wait::new());
        op.configure(StartJobInstance::new("fping", "Agent A")).unwrap();
        op.configure(StartJobInstance::new("iperf3", "Agent B")).unwrap();
        match op.payload() {
            Some(Payload::StartJobInstance(job)) => assert_eq!(job.job_name(), "iperf3"),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_condition_follows_kind() {
        let mut op = Operation::new(OperationKind::While, Wait::new());
        op.configure_condition(condition()).unwrap();
        assert!(matches!(op.payload(), Some(Payload::While(_))));

        let mut op = Operation::new(OperationKind::Reboot, Wait::new());
        assert!(op.configure_condition(condition()).is_err());
    }

    #[test]
    fn test_branches_require_matching_kind() {
        let mut op = Operation::new(OperationKind::If, Wait::new());
        op.configure_if_true([handle(1), handle(2)]).unwrap();
        op.configure_if_false([handle(3)]).unwrap();
        assert!(op.configure_while_body([handle(4)]).is_err());
        assert_eq!(op.first_body(), &[handle(1), handle(2)]);
        assert_eq!(op.second_body(), &[handle(3)]);

        let mut op = Operation::new(OperationKind::While, Wait::new());
        assert!(op.configure_if_true([handle(1)]).is_err());
        op.configure_while_end(Vec::new()).unwrap();
        assert!(op.second_body().is_empty());
    }

    #[test]
    fn test_job_argument_replaced() {
        let job = StartJobInstance::new("fping", "Agent A")
            .argument("destination_ip", "$dst")
            .argument("count", 3)
            .argument("destination_ip", "10.0.0.1");
        assert_eq!(job.arguments().len(), 2);
        assert_eq!(job.arguments()[0].0, "destination_ip");
        assert_eq!(job.arguments()[0].1, Token::parse("10.0.0.1"));
    }

    #[test]
    fn test_payload_targets() {
        assert_eq!(Payload::StopJobInstance(handle(2)).targets(), vec![handle(2)]);
        assert_eq!(
            Payload::StopJobInstances(vec![handle(0), handle(1)]).targets(),
            vec![handle(0), handle(1)]
        );
        assert!(Payload::Reboot(Reboot::new("a")).targets().is_empty());
    }
}
