// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Ready-made scenarios covering branches, loops and sub-scenarios.

use std::time::Duration;
use strum::{Display, EnumIter, EnumString};

use crate::condition::{BinaryOperator, Condition, Operand};
use crate::error::Result;
use crate::operation::{
    OperationKind, Payload, Reboot, StartJobInstance, StartScenarioInstance, Wait,
};
use crate::scenario::Scenario;

/// Catalog of sample scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Sample {
    /// Reboot an agent, then ping from one or two agents depending on its status
    If,
    /// Generate traffic while the measured rate stays below a threshold
    While,
    /// Launch an embedded scenario and a named one, then stop the latter
    Nested,
}

impl Sample {
    /// Build the sample.
    pub fn scenario(&self) -> Result<Scenario> {
        match self {
            Sample::If => branching(),
            Sample::While => looping(),
            Sample::Nested => nested(),
        }
    }
}

/// Reboot `Agent A`; when it reports as available ping from both agents,
/// otherwise from `Agent B` only; stop the pings ten seconds later.
pub fn branching() -> Result<Scenario> {
    let mut scenario = Scenario::new(
        "If",
        "Ping a destination from both agents if the rebooted one is available",
    );
    scenario
        .add_argument("agentA", "Address of the rebooted agent")
        .add_constant("destination", "192.168.1.4");

    let reboot = scenario.add_operation(OperationKind::Reboot, Wait::new());
    scenario
        .operation_mut(reboot)?
        .configure(Reboot::new("Agent A"))?;

    let check = scenario.add_operation(OperationKind::If, Wait::new().on_launched([reboot]));

    let ping = |entity: &str| {
        StartJobInstance::new("fping", entity).argument("destination_ip", "$destination")
    };
    let ping_a = scenario.add_operation(OperationKind::StartJobInstance, Wait::new());
    scenario.operation_mut(ping_a)?.configure(ping("Agent A"))?;
    let ping_b = scenario.add_operation(OperationKind::StartJobInstance, Wait::new());
    scenario.operation_mut(ping_b)?.configure(ping("Agent B"))?;
    let fallback = scenario.add_operation(OperationKind::StartJobInstance, Wait::new());
    scenario
        .operation_mut(fallback)?
        .configure(ping("Agent B").argument("count", 10))?;

    scenario
        .operation_mut(check)?
        .configure_condition(Condition::new(
            "=",
            Operand::database("Agent", "$agentA", "status"),
            Operand::value("available"),
        )?)?
        .configure_if_true([ping_a, ping_b])?
        .configure_if_false([fallback])?;

    let stop = scenario.add_operation(
        OperationKind::StopJobInstances,
        Wait::new().on_launched([ping_a, ping_b]).with_delay_secs(10),
    );
    scenario
        .operation_mut(stop)?
        .configure(Payload::StopJobInstances(vec![ping_a, ping_b]))?;

    Ok(scenario)
}

/// Monitor the rate on an entity and run iperf3 rounds while it stays low.
pub fn looping() -> Result<Scenario> {
    let mut scenario = Scenario::new(
        "While",
        "Generate traffic until the monitored rate reaches the threshold",
    );
    scenario
        .add_argument("entity", "Entity generating and measuring traffic")
        .add_argument("server", "Address of the iperf3 server")
        .add_constant("threshold", 1_000_000);

    let monitor = scenario.add_operation(OperationKind::StartJobInstance, Wait::new());
    scenario.operation_mut(monitor)?.configure(
        StartJobInstance::new("rate_monitoring", "$entity")
            .argument("interface", "eth0")
            .interval(Duration::from_secs(1)),
    )?;

    let low_rate = scenario.add_operation(
        OperationKind::While,
        Wait::new().on_launched([monitor]).with_delay_secs(5),
    );
    let round = scenario.add_operation(OperationKind::StartJobInstance, Wait::new());
    scenario.operation_mut(round)?.configure(
        StartJobInstance::new("iperf3", "$entity")
            .argument("server_ip", "$server")
            .argument("duration", 10),
    )?;
    let stop = scenario.add_operation(OperationKind::StopJobInstance, Wait::new());
    scenario
        .operation_mut(stop)?
        .configure(Payload::StopJobInstance(monitor))?;

    scenario
        .operation_mut(low_rate)?
        .configure_while_body([round])?
        .configure_while_end([stop])?
        .configure_condition(Condition::binary(
            BinaryOperator::Below,
            Operand::statistic("rate_monitoring", "rate"),
            Operand::value("$threshold"),
        ))?;

    Ok(scenario)
}

/// Run an embedded reboot scenario, then a named delay scenario for a minute.
pub fn nested() -> Result<Scenario> {
    let mut reboot_scenario = Scenario::new("Reboot", "Reboot one agent");
    reboot_scenario.add_argument("agent", "Entity to reboot");
    let reboot = reboot_scenario.add_operation(OperationKind::Reboot, Wait::new());
    reboot_scenario
        .operation_mut(reboot)?
        .configure(Reboot::new("$agent"))?;

    let mut scenario = Scenario::new(
        "Nested",
        "Reboot an agent, then measure delay from it for one minute",
    );
    scenario.add_argument("agent", "Entity under test");

    let embedded = scenario.add_operation(OperationKind::StartScenarioInstance, Wait::new());
    scenario.operation_mut(embedded)?.configure(
        StartScenarioInstance::new(reboot_scenario).argument("agent", "$agent"),
    )?;

    let delay = scenario.add_operation(
        OperationKind::StartScenarioInstance,
        Wait::new().on_finished([embedded]),
    );
    scenario.operation_mut(delay)?.configure(
        StartScenarioInstance::new("Network Delay")
            .argument("entity", "$agent")
            .argument("duration", 60),
    )?;

    let stop = scenario.add_operation(
        OperationKind::StopScenarioInstance,
        Wait::new().on_launched([delay]).with_delay_secs(60),
    );
    scenario
        .operation_mut(stop)?
        .set_label("stop delay measurement")
        .configure(Payload::StopScenarioInstance(delay))?;

    Ok(scenario)
}
