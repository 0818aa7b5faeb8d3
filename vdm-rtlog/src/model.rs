// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsed real-time log data.

use crate::events::EventKind;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// One event of a real-time log.
///
/// Which fields are set depends on the kind. Thread and operation events carry the thread in
/// `id`, bus events carry `busid`, `msgid` and the CPUs involved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    /// The kind of event.
    #[serde(rename = "eventKind")]
    pub kind: EventKind,

    /// The time the event happened at.
    pub time: u64,

    /// The thread id, or the declaration id for declarations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// The CPU the event happened on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpunm: Option<u64>,

    /// The object the event concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objref: Option<u64>,

    /// The class of the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clnm: Option<SmolStr>,

    /// The qualified operation name, `Class`op`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opname: Option<SmolStr>,

    /// Whether the operation was called asynchronously.
    #[serde(default, rename = "async", skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,

    /// The bus a message travels on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busid: Option<u64>,

    /// The sending CPU of a message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fromcpu: Option<u64>,

    /// The receiving CPU of a message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tocpu: Option<u64>,

    /// The message id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msgid: Option<u64>,

    /// The calling thread of a message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callthr: Option<u64>,
}

impl ExecutionEvent {
    /// Creates an event with only a kind and a time.
    pub fn new(kind: EventKind, time: u64) -> Self {
        Self {
            kind,
            time,
            id: None,
            cpunm: None,
            objref: None,
            clnm: None,
            opname: None,
            is_async: None,
            busid: None,
            fromcpu: None,
            tocpu: None,
            msgid: None,
            callthr: None,
        }
    }

    /// Returns the operation name without its class qualifier.
    pub fn short_opname(&self) -> &str {
        short_opname(self.opname.as_deref().unwrap_or_default())
    }
}

/// Strips the class qualifier from an operation name.
pub fn short_opname(opname: &str) -> &str {
    match opname.find('`') {
        Some(index) => &opname[index + 1..],
        None => opname,
    }
}

/// A declared (or inferred) CPU.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuDecl {
    /// The CPU id. The virtual CPU is 0.
    pub id: u64,
    /// The display name.
    pub name: SmolStr,
}

/// A declared (or inferred) bus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusDecl {
    /// The bus id. The virtual bus is 0.
    pub id: u64,
    /// The display name.
    pub name: SmolStr,
    /// The CPUs connected by the bus, in the order they were first seen.
    pub topology: Vec<u64>,
}

/// The events that happened on one CPU.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CpuWithEvents {
    /// The CPU id.
    pub id: u64,
    /// The display name.
    pub name: SmolStr,
    /// Events on the CPU, in log order. Message activations are not included.
    pub execution_events: Vec<ExecutionEvent>,
    /// Objects deployed to the CPU.
    pub deploy_events: Vec<ExecutionEvent>,
    /// The distinct times of `execution_events`, ascending.
    pub timestamps: Vec<u64>,
}

/// Everything read from a real-time log.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogData {
    /// CPUs with events, ordered by id.
    pub cpu_decls: Vec<CpuDecl>,
    /// Buses that carried messages, ordered by id.
    pub bus_decls: Vec<BusDecl>,
    /// Every non-declaration event, in log order.
    pub execution_events: Vec<ExecutionEvent>,
    /// Per-CPU events, ordered by CPU id.
    pub cpus_with_events: Vec<CpuWithEvents>,
    /// The distinct times of the log, ascending.
    pub timestamps: Vec<u64>,
}

impl LogData {
    /// Returns the events of a CPU.
    pub fn cpu(&self, id: u64) -> Option<&CpuWithEvents> {
        self.cpus_with_events.iter().find(|cpu| cpu.id == id)
    }

    /// Returns the declaration of a CPU.
    pub fn cpu_decl(&self, id: u64) -> Option<&CpuDecl> {
        self.cpu_decls.iter().find(|decl| decl.id == id)
    }

    /// Returns the declaration of a bus.
    pub fn bus_decl(&self, id: u64) -> Option<&BusDecl> {
        self.bus_decls.iter().find(|decl| decl.id == id)
    }
}

/// One end of a validation conjecture violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConjectureEndpoint {
    /// The time of the event.
    pub time: u64,
    /// The thread of the event.
    pub thid: u64,
    /// The event kind, compared case-insensitively.
    pub kind: SmolStr,
    /// A fragment of the operation name.
    pub opname: SmolStr,
}

impl ConjectureEndpoint {
    /// Returns true if this endpoint refers to `event`.
    pub fn matches(&self, event: &ExecutionEvent) -> bool {
        let opname = event.opname.as_deref().unwrap_or_default().to_lowercase();
        self.time == event.time
            && self.kind.eq_ignore_ascii_case(event.kind.log_name())
            && opname.contains(&self.opname.to_lowercase())
    }
}

/// A validation conjecture that did not hold during execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConjectureViolation {
    /// Whether the conjecture held.
    pub status: bool,
    /// The conjecture name.
    pub name: SmolStr,
    /// The conjecture expression.
    pub expression: String,
    /// The triggering event.
    pub source: ConjectureEndpoint,
    /// The event the conjecture constrains.
    pub destination: ConjectureEndpoint,
}

impl ConjectureViolation {
    /// Returns true if either end of the violation refers to `event`.
    pub fn concerns(&self, event: &ExecutionEvent) -> bool {
        self.source.matches(event) || self.destination.matches(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("A`op", "op")]
    #[test_case("op", "op")]
    #[test_case("", "")]
    #[test_case("A`B`op", "B`op")]
    fn short_opnames(opname: &str, expected: &str) {
        assert_eq!(short_opname(opname), expected);
    }

    #[test]
    fn conjecture_matching() {
        let mut event = ExecutionEvent::new(EventKind::OpActivate, 40);
        event.opname = Some("Controller`Step".into());
        let endpoint = ConjectureEndpoint {
            time: 40,
            thid: 3,
            kind: "opactivate".into(),
            opname: "step".into(),
        };
        assert!(endpoint.matches(&event));

        event.time = 41;
        assert!(!endpoint.matches(&event), "times must agree");
        event.time = 40;
        event.opname = None;
        assert!(!endpoint.matches(&event));
    }
}
