// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The vocabulary of real-time log events.

use crate::errors::EventKindParseError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The kind of a line in a real-time log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum EventKind {
    /// A CPU declaration.
    #[serde(rename = "CPUdecl")]
    CpuDecl,
    /// A bus declaration.
    #[serde(rename = "BUSdecl")]
    BusDecl,
    /// An object was deployed to a CPU.
    DeployObj,
    /// A thread was created.
    ThreadCreate,
    /// A thread was scheduled.
    ThreadSwapIn,
    /// A thread was scheduled later than requested.
    DelayedThreadSwapIn,
    /// A thread was descheduled.
    ThreadSwapOut,
    /// A thread ended.
    ThreadKill,
    /// A remote call was put on a bus.
    MessageRequest,
    /// A message started travelling on a bus.
    MessageActivate,
    /// A message arrived.
    MessageCompleted,
    /// An operation started executing.
    OpActivate,
    /// An operation was called.
    OpRequest,
    /// An operation returned.
    OpCompleted,
    /// The answer to a remote call was put on a bus.
    ReplyRequest,
}

impl EventKind {
    /// Every event kind, in log vocabulary order.
    pub const ALL: [EventKind; 15] = [
        EventKind::CpuDecl,
        EventKind::BusDecl,
        EventKind::DeployObj,
        EventKind::ThreadCreate,
        EventKind::ThreadSwapIn,
        EventKind::DelayedThreadSwapIn,
        EventKind::ThreadSwapOut,
        EventKind::ThreadKill,
        EventKind::MessageRequest,
        EventKind::MessageActivate,
        EventKind::MessageCompleted,
        EventKind::OpActivate,
        EventKind::OpRequest,
        EventKind::OpCompleted,
        EventKind::ReplyRequest,
    ];

    /// Returns the name used in log files.
    pub fn log_name(self) -> &'static str {
        match self {
            EventKind::CpuDecl => "CPUdecl",
            EventKind::BusDecl => "BUSdecl",
            EventKind::DeployObj => "DeployObj",
            EventKind::ThreadCreate => "ThreadCreate",
            EventKind::ThreadSwapIn => "ThreadSwapIn",
            EventKind::DelayedThreadSwapIn => "DelayedThreadSwapIn",
            EventKind::ThreadSwapOut => "ThreadSwapOut",
            EventKind::ThreadKill => "ThreadKill",
            EventKind::MessageRequest => "MessageRequest",
            EventKind::MessageActivate => "MessageActivate",
            EventKind::MessageCompleted => "MessageCompleted",
            EventKind::OpActivate => "OpActivate",
            EventKind::OpRequest => "OpRequest",
            EventKind::OpCompleted => "OpCompleted",
            EventKind::ReplyRequest => "ReplyRequest",
        }
    }

    /// Returns the short label drawn on event glyphs. Declarations have none.
    pub fn abbreviation(self) -> &'static str {
        match self {
            EventKind::ThreadKill => "tk",
            EventKind::ThreadCreate => "tc",
            EventKind::ThreadSwapOut => "tso",
            EventKind::ThreadSwapIn => "tsi",
            EventKind::DelayedThreadSwapIn => "dtsi",
            EventKind::MessageRequest => "mr",
            EventKind::ReplyRequest => "rr",
            EventKind::MessageActivate => "ma",
            EventKind::MessageCompleted => "mc",
            EventKind::OpRequest => "or",
            EventKind::OpActivate => "oa",
            EventKind::OpCompleted => "oc",
            EventKind::CpuDecl | EventKind::BusDecl | EventKind::DeployObj => "",
        }
    }

    /// Returns the log name split into words, for example `Thread Swap In`.
    pub fn legend_label(self) -> String {
        let name = self.log_name();
        let mut label = String::with_capacity(name.len() + 4);
        for c in name.chars() {
            if c.is_ascii_uppercase() && !label.is_empty() {
                label.push(' ');
            }
            label.push(c);
        }
        label
    }

    /// Returns true for thread life-cycle events. Their glyphs show the thread id.
    pub fn is_thread(self) -> bool {
        matches!(
            self,
            EventKind::ThreadKill
                | EventKind::ThreadSwapOut
                | EventKind::ThreadSwapIn
                | EventKind::ThreadCreate
                | EventKind::DelayedThreadSwapIn
        )
    }

    /// Returns true for thread scheduling events.
    pub fn is_thread_swap(self) -> bool {
        matches!(
            self,
            EventKind::ThreadSwapIn | EventKind::ThreadSwapOut | EventKind::DelayedThreadSwapIn
        )
    }

    /// Returns true for events that happen on a bus.
    pub fn is_bus(self) -> bool {
        matches!(
            self,
            EventKind::ReplyRequest
                | EventKind::MessageCompleted
                | EventKind::MessageActivate
                | EventKind::MessageRequest
        )
    }

    /// Returns true for operation events.
    pub fn is_operation(self) -> bool {
        matches!(
            self,
            EventKind::OpRequest | EventKind::OpActivate | EventKind::OpCompleted
        )
    }

    /// Returns true for declarations, which are not drawn as events.
    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            EventKind::CpuDecl | EventKind::BusDecl | EventKind::DeployObj
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.log_name())
    }
}

impl FromStr for EventKind {
    type Err = EventKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.log_name() == s)
            .ok_or_else(|| EventKindParseError::new(s))
    }
}
