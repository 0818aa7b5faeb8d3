// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Parsing and diagram layout for VDM-RT real-time execution logs.
//!
//! A `.rtlog` file is read with [`parser::read_log`] into [`LogData`](model::LogData). A
//! [`DiagramEngine`](layout::DiagramEngine) lays the data out into backend-independent
//! [`Scene`](draw::Scene)s: an architecture view, an execution overview, one view per CPU and a
//! legend. [`DiagramWorker`](worker::DiagramWorker) runs the engine on its own thread.

pub mod draw;
pub mod errors;
pub mod events;
pub mod layout;
pub mod model;
pub mod parser;
pub mod style;
#[cfg(test)]
mod test_helpers;
pub mod worker;
