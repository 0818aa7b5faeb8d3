// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line views of VDM combinatorial test results and real-time execution logs.
//!
//! `vdm-view ct` shows the persisted combinatorial test outline. `vdm-view rtlog` summarizes a
//! `.rtlog` file and renders its diagrams as draw instructions.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
