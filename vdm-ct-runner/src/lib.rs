// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for the combinatorial testing view of
//! [vdm-view](https://crates.io/crates/vdm-view).
//!
//! Tests are generated and executed by an external [`TestService`](service::TestService), usually
//! a language server. This crate caches the results, persists them, pages them into a four-level
//! outline and coalesces streamed results into a bounded number of view refreshes. The entry
//! point is [`CtController`](controller::CtController).

pub mod catalog;
pub mod config;
pub mod controller;
pub mod errors;
pub mod filter;
pub mod model;
pub mod provider;
pub mod service;
pub mod state;
pub mod store;
#[cfg(test)]
mod test_helpers;
pub mod tree;
pub mod verdict;
