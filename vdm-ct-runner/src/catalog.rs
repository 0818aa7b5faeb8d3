// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The in-memory test cache shared by the controller and the outline.

use crate::model::{CompleteCt, GroupRange, TestCase, TraceWithTestResults};

/// The authoritative in-memory cache of tests for every symbol.
///
/// Trace names are fully qualified, so they are unique across symbols.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CtCatalog {
    cts: Vec<CompleteCt>,
}

impl CtCatalog {
    /// Creates a catalog from a list of symbols.
    pub fn new(cts: Vec<CompleteCt>) -> Self {
        Self { cts }
    }

    /// Returns true if no symbols are known.
    pub fn is_empty(&self) -> bool {
        self.cts.is_empty()
    }

    /// Returns all symbols.
    pub fn symbols(&self) -> &[CompleteCt] {
        &self.cts
    }

    /// Replaces the contents of the catalog, returning the old contents.
    pub fn replace(&mut self, cts: Vec<CompleteCt>) -> Vec<CompleteCt> {
        std::mem::replace(&mut self.cts, cts)
    }

    /// Returns the symbol names, in display order.
    pub fn symbol_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.cts.iter().map(|ct| ct.symbol_name.as_str())
    }

    /// Returns the traces of a symbol, or an empty slice if the symbol is unknown.
    pub fn traces(&self, symbol_name: &str) -> &[TraceWithTestResults] {
        self.cts
            .iter()
            .find(|ct| ct.symbol_name == symbol_name)
            .map_or(&[], |ct| &ct.traces)
    }

    /// Looks up a trace by name.
    pub fn trace(&self, trace_name: &str) -> Option<&TraceWithTestResults> {
        self.cts
            .iter()
            .flat_map(|ct| &ct.traces)
            .find(|trace| trace.name == trace_name)
    }

    pub(crate) fn trace_mut(&mut self, trace_name: &str) -> Option<&mut TraceWithTestResults> {
        self.cts
            .iter_mut()
            .flat_map(|ct| &mut ct.traces)
            .find(|trace| trace.name == trace_name)
    }

    /// Returns the name of the symbol that defines a trace.
    pub fn symbol_of_trace(&self, trace_name: &str) -> Option<&str> {
        self.cts
            .iter()
            .find(|ct| ct.traces.iter().any(|trace| trace.name == trace_name))
            .map(|ct| ct.symbol_name.as_str())
    }

    /// Returns the number of tests generated for a trace, or zero if the trace is unknown.
    pub fn number_of_tests(&self, trace_name: &str) -> u32 {
        self.trace(trace_name)
            .map_or(0, TraceWithTestResults::number_of_tests)
    }

    /// Returns the tests of a trace within a range. Unknown traces have no tests.
    pub fn test_results(&self, range: GroupRange, trace_name: &str) -> &[TestCase] {
        self.trace(trace_name)
            .map_or(&[], |trace| trace.test_results(range))
    }
}
