// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-trace execution state and the result batching that drives view refreshes.

use crate::{
    catalog::CtCatalog,
    model::{CompleteCt, ResultPair, TestCase, TestCaseBatchRange, TraceWithTestResults},
    provider::CtDataProvider,
    tree::NodeId,
    verdict::TestVerdict,
};
use std::collections::HashMap;
use tracing::debug;

/// Where a trace is in its generate/execute life cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceState {
    /// No tests have been generated.
    Unknown,

    /// Tests are allocated but have not been executed since generation.
    Generated,

    /// Tests are being executed and results are streaming in.
    Executing {
        /// The results received since the view was last refreshed.
        batch: TestCaseBatchRange,
    },

    /// Execution finished.
    Finished {
        /// The aggregate verdict. Unset if some tests were not executed.
        verdict: Option<TestVerdict>,
    },
}

impl TraceState {
    /// Derives the state of a trace loaded from the cache or reported by the server.
    pub fn derive(trace: &TraceWithTestResults) -> Self {
        if trace.test_cases.is_empty() {
            TraceState::Unknown
        } else if let Some(verdict) = trace.verdict {
            TraceState::Finished {
                verdict: Some(verdict),
            }
        } else {
            TraceState::Generated
        }
    }

    /// Returns true if the trace is executing.
    pub fn is_executing(&self) -> bool {
        matches!(self, TraceState::Executing { .. })
    }
}

/// The execution in progress.
#[derive(Clone, Debug)]
pub(crate) struct ExecutionRun {
    pub(crate) trace: String,
    // Group and filtered runs only report a subset of tests.
    pub(crate) is_partial: bool,
    pub(crate) cancelled: bool,
    pub(crate) failed: bool,
    pub(crate) number_of_updated_tests: u32,
}

/// The state behind the test view: cached tests, the outline, and execution progress.
#[derive(Debug)]
pub struct ViewState {
    pub(crate) catalog: CtCatalog,
    pub(crate) provider: CtDataProvider,
    pub(crate) trace_states: HashMap<String, TraceState>,
    pub(crate) execution: Option<ExecutionRun>,
    pub(crate) sequence: Vec<ResultPair>,
    batch_size_modifier: u32,
}

impl ViewState {
    pub(crate) fn new(group_size: u32, batch_size_modifier: u32) -> Self {
        Self {
            catalog: CtCatalog::default(),
            provider: CtDataProvider::new(group_size),
            trace_states: HashMap::new(),
            execution: None,
            sequence: Vec::new(),
            batch_size_modifier: batch_size_modifier.max(1),
        }
    }

    /// Returns the state of a trace. Unknown traces are [`TraceState::Unknown`].
    pub fn trace_state(&self, trace_name: &str) -> TraceState {
        self.trace_states
            .get(trace_name)
            .copied()
            .unwrap_or(TraceState::Unknown)
    }

    /// Returns the trace currently executing, if any.
    pub fn executing_trace(&self) -> Option<&str> {
        self.execution.as_ref().map(|run| run.trace.as_str())
    }

    /// Replaces the catalog and rederives every trace state.
    pub(crate) fn set_cts(&mut self, cts: Vec<CompleteCt>) {
        self.catalog.replace(cts);
        self.trace_states = self
            .catalog
            .symbols()
            .iter()
            .flat_map(|ct| &ct.traces)
            .map(|trace| (trace.name.clone(), TraceState::derive(trace)))
            .collect();
    }

    /// Applies the result of a generate request.
    ///
    /// A changed count reallocates all tests. An unchanged count keeps the tests but clears their
    /// results.
    pub(crate) fn apply_generated(&mut self, trace_name: &str, number_of_tests: u32) {
        let Some(trace) = self.catalog.trace_mut(trace_name) else {
            debug!("generated tests for unknown trace `{trace_name}`");
            return;
        };

        trace.verdict = None;
        if trace.number_of_tests() != number_of_tests {
            trace.test_cases = (1..=number_of_tests).map(TestCase::pending).collect();
        } else {
            for test_case in &mut trace.test_cases {
                test_case.verdict = None;
                test_case.sequence.clear();
            }
        }

        let state = if number_of_tests == 0 {
            TraceState::Unknown
        } else {
            TraceState::Generated
        };
        self.trace_states.insert(trace_name.to_owned(), state);
        debug!("trace `{trace_name}` has {number_of_tests} tests");

        let symbol = self.symbol_node(trace_name);
        self.provider.rebuild_view_from_element(symbol);
    }

    /// Marks a trace as executing.
    ///
    /// `first_id` is the first test id the run will report.
    pub(crate) fn begin_execution(&mut self, trace_name: &str, is_partial: bool, first_id: u32) {
        let start = first_id.saturating_sub(1);
        self.execution = Some(ExecutionRun {
            trace: trace_name.to_owned(),
            is_partial,
            cancelled: false,
            failed: false,
            number_of_updated_tests: 0,
        });
        self.trace_states.insert(
            trace_name.to_owned(),
            TraceState::Executing {
                batch: TestCaseBatchRange { start, end: start },
            },
        );
    }

    /// Merges streamed results into the executing trace.
    ///
    /// The view is refreshed at most once per group's worth of results, and always when the
    /// last test of the trace arrives.
    pub fn add_new_test_results(&mut self, trace_name: &str, test_cases: Vec<TestCase>) {
        let Some(run) = self.execution.as_mut() else {
            debug!("ignoring results for `{trace_name}`: nothing is executing");
            return;
        };
        if run.trace != trace_name {
            debug!(
                "ignoring results for `{trace_name}`: `{}` is executing",
                run.trace
            );
            return;
        }
        let Some(last_id) = test_cases.last().map(|tc| tc.id) else {
            return;
        };
        run.number_of_updated_tests = last_id;

        let Some(trace) = self.catalog.trace_mut(trace_name) else {
            debug!("executing trace `{trace_name}` vanished from the catalog");
            return;
        };
        for test_case in test_cases {
            let index = test_case.id as usize;
            if (1..=trace.test_cases.len()).contains(&index) {
                let existing = &mut trace.test_cases[index - 1];
                existing.verdict = test_case.verdict;
                existing.sequence = test_case.sequence;
            } else {
                trace.test_cases.push(test_case);
            }
        }
        let trace_last_id = trace.last_test_id();
        let number_of_tests = trace.number_of_tests();

        let Some(TraceState::Executing { batch }) = self.trace_states.get_mut(trace_name) else {
            return;
        };
        batch.end = last_id;

        if trace_last_id == Some(last_id) {
            self.test_execution_finished();
            return;
        }

        let threshold = self.provider.group_size().min(number_of_tests) * self.batch_size_modifier;
        if batch.pending() < threshold {
            return;
        }
        batch.start = batch.end;

        let node = self.provider.find_trace(trace_name);
        if node.is_some() {
            self.provider.rebuild_view_from_element(node);
        }
    }

    /// Completes the execution in progress. Does nothing if nothing is executing.
    pub fn test_execution_finished(&mut self) {
        let Some(run) = self.execution.take() else {
            return;
        };
        let Some(trace) = self.catalog.trace_mut(&run.trace) else {
            debug!("finished trace `{}` vanished from the catalog", run.trace);
            self.trace_states.remove(&run.trace);
            return;
        };

        let updated = run.number_of_updated_tests as usize;
        if !run.is_partial && !run.cancelled && !run.failed && trace.test_cases.len() > updated {
            debug!(
                "dropping {} tests of `{}` the server did not report",
                trace.test_cases.len() - updated,
                run.trace
            );
            trace.test_cases.truncate(updated);
        }

        let verdict = trace.aggregate_verdict();
        trace.verdict = verdict;
        self.trace_states
            .insert(run.trace.clone(), TraceState::Finished { verdict });

        let symbol = self.symbol_node(&run.trace);
        self.provider.rebuild_view_from_element(symbol);
    }

    pub(crate) fn mark_cancelled(&mut self) {
        if let Some(run) = &mut self.execution {
            run.cancelled = true;
        }
    }

    pub(crate) fn mark_failed(&mut self) {
        if let Some(run) = &mut self.execution {
            run.failed = true;
        }
    }

    // Falls back to a full refresh if the symbol is not displayed.
    fn symbol_node(&self, trace_name: &str) -> Option<NodeId> {
        let symbol_name = self.catalog.symbol_of_trace(trace_name)?;
        self.provider.tree().find_child(None, symbol_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DirtyEvent;
    use test_strategy::proptest;

    fn state_with_trace(group_size: u32, number_of_tests: u32) -> ViewState {
        let mut state = ViewState::new(group_size, 1);
        state.set_cts(vec![CompleteCt {
            symbol_name: "S".to_owned(),
            traces: vec![TraceWithTestResults {
                name: "S`T".to_owned(),
                location: None,
                verdict: None,
                test_cases: Vec::new(),
            }],
        }]);
        state.apply_generated("S`T", number_of_tests);
        let roots = state.provider.children(&state.catalog, None);
        state.provider.children(&state.catalog, Some(roots[0]));
        state
    }

    fn passed(ids: std::ops::RangeInclusive<u32>) -> Vec<TestCase> {
        ids.map(|id| TestCase {
            id,
            verdict: Some(TestVerdict::Passed),
            sequence: Vec::new(),
        })
        .collect()
    }

    #[test]
    fn derive_state() {
        let mut trace = TraceWithTestResults {
            name: "T".to_owned(),
            location: None,
            verdict: None,
            test_cases: Vec::new(),
        };
        assert_eq!(TraceState::derive(&trace), TraceState::Unknown);
        trace.test_cases.push(TestCase::pending(1));
        assert_eq!(TraceState::derive(&trace), TraceState::Generated);
        trace.verdict = Some(TestVerdict::Passed);
        assert_eq!(
            TraceState::derive(&trace),
            TraceState::Finished {
                verdict: Some(TestVerdict::Passed)
            }
        );
    }

    #[test]
    fn batch_coalescing() {
        let mut state = state_with_trace(100, 250);
        let trace_node = state.provider.find_trace("S`T");
        let symbol_node = state.provider.roots().first().copied();
        let mut dirty = state.provider.subscribe();

        state.begin_execution("S`T", false, 1);
        let mut refreshes = Vec::new();
        for chunk in 0..25 {
            let start = chunk * 10 + 1;
            state.add_new_test_results("S`T", passed(start..=start + 9));
            while let Ok(DirtyEvent { node }) = dirty.try_recv() {
                refreshes.push((start + 9, node));
            }
        }

        assert_eq!(
            refreshes,
            [
                (100, trace_node),
                (200, trace_node),
                // The last chunk completes the trace and refreshes the symbol.
                (250, symbol_node),
            ]
        );
        assert_eq!(
            state.trace_state("S`T"),
            TraceState::Finished {
                verdict: Some(TestVerdict::Passed)
            }
        );
        assert!(state.executing_trace().is_none());
    }

    #[proptest(cases = 64)]
    fn refresh_count_is_bounded(
        #[strategy(1u32..50)] chunk: u32,
        #[strategy(1u32..200)] group_size: u32,
        #[strategy(1u32..600)] number_of_tests: u32,
    ) {
        let mut state = state_with_trace(group_size, number_of_tests);
        let mut dirty = state.provider.subscribe();
        state.begin_execution("S`T", false, 1);

        let mut start = 1;
        let mut refreshes = 0;
        while start <= number_of_tests {
            let end = (start + chunk - 1).min(number_of_tests);
            state.add_new_test_results("S`T", passed(start..=end));
            while dirty.try_recv().is_ok() {
                refreshes += 1;
            }
            start = end + 1;
        }

        let threshold = group_size.min(number_of_tests);
        assert!(refreshes <= number_of_tests / threshold + 1);
        assert!(state.executing_trace().is_none(), "completing chunk finishes");
    }

    #[test]
    fn results_for_other_trace_are_ignored() {
        let mut state = state_with_trace(10, 20);
        state.add_new_test_results("S`T", passed(1..=5));
        assert!(
            state.catalog.trace("S`T").unwrap().test_cases[0]
                .verdict
                .is_none(),
            "nothing is executing"
        );

        state.begin_execution("S`T", false, 1);
        state.add_new_test_results("S`Other", passed(1..=5));
        assert!(
            state.catalog.trace("S`T").unwrap().test_cases[0]
                .verdict
                .is_none()
        );
    }

    #[test]
    fn full_run_truncates_unreported_tests() {
        let mut state = state_with_trace(10, 20);
        state.begin_execution("S`T", false, 1);
        state.add_new_test_results("S`T", passed(1..=12));
        state.test_execution_finished();
        let trace = state.catalog.trace("S`T").unwrap();
        assert_eq!(trace.number_of_tests(), 12);
        assert_eq!(trace.verdict, Some(TestVerdict::Passed));

        // Finishing twice is harmless.
        state.test_execution_finished();
        assert_eq!(state.catalog.trace("S`T").unwrap().number_of_tests(), 12);
    }

    #[test]
    fn partial_and_cancelled_runs_keep_tests() {
        let mut state = state_with_trace(10, 20);
        state.begin_execution("S`T", true, 11);
        state.add_new_test_results("S`T", passed(11..=15));
        state.test_execution_finished();
        let trace = state.catalog.trace("S`T").unwrap();
        assert_eq!(trace.number_of_tests(), 20);
        assert_eq!(trace.verdict, None, "tests 1-10 and 16-20 are pending");

        state.begin_execution("S`T", false, 1);
        state.add_new_test_results("S`T", passed(1..=3));
        state.mark_cancelled();
        state.test_execution_finished();
        assert_eq!(state.catalog.trace("S`T").unwrap().number_of_tests(), 20);
    }

    #[test]
    fn regenerate_resets_results() {
        let mut state = state_with_trace(10, 5);
        state.begin_execution("S`T", false, 1);
        state.add_new_test_results("S`T", passed(1..=5));
        assert!(matches!(
            state.trace_state("S`T"),
            TraceState::Finished { .. }
        ));

        state.apply_generated("S`T", 5);
        let trace = state.catalog.trace("S`T").unwrap();
        assert!(trace.test_cases.iter().all(|tc| tc.verdict.is_none()));
        assert_eq!(trace.verdict, None);
        assert_eq!(state.trace_state("S`T"), TraceState::Generated);

        state.apply_generated("S`T", 8);
        let trace = state.catalog.trace("S`T").unwrap();
        let ids: Vec<_> = trace.test_cases.iter().map(|tc| tc.id).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }
}
