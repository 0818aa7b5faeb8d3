// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The combinatorial test controller.
//!
//! [`CtController`] owns the test cache, the outline, the store and the connection to the test
//! service. It turns user actions (rebuild, generate, execute, filter, select) into service
//! requests and tree updates.

use crate::{
    catalog::CtCatalog,
    config::CtConfig,
    errors::{CtError, ServiceErrorKind, ServiceOperation},
    filter::ExecutionFilter,
    model::{Location, NumberRange, ResultPair, match_local_symbols_to_server_symbols},
    provider::{DirtyEvent, TreeItem},
    service::{ExecuteRequest, TestService},
    state::{TraceState, ViewState},
    store::CtStore,
    tree::{NodeId, NodeKind},
    verdict::TestVerdict,
};
use std::collections::BTreeSet;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Requests cancellation of the execution in progress.
///
/// Handles are cheap to clone and can be used from any task.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: broadcast::Sender<()>,
}

impl CancelHandle {
    /// Asks the controller to cancel the current execution. Does nothing if nothing is executing.
    pub fn cancel(&self) {
        // An error means nothing is listening, so there is nothing to cancel.
        let _ = self.tx.send(());
    }
}

/// How an execute request ended, when it did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// All requested tests were executed.
    Finished,

    /// The user cancelled the execution.
    Cancelled,

    /// The service reported that the specification changed. The outline or the trace was
    /// rebuilt instead.
    Resynchronized,
}

enum ExecuteTarget {
    Trace { name: String },
    Group { trace: NodeId, name: String, range: NumberRange },
}

/// Drives the combinatorial test view.
#[derive(Debug)]
pub struct CtController<S> {
    service: S,
    store: CtStore,
    view: ViewState,
    cancel_tx: broadcast::Sender<()>,
}

impl<S: TestService> CtController<S> {
    /// Creates a new controller.
    pub fn new(service: S, store: CtStore, config: &CtConfig) -> Self {
        let (cancel_tx, _) = broadcast::channel(4);
        Self {
            service,
            store,
            view: ViewState::new(config.group_size, config.batch_size_modifier),
            cancel_tx,
        }
    }

    /// Returns the test service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Returns the cached tests.
    pub fn catalog(&self) -> &CtCatalog {
        &self.view.catalog
    }

    /// Returns the view state.
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Returns the state of a trace.
    pub fn trace_state(&self, trace_name: &str) -> TraceState {
        self.view.trace_state(trace_name)
    }

    /// Returns a handle that cancels executions.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    /// Returns a receiver for dirty events.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<DirtyEvent> {
        self.view.provider.subscribe()
    }

    /// Returns the children of a node, or the symbol roots.
    pub fn children(&mut self, node: Option<NodeId>) -> Vec<NodeId> {
        self.view.provider.children(&self.view.catalog, node)
    }

    /// Returns a displayable view of a node.
    pub fn tree_item(&self, node: NodeId) -> Option<TreeItem> {
        self.view.provider.tree_item(node)
    }

    /// Records that the host opened a node.
    pub fn handle_element_expanded(&mut self, node: NodeId) {
        self.view.provider.handle_element_expanded(node);
        if self.node_kind(node) == Some(NodeKind::TestGroup) {
            self.view.provider.rebuild_view_from_element(Some(node));
        }
    }

    /// Records that the host closed a node.
    pub fn handle_element_collapsed(&mut self, node: NodeId) {
        self.view.provider.handle_element_collapsed(node);
    }

    /// Shows the sequence of the selected test in the result view, and returns it.
    ///
    /// Selecting anything but a test keeps the current result view.
    pub fn handle_selection(&mut self, node: NodeId) -> &[ResultPair] {
        if let Some(sequence) = self.test_sequence(node) {
            self.view.sequence = sequence.to_vec();
        }
        &self.view.sequence
    }

    /// Returns the contents of the result view.
    pub fn result_view(&self) -> &[ResultPair] {
        &self.view.sequence
    }

    /// Returns the evaluated sequence of a test node.
    pub fn test_sequence(&self, test: NodeId) -> Option<&[ResultPair]> {
        let tree = self.view.provider.tree();
        let node = tree.get(test)?;
        if node.kind() != NodeKind::Test {
            return None;
        }
        let id: u32 = node.label().parse().ok()?;
        let trace = tree.parent(test).and_then(|group| tree.parent(group))?;
        let trace_name = tree.get(trace)?.label();
        self.view
            .catalog
            .trace(trace_name)?
            .test_cases
            .iter()
            .find(|tc| tc.id == id)
            .map(|tc| tc.sequence.as_slice())
    }

    /// Returns the source location of a trace node.
    pub fn trace_location(&self, trace: NodeId) -> Option<&Location> {
        let node = self.view.provider.tree().get(trace)?;
        if node.kind() != NodeKind::Trace {
            return None;
        }
        self.view.catalog.trace(node.label())?.location.as_ref()
    }

    /// Applies a verdict selection to the outline.
    ///
    /// Selecting nothing leaves the filter unchanged and returns false. Selecting every verdict
    /// disables filtering.
    pub fn tree_filter(&mut self, selection: &[TestVerdict]) -> bool {
        let selection: BTreeSet<_> = selection.iter().copied().collect();
        if selection.is_empty() {
            debug!("no verdicts selected, keeping current tree filter");
            return false;
        }
        let enabled = selection.len() < TestVerdict::ALL.len();
        self.view.provider.filter_tree(enabled, selection);
        true
    }

    /// Disables verdict filtering.
    pub fn clear_tree_filter(&mut self) {
        self.view.provider.filter_tree(false, std::iter::empty());
    }

    /// Persists every symbol's tests.
    pub fn save(&self) -> Result<(), CtError> {
        self.store.save_all(self.view.catalog.symbols())?;
        Ok(())
    }

    /// Forgets an execution whose future was dropped before it completed.
    pub fn test_execution_finished(&mut self) {
        self.view.test_execution_finished();
    }

    /// Requests the trace outline and reconciles it with the cached tests.
    ///
    /// Tests are loaded from the store the first time, and taken from memory afterwards.
    pub async fn rebuild_outline(&mut self) -> Result<(), CtError> {
        let symbols = self
            .service
            .request_traces()
            .await
            .map_err(CtError::Outline)?;

        let cts = if symbols.is_empty() {
            Vec::new()
        } else {
            let local = if self.view.catalog.is_empty() {
                self.store.load().unwrap_or_else(|error| {
                    warn!(
                        "failed to load existing tests from {}: {error}",
                        self.store.dir()
                    );
                    Vec::new()
                })
            } else {
                self.view.catalog.replace(Vec::new())
            };
            match_local_symbols_to_server_symbols(symbols, local)
        };

        if cts.is_empty() {
            info!("no traces found");
        }
        self.view.set_cts(cts);
        self.view.provider.rebuild_view_from_element(None);
        self.view.sequence.clear();
        Ok(())
    }

    /// Generates the tests of a trace.
    ///
    /// If the service reports that the specification changed, the outline is rebuilt before the
    /// error is returned.
    pub async fn generate(&mut self, trace: NodeId) -> Result<(), CtError> {
        let trace_name = self.node_label(trace, NodeKind::Trace, "generate")?;
        self.check_idle(&trace_name)?;

        match self.service.request_generate(&trace_name).await {
            Ok(number_of_tests) => {
                self.view.apply_generated(&trace_name, number_of_tests);
                Ok(())
            }
            Err(error) => {
                if error.kind() == ServiceErrorKind::ContentModified {
                    info!("specification changed, rebuilding outline");
                    self.rebuild_outline().await?;
                }
                Err(CtError::Service {
                    operation: ServiceOperation::Generate,
                    name: trace_name,
                    error,
                })
            }
        }
    }

    /// Executes a trace or a test group.
    ///
    /// With a filter, the trace is executed as a filtered run. Filters do not apply to groups.
    /// Results are merged as they stream in. Whatever the outcome, the execution is finished and
    /// the tests are persisted before this returns.
    pub async fn execute(
        &mut self,
        node: NodeId,
        filter: Option<ExecutionFilter>,
    ) -> Result<ExecuteOutcome, CtError> {
        let target = match self.node_kind(node) {
            Some(NodeKind::Trace) => ExecuteTarget::Trace {
                name: self.node_label(node, NodeKind::Trace, "execute")?,
            },
            Some(NodeKind::TestGroup) => {
                let trace = self.view.provider.tree().parent(node);
                let range = self.view.provider.group_range(node);
                let (Some(trace), Some(range)) = (trace, range) else {
                    return Err(CtError::InvalidNode {
                        operation: "execute",
                        node,
                    });
                };
                ExecuteTarget::Group {
                    trace,
                    name: self.node_label(trace, NodeKind::Trace, "execute")?,
                    range: NumberRange {
                        start: Some(range.start),
                        end: Some(range.end),
                    },
                }
            }
            _ => {
                return Err(CtError::InvalidNode {
                    operation: "execute",
                    node,
                });
            }
        };

        let (trace_name, range, is_partial, filter) = match &target {
            ExecuteTarget::Trace { name } => {
                self.check_idle(name)?;
                if self.view.catalog.number_of_tests(name) == 0 {
                    self.generate(node).await?;
                }
                let number_of_tests = self.view.catalog.number_of_tests(name);
                let range = (number_of_tests > 0).then_some(NumberRange {
                    start: None,
                    end: Some(number_of_tests),
                });
                (name.clone(), range, filter.is_some(), filter)
            }
            ExecuteTarget::Group { name, range, .. } => {
                self.check_idle(name)?;
                (name.clone(), Some(*range), true, None)
            }
        };

        let first_id = range.and_then(|r| r.start).unwrap_or(1);
        self.view.begin_execution(&trace_name, is_partial, first_id);
        debug!("executing `{trace_name}` with range {range:?}");

        let request = ExecuteRequest {
            name: trace_name.clone(),
            filter: filter.map(|f| f.to_options()),
            range,
        };
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let mut cancel_rx = self.cancel_tx.subscribe();

        let service = &self.service;
        let view = &mut self.view;
        let response = {
            let request = service.request_execute(request, results_tx);
            tokio::pin!(request);
            let mut results_done = false;
            let mut cancel_requested = false;
            loop {
                tokio::select! {
                    response = &mut request => break response,
                    results = results_rx.recv(), if !results_done => match results {
                        Some(results) => view.add_new_test_results(&trace_name, results),
                        None => results_done = true,
                    },
                    _ = cancel_rx.recv(), if !cancel_requested => {
                        info!("cancelling execution of `{trace_name}`");
                        cancel_requested = true;
                        service.cancel_execution();
                    }
                }
            }
        };
        while let Ok(results) = results_rx.try_recv() {
            self.view.add_new_test_results(&trace_name, results);
        }

        let result = match response {
            Ok(final_results) => {
                if let Some(results) = final_results {
                    self.view.add_new_test_results(&trace_name, results);
                }
                Ok(ExecuteOutcome::Finished)
            }
            Err(error) => match error.kind() {
                ServiceErrorKind::RequestCancelled => {
                    info!("execution of `{trace_name}` was cancelled");
                    self.view.mark_cancelled();
                    Ok(ExecuteOutcome::Cancelled)
                }
                _ => {
                    self.view.mark_failed();
                    Err(error)
                }
            },
        };

        self.view.test_execution_finished();
        if let Err(error) = self.save() {
            warn!("failed to save test results: {error}");
        }

        match result {
            Ok(outcome) => Ok(outcome),
            Err(error) if error.kind() == ServiceErrorKind::ContentModified => {
                match target {
                    ExecuteTarget::Trace { .. } if error.message().contains("not found") => {
                        info!("trace `{trace_name}` not found, rebuilding outline");
                        self.rebuild_outline().await?;
                    }
                    ExecuteTarget::Trace { .. } => {
                        info!("trace `{trace_name}` out of sync, generating again");
                        self.generate(node).await?;
                    }
                    ExecuteTarget::Group { trace, .. } => {
                        info!("trace `{trace_name}` out of sync, generating again");
                        self.generate(trace).await?;
                    }
                }
                Ok(ExecuteOutcome::Resynchronized)
            }
            Err(error) => Err(CtError::Service {
                operation: ServiceOperation::Execute,
                name: trace_name,
                error,
            }),
        }
    }

    /// Rebuilds the outline, then generates and executes every trace of every symbol in order.
    ///
    /// Failures of individual traces are logged and skipped. Cancellation stops the run.
    pub async fn full_execute(&mut self) -> Result<(), CtError> {
        self.rebuild_outline().await?;

        let mut traces = Vec::new();
        for symbol in self.children(None) {
            traces.extend(self.children(Some(symbol)));
        }

        for trace in traces {
            if let Err(error) = self.generate(trace).await {
                warn!("{error}");
            }
            match self.execute(trace, None).await {
                Ok(ExecuteOutcome::Cancelled) => {
                    info!("full execution cancelled");
                    return Ok(());
                }
                Ok(_) => {}
                Err(error) => warn!("{error}"),
            }
        }
        Ok(())
    }

    fn check_idle(&self, requested: &str) -> Result<(), CtError> {
        match self.view.executing_trace() {
            Some(executing) => Err(CtError::ExecutionInFlight {
                executing: executing.to_owned(),
                requested: requested.to_owned(),
            }),
            None => Ok(()),
        }
    }

    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.view.provider.tree().get(node).map(|n| n.kind())
    }

    fn node_label(
        &self,
        node: NodeId,
        kind: NodeKind,
        operation: &'static str,
    ) -> Result<String, CtError> {
        match self.view.provider.tree().get(node) {
            Some(n) if n.kind() == kind => Ok(n.label().to_owned()),
            _ => Err(CtError::InvalidNode { operation, node }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{ConfigLocation, VdmViewConfig},
        errors::ServiceError,
        model::TestCase,
        test_helpers::{FakeService, symbol},
    };
    use camino_tempfile::Utf8TempDir;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn new_controller(service: FakeService, temp: &Utf8TempDir) -> CtController<FakeService> {
        let mut config = VdmViewConfig::from_location(ConfigLocation::Isolated)
            .unwrap()
            .ct;
        config.group_size = 10;
        let store = CtStore::new(temp.path(), &config.storage_dir);
        CtController::new(service, store, &config)
    }

    fn trace_node(controller: &mut CtController<FakeService>, name: &str) -> NodeId {
        for symbol in controller.children(None) {
            controller.children(Some(symbol));
        }
        controller
            .view()
            .provider
            .find_trace(name)
            .expect("trace is in the outline")
    }

    #[tokio::test]
    async fn rebuild_generate_execute() {
        let temp = Utf8TempDir::new().unwrap();
        let service = FakeService::new(vec![symbol("A", &["A`T1", "A`T2"])]).with_tests("A`T1", 25);
        let mut controller = new_controller(service, &temp);

        controller.rebuild_outline().await.unwrap();
        let trace = trace_node(&mut controller, "A`T1");
        assert_eq!(controller.trace_state("A`T1"), TraceState::Unknown);

        let outcome = controller.execute(trace, None).await.unwrap();
        assert_eq!(outcome, ExecuteOutcome::Finished);
        assert_eq!(
            controller.trace_state("A`T1"),
            TraceState::Finished {
                verdict: Some(TestVerdict::Failed)
            }
        );
        assert_eq!(controller.catalog().number_of_tests("A`T1"), 25);
        assert_eq!(
            controller.service().execute_requests()[0].range,
            Some(NumberRange {
                start: None,
                end: Some(25)
            })
        );

        // Results were persisted.
        let store = CtStore::new(temp.path(), camino::Utf8Path::new(".generated"));
        let saved = store.load().unwrap();
        assert_eq!(saved[0].traces[0].verdict, Some(TestVerdict::Failed));

        let groups = controller.children(Some(trace));
        assert_eq!(groups.len(), 3);
        let tests = controller.children(Some(groups[0]));
        let sequence = controller.handle_selection(tests[0]).to_vec();
        assert_eq!(sequence[0].case, "A`T1(1)");
        assert_eq!(controller.result_view(), sequence.as_slice());
        assert!(controller.trace_location(trace).is_some());
    }

    #[tokio::test]
    async fn outline_reloads_store_and_drops_stale_traces() {
        let temp = Utf8TempDir::new().unwrap();
        let service = FakeService::new(vec![symbol("A", &["A`T1", "A`T2"])]).with_tests("A`T1", 5);
        let mut controller = new_controller(service, &temp);
        controller.rebuild_outline().await.unwrap();
        let trace = trace_node(&mut controller, "A`T1");
        controller.execute(trace, None).await.unwrap();

        // A fresh controller picks up the saved results, and the server no longer reports T2.
        let service = FakeService::new(vec![symbol("A", &["A`T1", "A`T3"])]);
        let mut controller2 = new_controller(service, &temp);
        controller2.rebuild_outline().await.unwrap();
        let names: Vec<_> = controller2
            .catalog()
            .traces("A")
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, ["A`T1", "A`T3"]);
        assert_eq!(controller2.catalog().number_of_tests("A`T1"), 5);
        assert!(matches!(
            controller2.trace_state("A`T1"),
            TraceState::Finished { .. }
        ));
    }

    #[tokio::test]
    async fn group_execution_and_filter() {
        let temp = Utf8TempDir::new().unwrap();
        let service = FakeService::new(vec![symbol("A", &["A`T"])]).with_tests("A`T", 30);
        let mut controller = new_controller(service, &temp);
        controller.rebuild_outline().await.unwrap();
        let trace = trace_node(&mut controller, "A`T");
        controller.generate(trace).await.unwrap();
        let groups = controller.children(Some(trace));
        assert_eq!(groups.len(), 3);

        controller.execute(groups[1], None).await.unwrap();
        let request = controller.service().execute_requests()[0].clone();
        assert_eq!(
            request.range,
            Some(NumberRange {
                start: Some(11),
                end: Some(20)
            })
        );
        assert_eq!(controller.catalog().number_of_tests("A`T"), 30, "group runs keep tests");
        assert_eq!(
            controller.trace_state("A`T"),
            TraceState::Finished { verdict: None }
        );

        assert!(!controller.tree_filter(&[]));
        assert!(controller.tree_filter(&[TestVerdict::Failed]));
        let groups = controller.children(Some(trace));
        let descriptions: Vec<_> = groups
            .iter()
            .filter_map(|&g| controller.tree_item(g)?.description)
            .collect();
        assert_eq!(descriptions, ["11-20"], "only group 2 has a failed test");
        assert!(controller.tree_filter(&TestVerdict::ALL));
        assert!(controller.view().provider.verdicts_to_show().is_none());

        let filter = ExecutionFilter::default();
        controller.execute(trace, Some(filter)).await.unwrap();
        let request = controller.service().execute_requests()[1].clone();
        assert_eq!(request.filter, Some(filter.to_options()));
    }

    #[tokio::test]
    async fn cancellation() {
        let temp = Utf8TempDir::new().unwrap();
        let service = FakeService::new(vec![symbol("A", &["A`T"])])
            .with_tests("A`T", 30)
            .wait_for_cancel_after(10);
        let mut controller = new_controller(service, &temp);
        controller.rebuild_outline().await.unwrap();
        let trace = trace_node(&mut controller, "A`T");
        controller.generate(trace).await.unwrap();

        let handle = controller.cancel_handle();
        let cancel = async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        };
        let (outcome, ()) = tokio::join!(controller.execute(trace, None), cancel);
        assert_eq!(outcome.unwrap(), ExecuteOutcome::Cancelled);
        assert_eq!(
            controller.catalog().number_of_tests("A`T"),
            30,
            "cancelled runs keep unreported tests"
        );
        assert_eq!(controller.trace_state("A`T"), TraceState::Finished { verdict: None });
    }

    #[tokio::test]
    async fn dropped_execution_blocks_until_finished() {
        let temp = Utf8TempDir::new().unwrap();
        let service = FakeService::new(vec![symbol("A", &["A`T"])])
            .with_tests("A`T", 30)
            .wait_for_cancel_after(10);
        let mut controller = new_controller(service, &temp);
        controller.rebuild_outline().await.unwrap();
        let trace = trace_node(&mut controller, "A`T");
        controller.generate(trace).await.unwrap();

        tokio::time::timeout(Duration::from_millis(20), controller.execute(trace, None))
            .await
            .expect_err("execution waits for cancellation");
        assert!(controller.trace_state("A`T").is_executing());

        let error = controller.execute(trace, None).await.expect_err("in flight");
        assert!(matches!(error, CtError::ExecutionInFlight { .. }), "{error}");

        controller.test_execution_finished();
        assert!(!controller.trace_state("A`T").is_executing());
    }

    #[tokio::test]
    async fn content_modified_recovery() {
        let temp = Utf8TempDir::new().unwrap();
        let service = FakeService::new(vec![symbol("A", &["A`T"])]).with_tests("A`T", 5);
        let mut controller = new_controller(service, &temp);
        controller.rebuild_outline().await.unwrap();
        let trace = trace_node(&mut controller, "A`T");
        controller.generate(trace).await.unwrap();

        controller.service().fail_next_execute(ServiceError::new(
            ServiceErrorKind::ContentModified,
            "trace A`T not found",
        ));
        let outcome = controller.execute(trace, None).await.unwrap();
        assert_eq!(outcome, ExecuteOutcome::Resynchronized);
        assert_eq!(controller.service().traces_requests(), 2, "outline was rebuilt");

        controller.service().fail_next_execute(ServiceError::new(
            ServiceErrorKind::ContentModified,
            "trace changed",
        ));
        let generates = controller.service().generate_requests();
        let trace = trace_node(&mut controller, "A`T");
        let outcome = controller.execute(trace, None).await.unwrap();
        assert_eq!(outcome, ExecuteOutcome::Resynchronized);
        assert_eq!(controller.service().generate_requests(), generates + 1);

        controller.service().fail_next_execute(ServiceError::new(
            ServiceErrorKind::Other,
            "internal error",
        ));
        let error = controller.execute(trace, None).await.expect_err("other errors surface");
        assert!(matches!(
            error,
            CtError::Service {
                operation: ServiceOperation::Execute,
                ..
            }
        ));
        assert_eq!(
            controller.catalog().number_of_tests("A`T"),
            5,
            "failed runs keep their tests"
        );
    }

    #[tokio::test]
    async fn full_execute_skips_failures() {
        let temp = Utf8TempDir::new().unwrap();
        let service = FakeService::new(vec![
            symbol("A", &["A`T1", "A`T2"]),
            symbol("B", &["B`T1"]),
        ])
        .with_tests("A`T1", 3)
        .with_tests("A`T2", 4)
        .with_tests("B`T1", 5);
        service.fail_next_execute(ServiceError::new(ServiceErrorKind::Other, "boom"));
        let mut controller = new_controller(service, &temp);

        controller.full_execute().await.unwrap();
        let names: Vec<_> = controller
            .service()
            .execute_requests()
            .iter()
            .map(|r| r.name.clone())
            .collect();
        assert_eq!(names, ["A`T1", "A`T2", "B`T1"]);
        assert!(matches!(
            controller.trace_state("A`T2"),
            TraceState::Finished { verdict: Some(_) }
        ));
        assert!(matches!(
            controller.trace_state("B`T1"),
            TraceState::Finished { verdict: Some(_) }
        ));
    }

    #[tokio::test]
    async fn invalid_nodes() {
        let temp = Utf8TempDir::new().unwrap();
        let service = FakeService::new(vec![symbol("A", &["A`T"])]).with_tests("A`T", 5);
        let mut controller = new_controller(service, &temp);
        controller.rebuild_outline().await.unwrap();
        let symbol = controller.children(None)[0];
        let error = controller.generate(symbol).await.expect_err("symbols cannot generate");
        assert!(matches!(error, CtError::InvalidNode { .. }));
        let error = controller.execute(symbol, None).await.expect_err("symbols cannot execute");
        assert!(matches!(error, CtError::InvalidNode { .. }));

        // Results arriving outside of an execution are ignored.
        let mut results = vec![TestCase::pending(1)];
        results[0].verdict = Some(TestVerdict::Passed);
        controller.view.add_new_test_results("A`T", results);
        assert_eq!(controller.catalog().number_of_tests("A`T"), 0);
    }
}
