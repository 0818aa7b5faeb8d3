// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::ServiceError,
    model::{CtSymbol, CtTrace, Location, Position, Range, ResultPair, TestCase},
    service::{ExecuteRequest, TestService},
    verdict::TestVerdict,
};
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};
use tokio::sync::{Notify, mpsc};

/// Builds a server symbol whose traces are defined on consecutive lines.
pub(crate) fn symbol(name: &str, traces: &[&str]) -> CtSymbol {
    CtSymbol {
        name: name.to_owned(),
        traces: traces
            .iter()
            .enumerate()
            .map(|(line, trace)| CtTrace {
                name: (*trace).to_owned(),
                location: Some(Location {
                    uri: format!("file:///{name}.vdmsl"),
                    range: Range {
                        start: Position {
                            line: line as u32,
                            character: 0,
                        },
                        end: Position {
                            line: line as u32,
                            character: 10,
                        },
                    },
                }),
                verdict: None,
            })
            .collect(),
    }
}

/// An in-memory test service.
///
/// Every seventh test fails. Results are streamed in chunks of ten.
#[derive(Debug, Default)]
pub(crate) struct FakeService {
    symbols: Vec<CtSymbol>,
    tests: HashMap<String, u32>,
    wait_for_cancel_after: Option<usize>,
    fail_next_execute: RefCell<Option<ServiceError>>,
    execute_requests: RefCell<Vec<ExecuteRequest>>,
    traces_requests: Cell<usize>,
    generate_requests: Cell<usize>,
    cancelled: Notify,
}

impl FakeService {
    pub(crate) fn new(symbols: Vec<CtSymbol>) -> Self {
        Self {
            symbols,
            ..Default::default()
        }
    }

    pub(crate) fn with_tests(mut self, trace_name: &str, number_of_tests: u32) -> Self {
        self.tests.insert(trace_name.to_owned(), number_of_tests);
        self
    }

    /// Makes executions report `count` results, then block until cancelled.
    pub(crate) fn wait_for_cancel_after(mut self, count: usize) -> Self {
        self.wait_for_cancel_after = Some(count);
        self
    }

    pub(crate) fn fail_next_execute(&self, error: ServiceError) {
        *self.fail_next_execute.borrow_mut() = Some(error);
    }

    pub(crate) fn execute_requests(&self) -> Vec<ExecuteRequest> {
        self.execute_requests.borrow().clone()
    }

    pub(crate) fn traces_requests(&self) -> usize {
        self.traces_requests.get()
    }

    pub(crate) fn generate_requests(&self) -> usize {
        self.generate_requests.get()
    }

    fn test_case(trace_name: &str, id: u32) -> TestCase {
        let verdict = if id % 7 == 0 {
            TestVerdict::Failed
        } else {
            TestVerdict::Passed
        };
        TestCase {
            id,
            verdict: Some(verdict),
            sequence: vec![ResultPair {
                case: format!("{trace_name}({id})"),
                result: Some(verdict.name().to_owned()),
            }],
        }
    }
}

impl TestService for FakeService {
    async fn request_traces(&self) -> Result<Vec<CtSymbol>, ServiceError> {
        self.traces_requests.set(self.traces_requests.get() + 1);
        Ok(self.symbols.clone())
    }

    async fn request_generate(&self, trace_name: &str) -> Result<u32, ServiceError> {
        self.generate_requests.set(self.generate_requests.get() + 1);
        Ok(self.tests.get(trace_name).copied().unwrap_or(0))
    }

    async fn request_execute(
        &self,
        request: ExecuteRequest,
        partial_results: mpsc::UnboundedSender<Vec<TestCase>>,
    ) -> Result<Option<Vec<TestCase>>, ServiceError> {
        self.execute_requests.borrow_mut().push(request.clone());
        if let Some(error) = self.fail_next_execute.borrow_mut().take() {
            return Err(error);
        }

        let Some(range) = request.range else {
            return Ok(None);
        };
        let start = range.start.unwrap_or(1);
        let end = range.end.unwrap_or(start.saturating_sub(1));
        let results: Vec<_> = (start..=end)
            .map(|id| Self::test_case(&request.name, id))
            .collect();

        let sent = match self.wait_for_cancel_after {
            Some(count) => &results[..count.min(results.len())],
            None => &results[..],
        };
        for chunk in sent.chunks(10) {
            let _ = partial_results.send(chunk.to_vec());
        }

        if self.wait_for_cancel_after.is_some() {
            self.cancelled.notified().await;
            return Err(ServiceError::cancelled());
        }
        Ok(None)
    }

    fn cancel_execution(&self) {
        self.cancelled.notify_one();
    }
}
