// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The contract of the external test generation and execution service.

use crate::{
    errors::ServiceError,
    filter::FilterOption,
    model::{CtSymbol, NumberRange, TestCase},
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::mpsc;

/// Parameters of an execute request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// The fully qualified trace name.
    pub name: String,

    /// Filter options, present for filtered executions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Vec<FilterOption>>,

    /// The test ids to execute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<NumberRange>,
}

/// A service that lists, generates and executes combinatorial tests.
///
/// This is usually a language server. Requests are issued one at a time by
/// [`CtController`](crate::controller::CtController).
pub trait TestService {
    /// Lists the symbols and traces of the current specification.
    fn request_traces(&self) -> impl Future<Output = Result<Vec<CtSymbol>, ServiceError>>;

    /// Generates the tests of a trace, returning how many were generated.
    fn request_generate(&self, trace_name: &str)
    -> impl Future<Output = Result<u32, ServiceError>>;

    /// Executes tests.
    ///
    /// Partial results may be sent through `partial_results` while the request is running. The
    /// returned tests, if any, are merged like partial results once the request completes.
    fn request_execute(
        &self,
        request: ExecuteRequest,
        partial_results: mpsc::UnboundedSender<Vec<TestCase>>,
    ) -> impl Future<Output = Result<Option<Vec<TestCase>>, ServiceError>>;

    /// Asks the service to stop the execution in progress.
    ///
    /// The service is expected to end the pending execute request with a
    /// [`RequestCancelled`](crate::errors::ServiceErrorKind::RequestCancelled) error.
    fn cancel_execution(&self);
}
