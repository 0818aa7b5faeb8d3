// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the combinatorial testing engine.

use crate::tree::NodeId;
use camino::Utf8PathBuf;
use std::{fmt, io};
use thiserror::Error;

/// Error returned while parsing a [`TestVerdict`](crate::verdict::TestVerdict) from a string or
/// an integer.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized verdict: {input}\n(known values: 1-4, Passed, Failed, Inconclusive, Filtered)"
)]
pub struct VerdictParseError {
    input: String,
}

impl VerdictParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Error returned while parsing a [`GroupRange`](crate::model::GroupRange) from its description.
#[derive(Clone, Debug, Error)]
#[error("invalid test group range `{input}` (expected `<start>-<end>`)")]
pub struct GroupRangeParseError {
    input: String,
}

impl GroupRangeParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An invalid value was entered for an execution filter option.
///
/// The display strings are shown verbatim to users next to the input box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FilterInputError {
    /// The input does not parse as a number.
    #[error("Invalid input: Not a number")]
    NotANumber,

    /// The input is a number, but it has a fractional part.
    #[error("Invalid input: Not an integer")]
    NotAnInteger,

    /// The seed must be strictly positive.
    #[error("Invalid input: Not a positive integer")]
    NotPositive,

    /// The subset limitation is a percentage.
    #[error("Invalid input: Not between 1-100")]
    OutOfRange,
}

/// Error returned while parsing a reduction type from its wire name.
#[derive(Clone, Debug, Error)]
#[error("unrecognized trace reduction type: {input}\n(known values: R, NV, VN, VV)")]
pub struct ReductionParseError {
    input: String,
}

impl ReductionParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurred while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// An explicitly specified config file was not found.
    #[error("config file not found at {path}")]
    FileNotFound {
        /// The path that was checked.
        path: Utf8PathBuf,
    },

    /// An error occurred while reading the config file.
    #[error("failed to read config file at {path}")]
    Read {
        /// The path to the config file.
        path: Utf8PathBuf,

        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },

    /// An error occurred while parsing the config file.
    #[error("failed to parse config file at {path}")]
    Parse {
        /// The path to the config file.
        path: Utf8PathBuf,

        /// The underlying TOML error.
        #[source]
        error: toml::de::Error,
    },

    /// The embedded default config failed to parse.
    #[error("failed to parse embedded default config")]
    DefaultParse(#[source] toml::de::Error),

    /// A setting has a value outside its allowed range.
    #[error("in config file {path}: `{key}` must be at least {min}, found {value}")]
    InvalidValue {
        /// The path to the config file, or `<default>` for the embedded defaults.
        path: Utf8PathBuf,

        /// The dotted key of the setting.
        key: &'static str,

        /// The smallest allowed value.
        min: u64,

        /// The value found.
        value: u64,
    },
}

/// The category of a failed request to the test service.
///
/// The categories mirror the error codes a language server reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ServiceErrorKind {
    /// The request was cancelled by the client.
    RequestCancelled,

    /// The server's view of the specification changed underneath the request.
    ContentModified,

    /// The server could not parse the request.
    ParseError,

    /// Any other failure.
    Other,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestCancelled => write!(f, "request cancelled"),
            Self::ContentModified => write!(f, "content modified"),
            Self::ParseError => write!(f, "parse error"),
            Self::Other => write!(f, "request failed"),
        }
    }
}

/// A request to the test service failed.
#[derive(Clone, Debug, Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    kind: ServiceErrorKind,
    message: String,
}

impl ServiceError {
    /// Creates a new service error.
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a new error that reports a cancelled request.
    pub fn cancelled() -> Self {
        Self::new(ServiceErrorKind::RequestCancelled, "request was cancelled")
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ServiceErrorKind {
        self.kind
    }

    /// Returns the message reported by the service.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An error that occurred while reading or writing the persisted test cache.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The storage directory could not be created.
    #[error("error creating storage directory `{path}`")]
    CreateDir {
        /// The directory that could not be created.
        path: Utf8PathBuf,

        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },

    /// The storage directory could not be read.
    #[error("error reading storage directory `{path}`")]
    ReadDir {
        /// The directory that could not be read.
        path: Utf8PathBuf,

        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },

    /// A cache file could not be read.
    #[error("error reading cache file `{path}`")]
    Read {
        /// The file that could not be read.
        path: Utf8PathBuf,

        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },

    /// A cache file did not contain valid data.
    #[error("error deserializing cache file `{path}`")]
    Deserialize {
        /// The file that could not be deserialized.
        path: Utf8PathBuf,

        /// The underlying JSON error.
        #[source]
        error: serde_json::Error,
    },

    /// A symbol's tests could not be serialized.
    #[error("error serializing tests for symbol `{symbol}`")]
    Serialize {
        /// The symbol being serialized.
        symbol: String,

        /// The underlying JSON error.
        #[source]
        error: serde_json::Error,
    },

    /// A cache file could not be written.
    #[error("error writing cache file `{path}`")]
    Write {
        /// The file that could not be written.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: atomicwrites::Error<io::Error>,
    },
}

/// An error returned by a [`CtController`](crate::controller::CtController) operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CtError {
    /// The trace outline could not be requested.
    #[error("failed to request the trace outline")]
    Outline(#[source] ServiceError),

    /// A request to the test service failed.
    #[error("{operation} request for `{name}` failed")]
    Service {
        /// The request that failed.
        operation: ServiceOperation,

        /// The trace the request was for.
        name: String,

        /// The underlying error.
        #[source]
        error: ServiceError,
    },

    /// An execution was requested while another trace is still executing.
    #[error("cannot execute `{requested}`: `{executing}` is already executing")]
    ExecutionInFlight {
        /// The trace that is currently executing.
        executing: String,

        /// The trace that was requested.
        requested: String,
    },

    /// The operation does not apply to this kind of node.
    #[error("operation `{operation}` does not apply to node {node}")]
    InvalidNode {
        /// The operation that was attempted.
        operation: &'static str,

        /// The node it was attempted on.
        node: NodeId,
    },

    /// An error occurred while persisting test results.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The kind of request sent to the test service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceOperation {
    /// Generating tests for a trace.
    Generate,

    /// Executing tests for a trace.
    Execute,
}

impl fmt::Display for ServiceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Execute => write!(f, "execute"),
        }
    }
}
