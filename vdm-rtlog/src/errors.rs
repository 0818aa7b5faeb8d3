// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the real-time log engine.

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// Error returned while parsing an [`EventKind`](crate::events::EventKind) from its log name.
#[derive(Clone, Debug, Error)]
#[error("unknown event kind `{input}`")]
pub struct EventKindParseError {
    input: String,
}

impl EventKindParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Error returned while parsing a [`ViewId`](crate::layout::ViewId).
#[derive(Clone, Debug, Error)]
#[error("unknown view `{input}` (expected arch, exec, legend or cpu<N>)")]
pub struct ViewIdParseError {
    input: String,
}

impl ViewIdParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// A line of a real-time log could not be parsed.
#[derive(Clone, Debug, Error)]
#[error("line {line}: {kind}")]
pub struct LogParseError {
    line: usize,
    kind: LogParseErrorKind,
}

impl LogParseError {
    pub(crate) fn new(line: usize, kind: LogParseErrorKind) -> Self {
        Self { line, kind }
    }

    /// Returns the one-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns what went wrong.
    pub fn kind(&self) -> &LogParseErrorKind {
        &self.kind
    }
}

/// The reason a log line could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LogParseErrorKind {
    /// A field name did not end with `:`.
    #[error("expected `<key>:`, found `{0}`")]
    MalformedKey(String),

    /// A field had no value.
    #[error("no value for field `{0}`")]
    MissingValue(String),

    /// A quoted string was not closed.
    #[error("unterminated string")]
    UnterminatedString,

    /// A field required by the event kind was absent.
    #[error("{kind} event has no `{field}` field")]
    MissingField {
        /// The event kind, as written in the log.
        kind: String,
        /// The missing field.
        field: &'static str,
    },

    /// A field had a value of the wrong type.
    #[error("field `{field}` has invalid value `{value}`")]
    InvalidValue {
        /// The field.
        field: String,
        /// The value, as written in the log.
        value: String,
    },
}

/// An error that occurred while reading input files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RtlogError {
    /// A file could not be read.
    #[error("failed to read `{path}`")]
    Read {
        /// The file.
        path: Utf8PathBuf,

        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },

    /// A real-time log could not be parsed.
    #[error("failed to parse real-time log `{path}`")]
    Parse {
        /// The log file.
        path: Utf8PathBuf,

        /// The parse error.
        #[source]
        error: LogParseError,
    },

    /// A conjecture violation file could not be parsed.
    #[error("failed to parse conjecture violations `{path}`")]
    Conjectures {
        /// The file.
        path: Utf8PathBuf,

        /// The underlying JSON error.
        #[source]
        error: serde_json::Error,
    },
}

/// An error reported by the diagram worker.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorkerError {
    /// The worker thread could not be started.
    #[error("failed to spawn diagram worker thread")]
    Spawn(#[source] io::Error),

    /// The worker thread exited, so the request could not be delivered.
    #[error("diagram worker is no longer running")]
    Closed,

    /// The worker thread panicked.
    #[error("diagram worker panicked: {message}")]
    Panic {
        /// The panic message.
        message: String,
    },
}
