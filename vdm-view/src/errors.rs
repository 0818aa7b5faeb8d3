// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;
use vdm_ct_runner::errors::{ConfigError, StoreError};
use vdm_rtlog::errors::{RtlogError, WorkerError};

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Documented exit codes for `vdm-view` failures.
///
/// Unknown or unexpected failures always result in exit code 1.
pub enum VdmViewExitCode {}

impl VdmViewExitCode {
    /// No errors occurred and vdm-view exited normally.
    pub const OK: i32 = 0;

    /// A requested item (for example a symbol) does not exist.
    pub const NOT_FOUND: i32 = 4;

    /// The workspace or configuration could not be set up.
    pub const SETUP_ERROR: i32 = 96;

    /// The combinatorial test cache could not be read.
    pub const CACHE_READ_FAILED: i32 = 102;

    /// A real-time log or conjecture file could not be read.
    pub const LOG_READ_FAILED: i32 = 103;

    /// The diagram worker failed.
    pub const RENDER_FAILED: i32 = 104;

    /// Writing output failed.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

// The #[error()] strings are placeholders. Errors are meant to be printed with
// display_to_stderr, which colorizes them.

/// An expected error, reported to the user without a backtrace.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the workspace root")]
    WorkspaceRootInvalid {
        #[source]
        err: std::io::Error,
    },
    #[error("config error")]
    ConfigError {
        #[from]
        err: ConfigError,
    },
    #[error("test cache error")]
    StoreError {
        #[from]
        err: StoreError,
    },
    #[error("symbol not found")]
    SymbolNotFound {
        name: String,
        available: Vec<String>,
    },
    #[error("rtlog error")]
    RtlogError {
        #[from]
        err: RtlogError,
    },
    #[error("diagram worker error")]
    WorkerError {
        #[from]
        err: WorkerError,
    },
    #[error("diagram worker exited without rendering")]
    WorkerNoResponse,
    #[error("error serializing scene")]
    SceneSerializeError {
        #[source]
        err: serde_json::Error,
    },
    #[error("error writing output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn workspace_root_invalid(err: std::io::Error) -> Self {
        Self::WorkspaceRootInvalid { err }
    }

    pub(crate) fn write_output(err: std::io::Error) -> Self {
        Self::WriteOutputError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::WorkspaceRootInvalid { .. } | Self::ConfigError { .. } => {
                VdmViewExitCode::SETUP_ERROR
            }
            Self::StoreError { .. } => VdmViewExitCode::CACHE_READ_FAILED,
            Self::SymbolNotFound { .. } => VdmViewExitCode::NOT_FOUND,
            Self::RtlogError { .. } => VdmViewExitCode::LOG_READ_FAILED,
            Self::WorkerError { .. } | Self::WorkerNoResponse => VdmViewExitCode::RENDER_FAILED,
            Self::SceneSerializeError { .. } | Self::WriteOutputError { .. } => {
                VdmViewExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::WorkspaceRootInvalid { err } => {
                error!("could not determine the workspace root (hint: pass --workspace-root)");
                Some(err as &dyn Error)
            }
            Self::ConfigError { err } => {
                error!("{err}");
                err.source()
            }
            Self::StoreError { err } => {
                error!("failed to read combinatorial test results");
                Some(err as &dyn Error)
            }
            Self::SymbolNotFound { name, available } => {
                let hint = if available.is_empty() {
                    "no symbols have cached test results".to_owned()
                } else {
                    format!("known symbols: {}", available.join(", "))
                };
                error!(
                    "symbol `{}` not found\n({})",
                    name.style(styles.bold),
                    hint.style(styles.hint),
                );
                None
            }
            Self::RtlogError { err } => {
                error!("{err}");
                err.source()
            }
            Self::WorkerError { err } => {
                error!("{err}");
                err.source()
            }
            Self::WorkerNoResponse => {
                error!("diagram worker exited without rendering the requested view");
                None
            }
            Self::SceneSerializeError { err } => {
                error!("failed to serialize scene as JSON");
                Some(err as &dyn Error)
            }
            Self::WriteOutputError { err } => {
                error!("failed to write output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

