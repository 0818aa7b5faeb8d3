// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command dispatch and execution.

mod ct;
mod rtlog;

use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Subcommand};
use tracing::debug;
use vdm_ct_runner::config::{ConfigLocation, VdmViewConfig};

/// Views of VDM combinatorial test results and real-time execution logs.
#[derive(Debug, clap::Parser)]
#[command(
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct VdmViewApp {
    #[clap(flatten)]
    common: CommonOpts,

    #[clap(subcommand)]
    command: Command,
}

impl VdmViewApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.common.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let workspace_root = match self.common.workspace_root {
            Some(root) => root,
            None => current_dir()?,
        };
        let location = match &self.common.config_file {
            Some(path) => ConfigLocation::Explicit(path),
            None => ConfigLocation::Workspace(&workspace_root),
        };
        let config = VdmViewConfig::from_location(location)?;
        debug!("workspace root: {workspace_root}, config: {config:?}");

        let cx = CommandContext {
            workspace_root: &workspace_root,
            config: &config,
            output,
        };
        match self.command {
            Command::Ct {
                command: CtCommand::Show(opts),
            } => opts.exec(&cx, output_writer),
            Command::Rtlog { command } => match command {
                RtlogCommand::Summary(opts) => opts.exec(&cx, output_writer),
                RtlogCommand::Render(opts) => opts.exec(&cx, output_writer),
            },
        }
    }
}

#[derive(Debug, Args)]
struct CommonOpts {
    /// Workspace root [default: current directory]
    #[arg(long, global = true, value_name = "DIR", env = "VDM_VIEW_WORKSPACE_ROOT")]
    workspace_root: Option<Utf8PathBuf>,

    /// Config file [default: <workspace-root>/.config/vdm-view.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    #[clap(flatten)]
    output: OutputOpts,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Combinatorial test results
    Ct {
        #[clap(subcommand)]
        command: CtCommand,
    },

    /// Real-time execution logs
    Rtlog {
        #[clap(subcommand)]
        command: RtlogCommand,
    },
}

#[derive(Debug, Subcommand)]
enum CtCommand {
    /// Show the cached test outline: symbols, traces and test groups
    Show(ct::ShowOpts),
}

#[derive(Debug, Subcommand)]
enum RtlogCommand {
    /// Summarize the CPUs, buses and events of a log
    Summary(rtlog::SummaryOpts),

    /// Lay out a diagram view and print its draw instructions
    Render(rtlog::RenderOpts),
}

/// State shared by every command.
struct CommandContext<'a> {
    workspace_root: &'a Utf8Path,
    config: &'a VdmViewConfig,
    output: OutputContext,
}

fn current_dir() -> Result<Utf8PathBuf> {
    let dir = std::env::current_dir().map_err(ExpectedError::workspace_root_invalid)?;
    Utf8PathBuf::try_from(dir)
        .map_err(|err| ExpectedError::workspace_root_invalid(err.into_io_error()))
}
