// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::CommandContext;
use crate::{ExpectedError, Result, output::OutputWriter};
use clap::Args;
use owo_colors::OwoColorize;
use std::io::Write;
use swrite::{SWrite, swrite, swriteln};
use vdm_ct_runner::{
    catalog::CtCatalog, provider::CtDataProvider, store::CtStore, tree::NodeKind,
    verdict::TestVerdict,
};

#[derive(Debug, Args)]
pub(super) struct ShowOpts {
    /// Only show this symbol
    #[arg(long, value_name = "NAME")]
    symbol: Option<String>,

    /// Only show groups and tests with these verdicts
    #[arg(long = "verdict", value_name = "VERDICT", value_delimiter = ',')]
    verdicts: Vec<TestVerdict>,

    /// Also list individual tests
    #[arg(long)]
    tests: bool,
}

impl ShowOpts {
    pub(super) fn exec(
        self,
        cx: &CommandContext<'_>,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let store = CtStore::new(cx.workspace_root, &cx.config.ct.storage_dir);
        let catalog = CtCatalog::new(store.load()?);

        if let Some(symbol) = &self.symbol
            && !catalog.symbol_names().any(|name| name == symbol.as_str())
        {
            return Err(ExpectedError::SymbolNotFound {
                name: symbol.clone(),
                available: catalog.symbol_names().map(str::to_owned).collect(),
            });
        }
        if catalog.is_empty() {
            tracing::info!("no cached test results in {}", store.dir());
            return Ok(0);
        }

        let mut provider = CtDataProvider::new(cx.config.ct.group_size);
        if !self.verdicts.is_empty() {
            provider.filter_tree(true, self.verdicts.iter().copied());
        }

        let outline = self.render_outline(&mut provider, &catalog, cx);
        let mut writer = output_writer.stdout_writer();
        writer
            .write_all(outline.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(ExpectedError::write_output)?;
        Ok(0)
    }

    fn render_outline(
        &self,
        provider: &mut CtDataProvider,
        catalog: &CtCatalog,
        cx: &CommandContext<'_>,
    ) -> String {
        let styles = cx.output.stdout_styles();
        let mut out = String::new();

        // Walk the outline the way a tree host would, one level at a time.
        let mut stack: Vec<_> = provider.children(catalog, None).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            let Some(item) = provider.tree_item(node) else {
                continue;
            };
            if item.kind == NodeKind::Symbol
                && self.symbol.as_ref().is_some_and(|symbol| *symbol != item.label)
            {
                continue;
            }

            let depth = match item.kind {
                NodeKind::Symbol => 0,
                NodeKind::Trace => 1,
                NodeKind::TestGroup => 2,
                NodeKind::Test => 3,
            };
            swrite!(out, "{:width$}", "", width = depth * 2);
            match item.kind {
                NodeKind::Symbol => swrite!(out, "{}", item.label.style(styles.heading)),
                NodeKind::Trace => {
                    let count = catalog.number_of_tests(&item.label);
                    swrite!(
                        out,
                        "{} ({} {})",
                        item.label,
                        count.style(styles.count),
                        if count == 1 { "test" } else { "tests" },
                    );
                }
                NodeKind::TestGroup => {
                    swrite!(out, "{}", item.label);
                    if let Some(description) = &item.description {
                        swrite!(out, " {description}");
                    }
                }
                NodeKind::Test => swrite!(out, "{}", item.label),
            }
            if item.kind == NodeKind::Symbol {
                out.push('\n');
            } else {
                let verdict = item.verdict.map_or("pending", TestVerdict::name);
                swriteln!(out, ": {}", verdict.style(styles.verdict(item.verdict)));
            }

            if item.kind != NodeKind::Test && (self.tests || item.kind != NodeKind::TestGroup) {
                stack.extend(provider.children(catalog, Some(node)).into_iter().rev());
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        VdmViewApp, VdmViewExitCode,
        output::{OutputContext, OutputWriter},
    };
    use camino::Utf8Path;
    use camino_tempfile::Utf8TempDir;
    use clap::Parser;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use vdm_ct_runner::{
        model::{CompleteCt, TestCase, TraceWithTestResults},
        store::CtStore,
        verdict::{TestVerdict, aggregate_verdict},
    };

    fn trace(name: &str, verdicts: &[Option<TestVerdict>]) -> TraceWithTestResults {
        let test_cases: Vec<_> = verdicts
            .iter()
            .zip(1..)
            .map(|(verdict, id)| TestCase {
                verdict: *verdict,
                ..TestCase::pending(id)
            })
            .collect();
        TraceWithTestResults {
            name: name.to_owned(),
            location: None,
            verdict: if test_cases.is_empty() {
                None
            } else {
                aggregate_verdict(test_cases.iter().map(|t| t.verdict))
            },
            test_cases,
        }
    }

    fn workspace() -> Utf8TempDir {
        use TestVerdict::*;

        let dir = camino_tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".config")).unwrap();
        std::fs::write(
            dir.path().join(".config/vdm-view.toml"),
            "[ct]\ngroup-size = 2\n",
        )
        .unwrap();

        let store = CtStore::new(dir.path(), Utf8Path::new(".generated"));
        store
            .save_all(&[
                CompleteCt {
                    symbol_name: "Sensors".to_owned(),
                    traces: vec![
                        trace("Sensors`Range", &[Some(Passed), Some(Failed), Some(Passed)]),
                        trace("Sensors`Empty", &[]),
                    ],
                },
                CompleteCt {
                    symbol_name: "Buffer".to_owned(),
                    traces: vec![trace("Buffer`Fill", &[Some(Passed), None])],
                },
            ])
            .unwrap();
        dir
    }

    fn run(args: &[&str]) -> (i32, String) {
        let app = VdmViewApp::try_parse_from(args).unwrap();
        let mut writer = OutputWriter::Test { stdout: Vec::new() };
        let code = app
            .exec(OutputContext::color_never(), &mut writer)
            .unwrap();
        let OutputWriter::Test { stdout } = writer else {
            unreachable!()
        };
        (code, String::from_utf8(stdout).unwrap())
    }

    #[test]
    fn show_outline() {
        let dir = workspace();
        let (code, stdout) = run(&[
            "vdm-view",
            "--workspace-root",
            dir.path().as_str(),
            "ct",
            "show",
        ]);
        assert_eq!(code, 0);
        assert_eq!(
            stdout,
            indoc! {"
                Buffer
                  Buffer`Fill (2 tests): pending
                    test group 1-2: pending
                Sensors
                  Sensors`Range (3 tests): Failed
                    test group 1-2: Failed
                    test group 3-3: Passed
                  Sensors`Empty (0 tests): pending
            "}
        );
    }

    #[test]
    fn show_filtered_tests_of_one_symbol() {
        let dir = workspace();
        let (_, stdout) = run(&[
            "vdm-view",
            "--workspace-root",
            dir.path().as_str(),
            "ct",
            "show",
            "--symbol",
            "Sensors",
            "--verdict",
            "failed",
            "--tests",
        ]);
        assert_eq!(
            stdout,
            indoc! {"
                Sensors
                  Sensors`Range (3 tests): Failed
                    test group 1-2: Failed
                      2: Failed
                  Sensors`Empty (0 tests): pending
            "}
        );
    }

    #[test]
    fn unknown_symbol() {
        let dir = workspace();
        let app = VdmViewApp::try_parse_from([
            "vdm-view",
            "--workspace-root",
            dir.path().as_str(),
            "ct",
            "show",
            "--symbol",
            "Missing",
        ])
        .unwrap();
        let mut writer = OutputWriter::Test { stdout: Vec::new() };
        let error = app
            .exec(OutputContext::color_never(), &mut writer)
            .unwrap_err();
        assert_eq!(error.process_exit_code(), VdmViewExitCode::NOT_FOUND);
    }
}
