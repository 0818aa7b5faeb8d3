// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::CommandContext;
use crate::{ExpectedError, Result, output::OutputWriter};
use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::OwoColorize;
use std::{collections::BTreeMap, io::Write};
use swrite::{SWrite, swrite, swriteln};
use tracing::{debug, info};
use vdm_ct_runner::config::RtlogConfig;
use vdm_rtlog::{
    draw::DrawOp,
    layout::{ScreenSize, ViewId},
    parser::{read_conjectures, read_log},
    style::{MonospaceMeasure, Style, TextMeasure},
    worker::{DiagramWorker, HostMessage, InitRequest, WorkerMessage},
};

#[derive(Debug, Args)]
pub(super) struct SummaryOpts {
    /// The real-time log to read
    #[arg(value_name = "FILE")]
    log: Utf8PathBuf,
}

impl SummaryOpts {
    pub(super) fn exec(
        self,
        cx: &CommandContext<'_>,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let data = read_log(&self.log)?;
        let styles = cx.output.stdout_styles();
        let mut out = String::new();

        swriteln!(out, "{} {}", "log:".style(styles.heading), self.log);
        swriteln!(
            out,
            "{} {}",
            "CPUs:".style(styles.heading),
            data.cpu_decls.len().style(styles.count)
        );
        for cpu in &data.cpus_with_events {
            swrite!(
                out,
                "  {} {}: {} events, {} timestamps",
                cpu.id,
                cpu.name,
                cpu.execution_events.len().style(styles.count),
                cpu.timestamps.len().style(styles.count),
            );
            if !cpu.deploy_events.is_empty() {
                swrite!(out, ", {} deployed objects", cpu.deploy_events.len());
            }
            out.push('\n');
        }

        swriteln!(
            out,
            "{} {}",
            "buses:".style(styles.heading),
            data.bus_decls.len().style(styles.count)
        );
        for bus in &data.bus_decls {
            let topology: Vec<_> = bus.topology.iter().map(u64::to_string).collect();
            swriteln!(out, "  {} {}: connects {}", bus.id, bus.name, topology.join(", "));
        }

        swriteln!(
            out,
            "{} {}",
            "events:".style(styles.heading),
            data.execution_events.len().style(styles.count)
        );
        if cx.output.verbose {
            let mut by_kind = BTreeMap::new();
            for event in &data.execution_events {
                *by_kind.entry(event.kind).or_insert(0_usize) += 1;
            }
            for (kind, count) in by_kind {
                swriteln!(out, "  {kind}: {count}");
            }
        }

        swrite!(
            out,
            "{} {}",
            "timestamps:".style(styles.heading),
            data.timestamps.len().style(styles.count)
        );
        if let (Some(first), Some(last)) = (data.timestamps.first(), data.timestamps.last()) {
            swrite!(out, " ({first} to {last})");
        }
        out.push('\n');

        write_stdout(output_writer, out.as_bytes())?;
        Ok(0)
    }
}

#[derive(Debug, Args)]
pub(super) struct RenderOpts {
    /// The real-time log to read
    #[arg(value_name = "FILE")]
    log: Utf8PathBuf,

    /// The view to render: arch, exec, legend or cpu<N>
    #[arg(long, value_name = "VIEW")]
    view: ViewId,

    /// The first time to show in execution and CPU views
    #[arg(long, value_name = "TIME", default_value_t = 0)]
    start_time: u64,

    /// Conjecture violations to mark, as written by the VDM interpreter
    #[arg(long, value_name = "FILE")]
    conjectures: Option<Utf8PathBuf>,

    /// Print the rendered scene as JSON
    #[arg(long)]
    json: bool,
}

impl RenderOpts {
    pub(super) fn exec(
        self,
        cx: &CommandContext<'_>,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let data = read_log(&self.log)?;
        let conjectures = match &self.conjectures {
            Some(path) => read_conjectures(path)?,
            None => Vec::new(),
        };
        let (style, screen) = diagram_settings(&cx.config.rtlog);
        debug!(
            "rendering {} of {} with a {}x{} screen",
            self.view, self.log, screen.width, screen.height
        );

        let mut worker =
            DiagramWorker::spawn(|| Box::new(MonospaceMeasure) as Box<dyn TextMeasure>)?;
        let response = request_view(&mut worker, data, conjectures, style, screen, &self);
        worker.finish()?;
        let message = response?;

        let out = if self.json {
            let mut json = serde_json::to_string_pretty(&message)
                .map_err(|err| ExpectedError::SceneSerializeError { err })?;
            json.push('\n');
            json
        } else {
            describe(&message, cx)
        };
        write_stdout(output_writer, out.as_bytes())?;

        let WorkerMessage::Rendered {
            view, exceed_time, ..
        } = &message;
        if let Some(time) = exceed_time {
            info!(
                "{view} does not fit past time {time}: pass --start-time {} to see the rest",
                time + 1
            );
        }
        Ok(0)
    }
}

fn request_view(
    worker: &mut DiagramWorker,
    data: vdm_rtlog::model::LogData,
    conjectures: Vec<vdm_rtlog::model::ConjectureViolation>,
    style: Style,
    screen: ScreenSize,
    opts: &RenderOpts,
) -> Result<WorkerMessage> {
    worker.send(HostMessage::Init(Box::new(InitRequest {
        data,
        conjectures,
        style,
        screen,
    })))?;
    worker.send(HostMessage::Draw {
        view: opts.view,
        start_time: opts.start_time,
    })?;
    worker
        .blocking_recv()
        .ok_or(ExpectedError::WorkerNoResponse)
}

fn diagram_settings(config: &RtlogConfig) -> (Style, ScreenSize) {
    (
        Style::new(config.font_size, &config.font_family),
        ScreenSize {
            width: config.screen_width,
            height: config.screen_height,
        },
    )
}

fn describe(message: &WorkerMessage, cx: &CommandContext<'_>) -> String {
    let WorkerMessage::Rendered {
        view,
        scene,
        width,
        height,
        exceed_time,
    } = message;
    let styles = cx.output.stdout_styles();

    let mut counts = BTreeMap::new();
    for op in &scene.ops {
        let name = match op {
            DrawOp::Line { .. } => "line",
            DrawOp::Arrow { .. } => "arrow",
            DrawOp::StrokeRect { .. } => "rect",
            DrawOp::Text { .. } => "text",
            DrawOp::Circle { .. } => "circle",
            DrawOp::Cross { .. } => "cross",
        };
        *counts.entry(name).or_insert(0_usize) += 1;
    }

    let mut out = String::new();
    swriteln!(
        out,
        "{} {width:.0}x{height:.0} px, {} draw operations",
        view.style(styles.heading),
        scene.ops.len().style(styles.count),
    );
    for (name, count) in counts {
        swriteln!(out, "  {name}: {count}");
    }
    match exceed_time {
        Some(time) => swriteln!(out, "cut after time {time}"),
        None => swriteln!(out, "complete"),
    }
    if cx.output.verbose {
        for text in scene.texts() {
            swriteln!(out, "  text: {text}");
        }
    }
    out
}

fn write_stdout(output_writer: &mut OutputWriter, bytes: &[u8]) -> Result<()> {
    let mut writer = output_writer.stdout_writer();
    writer
        .write_all(bytes)
        .and_then(|()| writer.flush())
        .map_err(ExpectedError::write_output)
}

#[cfg(test)]
mod tests {
    use crate::{
        VdmViewApp, VdmViewExitCode,
        output::{OutputContext, OutputWriter},
    };
    use camino_tempfile::Utf8TempDir;
    use clap::Parser;
    use indoc::{formatdoc, indoc};
    use pretty_assertions::assert_eq;

    const LOG: &str = indoc! {r#"
        CPUdecl -> id: 1 expl: true sys: "Sys" name: "Controller" time: 0
        BUSdecl -> id: 1 topo: {1, 2} name: "net" time: 0
        DeployObj -> objref: 3 clnm: "Sensor" cpunm: 1 time: 0
        ThreadCreate -> id: 7 period: false objref: 3 clnm: "Sensor" cpunm: 1 time: 0
        ThreadSwapIn -> id: 7 objref: 3 clnm: "Sensor" cpunm: 1 overhead: 0 time: 0
        OpRequest -> id: 7 opname: "Sensor`read" objref: 3 clnm: "Sensor" cpunm: 1 async: false time: 2
        MessageRequest -> busid: 1 fromcpu: 1 tocpu: 2 msgid: 1 callthr: 7 opname: "Actuator`set" objref: 4 clnm: "Actuator" size: 64 time: 4
        MessageActivate -> msgid: 1 time: 4
        MessageCompleted -> msgid: 1 time: 6
        ThreadKill -> id: 7 cpunm: 1 time: 8
    "#};

    fn workspace() -> Utf8TempDir {
        let dir = camino_tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("run.rtlog"), LOG).unwrap();
        dir
    }

    fn run(dir: &Utf8TempDir, args: &[&str]) -> String {
        let mut all_args = vec!["vdm-view", "--workspace-root", dir.path().as_str(), "rtlog"];
        all_args.extend_from_slice(args);
        let app = VdmViewApp::try_parse_from(all_args).unwrap();
        let mut writer = OutputWriter::Test { stdout: Vec::new() };
        let code = app.exec(OutputContext::color_never(), &mut writer).unwrap();
        assert_eq!(code, VdmViewExitCode::OK);
        let OutputWriter::Test { stdout } = writer else {
            unreachable!()
        };
        String::from_utf8(stdout).unwrap()
    }

    #[test]
    fn summary() {
        let dir = workspace();
        let log = dir.path().join("run.rtlog");
        let stdout = run(&dir, &["summary", log.as_str()]);
        assert_eq!(
            stdout,
            formatdoc! {"
                log: {log}
                CPUs: 2
                  1 Controller: 5 events, 4 timestamps, 1 deployed objects
                  2 CPU 2: 1 events, 1 timestamps
                buses: 1
                  1 net: connects 1, 2
                events: 7
                timestamps: 5 (0 to 8)
            "}
        );
    }

    #[test]
    fn render_json() {
        let dir = workspace();
        let log = dir.path().join("run.rtlog");
        let stdout = run(&dir, &["render", log.as_str(), "--view", "legend", "--json"]);
        let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(value["type"], "rendered");
        assert_eq!(value["view"], "legend");
        assert_eq!(value["exceed_time"], serde_json::Value::Null);
        assert!(value["scene"]["ops"].as_array().is_some_and(|ops| !ops.is_empty()));
    }

    #[test]
    fn render_summary() {
        let dir = workspace();
        let log = dir.path().join("run.rtlog");
        let stdout = run(&dir, &["render", log.as_str(), "--view", "arch"]);
        let mut lines = stdout.lines();
        let first = lines.next().unwrap();
        assert!(first.starts_with("arch "), "{first}");
        assert!(first.ends_with(" draw operations"), "{first}");
        assert_eq!(stdout.lines().last(), Some("complete"));
        // Two CPU boxes, one bus name.
        assert!(stdout.contains("  rect: 2\n"), "{stdout}");
        assert!(stdout.contains("  text: 3\n"), "{stdout}");
    }

    #[test]
    fn missing_log() {
        let dir = workspace();
        let missing = dir.path().join("missing.rtlog");
        let app = VdmViewApp::try_parse_from([
            "vdm-view",
            "--workspace-root",
            dir.path().as_str(),
            "rtlog",
            "summary",
            missing.as_str(),
        ])
        .unwrap();
        let mut writer = OutputWriter::Test { stdout: Vec::new() };
        let error = app
            .exec(OutputContext::color_never(), &mut writer)
            .unwrap_err();
        assert_eq!(error.process_exit_code(), VdmViewExitCode::LOG_READ_FAILED);
    }
}
