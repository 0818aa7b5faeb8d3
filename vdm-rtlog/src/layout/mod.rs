// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagram layout.
//!
//! A [`DiagramEngine`] owns parsed log data and lays it out into [`Scene`]s. Four kinds of view
//! exist:
//!
//! * the architecture view, showing CPUs and the buses connecting them
//! * the execution overview, one row per CPU and bus and one column per event
//! * one view per CPU, one lane per object and bus with time flowing downwards
//! * the legend
//!
//! Execution and CPU views can be larger than a canvas allows. In that case the view is cut at a
//! timestamp boundary and the result carries the last time drawn as
//! [`exceed_time`](RenderResult::exceed_time). Rendering again with a later start time shows the
//! rest.

mod arch;
mod cpu;
mod exec;
mod legend;

use crate::{
    draw::{DrawOp, Point, Scene},
    errors::ViewIdParseError,
    events::EventKind,
    model::{ConjectureViolation, LogData},
    style::{Font, Style, TextMeasure, TextMetrics},
};
use serde::{Serialize, Serializer};
use smol_str::SmolStr;
use std::{
    collections::HashMap,
    f64::consts::{FRAC_PI_2, FRAC_PI_4},
    fmt,
    str::FromStr,
};
use tracing::debug;

/// The largest canvas area that can be displayed, in square pixels.
pub const CANVAS_MAX_AREA: f64 = 67_108_864.0;

/// The largest canvas width or height that can be displayed, in pixels.
pub const CANVAS_MAX_SIZE: f64 = 16_384.0;

/// Returns true if a canvas of the given size cannot be displayed.
pub fn exceeds_canvas_limits(width: f64, height: f64) -> bool {
    width > CANVAS_MAX_SIZE || height > CANVAS_MAX_SIZE || width * height > CANVAS_MAX_AREA
}

/// Identifies a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewId {
    /// The architecture view.
    Arch,
    /// The execution overview.
    Exec,
    /// The legend.
    Legend,
    /// The view of the CPU with the given id.
    Cpu(u64),
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewId::Arch => f.write_str("arch"),
            ViewId::Exec => f.write_str("exec"),
            ViewId::Legend => f.write_str("legend"),
            ViewId::Cpu(id) => write!(f, "cpu{id}"),
        }
    }
}

impl FromStr for ViewId {
    type Err = ViewIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "arch" => Ok(ViewId::Arch),
            "exec" => Ok(ViewId::Exec),
            "legend" => Ok(ViewId::Legend),
            _ if lower.contains("cpu") => {
                // Anything naming a CPU works, so `CPU 2` and `cpu2` are the same view.
                let digits: String = lower.chars().filter(char::is_ascii_digit).collect();
                digits
                    .parse()
                    .map(ViewId::Cpu)
                    .map_err(|_| ViewIdParseError::new(s))
            }
            _ => Err(ViewIdParseError::new(s)),
        }
    }
}

impl Serialize for ViewId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The size of the screen the diagrams are shown on.
///
/// CPU views stop growing once they no longer fit on the screen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScreenSize {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1728.0,
            height: 972.0,
        }
    }
}

/// A rendered view.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderResult {
    /// The view that was rendered.
    pub view: ViewId,
    /// The laid out view.
    pub scene: Scene,
    /// If the view was cut short, the time of the last timestamp drawn.
    pub exceed_time: Option<u64>,
}

/// Lays out views of a real-time log.
pub struct DiagramEngine {
    data: LogData,
    conjectures: Vec<ConjectureViolation>,
    style: Style,
    measure: Box<dyn TextMeasure>,
    screen: ScreenSize,
    // The execution overview is laid out once and sliced per start time.
    exec: Option<exec::ExecGrid>,
    rendered: HashMap<(ViewId, u64), RenderResult>,
}

impl fmt::Debug for DiagramEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagramEngine")
            .field("cpus", &self.data.cpu_decls.len())
            .field("events", &self.data.execution_events.len())
            .field("style", &self.style)
            .field("screen", &self.screen)
            .field("rendered", &self.rendered.len())
            .finish_non_exhaustive()
    }
}

impl DiagramEngine {
    /// Creates an engine for the given log.
    pub fn new(
        data: LogData,
        conjectures: Vec<ConjectureViolation>,
        style: Style,
        measure: Box<dyn TextMeasure>,
        screen: ScreenSize,
    ) -> Self {
        Self {
            data,
            conjectures,
            style,
            measure,
            screen,
            exec: None,
            rendered: HashMap::new(),
        }
    }

    /// Returns the log data.
    pub fn data(&self) -> &LogData {
        &self.data
    }

    /// Returns the current style.
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Replaces the style. Everything laid out so far is discarded.
    pub fn update_style(&mut self, style: Style) {
        debug!("diagram style changed, dropping {} cached views", self.rendered.len());
        self.style = style;
        self.exec = None;
        self.rendered.clear();
    }

    /// Renders `view`, starting at `start_time` for the execution and CPU views.
    pub fn render(&mut self, view: ViewId, start_time: u64) -> RenderResult {
        let key = match view {
            ViewId::Arch | ViewId::Legend => (view, 0),
            ViewId::Exec | ViewId::Cpu(_) => (view, start_time),
        };
        if let Some(result) = self.rendered.get(&key) {
            return result.clone();
        }

        let painter = Painter::new(&self.style, &*self.measure);
        let (scene, exceed_time) = match view {
            ViewId::Arch => (arch::render(&painter, &self.data), None),
            ViewId::Legend => (legend::render(&painter), None),
            ViewId::Exec => {
                let grid = self
                    .exec
                    .get_or_insert_with(|| {
                        exec::ExecGrid::new(&painter, &self.data, &self.conjectures)
                    });
                grid.render(&painter, start_time)
            }
            ViewId::Cpu(id) => match self.data.cpu(id) {
                Some(cpu) => cpu::render(
                    &painter,
                    &cpu.execution_events,
                    &self.data,
                    start_time,
                    self.screen,
                ),
                None => (painter.error_scene("No events found"), None),
            },
        };

        let result = RenderResult {
            view,
            scene,
            exceed_time,
        };
        self.rendered.insert(key, result.clone());
        result
    }
}

/// The axis events are drawn along.
#[derive(Clone, Copy, Debug)]
enum Frame {
    /// Events run left to right, as in the execution overview and the legend.
    Horizontal { origin: Point },
    /// Events run top to bottom, as in CPU views.
    Vertical { origin: Point },
}

impl Frame {
    fn point(self, along: f64, across: f64) -> Point {
        match self {
            Frame::Horizontal { origin } => Point::new(origin.x + along, origin.y + across),
            // A quarter turn clockwise.
            Frame::Vertical { origin } => Point::new(origin.x - across, origin.y + along),
        }
    }

    fn angle(self) -> f64 {
        match self {
            Frame::Horizontal { .. } => 0.0,
            Frame::Vertical { .. } => FRAC_PI_2,
        }
    }
}

/// How an event glyph is drawn.
struct Glyph<'a> {
    kind: EventKind,
    label: Option<SmolStr>,
    start: f64,
    end: f64,
    across: f64,
    line_color: &'a str,
    text_color: &'a str,
    start_line: bool,
    stop_line: bool,
}

/// Shared drawing helpers for every view.
pub(crate) struct Painter<'a> {
    style: &'a Style,
    measure: &'a dyn TextMeasure,
}

impl<'a> Painter<'a> {
    fn new(style: &'a Style, measure: &'a dyn TextMeasure) -> Self {
        Self { style, measure }
    }

    fn measure(&self, font: &Font, text: &str) -> TextMetrics {
        self.measure.measure(font, text)
    }

    /// The length of one event along the time axis. It fits a four digit thread id and every
    /// event abbreviation.
    fn event_length(&self) -> f64 {
        let font = &self.style.diagram_font;
        let text_width = EventKind::ALL
            .iter()
            .map(|kind| self.measure(font, kind.abbreviation()).width)
            .fold(self.measure(font, "9999").width, f64::max);
        (text_width + self.style.grid_line_width * 2.0).max(self.style.event_wrapper_height * 2.0)
    }

    fn line(&self, from: Point, to: Point, width: f64, dash: Vec<f64>, color: &str) -> DrawOp {
        DrawOp::Line {
            from,
            to,
            width,
            dash,
            color: color.into(),
        }
    }

    fn text(&self, text: impl Into<SmolStr>, at: Point, font: &Font, color: &str) -> DrawOp {
        DrawOp::Text {
            text: text.into(),
            at,
            font: font.clone(),
            color: color.into(),
            angle: 0.0,
        }
    }

    #[expect(clippy::too_many_arguments)]
    fn arrow(
        &self,
        from: Point,
        to: Point,
        head: (f64, f64),
        filled: bool,
        width: f64,
        dash: Vec<f64>,
        color: &str,
        head_at_start: bool,
    ) -> DrawOp {
        DrawOp::Arrow {
            from,
            to,
            head_width: head.0,
            head_length: head.1,
            filled,
            width,
            dash,
            color: color.into(),
            head_at_start,
        }
    }

    /// Draws an event: a colored bar with its label, a marker for thread events and optional
    /// start and stop lines.
    fn glyph(&self, ops: &mut Vec<DrawOp>, frame: Frame, glyph: Glyph<'_>) {
        let style = self.style;
        let font = &style.diagram_font;
        let event_color = style.event_color(glyph.kind);
        let wrapper = style.event_wrapper_height;

        ops.push(self.line(
            frame.point(glyph.start, glyph.across),
            frame.point(glyph.end, glyph.across),
            style.event_line_width,
            Vec::new(),
            &event_color,
        ));

        let label_metrics = glyph.label.as_ref().map(|label| self.measure(font, label));
        if let (Some(label), Some(metrics)) = (&glyph.label, label_metrics) {
            ops.push(DrawOp::Text {
                text: label.clone(),
                at: frame.point(
                    glyph.start + (glyph.end - glyph.start - metrics.width) / 2.0,
                    glyph.across - style.event_line_width,
                ),
                font: font.clone(),
                color: glyph.text_color.into(),
                angle: frame.angle(),
            });
        }

        if glyph.kind.is_thread() {
            let text_height =
                label_metrics.map_or(0.0, |m| m.height + style.grid_line_width * 2.0);
            self.thread_marker(ops, frame, &glyph, text_height, &event_color);
        }

        for (enabled, along) in [(glyph.stop_line, glyph.end), (glyph.start_line, glyph.start)] {
            if enabled {
                ops.push(self.line(
                    frame.point(along, glyph.across - wrapper / 2.0),
                    frame.point(along, glyph.across + wrapper / 2.0),
                    style.grid_line_width,
                    Vec::new(),
                    glyph.line_color,
                ));
            }
        }
    }

    // Swaps are arrows pointing into (swap in) or out of the bar. Creation and termination are
    // crosses.
    fn thread_marker(
        &self,
        ops: &mut Vec<DrawOp>,
        frame: Frame,
        glyph: &Glyph<'_>,
        text_height: f64,
        color: &str,
    ) {
        let style = self.style;
        let half_width = (style.event_line_width / 2.0).ceil();
        let marker_along = glyph.start + (glyph.end - glyph.start) / 2.0;
        let marker_start = glyph.across - style.event_line_width - text_height;
        let marker_end = marker_start - style.event_wrapper_height;
        let marker_width = style.event_line_width - 1.0;

        if glyph.kind.is_thread_swap() {
            if glyph.kind == EventKind::DelayedThreadSwapIn {
                let length = (marker_end - marker_start).abs() / 2.0 + half_width;
                ops.push(self.line(
                    frame.point(marker_along - length / 2.0, marker_end),
                    frame.point(marker_along + length / 2.0, marker_end),
                    half_width,
                    Vec::new(),
                    color,
                ));
            }
            let swap_in = glyph.kind != EventKind::ThreadSwapOut;
            ops.push(self.arrow(
                frame.point(marker_along, marker_start - if swap_in { marker_width } else { 0.0 }),
                frame.point(marker_along, marker_end + if swap_in { 0.0 } else { marker_width }),
                (half_width, half_width),
                true,
                marker_width,
                Vec::new(),
                color,
                swap_in,
            ));
        } else {
            let angle = if glyph.kind == EventKind::ThreadCreate {
                0.0
            } else {
                FRAC_PI_4
            };
            ops.push(DrawOp::Cross {
                center: frame.point(marker_along, marker_start - (marker_start - marker_end) / 2.0),
                length: (marker_end - marker_start + half_width).abs(),
                width: marker_width,
                color: color.into(),
                angle: angle + frame.angle(),
            });
        }
    }

    /// Draws a conjecture violation marker: a circle, a short tick below it and the names of the
    /// violated conjectures.
    fn conjecture_marker(
        &self,
        ops: &mut Vec<DrawOp>,
        center: Point,
        radius: f64,
        names: &[&str],
    ) {
        let style = self.style;
        let color = &style.conjecture_color;
        ops.push(DrawOp::Circle {
            center,
            radius,
            width: style.conjecture_marker_width,
            color: color.clone(),
        });
        let tick_start = center.y + radius;
        let tick_end = tick_start + style.event_line_width;
        ops.push(self.line(
            Point::new(center.x, tick_start),
            Point::new(center.x, tick_end),
            style.conjecture_marker_width,
            Vec::new(),
            color,
        ));

        let mut y = tick_end + style.grid_line_width * 2.0;
        for name in names {
            let metrics = self.measure(&style.conjecture_font, name);
            ops.push(self.text(
                *name,
                Point::new(center.x - metrics.width / 4.0, y + metrics.height),
                &style.conjecture_font,
                color,
            ));
            y += metrics.height + style.grid_line_width * 2.0;
        }
    }

    /// A scene that only shows a message.
    fn error_scene(&self, message: &str) -> Scene {
        let style = self.style;
        let metrics = self.measure(&style.decl_font, message);
        let at = Point::new(
            style.event_line_width,
            metrics.height + style.event_line_width * 2.0,
        );
        self.scene(
            metrics.width + style.event_line_width * 2.0,
            at.y + style.event_line_width * 2.0,
            vec![self.text(message, at, &style.decl_font, &style.font_color)],
        )
    }

    fn scene(&self, width: f64, height: f64, ops: Vec<DrawOp>) -> Scene {
        Scene {
            width,
            height,
            background: self.style.background_color.clone(),
            ops,
        }
    }
}
