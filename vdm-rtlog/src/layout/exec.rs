// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The execution overview: one row per CPU and bus, one column per event.

use super::{Frame, Glyph, Painter, exceeds_canvas_limits};
use crate::{
    draw::{DrawOp, Point, Scene},
    events::EventKind,
    model::{ConjectureViolation, ExecutionEvent, LogData},
};
use smol_str::{SmolStr, format_smolstr};
use std::f64::consts::FRAC_PI_2;
use tracing::debug;

/// The execution overview, laid out once and drawn from any start time.
#[derive(Debug)]
pub(super) struct ExecGrid {
    event_length: f64,
    grid_start_x: f64,
    decl_ops: Vec<DrawOp>,
    groups: Vec<TimeGroup>,
}

/// The columns of one timestamp. Columns are laid out at x = 0.
#[derive(Debug)]
struct TimeGroup {
    time: u64,
    end_y: f64,
    columns: Vec<Vec<DrawOp>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RowKind {
    Cpu,
    Bus,
}

#[derive(Debug)]
struct Row {
    id: u64,
    kind: RowKind,
    pos_y: f64,
    // None until the first thread event on the row.
    active_threads: Option<Vec<ActiveThread>>,
}

#[derive(Clone, Copy, Debug)]
struct ActiveThread {
    id: Option<u64>,
    // Waiting for the answer to a remote call.
    suspended: bool,
}

impl ExecGrid {
    pub(super) fn new(
        painter: &Painter<'_>,
        data: &LogData,
        conjectures: &[ConjectureViolation],
    ) -> Self {
        let style = painter.style;
        let event_length = painter.event_length();
        let padding_y = painter.measure(&style.decl_font, "Gg").font_height * 2.0;
        let padding_x = padding_y / 4.0;

        let mut widest = 0.0_f64;
        let mut next_y = padding_y;
        let mut rows = Vec::new();
        let mut decl_ops = Vec::new();
        let decls = data
            .cpu_decls
            .iter()
            .rev()
            .map(|cpu| (cpu.id, &cpu.name, RowKind::Cpu))
            .chain(
                data.bus_decls
                    .iter()
                    .map(|bus| (bus.id, &bus.name, RowKind::Bus)),
            );
        for (id, name, kind) in decls {
            let metrics = painter.measure(&style.decl_font, name);
            widest = widest.max(metrics.width);
            rows.push(Row {
                id,
                kind,
                pos_y: next_y - metrics.font_height / 2.0 + style.event_line_width,
                active_threads: None,
            });
            decl_ops.push(painter.text(
                name.clone(),
                Point::new(padding_x, next_y),
                &style.decl_font,
                &style.font_color,
            ));
            next_y += padding_y;
        }

        let builder = GridBuilder {
            painter,
            conjectures,
            event_length,
            grid_start_y: padding_y / 2.0,
            grid_height: next_y - padding_y / 2.0,
        };
        Self {
            event_length,
            grid_start_x: widest + padding_x * 2.0,
            decl_ops,
            groups: builder.build(&mut rows, &data.execution_events),
        }
    }

    /// Draws the columns from the first timestamp at or after `start_time`, until the canvas is
    /// full.
    pub(super) fn render(&self, painter: &Painter<'_>, start_time: u64) -> (Scene, Option<u64>) {
        let first = self
            .groups
            .iter()
            .position(|group| group.time >= start_time)
            .unwrap_or(self.groups.len());
        let groups = &self.groups[first..];

        let mut ops = self.decl_ops.clone();
        let mut x = self.grid_start_x;
        let mut end_y = 0.0_f64;
        let mut exceed_time = None;
        for (index, group) in groups.iter().enumerate() {
            let new_end_y = end_y.max(group.end_y);
            let width = group.columns.len() as f64 * self.event_length + x + self.event_length;
            if exceeds_canvas_limits(width, new_end_y) {
                let Some(previous) = index.checked_sub(1).map(|prev| &groups[prev]) else {
                    let message = format!(
                        "Events for time {} cannot fit onto the diagram! Try lowering the font size.",
                        group.time
                    );
                    return (painter.error_scene(&message), None);
                };
                debug!(
                    "execution overview for start time {start_time} is cut after time {}",
                    previous.time
                );
                exceed_time = Some(previous.time);
                break;
            }

            end_y = new_end_y;
            for column in &group.columns {
                ops.extend(column.iter().cloned().map(|mut op| {
                    op.translate(x, 0.0);
                    op
                }));
                x += self.event_length;
            }
        }

        (painter.scene(x + self.event_length, end_y, ops), exceed_time)
    }
}

struct GridBuilder<'a, 'p> {
    painter: &'a Painter<'p>,
    conjectures: &'a [ConjectureViolation],
    event_length: f64,
    grid_start_y: f64,
    grid_height: f64,
}

impl GridBuilder<'_, '_> {
    fn build(&self, rows: &mut [Row], events: &[ExecutionEvent]) -> Vec<TimeGroup> {
        let style = self.painter.style;
        let font_color = style.font_color.as_str();
        let mut groups: Vec<TimeGroup> = Vec::new();
        let mut current_bus: Option<usize> = None;
        let mut previous_row: Option<usize> = None;
        let mut current_time = None;

        for (index, event) in events.iter().enumerate() {
            let kind = event.kind;
            let row = if kind.is_bus() {
                let row = match kind {
                    EventKind::MessageRequest | EventKind::ReplyRequest => None,
                    _ => current_bus,
                }
                .or_else(|| find_row(rows, RowKind::Bus, event.busid));
                current_bus = row;
                row
            } else {
                find_row(rows, RowKind::Cpu, event.cpunm)
            };
            let Some(row) = row else {
                debug!("no row for {} at time {}, skipping it", kind, event.time);
                continue;
            };

            if index >= 1 && events[index - 1].kind == EventKind::MessageCompleted {
                self.resume_caller(rows, &events[..index - 1], current_bus);
            }
            update_active_threads(&mut rows[row], event, events.get(index + 1));

            let mut ops = Vec::new();
            let mut end_y = self.grid_height;
            if current_time.is_none_or(|time| time < event.time) {
                end_y = self.time_tick(&mut ops, event.time);
                current_time = Some(event.time);
            }

            for (other_index, other) in rows.iter().enumerate() {
                if other_index != row {
                    ops.push(self.row_line(other, index % 2 == 1));
                }
            }

            let previous_kind = index.checked_sub(1).map(|prev| events[prev].kind);
            let stop_line = !kind.is_operation();
            let start_line = stop_line
                && (previous_row.is_none_or(|prev| rows[prev].pos_y != rows[row].pos_y)
                    || previous_kind.is_some_and(EventKind::is_operation));
            let label = if kind.is_thread() {
                event.id.map(|id| format_smolstr!("{id}"))
            } else {
                Some(SmolStr::new_static(kind.abbreviation()))
            };
            self.painter.glyph(
                &mut ops,
                Frame::Horizontal {
                    origin: Point::new(0.0, 0.0),
                },
                Glyph {
                    kind,
                    label,
                    start: 0.0,
                    end: self.event_length,
                    across: rows[row].pos_y,
                    line_color: font_color,
                    text_color: font_color,
                    start_line,
                    stop_line,
                },
            );

            if let Some(previous_row) = previous_row
                && kind.is_bus()
                && kind != EventKind::MessageActivate
            {
                self.bus_arrow(&mut ops, rows, row, previous_row, event, events.get(index + 1));
            }

            let violations: Vec<&str> = self
                .conjectures
                .iter()
                .filter(|violation| violation.concerns(event))
                .map(|violation| violation.name.as_str())
                .collect();
            if !violations.is_empty() {
                self.painter.conjecture_marker(
                    &mut ops,
                    Point::new(
                        self.event_length / 2.0,
                        rows[row].pos_y - style.event_line_width,
                    ),
                    self.event_length / 2.3,
                    &violations,
                );
            }

            previous_row = Some(row);

            let time = event.time;
            // Events arrive in time order, so only the newest group can share the time.
            match groups.last_mut().filter(|group| group.time == time) {
                Some(group) => group.columns.push(ops),
                None => groups.push(TimeGroup {
                    time,
                    end_y,
                    columns: vec![ops],
                }),
            }
        }

        groups
    }

    // Once a reply has arrived the calling thread is no longer suspended.
    fn resume_caller(
        &self,
        rows: &mut [Row],
        earlier: &[ExecutionEvent],
        current_bus: Option<usize>,
    ) {
        let Some(request) = earlier.iter().rev().find(|event| {
            matches!(
                event.kind,
                EventKind::MessageRequest | EventKind::ReplyRequest
            )
        }) else {
            return;
        };
        let bus_id = current_bus.map(|bus| rows[bus].id);
        if request.kind != EventKind::ReplyRequest || request.busid != bus_id {
            return;
        }
        if let Some(cpu) = find_row(rows, RowKind::Cpu, request.tocpu)
            && let Some(threads) = &mut rows[cpu].active_threads
            && let Some(thread) = threads.iter_mut().find(|t| t.id == request.callthr)
        {
            thread.suspended = false;
        }
    }

    // A dotted vertical line with the time written below the grid. Returns the height the
    // column needs.
    fn time_tick(&self, ops: &mut Vec<DrawOp>, time: u64) -> f64 {
        let style = self.painter.style;
        let label = format_smolstr!("{time}");
        let width = self.painter.measure(&style.diagram_font, &label).width;
        ops.push(self.painter.line(
            Point::new(0.0, self.grid_start_y),
            Point::new(0.0, self.grid_height),
            style.grid_line_width,
            style.grid_dash(),
            &style.font_color,
        ));
        ops.push(DrawOp::Text {
            text: label,
            at: Point::new(0.0, self.grid_height + style.event_line_width),
            font: style.diagram_font.clone(),
            color: style.font_color.clone(),
            angle: FRAC_PI_2,
        });
        self.grid_height + width + style.event_line_width * 2.0
    }

    // The line through a row that has no event in this column. CPUs running a thread get a solid
    // line, dashed while a thread waits for a remote call.
    fn row_line(&self, row: &Row, odd: bool) -> DrawOp {
        let style = self.painter.style;
        let active = row
            .active_threads
            .as_ref()
            .filter(|threads| row.kind == RowKind::Cpu && !threads.is_empty());
        let (width, dash, color) = match active {
            Some(threads) => (
                style.event_line_width,
                if threads.iter().any(|thread| thread.suspended) {
                    vec![style.event_line_width * 1.1, style.event_line_width]
                } else {
                    Vec::new()
                },
                style.event_color(EventKind::OpActivate),
            ),
            None => (
                style.grid_line_width,
                style.grid_dash(),
                style.font_color.clone(),
            ),
        };
        let start_x = if odd { style.grid_line_width / 2.0 } else { 0.0 };
        self.painter.line(
            Point::new(start_x, row.pos_y),
            Point::new(self.event_length + style.grid_line_width, row.pos_y),
            width,
            dash,
            &color,
        )
    }

    fn bus_arrow(
        &self,
        ops: &mut Vec<DrawOp>,
        rows: &[Row],
        row: usize,
        previous_row: usize,
        event: &ExecutionEvent,
        next: Option<&ExecutionEvent>,
    ) {
        let style = self.painter.style;
        let completed = event.kind == EventKind::MessageCompleted;
        let target_y = if completed {
            match find_row(rows, RowKind::Cpu, event.tocpu) {
                Some(cpu) => rows[cpu].pos_y,
                None => return,
            }
        } else {
            rows[previous_row].pos_y
        };
        let next_has_start_line = completed && next.is_some_and(|next| next.kind.is_thread());
        let wrapper = style.event_wrapper_height;
        let start_y = target_y
            + if next_has_start_line {
                wrapper
            } else {
                wrapper / 2.0
            };
        let x = if completed { self.event_length } else { 0.0 };
        ops.push(self.painter.arrow(
            Point::new(x, start_y),
            Point::new(x, rows[row].pos_y - wrapper),
            (3.0, 5.0),
            false,
            style.grid_line_width,
            Vec::new(),
            &style.font_color,
            completed,
        ));
    }
}

fn find_row(rows: &[Row], kind: RowKind, id: Option<u64>) -> Option<usize> {
    let id = id?;
    rows.iter().position(|row| row.kind == kind && row.id == id)
}

fn update_active_threads(row: &mut Row, event: &ExecutionEvent, next: Option<&ExecutionEvent>) {
    match event.kind {
        EventKind::OpRequest if event.is_async == Some(false) => {
            // A synchronous call followed by a message request waits for the answer.
            let Some(next) = next else {
                return;
            };
            let suspended = next.kind == EventKind::MessageRequest;
            let threads = row.active_threads.get_or_insert_with(Vec::new);
            match threads.iter_mut().find(|thread| thread.id == event.id) {
                Some(thread) => thread.suspended = suspended,
                None => threads.push(ActiveThread {
                    id: event.id,
                    suspended,
                }),
            }
        }
        kind if kind.is_thread_swap() => {
            let threads = row.active_threads.get_or_insert_with(Vec::new);
            if kind == EventKind::ThreadSwapOut {
                threads.retain(|thread| thread.id != event.id);
            } else {
                threads.push(ActiveThread {
                    id: event.id,
                    suspended: false,
                });
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::ConjectureEndpoint,
        parser::parse_log,
        style::{MonospaceMeasure, Style},
        test_helpers::TWO_CPUS,
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn grid(style: &Style, conjectures: &[ConjectureViolation]) -> (LogData, ExecGrid) {
        let data = parse_log(TWO_CPUS).unwrap();
        let painter = Painter::new(style, &MonospaceMeasure);
        let grid = ExecGrid::new(&painter, &data, conjectures);
        (data, grid)
    }

    #[test]
    fn rows_and_columns() {
        let style = Style::default();
        let (data, grid) = grid(&style, &[]);
        assert_eq!(
            grid.groups.iter().map(|g| g.time).collect::<Vec<_>>(),
            data.timestamps
        );
        let columns: usize = grid.groups.iter().map(|g| g.columns.len()).sum();
        assert_eq!(columns, data.execution_events.len());

        let painter = Painter::new(&style, &MonospaceMeasure);
        let (scene, exceed_time) = grid.render(&painter, 0);
        assert_eq!(exceed_time, None);
        let texts: Vec<_> = scene.texts().collect();
        // CPUs are listed bottom up, buses below them.
        assert_eq!(&texts[..3], ["CPU 2", "Controller", "net"]);
        assert!(texts.contains(&"mr") && texts.contains(&"14"), "{texts:?}");
    }

    #[test]
    fn start_time_drops_earlier_columns() {
        let style = Style::default();
        let (_, grid) = grid(&style, &[]);
        let painter = Painter::new(&style, &MonospaceMeasure);
        let (full, _) = grid.render(&painter, 0);
        let (late, _) = grid.render(&painter, 11);
        // One event at 12 and one at 14 remain.
        assert!((late.width - (grid.grid_start_x + 3.0 * grid.event_length)).abs() < 1e-9);
        assert!(late.width < full.width);
    }

    #[test]
    fn conjecture_markers() {
        let endpoint = |time, kind: &str, opname: &str| ConjectureEndpoint {
            time,
            thid: 7,
            kind: kind.into(),
            opname: opname.into(),
        };
        let violation = ConjectureViolation {
            status: false,
            name: "deadline".into(),
            expression: "deadlineMet(#req(Sensor`read), #fin(Actuator`set), 2)".to_owned(),
            source: endpoint(2, "OpRequest", "read"),
            destination: endpoint(4, "MessageRequest", "set"),
        };
        let style = Style::default();
        let (_, grid) = grid(&style, &[violation]);
        let painter = Painter::new(&style, &MonospaceMeasure);
        let (scene, _) = grid.render(&painter, 0);
        let circles = scene
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Circle { .. }))
            .count();
        assert_eq!(circles, 2);
        assert_eq!(scene.texts().filter(|t| *t == "deadline").count(), 2);
    }

    #[test]
    fn suspended_threads() {
        let mut row = Row {
            id: 1,
            kind: RowKind::Cpu,
            pos_y: 0.0,
            active_threads: None,
        };
        let mut request = ExecutionEvent::new(EventKind::OpRequest, 2);
        request.id = Some(7);
        request.is_async = Some(false);
        let message = ExecutionEvent::new(EventKind::MessageRequest, 2);
        update_active_threads(&mut row, &request, Some(&message));
        let threads = row.active_threads.as_ref().unwrap();
        assert!(threads[0].suspended);

        let mut swap_out = ExecutionEvent::new(EventKind::ThreadSwapOut, 3);
        swap_out.id = Some(7);
        update_active_threads(&mut row, &swap_out, None);
        assert!(row.active_threads.unwrap().is_empty());
    }

    // One thread on one CPU, swapped in and out once per time unit.
    fn long_log(times: u64) -> String {
        use std::fmt::Write;

        let mut log = String::from(indoc! {r#"
            CPUdecl -> id: 1 expl: true sys: "Sys" name: "Controller" time: 0
            ThreadCreate -> id: 1 period: false objref: 2 clnm: "A" cpunm: 1 time: 0
        "#});
        for time in 1..=times {
            let kind = if time % 2 == 1 {
                "ThreadSwapIn"
            } else {
                "ThreadSwapOut"
            };
            writeln!(
                log,
                r#"{kind} -> id: 1 objref: 2 clnm: "A" cpunm: 1 overhead: 0 time: {time}"#
            )
            .unwrap();
        }
        log
    }

    #[test]
    fn long_log_is_cut_between_groups() {
        let data = parse_log(&long_log(1000)).unwrap();
        let style = Style::default();
        let painter = Painter::new(&style, &MonospaceMeasure);
        let grid = ExecGrid::new(&painter, &data, &[]);
        assert!(grid.groups.iter().all(|group| group.columns.len() == 1));

        let (scene, exceed_time) = grid.render(&painter, 0);
        let cut = exceed_time.expect("a thousand columns do not fit on one canvas");
        assert!(cut > 0 && cut < 1000, "cut at {cut}");
        assert!(!exceeds_canvas_limits(scene.width, scene.height));
        // The group after the cut would not have fit.
        let next = &grid.groups[cut as usize + 1];
        assert_eq!(next.time, cut + 1);
        assert!(exceeds_canvas_limits(
            scene.width + grid.event_length,
            scene.height.max(next.end_y)
        ));
        let texts: Vec<_> = scene.texts().collect();
        assert!(texts.contains(&cut.to_string().as_str()), "{texts:?}");
        assert!(!texts.contains(&next.time.to_string().as_str()));

        // The next page starts right after the cut.
        let (resumed, resumed_exceed_time) = grid.render(&painter, cut + 1);
        let texts: Vec<_> = resumed.texts().collect();
        assert!(texts.contains(&next.time.to_string().as_str()));
        assert!(!texts.contains(&cut.to_string().as_str()));
        assert!(resumed_exceed_time.is_none_or(|time| time > cut));
    }

    #[test]
    fn oversized_first_column() {
        let style = Style::new(3000.0, "monospace");
        let (_, grid) = grid(&style, &[]);
        let painter = Painter::new(&style, &MonospaceMeasure);
        let (scene, exceed_time) = grid.render(&painter, 0);
        assert_eq!(exceed_time, None);
        assert_eq!(
            scene.texts().collect::<Vec<_>>(),
            ["Events for time 0 cannot fit onto the diagram! Try lowering the font size."]
        );
    }
}
