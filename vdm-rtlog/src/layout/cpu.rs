// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-CPU view.
//!
//! Every object and bus the CPU's events touch gets a lane. Time runs downwards, one event per
//! row. Events are scanned once from the beginning of the log so that thread and object
//! bookkeeping is right, but only events at or after the start time are drawn.

use super::{Frame, Glyph, Painter, ScreenSize, exceeds_canvas_limits};
use crate::{
    draw::{DrawOp, Point, Scene},
    events::EventKind,
    model::{ExecutionEvent, LogData},
};
use smol_str::{SmolStr, format_smolstr};
use tracing::debug;

pub(super) fn render(
    painter: &Painter<'_>,
    events: &[ExecutionEvent],
    data: &LogData,
    start_time: u64,
    screen: ScreenSize,
) -> (Scene, Option<u64>) {
    if events.is_empty() {
        return (painter.error_scene("No events found"), None);
    }

    let layout = match lay_out(painter, events, data, start_time, screen, true) {
        Ok(layout) => layout,
        Err(_) => {
            // Operation names are allowed to overlap neighbouring lanes if that makes the first
            // timestamp fit.
            debug!("events at the start time do not fit, retrying without margins");
            match lay_out(painter, events, data, start_time, screen, false) {
                Ok(layout) => layout,
                Err(overflow) => {
                    let message = format!(
                        "Events for time {} cannot fit onto the diagram! Try lowering the font size.",
                        overflow.time
                    );
                    return (painter.error_scene(&message), None);
                }
            }
        }
    };
    (layout.scene, layout.exceed_time)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LaneKey {
    Bus(u64),
    Object(Option<u64>),
}

impl LaneKey {
    // Bus lanes come first by ascending id, then object lanes by descending id. Events without
    // an object go to the front of the object lanes.
    fn goes_before(self, existing: LaneKey) -> bool {
        match (self, existing) {
            (LaneKey::Bus(_), LaneKey::Object(_)) => true,
            (LaneKey::Bus(new), LaneKey::Bus(old)) => new < old,
            (LaneKey::Object(_), LaneKey::Bus(_)) => false,
            (LaneKey::Object(None), LaneKey::Object(_)) => true,
            (LaneKey::Object(Some(new)), LaneKey::Object(old)) => old.is_some_and(|old| new > old),
        }
    }
}

#[derive(Clone, Debug)]
struct Lane {
    key: LaneKey,
    name: SmolStr,
    margin_left: f64,
    margin_right: f64,
    width: f64,
    height: f64,
    start_x: f64,
    pos_x: f64,
}

#[derive(Clone, Debug)]
struct PlacedEvent {
    event: ExecutionEvent,
    lane: LaneKey,
    // Operation completions inferred from message completions are not in the log.
    synthesized: bool,
}

struct Thread {
    id: Option<u64>,
    lane: LaneKey,
    callers: Vec<LaneKey>,
}

/// The state at the end of the last complete timestamp group.
struct Rollback {
    drawn_len: usize,
    lanes: Vec<Lane>,
    width: f64,
    height: f64,
    time: u64,
}

/// Events at the start time do not fit on a canvas.
#[derive(Debug)]
struct Overflow {
    time: u64,
}

#[derive(Debug)]
struct CpuLayout {
    scene: Scene,
    drawn: Vec<PlacedEvent>,
    exceed_time: Option<u64>,
}

struct Measurements {
    text_height: f64,
    margin: f64,
    padding: f64,
    event_length: f64,
    axis_start_x: f64,
    lanes_end_y: f64,
}

fn lay_out(
    painter: &Painter<'_>,
    events: &[ExecutionEvent],
    data: &LogData,
    start_time: u64,
    screen: ScreenSize,
    margins: bool,
) -> Result<CpuLayout, Overflow> {
    let style = painter.style;
    let decl_metrics = painter.measure(&style.decl_font, "Gg");
    let margin = decl_metrics.width;
    let padding = margin / 2.0;
    let last_time = events.last().map_or(0, |event| event.time);
    let m = Measurements {
        text_height: decl_metrics.font_height,
        margin,
        padding,
        event_length: painter.event_length(),
        axis_start_x: painter
            .measure(&style.diagram_font, &last_time.to_string())
            .width
            + padding,
        lanes_end_y: decl_metrics.font_height + padding + margin,
    };

    let mut lanes: Vec<Lane> = Vec::new();
    let mut names: Vec<(LaneKey, SmolStr)> = Vec::new();
    let mut threads: Vec<Thread> = Vec::new();
    let mut traversed: Vec<PlacedEvent> = Vec::with_capacity(events.len());
    let mut activations: Vec<(Option<SmolStr>, LaneKey)> = Vec::new();
    let mut drawn: Vec<PlacedEvent> = Vec::new();
    let mut object_lane = LaneKey::Object(None);
    let mut width = m.axis_start_x;
    let mut height = m.lanes_end_y + m.margin + m.event_length;
    let mut rollback: Option<Rollback> = None;
    let mut exceed_time = None;

    for (index, original) in events.iter().enumerate() {
        let mut event = original.clone();
        let mut op_completed = None;

        if !event.kind.is_bus() {
            object_lane = thread_lane(&mut threads, &event, traversed.last());
        } else if event.kind == EventKind::MessageCompleted {
            if event.opname.is_none() {
                op_completed = synthesize_op_completed(&mut event, &traversed, &events[index..]);
                if let Some(op) = &op_completed {
                    register_name(&mut names, op.lane, op.event.clnm.as_deref());
                }
            }
            if let Some(objref) = event.objref {
                object_lane = LaneKey::Object(Some(objref));
            }
        }

        let bus = event
            .busid
            .filter(|_| event.kind.is_bus())
            .and_then(|id| data.bus_decl(id));
        let lane = match bus {
            Some(bus) => {
                if !names.iter().any(|(key, _)| *key == LaneKey::Bus(bus.id)) {
                    names.push((LaneKey::Bus(bus.id), bus.name.clone()));
                }
                LaneKey::Bus(bus.id)
            }
            None => {
                register_name(&mut names, object_lane, event.clnm.as_deref());
                object_lane
            }
        };

        let placed = PlacedEvent {
            event,
            lane,
            synthesized: false,
        };
        if placed.event.kind == EventKind::OpActivate {
            activations.push((placed.event.opname.clone(), lane));
        }
        traversed.push(placed.clone());

        if placed.event.time < start_time {
            continue;
        }

        if index > 0 && events[index - 1].time < placed.event.time && !drawn.is_empty() {
            rollback = Some(Rollback {
                drawn_len: drawn.len(),
                lanes: lanes.clone(),
                width,
                height,
                time: events[index - 1].time,
            });
        }

        let time = placed.event.time;
        let synthesized = op_completed.is_some();
        let mut added_lanes = false;
        for key in [Some(lane), op_completed.as_ref().map(|op| op.lane)]
            .into_iter()
            .flatten()
        {
            if lanes.iter().all(|existing| existing.key != key) {
                insert_lane(&mut lanes, painter, &m, key, &names);
                added_lanes = true;
            }
        }
        drawn.push(placed);
        drawn.extend(op_completed);

        let grew = margins
            && drawn.len() > 1
            && grow_margins(&mut lanes, painter, &m, &drawn[drawn.len() - 2], lane);
        if added_lanes || grew {
            width = position_lanes(&mut lanes, &m);
        }

        // The first timestamp group is kept even if it is wider than the screen.
        let exceeds_screen =
            rollback.is_some() && (width > screen.width || height > screen.height);
        if exceeds_canvas_limits(width, height) || exceeds_screen {
            let Some(rb) = rollback.take() else {
                return Err(Overflow { time });
            };
            debug!(
                "diagram for start time {start_time} is cut after time {}",
                rb.time
            );
            drawn.truncate(rb.drawn_len);
            lanes = rb.lanes;
            width = rb.width;
            height = rb.height;
            exceed_time = Some(rb.time);
            break;
        }

        height += m.event_length * if synthesized { 2.0 } else { 1.0 };
    }

    let scene = draw(painter, &m, &lanes, &drawn, &activations, width, height);
    Ok(CpuLayout {
        scene,
        drawn,
        exceed_time,
    })
}

// Resolves the object lane of a non-bus event by following its thread through operation calls.
fn thread_lane(
    threads: &mut Vec<Thread>,
    event: &ExecutionEvent,
    previous: Option<&PlacedEvent>,
) -> LaneKey {
    let index = if event.kind == EventKind::ThreadCreate {
        None
    } else {
        threads.iter().position(|thread| thread.id == event.id)
    };

    match index {
        Some(index) => {
            let thread = &mut threads[index];
            match event.kind {
                EventKind::OpActivate => {
                    thread.callers.push(thread.lane);
                    thread.lane = LaneKey::Object(event.objref);
                }
                EventKind::OpCompleted => {
                    if let Some(lane) = thread.callers.pop() {
                        thread.lane = lane;
                    }
                }
                _ => {}
            }
            let lane = thread.lane;
            if event.kind == EventKind::ThreadKill {
                threads.remove(index);
            }
            lane
        }
        None => {
            let lane = if event.kind == EventKind::ThreadKill {
                previous.map_or(LaneKey::Object(None), |previous| previous.lane)
            } else {
                LaneKey::Object(event.objref)
            };
            threads.push(Thread {
                id: event.id,
                lane,
                callers: Vec::new(),
            });
            lane
        }
    }
}

// A message completion that answers a reply also completes the operation that sent the request.
fn synthesize_op_completed(
    event: &mut ExecutionEvent,
    traversed: &[PlacedEvent],
    remaining: &[ExecutionEvent],
) -> Option<PlacedEvent> {
    let request = (2..traversed.len()).rev().find(|&index| {
        let candidate = &traversed[index].event;
        candidate.kind == EventKind::MessageRequest && candidate.callthr == event.callthr
    });
    if let Some(index) = request {
        let caller = &traversed[index - 1];
        let object = &traversed[index - 2].event;
        let mut op = ExecutionEvent::new(EventKind::OpCompleted, event.time);
        op.id = caller.event.id;
        op.opname = caller.event.opname.clone();
        op.objref = object.objref;
        op.clnm = object.clnm.clone();
        op.cpunm = object.cpunm;
        op.is_async = object.is_async;
        if let LaneKey::Object(objref) = caller.lane {
            event.objref = objref;
        }
        return Some(PlacedEvent {
            event: op,
            lane: caller.lane,
            synthesized: true,
        });
    }

    // The request was logged before the log starts. Place the completion where the calling
    // thread shows up next.
    let target = remaining.iter().find(|next| {
        matches!(
            next.kind,
            EventKind::ThreadSwapIn
                | EventKind::ThreadCreate
                | EventKind::OpActivate
                | EventKind::OpCompleted
        ) && next.id.is_some()
            && next.id == event.callthr
    })?;
    event.objref = target.objref;
    let mut op = ExecutionEvent::new(EventKind::OpCompleted, event.time);
    op.id = event.callthr;
    op.opname = Some(SmolStr::default());
    op.objref = target.objref;
    op.clnm = target.clnm.clone();
    op.cpunm = target.cpunm;
    Some(PlacedEvent {
        event: op,
        lane: LaneKey::Object(target.objref),
        synthesized: true,
    })
}

fn register_name(names: &mut Vec<(LaneKey, SmolStr)>, key: LaneKey, clnm: Option<&str>) {
    if names.iter().any(|(existing, _)| *existing == key) {
        return;
    }
    let name = match key {
        LaneKey::Object(Some(objref)) => format_smolstr!("{}({objref})", clnm.unwrap_or_default()),
        LaneKey::Object(None) => format_smolstr!("{}(nil)", clnm.unwrap_or_default()),
        LaneKey::Bus(id) => format_smolstr!("BUS {id}"),
    };
    names.push((key, name));
}

fn insert_lane(
    lanes: &mut Vec<Lane>,
    painter: &Painter<'_>,
    m: &Measurements,
    key: LaneKey,
    names: &[(LaneKey, SmolStr)],
) {
    let name = names
        .iter()
        .find(|(existing, _)| *existing == key)
        .map(|(_, name)| name.clone())
        .unwrap_or_default();
    let lane = Lane {
        key,
        margin_left: m.margin,
        margin_right: m.margin,
        width: painter.measure(&painter.style.decl_font, &name).width + m.padding * 2.0,
        height: m.text_height + m.padding,
        start_x: 0.0,
        pos_x: 0.0,
        name,
    };
    let index = lanes
        .iter()
        .position(|existing| key.goes_before(existing.key))
        .unwrap_or(lanes.len());
    lanes.insert(index, lane);
}

// Widens the margin beside the lane of `previous` so that its operation name does not run into
// the next lane. Margins only ever grow.
fn grow_margins(
    lanes: &mut [Lane],
    painter: &Painter<'_>,
    m: &Measurements,
    previous: &PlacedEvent,
    current: LaneKey,
) -> bool {
    let event = &previous.event;
    let completes_call = event.kind == EventKind::MessageCompleted && event.opname.is_some();
    if !(event.kind.is_operation() || completes_call || event.kind == EventKind::MessageRequest) {
        return false;
    }

    let target = if completes_call {
        LaneKey::Object(event.objref)
    } else if event.kind == EventKind::OpRequest {
        current
    } else {
        previous.lane
    };
    let Some(target_index) = lanes.iter().position(|lane| lane.key == target) else {
        return false;
    };
    let Some(index) = lanes.iter().position(|lane| lane.key == previous.lane) else {
        return false;
    };

    let opname_width = painter
        .measure(&painter.style.diagram_font, event.short_opname())
        .width;
    let lane = &mut lanes[index];
    let new_margin = opname_width - lane.width / 2.0 + m.margin * 2.0;
    if (target_index == index || index + 1 == target_index) && new_margin > lane.margin_right {
        lane.margin_right = new_margin;
        true
    } else if index.checked_sub(1) == Some(target_index) && new_margin > lane.margin_left {
        lane.margin_left = new_margin;
        true
    } else {
        false
    }
}

/// Lays lanes out left to right and returns the resulting diagram width.
///
/// A lane may overlap the right margin of its predecessor by up to half its own width.
fn position_lanes(lanes: &mut [Lane], m: &Measurements) -> f64 {
    let mut width = m.axis_start_x;
    for index in 0..lanes.len() {
        let offset = match index.checked_sub(1).map(|prev| lanes[prev].margin_right) {
            None => m.margin,
            Some(prev_right) if prev_right < lanes[index].margin_left => {
                lanes[index].margin_left - prev_right
            }
            Some(prev_right) => -(prev_right - m.margin).min(lanes[index].width / 2.0),
        };
        let lane = &mut lanes[index];
        lane.start_x = width + offset;
        lane.pos_x = lane.start_x + lane.width / 2.0;
        width = lane.start_x + lane.width + lane.margin_right;
    }
    width
}

fn draw(
    painter: &Painter<'_>,
    m: &Measurements,
    lanes: &[Lane],
    drawn: &[PlacedEvent],
    activations: &[(Option<SmolStr>, LaneKey)],
    width: f64,
    height: f64,
) -> Scene {
    let style = painter.style;
    let font_color = style.font_color.as_str();
    let mut ops = Vec::new();

    for lane in lanes {
        ops.push(DrawOp::StrokeRect {
            origin: Point::new(lane.start_x, m.margin),
            width: lane.width,
            height: lane.height,
            line_width: style.grid_line_width,
            dash: if lane.key == LaneKey::Bus(0) {
                vec![2.0, 2.0]
            } else {
                Vec::new()
            },
            color: style.font_color.clone(),
        });
        ops.push(painter.text(
            lane.name.clone(),
            Point::new(
                lane.start_x + m.padding,
                m.lanes_end_y - (lane.height - m.text_height),
            ),
            &style.decl_font,
            font_color,
        ));
    }

    let events_start_y = m.lanes_end_y + m.margin;
    let axis_end_y = drawn.len() as f64 * m.event_length + events_start_y;
    for lane in lanes {
        ops.push(painter.line(
            Point::new(lane.pos_x, events_start_y),
            Point::new(lane.pos_x, axis_end_y),
            style.grid_line_width,
            style.grid_dash(),
            font_color,
        ));
    }

    let label_height = painter.measure(&style.diagram_font, "Gg").height;
    let mut current_time = None;
    let mut y = events_start_y;
    for (index, placed) in drawn.iter().enumerate() {
        let event = &placed.event;
        let end_y = y + m.event_length;
        let Some(lane) = lanes.iter().find(|lane| lane.key == placed.lane) else {
            y = end_y;
            continue;
        };

        if current_time != Some(event.time) {
            let label = event.time.to_string();
            let metrics = painter.measure(&style.diagram_font, &label);
            ops.push(painter.line(
                Point::new(m.axis_start_x, y),
                Point::new(width + m.margin, y),
                style.grid_line_width,
                vec![1.0, 4.0],
                font_color,
            ));
            ops.push(painter.text(
                label,
                Point::new(
                    m.axis_start_x - metrics.width - style.event_line_width,
                    y + metrics.height / 2.0,
                ),
                &style.diagram_font,
                font_color,
            ));
            current_time = Some(event.time);
        }

        let label = if event.kind.is_thread() {
            event.id.map(|id| format_smolstr!("{id}"))
        } else {
            Some(SmolStr::new_static(event.kind.abbreviation()))
        };
        painter.glyph(
            &mut ops,
            Frame::Vertical {
                origin: Point::new(lane.pos_x, y),
            },
            Glyph {
                kind: event.kind,
                label,
                start: 0.0,
                end: m.event_length,
                across: 0.0,
                line_color: font_color,
                text_color: font_color,
                start_line: false,
                stop_line: false,
            },
        );

        let arrow_has_text = drawn.get(index + 1).is_some_and(|next| {
            event_arrow(painter, &mut ops, lanes, activations, drawn, index, next, lane, end_y)
        });

        let is_operation = event.kind.is_operation();
        let needs_opname = match index.checked_sub(1).map(|prev| &drawn[prev].event) {
            Some(prev) => {
                (event.kind == EventKind::OpCompleted && prev.opname != event.opname)
                    || (is_operation
                        && !(prev.kind.is_operation() && prev.opname == event.opname))
            }
            None => is_operation,
        };
        if !arrow_has_text && needs_opname {
            ops.push(painter.text(
                event.short_opname(),
                Point::new(
                    lane.pos_x + style.event_wrapper_height + label_height,
                    end_y - (m.event_length - label_height) / 2.0,
                ),
                &style.diagram_font,
                font_color,
            ));
        }

        y = end_y;
    }

    for lane in lanes {
        ops.push(painter.line(
            Point::new(lane.pos_x, m.lanes_end_y),
            Point::new(lane.pos_x, events_start_y),
            style.grid_line_width,
            style.grid_dash(),
            font_color,
        ));
    }

    painter.scene(width, height, ops)
}

// Draws the arrow from an event to the lane its call or reply goes to. Returns true if the arrow
// is labelled with the operation name.
#[expect(clippy::too_many_arguments)]
fn event_arrow(
    painter: &Painter<'_>,
    ops: &mut Vec<DrawOp>,
    lanes: &[Lane],
    activations: &[(Option<SmolStr>, LaneKey)],
    drawn: &[PlacedEvent],
    index: usize,
    next: &PlacedEvent,
    lane: &Lane,
    end_y: f64,
) -> bool {
    let placed = &drawn[index];
    let event = &placed.event;
    let later = &drawn[index + 1..];

    let mut target = (next.event.kind == EventKind::ReplyRequest).then_some(next.lane);
    if target.is_none() && !(placed.lane == next.lane && next.event.kind.is_operation()) {
        target = match event.kind {
            EventKind::OpRequest => later
                .iter()
                .find(|e| {
                    matches!(
                        e.event.kind,
                        EventKind::OpActivate | EventKind::MessageRequest
                    ) && e.event.objref == event.objref
                })
                .map(|e| e.lane),
            EventKind::OpActivate if next.event.kind.is_operation() => later
                .iter()
                .find(|e| e.event.kind == EventKind::OpCompleted && e.event.opname == event.opname)
                .map(|e| e.lane)
                .filter(|found| *found == next.lane),
            EventKind::OpCompleted if next.event.kind == EventKind::OpCompleted => activations
                .iter()
                .any(|(opname, lane)| *opname == next.event.opname && *lane == placed.lane)
                .then_some(next.lane),
            _ => None,
        };
    }

    let is_message_completed = event.kind == EventKind::MessageCompleted;
    if !(target.is_some_and(|target| target != placed.lane) || is_message_completed) {
        return false;
    }

    let is_reply = !(is_message_completed && event.opname.is_some())
        && event.kind != EventKind::OpRequest;
    let target = target.unwrap_or(if is_reply {
        next.lane
    } else {
        LaneKey::Object(event.objref)
    });
    // Targets that were never drawn get no arrow.
    let Some(target_lane) = lanes.iter().find(|lane| lane.key == target) else {
        return false;
    };

    let style = painter.style;
    let half_wrapper = style.event_wrapper_height / 2.0;
    let start_x = target_lane.pos_x.min(lane.pos_x) + half_wrapper;
    let end_x = target_lane.pos_x.max(lane.pos_x) - half_wrapper;
    ops.push(painter.arrow(
        Point::new(start_x, end_y),
        Point::new(end_x, end_y),
        (3.0, 5.0),
        false,
        style.grid_line_width,
        if is_reply { vec![5.0, 2.0] } else { Vec::new() },
        &style.font_color,
        target_lane.pos_x < lane.pos_x,
    ));

    if is_reply || next.event.kind == EventKind::ReplyRequest {
        return false;
    }
    let opname = event.short_opname();
    let text_width = painter.measure(&style.diagram_font, opname).width;
    ops.push(painter.text(
        opname,
        Point::new(
            start_x + (end_x - start_x - text_width) / 2.0,
            end_y - style.grid_line_width - 3.0,
        ),
        &style.diagram_font,
        &style.font_color,
    ));
    true
}
