// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The architecture view: a box per CPU with the buses hanging below.

use super::Painter;
use crate::{
    draw::{DrawOp, Point, Scene},
    model::LogData,
};

struct CpuBox {
    id: u64,
    start: f64,
    width: f64,
    text_start: f64,
    connections: usize,
    established: usize,
}

pub(super) fn render(painter: &Painter<'_>, data: &LogData) -> Scene {
    let style = painter.style;
    let font = &style.decl_font;
    let gg = painter.measure(font, "Gg");
    let text_height = gg.height;
    let margin = gg.width;
    let padding = margin / 2.0;
    let rect_bottom = text_height + padding * 2.0 + margin + style.grid_line_width;

    let bus_text_width = data
        .bus_decls
        .iter()
        .map(|bus| painter.measure(font, &bus.name).width + margin)
        .fold(margin, f64::max);

    let mut boxes = Vec::with_capacity(data.cpu_decls.len());
    let mut next_x = bus_text_width;
    for cpu in &data.cpu_decls {
        let connections = data
            .bus_decls
            .iter()
            .flat_map(|bus| &bus.topology)
            .filter(|id| **id == cpu.id)
            .count();
        let min_width = connections as f64 * (margin / 2.0);
        let text_width = painter.measure(font, &cpu.name).width;
        let width = text_width.max(min_width) + padding * 2.0;
        boxes.push(CpuBox {
            id: cpu.id,
            start: next_x,
            width,
            text_start: next_x + ((min_width - text_width) / 2.0).max(0.0) + padding,
            connections,
            established: 0,
        });
        next_x += width + margin;
    }

    let mut ops = Vec::new();
    for (cpu, cpu_box) in data.cpu_decls.iter().zip(&boxes) {
        ops.push(DrawOp::StrokeRect {
            origin: Point::new(cpu_box.start, margin),
            width: cpu_box.width,
            height: text_height + padding * 2.0,
            line_width: style.grid_line_width,
            dash: virtual_dash(cpu.id),
            color: style.font_color.clone(),
        });
        ops.push(painter.text(
            cpu.name.clone(),
            Point::new(cpu_box.text_start, rect_bottom - padding),
            font,
            &style.font_color,
        ));
    }

    let bus_step = text_height * 2.0;
    let mut bus_y = rect_bottom + bus_step;
    for (index, bus) in data.bus_decls.iter().enumerate() {
        let color = style.theme_color(index);
        let mut topology = bus.topology.clone();
        topology.sort_unstable();

        // Connections are spread evenly along the bottom of each box.
        let mut xs = Vec::with_capacity(topology.len());
        if topology.len() > 1 {
            for cpu_id in &topology {
                let Some(cpu_box) = boxes.iter_mut().find(|b| b.id == *cpu_id) else {
                    continue;
                };
                cpu_box.established += 1;
                let x = cpu_box.width / (cpu_box.connections + 1) as f64
                    * cpu_box.established as f64
                    + cpu_box.start;
                ops.push(painter.line(
                    Point::new(x, rect_bottom),
                    Point::new(x, bus_y),
                    style.grid_line_width,
                    virtual_dash(bus.id),
                    &color,
                ));
                xs.push(x);
            }
        }
        if let (Some(first), Some(last)) = (xs.first(), xs.last()) {
            ops.push(painter.line(
                Point::new(*first, bus_y),
                Point::new(*last, bus_y),
                style.grid_line_width,
                virtual_dash(bus.id),
                &color,
            ));
        }

        ops.push(painter.text(
            bus.name.clone(),
            Point::new(margin, bus_y + text_height / 2.0),
            font,
            &color,
        ));
        bus_y += bus_step;
    }

    let height = rect_bottom + bus_step * data.bus_decls.len() as f64 + text_height + margin;
    painter.scene(next_x, height, ops)
}

// The virtual CPU and bus are drawn dashed.
fn virtual_dash(id: u64) -> Vec<f64> {
    if id == 0 { vec![2.0, 2.0] } else { Vec::new() }
}
