// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The legend: one sample glyph per event kind.

use super::{Frame, Glyph, Painter};
use crate::{
    draw::{Point, Scene},
    events::EventKind,
};
use smol_str::SmolStr;

const CONJECTURE_LABEL: &str = "Validation Conjecture Violation";

pub(super) fn render(painter: &Painter<'_>) -> Scene {
    let style = painter.style;
    let font = &style.diagram_font;
    let event_length = painter.event_length();
    let padding = event_length;
    let text_x = padding + event_length + style.event_line_width;

    let mut kinds: Vec<EventKind> = EventKind::ALL
        .into_iter()
        .filter(|kind| !kind.is_declaration())
        .collect();
    kinds.sort_by_key(|kind| kind.log_name());

    let first = painter.measure(font, kinds[0].log_name());
    let text_height = first.font_height;
    let mut max_text_width = first.width;
    let mut y = event_length * 1.5;
    let mut ops = Vec::new();
    for kind in kinds {
        painter.glyph(
            &mut ops,
            Frame::Horizontal {
                origin: Point::new(0.0, 0.0),
            },
            Glyph {
                kind,
                label: (!kind.is_thread()).then(|| SmolStr::new_static(kind.abbreviation())),
                start: padding,
                end: padding + event_length - style.grid_line_width * 2.0,
                across: y,
                line_color: &style.font_color,
                text_color: &style.font_color,
                start_line: true,
                stop_line: true,
            },
        );
        let label = kind.legend_label();
        max_text_width = max_text_width.max(painter.measure(font, &label).width);
        ops.push(painter.text(label, Point::new(text_x, y), font, &style.font_color));
        y += text_height * 1.5 + style.grid_line_width;
    }

    painter.conjecture_marker(
        &mut ops,
        Point::new(padding * 1.5, y - text_height / 4.0),
        event_length / 3.0,
        &[],
    );
    ops.push(painter.text(
        CONJECTURE_LABEL,
        Point::new(text_x, y),
        font,
        &style.font_color,
    ));
    max_text_width = max_text_width.max(painter.measure(font, CONJECTURE_LABEL).width);

    painter.scene(
        max_text_width + text_x + style.grid_line_width,
        y + text_height,
        ops,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        draw::DrawOp,
        style::{MonospaceMeasure, Style},
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn lists_every_event_kind() {
        let style = Style::default();
        let painter = Painter::new(&style, &MonospaceMeasure);
        let scene = render(&painter);

        let labels: Vec<_> = scene
            .texts()
            .filter(|text| text.contains(' ') || text.starts_with("Validation"))
            .collect();
        assert_eq!(
            labels,
            [
                "Delayed Thread Swap In",
                "Message Activate",
                "Message Completed",
                "Message Request",
                "Op Activate",
                "Op Completed",
                "Op Request",
                "Reply Request",
                "Thread Create",
                "Thread Kill",
                "Thread Swap In",
                "Thread Swap Out",
                CONJECTURE_LABEL,
            ]
        );
        // Thread events show a marker instead of an abbreviation.
        assert!(scene.texts().any(|text| text == "mr"));
        assert!(!scene.texts().any(|text| text == "tc"));

        let circles = scene
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Circle { .. }))
            .count();
        assert_eq!(circles, 1);
        assert!(scene.width > painter.measure(&style.diagram_font, CONJECTURE_LABEL).width);
    }
}
