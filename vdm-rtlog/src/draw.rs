// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend-independent drawing instructions.
//!
//! Views are laid out into a [`Scene`]: a canvas size plus an ordered list of [`DrawOp`]s. A host
//! replays the operations onto whatever surface it renders to.

use crate::style::Font;
use serde::Serialize;
use smol_str::SmolStr;

/// A point on the canvas. The origin is the top left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    /// Distance from the left edge.
    pub x: f64,
    /// Distance from the top edge.
    pub y: f64,
}

impl Point {
    /// Creates a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }
}

/// A single drawing instruction.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum DrawOp {
    /// A straight line. An empty dash pattern is a solid line.
    Line {
        /// Start of the line.
        from: Point,
        /// End of the line.
        to: Point,
        /// Stroke width.
        width: f64,
        /// Dash pattern.
        dash: Vec<f64>,
        /// Stroke color.
        color: SmolStr,
    },

    /// A line with an arrowhead.
    Arrow {
        /// Start of the shaft.
        from: Point,
        /// End of the shaft.
        to: Point,
        /// Half the width of the head.
        head_width: f64,
        /// Length of the head along the shaft.
        head_length: f64,
        /// Whether the head is filled.
        filled: bool,
        /// Stroke width.
        width: f64,
        /// Dash pattern of the shaft.
        dash: Vec<f64>,
        /// Stroke and fill color.
        color: SmolStr,
        /// Whether the head is at `from` rather than `to`.
        head_at_start: bool,
    },

    /// The outline of a rectangle.
    StrokeRect {
        /// Top left corner.
        origin: Point,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
        /// Stroke width.
        line_width: f64,
        /// Dash pattern.
        dash: Vec<f64>,
        /// Stroke color.
        color: SmolStr,
    },

    /// Text, drawn with its baseline starting at `at`.
    Text {
        /// The text.
        text: SmolStr,
        /// Start of the baseline.
        at: Point,
        /// Font.
        font: Font,
        /// Fill color.
        color: SmolStr,
        /// Clockwise rotation around `at`, in radians.
        angle: f64,
    },

    /// The outline of a circle.
    Circle {
        /// Center.
        center: Point,
        /// Radius.
        radius: f64,
        /// Stroke width.
        width: f64,
        /// Stroke color.
        color: SmolStr,
    },

    /// Two perpendicular lines crossing at `center`.
    Cross {
        /// Where the lines cross.
        center: Point,
        /// Length of each line.
        length: f64,
        /// Stroke width.
        width: f64,
        /// Stroke color.
        color: SmolStr,
        /// Clockwise rotation, in radians. Zero draws a `+`.
        angle: f64,
    },
}

impl DrawOp {
    /// Moves the operation by `(dx, dy)`.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            DrawOp::Line { from, to, .. } | DrawOp::Arrow { from, to, .. } => {
                from.translate(dx, dy);
                to.translate(dx, dy);
            }
            DrawOp::StrokeRect { origin, .. } => origin.translate(dx, dy),
            DrawOp::Text { at, .. } => at.translate(dx, dy),
            DrawOp::Circle { center, .. } | DrawOp::Cross { center, .. } => {
                center.translate(dx, dy)
            }
        }
    }
}

/// A laid out view.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Scene {
    /// Canvas width in pixels.
    pub width: f64,
    /// Canvas height in pixels.
    pub height: f64,
    /// Fill color drawn beneath everything else.
    pub background: SmolStr,
    /// Instructions, in drawing order.
    pub ops: Vec<DrawOp>,
}

impl Scene {
    /// Returns the number of text operations in the scene.
    pub fn text_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Text { .. }))
            .count()
    }

    /// Iterates over the text drawn in the scene.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_ops_are_tagged() {
        let op = DrawOp::Circle {
            center: Point::new(1.0, 2.0),
            radius: 3.0,
            width: 1.0,
            color: "#FF0000".into(),
        };
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["op"], "circle");
        assert_eq!(value["center"]["y"], 2.0);

        let value = serde_json::to_value(DrawOp::StrokeRect {
            origin: Point::default(),
            width: 1.0,
            height: 1.0,
            line_width: 1.0,
            dash: vec![2.0, 2.0],
            color: "#000000".into(),
        })
        .unwrap();
        assert_eq!(value["op"], "stroke-rect");
    }

    #[test]
    fn translate_moves_every_point() {
        let mut op = DrawOp::Line {
            from: Point::new(0.0, 0.0),
            to: Point::new(4.0, 0.0),
            width: 1.0,
            dash: Vec::new(),
            color: "#000000".into(),
        };
        op.translate(1.0, 2.0);
        let DrawOp::Line { from, to, .. } = op else {
            unreachable!()
        };
        assert_eq!((from, to), (Point::new(1.0, 2.0), Point::new(5.0, 2.0)));
    }
}
