// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagram styling and text measurement.
//!
//! All sizes are derived from a single font size, the way the editor's font size drives the
//! diagram. Text is measured through [`TextMeasure`] so that layout can run without a real
//! rendering backend.

use crate::events::EventKind;
use serde::Serialize;
use smol_str::SmolStr;
use std::fmt;

/// A font used for drawing text.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Font {
    /// The size in pixels.
    pub size: f64,
    /// The font family.
    pub family: SmolStr,
    /// Whether the font is bold.
    pub bold: bool,
}

impl Font {
    /// Creates a regular font.
    pub fn new(size: f64, family: impl Into<SmolStr>) -> Self {
        Self {
            size,
            family: family.into(),
            bold: false,
        }
    }

    /// Returns a bold version of this font.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bold {
            write!(f, "900 {}px {}", self.size, self.family)
        } else {
            write!(f, "{}px {}", self.size, self.family)
        }
    }
}

/// The measured size of a piece of text.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextMetrics {
    /// The advance width.
    pub width: f64,
    /// The height of the inked glyphs.
    pub height: f64,
    /// The line height of the font.
    pub font_height: f64,
}

/// Measures text for layout.
pub trait TextMeasure: Send {
    /// Measures `text` drawn in `font`.
    fn measure(&self, font: &Font, text: &str) -> TextMetrics;
}

/// Measures text as if every glyph were the same width.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonospaceMeasure;

impl TextMeasure for MonospaceMeasure {
    fn measure(&self, font: &Font, text: &str) -> TextMetrics {
        TextMetrics {
            width: text.chars().count() as f64 * font.size * 0.6,
            height: font.size * 0.95,
            font_height: font.size * 1.2,
        }
    }
}

/// Colors and sizes used by every view.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Style {
    /// The base font size.
    pub font_size: f64,
    /// Font for CPU, bus and lane names.
    pub decl_font: Font,
    /// Font for conjecture violation names.
    pub conjecture_font: Font,
    /// Font for event labels, times and operation names.
    pub diagram_font: Font,
    /// Width of grid lines, lane boxes and arrows.
    pub grid_line_width: f64,
    /// Width of event bars.
    pub event_line_width: f64,
    /// Length of the dashes of dashed grid lines.
    pub line_dash_size: f64,
    /// Height of the start and stop lines around events.
    pub event_wrapper_height: f64,
    /// Width of the conjecture violation circle.
    pub conjecture_marker_width: f64,
    /// Color of text and grid lines.
    pub font_color: SmolStr,
    /// Background color of every view.
    pub background_color: SmolStr,
    /// Color of conjecture violation markers.
    pub conjecture_color: SmolStr,
    /// Colors for buses and event kinds. The first is the font color.
    pub theme_colors: Vec<SmolStr>,
}

impl Style {
    /// Derives a style from a font size and family.
    pub fn new(font_size: f64, font_family: &str) -> Self {
        let grid_line_width = (font_size / 10.0).max(1.0);
        let event_line_width = grid_line_width * 4.0;
        let font_color = SmolStr::new_static("#000000");
        Self {
            font_size,
            decl_font: Font::new(font_size * 1.5, font_family),
            conjecture_font: Font::new(font_size * 1.1, font_family).bold(),
            diagram_font: Font::new(font_size, font_family),
            grid_line_width,
            event_line_width,
            line_dash_size: grid_line_width * 0.7,
            event_wrapper_height: event_line_width * 3.0,
            conjecture_marker_width: grid_line_width * 3.0,
            theme_colors: vec![
                font_color.clone(),
                SmolStr::new_static("#388a34"),
                SmolStr::new_static("#be8700"),
                SmolStr::new_static("#a1260d"),
                SmolStr::new_static("#cc6633"),
                SmolStr::new_static("#d18616"),
                SmolStr::new_static("#007acc"),
            ],
            font_color,
            background_color: SmolStr::new_static("#ffffff"),
            conjecture_color: SmolStr::new_static("#FF0000"),
        }
    }

    /// Returns the color events of `kind` are drawn in.
    pub fn event_color(&self, kind: EventKind) -> SmolStr {
        let index = match kind {
            EventKind::ThreadCreate | EventKind::ThreadKill => 1,
            EventKind::ThreadSwapIn | EventKind::ThreadSwapOut | EventKind::DelayedThreadSwapIn => 2,
            EventKind::MessageRequest
            | EventKind::ReplyRequest
            | EventKind::MessageActivate
            | EventKind::MessageCompleted => 3,
            EventKind::OpRequest => 4,
            EventKind::OpActivate => 5,
            EventKind::OpCompleted => 6,
            EventKind::CpuDecl | EventKind::BusDecl | EventKind::DeployObj => 0,
        };
        self.theme_color(index)
    }

    /// Returns the `index`th theme color, or the font color past the end.
    pub fn theme_color(&self, index: usize) -> SmolStr {
        self.theme_colors
            .get(index)
            .cloned()
            .unwrap_or_else(|| self.font_color.clone())
    }

    /// Returns the dash pattern of dashed grid lines.
    pub fn grid_dash(&self) -> Vec<f64> {
        vec![self.line_dash_size, self.line_dash_size * 4.0]
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::new(16.0, "monospace")
    }
}
