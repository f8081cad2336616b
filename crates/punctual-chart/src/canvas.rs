//! Drawing backends.

use crate::render::{Channel, DrawCommand};
use serde::{Deserialize, Serialize};

/// Minimal 2D surface the chart needs.
pub trait Canvas {
    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: &str, width: f64);
    fn polyline(&mut self, points: &[(f64, f64)], color: &str, width: f64);
    fn circle(&mut self, center: (f64, f64), radius: f64, color: &str);
}

fn default_spot_color() -> String {
    "#10b981".to_string()
}

fn default_perp_color() -> String {
    "#3b82f6".to_string()
}

fn default_grid_color() -> String {
    "rgba(255, 255, 255, 0.1)".to_string()
}

fn default_background() -> String {
    "#0b0e11".to_string()
}

fn default_line_width() -> f64 {
    2.0
}

fn default_grid_width() -> f64 {
    1.0
}

/// Colors and stroke widths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartStyle {
    #[serde(default = "default_spot_color")]
    pub spot_color: String,
    #[serde(default = "default_perp_color")]
    pub perp_color: String,
    #[serde(default = "default_grid_color")]
    pub grid_color: String,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    #[serde(default = "default_grid_width")]
    pub grid_width: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            spot_color: default_spot_color(),
            perp_color: default_perp_color(),
            grid_color: default_grid_color(),
            background: default_background(),
            line_width: default_line_width(),
            grid_width: default_grid_width(),
        }
    }
}

impl ChartStyle {
    pub fn color(&self, channel: Channel) -> &str {
        match channel {
            Channel::Spot => &self.spot_color,
            Channel::Perp => &self.perp_color,
        }
    }
}

/// Replay `commands` onto `canvas` in order.
pub fn draw<C: Canvas + ?Sized>(commands: &[DrawCommand], style: &ChartStyle, canvas: &mut C) {
    for command in commands {
        match command {
            DrawCommand::GridLine { y, width } => {
                canvas.line((0.0, *y), (*width, *y), &style.grid_color, style.grid_width);
            }
            DrawCommand::Polyline { channel, points } => {
                canvas.polyline(points, style.color(*channel), style.line_width);
            }
            DrawCommand::Marker {
                channel,
                x,
                y,
                radius,
            } => canvas.circle((*x, *y), *radius, style.color(*channel)),
        }
    }
}
