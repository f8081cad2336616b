//! Series to drawing commands.

use crate::error::{ChartError, ChartResult};
use punctual_core::PricePoint;
use serde::Serialize;

/// Fraction of the price range added above and below the data.
pub const RANGE_PADDING: f64 = 0.05;

/// Horizontal grid bands; one more line than bands is drawn.
pub const GRID_DIVISIONS: u32 = 5;

/// Radius of the last-price markers.
pub const MARKER_RADIUS: f64 = 4.0;

/// Drawing area in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> ChartResult<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ChartError::InvalidViewport { width, height });
        }
        Ok(Self { width, height })
    }
}

/// Price channel a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Spot,
    Perp,
}

impl Channel {
    pub fn price(self, point: &PricePoint) -> f64 {
        match self {
            Self::Spot => point.spot_price,
            Self::Perp => point.perp_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Full-width horizontal line at `y`.
    GridLine { y: f64, width: f64 },
    Polyline {
        channel: Channel,
        points: Vec<(f64, f64)>,
    },
    /// Filled circle marking the latest price.
    Marker {
        channel: Channel,
        x: f64,
        y: f64,
        radius: f64,
    },
}

/// Maps prices onto the vertical axis.
struct PriceScale {
    padded_min: f64,
    padded_range: f64,
    height: f64,
}

impl PriceScale {
    fn new(points: &[PricePoint], height: f64) -> Self {
        let (min, max) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.low()), hi.max(p.high()))
        });
        let range = max - min;
        let padded_min = min - range * RANGE_PADDING;
        let padded_max = max + range * RANGE_PADDING;
        Self {
            padded_min,
            padded_range: padded_max - padded_min,
            height,
        }
    }

    fn y(&self, price: f64) -> f64 {
        if self.padded_range <= 0.0 || !self.padded_range.is_finite() {
            return self.height / 2.0;
        }
        self.height - (price - self.padded_min) / self.padded_range * self.height
    }
}

fn x_at(index: usize, len: usize, width: f64) -> f64 {
    let steps = len.saturating_sub(1).max(1) as f64;
    width * index as f64 / steps
}

/// Render `points` (oldest first) into drawing commands.
///
/// Order: grid lines top to bottom, spot line, perp line, spot marker,
/// perp marker. An empty series renders nothing.
pub fn render(points: &[PricePoint], viewport: Viewport) -> Vec<DrawCommand> {
    let Some(last) = points.last() else {
        return Vec::new();
    };

    let Viewport { width, height } = viewport;
    let scale = PriceScale::new(points, height);
    let mut commands = Vec::with_capacity(GRID_DIVISIONS as usize + 5);

    for k in 0..=GRID_DIVISIONS {
        commands.push(DrawCommand::GridLine {
            y: height / f64::from(GRID_DIVISIONS) * f64::from(k),
            width,
        });
    }

    if points.len() > 1 {
        for channel in [Channel::Spot, Channel::Perp] {
            let line = points
                .iter()
                .enumerate()
                .map(|(i, p)| (x_at(i, points.len(), width), scale.y(channel.price(p))))
                .collect();
            commands.push(DrawCommand::Polyline {
                channel,
                points: line,
            });
        }
    }

    let last_x = x_at(points.len() - 1, points.len(), width);
    for channel in [Channel::Spot, Channel::Perp] {
        commands.push(DrawCommand::Marker {
            channel,
            x: last_x,
            y: scale.y(channel.price(last)),
            radius: MARKER_RADIUS,
        });
    }

    commands
}
