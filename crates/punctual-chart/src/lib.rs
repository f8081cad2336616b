//! Spot/perp line chart.
//!
//! `render` is a pure function from a price series to drawing commands;
//! a `Canvas` backend turns the commands into pixels or markup. `SvgCanvas`
//! is the backend the terminal writes to disk.

pub mod canvas;
pub mod error;
pub mod render;
pub mod svg;

pub use canvas::{draw, Canvas, ChartStyle};
pub use error::{ChartError, ChartResult};
pub use render::{
    render, Channel, DrawCommand, Viewport, GRID_DIVISIONS, MARKER_RADIUS, RANGE_PADDING,
};
pub use svg::SvgCanvas;
