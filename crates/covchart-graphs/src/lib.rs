//! # covchart graphs
//!
//! Chart generation and rendering.
//!
//! Metric tables are described as [`Chart`]s (a grid of [`Panel`]s holding
//! daily [`ChartSeries`]) and rendered with plotters to PNG or SVG files.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod generator;
pub mod renderer;
pub mod types;

pub use generator::*;
pub use renderer::{get_colors, parse_color, GraphRenderer, LineChartRenderer};
pub use types::*;
