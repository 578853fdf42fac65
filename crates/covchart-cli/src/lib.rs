//! # covchart
//!
//! Fetches public Covid-19 statistics and renders them as static charts.
//!
//! The [`Pipeline`] fetches every configured metric through its
//! [`covchart_data::DataSource`], reshapes it with the dataframe builder and
//! writes one chart per metric, plus the optional per-region key-data charts
//! and regional dashboard.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod pipeline;

pub use error::*;
pub use pipeline::*;
