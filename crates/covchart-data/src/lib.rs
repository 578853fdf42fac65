//! # covchart data
//!
//! Data source adapters and the dataframe builder.
//!
//! Adapters implement [`DataSource`] and return a [`RawTable`] of published
//! observations. [`DataframeBuilder`] turns a raw table into a
//! [`MetricTable`]: one column per region on a contiguous daily index,
//! optionally smoothed with a rolling mean.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod builder;
pub mod gov_api;
pub mod source;
pub mod static_source;
pub mod table;
pub mod zoe;

pub use builder::{rolling_mean, DataframeBuilder, MetricSpec};
pub use covchart_common::{CovChartError, Result};
pub use gov_api::GovApiSource;
pub use source::{http_client, DataSource, FetchRequest, SourceSet};
pub use static_source::StaticSource;
pub use table::{daily_index, MetricFrame, MetricTable, RawRow, RawTable};
pub use zoe::ZoeSource;
