//! Pipeline error types using thiserror.

use covchart_common::CovChartError;

/// Error of one pipeline stage, naming what it was working on.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Data sources could not be set up.
    #[error("Failed to set up data sources")]
    Setup(#[source] CovChartError),

    /// A source could not deliver a metric.
    #[error("Failed to fetch {metric}")]
    Fetch {
        /// Metric id.
        metric: String,
        /// Cause.
        #[source]
        source: CovChartError,
    },

    /// A fetched table did not have the expected shape.
    #[error("Failed to build the {metric} table")]
    Shape {
        /// Metric id.
        metric: String,
        /// Cause.
        #[source]
        source: CovChartError,
    },

    /// A chart could not be drawn or written.
    #[error("Failed to write chart {chart}")]
    Chart {
        /// Chart description.
        chart: String,
        /// Cause.
        #[source]
        source: CovChartError,
    },

    /// The output directory could not be created.
    #[error("Output directory unavailable")]
    Output(#[source] CovChartError),
}

impl PipelineError {
    /// The underlying library error.
    pub fn cause(&self) -> &CovChartError {
        match self {
            Self::Setup(source) | Self::Output(source) => source,
            Self::Fetch { source, .. } | Self::Shape { source, .. } | Self::Chart { source, .. } => source,
        }
    }
}

/// Result type for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;
