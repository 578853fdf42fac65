//! Configuration schema definitions using serde.

use chrono::NaiveDate;
use covchart_common::{ImageFormat, LoggingConfig, MetricId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for covchart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote data source configuration.
    pub sources: SourcesConfig,
    /// Output directory and encoding.
    pub output: OutputConfig,
    /// Date range and region selection.
    pub pipeline: PipelineConfig,
    /// Metrics to fetch, in legend order.
    pub metrics: Vec<MetricConfig>,
    /// Chart kinds and styling.
    pub charts: ChartsConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Remote data source configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Base URL of the government statistics API.
    pub gov_api_url: String,
    /// Base URL under which the ZOE incidence CSV files are published.
    pub zoe_url: String,
    /// How many days back from today to look for a ZOE file.
    pub zoe_lookback_days: u32,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// User agent sent with every request.
    pub user_agent: String,
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the images are written to.
    pub dir: PathBuf,
    /// Image encoding.
    pub format: ImageFormat,
}

/// Date range and region selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Dates before this one are not plotted.
    pub start_date: Option<NaiveDate>,
    /// Regions to chart, in panel order.
    pub regions: Vec<String>,
    /// Region whose y axis is left uncapped.
    pub national_region: String,
    /// Rolling window used by the key-data and dashboard charts.
    pub overlay_window: usize,
}

/// Which adapter a metric is fetched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Government statistics API.
    GovApi,
    /// ZOE incidence CSV files.
    Zoe,
}

/// One set of API filters; the rows of every query of a metric are concatenated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaQuery {
    /// Area type, e.g. `region`, `nhsRegion`, `nation`.
    pub area_type: String,
    /// Optional area name, e.g. `England`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_name: Option<String>,
}

impl AreaQuery {
    /// Query for every area of a type.
    pub fn of_type(area_type: impl Into<String>) -> Self {
        Self {
            area_type: area_type.into(),
            area_name: None,
        }
    }

    /// Query for one named area.
    pub fn named(area_type: impl Into<String>, area_name: impl Into<String>) -> Self {
        Self {
            area_type: area_type.into(),
            area_name: Some(area_name.into()),
        }
    }
}

/// Keeps rows whose label `key` is one of `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelFilter {
    /// Label column, e.g. `age`.
    pub key: String,
    /// Accepted label values.
    pub values: Vec<String>,
}

/// A synthetic region equal to the sum of other regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCombination {
    /// Name of the new region.
    pub label: String,
    /// Regions summed into it.
    pub regions: Vec<String>,
}

impl RegionCombination {
    /// Creates a combination.
    pub fn new(label: &str, regions: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            regions: regions.iter().map(|r| (*r).to_string()).collect(),
        }
    }
}

/// Alignment of the rolling window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowAlign {
    /// Window ends at the current point.
    #[default]
    Trailing,
    /// Window is centred on the current point.
    Centered,
}

/// A metric to fetch, reshape and chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Identifier, used in file names.
    pub id: MetricId,
    /// Legend label.
    pub label: String,
    /// Adapter used to fetch it.
    pub source: SourceKind,
    /// Published field (government API) or CSV column (ZOE).
    pub field: String,
    /// Area queries (government API only).
    #[serde(default)]
    pub areas: Vec<AreaQuery>,
    /// Column the builder reads; defaults to the id (API) or the field (ZOE).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_column: Option<String>,
    /// Label filters, e.g. age bands.
    #[serde(default)]
    pub label_filters: Vec<LabelFilter>,
    /// Synthetic regions.
    #[serde(default)]
    pub combine: Vec<RegionCombination>,
    /// Name of a region holding the sum of all source regions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_total: Option<String>,
    /// Regions removed from the output.
    #[serde(default)]
    pub drop_regions: Vec<String>,
    /// Most recent days removed because they are still being revised.
    #[serde(default)]
    pub drop_trailing_days: usize,
    /// Rolling average window in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
    /// Rolling window alignment.
    #[serde(default)]
    pub align: WindowAlign,
    /// Restricts the metric chart to one region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl MetricConfig {
    /// Minimal metric definition; the remaining fields take their defaults.
    pub fn new(id: &str, label: &str, source: SourceKind, field: &str) -> Self {
        Self {
            id: MetricId::new(id),
            label: label.to_string(),
            source,
            field: field.to_string(),
            areas: Vec::new(),
            value_column: None,
            label_filters: Vec::new(),
            combine: Vec::new(),
            national_total: None,
            drop_regions: Vec::new(),
            drop_trailing_days: 0,
            window: None,
            align: WindowAlign::Trailing,
            region: None,
        }
    }

    /// Column holding this metric's values in the fetched table.
    pub fn value_column(&self) -> &str {
        match (&self.value_column, self.source) {
            (Some(column), _) => column,
            (None, SourceKind::GovApi) => self.id.as_str(),
            (None, SourceKind::Zoe) => &self.field,
        }
    }
}

/// Chart kinds and styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    /// Render one overlay chart per region.
    pub key_data: bool,
    /// Render the regional dashboard.
    pub dashboard: bool,
    /// Width of single charts in pixels.
    pub width: u32,
    /// Height of single charts in pixels.
    pub height: u32,
    /// Width of the dashboard in pixels.
    pub dashboard_width: u32,
    /// Height of the dashboard in pixels.
    pub dashboard_height: u32,
    /// Named palette: default, dark, light, vibrant, monochrome.
    pub palette: String,
    /// Custom `#rrggbb` colours; overrides the palette when non-empty.
    pub colors: Vec<String>,
    /// Background colour.
    pub background: String,
    /// Font family used for all text.
    pub font_family: String,
    /// Title font size in pixels.
    pub title_font_size: u32,
    /// Tick and legend font size in pixels.
    pub label_font_size: u32,
    /// Logarithmic y axis.
    pub log_scale: bool,
    /// Upper y bound for every region but the national one.
    pub regional_y_max: Option<f64>,
    /// Stroke width of raw series.
    pub raw_line_width: u32,
    /// Stroke width of rolling averages.
    pub average_line_width: u32,
    /// Draw captions, tick labels and legends.
    pub text: bool,
}
