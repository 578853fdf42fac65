//! Chart description and styling types

use chrono::{Duration, NaiveDate};
use covchart_config::ChartsConfig;
use serde::{Deserialize, Serialize};

/// Color scheme for charts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorScheme {
    /// Ten-colour categorical palette
    Default,
    /// Saturated colours for dark backgrounds
    Dark,
    /// Pastel colours
    Light,
    /// High-contrast colours
    Vibrant,
    /// Greys
    Monochrome,
    /// `#rrggbb` colours
    Custom(Vec<String>),
}

impl ColorScheme {
    /// Scheme for a palette name and optional custom colours; custom colours
    /// win when present.
    pub fn from_config(palette: &str, colors: &[String]) -> Self {
        if !colors.is_empty() {
            return Self::Custom(colors.to_vec());
        }
        match palette {
            "dark" => Self::Dark,
            "light" => Self::Light,
            "vibrant" => Self::Vibrant,
            "monochrome" => Self::Monochrome,
            _ => Self::Default,
        }
    }
}

/// Font configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontConfig {
    /// Font family
    pub family: String,
    /// Size in pixels
    pub size: u32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_string(),
            size: 26,
        }
    }
}

/// Margin configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginConfig {
    /// Space around each plot
    pub outer: u32,
    /// Height of the x label area
    pub x_labels: u32,
    /// Width of the right-hand y label area
    pub y_labels: u32,
}

impl Default for MarginConfig {
    fn default() -> Self {
        Self {
            outer: 20,
            x_labels: 50,
            y_labels: 110,
        }
    }
}

/// Styling shared by every chart of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartStyle {
    /// Series colours
    pub color_scheme: ColorScheme,
    /// Background colour
    pub background_color: String,
    /// Chart and panel titles
    pub title_font: FontConfig,
    /// Tick labels and legend
    pub label_font: FontConfig,
    /// Plot margins
    pub margins: MarginConfig,
    /// Logarithmic y axis
    pub log_scale: bool,
    /// Stroke width of raw series
    pub raw_line_width: u32,
    /// Stroke width of rolling averages
    pub average_line_width: u32,
    /// Draw captions, tick labels and legends
    pub text: bool,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self::from(&ChartsConfig::default())
    }
}

impl From<&ChartsConfig> for ChartStyle {
    fn from(config: &ChartsConfig) -> Self {
        Self {
            color_scheme: ColorScheme::from_config(&config.palette, &config.colors),
            background_color: config.background.clone(),
            title_font: FontConfig {
                family: config.font_family.clone(),
                size: config.title_font_size,
            },
            label_font: FontConfig {
                family: config.font_family.clone(),
                size: config.label_font_size,
            },
            margins: MarginConfig::default(),
            log_scale: config.log_scale,
            raw_line_width: config.raw_line_width,
            average_line_width: config.average_line_width,
            text: config.text,
        }
    }
}

/// One line: contiguous daily values from `start`
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    /// Legend entry; unlabelled series stay out of the legend
    pub label: Option<String>,
    /// Date of the first value
    pub start: NaiveDate,
    /// Daily values, `None` where missing
    pub values: Vec<Option<f64>>,
    /// Index into the colour scheme
    pub color: usize,
    /// Stroke width in pixels
    pub width: u32,
}

impl ChartSeries {
    /// Date of the last value
    pub fn end(&self) -> Option<NaiveDate> {
        let len = i64::try_from(self.values.len()).ok()?;
        (len > 0).then(|| self.start + Duration::days(len - 1))
    }

    /// Runs of consecutive present values as (date, value) points. Values
    /// failing `keep` split runs like missing ones.
    pub fn segments(&self, keep: impl Fn(f64) -> bool) -> Vec<Vec<(NaiveDate, f64)>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();

        for (i, value) in self.values.iter().enumerate() {
            match value {
                Some(v) if keep(*v) => current.push((self.start + Duration::days(i as i64), *v)),
                _ => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }
}

/// One plot area
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panel {
    /// Caption drawn above the plot
    pub title: Option<String>,
    /// Lines in drawing order
    pub series: Vec<ChartSeries>,
    /// Upper y bound; derived from the data when unset
    pub y_max: Option<f64>,
}

impl Panel {
    /// Earliest and latest dates of all series
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.series.iter().filter(|s| !s.values.is_empty()).map(|s| s.start).min()?;
        let end = self.series.iter().filter_map(ChartSeries::end).max()?;
        Some((start, end))
    }

    /// Largest present value
    pub fn max_value(&self) -> Option<f64> {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().flatten().copied())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }
}

/// A whole image: an optional title over a grid of panels filled column by
/// column
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Caption over the whole image
    pub title: Option<String>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Grid rows and columns
    pub layout: (usize, usize),
    /// Panels; panel i goes to row `i % rows`, column `i / rows`
    pub panels: Vec<Panel>,
}

impl Chart {
    /// A single-panel chart
    pub fn single(title: impl Into<String>, width: u32, height: u32, panel: Panel) -> Self {
        Self {
            title: Some(title.into()),
            width,
            height,
            layout: (1, 1),
            panels: vec![panel],
        }
    }

    /// Row-major grid cell of panel `index`
    pub fn cell(&self, index: usize) -> Option<usize> {
        let (rows, cols) = self.layout;
        if rows == 0 || index >= rows * cols {
            return None;
        }
        Some((index % rows) * cols + index / rows)
    }
}
