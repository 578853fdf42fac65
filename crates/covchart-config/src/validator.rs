//! Runtime validation of a loaded configuration.

use crate::schema::{Config, SourceKind};
use covchart_common::{CovChartError, Result};
use std::collections::HashSet;

/// Named palettes accepted by `charts.palette`.
pub const PALETTES: [&str; 5] = ["default", "dark", "light", "vibrant", "monochrome"];

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a configuration, reporting the first problem found.
    pub fn validate(config: &Config) -> Result<()> {
        Self::validate_sources(config)?;
        Self::validate_output(config)?;
        Self::validate_pipeline(config)?;
        Self::validate_metrics(config)?;
        Self::validate_charts(config)
    }

    fn validate_sources(config: &Config) -> Result<()> {
        let sources = &config.sources;
        url::Url::parse(&sources.gov_api_url).map_err(|e| {
            CovChartError::validation_field(format!("invalid URL: {e}"), "sources.gov_api_url")
        })?;
        url::Url::parse(&sources.zoe_url).map_err(|e| {
            CovChartError::validation_field(format!("invalid URL: {e}"), "sources.zoe_url")
        })?;
        if sources.zoe_lookback_days == 0 {
            return Err(CovChartError::validation_field(
                "look-back must be at least one day",
                "sources.zoe_lookback_days",
            ));
        }
        if sources.timeout_seconds == 0 {
            return Err(CovChartError::validation_field(
                "timeout must be greater than 0",
                "sources.timeout_seconds",
            ));
        }
        Ok(())
    }

    fn validate_output(config: &Config) -> Result<()> {
        if config.output.dir.as_os_str().is_empty() {
            return Err(CovChartError::validation_field(
                "output directory cannot be empty",
                "output.dir",
            ));
        }
        Ok(())
    }

    fn validate_pipeline(config: &Config) -> Result<()> {
        if config.pipeline.overlay_window == 0 {
            return Err(CovChartError::validation_field(
                "window must be at least 1",
                "pipeline.overlay_window",
            ));
        }
        if config.pipeline.regions.iter().any(|r| r.trim().is_empty()) {
            return Err(CovChartError::validation_field(
                "region names cannot be empty",
                "pipeline.regions",
            ));
        }
        Ok(())
    }

    fn validate_metrics(config: &Config) -> Result<()> {
        let mut seen = HashSet::new();
        for metric in &config.metrics {
            let id = metric.id.as_str();
            if id.trim().is_empty() {
                return Err(CovChartError::validation_field("metric id cannot be empty", "metrics.id"));
            }
            if !seen.insert(id) {
                return Err(CovChartError::validation_field(
                    format!("duplicate metric id '{id}'"),
                    "metrics.id",
                ));
            }
            if metric.field.trim().is_empty() {
                return Err(CovChartError::validation_field(
                    format!("metric '{id}' has no field"),
                    "metrics.field",
                ));
            }
            if metric.source == SourceKind::GovApi && metric.areas.is_empty() {
                return Err(CovChartError::validation_field(
                    format!("metric '{id}' needs at least one area query"),
                    "metrics.areas",
                ));
            }
            if metric.window == Some(0) {
                return Err(CovChartError::validation_field(
                    format!("metric '{id}' window must be at least 1"),
                    "metrics.window",
                ));
            }
            if metric.combine.iter().any(|c| c.regions.is_empty()) {
                return Err(CovChartError::validation_field(
                    format!("metric '{id}' combines an empty region list"),
                    "metrics.combine",
                ));
            }
        }
        Ok(())
    }

    fn validate_charts(config: &Config) -> Result<()> {
        let charts = &config.charts;
        if charts.width == 0 || charts.height == 0 || charts.dashboard_width == 0 || charts.dashboard_height == 0 {
            return Err(CovChartError::validation_field(
                "chart dimensions must be greater than 0",
                "charts.width",
            ));
        }
        if !PALETTES.contains(&charts.palette.as_str()) {
            return Err(CovChartError::validation_field(
                format!("unknown palette '{}'", charts.palette),
                "charts.palette",
            ));
        }
        for color in charts.colors.iter().chain(std::iter::once(&charts.background)) {
            if !is_hex_color(color) {
                return Err(CovChartError::validation_field(
                    format!("'{color}' is not a #rrggbb colour"),
                    "charts.colors",
                ));
            }
        }
        if charts.regional_y_max.is_some_and(|max| max <= 1.0) {
            return Err(CovChartError::validation_field(
                "regional y maximum must be greater than 1",
                "charts.regional_y_max",
            ));
        }
        Ok(())
    }
}

/// Returns true for `#rrggbb` strings.
pub fn is_hex_color(color: &str) -> bool {
    color
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

impl Config {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate(self)
    }
}
