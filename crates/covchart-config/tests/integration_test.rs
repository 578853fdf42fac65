//! Integration tests for covchart-config crate.

use chrono::NaiveDate;
use covchart_common::{CovChartError, ImageFormat};
use covchart_config::{Config, ConfigLoader, MetricConfig, SourceKind, WindowAlign};
use std::io::Write;
use std::path::PathBuf;

fn validation_field(error: CovChartError) -> Option<String> {
    match error {
        CovChartError::Validation { field, .. } => field,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn test_default_config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.metrics.len(), 6);
    assert_eq!(config.output.dir, PathBuf::from("charts"));
}

#[test]
fn test_partial_yaml_keeps_defaults() {
    let yaml = r#"
output:
  dir: out
  format: svg
pipeline:
  start_date: 2020-06-01
metrics:
  - id: deaths
    label: Deaths
    source: gov_api
    field: newDeaths28DaysByDeathDate
    areas:
      - area_type: region
    window: 7
    align: centered
"#;
    let config = ConfigLoader::parse_yaml(yaml).unwrap();

    assert_eq!(config.output.dir, PathBuf::from("out"));
    assert_eq!(config.output.format, ImageFormat::Svg);
    assert_eq!(config.pipeline.start_date, NaiveDate::from_ymd_opt(2020, 6, 1));
    assert_eq!(config.pipeline.regions.len(), 8);
    assert_eq!(config.metrics.len(), 1);
    assert_eq!(config.metrics[0].align, WindowAlign::Centered);
    assert_eq!(config.metrics[0].value_column(), "deaths");
    assert!(config.charts.key_data);
    assert!(config.validate().is_ok());
}

#[test]
fn test_toml_file_is_loaded_by_extension() {
    let toml = r#"
[output]
dir = "toml-charts"

[charts]
dashboard = false
palette = "dark"

[[metrics]]
id = "zoe"
label = "Zoe new infections"
source = "zoe"
field = "covid_in_pop"
"#;
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(toml.as_bytes()).unwrap();

    let config = ConfigLoader::parse_file(file.path()).unwrap();

    assert_eq!(config.output.dir, PathBuf::from("toml-charts"));
    assert!(!config.charts.dashboard);
    assert_eq!(config.charts.palette, "dark");
    assert_eq!(config.metrics[0].source, SourceKind::Zoe);
    assert_eq!(config.metrics[0].value_column(), "covid_in_pop");
}

#[test]
fn test_missing_file_is_config_error() {
    let error = ConfigLoader::parse_file(std::path::Path::new("/nonexistent/covchart.yaml")).unwrap_err();
    assert!(matches!(error, CovChartError::Config { .. }));
}

#[test]
fn test_malformed_yaml_is_config_error() {
    let error = ConfigLoader::parse_yaml("metrics: [ {id: ").unwrap_err();
    assert!(matches!(error, CovChartError::Config { .. }));
}

#[test]
fn test_duplicate_metric_ids_rejected() {
    let mut config = Config::default();
    let duplicate = config.metrics[1].clone();
    config.metrics.push(duplicate);

    let field = validation_field(config.validate().unwrap_err());
    assert_eq!(field.as_deref(), Some("metrics.id"));
}

#[test]
fn test_zero_window_rejected() {
    let mut config = Config::default();
    config.metrics[0].window = Some(0);
    assert_eq!(validation_field(config.validate().unwrap_err()).as_deref(), Some("metrics.window"));

    let mut config = Config::default();
    config.pipeline.overlay_window = 0;
    assert_eq!(
        validation_field(config.validate().unwrap_err()).as_deref(),
        Some("pipeline.overlay_window")
    );
}

#[test]
fn test_gov_metric_needs_area_query() {
    let mut config = Config::default();
    config.metrics = vec![MetricConfig::new("deaths", "Deaths", SourceKind::GovApi, "newDeaths28DaysByDeathDate")];

    assert_eq!(validation_field(config.validate().unwrap_err()).as_deref(), Some("metrics.areas"));
}

#[test]
fn test_chart_settings_validated() {
    let mut config = Config::default();
    config.charts.palette = "neon".to_string();
    assert_eq!(validation_field(config.validate().unwrap_err()).as_deref(), Some("charts.palette"));

    let mut config = Config::default();
    config.charts.colors = vec!["#12345".to_string()];
    assert_eq!(validation_field(config.validate().unwrap_err()).as_deref(), Some("charts.colors"));

    let mut config = Config::default();
    config.charts.width = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_url_rejected() {
    let mut config = Config::default();
    config.sources.gov_api_url = "not a url".to_string();
    assert_eq!(
        validation_field(config.validate().unwrap_err()).as_deref(),
        Some("sources.gov_api_url")
    );
}
