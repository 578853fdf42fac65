//! Default values reproducing the standard key-data charts.

use crate::schema::*;
use chrono::NaiveDate;
use covchart_common::{ImageFormat, LoggingConfig};
use std::path::PathBuf;

/// Government statistics API endpoint.
pub const DEFAULT_GOV_API_URL: &str = "https://api.coronavirus.data.gov.uk/v1/data";

/// Bucket holding the ZOE incidence files.
pub const DEFAULT_ZOE_URL: &str = "https://storage.googleapis.com/covid-public-data/csv";

/// Region plotted first and left uncapped.
pub const NATIONAL_REGION: &str = "England";

/// England followed by the seven NHS regions.
pub const DEFAULT_REGIONS: [&str; 8] = [
    "England",
    "East of England",
    "London",
    "Midlands",
    "North East and Yorkshire",
    "North West",
    "South East",
    "South West",
];

/// Start of the first wave.
pub fn default_start_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2020, 3, 1)
}

/// Statistical regions merged into the two NHS regions that span several of them.
pub fn nhs_region_combinations() -> Vec<RegionCombination> {
    vec![
        RegionCombination::new("Midlands", &["East Midlands", "West Midlands"]),
        RegionCombination::new("North East and Yorkshire", &["North East", "Yorkshire and The Humber"]),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourcesConfig::default(),
            output: OutputConfig::default(),
            pipeline: PipelineConfig::default(),
            metrics: default_metrics(),
            charts: ChartsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            gov_api_url: DEFAULT_GOV_API_URL.to_string(),
            zoe_url: DEFAULT_ZOE_URL.to_string(),
            zoe_lookback_days: 10,
            timeout_seconds: 30,
            user_agent: concat!("covchart/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("charts"),
            format: ImageFormat::Png,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            regions: DEFAULT_REGIONS.iter().map(|r| (*r).to_string()).collect(),
            national_region: NATIONAL_REGION.to_string(),
            overlay_window: 7,
        }
    }
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            key_data: true,
            dashboard: true,
            width: 2400,
            height: 1400,
            dashboard_width: 3600,
            dashboard_height: 3000,
            palette: "default".to_string(),
            colors: Vec::new(),
            background: "#ffffff".to_string(),
            font_family: "sans-serif".to_string(),
            title_font_size: 48,
            label_font_size: 26,
            log_scale: true,
            regional_y_max: Some(20_000.0),
            raw_line_width: 1,
            average_line_width: 4,
            text: true,
        }
    }
}

/// The six datasets of the key-data charts, in legend order.
pub fn default_metrics() -> Vec<MetricConfig> {
    let nhs_areas = vec![
        AreaQuery::of_type("nhsRegion"),
        AreaQuery::named("nation", NATIONAL_REGION),
    ];
    let region_areas = vec![AreaQuery::of_type("region")];
    let cases_field = "newCasesBySpecimenDateAgeDemographics";

    let zoe = MetricConfig {
        drop_regions: ["Northern Ireland", "Scotland", "UK", "Wales"]
            .iter()
            .map(|r| (*r).to_string())
            .collect(),
        combine: nhs_region_combinations(),
        window: Some(7),
        ..MetricConfig::new("zoe", "Zoe new infections", SourceKind::Zoe, "covid_in_pop")
    };

    let admissions = MetricConfig {
        areas: nhs_areas.clone(),
        window: Some(7),
        ..MetricConfig::new("admissions", "Admissions", SourceKind::GovApi, "newAdmissions")
    };

    let inpatients = MetricConfig {
        areas: nhs_areas,
        window: Some(7),
        ..MetricConfig::new("inpatients", "Inpatients", SourceKind::GovApi, "hospitalCases")
    };

    let cases_over_60 = MetricConfig {
        areas: region_areas.clone(),
        value_column: Some("cases".to_string()),
        label_filters: vec![LabelFilter {
            key: "age".to_string(),
            values: vec!["60+".to_string()],
        }],
        combine: nhs_region_combinations(),
        national_total: Some(NATIONAL_REGION.to_string()),
        window: Some(7),
        ..MetricConfig::new("cases_60_plus", "Cases >60", SourceKind::GovApi, cases_field)
    };

    let cases = MetricConfig {
        areas: region_areas.clone(),
        value_column: Some("cases".to_string()),
        label_filters: vec![LabelFilter {
            key: "age".to_string(),
            values: vec!["00_59".to_string(), "60+".to_string()],
        }],
        combine: nhs_region_combinations(),
        national_total: Some(NATIONAL_REGION.to_string()),
        window: Some(7),
        ..MetricConfig::new("cases", "Cases", SourceKind::GovApi, cases_field)
    };

    let deaths = MetricConfig {
        areas: region_areas,
        combine: nhs_region_combinations(),
        national_total: Some(NATIONAL_REGION.to_string()),
        drop_trailing_days: 3,
        window: Some(7),
        ..MetricConfig::new("deaths", "Deaths", SourceKind::GovApi, "newDeaths28DaysByDeathDate")
    };

    vec![zoe, admissions, inpatients, cases_over_60, cases, deaths]
}
