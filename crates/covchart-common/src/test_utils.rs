//! Test utilities and shared test helpers for covchart.
//!
//! Fixtures here are shared by the unit and integration tests of every crate
//! in the workspace; enable them from another crate with the `testing`
//! feature.

use chrono::{Duration, NaiveDate};
use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize test logging once per test run.
static INIT: Once = Once::new();

/// Initialize logging for tests with a sensible default configuration.
/// This function is safe to call multiple times and will only initialize once.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let _ = fmt().with_test_writer().with_env_filter(filter).try_init();
    });
}

/// Test fixture for creating a date.
pub fn mock_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

/// Consecutive days starting at `start`.
pub fn date_range(start: NaiveDate, days: usize) -> Vec<NaiveDate> {
    (0..days).map(|i| start + Duration::days(i as i64)).collect()
}

/// Create a temporary directory for tests that automatically cleans up.
#[cfg(feature = "tempfile")]
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Assert that two floating point numbers are approximately equal within a tolerance.
pub fn assert_approx_eq(left: f64, right: f64, tolerance: f64) {
    let diff = (left - right).abs();
    assert!(
        diff <= tolerance,
        "assertion failed: `{left}` is not approximately equal to `{right}` (tolerance: {tolerance}, diff: {diff})"
    );
}

/// Sample payloads shaped like the public sources' responses.
pub mod source_fixtures {
    /// One page of the government API carrying deaths for two regions over two days.
    pub fn gov_api_deaths_page() -> &'static str {
        r#"{
  "length": 4,
  "maxPageLimit": 2500,
  "data": [
    {"date": "2020-11-02", "region": "East Midlands", "deaths": 12},
    {"date": "2020-11-02", "region": "West Midlands", "deaths": 20},
    {"date": "2020-11-01", "region": "East Midlands", "deaths": 9},
    {"date": "2020-11-01", "region": "West Midlands", "deaths": null}
  ],
  "pagination": {"current": "/v1/data?page=1", "next": null, "previous": null, "first": "/v1/data?page=1", "last": "/v1/data?page=1"}
}"#
    }

    /// One page of the government API with an age demographic breakdown per row.
    pub fn gov_api_cases_by_age_page() -> &'static str {
        r#"{
  "data": [
    {"date": "2020-11-01", "region": "London", "metric": [
      {"age": "00_59", "cases": 800, "rollingSum": 5000, "rollingRate": 120.5},
      {"age": "60+", "cases": 90, "rollingSum": 600, "rollingRate": 40.1}
    ]},
    {"date": "2020-11-01", "region": "North East", "metric": [
      {"age": "00_59", "cases": 300, "rollingSum": 2000, "rollingRate": 110.0},
      {"age": "60+", "cases": 45, "rollingSum": 310, "rollingRate": 50.2}
    ]}
  ],
  "pagination": {"current": "/v1/data?page=1", "next": "/v1/data?page=2"}
}"#
    }

    /// A small ZOE incidence CSV with day-first dates.
    pub fn zoe_incidence_csv() -> &'static str {
        "date,region,covid_in_pop,covid_in_pop_lower,respondents\n\
         01/11/2020,London,41000,38000,51234\n\
         01/11/2020,North East,9000,8100,10233\n\
         02/11/2020,London,42500,39100,50980\n\
         02/11/2020,North East,9100,8300,10011\n"
    }
}

/// Property-based testing utilities using proptest.
#[cfg(feature = "proptest")]
pub mod property_testing {
    use proptest::prelude::*;

    /// Strategy for daily counts, including missing days.
    pub fn daily_counts_strategy(max_len: usize) -> impl Strategy<Value = Vec<Option<f64>>> {
        prop::collection::vec(prop::option::weighted(0.9, 0.0f64..50_000.0), 0..max_len)
    }

    /// Strategy for fully populated daily counts.
    pub fn complete_counts_strategy(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.0f64..50_000.0, 1..max_len)
    }
}
