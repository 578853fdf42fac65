//! Reshapes raw observation tables into per-metric tables.

use crate::table::{daily_index, MetricTable, RawTable};
use chrono::NaiveDate;
use covchart_common::{CovChartError, Result};
use covchart_config::{LabelFilter, MetricConfig, RegionCombination, WindowAlign};
use std::collections::{BTreeMap, BTreeSet};

/// Reshaping options for one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    /// Name given to the resulting table.
    pub name: String,
    /// Raw column holding the values.
    pub value_column: String,
    /// Rows must match every filter.
    pub label_filters: Vec<LabelFilter>,
    /// Keep only this region.
    pub region: Option<String>,
    /// Adds a region summing every source region.
    pub national_total: Option<String>,
    /// Adds synthetic regions.
    pub combine: Vec<RegionCombination>,
    /// Removes regions.
    pub drop_regions: Vec<String>,
    /// Removes the most recent days.
    pub drop_trailing_days: usize,
    /// Rolling mean window in days.
    pub window: Option<usize>,
    /// Rolling window alignment.
    pub align: WindowAlign,
    /// Drops earlier rows.
    pub start: Option<NaiveDate>,
}

impl MetricSpec {
    /// A spec reading one column with no reshaping options.
    pub fn new(name: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_column: value_column.into(),
            label_filters: Vec::new(),
            region: None,
            national_total: None,
            combine: Vec::new(),
            drop_regions: Vec::new(),
            drop_trailing_days: 0,
            window: None,
            align: WindowAlign::Trailing,
            start: None,
        }
    }

    /// The spec of a configured metric.
    pub fn from_config(metric: &MetricConfig, start: Option<NaiveDate>) -> Self {
        Self {
            name: metric.id.to_string(),
            value_column: metric.value_column().to_string(),
            label_filters: metric.label_filters.clone(),
            region: metric.region.clone(),
            national_total: metric.national_total.clone(),
            combine: metric.combine.clone(),
            drop_regions: metric.drop_regions.clone(),
            drop_trailing_days: metric.drop_trailing_days,
            window: metric.window,
            align: metric.align,
            start,
        }
    }

    /// Sets the rolling window.
    #[must_use]
    pub fn with_window(mut self, window: usize, align: WindowAlign) -> Self {
        self.window = Some(window);
        self.align = align;
        self
    }

    /// Sets the start date.
    #[must_use]
    pub fn with_start(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    /// The same spec without rolling window or start date, giving the full
    /// daily series other views are derived from.
    #[must_use]
    pub fn raw(&self) -> Self {
        Self {
            window: None,
            start: None,
            ..self.clone()
        }
    }
}

/// Turns raw tables into metric tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataframeBuilder;

impl DataframeBuilder {
    /// Creates a builder.
    pub fn new() -> Self {
        Self
    }

    /// Builds the metric table described by `spec`.
    pub fn build(&self, raw: &RawTable, spec: &MetricSpec) -> Result<MetricTable> {
        if !raw.has_column(&spec.value_column) {
            return Err(CovChartError::missing_column(&spec.value_column));
        }
        if spec.window == Some(0) {
            return Err(CovChartError::shape("rolling window must be at least one day"));
        }
        for filter in &spec.label_filters {
            if !raw.has_label(&filter.key) {
                return Err(CovChartError::missing_column(&filter.key));
            }
        }

        let mut grouped = group_by_region(raw, spec);

        if let Some(label) = &spec.national_total {
            let total = national_total(&grouped);
            grouped.insert(label.clone(), total);
        }

        for combination in &spec.combine {
            let combined = combine_regions(&grouped, &combination.regions);
            grouped.insert(combination.label.clone(), combined);
        }

        for region in &spec.drop_regions {
            grouped.remove(region);
        }

        if let Some(region) = &spec.region {
            if !grouped.contains_key(region) {
                return Err(CovChartError::Shape {
                    message: format!("region '{region}' is absent from {}", spec.name),
                    column: Some(region.clone()),
                });
            }
            grouped.retain(|key, _| key == region);
        }

        let mut table = pivot(&spec.name, grouped).drop_last(spec.drop_trailing_days);

        if let Some(window) = spec.window {
            table = table.rolling_mean(window, spec.align)?;
        }
        if let Some(start) = spec.start {
            table = table.since(start);
        }
        Ok(table)
    }
}

type Grouped = BTreeMap<String, BTreeMap<NaiveDate, Option<f64>>>;

/// Sums the filtered rows sharing a (region, date), skipping missing values.
fn group_by_region(raw: &RawTable, spec: &MetricSpec) -> Grouped {
    let mut grouped = Grouped::new();
    let rows = raw.rows().iter().filter(|row| {
        spec.label_filters.iter().all(|filter| {
            row.labels
                .get(&filter.key)
                .is_some_and(|label| filter.values.contains(label))
        })
    });

    for row in rows {
        let cell = grouped
            .entry(row.region.clone())
            .or_default()
            .entry(row.date)
            .or_insert(None);
        if let Some(value) = row.value(&spec.value_column) {
            *cell = Some(cell.unwrap_or(0.0) + value);
        }
    }
    grouped
}

fn national_total(grouped: &Grouped) -> BTreeMap<NaiveDate, Option<f64>> {
    let mut total: BTreeMap<NaiveDate, Option<f64>> = BTreeMap::new();
    for (date, value) in grouped.values().flatten() {
        let cell = total.entry(*date).or_insert(None);
        if let Some(value) = value {
            *cell = Some(cell.unwrap_or(0.0) + value);
        }
    }
    total
}

/// Per-date sum of the named regions, missing where any input is missing.
fn combine_regions(grouped: &Grouped, regions: &[String]) -> BTreeMap<NaiveDate, Option<f64>> {
    let inputs: Vec<_> = regions.iter().map(|region| grouped.get(region)).collect();
    let dates: BTreeSet<NaiveDate> = inputs.iter().flatten().flat_map(|series| series.keys().copied()).collect();

    dates
        .into_iter()
        .map(|date| {
            let sum = inputs.iter().try_fold(0.0, |acc, series| {
                series.and_then(|s| s.get(&date).copied().flatten()).map(|v| acc + v)
            });
            (date, sum)
        })
        .collect()
}

/// Widens grouped data onto a contiguous daily index.
fn pivot(name: &str, grouped: Grouped) -> MetricTable {
    let first = grouped.values().filter_map(|s| s.keys().next().copied()).min();
    let last = grouped.values().filter_map(|s| s.keys().next_back().copied()).max();
    let (Some(first), Some(last)) = (first, last) else {
        return MetricTable::empty(name);
    };

    let dates = daily_index(first, last);
    let mut table = MetricTable::with_index(name, first, dates.len());
    for (region, series) in grouped {
        let values = dates.iter().map(|date| series.get(date).copied().flatten()).collect();
        table.insert_column(region, values);
    }
    table
}

/// Rolling mean over `window` values. A point is missing unless its whole
/// window lies inside the series and every value in it is present.
pub fn rolling_mean(values: &[Option<f64>], window: usize, align: WindowAlign) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let lead = match align {
        WindowAlign::Trailing => window - 1,
        WindowAlign::Centered => window / 2,
    };

    (0..values.len())
        .map(|i| {
            let start = i.checked_sub(lead)?;
            let slice = values.get(start..start + window)?;
            let sum = slice.iter().try_fold(0.0, |acc, v| v.map(|v| acc + v))?;
            Some(sum / window as f64)
        })
        .collect()
}

impl MetricTable {
    /// Applies a rolling mean to every column.
    pub fn rolling_mean(&self, window: usize, align: WindowAlign) -> Result<MetricTable> {
        if window == 0 {
            return Err(CovChartError::shape("rolling window must be at least one day"));
        }
        let mut out = self.clone();
        for (_, values) in out.columns_mut() {
            *values = rolling_mean(values, window, align);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RawRow;
    use chrono::Duration;
    use covchart_common::test_utils::{assert_approx_eq, property_testing::*};
    use proptest::prelude::*;

    fn day(d: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 11, 1).unwrap() + Duration::days(d)
    }

    fn deaths_table() -> RawTable {
        let mut table = RawTable::new();
        for d in 0..5 {
            let offset = d as f64;
            table.push(RawRow::new(day(d), "East Midlands").with_value("deaths", 10.0 + offset));
            table.push(RawRow::new(day(d), "West Midlands").with_value("deaths", 20.0 + offset));
            table.push(RawRow::new(day(d), "London").with_value("deaths", 30.0 + offset));
        }
        table
    }

    #[test]
    fn test_missing_value_column_is_shape_error() {
        let err = DataframeBuilder::new()
            .build(&deaths_table(), &MetricSpec::new("cases", "cases"))
            .unwrap_err();
        assert!(err.is_shape());
        assert!(err.to_string().contains("cases"));
    }

    #[test]
    fn test_missing_label_is_shape_error() {
        let mut spec = MetricSpec::new("deaths", "deaths");
        spec.label_filters.push(LabelFilter {
            key: "age".into(),
            values: vec!["60+".into()],
        });
        let err = DataframeBuilder::new().build(&deaths_table(), &spec).unwrap_err();
        assert!(err.is_shape());
    }

    #[test]
    fn test_national_total_counted_before_combination() {
        let mut spec = MetricSpec::new("deaths", "deaths");
        spec.national_total = Some("England".into());
        spec.combine = vec![RegionCombination::new("Midlands", &["East Midlands", "West Midlands"])];
        spec.drop_regions = vec!["East Midlands".into(), "West Midlands".into()];

        let table = DataframeBuilder::new().build(&deaths_table(), &spec).unwrap();

        assert_eq!(table.regions().collect::<Vec<_>>(), ["England", "London", "Midlands"]);
        assert_eq!(table.value("England", day(0)), Some(60.0));
        assert_eq!(table.value("Midlands", day(0)), Some(30.0));
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_combination_missing_when_input_missing() {
        let mut raw = deaths_table();
        raw.push(RawRow::new(day(5), "East Midlands").with_value("deaths", None::<f64>));
        raw.push(RawRow::new(day(5), "West Midlands").with_value("deaths", 4.0));

        let mut spec = MetricSpec::new("deaths", "deaths");
        spec.combine = vec![RegionCombination::new("Midlands", &["East Midlands", "West Midlands"])];
        let table = DataframeBuilder::new().build(&raw, &spec).unwrap();

        assert_eq!(table.value("Midlands", day(5)), None);
        assert_eq!(table.value("West Midlands", day(5)), Some(4.0));
    }

    #[test]
    fn test_label_filter_and_group_sum() {
        let raw = RawTable::from_rows([
            RawRow::new(day(0), "London").with_label("age", "00_59").with_value("cases", 800.0),
            RawRow::new(day(0), "London").with_label("age", "60+").with_value("cases", 90.0),
            RawRow::new(day(0), "London").with_label("age", "unassigned").with_value("cases", 5.0),
        ]);

        let mut spec = MetricSpec::new("cases", "cases");
        spec.label_filters.push(LabelFilter {
            key: "age".into(),
            values: vec!["00_59".into(), "60+".into()],
        });
        let table = DataframeBuilder::new().build(&raw, &spec).unwrap();
        assert_eq!(table.value("London", day(0)), Some(890.0));
    }

    #[test]
    fn test_group_sum_skips_null_bands() {
        let raw = RawTable::from_rows([
            RawRow::new(day(0), "London").with_label("age", "00_59").with_value("cases", 800.0),
            RawRow::new(day(0), "London").with_label("age", "60+").with_value("cases", None::<f64>),
            RawRow::new(day(1), "London").with_label("age", "00_59").with_value("cases", None::<f64>),
            RawRow::new(day(1), "London").with_label("age", "60+").with_value("cases", None::<f64>),
        ]);

        let table = DataframeBuilder::new().build(&raw, &MetricSpec::new("cases", "cases")).unwrap();
        assert_eq!(table.value("London", day(0)), Some(800.0));
        assert_eq!(table.value("London", day(1)), None);
    }

    #[test]
    fn test_gaps_are_resampled_daily() {
        let raw = RawTable::from_rows([
            RawRow::new(day(0), "London").with_value("cases", 1.0),
            RawRow::new(day(3), "London").with_value("cases", 4.0),
        ]);
        let table = DataframeBuilder::new().build(&raw, &MetricSpec::new("cases", "cases")).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.column("London"), Some(&[Some(1.0), None, None, Some(4.0)][..]));
    }

    #[test]
    fn test_region_filter_and_trailing_days() {
        let mut spec = MetricSpec::new("deaths", "deaths");
        spec.region = Some("London".into());
        spec.drop_trailing_days = 2;
        let table = DataframeBuilder::new().build(&deaths_table(), &spec).unwrap();

        assert_eq!(table.regions().collect::<Vec<_>>(), ["London"]);
        assert_eq!(table.dates().last(), Some(&day(2)));

        spec.region = Some("Wales".into());
        assert!(DataframeBuilder::new().build(&deaths_table(), &spec).unwrap_err().is_shape());
    }

    #[test]
    fn test_start_applied_after_rolling() {
        let spec = MetricSpec::new("deaths", "deaths")
            .with_window(3, WindowAlign::Trailing)
            .with_start(day(2));
        let table = DataframeBuilder::new().build(&deaths_table(), &spec).unwrap();

        assert_eq!(table.dates().first(), Some(&day(2)));
        assert_eq!(table.value("London", day(2)), Some(31.0));
    }

    #[test]
    fn test_zero_window_is_shape_error() {
        let spec = MetricSpec::new("deaths", "deaths").with_window(0, WindowAlign::Trailing);
        assert!(DataframeBuilder::new().build(&deaths_table(), &spec).unwrap_err().is_shape());
    }

    #[test]
    fn test_empty_table_with_declared_column() {
        let raw = RawTable::with_columns(["cases"]);
        let table = DataframeBuilder::new().build(&raw, &MetricSpec::new("cases", "cases")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_centered_window() {
        let values: Vec<Option<f64>> = (1..=7).map(|v| Some(f64::from(v))).collect();
        let out = rolling_mean(&values, 3, WindowAlign::Centered);
        assert_eq!(out[0], None);
        assert_eq!(out[1], Some(2.0));
        assert_eq!(out[5], Some(6.0));
        assert_eq!(out[6], None);
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut spec = MetricSpec::new("deaths", "deaths").with_window(2, WindowAlign::Trailing);
        spec.national_total = Some("England".into());
        let builder = DataframeBuilder::new();
        let raw = deaths_table();
        assert_eq!(builder.build(&raw, &spec).unwrap(), builder.build(&raw, &spec).unwrap());
    }

    proptest! {
        #[test]
        fn prop_trailing_mean_matches_arithmetic_mean(
            values in complete_counts_strategy(60),
            window in 1usize..15,
        ) {
            let series: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
            let out = rolling_mean(&series, window, WindowAlign::Trailing);

            prop_assert_eq!(out.len(), values.len());
            for (i, mean) in out.iter().enumerate() {
                if i + 1 < window {
                    prop_assert!(mean.is_none());
                } else {
                    let expected: f64 = values[i + 1 - window..=i].iter().sum::<f64>() / window as f64;
                    let actual = mean.unwrap();
                    assert_approx_eq(actual, expected, 1e-6 * expected.abs().max(1.0));
                }
            }
        }

        #[test]
        fn prop_missing_inputs_never_averaged(values in daily_counts_strategy(40), window in 1usize..8) {
            let out = rolling_mean(&values, window, WindowAlign::Trailing);
            for (i, mean) in out.iter().enumerate() {
                if mean.is_some() {
                    prop_assert!(values[i + 1 - window..=i].iter().all(Option::is_some));
                }
            }
        }
    }
}
