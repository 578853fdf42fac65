//! Raw observation tables and derived metric tables.

use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

/// One published observation: a region on a date, with its value and label
/// columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Observation date.
    pub date: NaiveDate,
    /// Region (area) name.
    pub region: String,
    /// Categorical columns, e.g. `age`.
    pub labels: BTreeMap<String, String>,
    /// Numeric columns; `None` when published as null or blank.
    pub values: BTreeMap<String, Option<f64>>,
}

impl RawRow {
    /// Creates a row without any columns.
    pub fn new(date: NaiveDate, region: impl Into<String>) -> Self {
        Self {
            date,
            region: region.into(),
            labels: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }

    /// Adds a numeric column.
    #[must_use]
    pub fn with_value(mut self, column: impl Into<String>, value: impl Into<Option<f64>>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Adds a label column.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// The value of a column, `None` when absent or missing.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }
}

/// A table of observations keyed by (region, date), as fetched from a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: BTreeSet<String>,
    label_keys: BTreeSet<String>,
    rows: Vec<RawRow>,
}

impl RawTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table that already declares some value columns, so a
    /// fetch returning no rows still reports the columns it asked for.
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Builds a table from rows.
    pub fn from_rows(rows: impl IntoIterator<Item = RawRow>) -> Self {
        let mut table = Self::new();
        table.extend(rows);
        table
    }

    /// Appends a row, registering its columns.
    pub fn push(&mut self, row: RawRow) {
        self.columns.extend(row.values.keys().cloned());
        self.label_keys.extend(row.labels.keys().cloned());
        self.rows.push(row);
    }

    /// Appends rows.
    pub fn extend(&mut self, rows: impl IntoIterator<Item = RawRow>) {
        for row in rows {
            self.push(row);
        }
    }

    /// Concatenates tables keeping only the value columns common to all of
    /// them.
    pub fn concat_inner(parts: Vec<RawTable>) -> RawTable {
        let mut parts = parts.into_iter();
        let Some(first) = parts.next() else {
            return RawTable::new();
        };

        let mut out = first;
        for part in parts {
            out.columns = out.columns.intersection(&part.columns).cloned().collect();
            out.label_keys.extend(part.label_keys);
            out.rows.extend(part.rows);
        }

        let keep = out.columns.clone();
        for row in &mut out.rows {
            row.values.retain(|column, _| keep.contains(column));
        }
        out
    }

    /// Keeps only the rows of one region.
    #[must_use]
    pub fn filter_region(mut self, region: &str) -> Self {
        self.rows.retain(|row| row.region == region);
        self
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when the table has the value column.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// True when the table has the label column.
    pub fn has_label(&self, key: &str) -> bool {
        self.label_keys.contains(key)
    }

    /// Distinct regions, sorted.
    pub fn regions(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|row| row.region.as_str()).collect()
    }

    /// Earliest and latest observation dates.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(|row| row.date).min()?;
        let max = self.rows.iter().map(|row| row.date).max()?;
        Some((min, max))
    }
}

/// Every day from `start` to `end` inclusive.
pub fn daily_index(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let days = (end - start).num_days();
    if days < 0 {
        return Vec::new();
    }
    (0..=days).map(|offset| start + Duration::days(offset)).collect()
}

/// A wide table of one metric: a contiguous daily date index and one column
/// per region (or other series key).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTable {
    name: String,
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl MetricTable {
    /// Creates a table with no rows and no columns.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a table over the daily index starting at `start` and spanning
    /// `len` days, with all columns missing.
    pub fn with_index(name: impl Into<String>, start: NaiveDate, len: usize) -> Self {
        let dates = (0..len).map(|i| start + Duration::days(i as i64)).collect();
        Self {
            name: name.into(),
            dates,
            columns: BTreeMap::new(),
        }
    }

    /// Adds or replaces a column. Shorter columns are padded with missing
    /// values, longer ones truncated, so every column matches the index.
    pub fn insert_column(&mut self, key: impl Into<String>, mut values: Vec<Option<f64>>) {
        values.resize(self.dates.len(), None);
        self.columns.insert(key.into(), values);
    }

    /// Metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Date index.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of rows (dates).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Column keys, sorted.
    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// True when the table has the column.
    pub fn has_region(&self, region: &str) -> bool {
        self.columns.contains_key(region)
    }

    /// A column's values aligned with [`Self::dates`].
    pub fn column(&self, region: &str) -> Option<&[Option<f64>]> {
        self.columns.get(region).map(Vec::as_slice)
    }

    /// The value of a column on a date.
    pub fn value(&self, region: &str, date: NaiveDate) -> Option<f64> {
        let idx = self.position(date)?;
        self.columns.get(region)?.get(idx).copied().flatten()
    }

    /// Present points of a column as (date, value) pairs.
    pub fn series(&self, region: &str) -> Vec<(NaiveDate, f64)> {
        self.column(region)
            .map(|values| {
                self.dates
                    .iter()
                    .zip(values)
                    .filter_map(|(date, value)| value.map(|v| (*date, v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn position(&self, date: NaiveDate) -> Option<usize> {
        let first = *self.dates.first()?;
        let idx = usize::try_from((date - first).num_days()).ok()?;
        (idx < self.dates.len()).then_some(idx)
    }

    /// Removes the most recent `days` rows.
    #[must_use]
    pub fn drop_last(mut self, days: usize) -> Self {
        let keep = self.dates.len().saturating_sub(days);
        self.dates.truncate(keep);
        for values in self.columns.values_mut() {
            values.truncate(keep);
        }
        self
    }

    /// Drops rows dated before `start`.
    #[must_use]
    pub fn since(mut self, start: NaiveDate) -> Self {
        let skip = self.dates.iter().take_while(|date| **date < start).count();
        self.dates.drain(..skip);
        for values in self.columns.values_mut() {
            values.drain(..skip);
        }
        self
    }

    /// Re-indexes onto a wider contiguous daily index; new rows are missing.
    #[must_use]
    pub fn reindex(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let dates = daily_index(start, end);
        let mut out = Self {
            name: self.name.clone(),
            dates,
            columns: BTreeMap::new(),
        };
        for (key, values) in &self.columns {
            let aligned = out
                .dates
                .iter()
                .map(|date| self.position(*date).and_then(|idx| values[idx]))
                .collect();
            out.columns.insert(key.clone(), aligned);
        }
        out
    }

    /// Largest present value across all columns.
    pub fn max_value(&self) -> Option<f64> {
        self.columns
            .values()
            .flatten()
            .filter_map(|v| *v)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }

    pub(crate) fn columns_mut(&mut self) -> impl Iterator<Item = (&String, &mut Vec<Option<f64>>)> {
        self.columns.iter_mut()
    }
}

/// Several metric tables aligned on one daily index, keyed by legend label
/// in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricFrame {
    dates: Vec<NaiveDate>,
    tables: Vec<(String, MetricTable)>,
}

impl MetricFrame {
    /// Outer-joins the tables on the union of their date ranges.
    pub fn aggregate(tables: Vec<(String, MetricTable)>) -> Self {
        let start = tables.iter().filter_map(|(_, t)| t.dates().first().copied()).min();
        let end = tables.iter().filter_map(|(_, t)| t.dates().last().copied()).max();

        let (Some(start), Some(end)) = (start, end) else {
            return Self {
                dates: Vec::new(),
                tables,
            };
        };

        let tables = tables
            .into_iter()
            .map(|(label, table)| (label, table.reindex(start, end)))
            .collect();
        Self {
            dates: daily_index(start, end),
            tables,
        }
    }

    /// Shared date index.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Legend labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|(label, _)| label.as_str())
    }

    /// The aligned tables.
    pub fn tables(&self) -> &[(String, MetricTable)] {
        &self.tables
    }

    /// Every metric's column for one region; metrics lacking the region are
    /// skipped.
    pub fn region(&self, region: &str) -> Vec<(&str, &[Option<f64>])> {
        self.tables
            .iter()
            .filter_map(|(label, table)| table.column(region).map(|values| (label.as_str(), values)))
            .collect()
    }

    /// Applies a transformation to every table, keeping the shared index.
    pub fn map_tables<F>(&self, mut f: F) -> crate::Result<Self>
    where
        F: FnMut(&MetricTable) -> crate::Result<MetricTable>,
    {
        let tables = self
            .tables
            .iter()
            .map(|(label, table)| Ok((label.clone(), f(table)?)))
            .collect::<crate::Result<Vec<_>>>()?;
        let dates = tables
            .first()
            .map(|(_, table): &(String, MetricTable)| table.dates().to_vec())
            .unwrap_or_default();
        Ok(Self { dates, tables })
    }
}
