//! Client for the daily ZOE incidence CSV files.

use crate::source::{DataSource, FetchRequest};
use crate::table::{RawRow, RawTable};
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use covchart_common::{format_day, parse_flexible_date, CovChartError, Result};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};

/// Adapter for the ZOE incidence files, published a few days late under a
/// dated file name.
#[derive(Debug, Clone)]
pub struct ZoeSource {
    client: Client,
    base_url: String,
    lookback_days: u32,
    today: Option<NaiveDate>,
}

impl ZoeSource {
    /// Creates an adapter looking back at most `lookback_days` from today.
    pub fn new(client: Client, base_url: &str, lookback_days: u32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            lookback_days,
            today: None,
        }
    }

    /// Pins the day the search starts from.
    #[must_use]
    pub fn starting_from(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// URL of the file published for `date`.
    pub fn file_url(&self, date: NaiveDate) -> String {
        format!("{}/incidence_{}.csv", self.base_url, date.format("%Y%m%d"))
    }

    /// Dates tried, newest first.
    pub fn candidate_dates(&self) -> Vec<NaiveDate> {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        (0..i64::from(self.lookback_days))
            .map(|back| today - Duration::days(back))
            .collect()
    }

    /// Downloads the newest published file.
    #[instrument(skip(self))]
    async fn download_latest(&self) -> Result<(NaiveDate, String)> {
        for date in self.candidate_dates() {
            let url = self.file_url(date);
            debug!("Requesting {}", url);

            let response = self.client.get(&url).send().await?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                info!("no Zoe data for {}", format_day(date));
                continue;
            }
            if !status.is_success() {
                return Err(CovChartError::retrieval_with_status(
                    format!("Zoe file {url} returned {status}"),
                    status.as_u16(),
                ));
            }
            return Ok((date, response.text().await?));
        }

        Err(CovChartError::retrieval(format!(
            "can't get Zoe data for the last {} days",
            self.lookback_days
        )))
    }
}

#[async_trait]
impl DataSource for ZoeSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<RawTable> {
        let (date, body) = self.download_latest().await?;
        let table = parse_incidence_csv(&body)?;
        info!("got Zoe data to {} ({} rows)", format_day(date), table.len());

        Ok(match &request.region {
            Some(region) => table.filter_region(region),
            None => table,
        })
    }

    fn name(&self) -> &str {
        "zoe"
    }
}

/// Parses an incidence file. `date` and `region` columns are required;
/// numeric and blank cells become values, anything else a label.
pub fn parse_incidence_csv(body: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());
    let headers = reader.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CovChartError::retrieval(format!("Zoe data has no '{name}' column")))
    };
    let date_idx = position("date")?;
    let region_idx = position("region")?;

    let mut table = RawTable::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let raw_date = record.get(date_idx).unwrap_or_default();
        let date = parse_flexible_date(raw_date).ok_or_else(|| {
            CovChartError::retrieval(format!("bad date '{raw_date}' on data line {}", line + 1))
        })?;
        let mut row = RawRow::new(date, record.get(region_idx).unwrap_or_default());

        for (idx, (header, cell)) in headers.iter().zip(record.iter()).enumerate() {
            if idx == date_idx || idx == region_idx || header.is_empty() {
                continue;
            }
            if cell.is_empty() {
                row.values.insert(header.to_string(), None);
            } else if let Ok(value) = cell.parse::<f64>() {
                row.values.insert(header.to_string(), Some(value));
            } else {
                row.labels.insert(header.to_string(), cell.to_string());
            }
        }
        table.push(row);
    }
    Ok(table)
}
