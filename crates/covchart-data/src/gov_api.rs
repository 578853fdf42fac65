//! Client for the UK coronavirus dashboard API.
//!
//! Requests name the fields to return through a `structure` parameter and
//! restrict areas through `filters`. Responses are paged; a page carries a
//! `pagination.next` link until the last one, and an empty result is
//! signalled with HTTP 204.

use crate::source::{DataSource, FetchRequest};
use crate::table::{RawRow, RawTable};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use covchart_common::{format_day, CovChartError, Result};
use covchart_config::AreaQuery;
use reqwest::{header::LAST_MODIFIED, Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Adapter for the government statistics API.
#[derive(Debug, Clone)]
pub struct GovApiSource {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    data: Vec<Map<String, Value>>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    next: Option<String>,
}

/// One parsed response page.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    /// Rows of the page.
    pub table: RawTable,
    /// True when more pages follow.
    pub has_next: bool,
}

impl GovApiSource {
    /// Creates an adapter for the API at `base_url`.
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    /// The URL of one page of one area query.
    pub fn page_url(&self, request: &FetchRequest, area: &AreaQuery, page: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("filters", &filters(area, request.region.as_deref()))
            .append_pair("structure", &structure(request).to_string())
            .append_pair("page", &page.to_string());
        url
    }

    #[instrument(skip(self, request), fields(metric = %request.metric, area_type = %area.area_type))]
    async fn fetch_area(&self, request: &FetchRequest, area: &AreaQuery) -> Result<RawTable> {
        let mut table = RawTable::with_columns([request.metric.as_str()]);
        let mut last_modified = None;

        for page in 1.. {
            let url = self.page_url(request, area, page);
            debug!("Requesting {}", url);

            let response = self.client.get(url).send().await?;
            let status = response.status();
            if status == StatusCode::NO_CONTENT {
                debug!("No content on page {}", page);
                break;
            }
            if !status.is_success() {
                return Err(CovChartError::retrieval_with_status(
                    format!("API returned {status} for {}", request.metric),
                    status.as_u16(),
                ));
            }

            if last_modified.is_none() {
                last_modified = response
                    .headers()
                    .get(LAST_MODIFIED)
                    .and_then(|value| value.to_str().ok())
                    .and_then(parse_http_date);
            }

            let body = response.text().await?;
            let parsed = parse_page(&body)?;
            debug!("Page {} returned {} rows", page, parsed.table.len());
            table.extend(parsed.table.rows().iter().cloned());

            if !parsed.has_next {
                break;
            }
        }

        match last_modified {
            Some(date) => info!("got {} data to {}", request.metric, format_day(date)),
            None => info!("got {} data ({} rows)", request.metric, table.len()),
        }
        Ok(table)
    }
}

#[async_trait]
impl DataSource for GovApiSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<RawTable> {
        if request.areas.is_empty() {
            return Err(CovChartError::retrieval(format!(
                "no area query configured for {}",
                request.metric
            )));
        }

        let mut parts = Vec::with_capacity(request.areas.len());
        for area in &request.areas {
            parts.push(self.fetch_area(request, area).await?);
        }
        Ok(RawTable::concat_inner(parts))
    }

    fn name(&self) -> &str {
        "gov_api"
    }
}

/// The `filters` parameter of an area query.
pub fn filters(area: &AreaQuery, region: Option<&str>) -> String {
    let mut pairs = vec![format!("areaType={}", area.area_type)];
    if let Some(name) = area.area_name.as_deref().or(region) {
        pairs.push(format!("areaName={name}"));
    }
    pairs.join(";")
}

/// The `structure` parameter: the date, the area name and the metric field.
pub fn structure(request: &FetchRequest) -> Value {
    let mut structure = Map::new();
    structure.insert("date".into(), Value::from("date"));
    structure.insert("region".into(), Value::from("areaName"));
    structure.insert(request.metric.to_string(), Value::from(request.field.as_str()));
    Value::Object(structure)
}

fn parse_http_date(value: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|timestamp| timestamp.date_naive())
}

/// Parses one response body.
pub fn parse_page(body: &str) -> Result<ParsedPage> {
    let page: ApiPage = serde_json::from_str(body)
        .map_err(|e| CovChartError::retrieval_with_source("Malformed API response", e))?;

    let mut table = RawTable::new();
    for object in &page.data {
        table.extend(parse_object(object)?);
    }

    Ok(ParsedPage {
        table,
        has_next: page.pagination.is_some_and(|p| p.next.is_some()),
    })
}

/// Turns one data object into rows, exploding a nested breakdown array.
fn parse_object(object: &Map<String, Value>) -> Result<Vec<RawRow>> {
    let date = object
        .get("date")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .ok_or_else(|| CovChartError::retrieval("API row without a valid date"))?;
    let region = object
        .get("region")
        .and_then(Value::as_str)
        .ok_or_else(|| CovChartError::retrieval("API row without a region"))?;

    let mut base = RawRow::new(date, region);
    let mut breakdown: Option<(&str, &Vec<Value>)> = None;

    for (key, value) in object {
        if key == "date" || key == "region" {
            continue;
        }
        match value {
            Value::Array(items) if breakdown.is_none() => breakdown = Some((key.as_str(), items)),
            Value::Array(_) => warn!("Ignoring second breakdown field '{}'", key),
            other => insert_cell(&mut base, key, other),
        }
    }

    let Some((key, items)) = breakdown else {
        return Ok(vec![base]);
    };

    items
        .iter()
        .map(|item| {
            let fields = item.as_object().ok_or_else(|| {
                CovChartError::retrieval(format!("breakdown '{key}' holds a non-object element"))
            })?;
            let mut row = base.clone();
            for (field, value) in fields {
                insert_cell(&mut row, field, value);
            }
            Ok(row)
        })
        .collect()
}

fn insert_cell(row: &mut RawRow, key: &str, value: &Value) {
    match value {
        Value::Number(n) => {
            row.values.insert(key.to_string(), n.as_f64());
        }
        Value::Null => {
            row.values.insert(key.to_string(), None);
        }
        Value::String(s) => {
            row.labels.insert(key.to_string(), s.clone());
        }
        Value::Bool(b) => {
            row.labels.insert(key.to_string(), b.to_string());
        }
        Value::Array(_) | Value::Object(_) => debug!("Skipping nested field '{}'", key),
    }
}
