//! The data source seam and the HTTP client shared by the remote adapters.

use crate::table::RawTable;
use async_trait::async_trait;
use covchart_common::{CovChartError, MetricId, Result};
use covchart_config::{AreaQuery, MetricConfig, SourceKind, SourcesConfig};
use reqwest::Client;
use std::time::Duration;

/// What to fetch for one metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Metric identifier; names the value column of API responses.
    pub metric: MetricId,
    /// Published field or CSV column.
    pub field: String,
    /// API area queries.
    pub areas: Vec<AreaQuery>,
    /// Only return rows of this region.
    pub region: Option<String>,
}

impl FetchRequest {
    /// A request for a field with no area queries.
    pub fn new(metric: impl Into<MetricId>, field: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            field: field.into(),
            areas: Vec::new(),
            region: None,
        }
    }

    /// The request for a configured metric. The region filter is only pushed
    /// down when the builder does not need other regions to derive it.
    pub fn from_config(metric: &MetricConfig) -> Self {
        let derives_regions = metric.national_total.is_some() || !metric.combine.is_empty();
        Self {
            metric: metric.id.clone(),
            field: metric.field.clone(),
            areas: metric.areas.clone(),
            region: if derives_regions { None } else { metric.region.clone() },
        }
    }

    /// Restricts the request to one region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Adds an area query.
    #[must_use]
    pub fn with_area(mut self, area: AreaQuery) -> Self {
        self.areas.push(area);
        self
    }
}

/// A remote or in-memory provider of raw observation tables.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetches the raw table for a request.
    async fn fetch(&self, request: &FetchRequest) -> Result<RawTable>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// One adapter per source kind.
pub struct SourceSet {
    gov_api: Box<dyn DataSource>,
    zoe: Box<dyn DataSource>,
}

impl SourceSet {
    /// Pairs adapters with source kinds.
    pub fn new(gov_api: Box<dyn DataSource>, zoe: Box<dyn DataSource>) -> Self {
        Self { gov_api, zoe }
    }

    /// The remote adapters described by the configuration.
    pub fn from_config(config: &SourcesConfig) -> Result<Self> {
        let client = http_client(config)?;
        Ok(Self::new(
            Box::new(crate::gov_api::GovApiSource::new(client.clone(), &config.gov_api_url)?),
            Box::new(crate::zoe::ZoeSource::new(client, &config.zoe_url, config.zoe_lookback_days)),
        ))
    }

    /// The adapter serving a source kind.
    pub fn get(&self, kind: SourceKind) -> &dyn DataSource {
        match kind {
            SourceKind::GovApi => self.gov_api.as_ref(),
            SourceKind::Zoe => self.zoe.as_ref(),
        }
    }
}

/// Builds the HTTP client used by the remote adapters.
pub fn http_client(config: &SourcesConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| CovChartError::retrieval_with_source("Failed to create HTTP client", e))
}
