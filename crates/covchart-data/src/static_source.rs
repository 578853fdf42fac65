//! In-memory source serving a pre-built table.

use crate::source::{DataSource, FetchRequest};
use crate::table::RawTable;
use async_trait::async_trait;
use covchart_common::Result;
use tracing::debug;

/// Serves the same table for every request, honouring the region filter.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    table: RawTable,
}

impl StaticSource {
    /// Wraps a table.
    pub fn new(table: RawTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl DataSource for StaticSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<RawTable> {
        debug!("Serving {} rows for {}", self.table.len(), request.metric);
        Ok(match &request.region {
            Some(region) => self.table.clone().filter_region(region),
            None => self.table.clone(),
        })
    }

    fn name(&self) -> &str {
        "static"
    }
}
