//! Fetch, reshape and chart every configured metric.

use crate::error::{PipelineError, PipelineResult};
use covchart_common::CovChartError;
use covchart_config::{Config, MetricConfig, WindowAlign};
use covchart_data::{DataframeBuilder, FetchRequest, MetricFrame, MetricSpec, MetricTable, SourceSet};
use covchart_graphs::ChartGenerator;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

/// Tables derived from one fetched metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricViews {
    /// Legend label.
    pub label: String,
    /// Daily values from the start date.
    pub raw: MetricTable,
    /// The metric's own rolling average, when it has a window.
    pub average: Option<MetricTable>,
    /// Rolling average used by the key-data and dashboard charts.
    pub overlay: MetricTable,
}

/// What a run wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Written images, in order.
    pub images: Vec<PathBuf>,
}

/// One batch run over the configured metrics.
pub struct Pipeline {
    config: Config,
    sources: SourceSet,
    builder: DataframeBuilder,
    generator: ChartGenerator,
}

impl Pipeline {
    /// A pipeline over explicit sources.
    pub fn new(config: Config, sources: SourceSet) -> Self {
        let generator = ChartGenerator::from_config(&config);
        Self {
            config,
            sources,
            builder: DataframeBuilder::new(),
            generator,
        }
    }

    /// A pipeline over the remote sources named in the configuration.
    pub fn from_config(config: Config) -> PipelineResult<Self> {
        let sources = SourceSet::from_config(&config.sources).map_err(PipelineError::Setup)?;
        Ok(Self::new(config, sources))
    }

    /// Replace the chart generator.
    #[must_use]
    pub fn with_generator(mut self, generator: ChartGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Runs every stage to completion; the first failure aborts the run.
    pub async fn run(&self) -> PipelineResult<RunSummary> {
        self.generator.ensure_output_dir().map_err(PipelineError::Output)?;
        let mut summary = RunSummary::default();
        let mut views = Vec::with_capacity(self.config.metrics.len());

        for metric in &self.config.metrics {
            let view = self.load_metric(metric).await?;
            let path = self
                .generator
                .metric_chart(&view.label, &view.raw, view.average.as_ref(), metric.region.as_deref())
                .map_err(|source| PipelineError::Chart {
                    chart: metric.id.to_string(),
                    source,
                })?;
            summary.images.push(path);
            views.push(view);
        }

        if self.config.charts.key_data || self.config.charts.dashboard {
            summary.images.extend(self.overlay_charts(&views)?);
        }

        info!(
            "Wrote {} images to {}",
            summary.images.len(),
            self.generator.output_dir().display()
        );
        Ok(summary)
    }

    /// Fetches one metric and derives its views.
    #[instrument(skip(self, metric), fields(metric = %metric.id))]
    pub async fn load_metric(&self, metric: &MetricConfig) -> PipelineResult<MetricViews> {
        let source = self.sources.get(metric.source);
        debug!("Fetching through {}", source.name());

        let raw = source
            .fetch(&FetchRequest::from_config(metric))
            .await
            .map_err(|source| PipelineError::Fetch {
                metric: metric.id.to_string(),
                source,
            })?;

        let shape_error = |source: CovChartError| PipelineError::Shape {
            metric: metric.id.to_string(),
            source,
        };
        let spec = MetricSpec::from_config(metric, self.config.pipeline.start_date);
        let base = self.builder.build(&raw, &spec.raw()).map_err(shape_error)?;

        let average = spec
            .window
            .map(|window| base.rolling_mean(window, spec.align))
            .transpose()
            .map_err(shape_error)?;
        let overlay = base
            .rolling_mean(self.config.pipeline.overlay_window, WindowAlign::Trailing)
            .map_err(shape_error)?;

        let since = |table: MetricTable| match spec.start {
            Some(start) => table.since(start),
            None => table,
        };
        Ok(MetricViews {
            label: metric.label.clone(),
            raw: since(base),
            average: average.map(since),
            overlay: since(overlay),
        })
    }

    fn overlay_charts(&self, views: &[MetricViews]) -> PipelineResult<Vec<PathBuf>> {
        let raw = MetricFrame::aggregate(views.iter().map(|v| (v.label.clone(), v.raw.clone())).collect());
        let average =
            MetricFrame::aggregate(views.iter().map(|v| (v.label.clone(), v.overlay.clone())).collect());
        let chart_error = |chart: &str| {
            let chart = chart.to_string();
            move |source: CovChartError| PipelineError::Chart { chart, source }
        };

        let mut images = Vec::new();
        if self.config.charts.key_data {
            for region in &self.config.pipeline.regions {
                if raw.region(region).is_empty() {
                    debug!("No data for {}, skipping its key-data chart", region);
                    continue;
                }
                let path = self
                    .generator
                    .key_data_chart(region, &raw, &average)
                    .map_err(chart_error(region))?;
                images.push(path);
            }
        }

        if self.config.charts.dashboard {
            let path = self
                .generator
                .dashboard(&self.config.pipeline.regions, &raw, &average)
                .map_err(chart_error("dashboard"))?;
            images.push(path);
        }
        Ok(images)
    }
}
