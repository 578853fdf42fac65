//! Chart jobs: one chart per metric, per-region key data and the regional
//! dashboard

use crate::{Chart, ChartSeries, ChartStyle, GraphRenderer, LineChartRenderer, Panel};
use covchart_common::{strip_whitespace, ImageFormat, Result};
use covchart_config::Config;
use covchart_data::{MetricFrame, MetricTable};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Title of the per-region key-data chart
pub fn key_data_title(region: &str) -> String {
    format!("{region}: Covid-19 key data, log scale")
}

/// Title of the regional dashboard
pub const DASHBOARD_TITLE: &str = "England: Covid-19 key data by region, log scale.";

/// Dashboard grid: four rows, two columns
pub const DASHBOARD_LAYOUT: (usize, usize) = (4, 2);

/// `<metric-id>_<region-or-all>.<ext>`
pub fn metric_file_name(metric: &str, region: Option<&str>, format: ImageFormat) -> String {
    let region = region.map_or_else(|| "all".to_string(), strip_whitespace);
    format!("{metric}_{region}.{}", format.extension())
}

/// `<RegionWithoutSpaces>KeyData.<ext>`
pub fn key_data_file_name(region: &str, format: ImageFormat) -> String {
    format!("{}KeyData.{}", strip_whitespace(region), format.extension())
}

/// `KeyRegionalData.<ext>`
pub fn dashboard_file_name(format: ImageFormat) -> String {
    format!("KeyRegionalData.{}", format.extension())
}

/// Sizes and axis limits of the three chart kinds
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    /// Single chart width
    pub width: u32,
    /// Single chart height
    pub height: u32,
    /// Dashboard width
    pub dashboard_width: u32,
    /// Dashboard height
    pub dashboard_height: u32,
    /// Upper y bound of regional panels
    pub regional_y_max: Option<f64>,
    /// Region left uncapped
    pub national_region: String,
}

/// Renders chart jobs into an output directory
pub struct ChartGenerator {
    renderer: Box<dyn GraphRenderer>,
    style: ChartStyle,
    layout: ChartLayout,
    output_dir: PathBuf,
    format: ImageFormat,
}

impl ChartGenerator {
    /// Generator for a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        let charts = &config.charts;
        Self {
            renderer: Box::new(LineChartRenderer::new()),
            style: ChartStyle::from(charts),
            layout: ChartLayout {
                width: charts.width,
                height: charts.height,
                dashboard_width: charts.dashboard_width,
                dashboard_height: charts.dashboard_height,
                regional_y_max: charts.regional_y_max,
                national_region: config.pipeline.national_region.clone(),
            },
            output_dir: config.output.dir.clone(),
            format: config.output.format,
        }
    }

    /// Replace the renderer
    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn GraphRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replace the style
    #[must_use]
    pub fn with_style(mut self, style: ChartStyle) -> Self {
        self.style = style;
        self
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Creates the output directory if needed
    pub fn ensure_output_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// One line per region: the raw series thin, the rolling average thick in
    /// the same colour
    #[instrument(skip_all, fields(metric = %raw.name()))]
    pub fn metric_chart(
        &self,
        label: &str,
        raw: &MetricTable,
        average: Option<&MetricTable>,
        region: Option<&str>,
    ) -> Result<PathBuf> {
        let mut panel = Panel::default();
        for (color, key) in raw.regions().enumerate() {
            match average.filter(|avg| avg.has_region(key)) {
                Some(average) => {
                    panel.series.push(self.series(raw, key, color, false, None));
                    panel.series.push(self.series(average, key, color, true, Some(key)));
                }
                None => panel.series.push(self.series(raw, key, color, false, Some(key))),
            }
        }

        let title = match (region, self.style.log_scale) {
            (Some(region), true) => format!("{region}: {label}, log scale"),
            (Some(region), false) => format!("{region}: {label}"),
            (None, true) => format!("{label}, log scale"),
            (None, false) => label.to_string(),
        };
        let chart = Chart::single(title, self.layout.width, self.layout.height, panel);
        self.write(&chart, &metric_file_name(raw.name(), region, self.format))
    }

    /// Every metric for one region
    #[instrument(skip(self, raw, average))]
    pub fn key_data_chart(&self, region: &str, raw: &MetricFrame, average: &MetricFrame) -> Result<PathBuf> {
        let mut panel = self.overlay_panel(region, raw, average);
        panel.title = None;
        let chart = Chart::single(key_data_title(region), self.layout.width, self.layout.height, panel);
        self.write(&chart, &key_data_file_name(region, self.format))
    }

    /// Every metric for each region, one panel per region
    #[instrument(skip_all)]
    pub fn dashboard(&self, regions: &[String], raw: &MetricFrame, average: &MetricFrame) -> Result<PathBuf> {
        let (rows, cols) = DASHBOARD_LAYOUT;
        if regions.len() > rows * cols {
            warn!("Dashboard shows the first {} of {} regions", rows * cols, regions.len());
        }

        let panels = regions
            .iter()
            .take(rows * cols)
            .map(|region| self.overlay_panel(region, raw, average))
            .collect();
        let chart = Chart {
            title: Some(DASHBOARD_TITLE.to_string()),
            width: self.layout.dashboard_width,
            height: self.layout.dashboard_height,
            layout: DASHBOARD_LAYOUT,
            panels,
        };
        self.write(&chart, &dashboard_file_name(self.format))
    }

    fn overlay_panel(&self, region: &str, raw: &MetricFrame, average: &MetricFrame) -> Panel {
        let mut panel = Panel {
            title: Some(region.to_string()),
            series: Vec::new(),
            y_max: self.y_max_for(region),
        };

        for (color, (label, table)) in raw.tables().iter().enumerate() {
            if table.has_region(region) {
                panel.series.push(self.series(table, region, color, false, None));
            }
            if let Some((_, avg)) = average.tables().iter().find(|(l, _)| l == label) {
                if avg.has_region(region) {
                    panel.series.push(self.series(avg, region, color, true, Some(label)));
                }
            }
        }
        panel
    }

    fn y_max_for(&self, region: &str) -> Option<f64> {
        if region == self.layout.national_region {
            None
        } else {
            self.layout.regional_y_max
        }
    }

    fn series(&self, table: &MetricTable, key: &str, color: usize, thick: bool, label: Option<&str>) -> ChartSeries {
        ChartSeries {
            label: label.map(str::to_string),
            start: table.dates().first().copied().unwrap_or_default(),
            values: table.column(key).map(<[_]>::to_vec).unwrap_or_default(),
            color,
            width: if thick {
                self.style.average_line_width
            } else {
                self.style.raw_line_width
            },
        }
    }

    fn write(&self, chart: &Chart, file_name: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        debug!("Rendering {} panels to {}", chart.panels.len(), path.display());
        self.renderer.render_to_file(chart, &self.style, self.format, &path)?;
        info!("wrote {}", path.display());
        Ok(path)
    }
}
