//! Chart rendering trait and the plotters line-chart implementation

use crate::{Chart, ColorScheme, ChartStyle, Panel};
use chrono::{Datelike, Duration, Months, NaiveDate};
use covchart_common::{format_thousands, CovChartError, ImageFormat, Result};
use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};
use plotters::coord::ranged1d::{Ranged, ValueFormatter};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Turns chart descriptions into encoded images
#[cfg_attr(test, mockall::automock)]
pub trait GraphRenderer: Send + Sync {
    /// Render a chart to encoded bytes
    fn render_to_bytes(&self, chart: &Chart, style: &ChartStyle, format: ImageFormat) -> Result<Vec<u8>>;

    /// Render a chart and write it to `path`
    fn render_to_file(&self, chart: &Chart, style: &ChartStyle, format: ImageFormat, path: &Path) -> Result<()> {
        let bytes = self.render_to_bytes(chart, style, format)?;
        std::fs::write(path, bytes)?;
        info!("Successfully rendered chart to {}", path.display());
        Ok(())
    }
}

/// Colours of a scheme, in series order
pub fn get_colors(scheme: &ColorScheme) -> Vec<RGBColor> {
    match scheme {
        ColorScheme::Default => vec![
            RGBColor(31, 119, 180),  // Blue
            RGBColor(255, 127, 14),  // Orange
            RGBColor(44, 160, 44),   // Green
            RGBColor(214, 39, 40),   // Red
            RGBColor(148, 103, 189), // Purple
            RGBColor(140, 86, 75),   // Brown
            RGBColor(227, 119, 194), // Pink
            RGBColor(127, 127, 127), // Gray
            RGBColor(188, 189, 34),  // Olive
            RGBColor(23, 190, 207),  // Cyan
        ],
        ColorScheme::Dark => vec![
            RGBColor(55, 126, 184),
            RGBColor(255, 152, 150),
            RGBColor(77, 175, 74),
            RGBColor(255, 187, 120),
            RGBColor(152, 78, 163),
            RGBColor(255, 255, 153),
        ],
        ColorScheme::Light => vec![
            RGBColor(166, 206, 227),
            RGBColor(251, 180, 174),
            RGBColor(179, 226, 205),
            RGBColor(253, 205, 172),
            RGBColor(203, 213, 232),
            RGBColor(244, 202, 228),
        ],
        ColorScheme::Vibrant => vec![
            RGBColor(230, 25, 75),
            RGBColor(60, 180, 75),
            RGBColor(255, 225, 25),
            RGBColor(0, 130, 200),
            RGBColor(245, 130, 48),
            RGBColor(145, 30, 180),
            RGBColor(70, 240, 240),
            RGBColor(240, 50, 230),
        ],
        ColorScheme::Monochrome => vec![
            RGBColor(0, 0, 0),
            RGBColor(64, 64, 64),
            RGBColor(128, 128, 128),
            RGBColor(192, 192, 192),
        ],
        ColorScheme::Custom(colors) => colors.iter().map(|c| parse_color(c)).collect(),
    }
}

/// Parse a `#rrggbb` string; anything else is black
pub fn parse_color(color: &str) -> RGBColor {
    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() == 6 && hex.is_ascii() {
            if let (Ok(r), Ok(g), Ok(b)) = (
                u8::from_str_radix(&hex[0..2], 16),
                u8::from_str_radix(&hex[2..4], 16),
                u8::from_str_radix(&hex[4..6], 16),
            ) {
                return RGBColor(r, g, b);
            }
        }
    }
    BLACK
}

/// Line charts drawn with plotters: PNG through an in-memory bitmap, or SVG
#[derive(Debug, Default, Clone, Copy)]
pub struct LineChartRenderer;

impl LineChartRenderer {
    /// Create a new renderer
    pub fn new() -> Self {
        Self
    }

    fn render_png(&self, chart: &Chart, style: &ChartStyle) -> Result<Vec<u8>> {
        let (width, height) = (chart.width, chart.height);
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            self.draw(&root, chart, style)?;
            root.present()?;
        }

        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(&buffer, width, height, ColorType::Rgb8)?;
        Ok(png)
    }

    fn render_svg(&self, chart: &Chart, style: &ChartStyle) -> Result<Vec<u8>> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (chart.width, chart.height)).into_drawing_area();
            self.draw(&root, chart, style)?;
            root.present()?;
        }
        Ok(svg.into_bytes())
    }

    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>, chart: &Chart, style: &ChartStyle) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&parse_color(&style.background_color))?;

        let body = match (&chart.title, style.text) {
            (Some(title), true) => root.titled(title, title_font(style))?,
            _ => root.clone(),
        };

        let (rows, cols) = chart.layout;
        let cells = body.split_evenly((rows.max(1), cols.max(1)));
        for (index, panel) in chart.panels.iter().enumerate() {
            let Some(area) = chart.cell(index).and_then(|cell| cells.get(cell)) else {
                debug!("No grid cell for panel {}", index);
                continue;
            };
            self.draw_panel(area, panel, style)?;
        }
        Ok(())
    }

    fn draw_panel<DB>(&self, area: &DrawingArea<DB, Shift>, panel: &Panel, style: &ChartStyle) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let (start, end) = match panel.date_span() {
            Some((start, end)) if end > start => (start, end),
            Some((start, _)) => (start, start + Duration::days(1)),
            None => (NaiveDate::default(), NaiveDate::default() + Duration::days(1)),
        };
        let x_range = (start..end).with_key_points(month_starts(start, end));
        let data_max = panel.max_value().unwrap_or(1.0);

        let mut builder = ChartBuilder::on(area);
        builder.margin(style.margins.outer);
        if style.text {
            builder
                .x_label_area_size(style.margins.x_labels)
                .right_y_label_area_size(style.margins.y_labels);
            if let Some(title) = &panel.title {
                builder.caption(title, title_font(style));
            }
        }

        if style.log_scale {
            let top = panel.y_max.unwrap_or(data_max * 1.1).max(10.0);
            let mut chart = builder.build_cartesian_2d(x_range, (1.0..top).log_scale())?;
            draw_lines(&mut chart, panel, style, |v| v >= 1.0)?;
        } else {
            let top = panel.y_max.unwrap_or(data_max * 1.1).max(1.0);
            let mut chart = builder.build_cartesian_2d(x_range, 0.0..top)?;
            draw_lines(&mut chart, panel, style, |v| v >= 0.0)?;
        }
        Ok(())
    }
}

impl GraphRenderer for LineChartRenderer {
    fn render_to_bytes(&self, chart: &Chart, style: &ChartStyle, format: ImageFormat) -> Result<Vec<u8>> {
        if chart.width == 0 || chart.height == 0 {
            return Err(CovChartError::render("chart dimensions must be non-zero"));
        }
        match format {
            ImageFormat::Png => self.render_png(chart, style),
            ImageFormat::Svg => self.render_svg(chart, style),
        }
    }
}

/// First day of every month from `start` to `end` inclusive
fn month_starts(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut month = NaiveDate::from_ymd_opt(start.year(), start.month(), 1);
    if month.is_some_and(|first| first < start) {
        month = month.and_then(|first| first.checked_add_months(Months::new(1)));
    }

    let mut starts = Vec::new();
    while let Some(first) = month.filter(|first| *first <= end) {
        starts.push(first);
        month = first.checked_add_months(Months::new(1));
    }
    starts
}

fn title_font(style: &ChartStyle) -> (&str, f64) {
    (style.title_font.family.as_str(), f64::from(style.title_font.size))
}

fn label_font(style: &ChartStyle) -> (&str, f64) {
    (style.label_font.family.as_str(), f64::from(style.label_font.size))
}

/// Mesh, lines and legend of one panel
fn draw_lines<'a, DB, X, Y>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<X, Y>>,
    panel: &Panel,
    style: &ChartStyle,
    keep: impl Fn(f64) -> bool + Copy,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
    X: Ranged<ValueType = NaiveDate> + ValueFormatter<NaiveDate>,
    Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
{
    if style.text {
        let x_format = |x: &NaiveDate| x.format("%b").to_string();
        let y_format = |y: &f64| format_thousands(*y);
        chart
            .configure_mesh()
            .x_label_formatter(&x_format)
            .y_label_formatter(&y_format)
            .label_style(label_font(style))
            .draw()?;
    }

    let colors = get_colors(&style.color_scheme);
    let mut labelled = false;
    for series in &panel.series {
        let color = colors
            .get(series.color % colors.len().max(1))
            .copied()
            .unwrap_or(BLACK);
        let line = color.stroke_width(series.width);

        for (i, segment) in series.segments(keep).into_iter().enumerate() {
            let drawn = chart.draw_series(LineSeries::new(segment, line))?;
            if let (0, Some(label)) = (i, &series.label) {
                drawn
                    .label(label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], line));
                labelled = true;
            }
        }
    }

    if style.text && labelled {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font(label_font(style))
            .draw()?;
    }
    Ok(())
}
