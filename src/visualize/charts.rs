//! Line, bar, histogram, pie and heatmap charts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use plotters::coord::ranged1d::{IntoSegmentedCoord, SegmentValue};
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;
use tracing::debug;

use super::{chart_path, render_err, ChartStyle, Colormap, PALETTE};
use crate::error::VisualizeError;
use crate::models::{Column, CorrelationMatrix, Dataset, Value};

/// matplotlib's default histogram bin count.
pub const HISTOGRAM_BINS: usize = 10;

// ---------------------------------------------------------------------------
// Chart data preparation
// ---------------------------------------------------------------------------

/// Sum of `y` per distinct `x`, sorted ascending by total.
///
/// Rows with a missing `x` are dropped; missing `y` values count as zero.
pub fn bar_totals(ds: &Dataset, x: &str, y: &str) -> Result<Vec<(String, f64)>, VisualizeError> {
    let x_col = require(ds, x)?;
    let y_col = require_numeric(ds, y)?;

    let mut totals: BTreeMap<&Value, f64> = BTreeMap::new();
    for (key, value) in x_col.values.iter().zip(&y_col.values) {
        if key.is_null() {
            continue;
        }
        *totals.entry(key).or_insert(0.0) += value.as_f64().unwrap_or(0.0);
    }

    let mut bars: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(key, total)| (key.to_field(), total))
        .collect();
    bars.sort_by(|a, b| a.1.total_cmp(&b.1));
    Ok(bars)
}

/// Equal-width bins over `[min, max]`; the last bin includes `max`.
///
/// Returns `(lower, upper, count)` per bin.
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let (mut lo, mut hi) = min_max(values.iter().copied());
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &v in values {
        let bin = (((v - lo) / width) as usize).min(bins - 1);
        counts[bin] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| (lo + width * i as f64, lo + width * (i + 1) as f64, count))
        .collect()
}

/// Occurrences of each distinct non-null value, most frequent first.
///
/// Ties keep the order of first appearance.
pub fn value_counts(column: &Column) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in column.values.iter().filter(|v| !v.is_null()) {
        let label = value.to_field();
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn require<'a>(ds: &'a Dataset, name: &str) -> Result<&'a Column, VisualizeError> {
    ds.column(name)
        .ok_or_else(|| VisualizeError::MissingColumn(name.to_string()))
}

fn require_numeric<'a>(ds: &'a Dataset, name: &str) -> Result<&'a Column, VisualizeError> {
    let column = require(ds, name)?;
    if !column.is_numeric() {
        return Err(VisualizeError::Render(format!(
            "column '{}' is not numeric",
            name
        )));
    }
    Ok(column)
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Axis range covering `values` with `pad` of the span on each side.
fn padded_range(values: impl Iterator<Item = f64>, pad: f64) -> std::ops::Range<f64> {
    let (lo, hi) = min_max(values);
    let span = if hi > lo { hi - lo } else { 1.0 };
    (lo - span * pad)..(hi + span * pad)
}

/// Value axis for bars: always includes zero, with headroom for labels.
fn bar_value_range(bars: &[(String, f64)]) -> std::ops::Range<f64> {
    let (lo, hi) = min_max(bars.iter().map(|b| b.1).chain(std::iter::once(0.0)));
    let span = if hi > lo { hi - lo } else { 1.0 };
    let lo = if lo < 0.0 { lo - span * 0.12 } else { 0.0 };
    let hi = if hi > 0.0 { hi + span * 0.12 } else { 0.0 };
    lo..hi
}

fn format_bar_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

fn chart_builder<'a, 'b, DB: DrawingBackend>(
    root: &'a DrawingArea<DB, Shift>,
    style: &ChartStyle,
    y_label_area: u32,
) -> ChartBuilder<'a, 'b, DB> {
    let mut builder = ChartBuilder::on(root);
    builder
        .margin(15)
        .x_label_area_size(style.label_area(4))
        .y_label_area_size(y_label_area);
    if let Some(title) = &style.title {
        builder.caption(title, style.font(1.4));
    }
    builder
}

fn done(chart: &str, path: &Path) {
    debug!("Rendered {} to {}", chart, path.display());
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// Line chart of `y` against `x` in row order.
///
/// A numeric `x` is plotted on a numeric axis; any other `x` is plotted
/// at categorical positions labelled with its values.
pub fn line_chart(
    ds: &Dataset,
    x: &str,
    y: &str,
    chart_name: &str,
    style: &ChartStyle,
    reports_dir: &Path,
) -> Result<PathBuf, VisualizeError> {
    let x_col = require(ds, x)?;
    let y_col = require_numeric(ds, y)?;
    let color = style.series_color()?;

    let categorical = !x_col.is_numeric();
    let labels: Vec<String> = x_col.values.iter().map(Value::to_field).collect();
    let points: Vec<(f64, f64)> = x_col
        .values
        .iter()
        .zip(&y_col.values)
        .enumerate()
        .filter_map(|(i, (xv, yv))| {
            let yv = yv.as_f64()?;
            let xv = if categorical { i as f64 } else { xv.as_f64()? };
            Some((xv, yv))
        })
        .collect();
    if points.is_empty() {
        return Err(VisualizeError::Render(format!("no data to plot for '{}'", y)));
    }

    let x_range = padded_range(points.iter().map(|p| p.0), 0.02);
    let y_range = padded_range(points.iter().map(|p| p.1), 0.05);

    let size = style.pixel_size()?;
    let path = chart_path(reports_dir, chart_name)?;
    {
        let root = BitMapBackend::new(&path, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = chart_builder(&root, style, style.label_area(5))
            .build_cartesian_2d(x_range, y_range)
            .map_err(render_err)?;

        let category_label = |v: &f64| {
            let i = v.round();
            if (v - i).abs() < 1e-6 && i >= 0.0 {
                labels.get(i as usize).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        };

        let mut mesh = chart.configure_mesh();
        mesh.x_desc(x)
            .y_desc(y)
            .label_style(style.font(1.0))
            .axis_desc_style(style.font(1.0));
        if categorical {
            mesh.x_labels(labels.len().min(12))
                .x_label_formatter(&category_label);
        }
        if !style.grid {
            mesh.disable_mesh();
        }
        mesh.draw().map_err(render_err)?;

        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    done("line chart", &path);
    Ok(path)
}

/// Bar chart of `y` summed per `x`, sorted ascending, each bar annotated
/// with its value. `style.horizontal` lays the bars out sideways.
pub fn bar_chart(
    ds: &Dataset,
    x: &str,
    y: &str,
    chart_name: &str,
    style: &ChartStyle,
    reports_dir: &Path,
) -> Result<PathBuf, VisualizeError> {
    let bars = bar_totals(ds, x, y)?;
    if bars.is_empty() {
        return Err(VisualizeError::Render(format!("no groups to plot for '{}'", x)));
    }
    let color = style.series_color()?;

    let n = bars.len() as i32;
    let value_range = bar_value_range(&bars);
    let category_label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => bars
            .get(*i as usize)
            .map(|b| b.0.clone())
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    };

    let size = style.pixel_size()?;
    let path = chart_path(reports_dir, chart_name)?;
    {
        let root = BitMapBackend::new(&path, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        if style.horizontal {
            let mut chart = chart_builder(&root, style, style.label_area(8))
                .build_cartesian_2d(value_range, (0..n).into_segmented())
                .map_err(render_err)?;

            let mut mesh = chart.configure_mesh();
            mesh.x_desc(y)
                .y_desc(x)
                .y_labels(bars.len())
                .y_label_formatter(&category_label)
                .label_style(style.font(1.0))
                .axis_desc_style(style.font(1.0));
            if !style.grid {
                mesh.disable_mesh();
            }
            mesh.draw().map_err(render_err)?;

            chart
                .draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
                    let i = i as i32;
                    let mut bar = Rectangle::new(
                        [(0.0, SegmentValue::Exact(i)), (*v, SegmentValue::Exact(i + 1))],
                        color.filled(),
                    );
                    bar.set_margin(4, 4, 0, 0);
                    bar
                }))
                .map_err(render_err)?;

            chart
                .draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
                    let h = if *v < 0.0 { HPos::Right } else { HPos::Left };
                    Text::new(
                        format!(" {} ", format_bar_value(*v)),
                        (*v, SegmentValue::CenterOf(i as i32)),
                        TextStyle::from(style.font(0.85)).pos(Pos::new(h, VPos::Center)),
                    )
                }))
                .map_err(render_err)?;
        } else {
            let mut chart = chart_builder(&root, style, style.label_area(5))
                .build_cartesian_2d((0..n).into_segmented(), value_range)
                .map_err(render_err)?;

            let mut mesh = chart.configure_mesh();
            mesh.x_desc(x)
                .y_desc(y)
                .x_labels(bars.len())
                .x_label_formatter(&category_label)
                .label_style(style.font(1.0))
                .axis_desc_style(style.font(1.0));
            if !style.grid {
                mesh.disable_mesh();
            }
            mesh.draw().map_err(render_err)?;

            chart
                .draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
                    let i = i as i32;
                    let mut bar = Rectangle::new(
                        [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *v)],
                        color.filled(),
                    );
                    bar.set_margin(0, 0, 4, 4);
                    bar
                }))
                .map_err(render_err)?;

            chart
                .draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
                    let anchor = if *v < 0.0 { VPos::Top } else { VPos::Bottom };
                    Text::new(
                        format_bar_value(*v),
                        (SegmentValue::CenterOf(i as i32), *v),
                        TextStyle::from(style.font(0.85)).pos(Pos::new(HPos::Center, anchor)),
                    )
                }))
                .map_err(render_err)?;
        }

        root.present().map_err(render_err)?;
    }

    done("bar chart", &path);
    Ok(path)
}

/// Histogram of a numeric column with [`HISTOGRAM_BINS`] bins.
pub fn histogram(
    ds: &Dataset,
    column: &str,
    chart_name: &str,
    style: &ChartStyle,
    reports_dir: &Path,
) -> Result<PathBuf, VisualizeError> {
    let values = require_numeric(ds, column)?.numbers();
    if values.is_empty() {
        return Err(VisualizeError::Render(format!(
            "column '{}' has no values",
            column
        )));
    }
    let color = style.series_color()?;

    let bins = histogram_bins(&values, HISTOGRAM_BINS);
    let x_range = padded_range(bins.iter().flat_map(|b| [b.0, b.1]), 0.03);
    let max_count = bins.iter().map(|b| b.2).max().unwrap_or(0) as f64;
    let y_range = 0.0..(max_count * 1.05).max(1.0);

    let size = style.pixel_size()?;
    let path = chart_path(reports_dir, chart_name)?;
    {
        let root = BitMapBackend::new(&path, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = chart_builder(&root, style, style.label_area(5))
            .build_cartesian_2d(x_range, y_range)
            .map_err(render_err)?;

        let mut mesh = chart.configure_mesh();
        mesh.x_desc(column)
            .y_desc("Frequency")
            .label_style(style.font(1.0))
            .axis_desc_style(style.font(1.0));
        if !style.grid {
            mesh.disable_mesh();
        }
        mesh.draw().map_err(render_err)?;

        chart
            .draw_series(bins.iter().map(|(lo, hi, count)| {
                let mut bar = Rectangle::new([(*lo, 0.0), (*hi, *count as f64)], color.filled());
                bar.set_margin(0, 0, 1, 1);
                bar
            }))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    done("histogram", &path);
    Ok(path)
}

/// Pie chart of the value counts of a column, labelled with percentages.
pub fn pie_chart(
    ds: &Dataset,
    column: &str,
    chart_name: &str,
    style: &ChartStyle,
    reports_dir: &Path,
) -> Result<PathBuf, VisualizeError> {
    let counts = value_counts(require(ds, column)?);
    if counts.is_empty() {
        return Err(VisualizeError::Render(format!(
            "column '{}' has no values",
            column
        )));
    }

    let sizes: Vec<f64> = counts.iter().map(|c| c.1 as f64).collect();
    let labels: Vec<String> = counts.iter().map(|c| c.0.clone()).collect();
    let colors: Vec<RGBColor> = (0..counts.len())
        .map(|i| PALETTE[i % PALETTE.len()])
        .collect();

    let size = style.pixel_size()?;
    let path = chart_path(reports_dir, chart_name)?;
    {
        let root = BitMapBackend::new(&path, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        let area = match &style.title {
            Some(title) => root.titled(title, style.font(1.4)).map_err(render_err)?,
            None => root.clone(),
        };

        let (w, h) = area.dim_in_pixel();
        let center = ((w / 2) as i32, (h / 2) as i32);
        let radius = f64::from(w.min(h)) * 0.35;

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.start_angle(90.0);
        pie.label_style(style.font(1.0));
        pie.percentages(style.font(0.9).color(&WHITE));
        area.draw(&pie).map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    done("pie chart", &path);
    Ok(path)
}

/// Heatmap of a correlation matrix on a fixed `[-1, 1]` color scale, each
/// cell annotated with its value to two decimals.
pub fn heatmap(
    matrix: &CorrelationMatrix,
    chart_name: &str,
    style: &ChartStyle,
    reports_dir: &Path,
) -> Result<PathBuf, VisualizeError> {
    if matrix.is_empty() {
        return Err(VisualizeError::Render(
            "correlation matrix is empty".to_string(),
        ));
    }
    let colormap = Colormap::parse(&style.colormap)?;

    let n = matrix.len() as i32;
    let names = &matrix.columns;
    let column_label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            names.get(*i as usize).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    };
    // Row 0 is drawn at the top.
    let row_label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => names
            .get((n - 1 - *i) as usize)
            .cloned()
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    };

    let size = style.pixel_size()?;
    let path = chart_path(reports_dir, chart_name)?;
    {
        let root = BitMapBackend::new(&path, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let longest = names.iter().map(|s| s.chars().count()).max().unwrap_or(1) as u32;
        let min_area = style.label_area(3);
        let label_area = (longest.saturating_mul(min_area) / 5).max(min_area);

        let mut chart = ChartBuilder::on(&root);
        chart
            .margin(15)
            .x_label_area_size(label_area)
            .y_label_area_size(label_area);
        if let Some(title) = &style.title {
            chart.caption(title, style.font(1.4));
        }
        let mut chart = chart
            .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(n as usize)
            .y_labels(n as usize)
            .x_label_formatter(&column_label)
            .y_label_formatter(&row_label)
            .x_label_style(style.font(1.0).transform(FontTransform::Rotate90))
            .y_label_style(style.font(1.0))
            .draw()
            .map_err(render_err)?;

        let cells: Vec<(i32, i32, f64)> = (0..n)
            .flat_map(|r| (0..n).map(move |c| (r, c)))
            .map(|(r, c)| (r, c, matrix.values[r as usize][c as usize]))
            .collect();

        chart
            .draw_series(cells.iter().map(|&(r, c, v)| {
                let y = n - 1 - r;
                Rectangle::new(
                    [
                        (SegmentValue::Exact(c), SegmentValue::Exact(y)),
                        (SegmentValue::Exact(c + 1), SegmentValue::Exact(y + 1)),
                    ],
                    colormap.color(v).filled(),
                )
            }))
            .map_err(render_err)?;

        chart
            .draw_series(cells.iter().map(|&(r, c, v)| {
                let ink = if v.abs() > 0.6 { WHITE } else { BLACK };
                let label = if v.is_nan() {
                    "nan".to_string()
                } else {
                    format!("{:.2}", v)
                };
                Text::new(
                    label,
                    (SegmentValue::CenterOf(c), SegmentValue::CenterOf(n - 1 - r)),
                    style
                        .font(0.9)
                        .color(&ink)
                        .pos(Pos::new(HPos::Center, VPos::Center)),
                )
            }))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    done("heatmap", &path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn sales() -> Dataset {
        Dataset::new(vec![
            Column::new("region", vec![text("B"), text("A"), text("B"), Value::Null]),
            Column::new(
                "amount",
                vec![
                    Value::Number(5.0),
                    Value::Number(30.0),
                    Value::Number(10.0),
                    Value::Number(100.0),
                ],
            ),
        ])
    }

    #[test]
    fn test_bar_totals_sum_and_sort() {
        let bars = bar_totals(&sales(), "region", "amount").unwrap();
        assert_eq!(bars, vec![("B".to_string(), 15.0), ("A".to_string(), 30.0)]);
    }

    #[test]
    fn test_bar_totals_requires_numeric_y() {
        let err = bar_totals(&sales(), "amount", "region").unwrap_err();
        assert!(matches!(err, VisualizeError::Render(_)));
    }

    #[test]
    fn test_histogram_bins() {
        let bins = histogram_bins(&[0.0, 1.0, 2.0, 10.0], 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins[0], (0.0, 1.0, 1));
        assert_eq!(bins[1].2, 1);
        assert_eq!(bins[2].2, 1);
        // The maximum lands in the last, closed bin.
        assert_eq!(bins[9].2, 1);
        assert_eq!(bins.iter().map(|b| b.2).sum::<usize>(), 4);
    }

    #[test]
    fn test_histogram_bins_constant_data() {
        let bins = histogram_bins(&[3.0, 3.0], 10);
        assert_eq!(bins.iter().map(|b| b.2).sum::<usize>(), 2);
        assert!(histogram_bins(&[], 10).is_empty());
    }

    #[test]
    fn test_value_counts_order() {
        let column = Column::new(
            "c",
            vec![text("x"), text("y"), text("y"), text("z"), Value::Null, text("x"), text("w")],
        );
        let counts = value_counts(&column);
        assert_eq!(
            counts,
            vec![
                ("x".to_string(), 2),
                ("y".to_string(), 2),
                ("z".to_string(), 1),
                ("w".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_missing_columns() {
        let dir = TempDir::new().unwrap();
        let style = ChartStyle::default();
        let ds = sales();

        let err = line_chart(&ds, "nope", "amount", "line_chart", &style, dir.path()).unwrap_err();
        assert!(matches!(err, VisualizeError::MissingColumn(c) if c == "nope"));

        let err = bar_chart(&ds, "region", "nope", "bar_chart", &style, dir.path()).unwrap_err();
        assert!(matches!(err, VisualizeError::MissingColumn(_)));

        let err = histogram(&ds, "nope", "histogram", &style, dir.path()).unwrap_err();
        assert!(matches!(err, VisualizeError::MissingColumn(_)));

        let err = pie_chart(&ds, "nope", "pie_chart", &style, dir.path()).unwrap_err();
        assert!(matches!(err, VisualizeError::MissingColumn(_)));
    }

    #[test]
    fn test_histogram_rejects_text_column() {
        let dir = TempDir::new().unwrap();
        let err = histogram(&sales(), "region", "histogram", &ChartStyle::default(), dir.path())
            .unwrap_err();
        assert!(matches!(err, VisualizeError::Render(_)));
        assert!(!dir.path().join("histogram.png").exists());
    }

    #[test]
    fn test_bad_color_is_render_error() {
        let dir = TempDir::new().unwrap();
        let style = ChartStyle {
            color: "chartreuse-ish".to_string(),
            ..ChartStyle::default()
        };
        let err = line_chart(&sales(), "region", "amount", "line_chart", &style, dir.path())
            .unwrap_err();
        assert!(matches!(err, VisualizeError::Render(_)));
    }

    fn assert_png(path: &Path, size: (u32, u32)) {
        let img = image::open(path).unwrap();
        assert_eq!((img.width(), img.height()), size);
    }

    fn series() -> Dataset {
        Dataset::new(vec![
            Column::new("t", (0..6).map(|i| Value::Number(f64::from(i))).collect()),
            Column::new(
                "v",
                [3.0, 1.5, 4.0, 1.0, 5.5, 9.0]
                    .into_iter()
                    .map(Value::Number)
                    .collect(),
            ),
        ])
    }

    #[test]
    fn test_line_chart_renders_numeric_and_categorical_x() {
        let dir = TempDir::new().unwrap();
        let style = ChartStyle::default().with_title(Some("Trend".to_string()));

        let path = line_chart(&series(), "t", "v", "line_chart", &style, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("line_chart.png"));
        assert_png(&path, (640, 480));

        let path =
            line_chart(&sales(), "region", "amount", "line_by_region", &style, dir.path()).unwrap();
        assert_png(&path, (640, 480));
    }

    #[test]
    fn test_bar_chart_renders_vertical_and_horizontal() {
        let dir = TempDir::new().unwrap();
        let style = ChartStyle {
            grid: true,
            ..ChartStyle::default()
        };
        let path = bar_chart(&sales(), "region", "amount", "bar_chart", &style, dir.path()).unwrap();
        assert_png(&path, (640, 480));

        let sideways = ChartStyle {
            horizontal: true,
            figsize: (8.0, 3.0),
            ..ChartStyle::default()
        };
        let path =
            bar_chart(&sales(), "region", "amount", "bar_sideways", &sideways, dir.path()).unwrap();
        assert_png(&path, (800, 300));
    }

    #[test]
    fn test_histogram_and_pie_render() {
        let dir = TempDir::new().unwrap();
        let style = ChartStyle {
            color: "green".to_string(),
            ..ChartStyle::default()
        };
        let path = histogram(&series(), "v", "histogram", &style, dir.path()).unwrap();
        assert_png(&path, (640, 480));

        let path = pie_chart(&sales(), "region", "pie_chart", &style, dir.path()).unwrap();
        assert_png(&path, (640, 480));
    }

    #[test]
    fn test_heatmap_renders() {
        let dir = TempDir::new().unwrap();
        let matrix = CorrelationMatrix {
            columns: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            values: vec![
                vec![1.0, -0.5, f64::NAN],
                vec![-0.5, 1.0, 0.25],
                vec![f64::NAN, 0.25, 1.0],
            ],
        };
        let style = ChartStyle {
            colormap: "viridis".to_string(),
            ..ChartStyle::default()
        };
        let path = heatmap(&matrix, "correlation_heatmap", &style, dir.path()).unwrap();
        assert_png(&path, (640, 480));
    }

    #[test]
    fn test_oversized_figure_is_render_error() {
        let dir = TempDir::new().unwrap();
        let style = ChartStyle {
            figsize: (700.0, 700.0),
            ..ChartStyle::default()
        };
        let err = histogram(&series(), "v", "histogram", &style, dir.path()).unwrap_err();
        assert!(matches!(err, VisualizeError::Render(_)));
        assert!(!dir.path().join("histogram.png").exists());

        let style = ChartStyle {
            font_size: u32::MAX,
            ..ChartStyle::default()
        };
        let err = bar_chart(&sales(), "region", "amount", "bar_chart", &style, dir.path())
            .unwrap_err();
        assert!(matches!(err, VisualizeError::Render(_)));
    }

    #[test]
    fn test_heatmap_rejects_empty_matrix() {
        let dir = TempDir::new().unwrap();
        let err = heatmap(
            &CorrelationMatrix::default(),
            "correlation_heatmap",
            &ChartStyle::default(),
            dir.path(),
        )
        .unwrap_err();
        assert!(matches!(err, VisualizeError::Render(_)));
    }
}
