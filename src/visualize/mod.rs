//! Chart rendering.
//!
//! Every chart is drawn with `plotters` onto a PNG bitmap named
//! `<chart_name>.png` inside the reports directory. Styling is passed
//! explicitly through [`ChartStyle`].

pub mod charts;

use std::path::{Path, PathBuf};

use plotters::style::{FontDesc, FontFamily, FontStyle, RGBColor};

use crate::error::VisualizeError;

pub use charts::{bar_chart, heatmap, histogram, line_chart, pie_chart};

/// Largest accepted canvas side in pixels.
pub const MAX_CANVAS_SIDE: u32 = 10_000;

/// Largest accepted base font size in pixels.
pub const MAX_FONT_SIZE: u32 = 200;

/// Default series color (matplotlib's first cycle color).
pub const DEFAULT_COLOR: &str = "#1f77b4";

/// Categorical palette for pie slices.
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

/// Styling options shared by all charts.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    /// Caption drawn above the plot.
    pub title: Option<String>,
    /// Series color: `#rrggbb`, `#rgb` or a named color.
    pub color: String,
    /// Color map for the correlation heatmap.
    pub colormap: String,
    /// Base font size in pixels.
    pub font_size: u32,
    /// Figure size in inches (width, height).
    pub figsize: (f64, f64),
    /// Pixels per inch.
    pub dpi: u32,
    /// Draw grid lines.
    pub grid: bool,
    /// Horizontal bars (bar chart only).
    pub horizontal: bool,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            title: None,
            color: DEFAULT_COLOR.to_string(),
            colormap: "coolwarm".to_string(),
            font_size: 12,
            figsize: (6.4, 4.8),
            dpi: 100,
            grid: false,
            horizontal: false,
        }
    }
}

impl ChartStyle {
    /// Output size in pixels, at most [`MAX_CANVAS_SIDE`] per side.
    pub fn pixel_size(&self) -> Result<(u32, u32), VisualizeError> {
        let dpi = f64::from(self.dpi);
        let w = (self.figsize.0 * dpi).round().max(100.0);
        let h = (self.figsize.1 * dpi).round().max(100.0);
        let max = f64::from(MAX_CANVAS_SIDE);
        if w > max || h > max {
            return Err(VisualizeError::Render(format!(
                "figure of {:.0}x{:.0} pixels exceeds the {}x{} limit",
                w, h, MAX_CANVAS_SIDE, MAX_CANVAS_SIDE
            )));
        }
        if self.font_size == 0 || self.font_size > MAX_FONT_SIZE {
            return Err(VisualizeError::Render(format!(
                "font size {} is outside 1..={}",
                self.font_size, MAX_FONT_SIZE
            )));
        }
        Ok((w as u32, h as u32))
    }

    /// Label area of `factor` base font sizes.
    pub fn label_area(&self, factor: u32) -> u32 {
        self.font_size.saturating_mul(factor)
    }

    /// Sans-serif font scaled relative to the base font size.
    pub fn font(&self, scale: f64) -> FontDesc<'static> {
        FontDesc::new(
            FontFamily::SansSerif,
            f64::from(self.font_size) * scale,
            FontStyle::Normal,
        )
    }

    pub fn series_color(&self) -> Result<RGBColor, VisualizeError> {
        parse_color(&self.color)
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }
}

/// Parse `#rrggbb`, `#rgb` or a common color name.
pub fn parse_color(value: &str) -> Result<RGBColor, VisualizeError> {
    let v = value.trim().to_ascii_lowercase();
    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| bad_color(value));
    }

    let rgb = match v.as_str() {
        "blue" | "tab:blue" | "b" => (31, 119, 180),
        "orange" | "tab:orange" => (255, 127, 14),
        "green" | "tab:green" | "g" => (44, 160, 44),
        "red" | "tab:red" | "r" => (214, 39, 40),
        "purple" | "tab:purple" => (148, 103, 189),
        "brown" | "tab:brown" => (140, 86, 75),
        "pink" | "tab:pink" => (227, 119, 194),
        "gray" | "grey" | "tab:gray" => (127, 127, 127),
        "olive" | "tab:olive" => (188, 189, 34),
        "cyan" | "tab:cyan" | "c" => (23, 190, 207),
        "black" | "k" => (0, 0, 0),
        "white" | "w" => (255, 255, 255),
        "yellow" | "y" => (255, 215, 0),
        "magenta" | "m" => (255, 0, 255),
        "navy" => (0, 0, 128),
        "teal" => (0, 128, 128),
        "skyblue" => (135, 206, 235),
        "steelblue" => (70, 130, 180),
        "salmon" => (250, 128, 114),
        _ => return Err(bad_color(value)),
    };
    Ok(RGBColor(rgb.0, rgb.1, rgb.2))
}

fn parse_hex(hex: &str) -> Option<RGBColor> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(RGBColor(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1]).map(|c| c * 17);
            Some(RGBColor(expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}

fn bad_color(value: &str) -> VisualizeError {
    VisualizeError::Render(format!("invalid color '{}'", value))
}

/// Color map for values in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    Coolwarm,
    Viridis,
    Greys,
}

impl Colormap {
    pub fn parse(name: &str) -> Result<Self, VisualizeError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "coolwarm" => Ok(Colormap::Coolwarm),
            "viridis" => Ok(Colormap::Viridis),
            "greys" | "grays" => Ok(Colormap::Greys),
            other => Err(VisualizeError::Render(format!("unknown colormap '{}'", other))),
        }
    }

    fn stops(self) -> &'static [(u8, u8, u8)] {
        match self {
            Colormap::Coolwarm => &[(59, 76, 192), (221, 221, 221), (180, 4, 38)],
            Colormap::Viridis => &[
                (68, 1, 84),
                (59, 82, 139),
                (33, 145, 140),
                (94, 201, 98),
                (253, 231, 37),
            ],
            Colormap::Greys => &[(255, 255, 255), (0, 0, 0)],
        }
    }

    /// Color for `value` on the fixed scale `[-1, 1]`; NaN maps to white.
    pub fn color(self, value: f64) -> RGBColor {
        if value.is_nan() {
            return RGBColor(255, 255, 255);
        }
        let t = ((value.clamp(-1.0, 1.0) + 1.0) / 2.0).clamp(0.0, 1.0);
        let stops = self.stops();
        let scaled = t * (stops.len() - 1) as f64;
        let lo = (scaled.floor() as usize).min(stops.len() - 2);
        let frac = scaled - lo as f64;
        let lerp = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * frac).round() as u8;
        let (a, b) = (stops[lo], stops[lo + 1]);
        RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
    }
}

/// Ensure the reports directory exists and return the chart's output path.
pub fn chart_path(reports_dir: &Path, chart_name: &str) -> Result<PathBuf, VisualizeError> {
    std::fs::create_dir_all(reports_dir)?;
    Ok(reports_dir.join(format!("{chart_name}.png")))
}

pub(crate) fn render_err<E: std::fmt::Display>(e: E) -> VisualizeError {
    VisualizeError::Render(e.to_string())
}
