//! Static SVG chart rendering.
//!
//! Draws one faint line per item, the smoothed mean as an emphasized line
//! with point markers, and the ±1 standard deviation band as a shaded area.

use super::chart::{contiguous_runs, extent, ChartSpec, LinearScale};
use crate::analysis::group_by_item;
use crate::models::{AggregateRow, LongRecord};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 70.0;

const ITEM_COLOR: &str = "gray";
const TREND_COLOR: &str = "red";
const Y_TICKS: usize = 6;
const MAX_X_TICKS: usize = 20;

/// Render the static chart as an SVG document.
pub fn render_static_chart(
    long_records: &[LongRecord],
    rows: &[AggregateRow],
    spec: &ChartSpec,
) -> String {
    let width = f64::from(spec.width.max(200));
    let height = f64::from(spec.height.max(150));
    let plot_right = width - MARGIN_RIGHT;
    let plot_bottom = height - MARGIN_BOTTOM;

    let x_domain = extent(rows.iter().map(|r| r.position_index as f64)).unwrap_or((0.0, 1.0));
    let x = LinearScale::new(x_domain, (MARGIN_LEFT, plot_right));
    let y = LinearScale::new(y_domain(long_records, rows), (plot_bottom, MARGIN_TOP));

    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"sans-serif\">\n",
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        "<rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"white\"/>\n",
        width, height
    ));

    svg.push_str(&generate_grid(rows, &x, &y, plot_right, plot_bottom));
    svg.push_str(&generate_item_lines(long_records, &x, &y));
    svg.push_str(&generate_band(rows, &x, &y));
    svg.push_str(&generate_trend_line(rows, &x, &y));
    svg.push_str(&generate_labels(spec, width, height, plot_bottom));
    svg.push_str(&generate_legend(plot_right));

    svg.push_str("</svg>\n");
    svg
}

/// Render the static chart into `dir`, returning the written path.
pub fn write_static_chart(
    long_records: &[LongRecord],
    rows: &[AggregateRow],
    spec: &ChartSpec,
    dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = dir.join(format!("{}.svg", spec.file_stem()));
    let content = render_static_chart(long_records, rows, spec);
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write chart to {}", path.display()))?;

    info!("Static chart written to {}", path.display());
    Ok(path)
}

/// Value range covering every item value and the band, padded by 5%.
fn y_domain(long_records: &[LongRecord], rows: &[AggregateRow]) -> (f64, f64) {
    let values = long_records
        .iter()
        .filter_map(|r| r.value)
        .chain(rows.iter().flat_map(|r| [r.smoothed_mean, r.upper, r.lower]).flatten());

    match extent(values) {
        Some((lo, hi)) => {
            let pad = ((hi - lo) * 0.05).max(1e-9);
            (lo - pad, hi + pad)
        }
        None => (0.0, 1.0),
    }
}

fn generate_grid(
    rows: &[AggregateRow],
    x: &LinearScale,
    y: &LinearScale,
    plot_right: f64,
    plot_bottom: f64,
) -> String {
    let mut section = String::new();
    section.push_str("<g class=\"grid\" stroke=\"#dddddd\" stroke-width=\"1\">\n");

    let stride = rows.len().div_ceil(MAX_X_TICKS).max(1);
    let mut x_labels = String::new();
    for row in rows.iter().step_by(stride) {
        let px = x.map(row.position_index as f64);
        section.push_str(&format!(
            "<line x1=\"{px:.2}\" y1=\"{:.2}\" x2=\"{px:.2}\" y2=\"{:.2}\"/>\n",
            MARGIN_TOP, plot_bottom
        ));
        x_labels.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"12\" text-anchor=\"middle\">{}</text>\n",
            px,
            plot_bottom + 18.0,
            row.position_index
        ));
    }

    let (lo, hi) = y.domain();
    let step = (hi - lo) / (Y_TICKS - 1) as f64;
    let decimals = tick_decimals(step);
    let mut y_labels = String::new();
    for i in 0..Y_TICKS {
        let value = lo + step * i as f64;
        let py = y.map(value);
        section.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{py:.2}\" x2=\"{:.2}\" y2=\"{py:.2}\"/>\n",
            MARGIN_LEFT, plot_right
        ));
        y_labels.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"12\" text-anchor=\"end\">{:.*}</text>\n",
            MARGIN_LEFT - 8.0,
            py + 4.0,
            decimals,
            value
        ));
    }
    section.push_str("</g>\n");

    section.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"black\"/>\n",
        MARGIN_LEFT,
        MARGIN_TOP,
        plot_right - MARGIN_LEFT,
        plot_bottom - MARGIN_TOP
    ));
    section.push_str(&x_labels);
    section.push_str(&y_labels);

    section
}

/// Decimal places that keep neighbouring tick labels distinct.
fn tick_decimals(step: f64) -> usize {
    if step <= 0.0 || !step.is_finite() {
        return 2;
    }
    (1.0 - step.log10().floor()).clamp(0.0, 6.0) as usize
}

fn generate_item_lines(long_records: &[LongRecord], x: &LinearScale, y: &LinearScale) -> String {
    let mut section = String::new();
    section.push_str(&format!(
        "<g class=\"items\" fill=\"none\" stroke=\"{}\" stroke-opacity=\"0.4\" stroke-width=\"1\">\n",
        ITEM_COLOR
    ));

    let items = group_by_item(long_records);
    debug!("Drawing {} item lines", items.len());

    for (item_id, points) in &items {
        for run in contiguous_runs(points) {
            section.push_str(&format!(
                "<polyline points=\"{}\"><title>{}</title></polyline>\n",
                polyline_points(&run, x, y),
                escape_xml(item_id)
            ));
        }
    }

    section.push_str("</g>\n");
    section
}

fn generate_band(rows: &[AggregateRow], x: &LinearScale, y: &LinearScale) -> String {
    let mut section = String::new();
    section.push_str(&format!(
        "<g class=\"band\" fill=\"{}\" fill-opacity=\"0.2\" stroke=\"none\">\n",
        TREND_COLOR
    ));

    let band: Vec<(i64, Option<(f64, f64)>)> =
        rows.iter().map(|r| (r.position_index, r.band())).collect();

    for run in contiguous_runs(&band) {
        let upper: Vec<(i64, f64)> = run.iter().map(|&(p, (_, hi))| (p, hi)).collect();
        let lower: Vec<(i64, f64)> = run.iter().rev().map(|&(p, (lo, _))| (p, lo)).collect();
        section.push_str(&format!(
            "<polygon points=\"{} {}\"/>\n",
            polyline_points(&upper, x, y),
            polyline_points(&lower, x, y)
        ));
    }

    section.push_str("</g>\n");
    section
}

fn generate_trend_line(rows: &[AggregateRow], x: &LinearScale, y: &LinearScale) -> String {
    let mut section = String::new();
    section.push_str(&format!(
        "<g class=\"trend\" stroke=\"{c}\" fill=\"{c}\">\n",
        c = TREND_COLOR
    ));

    let smoothed: Vec<(i64, Option<f64>)> = rows
        .iter()
        .map(|r| (r.position_index, r.smoothed_mean))
        .collect();

    for run in contiguous_runs(&smoothed) {
        section.push_str(&format!(
            "<polyline points=\"{}\" fill=\"none\" stroke-width=\"2\"/>\n",
            polyline_points(&run, x, y)
        ));
        for &(position, value) in &run {
            section.push_str(&format!(
                "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"4\"/>\n",
                x.map(position as f64),
                y.map(value)
            ));
        }
    }

    section.push_str("</g>\n");
    section
}

fn generate_labels(spec: &ChartSpec, width: f64, height: f64, plot_bottom: f64) -> String {
    let mut section = String::new();
    let center_x = MARGIN_LEFT + (width - MARGIN_LEFT - MARGIN_RIGHT) / 2.0;
    let center_y = MARGIN_TOP + (plot_bottom - MARGIN_TOP) / 2.0;

    section.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"18\" text-anchor=\"middle\">{}</text>\n",
        center_x,
        MARGIN_TOP / 2.0 + 6.0,
        escape_xml(&spec.title)
    ));
    section.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"14\" text-anchor=\"middle\">{}</text>\n",
        center_x,
        height - 20.0,
        escape_xml(&spec.x_label)
    ));
    section.push_str(&format!(
        "<text x=\"20\" y=\"{cy:.2}\" font-size=\"14\" text-anchor=\"middle\" transform=\"rotate(-90 20 {cy:.2})\">{}</text>\n",
        escape_xml(&spec.y_label),
        cy = center_y
    ));

    section
}

fn generate_legend(plot_right: f64) -> String {
    let left = plot_right - 170.0;
    let top = MARGIN_TOP + 10.0;
    let mut section = String::new();

    section.push_str(&format!(
        "<g class=\"legend\" font-size=\"12\">\n<rect x=\"{:.2}\" y=\"{:.2}\" width=\"160\" height=\"52\" fill=\"white\" fill-opacity=\"0.8\" stroke=\"#cccccc\"/>\n",
        left, top
    ));
    section.push_str(&format!(
        "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{c}\" stroke-width=\"2\"/>\n<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"4\" fill=\"{c}\"/>\n",
        left + 10.0,
        top + 16.0,
        left + 40.0,
        top + 16.0,
        left + 25.0,
        top + 16.0,
        c = TREND_COLOR
    ));
    section.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\">Smoothed Average</text>\n",
        left + 48.0,
        top + 20.0
    ));
    section.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"30\" height=\"10\" fill=\"{}\" fill-opacity=\"0.2\"/>\n",
        left + 10.0,
        top + 31.0,
        TREND_COLOR
    ));
    section.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\">±1 Std Dev</text>\n</g>\n",
        left + 48.0,
        top + 40.0
    ));

    section
}

fn polyline_points(points: &[(i64, f64)], x: &LinearScale, y: &LinearScale) -> String {
    points
        .iter()
        .map(|&(position, value)| format!("{:.2},{:.2}", x.map(position as f64), y.map(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
