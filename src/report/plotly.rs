//! Interactive HTML chart rendering.
//!
//! The figure is a Plotly.js JSON document: one line trace per item, the
//! smoothed mean, and a band made of an `upper` boundary trace followed by a
//! `lower` trace filled back to it.

use super::chart::ChartSpec;
use crate::analysis::group_by_item;
use crate::models::{AggregateRow, LongRecord};
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::info;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const BAND_FILL: &str = "rgba(255,0,0,0.2)";

/// Build the Plotly figure (`{"data": [...], "layout": {...}}`).
pub fn build_figure(
    long_records: &[LongRecord],
    rows: &[AggregateRow],
    spec: &ChartSpec,
) -> Value {
    let mut traces: Vec<Value> = group_by_item(long_records)
        .into_iter()
        .map(|(item_id, points)| {
            let (x, y): (Vec<i64>, Vec<Option<f64>>) = points
                .into_iter()
                .map(|(position, value)| (position, value.filter(|v| v.is_finite())))
                .unzip();
            json!({
                "type": "scatter",
                "mode": "lines",
                "name": item_id,
                "legendgroup": item_id,
                "x": x,
                "y": y,
                "opacity": 0.3,
            })
        })
        .collect();

    let (trend_x, trend_y): (Vec<i64>, Vec<f64>) = rows
        .iter()
        .filter_map(|r| Some((r.position_index, r.smoothed_mean?)))
        .unzip();
    traces.push(json!({
        "type": "scatter",
        "mode": "lines+markers",
        "name": "Smoothed Average",
        "x": trend_x,
        "y": trend_y,
        "line": { "color": "red", "width": 3 },
    }));

    let band: Vec<(i64, f64, f64)> = rows
        .iter()
        .filter_map(|r| r.band().map(|(lo, hi)| (r.position_index, lo, hi)))
        .collect();
    let band_x: Vec<i64> = band.iter().map(|b| b.0).collect();
    let band_lower: Vec<f64> = band.iter().map(|b| b.1).collect();
    let band_upper: Vec<f64> = band.iter().map(|b| b.2).collect();
    traces.push(json!({
        "type": "scatter",
        "mode": "lines",
        "x": band_x,
        "y": band_upper,
        "line": { "color": "red", "width": 0 },
        "showlegend": false,
        "hoverinfo": "skip",
    }));
    traces.push(json!({
        "type": "scatter",
        "mode": "lines",
        "name": "±1 Std Dev",
        "x": band_x,
        "y": band_lower,
        "line": { "color": "red", "width": 0 },
        "fill": "tonexty",
        "fillcolor": BAND_FILL,
    }));

    json!({
        "data": traces,
        "layout": {
            "title": { "text": spec.title },
            "xaxis": { "title": { "text": spec.x_label } },
            "yaxis": { "title": { "text": spec.y_label } },
            "hovermode": "closest",
        },
    })
}

/// Render the interactive chart as a standalone HTML page.
pub fn render_interactive_chart(
    long_records: &[LongRecord],
    rows: &[AggregateRow],
    spec: &ChartSpec,
) -> Result<String> {
    let figure = build_figure(long_records, rows, spec);
    let figure_json = serde_json::to_string(&figure)
        .context("Failed to serialize chart figure")?
        .replace("</", "<\\/");

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(&spec.title)));
    html.push_str(&format!(
        "<script src=\"{}\" charset=\"utf-8\"></script>\n",
        PLOTLY_CDN
    ));
    html.push_str("</head>\n<body>\n");
    html.push_str("<div id=\"trajectory\" style=\"width:100%;height:90vh;\"></div>\n");
    html.push_str("<script>\n");
    html.push_str(&format!("const figure = {};\n", figure_json));
    html.push_str(
        "Plotly.newPlot('trajectory', figure.data, figure.layout, {responsive: true});\n",
    );
    html.push_str("</script>\n");
    html.push_str(&format!(
        "<p style=\"font-family:sans-serif;font-size:small;color:#888\">Generated {}</p>\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</body>\n</html>\n");

    Ok(html)
}

/// Render the interactive chart into `dir`, returning the written path.
pub fn write_interactive_chart(
    long_records: &[LongRecord],
    rows: &[AggregateRow],
    spec: &ChartSpec,
    dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = dir.join(format!("{}.html", spec.file_stem()));
    let content = render_interactive_chart(long_records, rows, spec)?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write chart to {}", path.display()))?;

    info!("Interactive chart written to {}", path.display());
    Ok(path)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
