//! Report generation: static and interactive charts plus the summary table.

pub mod chart;
pub mod plotly;
pub mod summary;
pub mod svg;

pub use chart::ChartSpec;
pub use plotly::write_interactive_chart;
pub use summary::{generate_json_summary, generate_text_summary};
pub use svg::write_static_chart;
