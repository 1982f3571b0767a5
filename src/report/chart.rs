//! Shared chart plumbing for the static and interactive renderers.

use crate::config::Config;

/// Labels and dimensions shared by both renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Metric name, used for output file names.
    pub focus: String,
    pub width: u32,
    pub height: u32,
}

impl ChartSpec {
    /// Build the chart labels from the merged configuration.
    pub fn from_config(config: &Config) -> Self {
        let focus = config.analysis.focus_metric_name.clone();
        Self {
            title: config.render.title.clone(),
            x_label: config.render.x_label.clone(),
            y_label: title_case(&format!("{} proportion", focus)),
            focus,
            width: config.render.width,
            height: config.render.height,
        }
    }

    /// File stem for rendered charts, e.g. `uncertainty_trajectory`.
    pub fn file_stem(&self) -> String {
        let metric: String = self
            .focus
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if metric.is_empty() {
            "trajectory".to_string()
        } else {
            format!("{}_trajectory", metric)
        }
    }
}

/// Capitalize the first letter of every word and lowercase the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// A point value that can be placed on the chart.
pub trait Plottable: Copy {
    fn is_plottable(&self) -> bool;
}

impl Plottable for f64 {
    fn is_plottable(&self) -> bool {
        self.is_finite()
    }
}

impl Plottable for (f64, f64) {
    fn is_plottable(&self) -> bool {
        self.0.is_finite() && self.1.is_finite()
    }
}

/// Split a position-ordered series into runs of consecutive defined points.
///
/// Lines are drawn per run so that undefined or non-finite points leave a gap.
pub fn contiguous_runs<T: Plottable>(points: &[(i64, Option<T>)]) -> Vec<Vec<(i64, T)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for &(position, value) in points {
        match value.filter(|v| v.is_plottable()) {
            Some(v) => current.push((position, v)),
            None => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Maps a data interval onto a pixel interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    /// A degenerate domain is widened by half a unit on each side.
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        let domain = if domain.1 - domain.0 <= f64::EPSILON {
            (domain.0 - 0.5, domain.1 + 0.5)
        } else {
            domain
        };
        Self { domain, range }
    }

    pub fn map(&self, value: f64) -> f64 {
        let t = (value - self.domain.0) / (self.domain.1 - self.domain.0);
        self.range.0 + t * (self.range.1 - self.range.0)
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }
}

/// Min and max of the given values, `None` when there are none.
pub fn extent<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values.into_iter().filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("uncertainty proportion"), "Uncertainty Proportion");
        assert_eq!(title_case("HEDGING rate"), "Hedging Rate");
        assert_eq!(title_case("self-disclosure"), "Self-Disclosure");
    }

    #[test]
    fn test_chart_spec_from_config() {
        let spec = ChartSpec::from_config(&Config::default());
        assert_eq!(spec.y_label, "Uncertainty Proportion");
        assert_eq!(spec.x_label, "Decile of Conversation Time");
        assert_eq!(spec.file_stem(), "uncertainty_trajectory");
    }

    #[test]
    fn test_contiguous_runs() {
        let points = vec![
            (0, Some(1.0)),
            (1, Some(2.0)),
            (2, None),
            (3, Some(4.0)),
            (4, None),
        ];
        let runs = contiguous_runs(&points);
        assert_eq!(runs, vec![vec![(0, 1.0), (1, 2.0)], vec![(3, 4.0)]]);
        assert!(contiguous_runs::<f64>(&[(0, None)]).is_empty());
    }

    #[test]
    fn test_contiguous_runs_split_on_non_finite() {
        let points = vec![
            (0, Some(1.0)),
            (1, Some(f64::NAN)),
            (2, Some(2.0)),
            (3, Some(f64::NEG_INFINITY)),
            (4, Some(3.0)),
        ];
        let runs = contiguous_runs(&points);
        assert_eq!(runs, vec![vec![(0, 1.0)], vec![(2, 2.0)], vec![(4, 3.0)]]);

        let band = vec![(0, Some((0.0, 1.0))), (1, Some((f64::NAN, 1.0)))];
        assert_eq!(contiguous_runs(&band), vec![vec![(0, (0.0, 1.0))]]);
    }

    #[test]
    fn test_linear_scale() {
        let scale = LinearScale::new((0.0, 10.0), (100.0, 200.0));
        assert_eq!(scale.map(5.0), 150.0);

        let inverted = LinearScale::new((0.0, 1.0), (500.0, 100.0));
        assert_eq!(inverted.map(1.0), 100.0);

        let flat = LinearScale::new((3.0, 3.0), (0.0, 10.0));
        assert_eq!(flat.domain(), (2.5, 3.5));
        assert_eq!(flat.map(3.0), 5.0);
    }

    #[test]
    fn test_extent() {
        assert_eq!(extent(vec![3.0, -1.0, f64::NAN, 2.0]), Some((-1.0, 3.0)));
        assert_eq!(extent(Vec::<f64>::new()), None);
    }
}
