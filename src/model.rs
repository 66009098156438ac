use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::GradingConfig;

pub const EXPLAIN_NO_DATA: &str = "no data";
pub const EXPLAIN_SINGLE_POINT: &str = "insufficient history, trend undefined.";
pub const EXPLAIN_LINEAR_TREND: &str = "prediction based on linear trend of historical grades.";

/// Which quantity is used as the x coordinate of a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XSource {
    #[default]
    Timestamp,
    Ordinal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub position: f64,
    pub grade: f64,
}

/// Chronologically ordered grades of one student.
///
/// A history is built either from timestamps or from ordinal positions, never a mix of both.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct History {
    source: XSource,
    observations: Vec<Observation>,
}

impl History {
    pub fn from_timestamps<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let observations = points
            .into_iter()
            .map(|(position, grade)| Observation { position, grade })
            .collect();
        Self { source: XSource::Timestamp, observations }
    }

    pub fn from_grades<I>(grades: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let observations = grades
            .into_iter()
            .enumerate()
            .map(|(idx, grade)| Observation { position: idx as f64, grade })
            .collect();
        Self { source: XSource::Ordinal, observations }
    }

    pub fn source(&self) -> XSource {
        self.source
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn grades(&self) -> impl Iterator<Item = f64> + '_ {
        self.observations.iter().map(|o| o.grade)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: Option<f64>,
    pub baseline_average: Option<f64>,
    pub explanation: String,
}

/// Least-squares line through a history, plus the position it extrapolates to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    pub next_x: f64,
}

impl TrendLine {
    pub fn value_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy)]
pub struct TrendPredictor {
    grading: GradingConfig,
}

impl TrendPredictor {
    pub fn new(grading: GradingConfig) -> Self {
        Self { grading }
    }

    /// Fits `grade = slope * x + intercept`. Needs at least two observations.
    pub fn fit(&self, history: &History) -> Option<TrendLine> {
        let n = history.len();
        if n < 2 {
            return None;
        }

        let xs = Array1::from_iter(history.observations().iter().map(|o| o.position));
        let ys = Array1::from_iter(history.grades());
        let count = n as f64;

        let x_mean = xs.sum() / count;
        let y_mean = ys.sum() / count;
        let dx = &xs - x_mean;
        let dy = &ys - y_mean;

        let numerator = dx.dot(&dy);
        let denominator = dx.dot(&dx);
        let slope = if denominator != 0.0 { numerator / denominator } else { 0.0 };
        let intercept = y_mean - slope * x_mean;

        // Mean of consecutive gaps; the sum telescopes to last - first.
        let average_gap = (xs[n - 1] - xs[0]) / (count - 1.0);
        let next_x = xs[n - 1] + average_gap;

        Some(TrendLine { slope, intercept, next_x })
    }

    pub fn predict(&self, history: &History) -> PredictionResult {
        if history.is_empty() {
            return PredictionResult {
                prediction: None,
                baseline_average: None,
                explanation: EXPLAIN_NO_DATA.to_string(),
            };
        }

        let baseline = round2(history.grades().sum::<f64>() / history.len() as f64);

        match self.fit(history) {
            None => {
                let only = history.observations()[0].grade;
                PredictionResult {
                    prediction: Some(only),
                    baseline_average: Some(baseline),
                    explanation: EXPLAIN_SINGLE_POINT.to_string(),
                }
            }
            Some(line) => {
                let raw = line.value_at(line.next_x);
                let clipped = raw.max(self.grading.min_grade).min(self.grading.max_grade);
                log::debug!(
                    "trend fit over {} points: slope={:.4} intercept={:.4} raw={:.4}",
                    history.len(),
                    line.slope,
                    line.intercept,
                    raw
                );
                PredictionResult {
                    prediction: Some(round2(clipped)),
                    baseline_average: Some(baseline),
                    explanation: EXPLAIN_LINEAR_TREND.to_string(),
                }
            }
        }
    }
}
