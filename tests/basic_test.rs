use grade_tracker::analytics::required_next_grade;
use grade_tracker::model::{EXPLAIN_LINEAR_TREND, EXPLAIN_NO_DATA};
use grade_tracker::{GradingConfig, History, TrendPredictor};

fn predictor() -> TrendPredictor {
    TrendPredictor::new(GradingConfig::default())
}

#[test]
fn test_empty_history() {
    let result = predictor().predict(&History::default());
    assert!(result.prediction.is_none());
    assert!(result.baseline_average.is_none());
    assert_eq!(result.explanation, EXPLAIN_NO_DATA);
}

#[test]
fn test_single_observation() {
    let result = predictor().predict(&History::from_grades([8.5]));
    assert_eq!(result.prediction, Some(8.5));
    assert_eq!(result.baseline_average, Some(8.5));
}

#[test]
fn test_constant_grades_predict_same_grade() {
    let history = History::from_timestamps([(10.0, 7.0), (25.0, 7.0), (31.0, 7.0), (90.0, 7.0)]);
    let line = predictor().fit(&history).unwrap();
    assert_eq!(line.slope, 0.0);
    assert_eq!(predictor().predict(&history).prediction, Some(7.0));
}

#[test]
fn test_linear_history() {
    let history = History::from_timestamps([(0.0, 6.0), (1.0, 7.0), (2.0, 8.0)]);
    let result = predictor().predict(&history);
    assert_eq!(result.prediction, Some(9.0));
    assert_eq!(result.baseline_average, Some(7.0));
    assert_eq!(result.explanation, EXPLAIN_LINEAR_TREND);
}

#[test]
fn test_prediction_clipped_to_max() {
    let history = History::from_timestamps([(0.0, 6.0), (1.0, 9.0), (2.0, 10.0)]);
    assert_eq!(predictor().predict(&history).prediction, Some(10.0));
}

#[test]
fn test_required_grade_policy() {
    let grading = GradingConfig::default();
    assert_eq!(required_next_grade(&[10.0, 10.0], &grading), Some(6.0));
    assert_eq!(required_next_grade(&[6.0, 6.0], &grading), None);
}

#[test]
fn test_prediction_is_repeatable() {
    let history = History::from_grades([6.0, 9.5, 7.0, 8.0]);
    assert_eq!(predictor().predict(&history), predictor().predict(&history));
}
