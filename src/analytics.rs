use serde::{Deserialize, Serialize};

use crate::config::GradingConfig;
use crate::database::{Student, Subject};
use crate::model::round2;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct StudentSummary {
    #[serde(flatten)]
    pub student: Student,
    pub avg: f64,
    pub subjects_count: usize,
    pub has_fail: bool,
}

/// Name and average of the best or worst student; `"-"` / `0` when the class is empty.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct AverageHolder {
    pub name: String,
    pub avg: f64,
}

#[derive(Serialize, Clone, Debug)]
pub struct ClassOverview {
    pub students: Vec<StudentSummary>,
    pub avg_all: f64,
    pub highest_avg_student: AverageHolder,
    pub lowest_avg_student: AverageHolder,
    pub search: String,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Serialize, Clone, Debug)]
pub struct StudentReport {
    pub student: Student,
    pub subjects: Vec<Subject>,
    pub avg: f64,
    pub search: String,
    pub sort: SortOrder,
    pub target_avg: f64,
    pub required_grade: Option<f64>,
    pub weak_subjects: Vec<Subject>,
}

/// Mean rounded to two decimals, `0.0` for no grades.
pub fn average(grades: &[f64]) -> f64 {
    if grades.is_empty() {
        return 0.0;
    }
    round2(grades.iter().sum::<f64>() / grades.len() as f64)
}

/// Grade needed on one more subject for the new average to reach `target_average`.
///
/// `None` means no single grade within bounds achieves it.
pub fn required_next_grade(grades: &[f64], grading: &GradingConfig) -> Option<f64> {
    if grades.is_empty() {
        return Some(grading.target_average);
    }
    let sum: f64 = grades.iter().sum();
    let required = grading.target_average * (grades.len() as f64 + 1.0) - sum;
    if required > grading.max_grade {
        None
    } else if required < grading.min_grade {
        Some(grading.min_grade)
    } else {
        Some(round2(required))
    }
}

pub fn has_fail(grades: &[f64], grading: &GradingConfig) -> bool {
    grades.iter().any(|&g| g < grading.min_grade)
}

pub fn weak_subjects(subjects: &[Subject], grading: &GradingConfig) -> Vec<Subject> {
    subjects
        .iter()
        .filter(|s| s.grade < grading.weak_threshold)
        .cloned()
        .collect()
}

pub fn summarize_student(student: Student, subjects: &[Subject], grading: &GradingConfig) -> StudentSummary {
    let grades: Vec<f64> = subjects.iter().map(|s| s.grade).collect();
    StudentSummary {
        student,
        avg: average(&grades),
        subjects_count: subjects.len(),
        has_fail: has_fail(&grades, grading),
    }
}

pub fn class_overview(students: Vec<StudentSummary>, search: &str) -> ClassOverview {
    let placeholder = || AverageHolder { name: "-".to_string(), avg: 0.0 };
    let holder = |s: &StudentSummary| AverageHolder { name: s.student.name.clone(), avg: s.avg };

    // First student wins ties, in both directions.
    let highest = students.iter().fold(None::<&StudentSummary>, |best, s| match best {
        Some(b) if b.avg >= s.avg => Some(b),
        _ => Some(s),
    });
    let lowest = students.iter().fold(None::<&StudentSummary>, |worst, s| match worst {
        Some(w) if w.avg <= s.avg => Some(w),
        _ => Some(s),
    });

    let avg_all = if students.is_empty() {
        0.0
    } else {
        round2(students.iter().map(|s| s.avg).sum::<f64>() / students.len() as f64)
    };

    ClassOverview {
        highest_avg_student: highest.map(holder).unwrap_or_else(placeholder),
        lowest_avg_student: lowest.map(holder).unwrap_or_else(placeholder),
        avg_all,
        students,
        search: search.to_string(),
    }
}

pub fn student_report(
    student: Student,
    mut subjects: Vec<Subject>,
    search: &str,
    sort: SortOrder,
    grading: &GradingConfig,
) -> StudentReport {
    subjects.sort_by(|a, b| match sort {
        SortOrder::Asc => a.grade.total_cmp(&b.grade),
        SortOrder::Desc => b.grade.total_cmp(&a.grade),
    });
    let grades: Vec<f64> = subjects.iter().map(|s| s.grade).collect();

    StudentReport {
        avg: average(&grades),
        required_grade: required_next_grade(&grades, grading),
        weak_subjects: weak_subjects(&subjects, grading),
        target_avg: grading.target_average,
        search: search.to_string(),
        sort,
        student,
        subjects,
    }
}
