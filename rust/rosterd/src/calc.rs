use crate::model::SubjectMark;

/// Letter grade bands, highest first. A mark at or above the bound earns the grade.
const GRADE_BANDS: [(f64, &str); 7] = [
    (91.0, "A1"),
    (81.0, "A2"),
    (71.0, "B1"),
    (61.0, "B2"),
    (51.0, "C1"),
    (41.0, "C2"),
    (33.0, "D"),
];

const LOWEST_GRADE: &str = "E";

/// One-decimal rounding used for percentages: `floor(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

pub fn grade_for(marks: f64) -> &'static str {
    GRADE_BANDS
        .iter()
        .find(|(bound, _)| marks >= *bound)
        .map(|(_, grade)| *grade)
        .unwrap_or(LOWEST_GRADE)
}

pub fn subject_mark(name: &str, marks: f64) -> SubjectMark {
    SubjectMark {
        name: name.to_string(),
        marks,
        grade: grade_for(marks).to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overall {
    pub percentage: f64,
    pub grade: String,
}

/// Mean of the given subjects' marks, rounded to one decimal. No subjects yields 0 / E.
pub fn overall(subjects: &[SubjectMark]) -> Overall {
    let percentage = if subjects.is_empty() {
        0.0
    } else {
        let total: f64 = subjects.iter().map(|s| s.marks).sum();
        round_off_1_decimal(total / subjects.len() as f64)
    };
    Overall {
        percentage,
        grade: grade_for(percentage).to_string(),
    }
}
