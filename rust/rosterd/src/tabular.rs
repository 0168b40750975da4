//! Flattened one-row-per-student spreadsheet format.
//!
//! Export writes the fixed column contract below; import reads it back,
//! recomputing grades from marks and filling blank optional cells from
//! [`ImportDefaults`].

use crate::calc;
use crate::kv::KeyValueStore;
use crate::model::{AcademicRecord, Guardian, ParentDetails, StudentRecord, SubjectMark};
use crate::sheet::{Sheet, SheetRow};
use crate::students::StudentRepository;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const COL_NAME: &str = "Student Name";
pub const COL_CLASS: &str = "Class";
pub const COL_SECTION: &str = "Section";
pub const COL_ROLL: &str = "Roll Number";
pub const COL_DOB: &str = "Date of Birth";
pub const COL_BLOOD: &str = "Blood Group";
pub const COL_HOUSE: &str = "House";
pub const COL_ADDRESS: &str = "Address";
pub const COL_ID_MARK: &str = "Identification Mark";
pub const COL_HOBBIES: &str = "Hobbies";
pub const COL_ACHIEVEMENTS: &str = "Achievements";
pub const COL_PHOTO: &str = "Photo URL";
pub const COL_FATHER_NAME: &str = "Father Name";
pub const COL_FATHER_OCCUPATION: &str = "Father Occupation";
pub const COL_FATHER_CONTACT: &str = "Father Contact";
pub const COL_FATHER_EMAIL: &str = "Father Email";
pub const COL_FATHER_PHOTO: &str = "Father Photo URL";
pub const COL_MOTHER_NAME: &str = "Mother Name";
pub const COL_MOTHER_OCCUPATION: &str = "Mother Occupation";
pub const COL_MOTHER_CONTACT: &str = "Mother Contact";
pub const COL_MOTHER_EMAIL: &str = "Mother Email";
pub const COL_MOTHER_PHOTO: &str = "Mother Photo URL";
pub const COL_EMERGENCY: &str = "Emergency Contact";
pub const COL_SEMESTER: &str = "Latest Semester";
pub const COL_PERCENTAGE: &str = "Latest Percentage";
pub const COL_GRADE: &str = "Latest Grade";

/// Subjects with a `<name> Marks` column, in column order.
pub const SUBJECTS: [&str; 9] = [
    "Mathematics",
    "Science",
    "English",
    "Hindi",
    "Social Studies",
    "Computer Science",
    "Physics",
    "Chemistry",
    "Biology",
];

const BASE_COLUMNS: [&str; 26] = [
    COL_NAME,
    COL_CLASS,
    COL_SECTION,
    COL_ROLL,
    COL_DOB,
    COL_BLOOD,
    COL_HOUSE,
    COL_ADDRESS,
    COL_ID_MARK,
    COL_HOBBIES,
    COL_ACHIEVEMENTS,
    COL_PHOTO,
    COL_FATHER_NAME,
    COL_FATHER_OCCUPATION,
    COL_FATHER_CONTACT,
    COL_FATHER_EMAIL,
    COL_FATHER_PHOTO,
    COL_MOTHER_NAME,
    COL_MOTHER_OCCUPATION,
    COL_MOTHER_CONTACT,
    COL_MOTHER_EMAIL,
    COL_MOTHER_PHOTO,
    COL_EMERGENCY,
    COL_SEMESTER,
    COL_PERCENTAGE,
    COL_GRADE,
];

const LIST_JOIN: &str = ", ";
const LIST_SPLIT: char = ',';

pub fn marks_column(subject: &str) -> String {
    format!("{} Marks", subject)
}

/// Full column contract, in order.
pub fn columns() -> Vec<String> {
    BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(SUBJECTS.iter().map(|s| marks_column(s)))
        .collect()
}

/// Values used for blank optional cells on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDefaults {
    pub class: i64,
    pub section: String,
    pub blood_group: String,
    pub house: String,
    pub semester: String,
    pub photo_url: String,
    pub father_photo_url: String,
    pub mother_photo_url: String,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            class: 6,
            section: "A".into(),
            blood_group: "A+".into(),
            house: "Shiwalik".into(),
            semester: "Mid-Term 2024".into(),
            photo_url: "https://images.pexels.com/photos/1139743/pexels-photo-1139743.jpeg?auto=compress&cs=tinysrgb&w=300".into(),
            father_photo_url: "https://images.pexels.com/photos/1468379/pexels-photo-1468379.jpeg?auto=compress&cs=tinysrgb&w=300".into(),
            mother_photo_url: "https://images.pexels.com/photos/1181690/pexels-photo-1181690.jpeg?auto=compress&cs=tinysrgb&w=300".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowRejection {
    #[error("student name is required")]
    MissingName,
    #[error("roll number is required")]
    MissingRollNumber,
    #[error("{column} must be a number, got {value:?}")]
    InvalidNumber { column: String, value: String },
}

impl RowRejection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingName => "missing_name",
            Self::MissingRollNumber => "missing_roll_number",
            Self::InvalidNumber { .. } => "invalid_number",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    /// 1-based data row number (the header is not counted).
    pub row: usize,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub rejected: usize,
    pub rejections: Vec<Rejection>,
}

fn fmt_number(v: f64) -> String {
    format!("{}", v)
}

fn export_row(s: &StudentRecord) -> Vec<String> {
    let latest = s.latest_record();
    let father = &s.parent_details.father;
    let mother = &s.parent_details.mother;
    let mut row = vec![
        s.name.clone(),
        s.class_num.to_string(),
        s.section.clone(),
        s.roll_number.clone(),
        s.date_of_birth.clone(),
        s.blood_group.clone(),
        s.house.clone(),
        s.address.clone(),
        s.identification_mark.clone(),
        s.hobbies.join(LIST_JOIN),
        s.achievements.join(LIST_JOIN),
        s.photo.clone(),
        father.name.clone(),
        father.occupation.clone(),
        father.contact.clone(),
        father.email.clone(),
        father.photo.clone(),
        mother.name.clone(),
        mother.occupation.clone(),
        mother.contact.clone(),
        mother.email.clone(),
        mother.photo.clone(),
        s.parent_details.emergency_contact.clone(),
        latest.map(|r| r.semester.clone()).unwrap_or_default(),
        latest.map(|r| fmt_number(r.percentage)).unwrap_or_default(),
        latest.map(|r| r.grade.clone()).unwrap_or_default(),
    ];
    for subject in SUBJECTS {
        let marks = latest
            .and_then(|r| r.subjects.iter().find(|m| m.name == subject))
            .filter(|m| m.marks != 0.0)
            .map(|m| fmt_number(m.marks))
            .unwrap_or_default();
        row.push(marks);
    }
    row
}

pub fn export_sheet(students: &[StudentRecord]) -> Sheet {
    Sheet {
        headers: columns(),
        rows: students.iter().map(export_row).collect(),
    }
}

fn text_or(row: &SheetRow, column: &str, default: &str) -> String {
    row.get(column).unwrap_or(default).to_string()
}

fn text(row: &SheetRow, column: &str) -> String {
    text_or(row, column, "")
}

fn split_list(row: &SheetRow, column: &str) -> Vec<String> {
    row.get(column)
        .map(|s| {
            s.split(LIST_SPLIT)
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(|item| item.to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn number(row: &SheetRow, column: &str) -> Result<Option<f64>, RowRejection> {
    let Some(raw) = row.get(column) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(RowRejection::InvalidNumber {
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Validate one imported row and build a record from it. The returned record has no id.
pub fn record_from_row(
    row: &SheetRow,
    defaults: &ImportDefaults,
) -> Result<StudentRecord, RowRejection> {
    let name = row.get(COL_NAME).ok_or(RowRejection::MissingName)?;
    let roll_number = row.get(COL_ROLL).ok_or(RowRejection::MissingRollNumber)?;

    let class_num = match number(row, COL_CLASS)? {
        Some(v) if v.fract() == 0.0 => v as i64,
        Some(_) => {
            return Err(RowRejection::InvalidNumber {
                column: COL_CLASS.to_string(),
                value: text(row, COL_CLASS),
            })
        }
        None => defaults.class,
    };

    // A mark of 0 is an unfilled cell, not a score.
    let mut subjects: Vec<SubjectMark> = Vec::new();
    for subject in SUBJECTS {
        match number(row, &marks_column(subject))? {
            Some(marks) if marks != 0.0 => subjects.push(calc::subject_mark(subject, marks)),
            _ => {}
        }
    }

    let semester = text_or(row, COL_SEMESTER, &defaults.semester);
    let academic_records = if subjects.is_empty() {
        // Summary-only results carry over as given.
        match number(row, COL_PERCENTAGE)? {
            Some(percentage) => vec![AcademicRecord {
                semester,
                subjects,
                percentage,
                grade: text_or(row, COL_GRADE, calc::grade_for(percentage)),
            }],
            None => Vec::new(),
        }
    } else {
        let overall = calc::overall(&subjects);
        vec![AcademicRecord {
            semester,
            subjects,
            percentage: overall.percentage,
            grade: overall.grade,
        }]
    };

    Ok(StudentRecord {
        id: String::new(),
        name: name.to_string(),
        class_num,
        section: text_or(row, COL_SECTION, &defaults.section),
        roll_number: roll_number.to_string(),
        date_of_birth: text(row, COL_DOB),
        blood_group: text_or(row, COL_BLOOD, &defaults.blood_group),
        house: text_or(row, COL_HOUSE, &defaults.house),
        address: text(row, COL_ADDRESS),
        identification_mark: text(row, COL_ID_MARK),
        hobbies: split_list(row, COL_HOBBIES),
        achievements: split_list(row, COL_ACHIEVEMENTS),
        photo: text_or(row, COL_PHOTO, &defaults.photo_url),
        parent_details: ParentDetails {
            father: Guardian {
                name: text(row, COL_FATHER_NAME),
                occupation: text(row, COL_FATHER_OCCUPATION),
                contact: text(row, COL_FATHER_CONTACT),
                email: text(row, COL_FATHER_EMAIL),
                photo: text_or(row, COL_FATHER_PHOTO, &defaults.father_photo_url),
            },
            mother: Guardian {
                name: text(row, COL_MOTHER_NAME),
                occupation: text(row, COL_MOTHER_OCCUPATION),
                contact: text(row, COL_MOTHER_CONTACT),
                email: text(row, COL_MOTHER_EMAIL),
                photo: text_or(row, COL_MOTHER_PHOTO, &defaults.mother_photo_url),
            },
            emergency_contact: text(row, COL_EMERGENCY),
        },
        academic_records,
    })
}

/// Import rows in order. Rejected rows are counted and skipped; accepted rows
/// are added to the repository (and persisted) one at a time.
pub fn import_rows(
    repo: &mut StudentRepository,
    kv: &KeyValueStore,
    rows: &[SheetRow],
    defaults: &ImportDefaults,
) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for (i, row) in rows.iter().enumerate() {
        match record_from_row(row, defaults) {
            Ok(record) => {
                repo.add(kv, record);
                summary.imported += 1;
            }
            Err(e) => {
                tracing::warn!(row = i + 1, code = e.code(), "rejected import row: {}", e);
                summary.rejected += 1;
                summary.rejections.push(Rejection {
                    row: i + 1,
                    code: e.code().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }
    tracing::info!(
        imported = summary.imported,
        rejected = summary.rejected,
        "batch import finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> SheetRow {
        let mut r = SheetRow::new();
        for (k, v) in cells {
            r.set(k, *v);
        }
        r
    }

    #[test]
    fn column_contract_shape() {
        let cols = columns();
        assert_eq!(cols.len(), 35);
        assert_eq!(cols[0], "Student Name");
        assert_eq!(cols[25], "Latest Grade");
        assert_eq!(cols[26], "Mathematics Marks");
        assert_eq!(cols[34], "Biology Marks");
    }

    #[test]
    fn minimal_row_gets_defaults() {
        let defaults = ImportDefaults::default();
        let r = record_from_row(&row(&[(COL_NAME, "Asha"), (COL_ROLL, "12")]), &defaults)
            .expect("accepted");
        assert_eq!(r.class_num, 6);
        assert_eq!(r.section, "A");
        assert_eq!(r.blood_group, "A+");
        assert_eq!(r.house, "Shiwalik");
        assert_eq!(r.photo, defaults.photo_url);
        assert_eq!(r.parent_details.father.photo, defaults.father_photo_url);
        assert!(r.academic_records.is_empty());
        assert!(r.hobbies.is_empty());
    }

    #[test]
    fn marks_drive_grades_and_percentage() {
        let r = record_from_row(
            &row(&[
                (COL_NAME, "Asha"),
                (COL_ROLL, "12"),
                ("Mathematics Marks", "92"),
                ("Hindi Marks", "70"),
                (COL_HOBBIES, " chess, ,music ,"),
            ]),
            &ImportDefaults::default(),
        )
        .expect("accepted");
        let rec = &r.academic_records[0];
        assert_eq!(rec.semester, "Mid-Term 2024");
        assert_eq!(rec.subjects.len(), 2);
        assert_eq!(rec.subjects[0].grade, "A1");
        assert_eq!(rec.subjects[1].grade, "B2");
        assert_eq!(rec.percentage, 81.0);
        assert_eq!(rec.grade, "A2");
        assert_eq!(r.hobbies, vec!["chess", "music"]);
    }

    #[test]
    fn export_then_import_reproduces_records() {
        use crate::db::{open_in_memory, SqliteStorage};
        use crate::kv::DEFAULT_NAMESPACE;

        let defaults = ImportDefaults::default();
        let subjects = vec![
            calc::subject_mark("Mathematics", 88.0),
            calc::subject_mark("Physics", 73.5),
        ];
        let overall = calc::overall(&subjects);
        let original = StudentRecord {
            id: "orig-1".into(),
            name: "Meera Rao".into(),
            class_num: 10,
            section: "C".into(),
            roll_number: "10C-07".into(),
            date_of_birth: "2009-04-12".into(),
            blood_group: "O+".into(),
            house: "Aravali".into(),
            address: "12 Lake Road, Sector 4".into(),
            identification_mark: "Mole on left cheek".into(),
            hobbies: vec!["chess".into(), "painting".into()],
            achievements: vec!["Science Olympiad".into()],
            photo: "https://example.org/meera.jpg".into(),
            parent_details: ParentDetails {
                father: Guardian {
                    name: "Vikram Rao".into(),
                    occupation: "Engineer".into(),
                    contact: "98100 00001".into(),
                    email: "vikram@example.org".into(),
                    photo: "https://example.org/vikram.jpg".into(),
                },
                mother: Guardian {
                    name: "Lata Rao".into(),
                    occupation: "Doctor".into(),
                    contact: "98100 00002".into(),
                    email: "lata@example.org".into(),
                    photo: "https://example.org/lata.jpg".into(),
                },
                emergency_contact: "98100 00003".into(),
            },
            academic_records: vec![AcademicRecord {
                semester: "Final 2024".into(),
                subjects,
                percentage: overall.percentage,
                grade: overall.grade,
            }],
        };

        let text = export_sheet(std::slice::from_ref(&original)).to_csv();
        let rows = crate::sheet::parse_sheet(&text).keyed_rows();

        let conn = open_in_memory().expect("in-memory db");
        let kv = KeyValueStore::new(Box::new(SqliteStorage::new(conn)), DEFAULT_NAMESPACE);
        let mut repo = StudentRepository::default();
        let summary = import_rows(&mut repo, &kv, &rows, &defaults);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.rejected, 0);

        let mut imported = repo.all()[0].clone();
        assert_ne!(imported.id, original.id);
        imported.id = original.id.clone();
        assert_eq!(imported, original);
    }

    #[test]
    fn rejections_name_their_cause() {
        let d = ImportDefaults::default();
        assert_eq!(
            record_from_row(&row(&[(COL_ROLL, "12")]), &d),
            Err(RowRejection::MissingName)
        );
        assert_eq!(
            record_from_row(&row(&[(COL_NAME, "Asha"), (COL_ROLL, "  ")]), &d),
            Err(RowRejection::MissingRollNumber)
        );
        let err = record_from_row(
            &row(&[(COL_NAME, "Asha"), (COL_ROLL, "1"), ("Science Marks", "abc")]),
            &d,
        )
        .expect_err("rejected");
        assert_eq!(err.code(), "invalid_number");
    }

    #[test]
    fn fractional_class_is_rejected() {
        let d = ImportDefaults::default();
        let err = record_from_row(
            &row(&[(COL_NAME, "Asha"), (COL_ROLL, "1"), (COL_CLASS, "7.5")]),
            &d,
        )
        .expect_err("rejected");
        assert_eq!(
            err,
            RowRejection::InvalidNumber {
                column: COL_CLASS.to_string(),
                value: "7.5".to_string(),
            }
        );
        let r = record_from_row(
            &row(&[(COL_NAME, "Asha"), (COL_ROLL, "1"), (COL_CLASS, "7.0")]),
            &d,
        )
        .expect("accepted");
        assert_eq!(r.class_num, 7);
    }

    #[test]
    fn zero_marks_count_as_blank() {
        let r = record_from_row(
            &row(&[
                (COL_NAME, "Asha"),
                (COL_ROLL, "1"),
                ("Mathematics Marks", "90"),
                ("Science Marks", "0"),
            ]),
            &ImportDefaults::default(),
        )
        .expect("accepted");
        let rec = &r.academic_records[0];
        assert_eq!(rec.subjects.len(), 1);
        assert_eq!(rec.percentage, 90.0);

        let mut with_zero = r.clone();
        with_zero.academic_records[0]
            .subjects
            .push(calc::subject_mark("Science", 0.0));
        let sheet = export_sheet(&[with_zero]);
        let science = sheet.headers.iter().position(|h| h == "Science Marks").expect("column");
        assert_eq!(sheet.rows[0][science], "");
    }

    #[test]
    fn summary_only_result_survives_round_trip() {
        let d = ImportDefaults::default();
        let r = record_from_row(
            &row(&[
                (COL_NAME, "Asha"),
                (COL_ROLL, "1"),
                (COL_SEMESTER, "Final 2024"),
                (COL_PERCENTAGE, "78.5"),
                (COL_GRADE, "B1"),
            ]),
            &d,
        )
        .expect("accepted");
        assert_eq!(
            r.academic_records,
            vec![AcademicRecord {
                semester: "Final 2024".into(),
                subjects: Vec::new(),
                percentage: 78.5,
                grade: "B1".into(),
            }]
        );

        let text = export_sheet(std::slice::from_ref(&r)).to_csv();
        let rows = crate::sheet::parse_sheet(&text).keyed_rows();
        let again = record_from_row(&rows[0], &d).expect("accepted");
        assert_eq!(again.academic_records, r.academic_records);

        let graded = record_from_row(
            &row(&[(COL_NAME, "Ravi"), (COL_ROLL, "2"), (COL_PERCENTAGE, "92")]),
            &d,
        )
        .expect("accepted");
        assert_eq!(graded.academic_records[0].grade, "A1");
        assert_eq!(graded.academic_records[0].semester, "Mid-Term 2024");
    }
}
