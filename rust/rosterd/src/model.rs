use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Guardian {
    pub name: String,
    pub occupation: String,
    pub contact: String,
    pub email: String,
    pub photo: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParentDetails {
    pub father: Guardian,
    pub mother: Guardian,
    pub emergency_contact: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectMark {
    pub name: String,
    pub marks: f64,
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AcademicRecord {
    pub semester: String,
    pub subjects: Vec<SubjectMark>,
    pub percentage: f64,
    pub grade: String,
}

/// One student's profile as stored under the `students` key.
///
/// Index 0 of `academic_records` is the latest record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "class")]
    pub class_num: i64,
    pub section: String,
    pub roll_number: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub blood_group: String,
    #[serde(default)]
    pub house: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub identification_mark: String,
    #[serde(default)]
    pub hobbies: Vec<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub photo: String,
    #[serde(default)]
    pub parent_details: ParentDetails,
    #[serde(default)]
    pub academic_records: Vec<AcademicRecord>,
}

impl StudentRecord {
    pub fn latest_record(&self) -> Option<&AcademicRecord> {
        self.academic_records.first()
    }

    /// Latest percentage, with a missing record counting as 0.
    pub fn latest_percentage(&self) -> f64 {
        self.latest_record().map(|r| r.percentage).unwrap_or(0.0)
    }
}
