use crate::delivery::{date_stamp, Artifact};
use crate::kv::KeyValueStore;
use crate::model::StudentRecord;
use crate::sheet::{csv_force_quote, csv_quote};
use crate::students::STUDENTS_KEY;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const SECTIONS_KEY: &str = "sectionVisibility";
pub const BACKUP_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Students,
    Academic,
    Movement,
    About,
    Teachers,
    Houses,
    Gallery,
}

impl Section {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "students" => Some(Self::Students),
            "academic" => Some(Self::Academic),
            "movement" => Some(Self::Movement),
            "about" => Some(Self::About),
            "teachers" => Some(Self::Teachers),
            "houses" => Some(Self::Houses),
            "gallery" => Some(Self::Gallery),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Academic => "academic",
            Self::Movement => "movement",
            Self::About => "about",
            Self::Teachers => "teachers",
            Self::Houses => "houses",
            Self::Gallery => "gallery",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionVisibility {
    pub students: bool,
    pub academic: bool,
    pub movement: bool,
    pub about: bool,
    pub teachers: bool,
    pub houses: bool,
    pub gallery: bool,
}

impl Default for SectionVisibility {
    fn default() -> Self {
        Self {
            students: true,
            academic: true,
            movement: true,
            about: true,
            teachers: true,
            houses: true,
            gallery: true,
        }
    }
}

impl SectionVisibility {
    fn flag_mut(&mut self, section: Section) -> &mut bool {
        match section {
            Section::Students => &mut self.students,
            Section::Academic => &mut self.academic,
            Section::Movement => &mut self.movement,
            Section::About => &mut self.about,
            Section::Teachers => &mut self.teachers,
            Section::Houses => &mut self.houses,
            Section::Gallery => &mut self.gallery,
        }
    }

    pub fn is_visible(&self, section: Section) -> bool {
        match section {
            Section::Students => self.students,
            Section::Academic => self.academic,
            Section::Movement => self.movement,
            Section::About => self.about,
            Section::Teachers => self.teachers,
            Section::Houses => self.houses,
            Section::Gallery => self.gallery,
        }
    }
}

#[derive(Debug, Default)]
pub struct AdminControlStore {
    visibility: SectionVisibility,
}

impl AdminControlStore {
    pub fn load(kv: &KeyValueStore) -> Self {
        Self {
            visibility: kv.load(SECTIONS_KEY, SectionVisibility::default()),
        }
    }

    pub fn visibility(&self) -> SectionVisibility {
        self.visibility
    }

    /// Flip one section and persist the whole map. Returns the new value.
    pub fn toggle(&mut self, kv: &KeyValueStore, section: &str) -> anyhow::Result<bool> {
        let section =
            Section::parse(section).ok_or_else(|| anyhow!("unknown section: {}", section))?;
        let visible = !self.visibility.is_visible(section);
        *self.visibility.flag_mut(section) = visible;
        kv.save(SECTIONS_KEY, &self.visibility);
        tracing::info!(section = section.name(), visible, "section visibility toggled");
        Ok(visible)
    }
}

const CSV_HEADERS: [&str; 19] = [
    "Name",
    "Class",
    "Section",
    "Roll Number",
    "Date of Birth",
    "Blood Group",
    "House",
    "Address",
    "Father Name",
    "Father Contact",
    "Father Email",
    "Mother Name",
    "Mother Contact",
    "Mother Email",
    "Emergency Contact",
    "Hobbies",
    "Achievements",
    "Latest Percentage",
    "Latest Grade",
];

const NOT_AVAILABLE: &str = "N/A";

/// Contact-sheet CSV: identity, contact and latest-result columns only.
pub fn students_csv(students: &[StudentRecord]) -> String {
    let mut lines = vec![CSV_HEADERS.join(",")];
    for s in students {
        let father = &s.parent_details.father;
        let mother = &s.parent_details.mother;
        let latest = s.latest_record();
        let percentage = latest
            .map(|r| r.percentage)
            .filter(|p| *p != 0.0)
            .map(|p| p.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let grade = latest
            .map(|r| r.grade.clone())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let fields = [
            csv_force_quote(&s.name),
            s.class_num.to_string(),
            csv_quote(&s.section),
            csv_quote(&s.roll_number),
            csv_quote(&s.date_of_birth),
            csv_quote(&s.blood_group),
            csv_quote(&s.house),
            csv_force_quote(&s.address),
            csv_force_quote(&father.name),
            csv_quote(&father.contact),
            csv_quote(&father.email),
            csv_force_quote(&mother.name),
            csv_quote(&mother.contact),
            csv_quote(&mother.email),
            csv_quote(&s.parent_details.emergency_contact),
            csv_force_quote(&s.hobbies.join("; ")),
            csv_force_quote(&s.achievements.join("; ")),
            percentage,
            csv_quote(&grade),
        ];
        lines.push(fields.join(","));
    }
    lines.join("\n")
}

pub fn export_csv(students: &[StudentRecord]) -> Artifact {
    Artifact::text(
        format!("student_data_{}.csv", date_stamp()),
        "text/csv;charset=utf-8",
        students_csv(students),
    )
}

/// Snapshot of every namespaced key with summary metadata.
pub fn backup_document(kv: &KeyValueStore) -> Value {
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let mut data = Map::new();
    for (key, value) in kv.entries() {
        data.insert(key, value);
    }
    let students_key = format!("{}{}", kv.namespace(), STUDENTS_KEY);
    let total_students = data
        .get(&students_key)
        .and_then(|v| v.as_array())
        .map(|a| a.len())
        .unwrap_or(0);
    let sections = data.len();
    json!({
        "timestamp": now,
        "version": BACKUP_VERSION,
        "data": data,
        "metadata": {
            "totalStudents": total_students,
            "lastModified": now,
            "sections": sections,
        }
    })
}

pub fn export_backup(kv: &KeyValueStore) -> anyhow::Result<Artifact> {
    let doc = backup_document(kv);
    let body = serde_json::to_string_pretty(&doc)?;
    Ok(Artifact::text(
        format!("{}backup_{}.json", kv.namespace(), date_stamp()),
        "application/json;charset=utf-8",
        body,
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_students: usize,
    pub students_with_records: usize,
    pub average_performance: i64,
    pub total_achievements: usize,
    pub data_size_kb: f64,
    pub sections: SectionVisibility,
}

pub fn dashboard(students: &[StudentRecord], sections: SectionVisibility) -> DashboardStats {
    let with_records: Vec<f64> = students
        .iter()
        .filter_map(|s| s.latest_record().map(|r| r.percentage))
        .collect();
    let average_performance = if with_records.is_empty() {
        0
    } else {
        (with_records.iter().sum::<f64>() / with_records.len() as f64).round() as i64
    };
    let serialized_len = serde_json::to_string(students)
        .map(|s| s.len())
        .unwrap_or(0);
    let data_size_kb = (serialized_len as f64 / 1024.0 * 100.0).round() / 100.0;
    DashboardStats {
        total_students: students.len(),
        students_with_records: with_records.len(),
        average_performance,
        total_achievements: students.iter().map(|s| s.achievements.len()).sum(),
        data_size_kb,
        sections,
    }
}
