use crate::kv::KeyValueStore;
use crate::model::StudentRecord;
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use uuid::Uuid;

pub const STUDENTS_KEY: &str = "students";

const ID_SUFFIX_LEN: usize = 9;

/// Millisecond timestamp followed by a short random base-36 suffix.
pub fn new_student_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut n = Uuid::new_v4().as_u128();
    let mut suffix = String::with_capacity(ID_SUFFIX_LEN);
    for _ in 0..ID_SUFFIX_LEN {
        let digit = (n % 36) as u32;
        n /= 36;
        suffix.push(std::char::from_digit(digit, 36).unwrap_or('0'));
    }
    format!("{}{}", millis, suffix)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Name,
    Class,
    Performance,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Some(Self::Name),
            "class" => Some(Self::Class),
            "performance" => Some(Self::Performance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
    pub search: String,
    pub class_filter: Option<i64>,
    pub sort_by: SortKey,
}

/// The canonical in-memory roster. Every mutation rewrites the whole
/// collection to the store.
#[derive(Debug, Default)]
pub struct StudentRepository {
    students: Vec<StudentRecord>,
}

impl StudentRepository {
    /// Records are decoded one at a time so a single malformed entry cannot
    /// empty the roster.
    pub fn load(kv: &KeyValueStore) -> Self {
        let stored: Vec<Value> = kv.load(STUDENTS_KEY, Vec::new());
        let mut students = Vec::with_capacity(stored.len());
        for (index, value) in stored.into_iter().enumerate() {
            match serde_json::from_value::<StudentRecord>(value) {
                Ok(s) => students.push(s),
                Err(e) => tracing::warn!(index, error = %e, "skipping unreadable student record"),
            }
        }
        tracing::debug!(count = students.len(), "loaded student roster");
        Self { students }
    }

    pub fn all(&self) -> &[StudentRecord] {
        &self.students
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn get(&self, id: &str) -> Option<&StudentRecord> {
        self.students.iter().find(|s| s.id == id)
    }

    fn persist(&self, kv: &KeyValueStore) {
        kv.save(STUDENTS_KEY, &self.students);
    }

    /// Append a record, generating an id when the caller left it blank.
    pub fn add(&mut self, kv: &KeyValueStore, mut record: StudentRecord) -> String {
        if record.id.trim().is_empty() {
            record.id = new_student_id();
        }
        let id = record.id.clone();
        self.students.push(record);
        self.persist(kv);
        id
    }

    /// Shallow-merge `patch` into the first record with `id`.
    ///
    /// Returns `Ok(false)` when no record matches. A patch that would leave the
    /// record malformed is rejected and nothing changes. The `id` field is never patched.
    pub fn update(
        &mut self,
        kv: &KeyValueStore,
        id: &str,
        patch: &Map<String, Value>,
    ) -> anyhow::Result<bool> {
        let Some(pos) = self.students.iter().position(|s| s.id == id) else {
            return Ok(false);
        };

        let mut merged = serde_json::to_value(&self.students[pos])
            .context("failed to serialize student record")?;
        let obj = merged
            .as_object_mut()
            .ok_or_else(|| anyhow!("student record must serialize to an object"))?;
        for (k, v) in patch {
            if k == "id" {
                continue;
            }
            obj.insert(k.clone(), v.clone());
        }
        let updated: StudentRecord =
            serde_json::from_value(merged).context("patch does not fit the student record")?;

        self.students[pos] = updated;
        self.persist(kv);
        Ok(true)
    }

    /// Remove the record with `id`. Returns whether one was removed.
    pub fn delete(&mut self, kv: &KeyValueStore, id: &str) -> bool {
        let before = self.students.len();
        self.students.retain(|s| s.id != id);
        let removed = self.students.len() != before;
        self.persist(kv);
        removed
    }

    pub fn query(&self, q: &StudentQuery) -> Vec<&StudentRecord> {
        let needle = q.search.trim().to_lowercase();
        let mut out: Vec<&StudentRecord> = self
            .students
            .iter()
            .filter(|s| matches_search(s, &needle))
            .filter(|s| q.class_filter.map(|c| s.class_num == c).unwrap_or(true))
            .collect();

        match q.sort_by {
            SortKey::Name => out.sort_by(|a, b| a.name.cmp(&b.name)),
            SortKey::Class => {
                out.sort_by(|a, b| a.class_num.cmp(&b.class_num).then_with(|| a.name.cmp(&b.name)))
            }
            SortKey::Performance => out.sort_by(|a, b| {
                b.latest_percentage()
                    .partial_cmp(&a.latest_percentage())
                    .unwrap_or(Ordering::Equal)
            }),
        }
        out
    }

    /// Distinct class numbers, ascending.
    pub fn classes(&self) -> Vec<i64> {
        let mut classes: Vec<i64> = self.students.iter().map(|s| s.class_num).collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    }
}

fn matches_search(s: &StudentRecord, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    [
        &s.name,
        &s.roll_number,
        &s.parent_details.father.name,
        &s.parent_details.mother.name,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}
