use crate::admin::AdminControlStore;
use crate::kv::KeyValueStore;
use crate::students::StudentRepository;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything loaded from one workspace. The repository and admin store are
/// read from `kv` once at open and mirrored back on every mutation.
pub struct Workspace {
    pub path: PathBuf,
    pub kv: KeyValueStore,
    pub students: StudentRepository,
    pub admin: AdminControlStore,
}

pub struct AppState {
    pub namespace: String,
    pub workspace: Option<Workspace>,
}
