use anyhow::Context;
use std::path::{Path, PathBuf};

/// A named downloadable file produced by an export.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn text(file_name: impl Into<String>, mime: &'static str, body: String) -> Self {
        Self {
            file_name: file_name.into(),
            mime,
            bytes: body.into_bytes(),
        }
    }
}

/// Hands finished artifacts to the user. Returns where the artifact ended up.
pub trait ArtifactSink {
    fn deliver(&self, artifact: &Artifact) -> anyhow::Result<PathBuf>;
}

pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl ArtifactSink for DirectorySink {
    fn deliver(&self, artifact: &Artifact) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create directory {}", self.dir.to_string_lossy()))?;
        let out = self.dir.join(&artifact.file_name);
        std::fs::write(&out, &artifact.bytes)
            .with_context(|| format!("failed to write {}", out.to_string_lossy()))?;
        tracing::info!(path = %out.to_string_lossy(), mime = artifact.mime, "artifact delivered");
        Ok(out)
    }
}

/// `YYYY-MM-DD` in UTC, used in export file names.
pub fn date_stamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
