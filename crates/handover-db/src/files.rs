//! Local file store for uploaded documents and generated PDFs.
//!
//! Paths handed out are relative to the store root and are the only form
//! persisted in the database.

use crate::error::{DbError, Result};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an upload under `<unit_id>/<uuid>-<name>`.
    pub async fn save_upload(&self, unit_id: Uuid, file_name: &str, bytes: &[u8]) -> Result<String> {
        let relative = format!("{}/{}-{}", unit_id, Uuid::new_v4(), sanitize_file_name(file_name));
        self.write(&relative, bytes).await?;
        Ok(relative)
    }

    /// Store a generated PDF under `pdf/<kind>-<id>.pdf`.
    pub async fn save_pdf(&self, kind: &str, id: Uuid, bytes: &[u8]) -> Result<String> {
        let relative = format!("pdf/{}-{}.pdf", sanitize_file_name(kind), id);
        self.write(&relative, bytes).await?;
        Ok(relative)
    }

    pub async fn read(&self, relative: &str) -> Result<Vec<u8>> {
        let path = self.resolve(relative)?;
        Ok(tokio::fs::read(path).await?)
    }

    /// Remove a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, relative: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Stored file already missing");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, relative: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %relative, size = bytes.len(), "Stored file");
        Ok(())
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        let safe = !relative.is_empty()
            && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(DbError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

/// Keep ASCII letters, digits, `.`, `-` and `_`; everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.chars().take(120).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("passport scan.pdf"), "passport_scan.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\id.png"), "id.png");
        assert_eq!(sanitize_file_name("..."), "file");
    }

    #[tokio::test]
    async fn test_save_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let unit_id = Uuid::new_v4();

        let rel = store.save_upload(unit_id, "deed.pdf", b"%PDF-1.5").await.unwrap();
        assert!(rel.starts_with(&unit_id.to_string()));
        assert!(rel.ends_with("-deed.pdf"));
        assert_eq!(store.read(&rel).await.unwrap(), b"%PDF-1.5");

        store.remove(&rel).await.unwrap();
        assert!(store.read(&rel).await.is_err());
        // second removal is a no-op
        store.remove(&rel).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(store.read("../secret").await, Err(DbError::InvalidPath(_))));
        assert!(matches!(store.read("/etc/passwd").await, Err(DbError::InvalidPath(_))));
    }
}
