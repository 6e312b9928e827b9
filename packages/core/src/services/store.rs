//! Document persistence
//!
//! A [`DocumentStore`] loads and saves one outline: the text file plus its
//! metadata sidecar. [`FileStore`] keeps both on disk and replaces them
//! atomically (write a temp file, then rename), so a cancelled or failed save
//! never leaves a half-written outline behind.

use crate::codec::OutlineMetadata;
use crate::error::{OutlineError, OutlineResult};
use crate::utils::PeriodKey;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Persisted form of a document
#[derive(Debug, Clone, PartialEq)]
pub struct StoredOutline {
    pub text: String,
    /// Sidecar; `None` when missing or unreadable
    pub metadata: Option<OutlineMetadata>,
}

impl StoredOutline {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
        }
    }
}

/// Where a document lives between sessions
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet
    async fn load(&self) -> OutlineResult<Option<StoredOutline>>;

    async fn save(&self, outline: &StoredOutline) -> OutlineResult<()>;
}

/// `<name>.md` plus `<name>.meta.json` in one directory
#[derive(Debug, Clone)]
pub struct FileStore {
    text_path: PathBuf,
    metadata_path: PathBuf,
}

impl FileStore {
    /// Store rooted at `text_path`; the sidecar sits next to it
    pub fn new(text_path: impl Into<PathBuf>) -> Self {
        let text_path = text_path.into();
        let metadata_path = text_path.with_extension("meta.json");
        Self {
            text_path,
            metadata_path,
        }
    }

    /// One file per week: `<dir>/2026-W42.md`
    pub fn for_period(dir: impl AsRef<Path>, period: &PeriodKey) -> Self {
        Self::new(dir.as_ref().join(period.file_name("md")))
    }

    pub fn text_path(&self) -> &Path {
        &self.text_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn load(&self) -> OutlineResult<Option<StoredOutline>> {
        let text = match tokio::fs::read_to_string(&self.text_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(OutlineError::io(
                    format!("reading {}", self.text_path.display()),
                    e,
                ))
            }
        };

        let metadata = match tokio::fs::read_to_string(&self.metadata_path).await {
            Ok(json) => match OutlineMetadata::from_json(&json) {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    tracing::warn!(
                        "Ignoring unreadable sidecar {}: {}",
                        self.metadata_path.display(),
                        e
                    );
                    None
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(
                    "Cannot read sidecar {}: {}",
                    self.metadata_path.display(),
                    e
                );
                None
            }
        };

        Ok(Some(StoredOutline { text, metadata }))
    }

    async fn save(&self, outline: &StoredOutline) -> OutlineResult<()> {
        if let Some(dir) = self.text_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| OutlineError::io(format!("creating {}", dir.display()), e))?;
        }
        write_atomic(&self.text_path, outline.text.as_bytes()).await?;
        if let Some(metadata) = &outline.metadata {
            write_atomic(&self.metadata_path, metadata.to_json()?.as_bytes()).await?;
        }
        tracing::debug!("Saved outline to {}", self.text_path.display());
        Ok(())
    }
}

/// Write the whole file beside `path`, then rename it into place
async fn write_atomic(path: &Path, contents: &[u8]) -> OutlineResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = tokio::fs::write(&tmp, contents).await {
        return Err(OutlineError::io(format!("writing {}", tmp.display()), e));
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(OutlineError::io(format!("replacing {}", path.display()), e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("outline.md"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_with_sidecar() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("outline.md"));
        let tree = parse("- A\n    - B\n").tree;
        let outline = StoredOutline {
            text: "- A\n    - B\n\n".to_string(),
            metadata: Some(OutlineMetadata::capture(&tree)),
        };

        store.save(&outline).await.unwrap();
        assert!(store.metadata_path().ends_with("outline.meta.json"));
        assert!(!dir.path().join("nested").join("outline.md.tmp").exists());

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, outline);
    }

    #[tokio::test]
    async fn test_corrupt_sidecar_is_ignored() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("outline.md"));
        store.save(&StoredOutline::from_text("- A\n\n")).await.unwrap();
        tokio::fs::write(store.metadata_path(), "{not json").await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.text, "- A\n\n");
        assert!(loaded.metadata.is_none());
    }

    #[test]
    fn test_period_file_name() {
        let period = PeriodKey::week_of(chrono::NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        let store = FileStore::for_period("/tmp/outlines", &period);
        assert!(store.text_path().ends_with("2026-W42.md"));
        assert!(store.metadata_path().ends_with("2026-W42.meta.json"));
    }
}
