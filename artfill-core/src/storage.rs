//! Durable storage seam for engine state.
//!
//! Every persistent structure (decisions, provider records, proposals,
//! history) goes through [`StateStore`], so tests can substitute the
//! in-memory implementation for the file-backed one.

use std::path::PathBuf;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{EngineError, Result};

/// Named-document storage with atomic replacement and line appends.
#[async_trait]
pub trait StateStore: Send + Sync + std::fmt::Debug {
    async fn load(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the document atomically; a crash mid-save must leave either
    /// the old or the new content, never a torn file.
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Append one line to the document (used by the append-only history).
    async fn append_line(&self, name: &str, line: &[u8]) -> Result<()>;
}

/// File-backed store rooted at one directory. Saves go through a temp
/// file and rename so the on-disk structure can never be corrupted by an
/// interrupted flush.
#[derive(Clone, Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|err| {
            EngineError::Persistence(format!(
                "failed to create storage dir {:?}: {err}",
                self.root
            ))
        })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl StateStore for DirStore {
    async fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(None)
            }
            Err(err) => Err(EngineError::Persistence(format!(
                "failed to read {name}: {err}"
            ))),
        }
    }

    async fn save(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.ensure_root().await?;
        let path = self.path_for(name);
        let tmp = self
            .root
            .join(format!("{name}.tmp-{}", Uuid::new_v4().simple()));

        let mut file =
            tokio::fs::File::create(&tmp).await.map_err(|err| {
                EngineError::Persistence(format!(
                    "failed to create temp file {tmp:?}: {err}"
                ))
            })?;
        file.write_all(bytes).await.map_err(|err| {
            EngineError::Persistence(format!(
                "failed to write temp file {tmp:?}: {err}"
            ))
        })?;
        file.flush().await.map_err(|err| {
            EngineError::Persistence(format!(
                "failed to flush temp file {tmp:?}: {err}"
            ))
        })?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await.map_err(|err| {
            EngineError::Persistence(format!(
                "failed to move {tmp:?} -> {path:?}: {err}"
            ))
        })?;

        Ok(())
    }

    async fn append_line(&self, name: &str, line: &[u8]) -> Result<()> {
        self.ensure_root().await?;
        let path = self.path_for(name);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|err| {
                EngineError::Persistence(format!(
                    "failed to open {path:?} for append: {err}"
                ))
            })?;
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line);
        buf.push(b'\n');
        file.write_all(&buf).await.map_err(|err| {
            EngineError::Persistence(format!(
                "failed to append to {path:?}: {err}"
            ))
        })?;
        file.flush().await.map_err(|err| {
            EngineError::Persistence(format!(
                "failed to flush {path:?}: {err}"
            ))
        })?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.documents.get(name).map(|doc| doc.clone()))
    }

    async fn save(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.documents.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn append_line(&self, name: &str, line: &[u8]) -> Result<()> {
        let mut doc = self.documents.entry(name.to_string()).or_default();
        doc.extend_from_slice(line);
        doc.push(b'\n');
        Ok(())
    }
}
