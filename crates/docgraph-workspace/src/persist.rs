//! Tab layout persistence.
//!
//! Only closable tabs are saved; the fixed "Graph" and "Chat" tabs always
//! exist. Keys are kept so a restored tab is the same tab it was before.

use crate::tabs::{ChatSession, DocumentPage, TabKey};
use docgraph_core::DocumentId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read or write tab layout: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed tab layout: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported tab layout version {found}")]
    UnsupportedVersion { found: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTab<P> {
    pub key: TabKey,
    pub payload: P,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de>"))]
pub struct SavedCollection<P> {
    #[serde(default)]
    pub tabs: Vec<SavedTab<P>>,
    /// `None` means the fixed tab was active.
    #[serde(default)]
    pub active: Option<TabKey>,
}

impl<P> Default for SavedCollection<P> {
    fn default() -> Self {
        Self {
            tabs: Vec::new(),
            active: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabLayoutSnapshot {
    /// Version for migration support
    pub version: u32,
    /// Document the tabs were opened for. Tabs only make sense for it.
    #[serde(default)]
    pub document: Option<DocumentId>,
    #[serde(default)]
    pub documents: SavedCollection<DocumentPage>,
    #[serde(default)]
    pub sessions: SavedCollection<ChatSession>,
}

impl Default for TabLayoutSnapshot {
    fn default() -> Self {
        Self::new(None, SavedCollection::default(), SavedCollection::default())
    }
}

impl TabLayoutSnapshot {
    pub fn new(
        document: Option<DocumentId>,
        documents: SavedCollection<DocumentPage>,
        sessions: SavedCollection<ChatSession>,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            document,
            documents,
            sessions,
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
            });
        }
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load from `path`, or an empty layout if it is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                if path.exists() {
                    tracing::warn!("Ignoring tab layout at {}: {}", path.display(), err);
                }
                Self::default()
            }
        }
    }
}
