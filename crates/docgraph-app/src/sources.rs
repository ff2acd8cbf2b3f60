//! Collaborators the workspace talks to but does not implement: the graph
//! backend, the document store and bookmark persistence.

use anyhow::{Result, anyhow};
use docgraph_core::{DocumentId, NodeId, RawGraphPayload};
use std::collections::HashMap;

pub trait GraphSource: Send + Sync {
    fn fetch_graph_data(&self, document: &DocumentId) -> Result<RawGraphPayload>;
}

pub trait DocumentSource: Send + Sync {
    fn fetch_document(&self, url: &str) -> Result<Vec<u8>>;
}

pub trait BookmarkSink: Send + Sync {
    fn on_bookmark_toggle(&self, chapter: &NodeId, bookmarked: bool) -> Result<()>;
}

/// A loaded document, ready for the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    pub document_id: DocumentId,
    pub url: String,
    pub bytes: Vec<u8>,
}

impl DocumentHandle {
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

/// Graph payloads held in memory, keyed by document.
#[derive(Debug, Clone, Default)]
pub struct StaticGraphSource {
    payloads: HashMap<DocumentId, RawGraphPayload>,
}

impl StaticGraphSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, document: impl Into<DocumentId>, payload: RawGraphPayload) -> Self {
        self.payloads.insert(document.into(), payload);
        self
    }
}

impl GraphSource for StaticGraphSource {
    fn fetch_graph_data(&self, document: &DocumentId) -> Result<RawGraphPayload> {
        self.payloads
            .get(document)
            .cloned()
            .ok_or_else(|| anyhow!("no graph data for document {document}"))
    }
}

/// Serves nothing; every document is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDocuments;

impl DocumentSource for NoDocuments {
    fn fetch_document(&self, url: &str) -> Result<Vec<u8>> {
        Err(anyhow!("no document source configured for {url}"))
    }
}

/// Accepts every toggle and only logs it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingBookmarkSink;

impl BookmarkSink for LoggingBookmarkSink {
    fn on_bookmark_toggle(&self, chapter: &NodeId, bookmarked: bool) -> Result<()> {
        tracing::info!("Bookmark for chapter {} set to {}", chapter, bookmarked);
        Ok(())
    }
}
