//! Raw graph records as delivered by the backend.
//!
//! Producers disagree on field spelling and on whether numbers arrive as JSON
//! numbers or strings, so every field here deserializes leniently. Nothing in
//! this module rejects a record for a malformed optional field; it falls back
//! to `None` and the graph build decides what to do with it.

use crate::{DocumentId, EdgeId, NodeId};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub id: NodeId,
    #[serde(default, alias = "title", alias = "label")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub group: Option<String>,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub level: Option<i64>,
    #[serde(default, alias = "start_page", deserialize_with = "lenient_integer")]
    pub start_page: Option<i64>,
    #[serde(default, alias = "end_page", deserialize_with = "lenient_integer")]
    pub end_page: Option<i64>,
    #[serde(default, deserialize_with = "boolish")]
    pub bookmarked: bool,
    #[serde(
        default,
        alias = "document_id",
        alias = "pdfId",
        alias = "pdf_id"
    )]
    pub document_id: Option<DocumentId>,
    /// Present only on discussion-session records.
    #[serde(default, alias = "chapter_id")]
    pub chapter_id: Option<NodeId>,
}

impl RawNode {
    pub fn chapter(id: impl Into<NodeId>, name: impl Into<String>, level: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            level: Some(level),
            ..Default::default()
        }
    }

    pub fn session(id: impl Into<NodeId>, chapter: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            chapter_id: Some(chapter.into()),
            ..Default::default()
        }
    }

    pub fn with_pages(mut self, start: i64, end: i64) -> Self {
        self.start_page = Some(start);
        self.end_page = Some(end);
        self
    }

    pub fn with_bookmark(mut self, bookmarked: bool) -> Self {
        self.bookmarked = bookmarked;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEdge {
    #[serde(default)]
    pub id: Option<EdgeId>,
    #[serde(alias = "sourceId", alias = "source_id")]
    pub source: NodeId,
    #[serde(alias = "targetId", alias = "target_id")]
    pub target: NodeId,
    #[serde(
        default,
        alias = "similarity",
        alias = "value",
        deserialize_with = "lenient_float"
    )]
    pub weight: Option<f64>,
    #[serde(
        default,
        alias = "document_id",
        alias = "pdfId",
        alias = "pdf_id"
    )]
    pub document_id: Option<DocumentId>,
}

impl RawEdge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>, weight: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: Some(weight),
            ..Default::default()
        }
    }
}

/// Response of the `fetchGraphData` collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawGraphPayload {
    #[serde(alias = "chapters")]
    pub nodes: Vec<RawNode>,
    #[serde(alias = "links")]
    pub edges: Vec<RawEdge>,
    #[serde(alias = "session_nodes")]
    pub session_nodes: Vec<RawNode>,
    #[serde(alias = "session_edges")]
    pub session_edges: Vec<RawEdge>,
    #[serde(alias = "document_url", alias = "pdfUrl", alias = "pdf_url")]
    pub document_url: Option<String>,
}

impl RawGraphPayload {
    /// Flip the bookmark flag of a chapter in place. Returns the new state, or
    /// `None` when no chapter with that id exists.
    pub fn set_bookmarked(&mut self, chapter: &NodeId, bookmarked: bool) -> Option<bool> {
        let node = self
            .nodes
            .iter_mut()
            .find(|node| &node.id == chapter && node.chapter_id.is_none())?;
        node.bookmarked = bookmarked;
        Some(bookmarked)
    }

    pub fn is_bookmarked(&self, chapter: &NodeId) -> Option<bool> {
        self.nodes
            .iter()
            .find(|node| &node.id == chapter && node.chapter_id.is_none())
            .map(|node| node.bookmarked)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Lenient>::deserialize(deserializer)?;
    Ok(match value {
        Some(Lenient::Int(v)) => Some(v),
        Some(Lenient::Float(v)) if v.is_finite() => Some(v.round() as i64),
        Some(Lenient::Text(v)) => v.trim().parse::<i64>().ok(),
        _ => None,
    })
}

fn lenient_float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Lenient>::deserialize(deserializer)?;
    Ok(match value {
        Some(Lenient::Int(v)) => Some(v as f64),
        Some(Lenient::Float(v)) => Some(v),
        Some(Lenient::Text(v)) => v.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Lenient>::deserialize(deserializer)?;
    Ok(match value {
        Some(Lenient::Int(v)) => Some(v.to_string()),
        Some(Lenient::Float(v)) => Some(v.to_string()),
        Some(Lenient::Text(v)) => Some(v),
        Some(Lenient::Bool(v)) => Some(v.to_string()),
        None => None,
    })
}

/// `true`, `1`, `"true"`, `"1"` are bookmarked; everything else is not.
fn boolish<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Lenient>::deserialize(deserializer)?;
    Ok(match value {
        Some(Lenient::Bool(v)) => v,
        Some(Lenient::Int(v)) => v != 0,
        Some(Lenient::Float(v)) => v != 0.0,
        Some(Lenient::Text(v)) => matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        None => false,
    })
}
