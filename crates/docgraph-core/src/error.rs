use crate::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeEndpoint {
    Source,
    Target,
}

impl fmt::Display for EdgeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeEndpoint::Source => f.write_str("source"),
            EdgeEndpoint::Target => f.write_str("target"),
        }
    }
}

/// Non-fatal problems found while normalising a raw payload.
///
/// The build keeps going after each of these; they are recorded on the built
/// graph and logged so malformed input degrades instead of failing the render.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GraphDiagnostic {
    #[error("dropping edge {edge}: {endpoint} node {node} is not in the node set")]
    DanglingEdge {
        edge: EdgeId,
        endpoint: EdgeEndpoint,
        node: NodeId,
    },
    #[error("duplicate node id {0}, keeping the first occurrence")]
    DuplicateNode(NodeId),
    #[error("dropping session {session}: anchor chapter {chapter:?} does not exist")]
    OrphanSession {
        session: NodeId,
        chapter: Option<NodeId>,
    },
}

impl GraphDiagnostic {
    pub fn is_dangling_edge(&self) -> bool {
        matches!(self, GraphDiagnostic::DanglingEdge { .. })
    }
}
