use crate::style::{self, Color};
use docgraph_core::{
    DocumentId, EdgeEndpoint, EdgeId, EdgeKind, GraphDiagnostic, NodeId, NodeKind, RawEdge,
    RawGraphPayload, RawNode,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Index;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterInfo {
    /// 1 is the coarsest level.
    pub level: u32,
    pub group: Option<String>,
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
    pub bookmarked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeDetail {
    Chapter(ChapterInfo),
    Session { chapter_id: NodeId },
}

/// Display attributes derived from the node's level at build time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeDisplay {
    pub radius: f32,
    pub color: Color,
    pub label_min_zoom: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub name: String,
    pub document_id: Option<DocumentId>,
    pub detail: NodeDetail,
    pub display: NodeDisplay,
}

impl GraphNode {
    pub fn kind(&self) -> NodeKind {
        match self.detail {
            NodeDetail::Chapter(_) => NodeKind::Chapter,
            NodeDetail::Session { .. } => NodeKind::Session,
        }
    }

    pub fn chapter(&self) -> Option<&ChapterInfo> {
        match &self.detail {
            NodeDetail::Chapter(info) => Some(info),
            NodeDetail::Session { .. } => None,
        }
    }

    pub fn level(&self) -> Option<u32> {
        self.chapter().map(|info| info.level)
    }

    pub fn start_page(&self) -> Option<u32> {
        self.chapter().and_then(|info| info.start_page)
    }

    pub fn is_bookmarked(&self) -> bool {
        self.chapter().is_some_and(|info| info.bookmarked)
    }

    /// Anchor chapter of a session node.
    pub fn anchor(&self) -> Option<&NodeId> {
        match &self.detail {
            NodeDetail::Session { chapter_id } => Some(chapter_id),
            NodeDetail::Chapter(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub source_idx: NodeIndex,
    pub target_idx: NodeIndex,
    /// Similarity in `[0, 1]`.
    pub weight: f32,
    pub document_id: Option<DocumentId>,
    pub kind: EdgeKind,
}

impl GraphEdge {
    pub fn is_self_loop(&self) -> bool {
        self.source_idx == self.target_idx
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Keep only bookmarked chapters (and what hangs off them).
    pub bookmarked_only: bool,
}

/// Normalised, internally consistent graph built from a raw payload.
///
/// Every edge's endpoints are guaranteed to be present in `nodes`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    node_map: HashMap<NodeId, NodeIndex>,
    diagnostics: Vec<GraphDiagnostic>,
    document_url: Option<String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a raw payload. Never fails: malformed records are
    /// dropped and reported through [`Graph::diagnostics`].
    pub fn build(raw: &RawGraphPayload, options: BuildOptions) -> Self {
        let mut builder = GraphBuilder::new(options);

        for node in &raw.nodes {
            if node.chapter_id.is_none() {
                builder.add_chapter(node);
            }
        }
        for node in raw
            .nodes
            .iter()
            .filter(|node| node.chapter_id.is_some())
            .chain(raw.session_nodes.iter())
        {
            builder.add_session(node);
        }
        for edge in raw.edges.iter().chain(raw.session_edges.iter()) {
            builder.add_edge(edge);
        }

        let mut graph = builder.finish();
        graph.document_url = raw.document_url.clone();
        graph
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node_indices(&self) -> impl DoubleEndedIterator<Item = NodeIndex> + use<> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    pub fn node_index(&self, id: &NodeId) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.node_index(id).map(|idx| &self.nodes[idx.0])
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.node_map.contains_key(id)
    }

    pub fn chapters(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes
            .iter()
            .filter(|node| node.kind() == NodeKind::Chapter)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes
            .iter()
            .filter(|node| node.kind() == NodeKind::Session)
    }

    /// Ids of nodes sharing an edge with `id`, in edge order.
    pub fn neighbors<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.edges.iter().filter_map(move |edge| {
            if &edge.source == id {
                Some(&edge.target)
            } else if &edge.target == id {
                Some(&edge.source)
            } else {
                None
            }
        })
    }

    /// Number of edges touching each node, indexed like `nodes()`.
    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.nodes.len()];
        for edge in &self.edges {
            degrees[edge.source_idx.0] += 1;
            degrees[edge.target_idx.0] += 1;
        }
        degrees
    }

    pub fn diagnostics(&self) -> &[GraphDiagnostic] {
        &self.diagnostics
    }

    pub fn document_url(&self) -> Option<&str> {
        self.document_url.as_deref()
    }
}

impl Index<NodeIndex> for Graph {
    type Output = GraphNode;
    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index.0]
    }
}

struct GraphBuilder {
    options: BuildOptions,
    graph: Graph,
    /// Chapters removed by the bookmark filter; references to them are expected to vanish.
    excluded: HashSet<NodeId>,
}

impl GraphBuilder {
    fn new(options: BuildOptions) -> Self {
        Self {
            options,
            graph: Graph::new(),
            excluded: HashSet::new(),
        }
    }

    fn push_node(&mut self, node: GraphNode) {
        if self.graph.node_map.contains_key(&node.id) {
            tracing::warn!("Duplicate node id {}, keeping the first occurrence", node.id);
            self.graph
                .diagnostics
                .push(GraphDiagnostic::DuplicateNode(node.id));
            return;
        }
        let idx = NodeIndex(self.graph.nodes.len());
        self.graph.node_map.insert(node.id.clone(), idx);
        self.graph.nodes.push(node);
    }

    fn add_chapter(&mut self, raw: &RawNode) {
        if self.options.bookmarked_only && !raw.bookmarked {
            self.excluded.insert(raw.id.clone());
            return;
        }

        let level = raw.level.map_or(1, |level| level.max(1)).min(u32::MAX as i64) as u32;
        let info = ChapterInfo {
            level,
            group: raw.group.clone(),
            start_page: raw.start_page.and_then(to_page),
            end_page: raw.end_page.and_then(to_page),
            bookmarked: raw.bookmarked,
        };
        self.push_node(GraphNode {
            id: raw.id.clone(),
            name: display_name(raw),
            document_id: raw.document_id.clone(),
            detail: NodeDetail::Chapter(info),
            display: style::chapter_display(level),
        });
    }

    fn add_session(&mut self, raw: &RawNode) {
        let anchor = raw.chapter_id.as_ref();
        let anchored = anchor.is_some_and(|chapter| {
            self.graph
                .node(chapter)
                .is_some_and(|node| node.kind() == NodeKind::Chapter)
        });

        if !anchored {
            if anchor.is_some_and(|chapter| self.excluded.contains(chapter)) {
                self.excluded.insert(raw.id.clone());
                return;
            }
            tracing::warn!(
                "Dropping session {} because anchor chapter {:?} is missing",
                raw.id,
                anchor.map(NodeId::as_str)
            );
            self.graph.diagnostics.push(GraphDiagnostic::OrphanSession {
                session: raw.id.clone(),
                chapter: anchor.cloned(),
            });
            return;
        }

        let Some(chapter_id) = anchor.cloned() else {
            return;
        };
        self.push_node(GraphNode {
            id: raw.id.clone(),
            name: display_name(raw),
            document_id: raw.document_id.clone(),
            detail: NodeDetail::Session { chapter_id },
            display: style::session_display(),
        });
    }

    fn add_edge(&mut self, raw: &RawEdge) {
        let edge_id = raw
            .id
            .clone()
            .unwrap_or_else(|| EdgeId(format!("{}->{}", raw.source, raw.target)));

        let source = self.graph.node_index(&raw.source);
        let target = self.graph.node_index(&raw.target);
        let (Some(source_idx), Some(target_idx)) = (source, target) else {
            self.report_dangling(&edge_id, raw, source.is_none(), target.is_none());
            return;
        };

        let is_session = self.graph[source_idx].kind() == NodeKind::Session
            || self.graph[target_idx].kind() == NodeKind::Session;
        self.graph.edges.push(GraphEdge {
            id: edge_id,
            source: raw.source.clone(),
            target: raw.target.clone(),
            source_idx,
            target_idx,
            weight: normalize_weight(raw.weight),
            document_id: raw.document_id.clone(),
            kind: if is_session {
                EdgeKind::Session
            } else {
                EdgeKind::Similarity
            },
        });
    }

    fn report_dangling(
        &mut self,
        edge_id: &EdgeId,
        raw: &RawEdge,
        source_missing: bool,
        target_missing: bool,
    ) {
        let missing = [
            (source_missing, EdgeEndpoint::Source, &raw.source),
            (target_missing, EdgeEndpoint::Target, &raw.target),
        ];
        for (is_missing, endpoint, node) in missing {
            if !is_missing || self.excluded.contains(node) {
                continue;
            }
            tracing::warn!(
                "Dropping edge {} because {} node {} is missing from graph model",
                edge_id,
                endpoint,
                node
            );
            self.graph.diagnostics.push(GraphDiagnostic::DanglingEdge {
                edge: edge_id.clone(),
                endpoint,
                node: node.clone(),
            });
        }
    }

    fn finish(self) -> Graph {
        self.graph
    }
}

fn display_name(raw: &RawNode) -> String {
    let name = raw.name.trim();
    if name.is_empty() {
        raw.id.to_string()
    } else {
        name.to_string()
    }
}

fn to_page(page: i64) -> Option<u32> {
    u32::try_from(page).ok().filter(|page| *page > 0)
}

fn normalize_weight(weight: Option<f64>) -> f32 {
    match weight {
        Some(w) if w.is_finite() => w.clamp(0.0, 1.0) as f32,
        Some(_) => 0.0,
        None => 1.0,
    }
}
