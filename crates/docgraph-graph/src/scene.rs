//! Declarative per-frame output.
//!
//! A [`SceneDescription`] is everything a renderer needs to draw one frame:
//! where nodes and edges go, how big and what colour they are, and which
//! labels are legible at the current zoom. Producing one never touches a
//! display surface.

use crate::graph::{Graph, GraphNode, Vec2};
use crate::layout::ForceSimulation;
use crate::style::{self, Color, LabelStyle};
use crate::view::ViewTransform;
use docgraph_core::{EdgeId, EdgeKind, NodeId, NodeKind};
use serde::Serialize;

/// Decides which nodes are drawn and which are emphasised.
pub trait NodeVisibility {
    fn node_visible(&self, _node: &GraphNode) -> bool {
        true
    }

    fn node_highlighted(&self, _node: &GraphNode) -> bool {
        false
    }
}

/// Draw everything, highlight nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShowAll;

impl NodeVisibility for ShowAll {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneLabel {
    pub text: String,
    pub font_size: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Graph-space position; the renderer applies `transform`.
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: Color,
    pub label: Option<SceneLabel>,
    pub highlighted: bool,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneEdge {
    pub id: EdgeId,
    pub kind: EdgeKind,
    pub from: Vec2,
    pub to: Vec2,
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneDescription {
    pub transform: ViewTransform,
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
}

impl SceneDescription {
    /// Snapshot the current frame. Edges are drawn only when both endpoints are.
    pub fn describe<V: NodeVisibility + ?Sized>(
        graph: &Graph,
        sim: &ForceSimulation,
        transform: ViewTransform,
        labels: &LabelStyle,
        visibility: &V,
    ) -> Self {
        let font_size = labels.font_size(transform.scale);
        let mut shown = vec![false; graph.node_count()];
        let mut nodes = Vec::with_capacity(graph.node_count());

        for idx in graph.node_indices() {
            let node = &graph[idx];
            let Some(sim_node) = sim.node_at(idx) else {
                continue;
            };
            if !visibility.node_visible(node) {
                continue;
            }
            shown[idx.0] = true;

            let highlighted = visibility.node_highlighted(node);
            let label = (highlighted || style::label_visible(&node.display, transform.scale))
                .then(|| SceneLabel {
                    text: node.name.clone(),
                    font_size,
                });
            nodes.push(SceneNode {
                id: node.id.clone(),
                kind: node.kind(),
                x: sim_node.x,
                y: sim_node.y,
                radius: node.display.radius,
                color: node.display.color,
                label,
                highlighted,
                pinned: sim_node.is_pinned(),
            });
        }

        let edges = graph
            .edges()
            .iter()
            .filter(|edge| shown[edge.source_idx.0] && shown[edge.target_idx.0])
            .filter_map(|edge| {
                Some(SceneEdge {
                    id: edge.id.clone(),
                    kind: edge.kind,
                    from: sim.position_at(edge.source_idx)?,
                    to: sim.position_at(edge.target_idx)?,
                    width: style::edge_width(edge.weight),
                    color: style::EDGE_COLOR,
                })
            })
            .collect();

        Self {
            transform,
            nodes,
            edges,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    pub fn labelled(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter().filter(|node| node.label.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::BuildOptions;
    use crate::layout::LayoutConfig;
    use docgraph_core::{RawEdge, RawGraphPayload, RawNode};

    fn fixture() -> (Graph, ForceSimulation) {
        let payload = RawGraphPayload {
            nodes: vec![
                RawNode::chapter(1, "Intro", 1),
                RawNode::chapter(2, "Detail", 3),
            ],
            edges: vec![RawEdge::new(1, 2, 0.25)],
            ..Default::default()
        };
        let graph = Graph::build(&payload, BuildOptions::default());
        let sim = ForceSimulation::new(&graph, LayoutConfig::default());
        (graph, sim)
    }

    #[test]
    fn test_labels_follow_zoom_level() {
        let (graph, sim) = fixture();
        let style = LabelStyle::default();

        let far = SceneDescription::describe(
            &graph,
            &sim,
            ViewTransform::new(0.0, 0.0, 0.2),
            &style,
            &ShowAll,
        );
        let near = SceneDescription::describe(
            &graph,
            &sim,
            ViewTransform::new(0.0, 0.0, 2.0),
            &style,
            &ShowAll,
        );

        assert!(far.node(&NodeId::from(1)).unwrap().label.is_some());
        assert!(far.node(&NodeId::from(2)).unwrap().label.is_none());
        assert_eq!(near.labelled().count(), 2);
        assert_eq!(near.nodes[0].label.as_ref().unwrap().font_size, 6.0);
    }

    #[test]
    fn test_edge_width_and_endpoints() {
        let (graph, sim) = fixture();
        let scene = SceneDescription::describe(
            &graph,
            &sim,
            ViewTransform::identity(),
            &LabelStyle::default(),
            &ShowAll,
        );

        assert_eq!(scene.edges.len(), 1);
        let edge = &scene.edges[0];
        assert_eq!(edge.width, 1.0);
        assert_eq!(Some(edge.from), sim.position(&NodeId::from(1)));
        assert_eq!(Some(edge.to), sim.position(&NodeId::from(2)));
    }

    struct OnlyIntro;

    impl NodeVisibility for OnlyIntro {
        fn node_visible(&self, node: &GraphNode) -> bool {
            node.level() == Some(1)
        }

        fn node_highlighted(&self, _node: &GraphNode) -> bool {
            true
        }
    }

    #[test]
    fn test_hidden_endpoint_hides_edge() {
        let (graph, sim) = fixture();
        let scene = SceneDescription::describe(
            &graph,
            &sim,
            ViewTransform::new(0.0, 0.0, 0.01),
            &LabelStyle::default(),
            &OnlyIntro,
        );

        assert_eq!(scene.nodes.len(), 1);
        assert!(scene.edges.is_empty());
        assert!(scene.nodes[0].highlighted);
        assert!(scene.nodes[0].label.is_some());
    }

    #[test]
    fn test_empty_graph_renders_nothing() {
        let graph = Graph::new();
        let sim = ForceSimulation::new(&graph, LayoutConfig::default());
        let scene = SceneDescription::describe(
            &graph,
            &sim,
            ViewTransform::identity(),
            &LabelStyle::default(),
            &ShowAll,
        );
        assert!(scene.is_empty());
        assert!(scene.edges.is_empty());
    }
}
