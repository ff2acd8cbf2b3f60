use crate::graph::{Graph, Vec2};
use crate::layout::ForceSimulation;
use crate::scene::NodeVisibility;
use docgraph_core::NodeId;

/// Circle hit testing against simulated node positions.
///
/// Works in graph space: callers invert the view transform first. Nodes are
/// drawn in graph order, so when circles overlap the last one wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTester {
    /// Extra slack around each circle, in screen pixels.
    tolerance: f32,
}

impl Default for HitTester {
    fn default() -> Self {
        Self::new()
    }
}

impl HitTester {
    pub fn new() -> Self {
        Self { tolerance: 2.0 }
    }

    pub fn with_tolerance(tolerance: f32) -> Self {
        Self {
            tolerance: tolerance.max(0.0),
        }
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Topmost visible node whose circle contains `point`.
    ///
    /// `scale` is the current zoom, used to convert the pixel tolerance into
    /// graph units.
    pub fn hit_node<V: NodeVisibility + ?Sized>(
        &self,
        graph: &Graph,
        sim: &ForceSimulation,
        point: Vec2,
        scale: f32,
        visibility: &V,
    ) -> Option<NodeId> {
        let slack = if scale.is_finite() && scale > 0.0 {
            self.tolerance / scale
        } else {
            self.tolerance
        };

        graph
            .node_indices()
            .rev()
            .filter(|&idx| visibility.node_visible(&graph[idx]))
            .find(|&idx| {
                sim.position_at(idx).is_some_and(|pos| {
                    pos.distance(point) <= graph[idx].display.radius + slack
                })
            })
            .map(|idx| graph[idx].id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BuildOptions, GraphNode};
    use crate::layout::LayoutConfig;
    use crate::scene::ShowAll;
    use docgraph_core::{RawGraphPayload, RawNode};

    fn two_nodes() -> (Graph, ForceSimulation) {
        let payload = RawGraphPayload {
            nodes: vec![RawNode::chapter(1, "A", 1), RawNode::chapter(2, "B", 1)],
            ..Default::default()
        };
        let graph = Graph::build(&payload, BuildOptions::default());
        let sim = ForceSimulation::new(&graph, LayoutConfig::default());
        (graph, sim)
    }

    #[test]
    fn test_hit_inside_and_outside_circle() {
        let (graph, mut sim) = two_nodes();
        sim.pin(&NodeId::from(1), 0.0, 0.0);
        sim.pin(&NodeId::from(2), 500.0, 0.0);
        sim.tick();
        let tester = HitTester::with_tolerance(0.0);

        assert_eq!(
            tester.hit_node(&graph, &sim, Vec2::new(10.0, 0.0), 1.0, &ShowAll),
            Some(NodeId::from(1))
        );
        assert_eq!(
            tester.hit_node(&graph, &sim, Vec2::new(250.0, 0.0), 1.0, &ShowAll),
            None
        );
    }

    #[test]
    fn test_overlapping_nodes_pick_topmost() {
        let (graph, mut sim) = two_nodes();
        sim.pin(&NodeId::from(1), 0.0, 0.0);
        sim.pin(&NodeId::from(2), 5.0, 0.0);
        sim.tick();

        let hit = HitTester::new().hit_node(&graph, &sim, Vec2::new(2.0, 0.0), 1.0, &ShowAll);
        assert_eq!(hit, Some(NodeId::from(2)));
    }

    struct HideTwo;

    impl NodeVisibility for HideTwo {
        fn node_visible(&self, node: &GraphNode) -> bool {
            node.id != NodeId::from(2)
        }
    }

    #[test]
    fn test_hidden_nodes_are_not_hit() {
        let (graph, mut sim) = two_nodes();
        sim.pin(&NodeId::from(1), 0.0, 0.0);
        sim.pin(&NodeId::from(2), 5.0, 0.0);
        sim.tick();

        let hit = HitTester::new().hit_node(&graph, &sim, Vec2::new(2.0, 0.0), 1.0, &HideTwo);
        assert_eq!(hit, Some(NodeId::from(1)));
    }
}
