//! Force-directed layout.
//!
//! A velocity-Verlet style simulation with the usual cooling schedule: every
//! tick moves `alpha` a fraction `alpha_decay` of the way toward
//! `alpha_target`, forces add to node velocities scaled by `alpha`, and
//! velocities are damped by `velocity_decay` before being integrated. The
//! simulation stops itself once `alpha` falls below `alpha_min`.

use crate::graph::{Graph, NodeIndex, Vec2};
use crate::view::Bounds;
use docgraph_core::{ContainerSize, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Many-body strength. Negative values repel.
    pub charge_strength: f32,
    pub distance_min: f32,
    /// Pairs further apart than this ignore each other.
    pub distance_max: Option<f32>,
    /// Rest length of a link with zero similarity.
    pub link_distance: f32,
    /// Fraction of the rest length removed for a link of similarity 1.
    pub similarity_shortening: f32,
    pub center_strength: f32,
    /// Pull toward the container centre on each axis. 0 disables it.
    pub axis_strength: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
    /// Per-tick speed cap; keeps pathological input from running away.
    pub max_velocity: f32,
    /// Heat held while a node is being dragged.
    pub drag_alpha_target: f32,
    /// Mean kinetic energy per node under which the layout counts as at rest.
    pub settle_energy: f32,
    pub container: ContainerSize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let alpha_min = 0.001;
        Self {
            charge_strength: -500.0,
            distance_min: 1.0,
            distance_max: None,
            link_distance: 600.0,
            similarity_shortening: 0.5,
            center_strength: 1.0,
            axis_strength: 0.0,
            alpha_min,
            alpha_decay: Self::decay_for(alpha_min, 300),
            velocity_decay: 0.4,
            max_velocity: 1000.0,
            drag_alpha_target: 0.3,
            settle_energy: 0.5,
            container: ContainerSize::default(),
        }
    }
}

impl LayoutConfig {
    /// Decay that takes alpha from 1 to `alpha_min` in `iterations` ticks.
    pub fn decay_for(alpha_min: f32, iterations: u32) -> f32 {
        1.0 - alpha_min.powf(1.0 / iterations.max(1) as f32)
    }
}

/// Per-node simulation state. `fx`/`fy` pin the node when set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimNode {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub fx: Option<f32>,
    pub fy: Option<f32>,
}

impl SimNode {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn is_pinned(&self) -> bool {
        self.fx.is_some() || self.fy.is_some()
    }

    fn speed_squared(&self) -> f32 {
        self.vx * self.vx + self.vy * self.vy
    }
}

#[derive(Debug, Clone, Copy)]
struct Link {
    source: usize,
    target: usize,
    distance: f32,
    strength: f32,
    bias: f32,
}

const INITIAL_RADIUS: f32 = 10.0;
const JIGGLE_SCALE: f32 = 1e-6;

/// Owns node positions for one graph. Indices line up with [`Graph::nodes`].
#[derive(Debug, Clone)]
pub struct ForceSimulation {
    config: LayoutConfig,
    ids: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
    nodes: Vec<SimNode>,
    links: Vec<Link>,
    edge_count: usize,
    alpha: f32,
    alpha_target: f32,
    running: bool,
    rng: u64,
}

impl ForceSimulation {
    pub fn new(graph: &Graph, config: LayoutConfig) -> Self {
        let mut sim = Self {
            config,
            ids: Vec::new(),
            index: HashMap::new(),
            nodes: Vec::new(),
            links: Vec::new(),
            edge_count: 0,
            alpha: 1.0,
            alpha_target: 0.0,
            running: true,
            rng: 0x9e37_79b9_7f4a_7c15,
        };
        sim.load(graph);
        sim
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// True once the simulation has cooled or node motion has died down.
    pub fn is_settled(&self) -> bool {
        if !self.running || self.nodes.is_empty() {
            return true;
        }
        self.alpha_target < self.config.alpha_min
            && self.kinetic_energy() / self.nodes.len() as f32 <= self.config.settle_energy
    }

    /// Sum of `(vx² + vy²) / 2` over all free nodes.
    pub fn kinetic_energy(&self) -> f32 {
        self.nodes
            .iter()
            .filter(|node| !node.is_pinned())
            .map(|node| node.speed_squared() / 2.0)
            .sum()
    }

    pub fn restart(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    pub fn reheat(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
        self.restart();
    }

    pub fn set_container(&mut self, container: ContainerSize) {
        self.config.container = container;
        self.restart();
    }

    /// Advance one tick if the simulation is running. Returns whether it ticked.
    pub fn step(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.tick();
        if self.alpha < self.config.alpha_min {
            self.running = false;
            tracing::debug!("Layout cooled after reaching alpha {:.5}", self.alpha);
        }
        true
    }

    /// Step until cooled or `max_ticks` have run. Returns the number of ticks taken.
    pub fn run(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.step() {
            ticks += 1;
        }
        ticks
    }

    /// Apply forces and integrate once, regardless of the running flag.
    pub fn tick(&mut self) {
        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;

        self.apply_links();
        self.apply_charge();
        self.apply_axis();

        let damping = 1.0 - self.config.velocity_decay;
        let max_speed = self.config.max_velocity;
        for node in &mut self.nodes {
            match node.fx {
                Some(fx) => {
                    node.x = fx;
                    node.vx = 0.0;
                }
                None => {
                    node.vx *= damping;
                }
            }
            match node.fy {
                Some(fy) => {
                    node.y = fy;
                    node.vy = 0.0;
                }
                None => {
                    node.vy *= damping;
                }
            }
            if max_speed > 0.0 {
                let speed = node.speed_squared().sqrt();
                if speed > max_speed {
                    let scale = max_speed / speed;
                    node.vx *= scale;
                    node.vy *= scale;
                }
            }
            if node.fx.is_none() {
                node.x += node.vx;
            }
            if node.fy.is_none() {
                node.y += node.vy;
            }
        }

        self.apply_center();
        self.repair_divergence();
    }

    /// Swap in a new graph. Surviving ids keep their position, velocity and
    /// pin; new ids are placed fresh. A change in node or edge count reheats.
    pub fn update_input(&mut self, graph: &Graph) {
        let resized = graph.node_count() != self.nodes.len() || graph.edge_count() != self.edge_count;
        self.load(graph);
        if resized {
            tracing::debug!(
                "Layout input changed to {} nodes / {} edges, restarting",
                graph.node_count(),
                graph.edge_count()
            );
            self.reheat(1.0);
        }
    }

    /// Fix a node at `(x, y)`. Non-finite coordinates are ignored.
    pub fn pin(&mut self, id: &NodeId, x: f32, y: f32) -> bool {
        if !x.is_finite() || !y.is_finite() {
            return false;
        }
        let Some(node) = self.index.get(id).map(|&i| &mut self.nodes[i]) else {
            return false;
        };
        node.fx = Some(x);
        node.fy = Some(y);
        true
    }

    pub fn unpin(&mut self, id: &NodeId) -> bool {
        let Some(node) = self.index.get(id).map(|&i| &mut self.nodes[i]) else {
            return false;
        };
        node.fx = None;
        node.fy = None;
        true
    }

    pub fn is_pinned(&self, id: &NodeId) -> bool {
        self.node(id).is_some_and(SimNode::is_pinned)
    }

    pub fn node(&self, id: &NodeId) -> Option<&SimNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn node_at(&self, idx: NodeIndex) -> Option<&SimNode> {
        self.nodes.get(idx.0)
    }

    pub fn position(&self, id: &NodeId) -> Option<Vec2> {
        self.node(id).map(SimNode::position)
    }

    pub fn position_at(&self, idx: NodeIndex) -> Option<Vec2> {
        self.node_at(idx).map(SimNode::position)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&NodeId, Vec2)> {
        self.ids
            .iter()
            .zip(self.nodes.iter().map(SimNode::position))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.nodes.iter().map(SimNode::position))
    }

    fn load(&mut self, graph: &Graph) {
        let mut previous: HashMap<NodeId, SimNode> = self
            .ids
            .drain(..)
            .zip(self.nodes.drain(..))
            .collect();
        self.index.clear();

        for (i, node) in graph.nodes().iter().enumerate() {
            let state = previous
                .remove(&node.id)
                .unwrap_or_else(|| self.initial_placement(i));
            self.index.insert(node.id.clone(), i);
            self.ids.push(node.id.clone());
            self.nodes.push(state);
        }

        self.edge_count = graph.edge_count();
        self.rebuild_links(graph);
    }

    /// Phyllotaxis spiral around the container centre.
    fn initial_placement(&self, i: usize) -> SimNode {
        let angle_step = PI * (3.0 - 5f32.sqrt());
        let radius = INITIAL_RADIUS * (0.5 + i as f32).sqrt();
        let angle = i as f32 * angle_step;
        let (cx, cy) = self.config.container.center();
        SimNode {
            x: cx + radius * angle.cos(),
            y: cy + radius * angle.sin(),
            ..Default::default()
        }
    }

    fn rebuild_links(&mut self, graph: &Graph) {
        let mut count = vec![0usize; self.nodes.len()];
        let pairs: Vec<(usize, usize, f32)> = graph
            .edges()
            .iter()
            .filter(|edge| !edge.is_self_loop())
            .map(|edge| (edge.source_idx.0, edge.target_idx.0, edge.weight))
            .collect();
        for &(source, target, _) in &pairs {
            count[source] += 1;
            count[target] += 1;
        }

        let shortening = self.config.similarity_shortening.clamp(0.0, 1.0);
        self.links = pairs
            .into_iter()
            .map(|(source, target, weight)| {
                let (cs, ct) = (count[source] as f32, count[target] as f32);
                Link {
                    source,
                    target,
                    distance: self.config.link_distance * (1.0 - shortening * weight),
                    strength: 1.0 / cs.min(ct),
                    bias: cs / (cs + ct),
                }
            })
            .collect();
    }

    fn jiggle(&mut self) -> f32 {
        // xorshift64*
        self.rng ^= self.rng >> 12;
        self.rng ^= self.rng << 25;
        self.rng ^= self.rng >> 27;
        let bits = self.rng.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 40;
        ((bits as f32 / (1u64 << 24) as f32) - 0.5) * JIGGLE_SCALE
    }

    fn apply_links(&mut self) {
        for k in 0..self.links.len() {
            let link = self.links[k];
            let (s, t) = (self.nodes[link.source], self.nodes[link.target]);
            let mut x = t.x + t.vx - s.x - s.vx;
            let mut y = t.y + t.vy - s.y - s.vy;
            if x == 0.0 {
                x = self.jiggle();
            }
            if y == 0.0 {
                y = self.jiggle();
            }
            let len = (x * x + y * y).sqrt();
            if len == 0.0 {
                continue;
            }
            let l = (len - link.distance) / len * self.alpha * link.strength;
            x *= l;
            y *= l;

            let target = &mut self.nodes[link.target];
            target.vx -= x * link.bias;
            target.vy -= y * link.bias;
            let source = &mut self.nodes[link.source];
            source.vx += x * (1.0 - link.bias);
            source.vy += y * (1.0 - link.bias);
        }
    }

    fn apply_charge(&mut self) {
        let strength = self.config.charge_strength;
        if strength == 0.0 {
            return;
        }
        let min2 = self.config.distance_min * self.config.distance_min;
        let max2 = self
            .config
            .distance_max
            .map_or(f32::INFINITY, |max| max * max);

        for i in 0..self.nodes.len() {
            for j in 0..self.nodes.len() {
                if i == j {
                    continue;
                }
                let mut dx = self.nodes[j].x - self.nodes[i].x;
                let mut dy = self.nodes[j].y - self.nodes[i].y;
                let mut l = dx * dx + dy * dy;
                if l >= max2 {
                    continue;
                }
                if dx == 0.0 {
                    dx = self.jiggle();
                    l += dx * dx;
                }
                if dy == 0.0 {
                    dy = self.jiggle();
                    l += dy * dy;
                }
                if l < min2 {
                    l = (min2 * l).sqrt();
                }
                let w = strength * self.alpha / l;
                self.nodes[i].vx += dx * w;
                self.nodes[i].vy += dy * w;
            }
        }
    }

    fn apply_axis(&mut self) {
        let strength = self.config.axis_strength;
        if strength == 0.0 {
            return;
        }
        let (cx, cy) = self.config.container.center();
        let k = strength * self.alpha;
        for node in &mut self.nodes {
            node.vx += (cx - node.x) * k;
            node.vy += (cy - node.y) * k;
        }
    }

    /// Translate the whole layout so its mean sits on the container centre.
    fn apply_center(&mut self) {
        if self.nodes.is_empty() || self.config.center_strength == 0.0 {
            return;
        }
        let n = self.nodes.len() as f32;
        let (sx, sy) = self
            .nodes
            .iter()
            .fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
        let (cx, cy) = self.config.container.center();
        let shift_x = (sx / n - cx) * self.config.center_strength;
        let shift_y = (sy / n - cy) * self.config.center_strength;
        if !shift_x.is_finite() || !shift_y.is_finite() {
            return;
        }
        for node in &mut self.nodes {
            if node.fx.is_none() {
                node.x -= shift_x;
            }
            if node.fy.is_none() {
                node.y -= shift_y;
            }
        }
    }

    fn repair_divergence(&mut self) {
        let (cx, cy) = self.config.container.center();
        for (id, node) in self.ids.iter().zip(self.nodes.iter_mut()) {
            let finite = node.x.is_finite()
                && node.y.is_finite()
                && node.vx.is_finite()
                && node.vy.is_finite();
            if !finite {
                tracing::debug!("Resetting diverged node {} to the container centre", id);
                node.x = node.fx.filter(|v| v.is_finite()).unwrap_or(cx);
                node.y = node.fy.filter(|v| v.is_finite()).unwrap_or(cy);
                node.vx = 0.0;
                node.vy = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::BuildOptions;
    use docgraph_core::{RawEdge, RawGraphPayload, RawNode};
    use proptest::prelude::*;

    fn small_config() -> LayoutConfig {
        LayoutConfig {
            charge_strength: -30.0,
            link_distance: 60.0,
            ..Default::default()
        }
    }

    fn chain(n: i64) -> Graph {
        let payload = RawGraphPayload {
            nodes: (0..n)
                .map(|i| RawNode::chapter(i, format!("c{i}"), 1 + i % 3))
                .collect(),
            edges: (1..n).map(|i| RawEdge::new(i - 1, i, 0.5)).collect(),
            ..Default::default()
        };
        Graph::build(&payload, BuildOptions::default())
    }

    #[test]
    fn test_default_decay_cools_in_about_300_ticks() {
        let config = LayoutConfig::default();
        assert!((config.alpha_decay - 0.0228).abs() < 1e-3);

        let mut sim = ForceSimulation::new(&chain(5), config);
        let ticks = sim.run(1000);
        assert!((290..=310).contains(&ticks), "took {ticks} ticks");
        assert!(!sim.is_running());
    }

    #[test]
    fn test_initial_placement_is_deterministic_and_distinct() {
        let graph = chain(12);
        let a = ForceSimulation::new(&graph, small_config());
        let b = ForceSimulation::new(&graph, small_config());

        let pa: Vec<Vec2> = a.positions().map(|(_, p)| p).collect();
        let pb: Vec<Vec2> = b.positions().map(|(_, p)| p).collect();
        assert_eq!(pa, pb);
        for i in 0..pa.len() {
            for j in (i + 1)..pa.len() {
                assert!(pa[i].distance(pa[j]) > 1.0);
            }
        }
    }

    #[test]
    fn test_simulation_reaches_low_energy() {
        let mut sim = ForceSimulation::new(&chain(20), small_config());
        let mut peak = 0.0f32;
        for _ in 0..30 {
            sim.tick();
            peak = peak.max(sim.kinetic_energy());
        }

        sim.run(1000);

        assert!(sim.is_settled());
        let mean = sim.kinetic_energy() / sim.len() as f32;
        assert!(mean < 1.0, "mean kinetic energy {mean}");
        assert!(sim.kinetic_energy() < peak * 0.01);
    }

    #[test]
    fn test_connected_nodes_separate_from_same_point() {
        let graph = chain(2);
        let (a, b) = (NodeId::from(0), NodeId::from(1));
        let mut sim = ForceSimulation::new(&graph, small_config());
        sim.pin(&a, 300.0, 400.0);
        sim.pin(&b, 300.0, 400.0);
        sim.tick();
        assert_eq!(sim.position(&a), sim.position(&b));

        sim.unpin(&a);
        sim.unpin(&b);
        sim.reheat(1.0);
        sim.run(1000);

        let gap = sim.position(&a).unwrap().distance(sim.position(&b).unwrap());
        assert!(gap > 1.0, "nodes still coincide: gap {gap}");
    }

    #[test]
    fn test_pinned_node_holds_position_while_others_move() {
        let graph = chain(4);
        let pinned = NodeId::from(0);
        let free = NodeId::from(3);
        let mut sim = ForceSimulation::new(&graph, small_config());
        sim.pin(&pinned, 10.0, 20.0);
        let free_start = sim.position(&free).unwrap();

        sim.run(50);

        assert_eq!(sim.position(&pinned), Some(Vec2::new(10.0, 20.0)));
        assert!(sim.is_pinned(&pinned));
        assert!(!sim.is_pinned(&free));
        assert_ne!(sim.position(&free), Some(free_start));
    }

    #[test]
    fn test_drag_heat_keeps_simulation_running() {
        let mut sim = ForceSimulation::new(&chain(3), small_config());
        sim.run(1000);
        assert!(!sim.is_running());

        sim.set_alpha_target(sim.config().drag_alpha_target);
        sim.restart();
        sim.run(500);
        assert!(sim.is_running());
        assert!((sim.alpha() - 0.3).abs() < 0.01);

        sim.set_alpha_target(0.0);
        sim.run(1000);
        assert!(!sim.is_running());
    }

    #[test]
    fn test_update_input_keeps_survivors_and_reheats() {
        let mut sim = ForceSimulation::new(&chain(3), small_config());
        sim.run(1000);
        let kept = sim.position(&NodeId::from(1)).unwrap();

        sim.update_input(&chain(4));

        assert_eq!(sim.len(), 4);
        assert_eq!(sim.position(&NodeId::from(1)), Some(kept));
        assert!(sim.position(&NodeId::from(3)).is_some());
        assert_eq!(sim.alpha(), 1.0);
        assert!(sim.is_running());
    }

    #[test]
    fn test_update_input_with_same_shape_does_not_reheat() {
        let graph = chain(3);
        let mut sim = ForceSimulation::new(&graph, small_config());
        sim.run(1000);

        sim.update_input(&graph);

        assert!(!sim.is_running());
        assert!(sim.alpha() < 0.001);
    }

    #[test]
    fn test_self_loop_exerts_no_link_force() {
        let payload = RawGraphPayload {
            nodes: vec![RawNode::chapter(1, "Solo", 1)],
            edges: vec![RawEdge::new(1, 1, 1.0)],
            ..Default::default()
        };
        let graph = Graph::build(&payload, BuildOptions::default());
        assert_eq!(graph.edge_count(), 1);

        let mut sim = ForceSimulation::new(&graph, small_config());
        sim.run(500);

        let p = sim.position(&NodeId::from(1)).unwrap();
        assert!(p.distance(Vec2::new(300.0, 400.0)) < 1e-3);
    }

    #[test]
    fn test_diverged_nodes_are_reset_to_centre() {
        let mut sim = ForceSimulation::new(&chain(3), small_config());
        sim.nodes[1].x = f32::NAN;
        sim.nodes[2].vy = f32::INFINITY;

        sim.tick();

        for (_, p) in sim.positions() {
            assert!(p.x.is_finite() && p.y.is_finite());
        }
        assert!(sim.nodes.iter().all(|n| n.vx.is_finite() && n.vy.is_finite()));
    }

    #[test]
    fn test_pin_rejects_unknown_ids_and_non_finite_points() {
        let mut sim = ForceSimulation::new(&chain(2), small_config());
        assert!(!sim.pin(&NodeId::from(99), 0.0, 0.0));
        assert!(!sim.pin(&NodeId::from(0), f32::NAN, 0.0));
        assert!(!sim.is_pinned(&NodeId::from(0)));
    }

    #[test]
    fn test_empty_graph_is_settled() {
        let mut sim = ForceSimulation::new(&Graph::new(), LayoutConfig::default());
        sim.tick();
        assert!(sim.is_empty());
        assert!(sim.is_settled());
        assert!(sim.bounds().is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_positions_stay_finite(
            nodes in 1i64..15,
            edges in prop::collection::vec((0i64..15, 0i64..15, 0.0f64..1.0), 0..30),
        ) {
            let payload = RawGraphPayload {
                nodes: (0..nodes).map(|i| RawNode::chapter(i, "n", 1)).collect(),
                edges: edges.into_iter().map(|(s, t, w)| RawEdge::new(s, t, w)).collect(),
                ..Default::default()
            };
            let graph = Graph::build(&payload, BuildOptions::default());
            let mut sim = ForceSimulation::new(&graph, LayoutConfig::default());

            sim.run(400);

            for (_, p) in sim.positions() {
                prop_assert!(p.x.is_finite() && p.y.is_finite());
            }
        }
    }
}
