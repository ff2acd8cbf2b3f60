use crate::graph::{Graph, Vec2};
use crate::hit_tester::HitTester;
use crate::layout::ForceSimulation;
use crate::scene::NodeVisibility;
use crate::view::ViewTransform;
use docgraph_core::NodeId;

/// What a pointer event turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerOutcome {
    None,
    /// Pointer went down on a node; click or drag is not decided yet.
    Pressed(NodeId),
    /// Down and up on a node with no movement in between.
    Click(NodeId),
    DragStarted(NodeId),
    DragMoved(NodeId),
    DragEnded(NodeId),
    /// Background drag moved the view.
    Panned,
}

#[derive(Debug, Clone, PartialEq)]
enum PointerState {
    Idle,
    Pressed {
        node: NodeId,
        origin: Vec2,
        /// Node position minus pointer position, in graph space.
        grab: Vec2,
    },
    Dragging {
        node: NodeId,
        grab: Vec2,
    },
    Panning {
        last: Vec2,
    },
}

/// Click-vs-drag state machine for a single pointer.
///
/// Only one node is ever pinned by a drag. Any movement past
/// `drag_threshold` screen pixels turns a press into a drag, and a drag
/// never produces a click.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    state: PointerState,
    hit_tester: HitTester,
    drag_threshold: f32,
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerTracker {
    pub fn new() -> Self {
        Self {
            state: PointerState::Idle,
            hit_tester: HitTester::new(),
            drag_threshold: 0.0,
        }
    }

    pub fn with_drag_threshold(mut self, threshold: f32) -> Self {
        self.drag_threshold = threshold.max(0.0);
        self
    }

    pub fn with_hit_tester(mut self, hit_tester: HitTester) -> Self {
        self.hit_tester = hit_tester;
        self
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, PointerState::Dragging { .. })
    }

    pub fn dragged_node(&self) -> Option<&NodeId> {
        match &self.state {
            PointerState::Dragging { node, .. } => Some(node),
            _ => None,
        }
    }

    pub fn pointer_down<V: NodeVisibility + ?Sized>(
        &mut self,
        screen: Vec2,
        graph: &Graph,
        sim: &mut ForceSimulation,
        view: &ViewTransform,
        visibility: &V,
    ) -> PointerOutcome {
        if let PointerState::Dragging { node, .. } = &self.state {
            tracing::debug!("Pointer pressed mid-drag, releasing {}", node);
            release(sim, node);
        }

        let point = view.invert(screen);
        let hit = self
            .hit_tester
            .hit_node(graph, sim, point, view.scale, visibility);
        match hit.and_then(|id| sim.position(&id).map(|pos| (id, pos))) {
            Some((node, pos)) => {
                self.state = PointerState::Pressed {
                    node: node.clone(),
                    origin: screen,
                    grab: Vec2::new(pos.x - point.x, pos.y - point.y),
                };
                PointerOutcome::Pressed(node)
            }
            None => {
                self.state = PointerState::Panning { last: screen };
                PointerOutcome::None
            }
        }
    }

    pub fn pointer_move(
        &mut self,
        screen: Vec2,
        sim: &mut ForceSimulation,
        view: &mut ViewTransform,
    ) -> PointerOutcome {
        match std::mem::replace(&mut self.state, PointerState::Idle) {
            PointerState::Idle => PointerOutcome::None,
            PointerState::Pressed { node, origin, grab } => {
                if screen.distance(origin) <= self.drag_threshold {
                    self.state = PointerState::Pressed { node, origin, grab };
                    return PointerOutcome::None;
                }
                let Some(start) = sim.position(&node) else {
                    return PointerOutcome::None;
                };
                let heat = sim.config().drag_alpha_target;
                sim.pin(&node, start.x, start.y);
                sim.set_alpha_target(heat);
                sim.restart();
                self.follow(&node, screen, grab, sim, view);
                self.state = PointerState::Dragging {
                    node: node.clone(),
                    grab,
                };
                PointerOutcome::DragStarted(node)
            }
            PointerState::Dragging { node, grab } => {
                if !self.follow(&node, screen, grab, sim, view) {
                    // Node vanished with a graph swap.
                    release(sim, &node);
                    return PointerOutcome::None;
                }
                self.state = PointerState::Dragging {
                    node: node.clone(),
                    grab,
                };
                PointerOutcome::DragMoved(node)
            }
            PointerState::Panning { last } => {
                view.pan_by(screen.x - last.x, screen.y - last.y);
                self.state = PointerState::Panning { last: screen };
                PointerOutcome::Panned
            }
        }
    }

    pub fn pointer_up(&mut self, sim: &mut ForceSimulation) -> PointerOutcome {
        match std::mem::replace(&mut self.state, PointerState::Idle) {
            PointerState::Pressed { node, .. } => PointerOutcome::Click(node),
            PointerState::Dragging { node, .. } => {
                release(sim, &node);
                PointerOutcome::DragEnded(node)
            }
            PointerState::Idle | PointerState::Panning { .. } => PointerOutcome::None,
        }
    }

    /// Abandon the gesture without producing a click.
    pub fn cancel(&mut self, sim: &mut ForceSimulation) -> PointerOutcome {
        match std::mem::replace(&mut self.state, PointerState::Idle) {
            PointerState::Dragging { node, .. } => {
                release(sim, &node);
                PointerOutcome::DragEnded(node)
            }
            _ => PointerOutcome::None,
        }
    }

    fn follow(
        &self,
        node: &NodeId,
        screen: Vec2,
        grab: Vec2,
        sim: &mut ForceSimulation,
        view: &ViewTransform,
    ) -> bool {
        let point = view.invert(screen);
        sim.pin(node, point.x + grab.x, point.y + grab.y)
    }
}

fn release(sim: &mut ForceSimulation, node: &NodeId) {
    sim.unpin(node);
    sim.set_alpha_target(0.0);
}
