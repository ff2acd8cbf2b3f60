pub mod graph;
pub mod hit_tester;
pub mod interaction;
pub mod layout;
pub mod scene;
pub mod style;
pub mod view;

pub use graph::{
    BuildOptions, ChapterInfo, Graph, GraphEdge, GraphNode, NodeDetail, NodeDisplay, NodeIndex,
    Vec2,
};
pub use hit_tester::HitTester;
pub use interaction::{PointerOutcome, PointerTracker};
pub use layout::{ForceSimulation, LayoutConfig, SimNode};
pub use scene::{NodeVisibility, SceneDescription, SceneEdge, SceneLabel, SceneNode, ShowAll};
pub use style::{Color, LabelStyle};
pub use view::{Bounds, ScaleExtent, ViewTransform};
