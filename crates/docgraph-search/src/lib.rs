use docgraph_core::{NodeId, NodeKind};
use docgraph_graph::{Graph, GraphNode, NodeVisibility};
use nucleo_matcher::pattern::{Atom, AtomKind, CaseMatching, Normalization};
use nucleo_matcher::{Config, Matcher, Utf32String};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Case-insensitive substring search over node names.
pub struct NodeFilter {
    matcher: Matcher,
}

impl Default for NodeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeFilter").finish_non_exhaustive()
    }
}

impl NodeFilter {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
        }
    }

    /// Ids of nodes whose name contains `query`, in graph order.
    ///
    /// A blank query matches nothing rather than everything.
    pub fn matches(&mut self, graph: &Graph, query: &str) -> Vec<NodeId> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let atom = Atom::new(
            query,
            CaseMatching::Ignore,
            Normalization::Never,
            AtomKind::Substring,
            false,
        );

        graph
            .nodes()
            .iter()
            .filter(|node| {
                let name = Utf32String::from(node.name.as_str());
                atom.score(name.slice(..), &mut self.matcher).is_some()
            })
            .map(|node| node.id.clone())
            .collect()
    }
}

/// Finest chapter level drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelThreshold {
    #[default]
    All,
    UpTo(u32),
}

impl LevelThreshold {
    pub fn admits(&self, level: u32) -> bool {
        match self {
            LevelThreshold::All => true,
            LevelThreshold::UpTo(max) => level <= *max,
        }
    }
}

/// Nodes at or above the threshold. Sessions follow their anchor chapter.
pub fn visible(graph: &Graph, threshold: LevelThreshold) -> Vec<NodeId> {
    let chapters: HashSet<&NodeId> = graph
        .chapters()
        .filter(|node| node.level().is_some_and(|level| threshold.admits(level)))
        .map(|node| &node.id)
        .collect();

    graph
        .nodes()
        .iter()
        .filter(|node| match node.kind() {
            NodeKind::Chapter => chapters.contains(&node.id),
            NodeKind::Session => node.anchor().is_some_and(|anchor| chapters.contains(anchor)),
        })
        .map(|node| node.id.clone())
        .collect()
}

/// Live search and level filter state for the graph view.
///
/// Call [`FilterState::refresh`] after any change to the query, threshold or
/// graph; lookups answer from the last refresh.
#[derive(Debug, Default)]
pub struct FilterState {
    query: String,
    threshold: LevelThreshold,
    /// Hide chapters that do not match a non-blank query instead of only
    /// highlighting the ones that do.
    narrow_to_matches: bool,
    matched: HashSet<NodeId>,
    visible: HashSet<NodeId>,
    filter: NodeFilter,
}

impl FilterState {
    pub fn new(threshold: LevelThreshold) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn threshold(&self) -> LevelThreshold {
        self.threshold
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn set_threshold(&mut self, threshold: LevelThreshold) {
        self.threshold = threshold;
    }

    pub fn set_narrow_to_matches(&mut self, narrow: bool) {
        self.narrow_to_matches = narrow;
    }

    /// Recompute matches and visibility against `graph`. Returns the match count.
    pub fn refresh(&mut self, graph: &Graph) -> usize {
        let matched = self.filter.matches(graph, &self.query);
        self.matched = matched.into_iter().collect();

        let mut visible: HashSet<NodeId> = visible(graph, self.threshold).into_iter().collect();
        if self.narrow_to_matches && !self.query.trim().is_empty() {
            let kept_chapters: HashSet<NodeId> = graph
                .chapters()
                .filter(|node| visible.contains(&node.id) && self.matched.contains(&node.id))
                .map(|node| node.id.clone())
                .collect();
            visible.retain(|id| match graph.node(id) {
                Some(node) => match node.anchor() {
                    Some(anchor) => kept_chapters.contains(anchor),
                    None => kept_chapters.contains(id),
                },
                None => false,
            });
        }
        self.visible = visible;

        tracing::trace!(
            "Filter refresh: {} matched, {} visible",
            self.matched.len(),
            self.visible.len()
        );
        self.matched.len()
    }

    pub fn is_highlighted(&self, id: &NodeId) -> bool {
        self.matched.contains(id)
    }

    pub fn is_visible(&self, id: &NodeId) -> bool {
        self.visible.contains(id)
    }

    pub fn match_count(&self) -> usize {
        self.matched.len()
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Matched ids in graph order.
    pub fn matched_in<'a>(&'a self, graph: &'a Graph) -> impl Iterator<Item = &'a NodeId> + 'a {
        graph
            .nodes()
            .iter()
            .map(|node| &node.id)
            .filter(|id| self.matched.contains(*id))
    }
}

impl NodeVisibility for FilterState {
    fn node_visible(&self, node: &GraphNode) -> bool {
        self.is_visible(&node.id)
    }

    fn node_highlighted(&self, node: &GraphNode) -> bool {
        self.is_highlighted(&node.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_core::{RawEdge, RawGraphPayload, RawNode};
    use docgraph_graph::BuildOptions;
    use proptest::prelude::*;

    fn book() -> Graph {
        let payload = RawGraphPayload {
            nodes: vec![
                RawNode::chapter(1, "Introduction", 1),
                RawNode::chapter(2, "Graph Theory Basics", 2),
                RawNode::chapter(3, "Advanced graphs", 3),
                RawNode::chapter(4, "Appendix", 1),
            ],
            edges: vec![RawEdge::new(1, 2, 0.5), RawEdge::new(2, 3, 0.5)],
            session_nodes: vec![
                RawNode::session("s1", 3),
                RawNode::session("s4", 4),
            ],
            ..Default::default()
        };
        Graph::build(&payload, BuildOptions::default())
    }

    fn ids(values: &[&str]) -> Vec<NodeId> {
        values.iter().map(|v| NodeId::from(*v)).collect()
    }

    #[test]
    fn test_substring_match_ignores_case() {
        let graph = book();
        let mut filter = NodeFilter::new();

        assert_eq!(filter.matches(&graph, "GRAPH"), ids(&["2", "3"]));
        assert_eq!(filter.matches(&graph, "  intro "), ids(&["1"]));
        assert!(filter.matches(&graph, "zebra").is_empty());
    }

    #[test]
    fn test_substring_is_not_fuzzy() {
        let graph = book();
        let mut filter = NodeFilter::new();
        // Letters appear in order in "Introduction" but not contiguously.
        assert!(filter.matches(&graph, "itd").is_empty());
    }

    #[test]
    fn test_blank_query_matches_nothing() {
        let graph = book();
        let mut filter = NodeFilter::new();
        assert!(filter.matches(&graph, "").is_empty());
        assert!(filter.matches(&graph, "   \t").is_empty());
    }

    #[test]
    fn test_level_threshold_and_session_anchors() {
        let graph = book();

        assert_eq!(visible(&graph, LevelThreshold::All).len(), graph.node_count());
        assert_eq!(
            visible(&graph, LevelThreshold::UpTo(2)),
            ids(&["1", "2", "4", "s4"])
        );
        assert_eq!(visible(&graph, LevelThreshold::UpTo(0)), Vec::<NodeId>::new());
    }

    #[test]
    fn test_search_and_threshold_compose() {
        let graph = book();
        let mut state = FilterState::new(LevelThreshold::UpTo(2));
        state.set_query("graph");

        assert_eq!(state.refresh(&graph), 2);
        assert!(state.is_highlighted(&NodeId::from(3)));
        assert!(!state.is_visible(&NodeId::from(3)));
        assert!(state.is_visible(&NodeId::from(2)));
        assert!(state.is_visible(&NodeId::from(1)));
    }

    #[test]
    fn test_narrow_mode_hides_unmatched() {
        let graph = book();
        let mut state = FilterState::new(LevelThreshold::All);
        state.set_narrow_to_matches(true);
        state.set_query("graph");
        state.refresh(&graph);

        assert!(!state.is_visible(&NodeId::from(1)));
        assert!(state.is_visible(&NodeId::from(2)));
        assert!(state.is_visible(&NodeId::from("s1")));
        assert!(!state.is_visible(&NodeId::from("s4")));

        state.set_query(" ");
        state.refresh(&graph);
        assert_eq!(state.visible_count(), graph.node_count());
        assert_eq!(state.match_count(), 0);
    }

    #[test]
    fn test_refresh_tracks_graph_changes() {
        let mut state = FilterState::default();
        state.set_query("appendix");
        assert_eq!(state.refresh(&book()), 1);

        assert_eq!(state.refresh(&Graph::new()), 0);
        assert!(!state.is_highlighted(&NodeId::from(4)));
        assert_eq!(state.visible_count(), 0);
    }

    #[test]
    fn test_threshold_serializes_for_settings() {
        let json = serde_json::to_string(&LevelThreshold::UpTo(2)).unwrap();
        let back: LevelThreshold = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LevelThreshold::UpTo(2));
    }

    proptest! {
        #[test]
        fn prop_matches_are_subset_in_graph_order(
            names in prop::collection::vec("[a-cA-C ]{0,6}", 0..12),
            query in "[a-c ]{0,3}",
        ) {
            let payload = RawGraphPayload {
                nodes: names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| RawNode::chapter(i as i64, name.clone(), 1))
                    .collect(),
                ..Default::default()
            };
            let graph = Graph::build(&payload, BuildOptions::default());
            let mut filter = NodeFilter::new();

            let matched = filter.matches(&graph, &query);

            let expected: Vec<NodeId> = graph
                .nodes()
                .iter()
                .filter(|node| {
                    let needle = query.trim().to_lowercase();
                    !needle.is_empty() && node.name.to_lowercase().contains(&needle)
                })
                .map(|node| node.id.clone())
                .collect();
            prop_assert_eq!(matched, expected);
        }
    }
}
