use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Graph,
    Document,
}

/// Identifies one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub kind: RequestKind,
    pub seq: u64,
}

/// Hands out tickets and remembers the newest per kind. Only the newest
/// ticket's response is applied; anything older was superseded.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: HashMap<RequestKind, u64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, kind: RequestKind) -> Ticket {
        let seq = self.latest.entry(kind).or_insert(0);
        *seq += 1;
        Ticket { kind, seq: *seq }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.get(&ticket.kind) == Some(&ticket.seq)
    }

    /// Supersede whatever is in flight without issuing a new request.
    pub fn invalidate(&mut self, kind: RequestKind) {
        *self.latest.entry(kind).or_insert(0) += 1;
    }

    pub fn invalidate_all(&mut self) {
        for kind in [RequestKind::Graph, RequestKind::Document] {
            self.invalidate(kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let mut tracker = RequestTracker::new();
        let first = tracker.issue(RequestKind::Graph);
        let second = tracker.issue(RequestKind::Graph);

        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut tracker = RequestTracker::new();
        let graph = tracker.issue(RequestKind::Graph);
        let document = tracker.issue(RequestKind::Document);

        assert!(tracker.is_current(graph));
        assert!(tracker.is_current(document));
    }

    #[test]
    fn test_invalidate_discards_in_flight() {
        let mut tracker = RequestTracker::new();
        let ticket = tracker.issue(RequestKind::Document);
        tracker.invalidate_all();
        assert!(!tracker.is_current(ticket));
    }
}
