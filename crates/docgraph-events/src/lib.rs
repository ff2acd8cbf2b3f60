use crossbeam_channel::{Receiver, Sender, unbounded};
use docgraph_core::{DocumentId, NodeId, SessionId};
use serde::{Deserialize, Serialize};

/// Where a node selection came from. Every origin routes through the same
/// tab-opening path; the origin is carried for logging and listeners only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivationOrigin {
    Graph,
    TableOfContents,
}

/// Which tab collection a tab event refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TabCollectionKind {
    Document,
    Session,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    // Selection
    NodeActivated {
        id: NodeId,
        origin: ActivationOrigin,
    },

    // Tabs
    DocumentTabActivated {
        key: String,
        page: u32,
    },
    SessionTabActivated {
        key: String,
        session_id: SessionId,
    },
    FixedTabActivated {
        collection: TabCollectionKind,
    },
    TabClosed {
        collection: TabCollectionKind,
        key: String,
    },

    // Data
    GraphLoaded {
        document_id: DocumentId,
        node_count: usize,
        edge_count: usize,
    },
    GraphUnavailable {
        document_id: DocumentId,
        reason: String,
    },
    DocumentLoaded {
        document_id: DocumentId,
        byte_len: usize,
    },
    DocumentUnavailable {
        document_id: DocumentId,
        reason: String,
    },

    // Bookmarks
    BookmarkToggled {
        chapter_id: NodeId,
        bookmarked: bool,
    },
    BookmarkSyncFailed {
        chapter_id: NodeId,
        error: String,
    },

    // Search / filter
    SearchUpdated {
        query: String,
        match_count: usize,
    },
    VisibilityChanged {
        visible_count: usize,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Hand every queued event to `listener`, oldest first.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }

    /// Drain pending events without a listener.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }
}

/// Receiver side of [`EventBus::dispatch_to`].
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_publish_receive() {
        let bus = EventBus::new();
        let sender = bus.sender();
        let receiver = bus.receiver();

        sender
            .send(Event::NodeActivated {
                id: NodeId::from(123),
                origin: ActivationOrigin::Graph,
            })
            .unwrap();

        match receiver.recv().unwrap() {
            Event::NodeActivated { id, origin } => {
                assert_eq!(id.as_str(), "123");
                assert_eq!(origin, ActivationOrigin::Graph);
            }
            _ => panic!("Expected NodeActivated event"),
        }
    }

    #[derive(Default)]
    struct PageRecorder {
        pages: Vec<u32>,
    }

    impl EventListener for PageRecorder {
        fn handle_event(&mut self, event: &Event) {
            if let Event::DocumentTabActivated { page, .. } = event {
                self.pages.push(*page);
            }
        }
    }

    #[test]
    fn test_dispatch_to_listener_drains_in_order() {
        let bus = EventBus::new();
        bus.publish(Event::DocumentTabActivated {
            key: "a".to_string(),
            page: 3,
        });
        bus.publish(Event::SearchUpdated {
            query: "intro".to_string(),
            match_count: 1,
        });
        bus.publish(Event::DocumentTabActivated {
            key: "b".to_string(),
            page: 9,
        });

        let mut recorder = PageRecorder::default();
        bus.dispatch_to(&mut recorder);

        assert_eq!(recorder.pages, vec![3, 9]);
        assert!(bus.drain().is_empty());
    }
}
