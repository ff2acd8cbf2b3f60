//! Tab management for the document workspace.
//!
//! Two independent collections (document pages and chat sessions) plus the
//! shared view state that the graph, the document viewer and the chat panel
//! all read from.

pub mod persist;
pub mod store;
pub mod tabs;

pub use persist::{SNAPSHOT_VERSION, SavedCollection, SavedTab, SnapshotError, TabLayoutSnapshot};
pub use store::{JumpTarget, ViewStore};
pub use tabs::{
    CHAT_TAB, ChatSession, DocumentPage, GRAPH_TAB, OpenOutcome, Tab, TabCollection, TabError,
    TabKey, TabPayload,
};
