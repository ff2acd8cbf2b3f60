//! Headless document-graph workspace: wires the graph, layout, filters and
//! tabs to the backend collaborators and reports changes on an event bus.

pub mod controller;
pub mod executor;
pub mod requests;
pub mod settings;
pub mod sources;

pub use controller::{Activation, Collaborators, LoadState, WorkspaceController};
pub use executor::{Executor, InlineExecutor, Job, ThreadExecutor};
pub use requests::{RequestKind, RequestTracker, Ticket};
pub use settings::{FilterSettings, SettingsError, ViewSettings, WorkspaceSettings};
pub use sources::{
    BookmarkSink, DocumentHandle, DocumentSource, GraphSource, LoggingBookmarkSink, NoDocuments,
    StaticGraphSource,
};
