use crate::executor::Executor;
use crate::requests::{RequestKind, RequestTracker, Ticket};
use crate::settings::WorkspaceSettings;
use crate::sources::{BookmarkSink, DocumentHandle, DocumentSource, GraphSource};
use crossbeam_channel::{Receiver, Sender, unbounded};
use docgraph_core::{DocumentId, NodeId, NodeKind, RawGraphPayload, SessionId};
use docgraph_events::{ActivationOrigin, Event, EventBus, TabCollectionKind};
use docgraph_graph::{
    BuildOptions, ForceSimulation, Graph, PointerOutcome, PointerTracker, SceneDescription, Vec2,
    ViewTransform,
};
use docgraph_search::{FilterState, LevelThreshold};
use docgraph_workspace::{TabError, TabKey, TabLayoutSnapshot, ViewStore};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    /// Shown to the user as "no graph / no document available".
    Unavailable(String),
}

/// Tab opened or focused by a node activation.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    Document {
        key: TabKey,
        page: u32,
        created: bool,
    },
    Session {
        key: TabKey,
        session_id: SessionId,
        created: bool,
    },
}

enum Target {
    Page(u32),
    Session(SessionId),
}

enum Completion {
    Graph {
        ticket: Ticket,
        document_id: DocumentId,
        result: anyhow::Result<RawGraphPayload>,
    },
    Document {
        ticket: Ticket,
        document_id: DocumentId,
        url: String,
        result: anyhow::Result<Vec<u8>>,
    },
    Bookmark {
        document_id: DocumentId,
        chapter_id: NodeId,
        bookmarked: bool,
        result: anyhow::Result<()>,
    },
}

#[derive(Clone)]
pub struct Collaborators {
    pub graph: Arc<dyn GraphSource>,
    pub documents: Arc<dyn DocumentSource>,
    pub bookmarks: Arc<dyn BookmarkSink>,
}

impl Collaborators {
    pub fn new(
        graph: impl GraphSource + 'static,
        documents: impl DocumentSource + 'static,
        bookmarks: impl BookmarkSink + 'static,
    ) -> Self {
        Self {
            graph: Arc::new(graph),
            documents: Arc::new(documents),
            bookmarks: Arc::new(bookmarks),
        }
    }
}

/// Headless owner of the graph view, the filters and both tab collections.
///
/// All state changes happen on the caller's thread. Collaborator calls run on
/// the executor and report back through a channel that [`pump`] drains; a
/// response is applied only if no newer request of the same kind was issued.
///
/// [`pump`]: WorkspaceController::pump
pub struct WorkspaceController {
    collaborators: Collaborators,
    executor: Box<dyn Executor>,
    results_tx: Sender<Completion>,
    results_rx: Receiver<Completion>,
    requests: RequestTracker,
    bus: EventBus,
    settings: WorkspaceSettings,
    store: ViewStore,
    raw: Option<RawGraphPayload>,
    graph: Graph,
    simulation: Option<ForceSimulation>,
    view: ViewTransform,
    pointer: PointerTracker,
    filter: FilterState,
    document: Option<DocumentHandle>,
    graph_state: LoadState,
    document_state: LoadState,
}

impl WorkspaceController {
    pub fn new(
        collaborators: Collaborators,
        executor: impl Executor + 'static,
        settings: WorkspaceSettings,
    ) -> Self {
        let (results_tx, results_rx) = unbounded();

        let mut store = ViewStore::new();
        store.set_bookmarked_only(settings.filter.bookmarked_only);
        store.set_level_threshold(settings.filter.level_threshold);

        let mut filter = FilterState::new(settings.filter.level_threshold);
        filter.set_narrow_to_matches(settings.filter.narrow_to_matches);

        Self {
            collaborators,
            executor: Box::new(executor),
            results_tx,
            results_rx,
            requests: RequestTracker::new(),
            bus: EventBus::new(),
            view: settings.view.initial_transform(&settings.layout),
            pointer: PointerTracker::new().with_drag_threshold(settings.view.drag_threshold),
            settings,
            store,
            raw: None,
            graph: Graph::new(),
            simulation: None,
            filter,
            document: None,
            graph_state: LoadState::Idle,
            document_state: LoadState::Idle,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    pub fn settings(&self) -> &WorkspaceSettings {
        &self.settings
    }

    pub fn store(&self) -> &ViewStore {
        &self.store
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn simulation(&self) -> Option<&ForceSimulation> {
        self.simulation.as_ref()
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref()
    }

    pub fn graph_state(&self) -> &LoadState {
        &self.graph_state
    }

    pub fn document_state(&self) -> &LoadState {
        &self.document_state
    }

    /// Make `document_id` the current document and fetch its graph.
    pub fn select_document(&mut self, document_id: DocumentId) {
        if self.store.select_document(Some(document_id.clone())) {
            self.clear_graph();
            self.document = None;
            self.document_state = LoadState::Idle;
            self.requests.invalidate(RequestKind::Document);
        }

        let ticket = self.requests.issue(RequestKind::Graph);
        self.graph_state = LoadState::Loading;
        tracing::debug!("Fetching graph data for document {}", document_id);

        let source = Arc::clone(&self.collaborators.graph);
        let tx = self.results_tx.clone();
        self.executor.spawn(Box::new(move || {
            let result = source.fetch_graph_data(&document_id);
            let _ = tx.send(Completion::Graph {
                ticket,
                document_id,
                result,
            });
        }));
    }

    /// Apply every collaborator response that has arrived. Returns how many
    /// were received, stale ones included.
    pub fn pump(&mut self) -> usize {
        let mut received = 0;
        while let Ok(completion) = self.results_rx.try_recv() {
            received += 1;
            match completion {
                Completion::Graph {
                    ticket,
                    document_id,
                    result,
                } => self.on_graph_response(ticket, document_id, result),
                Completion::Document {
                    ticket,
                    document_id,
                    url,
                    result,
                } => self.on_document_response(ticket, document_id, url, result),
                Completion::Bookmark {
                    document_id,
                    chapter_id,
                    bookmarked,
                    result,
                } => self.on_bookmark_response(document_id, chapter_id, bookmarked, result),
            }
        }
        received
    }

    /// Show `payload` as the graph of `document_id`, replacing whatever was
    /// shown. Supersedes any graph request still in flight.
    pub fn apply_graph_payload(&mut self, document_id: DocumentId, payload: RawGraphPayload) {
        self.requests.invalidate(RequestKind::Graph);
        if self.store.selected_document() != Some(&document_id) {
            self.store.select_document(Some(document_id.clone()));
            self.document = None;
            self.document_state = LoadState::Idle;
            self.requests.invalidate(RequestKind::Document);
        }

        let url = payload.document_url.clone();
        self.raw = Some(payload);
        self.replace_graph();
        self.graph_state = LoadState::Ready;

        tracing::info!(
            "Graph loaded for document {}: {} nodes, {} edges, {} diagnostics",
            document_id,
            self.graph.node_count(),
            self.graph.edge_count(),
            self.graph.diagnostics().len()
        );
        self.bus.publish(Event::GraphLoaded {
            document_id: document_id.clone(),
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
        });

        if let Some(url) = url {
            self.request_document(document_id, url);
        }
    }

    /// Advance the layout by one frame. Returns whether anything moved.
    pub fn tick(&mut self) -> bool {
        self.simulation.as_mut().is_some_and(ForceSimulation::step)
    }

    pub fn scene(&self) -> SceneDescription {
        match &self.simulation {
            Some(sim) => SceneDescription::describe(
                &self.graph,
                sim,
                self.view,
                &self.settings.view.labels,
                &self.filter,
            ),
            None => SceneDescription {
                transform: self.view,
                ..Default::default()
            },
        }
    }

    pub fn pointer_down(&mut self, screen: Vec2) -> PointerOutcome {
        let Some(sim) = self.simulation.as_mut() else {
            return PointerOutcome::None;
        };
        self.pointer
            .pointer_down(screen, &self.graph, sim, &self.view, &self.filter)
    }

    pub fn pointer_move(&mut self, screen: Vec2) -> PointerOutcome {
        let Some(sim) = self.simulation.as_mut() else {
            return PointerOutcome::None;
        };
        self.pointer.pointer_move(screen, sim, &mut self.view)
    }

    /// Finish a gesture. A click on a node activates it.
    pub fn pointer_up(&mut self) -> PointerOutcome {
        let Some(sim) = self.simulation.as_mut() else {
            return PointerOutcome::None;
        };
        let outcome = self.pointer.pointer_up(sim);
        if let PointerOutcome::Click(id) = &outcome {
            self.activate_node(id, ActivationOrigin::Graph);
        }
        outcome
    }

    /// Open or focus the tab for a node: a chapter opens its start page, a
    /// session opens its chat. Every entry point goes through here.
    pub fn activate_node(&mut self, id: &NodeId, origin: ActivationOrigin) -> Option<Activation> {
        let Some(target) = self.resolve_target(id) else {
            tracing::debug!("Ignoring activation of unknown node {} ({:?})", id, origin);
            return None;
        };
        self.bus.publish(Event::NodeActivated {
            id: id.clone(),
            origin,
        });

        let activation = match target {
            Target::Page(page) => {
                let outcome = self.store.open_page(page);
                self.bus.publish(Event::DocumentTabActivated {
                    key: outcome.key.to_string(),
                    page,
                });
                Activation::Document {
                    key: outcome.key,
                    page,
                    created: outcome.created,
                }
            }
            Target::Session(session_id) => {
                let outcome = self.store.open_session(session_id.clone());
                self.bus.publish(Event::SessionTabActivated {
                    key: outcome.key.to_string(),
                    session_id: session_id.clone(),
                });
                Activation::Session {
                    key: outcome.key,
                    session_id,
                    created: outcome.created,
                }
            }
        };
        Some(activation)
    }

    pub fn select_from_toc(&mut self, chapter_id: &NodeId) -> Option<Activation> {
        self.activate_node(chapter_id, ActivationOrigin::TableOfContents)
    }

    /// Flip a chapter's bookmark right away and tell the sink in the
    /// background. A failed sync puts the flag back. Returns the new state.
    pub fn toggle_bookmark(&mut self, chapter_id: &NodeId) -> Option<bool> {
        let document_id = self.store.selected_document()?.clone();
        let raw = self.raw.as_mut()?;
        let bookmarked = !raw.is_bookmarked(chapter_id)?;
        raw.set_bookmarked(chapter_id, bookmarked);
        self.rebuild_graph();
        self.bus.publish(Event::BookmarkToggled {
            chapter_id: chapter_id.clone(),
            bookmarked,
        });

        let sink = Arc::clone(&self.collaborators.bookmarks);
        let tx = self.results_tx.clone();
        let chapter_id = chapter_id.clone();
        self.executor.spawn(Box::new(move || {
            let result = sink.on_bookmark_toggle(&chapter_id, bookmarked);
            let _ = tx.send(Completion::Bookmark {
                document_id,
                chapter_id,
                bookmarked,
                result,
            });
        }));
        Some(bookmarked)
    }

    pub fn set_bookmarked_only(&mut self, bookmarked_only: bool) {
        if self.store.bookmarked_only() == bookmarked_only {
            return;
        }
        self.store.set_bookmarked_only(bookmarked_only);
        self.rebuild_graph();
    }

    /// Update the search. Returns the number of matching nodes.
    pub fn set_search_query(&mut self, query: &str) -> usize {
        self.store.set_search_query(query);
        let match_count = self.refresh_filter();
        self.bus.publish(Event::SearchUpdated {
            query: self.store.search_query().to_string(),
            match_count,
        });
        match_count
    }

    pub fn set_level_threshold(&mut self, threshold: LevelThreshold) {
        self.store.set_level_threshold(threshold);
        self.refresh_filter();
    }

    pub fn zoom_at(&mut self, factor: f32, pivot: Vec2) {
        self.view
            .zoom_at(factor, pivot, self.settings.view.scale_extent);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.view.pan_by(dx, dy);
    }

    pub fn zoom_to_fit(&mut self) {
        let Some(bounds) = self.simulation.as_ref().and_then(ForceSimulation::bounds) else {
            return;
        };
        let margin = self
            .graph
            .nodes()
            .iter()
            .map(|node| node.display.radius)
            .fold(0.0, f32::max);
        self.view = ViewTransform::zoom_to_fit(
            bounds.expand(margin),
            self.settings.layout.container,
            self.settings.view.fit_padding,
            self.settings.view.scale_extent,
        );
    }

    pub fn focus_document_tab(&mut self, key: TabKey) -> Result<(), TabError> {
        self.store.focus_document(key)?;
        self.publish_active_document();
        Ok(())
    }

    pub fn close_document_tab(&mut self, key: TabKey) -> Result<(), TabError> {
        let was_active = self.store.documents().active_key() == key;
        self.store.close_document(key)?;
        self.bus.publish(Event::TabClosed {
            collection: TabCollectionKind::Document,
            key: key.to_string(),
        });
        if was_active {
            self.publish_active_document();
        }
        Ok(())
    }

    pub fn focus_session_tab(&mut self, key: TabKey) -> Result<(), TabError> {
        self.store.focus_session(key)?;
        self.publish_active_session();
        Ok(())
    }

    pub fn close_session_tab(&mut self, key: TabKey) -> Result<(), TabError> {
        let was_active = self.store.sessions().active_key() == key;
        self.store.close_session(key)?;
        self.bus.publish(Event::TabClosed {
            collection: TabCollectionKind::Session,
            key: key.to_string(),
        });
        if was_active {
            self.publish_active_session();
        }
        Ok(())
    }

    pub fn snapshot_layout(&self) -> TabLayoutSnapshot {
        self.store.snapshot()
    }

    /// Reopen saved tabs. Returns false, changing nothing, when the snapshot
    /// belongs to a different document.
    pub fn restore_layout(&mut self, snapshot: &TabLayoutSnapshot) -> bool {
        if !self.store.restore(snapshot) {
            return false;
        }
        self.publish_active_document();
        self.publish_active_session();
        true
    }

    /// Stop the layout and forget the graph. Responses still in flight are
    /// discarded when they arrive.
    pub fn teardown(&mut self) {
        self.clear_graph();
        self.requests.invalidate_all();
        self.document = None;
        self.graph_state = LoadState::Idle;
        self.document_state = LoadState::Idle;
        tracing::debug!("Workspace torn down");
    }

    fn request_document(&mut self, document_id: DocumentId, url: String) {
        let ticket = self.requests.issue(RequestKind::Document);
        self.document_state = LoadState::Loading;

        let source = Arc::clone(&self.collaborators.documents);
        let tx = self.results_tx.clone();
        self.executor.spawn(Box::new(move || {
            let result = source.fetch_document(&url);
            let _ = tx.send(Completion::Document {
                ticket,
                document_id,
                url,
                result,
            });
        }));
    }

    fn on_graph_response(
        &mut self,
        ticket: Ticket,
        document_id: DocumentId,
        result: anyhow::Result<RawGraphPayload>,
    ) {
        if !self.requests.is_current(ticket) {
            tracing::debug!("Discarding stale graph response for document {}", document_id);
            return;
        }
        match result {
            Ok(payload) => self.apply_graph_payload(document_id, payload),
            Err(err) => {
                tracing::warn!("Graph data for document {} unavailable: {:#}", document_id, err);
                self.clear_graph();
                self.graph_state = LoadState::Unavailable(err.to_string());
                self.bus.publish(Event::GraphUnavailable {
                    document_id,
                    reason: err.to_string(),
                });
            }
        }
    }

    fn on_document_response(
        &mut self,
        ticket: Ticket,
        document_id: DocumentId,
        url: String,
        result: anyhow::Result<Vec<u8>>,
    ) {
        if !self.requests.is_current(ticket)
            || self.store.selected_document() != Some(&document_id)
        {
            tracing::debug!("Discarding stale document response for {}", url);
            return;
        }
        match result {
            Ok(bytes) => {
                let byte_len = bytes.len();
                self.document = Some(DocumentHandle {
                    document_id: document_id.clone(),
                    url,
                    bytes,
                });
                self.document_state = LoadState::Ready;
                self.bus.publish(Event::DocumentLoaded {
                    document_id,
                    byte_len,
                });
            }
            Err(err) => {
                tracing::warn!("Document {} unavailable: {:#}", url, err);
                self.document = None;
                self.document_state = LoadState::Unavailable(err.to_string());
                self.bus.publish(Event::DocumentUnavailable {
                    document_id,
                    reason: err.to_string(),
                });
            }
        }
    }

    fn on_bookmark_response(
        &mut self,
        document_id: DocumentId,
        chapter_id: NodeId,
        bookmarked: bool,
        result: anyhow::Result<()>,
    ) {
        let Err(err) = result else {
            return;
        };
        tracing::warn!("Bookmark sync for chapter {} failed: {:#}", chapter_id, err);
        self.bus.publish(Event::BookmarkSyncFailed {
            chapter_id: chapter_id.clone(),
            error: err.to_string(),
        });

        if self.store.selected_document() != Some(&document_id) {
            tracing::debug!(
                "Not reverting bookmark for {}: document {} is no longer shown",
                chapter_id,
                document_id
            );
            return;
        }
        // Only undo if nothing has changed the flag since.
        let Some(raw) = self.raw.as_mut() else {
            return;
        };
        if raw.is_bookmarked(&chapter_id) != Some(bookmarked) {
            return;
        }
        raw.set_bookmarked(&chapter_id, !bookmarked);
        self.rebuild_graph();
        self.bus.publish(Event::BookmarkToggled {
            chapter_id,
            bookmarked: !bookmarked,
        });
    }

    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            bookmarked_only: self.store.bookmarked_only(),
        }
    }

    /// New graph for a new payload: fresh layout and view.
    fn replace_graph(&mut self) {
        self.stop_simulation();
        self.graph = match &self.raw {
            Some(raw) => Graph::build(raw, self.build_options()),
            None => Graph::new(),
        };
        self.simulation = Some(ForceSimulation::new(&self.graph, self.settings.layout));
        self.view = self.settings.view.initial_transform(&self.settings.layout);
        self.refresh_filter();
    }

    /// Same payload, different filter: survivors keep their positions.
    fn rebuild_graph(&mut self) {
        let Some(raw) = &self.raw else {
            return;
        };
        self.graph = Graph::build(raw, self.build_options());
        match self.simulation.as_mut() {
            Some(sim) => sim.update_input(&self.graph),
            None => {
                self.simulation = Some(ForceSimulation::new(&self.graph, self.settings.layout));
            }
        }
        self.refresh_filter();
    }

    fn clear_graph(&mut self) {
        self.stop_simulation();
        self.raw = None;
        self.graph = Graph::new();
        self.refresh_filter();
    }

    fn stop_simulation(&mut self) {
        if let Some(mut sim) = self.simulation.take() {
            self.pointer.cancel(&mut sim);
            sim.stop();
        }
    }

    /// Recompute search and visibility from the store's query and threshold.
    fn refresh_filter(&mut self) -> usize {
        self.filter.set_query(self.store.search_query());
        self.filter.set_threshold(self.store.level_threshold());
        let match_count = self.filter.refresh(&self.graph);
        self.bus.publish(Event::VisibilityChanged {
            visible_count: self.filter.visible_count(),
        });
        match_count
    }

    /// Look in the built graph first, then in the raw payload for chapters
    /// the bookmark filter hid.
    fn resolve_target(&self, id: &NodeId) -> Option<Target> {
        if let Some(node) = self.graph.node(id) {
            return Some(match node.kind() {
                NodeKind::Chapter => Target::Page(node.start_page().unwrap_or(1)),
                NodeKind::Session => Target::Session(SessionId::from(&node.id)),
            });
        }

        let raw = self.raw.as_ref()?;
        let node = raw
            .nodes
            .iter()
            .chain(raw.session_nodes.iter())
            .find(|node| &node.id == id)?;
        Some(match node.chapter_id {
            Some(_) => Target::Session(SessionId::from(&node.id)),
            None => Target::Page(
                node.start_page
                    .and_then(|page| u32::try_from(page).ok())
                    .filter(|page| *page > 0)
                    .unwrap_or(1),
            ),
        })
    }

    fn publish_active_document(&self) {
        let active = self.store.documents().active();
        let event = match active.payload {
            Some(page) => Event::DocumentTabActivated {
                key: active.key.to_string(),
                page: page.page_number,
            },
            None => Event::FixedTabActivated {
                collection: TabCollectionKind::Document,
            },
        };
        self.bus.publish(event);
    }

    fn publish_active_session(&self) {
        let active = self.store.sessions().active();
        let event = match &active.payload {
            Some(chat) => Event::SessionTabActivated {
                key: active.key.to_string(),
                session_id: chat.session_id.clone(),
            },
            None => Event::FixedTabActivated {
                collection: TabCollectionKind::Session,
            },
        };
        self.bus.publish(event);
    }
}
