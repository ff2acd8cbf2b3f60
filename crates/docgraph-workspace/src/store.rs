use crate::persist::{SavedCollection, SavedTab, TabLayoutSnapshot};
use crate::tabs::{
    CHAT_TAB, ChatSession, DocumentPage, GRAPH_TAB, OpenOutcome, Tab, TabCollection, TabError,
    TabKey, TabPayload,
};
use docgraph_core::{DocumentId, SessionId};
use docgraph_search::LevelThreshold;
use serde::{Deserialize, Serialize};

/// Where the document viewer should be scrolled to.
///
/// `seq` increases on every activation so re-selecting the page already on
/// screen still counts as a new request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpTarget {
    pub tab: TabKey,
    pub page: u32,
    pub seq: u64,
}

/// Shared view state for the workspace.
///
/// Both tab collections and the filter settings live here. Every mutation goes
/// through a method so the jump target stays consistent with the active
/// document tab.
#[derive(Debug, Clone)]
pub struct ViewStore {
    documents: TabCollection<DocumentPage>,
    sessions: TabCollection<ChatSession>,
    selected_document: Option<DocumentId>,
    bookmarked_only: bool,
    search_query: String,
    level_threshold: LevelThreshold,
    jump: Option<JumpTarget>,
    jump_seq: u64,
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStore {
    pub fn new() -> Self {
        Self {
            documents: TabCollection::new(GRAPH_TAB, "Graph"),
            sessions: TabCollection::new(CHAT_TAB, "Chat"),
            selected_document: None,
            bookmarked_only: false,
            search_query: String::new(),
            level_threshold: LevelThreshold::All,
            jump: None,
            jump_seq: 0,
        }
    }

    pub fn documents(&self) -> &TabCollection<DocumentPage> {
        &self.documents
    }

    pub fn sessions(&self) -> &TabCollection<ChatSession> {
        &self.sessions
    }

    /// Open or focus the tab for `page` and aim the viewer at it.
    pub fn open_page(&mut self, page: u32) -> OpenOutcome {
        let outcome = self.documents.open(DocumentPage::new(page));
        self.record_jump(outcome.key, page);
        outcome
    }

    pub fn open_session(&mut self, session_id: impl Into<SessionId>) -> OpenOutcome {
        self.sessions.open(ChatSession::new(session_id))
    }

    pub fn focus_document(&mut self, key: TabKey) -> Result<(), TabError> {
        self.documents.focus(key)?;
        self.jump_to_active_document();
        Ok(())
    }

    pub fn focus_session(&mut self, key: TabKey) -> Result<(), TabError> {
        self.sessions.focus(key)
    }

    pub fn close_document(&mut self, key: TabKey) -> Result<Tab<DocumentPage>, TabError> {
        let was_active = self.documents.active_key() == key;
        let removed = self.documents.close(key)?;
        if was_active {
            self.jump_to_active_document();
        }
        Ok(removed)
    }

    pub fn close_session(&mut self, key: TabKey) -> Result<Tab<ChatSession>, TabError> {
        self.sessions.close(key)
    }

    pub fn selected_document(&self) -> Option<&DocumentId> {
        self.selected_document.as_ref()
    }

    /// Switch documents. Tabs belong to a document, so a real change resets
    /// both collections. Returns whether the selection changed.
    pub fn select_document(&mut self, id: Option<DocumentId>) -> bool {
        if self.selected_document == id {
            return false;
        }
        self.selected_document = id;
        self.documents.reset();
        self.sessions.reset();
        self.jump = None;
        true
    }

    pub fn bookmarked_only(&self) -> bool {
        self.bookmarked_only
    }

    pub fn set_bookmarked_only(&mut self, bookmarked_only: bool) {
        self.bookmarked_only = bookmarked_only;
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn level_threshold(&self) -> LevelThreshold {
        self.level_threshold
    }

    pub fn set_level_threshold(&mut self, threshold: LevelThreshold) {
        self.level_threshold = threshold;
    }

    pub fn jump_target(&self) -> Option<JumpTarget> {
        self.jump
    }

    /// Page the viewer should show, if the active document tab asked for one.
    pub fn current_target_page(&self) -> Option<u32> {
        self.jump
            .filter(|jump| jump.tab == self.documents.active_key())
            .map(|jump| jump.page)
    }

    /// Page requested for a specific tab.
    pub fn target_page_for(&self, tab: TabKey) -> Option<u32> {
        self.documents
            .get(tab)
            .and_then(|tab| tab.payload)
            .map(|payload| payload.page_number)
    }

    pub fn snapshot(&self) -> TabLayoutSnapshot {
        TabLayoutSnapshot::new(
            self.selected_document.clone(),
            save(&self.documents),
            save(&self.sessions),
        )
    }

    /// Bring back tabs from a snapshot on top of the current state. Entries
    /// whose payload is already open are skipped. A snapshot taken for another
    /// document is ignored and `false` returned.
    pub fn restore(&mut self, snapshot: &TabLayoutSnapshot) -> bool {
        if snapshot.document != self.selected_document {
            tracing::debug!(
                "Tab layout for {:?} not restored over {:?}",
                snapshot.document,
                self.selected_document
            );
            return false;
        }
        for tab in &snapshot.documents.tabs {
            self.documents.restore(tab.key, tab.payload);
        }
        for tab in &snapshot.sessions.tabs {
            self.sessions.restore(tab.key, tab.payload.clone());
        }
        if let Some(key) = snapshot.documents.active
            && self.documents.focus(key).is_ok()
        {
            self.jump_to_active_document();
        }
        if let Some(key) = snapshot.sessions.active
            && let Err(err) = self.sessions.focus(key)
        {
            tracing::debug!("Saved session focus not restored: {}", err);
        }
        true
    }

    fn jump_to_active_document(&mut self) {
        let (key, payload) = {
            let active = self.documents.active();
            (active.key, active.payload)
        };
        match payload {
            Some(payload) => self.record_jump(key, payload.page_number),
            None => self.jump = None,
        }
    }

    fn record_jump(&mut self, tab: TabKey, page: u32) {
        self.jump_seq += 1;
        self.jump = Some(JumpTarget {
            tab,
            page,
            seq: self.jump_seq,
        });
    }
}

fn save<P: TabPayload>(collection: &TabCollection<P>) -> SavedCollection<P> {
    let tabs = collection
        .tabs()
        .iter()
        .filter_map(|tab| {
            tab.payload.clone().map(|payload| SavedTab {
                key: tab.key,
                payload,
            })
        })
        .collect();
    let active = Some(collection.active_key()).filter(|key| *key != collection.fixed_key());
    SavedCollection { tabs, active }
}
