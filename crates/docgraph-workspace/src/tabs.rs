use docgraph_core::SessionId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Stable key of a tab within its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabKey(pub Uuid);

impl TabKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Key of the graph tab in the document collection.
pub const GRAPH_TAB: TabKey = TabKey(Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001));
/// Key of the primary chat tab in the session collection.
pub const CHAT_TAB: TabKey = TabKey(Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0002));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TabError {
    #[error("no tab with key {0}")]
    UnknownTab(TabKey),
    #[error("tab {0} is fixed and cannot be closed")]
    FixedTab(TabKey),
}

/// Content carried by a closable tab. Two tabs with equal payloads are the same tab.
pub trait TabPayload: Clone + PartialEq + fmt::Debug {
    fn title(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentPage {
    pub page_number: u32,
}

impl DocumentPage {
    pub fn new(page_number: u32) -> Self {
        Self { page_number }
    }
}

impl TabPayload for DocumentPage {
    fn title(&self) -> String {
        format!("Page {}", self.page_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatSession {
    pub session_id: SessionId,
}

impl ChatSession {
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

impl TabPayload for ChatSession {
    fn title(&self) -> String {
        format!("Session {}", self.session_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab<P> {
    pub key: TabKey,
    pub title: String,
    /// `None` for the fixed tab.
    pub payload: Option<P>,
}

impl<P> Tab<P> {
    pub fn is_fixed(&self) -> bool {
        self.payload.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOutcome {
    pub key: TabKey,
    /// False when an existing tab with the same payload was focused instead.
    pub created: bool,
}

/// Ordered tabs with exactly one active entry.
///
/// The first tab is fixed and can never be closed, so the collection is never
/// empty and always has an active tab.
#[derive(Debug, Clone, PartialEq)]
pub struct TabCollection<P> {
    tabs: Vec<Tab<P>>,
    active: TabKey,
}

impl<P: TabPayload> TabCollection<P> {
    pub fn new(fixed_key: TabKey, fixed_title: impl Into<String>) -> Self {
        Self {
            tabs: vec![Tab {
                key: fixed_key,
                title: fixed_title.into(),
                payload: None,
            }],
            active: fixed_key,
        }
    }

    /// Focus the tab showing `payload`, creating it at the end if none exists.
    pub fn open(&mut self, payload: P) -> OpenOutcome {
        if let Some(key) = self.find_by_payload(&payload) {
            self.active = key;
            return OpenOutcome {
                key,
                created: false,
            };
        }

        let key = TabKey::new();
        tracing::debug!("Opening tab {} ({})", key, payload.title());
        self.tabs.push(Tab {
            key,
            title: payload.title(),
            payload: Some(payload),
        });
        self.active = key;
        OpenOutcome { key, created: true }
    }

    pub fn focus(&mut self, key: TabKey) -> Result<(), TabError> {
        if !self.contains(key) {
            return Err(TabError::UnknownTab(key));
        }
        self.active = key;
        Ok(())
    }

    /// Remove a tab. Closing the active tab activates the one before it, or
    /// the new first tab when it was first.
    pub fn close(&mut self, key: TabKey) -> Result<Tab<P>, TabError> {
        let index = self.position(key).ok_or(TabError::UnknownTab(key))?;
        if self.tabs[index].is_fixed() {
            return Err(TabError::FixedTab(key));
        }

        let removed = self.tabs.remove(index);
        if self.active == key {
            let next = index.saturating_sub(1).min(self.tabs.len() - 1);
            self.active = self.tabs[next].key;
        }
        Ok(removed)
    }

    /// Drop every closable tab and focus the fixed one.
    pub fn reset(&mut self) {
        self.tabs.retain(Tab::is_fixed);
        self.active = self.fixed_key();
    }

    pub fn active(&self) -> &Tab<P> {
        // The active key always names a live tab; fall back to the fixed tab.
        self.get(self.active).unwrap_or(&self.tabs[0])
    }

    pub fn active_key(&self) -> TabKey {
        self.active
    }

    pub fn fixed_key(&self) -> TabKey {
        self.tabs[0].key
    }

    pub fn tabs(&self) -> &[Tab<P>] {
        &self.tabs
    }

    pub fn get(&self, key: TabKey) -> Option<&Tab<P>> {
        self.tabs.iter().find(|tab| tab.key == key)
    }

    pub fn contains(&self, key: TabKey) -> bool {
        self.position(key).is_some()
    }

    pub fn find_by_payload(&self, payload: &P) -> Option<TabKey> {
        self.tabs
            .iter()
            .find(|tab| tab.payload.as_ref() == Some(payload))
            .map(|tab| tab.key)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Re-insert a tab under a known key. Ignored if the key or payload is
    /// already present.
    pub(crate) fn restore(&mut self, key: TabKey, payload: P) -> bool {
        if self.contains(key) || self.find_by_payload(&payload).is_some() {
            return false;
        }
        self.tabs.push(Tab {
            key,
            title: payload.title(),
            payload: Some(payload),
        });
        true
    }

    fn position(&self, key: TabKey) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn documents() -> TabCollection<DocumentPage> {
        TabCollection::new(GRAPH_TAB, "Graph")
    }

    #[test]
    fn test_new_collection_has_active_fixed_tab() {
        let tabs = documents();
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs.active_key(), GRAPH_TAB);
        assert!(tabs.active().is_fixed());
        assert_eq!(tabs.active().title, "Graph");
    }

    #[test]
    fn test_open_is_idempotent_per_payload() {
        let mut tabs = documents();
        let first = tabs.open(DocumentPage::new(42));
        tabs.open(DocumentPage::new(7));
        let again = tabs.open(DocumentPage::new(42));

        assert!(first.created);
        assert!(!again.created);
        assert_eq!(first.key, again.key);
        assert_eq!(tabs.len(), 3);
        assert_eq!(tabs.active_key(), first.key);
        assert_eq!(tabs.active().title, "Page 42");
    }

    #[test]
    fn test_close_active_selects_previous() {
        let mut tabs = documents();
        let a = tabs.open(DocumentPage::new(1)).key;
        let b = tabs.open(DocumentPage::new(2)).key;
        let c = tabs.open(DocumentPage::new(3)).key;
        tabs.focus(b).unwrap();

        tabs.close(b).unwrap();
        assert_eq!(tabs.active_key(), a);

        tabs.close(a).unwrap();
        assert_eq!(tabs.active_key(), GRAPH_TAB);
        assert!(tabs.contains(c));
    }

    #[test]
    fn test_close_inactive_keeps_active() {
        let mut tabs = documents();
        let a = tabs.open(DocumentPage::new(1)).key;
        let b = tabs.open(DocumentPage::new(2)).key;

        tabs.close(a).unwrap();

        assert_eq!(tabs.active_key(), b);
    }

    #[test]
    fn test_errors_leave_state_unchanged() {
        let mut tabs = documents();
        tabs.open(DocumentPage::new(5));
        let before = tabs.clone();
        let stranger = TabKey::new();

        assert_eq!(tabs.close(GRAPH_TAB), Err(TabError::FixedTab(GRAPH_TAB)));
        assert_eq!(tabs.close(stranger), Err(TabError::UnknownTab(stranger)));
        assert_eq!(tabs.focus(stranger), Err(TabError::UnknownTab(stranger)));
        assert_eq!(tabs, before);
    }

    #[test]
    fn test_session_titles() {
        let mut sessions = TabCollection::new(CHAT_TAB, "Chat");
        sessions.open(ChatSession::new("abc"));
        assert_eq!(sessions.active().title, "Session abc");
    }

    #[test]
    fn test_reset_keeps_only_fixed() {
        let mut tabs = documents();
        tabs.open(DocumentPage::new(1));
        tabs.open(DocumentPage::new(2));
        tabs.reset();
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs.active_key(), GRAPH_TAB);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Open(u32),
        Focus(usize),
        Close(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..6).prop_map(Op::Open),
            (0usize..8).prop_map(Op::Focus),
            (0usize..8).prop_map(Op::Close),
        ]
    }

    proptest! {
        #[test]
        fn prop_collection_invariants_hold(ops in prop::collection::vec(op_strategy(), 0..40)) {
            let mut tabs = documents();
            for op in ops {
                match op {
                    Op::Open(page) => {
                        let existed = tabs.find_by_payload(&DocumentPage::new(page));
                        let outcome = tabs.open(DocumentPage::new(page));
                        prop_assert_eq!(outcome.created, existed.is_none());
                        prop_assert_eq!(tabs.active_key(), outcome.key);
                    }
                    Op::Focus(i) => {
                        if let Some(key) = tabs.tabs().get(i).map(|t| t.key) {
                            tabs.focus(key).unwrap();
                            prop_assert_eq!(tabs.active_key(), key);
                        }
                    }
                    Op::Close(i) => {
                        if let Some(key) = tabs.tabs().get(i).map(|t| t.key) {
                            let result = tabs.close(key);
                            prop_assert_eq!(result.is_err(), key == GRAPH_TAB);
                        }
                    }
                }

                // Exactly one active tab, the fixed tab survives, payloads are unique.
                prop_assert!(tabs.contains(tabs.active_key()));
                prop_assert_eq!(tabs.tabs()[0].key, GRAPH_TAB);
                let pages: Vec<u32> = tabs
                    .tabs()
                    .iter()
                    .filter_map(|t| t.payload.map(|p| p.page_number))
                    .collect();
                let mut deduped = pages.clone();
                deduped.sort_unstable();
                deduped.dedup();
                prop_assert_eq!(pages.len(), deduped.len());
            }
        }
    }
}
