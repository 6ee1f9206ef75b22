//! In-memory chat histories, one per tab.
//!
//! The store owns every [`Session`] and the active-tab pointer.  Sessions
//! live as long as the store; nothing is persisted.

use crate::error::{Error, Result};
use crate::types::{Message, TabId};

/// One tab's message history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    tab: TabId,
    messages: Vec<Message>,
}

impl Session {
    fn new(tab: TabId) -> Self {
        Self {
            tab,
            messages: Vec::new(),
        }
    }

    /// The tab this session belongs to.
    pub fn tab(&self) -> &TabId {
        &self.tab
    }

    /// The messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

/// Every tab's history plus the pointer to the one on screen.
///
/// The active pointer is an index into `sessions`, which never shrinks, so
/// it always names an existing session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Vec<Session>,
    active: usize,
}

impl SessionStore {
    /// Create a store with one empty session per tab.  The first tab starts
    /// active.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `tabs` is empty or repeats an id.
    pub fn new<I>(tabs: I) -> Result<Self>
    where
        I: IntoIterator<Item = TabId>,
    {
        let mut sessions: Vec<Session> = Vec::new();
        for tab in tabs {
            if sessions.iter().any(|s| s.tab == tab) {
                return Err(Error::validation(
                    format!("duplicate tab id {tab}"),
                    Some("tabs".to_string()),
                ));
            }
            sessions.push(Session::new(tab));
        }
        if sessions.is_empty() {
            return Err(Error::validation(
                "at least one tab is required",
                Some("tabs".to_string()),
            ));
        }
        Ok(Self {
            sessions,
            active: 0,
        })
    }

    /// Append `message` to the end of `tab`'s history.
    ///
    /// Returns the new length of that history.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the store has no such tab.
    pub fn append(&mut self, tab: &TabId, message: Message) -> Result<usize> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| &s.tab == tab)
            .ok_or_else(|| Error::validation(format!("unknown tab {tab}"), None))?;
        session.messages.push(message);
        Ok(session.messages.len())
    }

    /// Make `tab` the active tab.
    ///
    /// Returns false, changing nothing, if the tab is unknown or already
    /// active.
    pub fn switch_active(&mut self, tab: &str) -> bool {
        match self.position(tab) {
            Some(index) if index != self.active => {
                self.active = index;
                true
            }
            _ => false,
        }
    }

    /// The active tab.
    pub fn active(&self) -> &TabId {
        &self.sessions[self.active].tab
    }

    /// The active tab's messages.
    pub fn active_messages(&self) -> &[Message] {
        &self.sessions[self.active].messages
    }

    /// True if `tab` is the active tab.
    pub fn is_active(&self, tab: &str) -> bool {
        self.active() == tab
    }

    /// The messages of `tab`, or `None` if there is no such tab.
    pub fn messages(&self, tab: &str) -> Option<&[Message]> {
        self.session(tab).map(Session::messages)
    }

    /// The session of `tab`, or `None` if there is no such tab.
    pub fn session(&self, tab: &str) -> Option<&Session> {
        self.position(tab).map(|i| &self.sessions[i])
    }

    /// Look up the canonical id for `tab`.
    pub fn tab(&self, tab: &str) -> Option<&TabId> {
        self.session(tab).map(Session::tab)
    }

    /// True if the store has a session for `tab`.
    pub fn contains(&self, tab: &str) -> bool {
        self.position(tab).is_some()
    }

    /// Number of messages in `tab`, zero for unknown tabs.
    pub fn message_count(&self, tab: &str) -> usize {
        self.messages(tab).map_or(0, <[Message]>::len)
    }

    /// All tabs in declaration order.
    pub fn tabs(&self) -> impl Iterator<Item = &TabId> {
        self.sessions.iter().map(Session::tab)
    }

    /// All sessions in declaration order.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    fn position(&self, tab: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.tab == tab)
    }
}
