//! # In-session Search
//!
//! Case-insensitive substring search over the message sequence with
//! wraparound next/previous navigation.
//!
//! Matches are kept as store positions, in sequence order. The store is
//! append-only, so positions stay valid for the whole session. While a query
//! is active, newly appended messages are tested and added to the matches
//! (see [`SearchIndex::observe_append`]).

use crate::core::store::MessageStore;
use crate::core::types::{Message, MessageId};

#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    query: String,
    needle: String,
    matches: Vec<usize>,
    current: Option<usize>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    /// Replaces the query and recomputes matches against the whole store.
    /// An empty query clears the search.
    pub fn set_query(&mut self, query: &str, store: &MessageStore) {
        if query.is_empty() {
            self.clear();
            return;
        }
        self.query = query.to_string();
        self.needle = query.to_lowercase();
        self.matches = store
            .all()
            .iter()
            .enumerate()
            .filter(|(_, m)| self.is_match(m))
            .map(|(position, _)| position)
            .collect();
        self.current = if self.matches.is_empty() { None } else { Some(0) };
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.needle.clear();
        self.matches.clear();
        self.current = None;
    }

    /// Tests a freshly appended message against the active query.
    /// Returns true if it became a new match.
    pub fn observe_append(&mut self, position: usize, store: &MessageStore) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(message) = store.get(position) else {
            return false;
        };
        if !self.is_match(message) || self.matches.last().is_some_and(|&p| p >= position) {
            return false;
        }
        self.matches.push(position);
        if self.current.is_none() {
            self.current = Some(0);
        }
        true
    }

    pub fn next(&mut self) {
        if let Some(current) = self.current {
            self.current = Some((current + 1) % self.matches.len());
        }
    }

    pub fn previous(&mut self) {
        if let Some(current) = self.current {
            let count = self.matches.len();
            self.current = Some((current + count - 1) % count);
        }
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Index into the matches; `None` when there are no matches.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Store positions of all matches, in sequence order.
    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    /// Store position of the current match.
    pub fn current_position(&self) -> Option<usize> {
        self.current.map(|i| self.matches[i])
    }

    pub fn current_match<'a>(&self, store: &'a MessageStore) -> Option<&'a Message> {
        self.current_position().and_then(|p| store.get(p))
    }

    pub fn matched_ids<'a>(&self, store: &'a MessageStore) -> Vec<&'a MessageId> {
        self.matches
            .iter()
            .filter_map(|&p| store.get(p))
            .map(|m| &m.id)
            .collect()
    }

    fn is_match(&self, message: &Message) -> bool {
        message.content.to_lowercase().contains(&self.needle)
    }
}
