//! Conversation window: bounded FIFO of recent dialogue turns, one per session.

use crate::context::types::Turn;
use crate::types::Timestamp;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};

/// Bounded, ordered slice of recent turns. Oldest first; never reordered.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    turns: VecDeque<Turn>,
    max_turns: usize,
}

impl ConversationWindow {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(max_turns.min(256)),
            max_turns,
        }
    }

    /// Append a turn, then trim to the window bound.
    pub fn push(&mut self, turn: Turn) {
        self.append(turn);
        self.trim(self.max_turns);
    }

    /// Append without trimming.
    pub(crate) fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);
    }

    /// Keep the most recent `max_turns`, dropping the oldest first.
    pub fn trim(&mut self, max_turns: usize) {
        while self.turns.len() > max_turns {
            self.turns.pop_front();
        }
    }

    /// Last `n` turns, oldest first. Does not mutate the window.
    pub fn slice(&self, n: usize) -> Vec<Turn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Timestamp of the newest turn.
    pub fn last_activity(&self) -> Option<Timestamp> {
        self.turns.back().map(|turn| turn.timestamp)
    }
}

/// Per-session conversation windows.
#[derive(Debug)]
pub struct ConversationLog {
    windows: RwLock<HashMap<String, ConversationWindow>>,
    max_turns: usize,
}

impl ConversationLog {
    pub fn new(max_turns: usize) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            max_turns,
        }
    }

    pub fn record(&self, session_id: &str, turn: Turn) {
        let mut windows = self.windows.write();
        windows
            .entry(session_id.to_string())
            .or_insert_with(|| ConversationWindow::new(self.max_turns))
            .push(turn);
    }

    /// Last `n` turns of a session, oldest first.
    pub fn history(&self, session_id: &str, n: usize) -> Vec<Turn> {
        self.windows
            .read()
            .get(session_id)
            .map(|w| w.slice(n))
            .unwrap_or_default()
    }

    /// Drop a session's window. Returns whether one existed.
    pub fn clear_session(&self, session_id: &str) -> bool {
        self.windows.write().remove(session_id).is_some()
    }

    /// Drop every session whose newest turn is older than `cutoff`. Returns the
    /// evicted session ids, sorted.
    pub fn evict_idle(&self, cutoff: Timestamp) -> Vec<String> {
        let mut windows = self.windows.write();
        let mut evicted: Vec<String> = windows
            .iter()
            .filter(|(_, window)| window.last_activity().map_or(true, |last| last < cutoff))
            .map(|(session_id, _)| session_id.clone())
            .collect();
        for session_id in &evicted {
            windows.remove(session_id);
        }
        evicted.sort();
        evicted
    }

    pub fn session_count(&self) -> usize {
        self.windows.read().len()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }
}
