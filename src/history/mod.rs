use log::debug;
use crate::models::chat::Turn;

/// Default number of turns kept in a conversation (five exchanges).
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Rolling conversation history owned by a single chat session.
///
/// The buffer never holds more than `max_turns` entries. When an append pushes
/// it over the cap, the oldest user/assistant pair is dropped, repeatedly,
/// until it fits again. Nothing is persisted.
#[derive(Clone, Debug)]
pub struct ConversationBuffer {
    turns: Vec<Turn>,
    max_turns: usize,
}

impl ConversationBuffer {
    pub fn new(max_turns: usize) -> Self {
        let max_turns = max_turns.max(2);
        Self {
            turns: Vec::with_capacity(max_turns + 1),
            max_turns,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
        while self.turns.len() > self.max_turns {
            let evict = self.turns.len().min(2);
            self.turns.drain(..evict);
            debug!("Conversation over {} turns, evicted oldest exchange", self.max_turns);
        }
    }

    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
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
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

/// Keeps only the most recent `max_turns` entries of a client-supplied history.
pub fn most_recent(turns: &[Turn], max_turns: usize) -> &[Turn] {
    let start = turns.len().saturating_sub(max_turns);
    &turns[start..]
}
