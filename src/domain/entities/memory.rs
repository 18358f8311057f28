use std::collections::VecDeque;

use super::conversation::{Message, Turn};

/// Counts token-units in a piece of text.
pub type TokenCounter = fn(&str) -> usize;

pub const DEFAULT_TOKEN_LIMIT: usize = 1500;

/// Approximate token count at four characters per token, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Rolling conversation history capped by a token budget.
///
/// Turns are evicted oldest first whenever an append pushes the total over
/// the limit, so [`ChatMemory::token_count`] never exceeds
/// [`ChatMemory::token_limit`]. A turn that alone exceeds the budget is not
/// retained at all.
#[derive(Debug, Clone)]
pub struct ChatMemory {
    turns: VecDeque<(Turn, usize)>,
    token_limit: usize,
    token_count: usize,
    counter: TokenCounter,
}

impl ChatMemory {
    pub fn new(token_limit: usize) -> Self {
        Self::with_counter(token_limit, estimate_tokens)
    }

    pub fn with_counter(token_limit: usize, counter: TokenCounter) -> Self {
        Self {
            turns: VecDeque::new(),
            token_limit,
            token_count: 0,
            counter,
        }
    }

    /// Appends a turn and returns how many old turns were evicted to make room.
    pub fn push(&mut self, turn: Turn) -> usize {
        let cost = (self.counter)(&turn.user) + (self.counter)(&turn.assistant);
        self.turns.push_back((turn, cost));
        self.token_count += cost;

        let mut evicted = 0;
        while self.token_count > self.token_limit {
            match self.turns.pop_front() {
                Some((_, cost)) => {
                    self.token_count -= cost;
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }

    /// History as alternating user/assistant messages, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.turns
            .iter()
            .flat_map(|(turn, _)| turn.messages())
            .collect()
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().map(|(turn, _)| turn)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn token_limit(&self) -> usize {
        self.token_limit
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.token_count = 0;
    }
}

impl Default for ChatMemory {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_LIMIT)
    }
}
