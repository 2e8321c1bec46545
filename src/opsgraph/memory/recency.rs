//! Bounded short-term conversation history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of messages kept
pub const DEFAULT_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn line(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}

/// Ring of the most recent messages; the oldest entry is evicted on overflow
#[derive(Debug, Clone)]
pub struct RecencyBuffer {
    capacity: usize,
    messages: VecDeque<ConversationMessage>,
}

impl RecencyBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity),
        }
    }

    pub fn append(&mut self, role: impl Into<String>, content: impl Into<String>) {
        self.messages.push_back(ConversationMessage {
            role: role.into(),
            content: content.into(),
            timestamp: Utc::now(),
        });
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    /// Last `k` messages as `role: content` lines, most recent last
    pub fn window(&self, k: usize) -> String {
        let skip = self.messages.len().saturating_sub(k);
        self.messages
            .iter()
            .skip(skip)
            .map(ConversationMessage::line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn messages(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Default for RecencyBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
