use std::collections::VecDeque;

use crate::protocol::server_events::ServerEvent;

pub const DEFAULT_LOG_CAPACITY: usize = 256;

/// Received events, newest first. Old events fall off the back once full.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<ServerEvent>,
    capacity: usize,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { events: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, event: ServerEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_back();
        }
        self.events.push_front(event);
    }

    #[must_use]
    pub fn latest(&self) -> Option<&ServerEvent> {
        self.events.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerEvent> {
        self.events.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
