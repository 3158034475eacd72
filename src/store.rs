use crate::download::MediaRecord;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
    time::{Duration, Instant},
};
use teloxide::types::{ChatId, MessageId};
use tracing::debug;

/// The most recently resolved media for a chat, plus the prompt offering it.
#[derive(Debug, Clone)]
pub struct Selection {
    pub record: Arc<MediaRecord>,
    /// Message carrying the choice buttons. Presses on any other message are stale.
    pub prompt: MessageId,
    stored_at: Instant,
}

impl Selection {
    #[must_use]
    pub fn new(record: MediaRecord, prompt: MessageId) -> Self {
        Self {
            record: Arc::new(record),
            prompt,
            stored_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.stored_at.elapsed() >= ttl)
    }
}

type Slot = Arc<Mutex<Option<Selection>>>;

/// Per-chat selection cache. Every chat has its own slot and lock, so chats
/// never contend with each other.
#[derive(Debug, Default)]
pub struct SelectionStore {
    slots: RwLock<HashMap<ChatId, Slot>>,
    ttl: Option<Duration>,
}

impl SelectionStore {
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            slots: RwLock::default(),
            ttl,
        }
    }

    /// Existing slot for `chat`. Never creates one.
    fn existing_slot(&self, chat: ChatId) -> Option<Slot> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&chat)
            .map(Arc::clone)
    }

    fn slot_or_insert(&self, chat: ChatId) -> Slot {
        if let Some(slot) = self.existing_slot(chat) {
            return slot;
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(chat).or_default())
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Store `selection` for `chat`, replacing whatever was there.
    pub fn put(&self, chat: ChatId, selection: Selection) {
        let slot = self.slot_or_insert(chat);
        let previous = slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(selection);
        if previous.is_some() {
            debug!(chat = chat.0, "replaced previous selection");
        }
    }

    /// Current selection for `chat`, if any and not expired.
    #[must_use]
    pub fn get(&self, chat: ChatId) -> Option<Selection> {
        let slot = self.existing_slot(chat)?;
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.as_ref().is_some_and(|s| s.is_expired(self.ttl)) {
            debug!(chat = chat.0, "selection expired");
            *guard = None;
        }
        guard.clone()
    }

    /// Drop the selection for `chat`.
    pub fn remove(&self, chat: ChatId) -> Option<Selection> {
        self.existing_slot(chat)?
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
