//! Process-wide conversation state keyed by user id.
//!
//! Every operation takes the internal lock for its own duration only. Callers that
//! read, transform and write back a state across an `await` must ensure a single
//! in-flight turn per user themselves.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::conversation::{ChatTurn, ConversationState, GatheredInfo, HISTORY_LIMIT, StateUpdate};

/// How idle conversations are dropped from memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Keep everything for the process lifetime.
    #[default]
    Unbounded,
    /// Drop entries that have not been touched for the given duration.
    Ttl(Duration),
    /// Keep at most `capacity` users, dropping the least recently touched.
    Lru { capacity: usize },
}

pub(crate) struct Entry {
    state: ConversationState,
    history: VecDeque<ChatTurn>,
    touched_at: Instant,
    touch_seq: u64,
}

impl Entry {
    fn new(now: Instant, seq: u64) -> Self {
        Self {
            state: ConversationState::default(),
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            touched_at: now,
            touch_seq: seq,
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Uuid, Entry>,
    seq: u64,
}

pub struct ConversationStore {
    policy: EvictionPolicy,
    inner: Mutex<Inner>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(EvictionPolicy::Unbounded)
    }
}

impl ConversationStore {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Current state, creating the default welcome state on first access.
    pub fn get(&self, user_id: Uuid) -> ConversationState {
        self.with_entry(user_id, |entry| entry.state.clone())
    }

    /// Apply a partial update and return the resulting state.
    pub fn merge(&self, user_id: Uuid, update: StateUpdate) -> ConversationState {
        self.with_entry(user_id, |entry| {
            entry.state.apply(update);
            entry.state.clone()
        })
    }

    /// Merge newly extracted slots into the stored gathered info.
    pub fn merge_gathered_info(&self, user_id: Uuid, info: &GatheredInfo) -> ConversationState {
        self.with_entry(user_id, |entry| {
            entry.state.gathered_info.merge(info);
            entry.state.clone()
        })
    }

    /// Replace the whole state.
    pub fn put(&self, user_id: Uuid, state: ConversationState) {
        self.with_entry(user_id, |entry| entry.state = state);
    }

    /// Drop state and history for the user.
    pub fn reset(&self, user_id: Uuid) {
        self.lock().entries.remove(&user_id);
    }

    pub fn history(&self, user_id: Uuid) -> Vec<ChatTurn> {
        self.with_entry(user_id, |entry| entry.history.iter().cloned().collect())
    }

    /// Append a turn, dropping the oldest once the history exceeds [`HISTORY_LIMIT`].
    pub fn push_turn(&self, user_id: Uuid, turn: ChatTurn) {
        self.with_entry(user_id, |entry| {
            entry.history.push_back(turn);
            while entry.history.len() > HISTORY_LIMIT {
                entry.history.pop_front();
            }
        });
    }

    /// Number of live conversations.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove expired entries. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let EvictionPolicy::Ttl(ttl) = self.policy else {
            return 0;
        };
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, entry| now.saturating_duration_since(entry.touched_at) < ttl);
        let dropped = before - inner.entries.len();
        if dropped > 0 {
            tracing::debug!(dropped, "evicted idle conversations");
        }
        dropped
    }

    fn with_entry<T>(&self, user_id: Uuid, f: impl FnOnce(&mut Entry) -> T) -> T {
        self.with_entry_at(user_id, Instant::now(), f)
    }

    pub(crate) fn with_entry_at<T>(
        &self,
        user_id: Uuid,
        now: Instant,
        f: impl FnOnce(&mut Entry) -> T,
    ) -> T {
        let mut inner = self.lock();
        inner.seq += 1;
        let seq = inner.seq;

        if let EvictionPolicy::Ttl(ttl) = self.policy {
            let expired = inner
                .entries
                .get(&user_id)
                .is_some_and(|entry| now.saturating_duration_since(entry.touched_at) >= ttl);
            if expired {
                inner.entries.remove(&user_id);
            }
        }

        if let EvictionPolicy::Lru { capacity } = self.policy {
            if !inner.entries.contains_key(&user_id) {
                while !inner.entries.is_empty() && inner.entries.len() >= capacity.max(1) {
                    let oldest = inner
                        .entries
                        .iter()
                        .min_by_key(|(_, entry)| entry.touch_seq)
                        .map(|(id, _)| *id);
                    match oldest {
                        Some(id) => {
                            inner.entries.remove(&id);
                            tracing::debug!(user_id = %id, "evicted least recently used conversation");
                        }
                        None => break,
                    }
                }
            }
        }

        let entry = inner
            .entries
            .entry(user_id)
            .or_insert_with(|| Entry::new(now, seq));
        entry.touched_at = now;
        entry.touch_seq = seq;
        f(entry)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
