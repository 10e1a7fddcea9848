use crate::domain::conversation::{Turn, CONVERSATION_TTL, MAX_CONTEXT_TURNS};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

pub struct Conversation {
    pub id: String,
    turns: Vec<Turn>,
    pub created_at: Instant,
    pub last_access: Instant,
    expiry_armed: bool,
}

impl Conversation {
    fn new(id: &str) -> Self {
        let now = Instant::now();
        Self { id: id.to_string(), turns: Vec::new(), created_at: now, last_access: now, expiry_armed: false }
    }

    pub fn is_empty(&self) -> bool { self.turns.is_empty() }

    /// Number of turns currently held, which can exceed the context window by one
    /// until the next read.
    pub fn stored_turns(&self) -> usize { self.turns.len() }
}

type Slot = Arc<Mutex<Conversation>>;

/// Conversation histories keyed by id.
///
/// Each id has its own lock; a [`ConversationGuard`] holds it for a whole
/// read-ask-append cycle so concurrent turns on one conversation cannot lose
/// updates. The map lock itself is only held to look up or insert a slot.
#[derive(Clone)]
pub struct ConversationStore {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    ttl: Duration,
}

impl Default for ConversationStore {
    fn default() -> Self { Self::new() }
}

impl ConversationStore {
    pub fn new() -> Self { Self::with_ttl(CONVERSATION_TTL) }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { slots: Arc::default(), ttl }
    }

    /// Keep the caller's id when it sent one, otherwise allocate a fresh one.
    pub fn get_or_create_id(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        }
    }

    /// Take the per-id lock, creating an empty conversation slot if needed.
    pub async fn checkout(&self, id: &str) -> ConversationGuard {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(id.to_string()).or_insert_with(|| Arc::new(Mutex::new(Conversation::new(id)))).clone()
        };
        let guard = slot.clone().lock_owned().await;
        ConversationGuard { store: self.clone(), slot: Arc::downgrade(&slot), guard }
    }

    pub async fn get_context(&self, id: &str) -> Vec<Turn> {
        self.checkout(id).await.context()
    }

    pub async fn append_turn(&self, id: &str, question: &str, answer: &str) {
        self.checkout(id).await.append_turn(question, answer);
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.slots.lock().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }

    /// Drop slots nobody uses that never received a turn (failed asks, bare reads).
    pub async fn sweep_idle(&self) -> usize {
        let mut slots = self.slots.lock().await;
        let before = slots.len();
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(conv) => !conv.is_empty(),
                Err(_) => true,
            }
        });
        before - slots.len()
    }

    /// One-shot expiry. Waits for the conversation's own lock so a turn in
    /// progress finishes first, then drops the history. The slot leaves the map
    /// only when no other request holds or waits on it; otherwise it stays as an
    /// empty conversation and the queued requests keep their ordering.
    fn schedule_expiry(&self, id: String, slot: Weak<Mutex<Conversation>>) {
        let store = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(store.ttl).await;
            let Some(slot) = slot.upgrade() else { return };
            let mut conv = slot.lock().await;
            conv.turns.clear();
            conv.expiry_armed = false;

            let mut slots = store.slots.lock().await;
            let same = slots.get(&id).is_some_and(|cur| Arc::ptr_eq(cur, &slot));
            // The map's reference plus ours.
            if same && Arc::strong_count(&slot) == 2 {
                slots.remove(&id);
            }
            info!(conversation_id = %id, "conversation expired");
        });
    }
}

/// Exclusive access to one conversation.
pub struct ConversationGuard {
    store: ConversationStore,
    slot: Weak<Mutex<Conversation>>,
    guard: OwnedMutexGuard<Conversation>,
}

impl ConversationGuard {
    pub fn id(&self) -> &str { &self.guard.id }

    /// The most recent turns, oldest first. Older turns are dropped for good.
    pub fn context(&mut self) -> Vec<Turn> {
        let conv = &mut *self.guard;
        if conv.turns.len() > MAX_CONTEXT_TURNS {
            let excess = conv.turns.len() - MAX_CONTEXT_TURNS;
            conv.turns.drain(..excess);
        }
        conv.last_access = Instant::now();
        conv.turns.clone()
    }

    /// Record a turn. The first stored turn arms the one-shot expiry timer;
    /// later turns do not push it back.
    pub fn append_turn(&mut self, question: &str, answer: &str) {
        let conv = &mut *self.guard;
        conv.turns.push(Turn::new(question, answer));
        conv.last_access = Instant::now();
        if !conv.expiry_armed {
            conv.expiry_armed = true;
            debug!(conversation_id = %conv.id, ttl_secs = self.store.ttl.as_secs(), "expiry armed");
            self.store.schedule_expiry(conv.id.clone(), self.slot.clone());
        }
    }

    pub fn stored_turns(&self) -> usize { self.guard.stored_turns() }
}
