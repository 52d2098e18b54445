//! Redelivery suppression keyed by LINE `webhookEventId`.
//!
//! LINE redelivers a notification when it does not get a prompt 200, with
//! the same event ids. Remembering ids for a while keeps a redelivered event
//! from producing a second AI call and a second set of chat messages.

use std::time::{Duration, Instant};

use dashmap::{mapref::entry::Entry, DashMap};

pub struct DeliveryDedup {
    seen: DashMap<String, Instant>,
    ttl: Duration,
}

impl DeliveryDedup {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            ttl,
        }
    }

    /// Claim `id` for processing. Returns false if it was claimed within the TTL.
    pub fn claim(&self, id: &str) -> bool {
        self.evict_expired();
        let now = Instant::now();
        match self.seen.entry(id.to_string()) {
            Entry::Occupied(mut e) => {
                if now.duration_since(*e.get()) < self.ttl {
                    return false;
                }
                e.insert(now);
                true
            }
            Entry::Vacant(v) => {
                v.insert(now);
                true
            }
        }
    }

    /// Forget `id` so a later redelivery is processed again.
    pub fn release(&self, id: &str) {
        self.seen.remove(id);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    fn evict_expired(&self) {
        let ttl = self.ttl;
        self.seen.retain(|_, at| at.elapsed() < ttl);
    }
}
