//! `ConversationCache`: DashMap-based session state cache with
//! TTL expiration and RAM-pressure admission control.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::System;
use uuid::Uuid;

use super::types::ConversationState;

const MAX_MEMORY_USAGE_PERCENT: f32 = 90.0;

pub struct ConversationCache {
    sessions: DashMap<Uuid, Arc<parking_lot::Mutex<ConversationState>>>,
    ttl: Duration,
}

impl ConversationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Rejects new sessions once system memory usage crosses the pressure
    /// threshold; existing sessions keep working.
    pub fn can_create_new_session(&self) -> bool {
        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return true;
        }
        let used_pct = (sys.used_memory() as f32 / total as f32) * 100.0;
        used_pct < MAX_MEMORY_USAGE_PERCENT
    }

    pub fn get_or_create(
        &self,
        session_id: Uuid,
        tenant_id: Uuid,
        user_id: Uuid,
        document_ids: Vec<Uuid>,
    ) -> Arc<parking_lot::Mutex<ConversationState>> {
        self.sessions
            .entry(session_id)
            .or_insert_with(|| Arc::new(parking_lot::Mutex::new(ConversationState::new(session_id, tenant_id, user_id, document_ids))))
            .clone()
    }

    pub fn touch(&self, session_id: Uuid) {
        if let Some(entry) = self.sessions.get(&session_id) {
            entry.lock().last_activity = Instant::now();
        }
    }

    pub fn cleanup_expired(&self) -> usize {
        let ttl = self.ttl;
        let before = self.sessions.len();
        self.sessions.retain(|_, state| state.lock().last_activity.elapsed() < ttl);
        before - self.sessions.len()
    }

    pub fn stats(&self) -> (usize, bool) {
        (self.sessions.len(), self.can_create_new_session())
    }
}
