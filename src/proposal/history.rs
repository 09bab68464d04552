use std::{
    collections::{BTreeMap, VecDeque},
    sync::RwLock,
};

use serde::{Deserialize, Serialize};

use crate::proposal::types::{ProposalHistoryEntry, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalHistoryConfig {
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,
    #[serde(default = "default_history_ttl_ms")]
    pub history_ttl_ms: u64,
}

fn default_ring_capacity() -> usize {
    50
}

fn default_history_ttl_ms() -> u64 {
    30 * 60 * 1_000
}

impl Default for ProposalHistoryConfig {
    fn default() -> Self {
        Self {
            ring_capacity: default_ring_capacity(),
            history_ttl_ms: default_history_ttl_ms(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct TaskHistory {
    entries: VecDeque<ProposalHistoryEntry>,
    last_proposal_ms: u64,
}

/// Aggregate size of the store, for dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HistoryStats {
    pub total_entries: usize,
    pub task_count: usize,
}

/// Per-task, append-only proposal log with two eviction rules: a fixed-size
/// ring per task and a whole-task TTL measured from the task's last write.
/// Eviction runs lazily on write paths, never on a timer. Callers supply
/// `now_ms` so retention is deterministic under test.
#[derive(Default)]
pub struct ProposalHistory {
    config: ProposalHistoryConfig,
    state: RwLock<BTreeMap<TaskId, TaskHistory>>,
}

impl ProposalHistory {
    pub fn new(config: ProposalHistoryConfig) -> Self {
        Self {
            config,
            state: RwLock::new(BTreeMap::new()),
        }
    }

    /// Appends one entry to the owning task's ring and stamps the task's
    /// last-proposal time. Expired tasks anywhere in the store are evicted on
    /// the same write.
    pub fn record(&self, entry: ProposalHistoryEntry, now_ms: u64) {
        let mut guard = self.state.write().expect("lock poisoned");
        Self::evict_expired(&mut guard, self.config.history_ttl_ms, now_ms);

        let task = guard.entry(entry.task_id.clone()).or_default();
        if task.entries.len() >= self.config.ring_capacity.max(1) {
            let evicted = task.entries.pop_front();
            if let Some(evicted) = evicted {
                tracing::debug!(
                    target: "proposal",
                    task_id = %evicted.task_id,
                    tag = evicted.tag.as_str(),
                    "history_ring_evicted"
                );
            }
        }
        task.entries.push_back(entry);
        task.last_proposal_ms = now_ms;
    }

    /// Stamps the last-proposal time without appending; used by exits that
    /// deliberately write no entry.
    pub fn touch(&self, task_id: &str, now_ms: u64) {
        let mut guard = self.state.write().expect("lock poisoned");
        Self::evict_expired(&mut guard, self.config.history_ttl_ms, now_ms);
        guard.entry(task_id.to_string()).or_default().last_proposal_ms = now_ms;
    }

    pub fn last_proposal_ms(&self, task_id: &str) -> Option<u64> {
        self.state
            .read()
            .expect("lock poisoned")
            .get(task_id)
            .map(|task| task.last_proposal_ms)
    }

    pub fn entries(&self, task_id: &str) -> Vec<ProposalHistoryEntry> {
        self.state
            .read()
            .expect("lock poisoned")
            .get(task_id)
            .map(|task| task.entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> HistoryStats {
        let guard = self.state.read().expect("lock poisoned");
        HistoryStats {
            total_entries: guard.values().map(|task| task.entries.len()).sum(),
            task_count: guard.len(),
        }
    }

    fn evict_expired(state: &mut BTreeMap<TaskId, TaskHistory>, ttl_ms: u64, now_ms: u64) {
        let expired: Vec<TaskId> = state
            .iter()
            .filter(|(_, task)| now_ms.saturating_sub(task.last_proposal_ms) > ttl_ms)
            .map(|(task_id, _)| task_id.clone())
            .collect();
        for task_id in expired {
            state.remove(&task_id);
            tracing::debug!(target: "proposal", task_id = %task_id, "history_ttl_evicted");
        }
    }
}
