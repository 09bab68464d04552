use thalamus::proposal::{
    ProposalHistory, ProposalHistoryConfig,
    types::{ProposalHistoryEntry, ProposalOutcomeTag},
};

fn entry(task_id: &str, detail: u32, recorded_at_ms: u64) -> ProposalHistoryEntry {
    ProposalHistoryEntry {
        task_id: task_id.to_string(),
        tag: ProposalOutcomeTag::SkippedNoReductionClient,
        recorded_at_ms,
        candidate: None,
        detail: Some(detail.to_string()),
    }
}

#[test]
fn ring_keeps_most_recent_fifty_of_sixty() {
    let history = ProposalHistory::new(ProposalHistoryConfig {
        ring_capacity: 50,
        history_ttl_ms: 1_000_000,
    });

    for index in 0..60 {
        history.record(entry("task:mine", index, 1_000 + index as u64), 1_000);
    }

    let entries = history.entries("task:mine");
    assert_eq!(entries.len(), 50);
    assert_eq!(entries[0].detail.as_deref(), Some("10"));
    assert_eq!(entries[49].detail.as_deref(), Some("59"));
}

#[test]
fn entries_stay_in_call_order() {
    let history = ProposalHistory::new(ProposalHistoryConfig::default());
    for index in 0..5 {
        history.record(entry("task:mine", index, index as u64), index as u64);
    }

    let details: Vec<String> = history
        .entries("task:mine")
        .into_iter()
        .filter_map(|item| item.detail)
        .collect();
    assert_eq!(details, vec!["0", "1", "2", "3", "4"]);
}

#[test]
fn expired_task_is_evicted_on_a_write_to_any_task() {
    let history = ProposalHistory::new(ProposalHistoryConfig {
        ring_capacity: 50,
        history_ttl_ms: 1,
    });

    history.record(entry("task:old", 0, 100), 100);
    assert_eq!(history.entries("task:old").len(), 1);

    // Two units later, a write to a different task sweeps the stale one.
    history.record(entry("task:new", 0, 102), 102);

    assert!(history.entries("task:old").is_empty());
    assert_eq!(history.entries("task:new").len(), 1);
}

#[test]
fn touch_also_runs_ttl_eviction() {
    let history = ProposalHistory::new(ProposalHistoryConfig {
        ring_capacity: 50,
        history_ttl_ms: 1,
    });

    history.record(entry("task:old", 0, 100), 100);
    history.touch("task:new", 102);

    assert!(history.entries("task:old").is_empty());
    assert_eq!(history.last_proposal_ms("task:new"), Some(102));
}

#[test]
fn stats_aggregate_across_tasks() {
    let history = ProposalHistory::new(ProposalHistoryConfig::default());
    history.record(entry("task:a", 0, 10), 10);
    history.record(entry("task:a", 1, 11), 11);
    history.record(entry("task:b", 0, 12), 12);

    let stats = history.stats();
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.task_count, 2);
}

#[test]
fn ttl_eviction_resets_the_debounce_clock() {
    // When the TTL window is shorter than the debounce window, eviction also
    // forgets last_proposal_ms; the next impasse is not debounced. The two
    // windows interact, so this is pinned as a property instead of assumed.
    let history = ProposalHistory::new(ProposalHistoryConfig {
        ring_capacity: 50,
        history_ttl_ms: 5,
    });

    history.record(entry("task:mine", 0, 100), 100);
    assert_eq!(history.last_proposal_ms("task:mine"), Some(100));

    history.record(entry("task:other", 0, 110), 110);
    assert_eq!(history.last_proposal_ms("task:mine"), None);
}
