//! Integration tests for cross-agent solution sharing.
//!
//! Two agents share one SQLite knowledge base (WAL mode), which is how
//! independent medic processes on a host collaborate. A proven solution
//! published by one agent must land in the other's repertoire exactly
//! once, and an agent must never import its own broadcast.

mod common;

use common::{init_tracing, open_store, temp_config};
use medic_collab::{CollabBus, SharingGate};
use medic_learn::Learner;
use medic_remedy::{RemedyContext, RemedyRunner, Step};
use medic_triage::{Analyzer, ProblemContext};

fn teach_shareable(
    store: &medic_store::KnowledgeStore,
    config: &medic_config::MedicConfig,
    agent_id: &str,
) -> String {
    let analyzer = Analyzer::new(store.clone(), agent_id);
    let learner = Learner::new(
        store.clone(),
        &config.learning,
        agent_id,
        RemedyRunner::new(RemedyContext::default()),
    );
    let ctx = ProblemContext::for_kind("DATABASE_CRITICAL", "database_check");
    let problem = analyzer
        .analyze("DATABASE_CRITICAL", "integrity_check failed on trading.db", &ctx)
        .unwrap();
    let steps = vec![Step::BackupDatabase, Step::RestartService("backend".into())];
    // Five straight successes clear the sharing gate on the fifth.
    for _ in 0..5 {
        learner
            .record_outcome(&problem.fingerprint, "backup then restart", &steps, true)
            .unwrap();
    }
    problem.fingerprint
}

#[test]
fn shared_solution_is_imported_exactly_once() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(dir.path());
    let store_a = open_store(&config);
    let store_b = open_store(&config);

    let fp = teach_shareable(&store_a, &config, "medic_a");

    let bus_b = CollabBus::new(
        store_b.clone(),
        "medic_b",
        SharingGate::from_config(&config.learning),
    );
    let summary = bus_b.sync().unwrap();
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.failed, 0);

    // The import seeds a peer copy alongside the original.
    let solutions = store_b.solutions_for(&fp).unwrap();
    assert_eq!(solutions.len(), 2);
    let imported = solutions
        .iter()
        .find(|s| s.created_by == "imported_from_medic_a")
        .expect("imported copy should exist");
    assert!((imported.confidence - 0.5).abs() < 1e-9);
    assert_eq!(imported.success_count, 1);

    // A second sync has nothing pending and changes nothing.
    let summary = bus_b.sync().unwrap();
    assert_eq!(summary.imported, 0);
    assert_eq!(summary.skipped, 0);
    assert_eq!(store_b.solutions_for(&fp).unwrap().len(), 2);
}

#[test]
fn republished_solution_is_skipped_as_already_known() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(dir.path());
    let store_a = open_store(&config);
    let store_b = open_store(&config);
    let gate = SharingGate::from_config(&config.learning);

    let fp = teach_shareable(&store_a, &config, "medic_a");

    let bus_a = CollabBus::new(store_a.clone(), "medic_a", gate.clone());
    let bus_b = CollabBus::new(store_b.clone(), "medic_b", gate);
    assert_eq!(bus_b.sync().unwrap().imported, 1);

    // The same agent broadcasts the same solution again.
    let best = store_a.best_solution(&fp, 0.8).unwrap().unwrap();
    bus_a.publish(&best).unwrap();

    let summary = bus_b.sync().unwrap();
    assert_eq!(summary.imported, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(store_b.solutions_for(&fp).unwrap().len(), 2);
}

#[test]
fn agents_never_import_their_own_broadcasts() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(dir.path());
    let store_a = open_store(&config);

    let fp = teach_shareable(&store_a, &config, "medic_a");
    assert_eq!(store_a.pending_share_messages("medic_b").unwrap().len(), 1);

    let bus_a = CollabBus::new(
        store_a.clone(),
        "medic_a",
        SharingGate::from_config(&config.learning),
    );
    let summary = bus_a.sync().unwrap();
    assert_eq!(summary.imported, 0);

    // Only the author's original remains; the message still waits for a peer.
    assert_eq!(store_a.solutions_for(&fp).unwrap().len(), 1);
    assert_eq!(store_a.pending_share_messages("medic_b").unwrap().len(), 1);
}
