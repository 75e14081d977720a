//! End-to-end tests for the detect/learn/apply loop.
//!
//! These walk one problem through its full life: fingerprinting on first
//! sight, confidence climbing with each outcome, the auto-apply gate
//! opening at 0.8, and the sharing gate publishing the proven remedy.

mod common;

use common::{init_tracing, open_store, temp_config};
use medic_learn::Learner;
use medic_remedy::{RemedyContext, RemedyRunner, Step};
use medic_triage::{Analyzer, ProblemContext};

fn learner_for(
    store: &medic_store::KnowledgeStore,
    config: &medic_config::MedicConfig,
    agent_id: &str,
) -> Learner {
    Learner::new(
        store.clone(),
        &config.learning,
        agent_id,
        RemedyRunner::new(RemedyContext::default()),
    )
}

#[test]
fn fingerprint_is_stable_across_volatile_details() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(dir.path());
    let store = open_store(&config);
    let analyzer = Analyzer::new(store.clone(), "medic_a");
    let ctx = ProblemContext::for_kind("BACKEND_DOWN", "service_check");

    let first = analyzer
        .analyze("BACKEND_DOWN", "Connection refused on port 8001", &ctx)
        .unwrap();
    let second = analyzer
        .analyze("BACKEND_DOWN", "Connection refused on port 8002", &ctx)
        .unwrap();

    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(second.occurrence_count, 2);
    assert_eq!(first.first_seen, second.first_seen);
    assert_eq!(first.severity, "CRITICAL");
}

#[test]
fn confidence_crosses_the_auto_apply_gate_then_earns_the_bonus() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(dir.path());
    let store = open_store(&config);
    let analyzer = Analyzer::new(store.clone(), "medic_a");
    let learner = learner_for(&store, &config, "medic_a");

    let ctx = ProblemContext::for_kind("HIGH_MEMORY", "vitals_check");
    let problem = analyzer
        .analyze("HIGH_MEMORY", "Memory usage at 95.2%", &ctx)
        .unwrap();
    let fp = &problem.fingerprint;
    let steps = vec![Step::CleanupLogs, Step::Wait(0)];

    // 3 successes and 1 failure: 0.75, below the gate.
    for _ in 0..3 {
        learner.record_outcome(fp, "clean logs", &steps, true).unwrap();
    }
    let row = learner.record_outcome(fp, "clean logs", &steps, false).unwrap();
    assert!((row.confidence - 0.75).abs() < 1e-9);
    assert!(learner.best_solution(fp).unwrap().is_none());

    // 4th success: exactly 4/5 = 0.8, gate opens.
    let row = learner.record_outcome(fp, "clean logs", &steps, true).unwrap();
    assert!((row.confidence - 0.8).abs() < 1e-9);
    let best = learner.best_solution(fp).unwrap().unwrap();
    assert_eq!(best.id, row.id);

    // 5th success: ratio 5/6 plus the proven-remedy bonus.
    let row = learner.record_outcome(fp, "clean logs", &steps, true).unwrap();
    assert!((row.confidence - (5.0 / 6.0 + 0.1)).abs() < 1e-9);
    assert_eq!(row.success_count, 5);

    // That solution now clears the sharing gate, so exactly one
    // SHARE_SOLUTION message is waiting for other agents.
    let pending = store.pending_share_messages("someone_else").unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].source_agent, "medic_a");
}

#[tokio::test]
async fn apply_best_runs_the_steps_and_feeds_the_outcome_back() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(dir.path());
    let store = open_store(&config);
    let analyzer = Analyzer::new(store.clone(), "medic_a");
    let learner = learner_for(&store, &config, "medic_a");

    let ctx = ProblemContext::for_kind("LOW_DISK", "vitals_check");
    let problem = analyzer
        .analyze("LOW_DISK", "Disk free at 4.1%", &ctx)
        .unwrap();
    let steps = vec![Step::CleanupLogs];
    for _ in 0..5 {
        learner
            .record_outcome(&problem.fingerprint, "free disk space", &steps, true)
            .unwrap();
    }

    let outcome = learner.apply_best(&problem.fingerprint).await.unwrap();
    let outcome = outcome.expect("a trusted solution should exist");
    assert!(outcome.report.success);
    assert_eq!(outcome.solution.success_count, 6);
}

#[tokio::test]
async fn apply_best_finds_nothing_below_the_gate() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = temp_config(dir.path());
    let store = open_store(&config);
    let learner = learner_for(&store, &config, "medic_a");
    let analyzer = Analyzer::new(store.clone(), "medic_a");

    let ctx = ProblemContext::for_kind("HIGH_CPU", "vitals_check");
    let problem = analyzer
        .analyze("HIGH_CPU", "CPU at 97%", &ctx)
        .unwrap();

    // One success, one failure: 0.5 confidence, not trusted.
    let steps = vec![Step::Wait(0)];
    learner
        .record_outcome(&problem.fingerprint, "wait it out", &steps, true)
        .unwrap();
    learner
        .record_outcome(&problem.fingerprint, "wait it out", &steps, false)
        .unwrap();

    let outcome = learner.apply_best(&problem.fingerprint).await.unwrap();
    assert!(outcome.is_none());
}
