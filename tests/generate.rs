//! End-to-end proof generation through the public API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gambit_prover::{
    GambitProver, GameSnapshot, GameStatus, MoveDescriptor, ProgressEvent, ProgressSink,
    ProofMode, ProverProfile, Side, Square,
};

fn snapshot(from: &str, to: &str, move_number: u32) -> GameSnapshot {
    GameSnapshot {
        fen: format!("position-after-{from}{to}-{move_number}"),
        last_move: MoveDescriptor {
            from: Square::from_algebraic(from).unwrap(),
            to: Square::from_algebraic(to).unwrap(),
            captured: None,
        },
        move_number,
        side_to_move: if move_number % 2 == 1 {
            Side::Black
        } else {
            Side::White
        },
        status: GameStatus::Active,
    }
}

/// A profile whose toolchain probe always fails, forcing fallback mode.
fn fallback_profile() -> ProverProfile {
    let mut profile = ProverProfile::sp1("/tmp/gambit-prover-it");
    profile.toolchain = "no-such-prover-toolchain-7391".to_owned();
    profile.stage_delay_ms = 0..1;
    profile
}

/// A profile whose probe and build succeed trivially, with a configurable
/// proving command.
#[cfg(unix)]
fn scripted_profile(root: &std::path::Path, run_command: &str, run_args: &[&str]) -> ProverProfile {
    let mut profile = ProverProfile::sp1(root.join("prover"));
    profile.toolchain = "true".to_owned();
    profile.probe_args = Vec::new();
    profile.build_args = Vec::new();
    profile.run_command = run_command.to_owned();
    profile.run_args = run_args.iter().map(|s| (*s).to_owned()).collect();
    profile.stage_delay_ms = 0..1;
    profile
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn missing_toolchain_yields_complete_fallback_proof() {
    let prover = GambitProver::new(fallback_profile());
    let (sink, mut rx) = ProgressSink::channel();

    let record = prover
        .generate(&snapshot("e2", "e4", 1), &sink)
        .await
        .unwrap();

    assert_eq!(record.mode, ProofMode::Fallback);
    assert!(record.verified);
    assert!(!record.payload.is_empty());

    let events = drain(&mut rx);
    let stages: Vec<&str> = events.iter().map(|e| e.stage.as_str()).collect();
    assert_eq!(
        stages,
        vec![
            "initializing",
            "preparing_input",
            "simulating_execution",
            "creating_proof",
            "verifying",
            "complete",
        ]
    );
    for pair in events.windows(2) {
        assert!(pair[1].progress >= pair[0].progress);
    }

    let status = prover.status();
    assert!(status.initialized);
    assert!(!status.using_real_proofs);
    assert_eq!(status.proof_type, "simulated-stark");
    assert_eq!(status.total_proofs, 1);
}

#[tokio::test]
async fn history_chains_across_a_game() {
    let prover = GambitProver::new(fallback_profile());
    let sink = ProgressSink::discard();

    let moves = [("e2", "e4"), ("e7", "e5"), ("g1", "f3"), ("b8", "c6")];
    for (number, (from, to)) in moves.iter().enumerate() {
        prover
            .generate(&snapshot(from, to, number as u32 + 1), &sink)
            .await
            .unwrap();
    }

    let history = prover.history().all();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].prev_hash, None);
    for pair in history.windows(2) {
        assert!(pair[1].prev_hash.is_some());
        assert!(pair[1].id > pair[0].id);
    }

    let stats = prover.history().stats();
    assert_eq!(stats.count, 4);
    assert_eq!(stats.fallback_count, 4);
    assert!(stats.mean_payload_size > 0.0);
}

#[tokio::test]
async fn records_survive_json_round_trips() {
    let prover = GambitProver::new(fallback_profile());
    let record = prover
        .generate(&snapshot("d2", "d4", 1), &ProgressSink::discard())
        .await
        .unwrap();

    let json = serde_json::to_string(&record).unwrap();
    let back: gambit_prover::ProofRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[tokio::test]
async fn concurrent_requests_share_initialization() {
    let prover = Arc::new(GambitProver::new(fallback_profile()));

    let mut handles = Vec::new();
    for number in 1..=4u32 {
        let prover = Arc::clone(&prover);
        handles.push(tokio::spawn(async move {
            prover
                .generate(&snapshot("e2", "e4", number), &ProgressSink::discard())
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert_eq!(prover.history().len(), 4);
}

#[cfg(unix)]
#[tokio::test]
async fn working_toolchain_produces_a_real_record() {
    let dir = tempfile::tempdir().unwrap();
    let profile = scripted_profile(
        dir.path(),
        "sh",
        &[
            "-c",
            "echo PROOF_RESULT:SUCCESS; echo PROOF_SIZE:8192; \
             echo PROOF_TIME:2100; echo PROOF_VERIFIED:true; echo VERIFY_TIME:77",
        ],
    );
    let script_dir = profile.script_dir();
    let prover = GambitProver::new(profile);

    // Initialization materializes the sources, including the script dir the
    // proving run executes in.
    let record = prover
        .generate(&snapshot("e2", "e4", 1), &ProgressSink::discard())
        .await
        .unwrap();

    assert!(script_dir.is_dir());
    assert_eq!(record.mode, ProofMode::Real);
    assert_eq!(record.payload_size, 8_192);
    assert!(record.verified);
    assert!(prover.status().using_real_proofs);
    assert_eq!(prover.status().proof_type, "sp1-stark");
}

#[cfg(unix)]
#[tokio::test]
async fn broken_prover_demotes_for_the_rest_of_the_process() {
    let dir = tempfile::tempdir().unwrap();
    let prover = GambitProver::new(scripted_profile(dir.path(), "false", &[]));
    let (sink, mut rx) = ProgressSink::channel();

    // First request: real run fails, same request completes on the fallback.
    let record = prover
        .generate(&snapshot("e2", "e4", 1), &sink)
        .await
        .unwrap();
    assert_eq!(record.mode, ProofMode::Fallback);

    let events = drain(&mut rx);
    assert_eq!(events.iter().filter(|e| e.stage == "error").count(), 1);
    assert_eq!(events.last().unwrap().stage, "complete");

    // Later requests never touch the real pipeline again.
    let (sink, mut rx) = ProgressSink::channel();
    let next = prover
        .generate(&snapshot("e7", "e5", 2), &sink)
        .await
        .unwrap();
    assert_eq!(next.mode, ProofMode::Fallback);
    let events = drain(&mut rx);
    assert!(events.iter().all(|e| e.mode == ProofMode::Fallback));
    assert!(events.iter().all(|e| e.stage != "error"));
}

#[cfg(unix)]
#[tokio::test]
async fn hung_prover_is_killed_at_the_time_bound() {
    let dir = tempfile::tempdir().unwrap();
    let mut profile = scripted_profile(dir.path(), "sh", &["-c", "sleep 30"]);
    profile.prove_timeout = Duration::from_millis(200);
    let prover = GambitProver::new(profile);

    let start = Instant::now();
    let record = prover
        .generate(&snapshot("e2", "e4", 1), &ProgressSink::discard())
        .await
        .unwrap();

    // The request still completes (on the fallback), long before the 30s
    // sleep would have finished.
    assert_eq!(record.mode, ProofMode::Fallback);
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "request took {}ms",
        start.elapsed().as_millis()
    );
}
