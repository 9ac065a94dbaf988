//! Staged proof pipeline.
//!
//! Both proving modes run as a fixed sequence of named stages. Each stage
//! emits one [`ProgressEvent`] with a completion percentage derived from its
//! position, so observers see the same shape of progression whether the proof
//! is real or simulated.
//!
//! In real mode the `creating_stark_proof` stage invokes the external prover
//! and streams its stdout; lines matching the profile's progress markers are
//! surfaced as supplementary events at the same stage. In fallback mode every
//! stage is simulation: short randomized delays plus metrics drawn from the
//! profile's synthetic ranges. A failed run emits one terminal
//! [`ERROR_STAGE`] event before the error propagates.

use std::sync::Arc;

use web_time::{Duration, Instant};

use crate::error::ProverError;
use crate::events::{ProgressEvent, ProgressSink, ERROR_STAGE};
use crate::invoker::ProcessInvoker;
use crate::parser::{parse_prover_output, ParsedProverOutput};
use crate::profile::{ProverProfile, StageSpec};
use crate::rng::MetricsRng;
use crate::snapshot::GameSnapshot;
use crate::{ProofId, ProofMode};

/// Metrics synthesized for a simulated proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedMetrics {
    /// Simulated zkVM cycle count.
    pub cycles: u64,
    /// Simulated constraint count.
    pub constraints: u64,
    /// Simulated execution trace rows.
    pub trace_rows: u64,
}

/// Result of one pipeline run, before it is assembled into a record.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    /// Mode the run executed in.
    pub mode: ProofMode,
    /// Whether verification reported success.
    pub verified: bool,
    /// Reported proof payload size in bytes.
    pub proof_size: u64,
    /// Reported proof generation time in milliseconds.
    pub proof_time_ms: u64,
    /// Verification time in milliseconds, when reported.
    pub verify_time_ms: Option<u64>,
    /// Simulated metrics; present only for fallback runs.
    pub simulated: Option<SimulatedMetrics>,
    /// Wall-clock time of the whole pipeline run.
    pub elapsed: Duration,
}

/// Runs the staged proving sequence for one request.
#[derive(Debug, Clone)]
pub struct StagedPipeline {
    profile: Arc<ProverProfile>,
}

impl StagedPipeline {
    /// Creates a pipeline over the given profile.
    #[must_use]
    pub fn new(profile: Arc<ProverProfile>) -> Self {
        Self { profile }
    }

    /// Runs all stages of `mode` for the snapshot, emitting progress events.
    ///
    /// On success the terminal `complete` event has been emitted at progress
    /// 100. On failure exactly one terminal [`ERROR_STAGE`] event has been
    /// emitted before the error is returned.
    ///
    /// # Errors
    ///
    /// Real-mode runs fail when the external prover cannot be spawned, times
    /// out, or exits non-zero. Fallback runs do not fail.
    pub async fn run(
        &self,
        mode: ProofMode,
        proof_id: ProofId,
        snapshot: &GameSnapshot,
        sink: &ProgressSink,
    ) -> Result<StageOutcome, ProverError> {
        let start = Instant::now();
        let result = match mode {
            ProofMode::Real => self.run_real(proof_id, snapshot, sink).await,
            ProofMode::Fallback => Ok(self.run_fallback(proof_id, snapshot, sink).await),
        };

        match result {
            Ok(mut outcome) => {
                outcome.elapsed = start.elapsed();
                tracing::info!(
                    proof_id = %proof_id,
                    mode = mode.as_str(),
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    verified = outcome.verified,
                    "proof pipeline complete"
                );
                Ok(outcome)
            }
            Err((stage, err)) => {
                tracing::warn!(
                    proof_id = %proof_id,
                    mode = mode.as_str(),
                    stage,
                    error = %err,
                    "proof pipeline failed"
                );
                sink.emit(ProgressEvent {
                    proof_id,
                    stage: ERROR_STAGE.to_owned(),
                    message: err.to_string(),
                    progress: stage_progress(self.profile.stages(mode), stage),
                    mode,
                });
                Err(err)
            }
        }
    }

    async fn run_real(
        &self,
        proof_id: ProofId,
        snapshot: &GameSnapshot,
        sink: &ProgressSink,
    ) -> Result<StageOutcome, (&'static str, ProverError)> {
        let stages = self.profile.stages(ProofMode::Real);
        let input = snapshot.circuit_input();
        let mut rng = MetricsRng::from_entropy();
        let mut parsed: Option<ParsedProverOutput> = None;

        for (index, stage) in stages.iter().enumerate() {
            let progress = indexed_progress(index, stages.len());
            self.emit_stage(sink, proof_id, ProofMode::Real, stage, progress);

            match stage.name {
                "creating_stark_proof" => {
                    let spec = self.profile.prove_spec(&input);
                    let markers = self.profile.progress_markers;
                    let output = ProcessInvoker::run_streaming(&spec, |line| {
                        if markers.iter().any(|m| line.contains(m)) {
                            sink.emit(ProgressEvent {
                                proof_id,
                                stage: stage.name.to_owned(),
                                message: line.trim().to_owned(),
                                progress,
                                mode: ProofMode::Real,
                            });
                        }
                    })
                    .await
                    .map_err(|err| (stage.name, err.into_stage_error(stage.name)))?;
                    parsed = Some(parse_prover_output(
                        &output.stdout,
                        &self.profile.synthetic,
                        &mut rng,
                    ));
                }
                "complete" => {}
                _ => self.stage_delay(&mut rng).await,
            }
        }

        // The prove stage always ran by the time the loop finishes.
        let parsed = parsed.ok_or((
            "creating_stark_proof",
            ProverError::StageFailed {
                stage: "creating_stark_proof",
                context: "prover produced no output".to_owned(),
            },
        ))?;

        Ok(StageOutcome {
            mode: ProofMode::Real,
            verified: parsed.verified,
            proof_size: u64::from(parsed.proof_size),
            proof_time_ms: parsed.proof_time_ms,
            verify_time_ms: parsed.verify_time_ms,
            simulated: None,
            elapsed: Duration::ZERO,
        })
    }

    async fn run_fallback(
        &self,
        proof_id: ProofId,
        snapshot: &GameSnapshot,
        sink: &ProgressSink,
    ) -> StageOutcome {
        let stages = self.profile.stages(ProofMode::Fallback);
        let input = snapshot.circuit_input();
        let ranges = &self.profile.synthetic;
        let mut rng = MetricsRng::from_entropy();

        for (index, stage) in stages.iter().enumerate() {
            let progress = indexed_progress(index, stages.len());
            self.emit_stage(sink, proof_id, ProofMode::Fallback, stage, progress);
            if stage.name != "complete" {
                self.stage_delay(&mut rng).await;
            }
        }

        StageOutcome {
            mode: ProofMode::Fallback,
            verified: input.is_valid_move(),
            proof_size: u64::from(rng.sample(ranges.proof_size_bytes.clone())),
            proof_time_ms: u64::from(rng.sample(ranges.proof_time_ms.clone())),
            verify_time_ms: Some(u64::from(rng.sample(ranges.verify_time_ms.clone()))),
            simulated: Some(SimulatedMetrics {
                cycles: rng.sample_u64(ranges.cycles.clone()),
                constraints: rng.sample_u64(ranges.constraints.clone()),
                trace_rows: rng.sample_u64(ranges.trace_rows.clone()),
            }),
            elapsed: Duration::ZERO,
        }
    }

    fn emit_stage(
        &self,
        sink: &ProgressSink,
        proof_id: ProofId,
        mode: ProofMode,
        stage: &StageSpec,
        progress: f64,
    ) {
        tracing::debug!(proof_id = %proof_id, stage = stage.name, progress, "stage");
        sink.emit(ProgressEvent {
            proof_id,
            stage: stage.name.to_owned(),
            message: stage.message.to_owned(),
            progress,
            mode,
        });
    }

    async fn stage_delay(&self, rng: &mut MetricsRng) {
        let delay = rng.sample_u64(self.profile.stage_delay_ms.clone());
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
    }
}

/// Progress percentage for the stage at `index` of `count`: the terminal stage
/// lands exactly on 100.
fn indexed_progress(index: usize, count: usize) -> f64 {
    ((index + 1) as f64 / count as f64) * 100.0
}

/// Progress value reported with an error event: the percentage of the stage
/// that failed, or 0 if the stage name is unknown.
fn stage_progress(stages: &[StageSpec], name: &str) -> f64 {
    stages
        .iter()
        .position(|s| s.name == name)
        .map_or(0.0, |index| indexed_progress(index, stages.len()))
}
