//! The proof orchestrator: the one entry point callers interact with.
//!
//! [`GambitProver`] ties the subsystems together: capability detection decides
//! the mode, the staged pipeline produces the proof, and every success is
//! recorded in the history store. Retry policy lives here and only here: a
//! real-mode run that fails at runtime is retried exactly once on the fallback
//! pipeline within the same request, and the capability manager is permanently
//! demoted so later requests skip the broken toolchain entirely.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::capability::{CapabilityManager, CapabilityState};
use crate::error::ProverError;
use crate::events::ProgressSink;
use crate::hash;
use crate::history::ProofHistoryStore;
use crate::pipeline::{StageOutcome, StagedPipeline};
use crate::profile::ProverProfile;
use crate::record::{ProofDetails, ProofRecord, PublicOutputs};
use crate::snapshot::{CircuitInput, GameSnapshot};
use crate::{ProofId, ProofMode};

/// Point-in-time report of the prover's state, shaped for status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProverStatus {
    /// Whether capability initialization has completed.
    pub initialized: bool,
    /// Whether new requests will use the real prover.
    pub using_real_proofs: bool,
    /// Proof type label for new requests.
    pub proof_type: String,
    /// Toolchain version string (probed when available).
    pub toolchain_version: String,
    /// Total proofs generated so far.
    pub total_proofs: usize,
    /// Proofs generated by the real prover.
    pub real_proofs: usize,
    /// Proofs generated by the fallback simulation.
    pub fallback_proofs: usize,
}

/// Deterministic content the opaque payload is built from.
#[derive(Serialize)]
struct PayloadSeed<'a> {
    proof_type: &'a str,
    circuit_input: CircuitInput,
    public_outputs: PublicOutputs,
    content_hash: u64,
    created_at_ms: u64,
    proof_time_ms: u64,
}

/// Generates move proofs and records them.
///
/// Internally synchronized; share it behind an `Arc` and call
/// [`generate`](Self::generate) from any task.
#[derive(Debug)]
pub struct GambitProver {
    profile: Arc<ProverProfile>,
    capability: CapabilityManager,
    pipeline: StagedPipeline,
    history: ProofHistoryStore,
    next_id: AtomicU64,
}

impl GambitProver {
    /// Creates a prover for the given profile. Nothing is probed or built
    /// until the first [`generate`](Self::generate) call.
    #[must_use]
    pub fn new(profile: ProverProfile) -> Self {
        let profile = Arc::new(profile);
        Self {
            capability: CapabilityManager::new(Arc::clone(&profile)),
            pipeline: StagedPipeline::new(Arc::clone(&profile)),
            history: ProofHistoryStore::new(),
            next_id: AtomicU64::new(1),
            profile,
        }
    }

    /// Generates a proof for the snapshot, emitting progress events to `sink`.
    ///
    /// The first call triggers capability initialization; concurrent first
    /// calls share it. On a real-mode runtime failure the request is retried
    /// once on the fallback pipeline and real proving is demoted for the rest
    /// of the process lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`ProverError::InvalidSnapshot`] without emitting any event if
    /// the snapshot fails validation, and the underlying pipeline error if the
    /// fallback pipeline itself fails.
    pub async fn generate(
        &self,
        snapshot: &GameSnapshot,
        sink: &ProgressSink,
    ) -> Result<ProofRecord, ProverError> {
        snapshot.validate()?;

        let proof_id = ProofId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mode = self.capability.ensure_ready().await;
        tracing::info!(proof_id = %proof_id, mode = mode.as_str(), "generating proof");

        let outcome = match self.pipeline.run(mode, proof_id, snapshot, sink).await {
            Ok(outcome) => outcome,
            Err(err) if mode == ProofMode::Real => {
                tracing::warn!(
                    proof_id = %proof_id,
                    error = %err,
                    "real proof failed, demoting and retrying on the fallback"
                );
                self.capability.demote();
                self.pipeline
                    .run(ProofMode::Fallback, proof_id, snapshot, sink)
                    .await?
            }
            Err(err) => return Err(err),
        };

        let record = self.assemble_record(proof_id, snapshot, &outcome)?;
        self.history.append(record.clone());
        Ok(record)
    }

    /// The proof history of this process.
    #[must_use]
    pub fn history(&self) -> &ProofHistoryStore {
        &self.history
    }

    /// Looks up a completed proof by its id.
    #[must_use]
    pub fn by_id(&self, id: ProofId) -> Option<ProofRecord> {
        self.history.by_id(id)
    }

    /// Current lifecycle state of the capability decision.
    #[must_use]
    pub fn capability_state(&self) -> CapabilityState {
        self.capability.state()
    }

    /// Snapshot of the prover's state for status reporting.
    #[must_use]
    pub fn status(&self) -> ProverStatus {
        let stats = self.history.stats();
        let using_real = self.capability.state() == CapabilityState::ReadyReal;
        let proof_type = if using_real {
            &self.profile.real_proof_type
        } else {
            &self.profile.fallback_proof_type
        };
        ProverStatus {
            initialized: self.capability.is_initialized(),
            using_real_proofs: using_real,
            proof_type: proof_type.clone(),
            toolchain_version: self.capability.toolchain_version(),
            total_proofs: stats.count,
            real_proofs: stats.real_count,
            fallback_proofs: stats.fallback_count,
        }
    }

    fn assemble_record(
        &self,
        proof_id: ProofId,
        snapshot: &GameSnapshot,
        outcome: &StageOutcome,
    ) -> Result<ProofRecord, ProverError> {
        let circuit_input = snapshot.circuit_input();
        let public_outputs = PublicOutputs::for_input(&circuit_input);
        let content_hash = hash::content_hash(snapshot);
        let prev_hash = self.history.last_content_hash().map(hash::chain_link);
        let created_at_ms = unix_millis();

        let seed = PayloadSeed {
            proof_type: match outcome.mode {
                ProofMode::Real => &self.profile.real_proof_type,
                ProofMode::Fallback => &self.profile.fallback_proof_type,
            },
            circuit_input,
            public_outputs,
            content_hash,
            created_at_ms,
            proof_time_ms: outcome.proof_time_ms,
        };
        let config = bincode::config::standard().with_fixed_int_encoding();
        let payload = bincode::serde::encode_to_vec(&seed, config).map_err(|err| {
            ProverError::StageFailed {
                stage: "complete",
                context: format!("payload encoding failed: {err}"),
            }
        })?;

        let payload_size = match outcome.mode {
            ProofMode::Real => outcome.proof_size,
            ProofMode::Fallback => payload.len() as u64,
        };

        let details = match outcome.simulated {
            None => ProofDetails::Real {
                toolchain_version: self.capability.toolchain_version(),
                verify_time_ms: outcome.verify_time_ms,
                public_outputs,
            },
            Some(simulated) => ProofDetails::Fallback {
                cycles: simulated.cycles,
                constraints: simulated.constraints,
                trace_rows: simulated.trace_rows,
                public_outputs,
            },
        };

        Ok(ProofRecord {
            id: proof_id,
            created_at_ms,
            snapshot: snapshot.clone(),
            circuit_input,
            payload,
            verified: outcome.verified,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
            payload_size,
            mode: outcome.mode,
            content_hash,
            prev_hash,
            details,
        })
    }
}

/// Milliseconds since the Unix epoch.
fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
