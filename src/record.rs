//! Completed proof records.
//!
//! A [`ProofRecord`] is the immutable artifact of one successful generation
//! request: the snapshot it proved, the opaque payload, timing and size
//! metrics, and mode-specific details. Records are content-hashed and chained
//! to their predecessor so the history forms a verifiable sequence.

use serde::{Deserialize, Serialize};

use crate::snapshot::{CircuitInput, GameSnapshot};
use crate::{ProofId, ProofMode};

/// Values the guest program commits publicly alongside the proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicOutputs {
    /// Whether the guest judged the move structurally valid.
    pub is_valid: bool,
    /// Origin square index.
    pub from_square: u8,
    /// Destination square index.
    pub to_square: u8,
    /// One-based move counter.
    pub move_number: u32,
    /// Binding checksum: `from_square + to_square + move_number`.
    pub checksum: u32,
}

impl PublicOutputs {
    /// Derives the public outputs the guest program would commit for `input`.
    #[must_use]
    pub fn for_input(input: &CircuitInput) -> Self {
        Self {
            is_valid: input.is_valid_move(),
            from_square: input.from_square,
            to_square: input.to_square,
            move_number: input.move_number,
            checksum: input.checksum(),
        }
    }
}

/// Mode-specific metrics attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProofDetails {
    /// Metrics from a real toolchain run.
    Real {
        /// Version string the toolchain probe reported.
        toolchain_version: String,
        /// Verification time in milliseconds, when the toolchain reported it.
        verify_time_ms: Option<u64>,
        /// Public outputs committed by the guest program.
        public_outputs: PublicOutputs,
    },
    /// Metrics synthesized by the fallback simulation.
    Fallback {
        /// Simulated zkVM cycle count.
        cycles: u64,
        /// Simulated constraint count.
        constraints: u64,
        /// Simulated execution trace rows.
        trace_rows: u64,
        /// Public outputs the guest program would have committed.
        public_outputs: PublicOutputs,
    },
}

impl ProofDetails {
    /// The public outputs, regardless of mode.
    #[must_use]
    pub fn public_outputs(&self) -> &PublicOutputs {
        match self {
            ProofDetails::Real { public_outputs, .. }
            | ProofDetails::Fallback { public_outputs, .. } => public_outputs,
        }
    }
}

/// One completed proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofRecord {
    /// Identifier assigned at request time, unique within the process.
    pub id: ProofId,
    /// Completion time, milliseconds since the Unix epoch.
    pub created_at_ms: u64,
    /// The game snapshot this proof covers.
    pub snapshot: GameSnapshot,
    /// The reduced input handed to the circuit.
    pub circuit_input: CircuitInput,
    /// Opaque proof payload bytes.
    pub payload: Vec<u8>,
    /// Whether verification reported success.
    pub verified: bool,
    /// End-to-end generation time in milliseconds.
    pub elapsed_ms: u64,
    /// Reported payload size in bytes. For real proofs this is the size the
    /// toolchain reported, which can exceed `payload.len()`.
    pub payload_size: u64,
    /// Pipeline that produced this record.
    pub mode: ProofMode,
    /// Content hash over the record's identifying fields.
    pub content_hash: u64,
    /// Chain link to the previous record: a hash of its content hash, `None`
    /// for the first record in the history.
    pub prev_hash: Option<u64>,
    /// Mode-specific metrics.
    pub details: ProofDetails,
}
