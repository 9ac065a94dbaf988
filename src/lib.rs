#![deny(missing_docs)]
//! Zero-knowledge move-proof orchestration for a chess demo.
//!
//! This crate wraps an external STARK proving toolchain behind one façade,
//! [`GambitProver`]. Each proof request takes a [`GameSnapshot`] of the
//! position after a move and produces a [`ProofRecord`] attesting that the
//! move satisfies the guest program's structural validity predicate.
//!
//! The toolchain is optional at runtime. On the first request the prover
//! probes for it, materializes and builds the guest program, and decides
//! between two modes:
//!
//! - **real**: the external prover runs in a subprocess and its marker output
//!   is parsed into proof metrics;
//! - **fallback**: a staged simulation produces a structurally identical
//!   record with synthetic metrics, so the rest of the application works
//!   unchanged on machines without the toolchain.
//!
//! The decision is made once per process. A real run that fails at runtime is
//! retried on the fallback within the same request and real proving is
//! permanently demoted. Progress is published as [`ProgressEvent`] values on
//! a channel; completed proofs accumulate in a [`ProofHistoryStore`].
//!
//! # Example
//!
//! ```no_run
//! use gambit_prover::{
//!     GambitProver, GameSnapshot, GameStatus, MoveDescriptor, ProgressSink, ProverProfile, Side,
//!     Square,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let prover = GambitProver::new(ProverProfile::sp1("/tmp/gambit-prover"));
//! let (sink, mut progress) = ProgressSink::channel();
//!
//! let snapshot = GameSnapshot {
//!     fen: "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".to_owned(),
//!     last_move: MoveDescriptor {
//!         from: Square::from_algebraic("e2").unwrap(),
//!         to: Square::from_algebraic("e4").unwrap(),
//!         captured: None,
//!     },
//!     move_number: 1,
//!     side_to_move: Side::Black,
//!     status: GameStatus::Active,
//! };
//!
//! let record = prover.generate(&snapshot, &sink).await?;
//! while let Ok(event) = progress.try_recv() {
//!     println!("{}: {:.0}%", event.stage, event.progress);
//! }
//! println!("proof {} verified={}", record.id, record.verified);
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod error;
pub mod events;
pub mod hash;
pub mod history;
pub mod invoker;
pub mod materialize;
pub mod orchestrator;
pub mod parser;
pub mod pipeline;
pub mod profile;
pub mod record;
pub mod rng;
pub mod snapshot;

use serde::{Deserialize, Serialize};

pub use capability::{CapabilityManager, CapabilityState};
pub use error::ProverError;
pub use events::{ProgressEvent, ProgressSink};
pub use history::{HistoryStats, ProofHistoryStore};
pub use orchestrator::{GambitProver, ProverStatus};
pub use profile::{ProverProfile, SyntheticRanges};
pub use record::{ProofDetails, ProofRecord, PublicOutputs};
pub use snapshot::{CircuitInput, GameSnapshot, GameStatus, MoveDescriptor, Side, Square};

/// Process-unique identifier of one proof request.
///
/// Assigned sequentially starting at 1; never reused within a process.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProofId(u64);

impl ProofId {
    /// Creates an id from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ProofId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which pipeline produced a proof.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofMode {
    /// The external proving toolchain.
    Real,
    /// The built-in simulation.
    Fallback,
}

impl ProofMode {
    /// The lowercase tag used in events, logs, and serialized records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ProofMode::Real => "real",
            ProofMode::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for ProofMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
