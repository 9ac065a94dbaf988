//! Prover profiles: the single configurable strategy that replaces per-variant
//! prover implementations.
//!
//! A [`ProverProfile`] bundles everything that distinguishes one prover setup
//! from another: the stage vocabularies for both modes, the toolchain commands
//! and their time bounds, the environment-variable schema the guest program
//! reads, and the documented ranges synthetic metrics are drawn from. One
//! profile value per variant — not one implementation per variant.

use std::ops::Range;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::invoker::InvokeSpec;
use crate::snapshot::CircuitInput;
use crate::ProofMode;

/// Environment variable carrying the origin square index (`0..64`).
pub const ENV_FROM_SQUARE: &str = "FROM_SQUARE";
/// Environment variable carrying the destination square index (`0..64`).
pub const ENV_TO_SQUARE: &str = "TO_SQUARE";
/// Environment variable carrying the one-based move counter.
pub const ENV_MOVE_NUMBER: &str = "MOVE_NUMBER";

/// Default timeout for the toolchain version probe.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for building the prover program. Toolchain builds can
/// compile a full zkVM target, so this is generous.
const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(600);
/// Default timeout for a single proving run.
const DEFAULT_PROVE_TIMEOUT: Duration = Duration::from_secs(300);
/// Default bounds for the artificial per-stage delay, in milliseconds.
/// Stands in for real work in stages that have none.
const DEFAULT_STAGE_DELAY_MS: Range<u64> = 60..220;

/// One named unit of pipeline work with its progress message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// Stage name, part of the public event vocabulary.
    pub name: &'static str,
    /// Human-readable message emitted with the stage's progress event.
    pub message: &'static str,
}

/// Real-mode stage vocabulary, in execution order.
pub const REAL_STAGES: &[StageSpec] = &[
    StageSpec {
        name: "initializing",
        message: "Initializing prover",
    },
    StageSpec {
        name: "preparing_input",
        message: "Encoding move data for the guest program",
    },
    StageSpec {
        name: "compiling_program",
        message: "Compiling guest program",
    },
    StageSpec {
        name: "setup_keys",
        message: "Setting up proving keys",
    },
    StageSpec {
        name: "generating_execution_trace",
        message: "Generating execution trace",
    },
    StageSpec {
        name: "creating_stark_proof",
        message: "Creating STARK proof",
    },
    StageSpec {
        name: "verifying_proof",
        message: "Verifying proof",
    },
    StageSpec {
        name: "complete",
        message: "Proof complete",
    },
];

/// Fallback-mode stage vocabulary, in execution order.
pub const FALLBACK_STAGES: &[StageSpec] = &[
    StageSpec {
        name: "initializing",
        message: "Initializing simulated prover",
    },
    StageSpec {
        name: "preparing_input",
        message: "Encoding move data",
    },
    StageSpec {
        name: "simulating_execution",
        message: "Simulating program execution",
    },
    StageSpec {
        name: "creating_proof",
        message: "Creating simulated proof",
    },
    StageSpec {
        name: "verifying",
        message: "Verifying simulated proof",
    },
    StageSpec {
        name: "complete",
        message: "Proof complete",
    },
];

/// Fixed ranges synthetic metric values are drawn from.
///
/// These fill the numeric fields a real proving backend would produce but the
/// simulation does not. All ranges are half-open `[start, end)`. They are
/// visible configuration so the reporting shape is reproducible even though
/// individual values are not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticRanges {
    /// Proof payload size in bytes. Default `262_144..1_048_576`
    /// (256 KiB to 1 MiB, the size band of a compressed STARK proof).
    pub proof_size_bytes: Range<u32>,
    /// Proof generation time in milliseconds. Default `1_500..4_500`.
    pub proof_time_ms: Range<u32>,
    /// Proof verification time in milliseconds. Default `40..160`.
    pub verify_time_ms: Range<u32>,
    /// zkVM cycle count. Default `20_000..80_000`.
    pub cycles: Range<u64>,
    /// Constraint count. Default `100_000..400_000`.
    pub constraints: Range<u64>,
    /// Execution trace rows. Default `16_384..65_536`.
    pub trace_rows: Range<u64>,
}

impl Default for SyntheticRanges {
    fn default() -> Self {
        Self {
            proof_size_bytes: 262_144..1_048_576,
            proof_time_ms: 1_500..4_500,
            verify_time_ms: 40..160,
            cycles: 20_000..80_000,
            constraints: 100_000..400_000,
            trace_rows: 16_384..65_536,
        }
    }
}

/// Configuration for one prover variant.
///
/// The five near-duplicate prover implementations of the original demo differ
/// only in toolchain version strings and minor stage-message text; they
/// collapse into values of this struct.
#[derive(Debug, Clone)]
pub struct ProverProfile {
    /// Short profile name, used in logs and the status report.
    pub name: String,
    /// Proof type label reported when real proving is active.
    pub real_proof_type: String,
    /// Proof type label reported when the fallback is active.
    pub fallback_proof_type: String,
    /// Version string reported for the toolchain (refined by the probe).
    pub toolchain_version: String,
    /// Toolchain executable invoked for probe and build.
    pub toolchain: String,
    /// Arguments for the availability probe (exit 0 means available).
    pub probe_args: Vec<String>,
    /// Arguments for building the prover program.
    pub build_args: Vec<String>,
    /// Command for a proving run, executed in the host-script directory.
    pub run_command: String,
    /// Arguments for a proving run.
    pub run_args: Vec<String>,
    /// Root directory where guest program and host script are materialized.
    pub program_root: PathBuf,
    /// Time bound for the availability probe.
    pub probe_timeout: Duration,
    /// Time bound for the program build.
    pub build_timeout: Duration,
    /// Time bound for one proving run.
    pub prove_timeout: Duration,
    /// Bounds for artificial stage delays, in milliseconds.
    pub stage_delay_ms: Range<u64>,
    /// Substrings matched against streamed toolchain output to surface the
    /// external process's own log lines as supplementary progress messages.
    pub progress_markers: &'static [&'static str],
    /// Ranges for synthetic metric fields.
    pub synthetic: SyntheticRanges,
}

impl ProverProfile {
    /// The SP1 profile: `cargo prove` toolchain, cargo-run host script.
    #[must_use]
    pub fn sp1(program_root: impl Into<PathBuf>) -> Self {
        Self {
            name: "sp1".to_owned(),
            real_proof_type: "sp1-stark".to_owned(),
            fallback_proof_type: "simulated-stark".to_owned(),
            toolchain_version: "sp1 4.x".to_owned(),
            toolchain: "cargo".to_owned(),
            probe_args: vec!["prove".to_owned(), "--version".to_owned()],
            build_args: vec!["prove".to_owned(), "build".to_owned()],
            run_command: "cargo".to_owned(),
            run_args: vec!["run".to_owned(), "--release".to_owned()],
            program_root: program_root.into(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            build_timeout: DEFAULT_BUILD_TIMEOUT,
            prove_timeout: DEFAULT_PROVE_TIMEOUT,
            stage_delay_ms: DEFAULT_STAGE_DELAY_MS,
            progress_markers: &["Setting up", "Generating", "Verifying"],
            synthetic: SyntheticRanges::default(),
        }
    }

    /// The stage vocabulary for the given mode.
    #[must_use]
    pub const fn stages(&self, mode: ProofMode) -> &'static [StageSpec] {
        match mode {
            ProofMode::Real => REAL_STAGES,
            ProofMode::Fallback => FALLBACK_STAGES,
        }
    }

    /// Directory the guest program is materialized into.
    #[must_use]
    pub fn guest_dir(&self) -> PathBuf {
        self.program_root.join("program")
    }

    /// Directory the host script is materialized into. Proving runs execute
    /// here.
    #[must_use]
    pub fn script_dir(&self) -> PathBuf {
        self.program_root.join("script")
    }

    /// The environment-variable schema for a proving run.
    #[must_use]
    pub fn move_env(&self, input: &CircuitInput) -> Vec<(String, String)> {
        vec![
            (ENV_FROM_SQUARE.to_owned(), input.from_square.to_string()),
            (ENV_TO_SQUARE.to_owned(), input.to_square.to_string()),
            (ENV_MOVE_NUMBER.to_owned(), input.move_number.to_string()),
        ]
    }

    /// Invocation spec for the availability probe.
    #[must_use]
    pub fn probe_spec(&self) -> InvokeSpec {
        InvokeSpec {
            command: self.toolchain.clone(),
            args: self.probe_args.clone(),
            cwd: None,
            env: Vec::new(),
            timeout: self.probe_timeout,
        }
    }

    /// Invocation spec for building the prover program.
    #[must_use]
    pub fn build_spec(&self) -> InvokeSpec {
        InvokeSpec {
            command: self.toolchain.clone(),
            args: self.build_args.clone(),
            cwd: Some(self.guest_dir()),
            env: Vec::new(),
            timeout: self.build_timeout,
        }
    }

    /// Invocation spec for one proving run with the given move data.
    #[must_use]
    pub fn prove_spec(&self, input: &CircuitInput) -> InvokeSpec {
        InvokeSpec {
            command: self.run_command.clone(),
            args: self.run_args.clone(),
            cwd: Some(self.script_dir()),
            env: self.move_env(input),
            timeout: self.prove_timeout,
        }
    }
}

/// Shared helper for working with stage vocabularies.
#[must_use]
pub fn stage_names(stages: &[StageSpec]) -> Vec<&'static str> {
    stages.iter().map(|s| s.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn vocabularies_end_in_complete() {
        assert_eq!(REAL_STAGES.last().map(|s| s.name), Some("complete"));
        assert_eq!(FALLBACK_STAGES.last().map(|s| s.name), Some("complete"));
    }

    #[test]
    fn real_vocabulary_order() {
        assert_eq!(
            stage_names(REAL_STAGES),
            vec![
                "initializing",
                "preparing_input",
                "compiling_program",
                "setup_keys",
                "generating_execution_trace",
                "creating_stark_proof",
                "verifying_proof",
                "complete",
            ]
        );
    }

    #[test]
    fn fallback_vocabulary_order() {
        assert_eq!(
            stage_names(FALLBACK_STAGES),
            vec![
                "initializing",
                "preparing_input",
                "simulating_execution",
                "creating_proof",
                "verifying",
                "complete",
            ]
        );
    }

    #[test]
    fn move_env_schema() {
        let profile = ProverProfile::sp1("/tmp/prover");
        let input = CircuitInput {
            from_square: 12,
            to_square: 28,
            move_number: 7,
        };
        let env = profile.move_env(&input);
        assert!(env.contains(&("FROM_SQUARE".to_owned(), "12".to_owned())));
        assert!(env.contains(&("TO_SQUARE".to_owned(), "28".to_owned())));
        assert!(env.contains(&("MOVE_NUMBER".to_owned(), "7".to_owned())));
    }

    #[test]
    fn prove_spec_runs_in_script_dir() {
        let profile = ProverProfile::sp1("/tmp/prover");
        let input = CircuitInput {
            from_square: 0,
            to_square: 8,
            move_number: 1,
        };
        let spec = profile.prove_spec(&input);
        assert_eq!(spec.cwd.as_deref(), Some(Path::new("/tmp/prover/script")));
        assert_eq!(spec.timeout, DEFAULT_PROVE_TIMEOUT);
    }

    #[test]
    fn synthetic_ranges_are_nonempty() {
        let ranges = SyntheticRanges::default();
        assert!(!ranges.proof_size_bytes.is_empty());
        assert!(!ranges.proof_time_ms.is_empty());
        assert!(!ranges.verify_time_ms.is_empty());
        assert!(!ranges.cycles.is_empty());
        assert!(!ranges.constraints.is_empty());
        assert!(!ranges.trace_rows.is_empty());
    }
}
