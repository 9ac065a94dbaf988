//! Capability detection: decide once whether the real prover toolchain is
//! usable, and fall back gracefully when it is not.
//!
//! The first proof request drives a three-step initialization: probe the
//! toolchain, materialize the prover program sources, build the program.
//! Concurrent callers during that window all await the same outcome rather
//! than racing their own probes. Every failure along the way is absorbed into
//! fallback mode; initialization itself never surfaces an error to callers.
//!
//! Demotion is one-way. Once a real proving run has failed at runtime the
//! manager is switched to fallback for the rest of its life and no further
//! toolchain invocations are attempted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::OnceCell;

use crate::invoker::ProcessInvoker;
use crate::materialize;
use crate::profile::ProverProfile;
use crate::ProofMode;

/// Lifecycle of the capability decision.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CapabilityState {
    /// No proof has been requested yet; nothing has been probed.
    Uninitialized,
    /// The first request is currently probing and building.
    Initializing,
    /// The toolchain probe and program build succeeded.
    ReadyReal,
    /// The toolchain is unavailable, or real proving was demoted.
    ReadyFallback,
}

/// Decides which proving mode is available and memoizes the answer.
#[derive(Debug)]
pub struct CapabilityManager {
    profile: Arc<ProverProfile>,
    init: OnceCell<ProofMode>,
    initializing: AtomicBool,
    demoted: AtomicBool,
    toolchain_version: RwLock<String>,
}

impl CapabilityManager {
    /// Creates an uninitialized manager for the given profile.
    #[must_use]
    pub fn new(profile: Arc<ProverProfile>) -> Self {
        let toolchain_version = RwLock::new(profile.toolchain_version.clone());
        Self {
            profile,
            init: OnceCell::new(),
            initializing: AtomicBool::new(false),
            demoted: AtomicBool::new(false),
            toolchain_version,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CapabilityState {
        if self.demoted.load(Ordering::Acquire) {
            return CapabilityState::ReadyFallback;
        }
        match self.init.get() {
            Some(ProofMode::Real) => CapabilityState::ReadyReal,
            Some(ProofMode::Fallback) => CapabilityState::ReadyFallback,
            None if self.initializing.load(Ordering::Acquire) => CapabilityState::Initializing,
            None => CapabilityState::Uninitialized,
        }
    }

    /// Whether initialization has completed (in either mode).
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.init.get().is_some()
    }

    /// The toolchain version string: the probed one once initialization has
    /// run, the profile's nominal one before that.
    #[must_use]
    pub fn toolchain_version(&self) -> String {
        self.toolchain_version.read().clone()
    }

    /// Resolves the proving mode, running initialization on the first call.
    ///
    /// Subsequent calls return the memoized decision without touching the
    /// toolchain again. A prior [`demote`](Self::demote) overrides a memoized
    /// real decision.
    pub async fn ensure_ready(&self) -> ProofMode {
        let decided = *self
            .init
            .get_or_init(|| async {
                self.initializing.store(true, Ordering::Release);
                let mode = self.initialize().await;
                self.initializing.store(false, Ordering::Release);
                mode
            })
            .await;

        if self.demoted.load(Ordering::Acquire) {
            ProofMode::Fallback
        } else {
            decided
        }
    }

    /// Permanently demotes the manager to fallback mode.
    ///
    /// Called by the orchestrator after a real proving run fails at runtime.
    /// Idempotent.
    pub fn demote(&self) {
        if !self.demoted.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                profile = %self.profile.name,
                "real proving demoted, all further proofs use the fallback"
            );
        }
    }

    async fn initialize(&self) -> ProofMode {
        tracing::info!(profile = %self.profile.name, "probing prover toolchain");

        let probe = self.profile.probe_spec();
        let probe_output = match ProcessInvoker::run(&probe).await {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(
                    error = %err.into_probe_error(),
                    "toolchain probe failed, using fallback prover"
                );
                return ProofMode::Fallback;
            }
        };
        if let Some(version) = probe_output.stdout.lines().next() {
            let version = version.trim();
            if !version.is_empty() {
                *self.toolchain_version.write() = version.to_owned();
            }
        }

        if let Err(err) = materialize::ensure_sources(&self.profile) {
            tracing::warn!(
                error = %err,
                "could not materialize prover sources, using fallback prover"
            );
            return ProofMode::Fallback;
        }

        tracing::info!(profile = %self.profile.name, "building prover program");
        match ProcessInvoker::run(&self.profile.build_spec()).await {
            Ok(_) => {
                tracing::info!(
                    version = %self.toolchain_version(),
                    "prover toolchain ready, real proving enabled"
                );
                ProofMode::Real
            }
            Err(err) => {
                tracing::warn!(
                    error = %err.into_build_error(),
                    "prover build failed, using fallback prover"
                );
                ProofMode::Fallback
            }
        }
    }
}
