//! Progress events and the channel-backed sink they are published through.
//!
//! The pipeline publishes [`ProgressEvent`] values onto a channel; the
//! transport layer (or any other observer) holds the receiving end and fans
//! events out however it likes. This keeps the core decoupled from delivery
//! mechanics — no callback is ever invoked from inside process-output handlers.
//!
//! Events are ephemeral: they are never persisted, and sending to a receiver
//! that has been dropped is silently ignored so an observer can unsubscribe
//! mid-request without failing the proof.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{ProofId, ProofMode};

/// Stage name used for the terminal event of a failed pipeline run.
pub const ERROR_STAGE: &str = "error";

/// A progress notification for one in-flight proof request.
///
/// For a single request, events arrive in strict stage order with
/// monotonically non-decreasing `progress`, ending in exactly one terminal
/// stage (`"complete"` on success, [`ERROR_STAGE`] on failure) per pipeline
/// run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Identifier of the proof request this event belongs to.
    pub proof_id: ProofId,
    /// Stage name from the fixed per-mode vocabulary.
    pub stage: String,
    /// Human-readable progress message.
    pub message: String,
    /// Completion fraction in `[0, 100]`.
    pub progress: f64,
    /// Which pipeline produced this event.
    pub mode: ProofMode,
}

impl ProgressEvent {
    /// Whether this event terminates its pipeline run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.stage == "complete" || self.stage == ERROR_STAGE
    }
}

/// Sending half of the progress-event channel, handed to
/// [`GambitProver::generate`].
///
/// Cheap to clone. Dropping every receiver does not fail proof generation;
/// events are simply discarded.
///
/// [`GambitProver::generate`]: crate::orchestrator::GambitProver::generate
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSink {
    /// Creates a sink plus the receiver an observer reads events from.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Creates a sink whose events are discarded. Useful when the caller does
    /// not care about progress.
    #[must_use]
    pub fn discard() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    /// Publishes one event. Send failures (receiver dropped) are ignored.
    pub fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(stage: &str, progress: f64) -> ProgressEvent {
        ProgressEvent {
            proof_id: ProofId::new(1),
            stage: stage.to_owned(),
            message: String::new(),
            progress,
            mode: ProofMode::Fallback,
        }
    }

    #[test]
    fn terminal_detection() {
        assert!(event("complete", 100.0).is_terminal());
        assert!(event("error", 50.0).is_terminal());
        assert!(!event("initializing", 0.0).is_terminal());
    }

    #[test]
    fn channel_delivers_in_order() {
        let (sink, mut rx) = ProgressSink::channel();
        sink.emit(event("initializing", 12.5));
        sink.emit(event("complete", 100.0));

        assert_eq!(rx.try_recv().unwrap().stage, "initializing");
        assert_eq!(rx.try_recv().unwrap().stage, "complete");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn emit_after_receiver_dropped_does_not_panic() {
        let (sink, rx) = ProgressSink::channel();
        drop(rx);
        sink.emit(event("initializing", 0.0));
    }

    #[test]
    fn discard_sink_swallows_events() {
        let sink = ProgressSink::discard();
        sink.emit(event("preparing_input", 25.0));
    }

    #[test]
    fn event_serializes_with_mode_tag() {
        let json = serde_json::to_value(event("creating_proof", 66.6)).unwrap();
        assert_eq!(json["mode"], "fallback");
        assert_eq!(json["stage"], "creating_proof");
    }
}
