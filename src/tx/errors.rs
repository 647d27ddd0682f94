//! Error types for the transaction pipeline

use thiserror::Error;

/// Failure reasons the submission loop treats as transient. Anything else
/// is terminal for the attempt.
pub const TRANSIENT_FAILURE_PATTERNS: &[&str] =
    &["Timeout", "Blockhash not found", "block height exceeded"];

/// Check a failure reason against the transient allow-list
pub fn is_transient_failure(reason: &str) -> bool {
    TRANSIENT_FAILURE_PATTERNS
        .iter()
        .any(|pattern| reason.contains(pattern))
}

/// Error type for transaction build and submission operations
#[derive(Error, Debug)]
pub enum TxError {
    /// Instruction list could not be compiled into a message
    #[error("Message compile error: {0}")]
    Compile(String),

    /// No available key matches the fee payer slot
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Broadcast rejected by the network (includes preflight failures)
    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    /// Confirmation polling surfaced an error
    #[error("Confirmation failed: {0}")]
    Confirm(String),

    /// Confirmation was not observed within the wall-clock window.
    /// The broadcast already happened; this does not mean the
    /// transaction failed.
    #[error("Timeout waiting for confirmation")]
    ConfirmTimeout,
}

impl TxError {
    /// Whether the submission loop should resubmit after this failure
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConfirmTimeout => true,
            Self::Broadcast(reason) | Self::Confirm(reason) => is_transient_failure(reason),
            Self::Compile(_) | Self::Signing(_) => false,
        }
    }

    /// Error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Compile(_) => "compile",
            Self::Signing(_) => "signing",
            Self::Broadcast(_) => "broadcast",
            Self::Confirm(_) => "confirm",
            Self::ConfirmTimeout => "timeout",
        }
    }
}
