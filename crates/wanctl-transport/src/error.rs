use thiserror::Error;

/// Transport-layer errors, classified by handling discipline rather than by
/// transport kind: callers retry `Retryable` once within the
/// same tick, stop actuating (but keep observing) on `Terminal`, and treat
/// `Cancelled` as "the scheduler deadline expired, try again next tick".
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network blip, 5xx, timeout — safe to retry within the same tick.
    #[error("transient transport error: {0}")]
    Retryable(String),

    /// Auth failure, 4xx, host-key mismatch — do not retry; stop actuating
    /// this WAN until the operator intervenes.
    #[error("terminal transport error: {0}")]
    Terminal(String),

    /// The operation did not complete within the cycle-interval deadline.
    #[error("transport operation cancelled (deadline exceeded)")]
    Cancelled,

    /// The router rejected a value as out of its accepted range.
    #[error("router rejected value for {resource}: {message}")]
    RejectedValue { resource: String, message: String },
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Retryable(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransportError::Terminal(_))
    }
}
