use thiserror::Error;

/// Failure of an external collaborator (dense search, embedding, generation).
///
/// Every adapter maps its own errors into this type so the pipeline can apply
/// one retry policy: only `transient` failures and timeouts are retried.
#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("{service} timed out after {elapsed_ms}ms")]
    Timeout { service: &'static str, elapsed_ms: u64 },

    #[error("{service} call cancelled")]
    Cancelled { service: &'static str },

    #[error("{service} failed: {message}")]
    Failed {
        service: &'static str,
        message: String,
        transient: bool,
    },
}

impl ExternalError {
    pub fn failed(service: &'static str, message: impl Into<String>, transient: bool) -> Self {
        Self::Failed {
            service,
            message: message.into(),
            transient,
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Cancelled { .. } => false,
            Self::Failed { transient, .. } => *transient,
        }
    }

    pub fn service(&self) -> &'static str {
        match self {
            Self::Timeout { service, .. }
            | Self::Cancelled { service }
            | Self::Failed { service, .. } => service,
        }
    }
}
