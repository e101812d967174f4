use thiserror::Error;

/// Shared error type for the keeper core.
///
/// Every variant maps to exactly one bucket of the §7 taxonomy via
/// [`KeeperError::classify`]; callers that need to decide whether to retry,
/// skip, or surface an error should match on [`ErrorClass`], not on this enum.
#[derive(Error, Debug, Clone)]
pub enum KeeperError {
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    #[error("position {0} not found")]
    NotFound(String),

    #[error("inconsistent state: {0}")]
    Inconsistent(String),

    #[error("stream dropped: {0}")]
    StreamDropped(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rpc error (code {code:?}): {message}")]
    Rpc { message: String, code: Option<i64> },

    #[error("simulation failed: {0}")]
    SimulationFailed(String),

    #[error("transaction rejected: {0}")]
    TransactionFatal(String),

    #[error("invalid configuration for '{component}': {reason}")]
    InvalidConfig { component: String, reason: String },

    #[error("invalid parameter '{parameter}': got '{value}', expected '{expected}'")]
    InvalidParameter {
        parameter: String,
        value: String,
        expected: String,
    },

    #[error("unauthorized signer")]
    Unauthorized,

    #[error("generic error: {0}")]
    Generic(String),
}

impl KeeperError {
    pub fn decode_failed(reason: impl Into<String>) -> Self {
        Self::DecodeFailed(reason.into())
    }

    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    pub fn invalid_config(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            component: component.into(),
            reason: reason.into(),
        }
    }

    pub fn rpc(message: impl Into<String>, code: Option<i64>) -> Self {
        Self::Rpc {
            message: message.into(),
            code,
        }
    }

    /// Classify this error per §7: Transient / Benign / Fatal / Inconsistent.
    ///
    /// `logs` are the simulation log lines (if any); benign skips are only
    /// recognized this way because the wire protocol reports them as ordinary
    /// program-error logs, not as a distinct status.
    pub fn classify(&self, logs: &[String]) -> ErrorClass {
        if logs.iter().any(|l| is_benign_log(l)) {
            return ErrorClass::Benign;
        }
        match self {
            KeeperError::Network(_) => ErrorClass::Transient,
            KeeperError::Rpc { .. } => ErrorClass::Transient,
            KeeperError::SimulationFailed(msg) if is_benign_log(msg) => ErrorClass::Benign,
            KeeperError::SimulationFailed(_) => ErrorClass::Transient,
            KeeperError::Inconsistent(_) => ErrorClass::Inconsistent,
            KeeperError::DecodeFailed(_)
            | KeeperError::TransactionFatal(_)
            | KeeperError::InvalidConfig { .. }
            | KeeperError::InvalidParameter { .. }
            | KeeperError::Unauthorized => ErrorClass::Fatal,
            KeeperError::NotFound(_) => ErrorClass::Fatal,
            KeeperError::StreamDropped(_) => ErrorClass::Transient,
            KeeperError::Generic(_) => ErrorClass::Fatal,
        }
    }
}

/// Recoverable program-error substrings named by the wire protocol (§4.E).
/// Any occurrence in a simulation log line marks the attempt a benign skip.
const BENIGN_LOG_MARKERS: &[&str] = &["NothingToSweep", "NoMonkes", "NothingToDeposit"];

pub fn is_benign_log(line: &str) -> bool {
    BENIGN_LOG_MARKERS.iter().any(|m| line.contains(m))
}

/// The §7 error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Benign,
    Fatal,
    Inconsistent,
}

pub type KeeperResult<T> = std::result::Result<T, KeeperError>;
