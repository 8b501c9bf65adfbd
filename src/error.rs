use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, NetErr>;

/// The broad family an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrKind {
    /// The transforms were configured or deserialized with inconsistent shapes or values.
    Configuration,
    /// A transform broke the forward/backward handoff contract.
    ProtocolViolation,
    /// An operation was invoked in a mode where it is not valid.
    InvalidState,
}

/// The crate's error type.
#[derive(Debug)]
pub enum NetErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    ChildCountMismatch {
        got: usize,
        expected: usize,
    },
    InvalidConfig {
        what: &'static str,
        reason: String,
    },
    Serialization(serde_json::Error),
    ProtocolViolation {
        what: &'static str,
    },
    BackwardIncomplete,
    InvalidState {
        what: &'static str,
    },
}

impl NetErr {
    /// Returns the family this error belongs to.
    pub fn kind(&self) -> ErrKind {
        match self {
            NetErr::SizeMismatch { .. }
            | NetErr::ChildCountMismatch { .. }
            | NetErr::InvalidConfig { .. }
            | NetErr::Serialization(_) => ErrKind::Configuration,
            NetErr::ProtocolViolation { .. } | NetErr::BackwardIncomplete => {
                ErrKind::ProtocolViolation
            }
            NetErr::InvalidState { .. } => ErrKind::InvalidState,
        }
    }

    pub(crate) fn invalid_config(what: &'static str, reason: impl Into<String>) -> Self {
        NetErr::InvalidConfig {
            what,
            reason: reason.into(),
        }
    }
}

impl Display for NetErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "size mismatch in {what}: got {got}, expected {expected}"),
            NetErr::ChildCountMismatch { got, expected } => write!(
                f,
                "serialized state holds {got} children but {expected} are configured"
            ),
            NetErr::InvalidConfig { what, reason } => write!(f, "invalid {what}: {reason}"),
            NetErr::Serialization(e) => write!(f, "malformed serialized state: {e}"),
            NetErr::ProtocolViolation { what } => write!(f, "protocol violation: {what}"),
            NetErr::BackwardIncomplete => write!(f, "backward pass did not complete"),
            NetErr::InvalidState { what } => write!(f, "invalid state: {what}"),
        }
    }
}

impl Error for NetErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NetErr::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for NetErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}
