use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionErrorKind {
    InvalidRequest,
    Transport,
    Contract,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionError {
    pub kind: ReductionErrorKind,
    pub message: String,
}

impl ReductionError {
    pub fn new(kind: ReductionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ReductionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ReductionError {}

pub fn transport_failure(message: impl Into<String>) -> ReductionError {
    ReductionError::new(ReductionErrorKind::Transport, message)
}

pub fn contract_failure(message: impl Into<String>) -> ReductionError {
    ReductionError::new(ReductionErrorKind::Contract, message)
}
