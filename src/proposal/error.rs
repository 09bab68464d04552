use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalErrorKind {
    InvalidSignal,
    Generation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalError {
    pub kind: ProposalErrorKind,
    pub message: String,
}

impl ProposalError {
    pub fn new(kind: ProposalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProposalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProposalError {}

pub fn invalid_signal(message: impl Into<String>) -> ProposalError {
    ProposalError::new(ProposalErrorKind::InvalidSignal, message)
}

pub fn generation_failed(message: impl Into<String>) -> ProposalError {
    ProposalError::new(ProposalErrorKind::Generation, message)
}
