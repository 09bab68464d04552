use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryErrorKind {
    RegistrationInvalid,
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryError {
    pub kind: RegistryErrorKind,
    pub message: String,
}

impl RegistryError {
    pub fn new(kind: RegistryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RegistryError {}

pub fn registration_invalid(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::RegistrationInvalid, message)
}

pub fn capability_conflict(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::Conflict, message)
}
