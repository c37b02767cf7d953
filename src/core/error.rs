use super::types::{CatalogKind, EntityKind};
use thiserror::Error;

/// Every way a decode, resolve, merge or commit can fail.
///
/// All variants are fail-fast: the first one raised aborts the whole
/// operation and nothing is persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("{0} '{1}' not found")]
    ReferenceNotFound(CatalogKind, String),

    #[error("Unknown code '{1}' for field '{0}'")]
    UnknownEnumCode(String, String),

    #[error("Unknown sequence element type '{0}'")]
    UnknownVariantTag(String),

    #[error("Version mismatch on {0} #{1}")]
    ConflictVersionMismatch(EntityKind, u64),

    #[error("Unexpected persistence failure: {0}")]
    UnexpectedPersistenceFailure(String),

    #[error("Invalid payload at '{0}': {1}")]
    InvalidPayload(String, String),

    #[error("{0} '{1}' not found")]
    NotFound(EntityKind, String),

    #[error("{0} #{1} is not a member of the persisted collection")]
    UnknownMember(EntityKind, u64),

    #[error("Sequence for game {0} and turn {1} already exists")]
    DuplicateSequence(u64, u32),
}

/// Coarse grouping of [`SyncError`] for callers that only need to pick a
/// client-side reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    BadValue,
    Conflict,
    Unexpected,
}

impl SyncError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload(field.into(), reason.into())
    }

    pub fn unknown_code(field: impl Into<String>, code: impl Into<String>) -> Self {
        Self::UnknownEnumCode(field.into(), code.into())
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self::UnexpectedPersistenceFailure(detail.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ReferenceNotFound(..) | Self::NotFound(..) => ErrorCategory::NotFound,
            Self::UnknownEnumCode(..)
            | Self::UnknownVariantTag(_)
            | Self::InvalidPayload(..)
            | Self::UnknownMember(..) => ErrorCategory::BadValue,
            Self::ConflictVersionMismatch(..) | Self::DuplicateSequence(..) => {
                ErrorCategory::Conflict
            }
            Self::UnexpectedPersistenceFailure(_) => ErrorCategory::Unexpected,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.category() == ErrorCategory::Conflict
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload("$".to_string(), err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::UnexpectedPersistenceFailure(err.to_string())
    }
}
