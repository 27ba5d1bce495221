/// Errors returned by group operations.
///
/// Every variant except `Storage` is an expected workflow outcome
/// (double application, full group, stale owner view...) and is meant
/// to be mapped to a user message by the caller.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("invalid input: {reason}")]
    Validation { reason: String },

    #[error("group is full ({capacity} members)")]
    CapacityExceeded { capacity: u8 },

    #[error("join request already pending")]
    DuplicateApplication,

    #[error("already a member of this group")]
    DuplicateMembership,

    #[error("permission denied: {reason}")]
    Permission { reason: String },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("storage error: {0}")]
    Storage(#[from] crate::store::StoreError),
}

impl GroupError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn permission(reason: impl Into<String>) -> Self {
        Self::Permission {
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Whether this is a normal workflow outcome rather than an
    /// infrastructure failure.
    pub fn is_workflow(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}
