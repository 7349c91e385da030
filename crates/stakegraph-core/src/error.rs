use std::fmt;

use crate::session::TransactionState;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    InvalidConnection,
    StakeholderNotFound,
    CreateFailed,
    UpdateFailed,
    DeleteFailed,
    RelationNotFound,
    InvalidColumn,
    TransactionFailed,
    RollbackFailed,
    InvalidTransition,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InvalidConnection => "E1003",
            Self::StakeholderNotFound => "E2001",
            Self::CreateFailed => "E2002",
            Self::UpdateFailed => "E2003",
            Self::DeleteFailed => "E2004",
            Self::RelationNotFound => "E2005",
            Self::InvalidColumn => "E2006",
            Self::TransactionFailed => "E5001",
            Self::RollbackFailed => "E5002",
            Self::InvalidTransition => "E9002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidConnection => "Invalid database connection url",
            Self::StakeholderNotFound => "Stakeholder not found",
            Self::CreateFailed => "Stakeholder create returned no row",
            Self::UpdateFailed => "Stakeholder update matched no row",
            Self::DeleteFailed => "Stakeholder delete matched no row",
            Self::RelationNotFound => "Relation not found",
            Self::InvalidColumn => "Unknown stakeholder column",
            Self::TransactionFailed => "Transaction failed and was rolled back",
            Self::RollbackFailed => "Transaction rollback failed",
            Self::InvalidTransition => "Invalid transaction state transition",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `sg init` to create the store."),
            Self::ConfigParseError => Some("Fix syntax in .stakegraph/config.toml and retry."),
            Self::InvalidConnection => {
                Some("Use `sqlite:<path>` or `sqlite::memory:` for DATABASE_URL.")
            }
            Self::StakeholderNotFound | Self::UpdateFailed | Self::DeleteFailed => {
                Some("Check the stakeholder id with `sg filter` or `sg roots`.")
            }
            Self::CreateFailed => Some("Check for an id collision with an existing stakeholder."),
            Self::RelationNotFound => Some("List edges with `sg related <id>`."),
            Self::InvalidColumn => Some(
                "Use one of: id, org_name, first_name, last_name, email, phone, website, map, owner_id.",
            ),
            Self::TransactionFailed => {
                Some("No changes were kept. Fix the reported constraint and retry.")
            }
            Self::RollbackFailed => Some("Reopen the store; the connection may be unusable."),
            Self::InvalidTransition | Self::InternalUnexpected => {
                Some("Retry once. If persistent, report a bug with logs.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by transactional writes.
///
/// Store errors raised while a transaction is open are reported as
/// [`WriteError::TransactionFailed`] after the rollback ran. The rollback
/// itself failing is the only case where the original error is wrapped.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The insert statement returned no row.
    #[error("create returned no stakeholder row")]
    CreateFailed,

    /// No stakeholder matched the update.
    #[error("update matched no stakeholder with id '{id}'")]
    UpdateFailed { id: String },

    /// No stakeholder matched the delete.
    #[error("delete matched no stakeholder with id '{id}'")]
    DeleteFailed { id: String },

    /// No edge matched an edge-only delete.
    #[error("no relation from '{parent_id}' to '{child_id}'")]
    RelationNotFound { parent_id: String, child_id: String },

    /// A statement failed inside an open transaction.
    #[error("transaction failed during {operation}: {source}")]
    TransactionFailed {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Rolling back after `original` failed as well.
    #[error("rollback failed ({source}) after: {original}")]
    RollbackFailed {
        original: Box<WriteError>,
        #[source]
        source: Box<WriteError>,
    },

    /// Commit or rollback requested outside the `Active` state, or begin
    /// requested twice.
    #[error("cannot {action} a transaction that is {state}")]
    InvalidTransition {
        state: TransactionState,
        action: &'static str,
    },

    /// The write committed but reading the refreshed listing failed.
    #[error("refresh after commit failed: {0}")]
    Refresh(#[source] anyhow::Error),
}

impl WriteError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::CreateFailed => ErrorCode::CreateFailed,
            Self::UpdateFailed { .. } => ErrorCode::UpdateFailed,
            Self::DeleteFailed { .. } => ErrorCode::DeleteFailed,
            Self::RelationNotFound { .. } => ErrorCode::RelationNotFound,
            Self::TransactionFailed { .. } => ErrorCode::TransactionFailed,
            Self::RollbackFailed { .. } => ErrorCode::RollbackFailed,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::Refresh(_) => ErrorCode::InternalUnexpected,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    pub(crate) fn store(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::TransactionFailed { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, WriteError};
    use crate::session::TransactionState;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotInitialized,
            ErrorCode::ConfigParseError,
            ErrorCode::InvalidConnection,
            ErrorCode::StakeholderNotFound,
            ErrorCode::CreateFailed,
            ErrorCode::UpdateFailed,
            ErrorCode::DeleteFailed,
            ErrorCode::RelationNotFound,
            ErrorCode::InvalidColumn,
            ErrorCode::TransactionFailed,
            ErrorCode::RollbackFailed,
            ErrorCode::InvalidTransition,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::DeleteFailed.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn rollback_failure_reports_both_errors() {
        let err = WriteError::RollbackFailed {
            original: Box::new(WriteError::DeleteFailed {
                id: "acme".to_string(),
            }),
            source: Box::new(WriteError::InvalidTransition {
                state: TransactionState::Committed,
                action: "roll back",
            }),
        };

        let text = err.to_string();
        assert!(text.contains("delete matched no stakeholder with id 'acme'"));
        assert!(text.contains("cannot roll back a transaction that is committed"));
        assert_eq!(err.code(), ErrorCode::RollbackFailed);
    }

    #[test]
    fn write_errors_map_to_codes() {
        assert_eq!(WriteError::CreateFailed.code(), ErrorCode::CreateFailed);
        assert_eq!(
            WriteError::UpdateFailed {
                id: "x".to_string()
            }
            .code(),
            ErrorCode::UpdateFailed
        );
        assert!(WriteError::CreateFailed.hint().is_some());
    }
}
