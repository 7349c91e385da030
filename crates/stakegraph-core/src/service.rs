//! Transactional write coordinator.
//!
//! Each public operation runs in exactly one transaction on the borrowed
//! [`Session`]: entity and edge mutations either commit together or not at
//! all. On failure a rollback is attempted iff the transaction is still
//! active, and the original error is returned unless the rollback itself
//! fails.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::db::mutate;
use crate::db::query::{self, Page, Pagination};
use crate::error::WriteError;
use crate::model::{NewRelation, Relation, Stakeholder, StakeholderDraft, StakeholderFields};
use crate::session::Session;

/// Payload for [`StakeholderService::create_with_relation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    #[serde(flatten)]
    pub stakeholder: StakeholderDraft,
    /// Role stored on the edge to the parent.
    #[serde(default)]
    pub role: String,
    /// Type stored on the edge to the parent.
    #[serde(default, rename = "relation")]
    pub relation_type: String,
}

/// Payload for [`StakeholderService::delete_with_relation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub data: DeleteTarget,
    /// Only edges of this type are removed; all touching edges when unset.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTarget {
    pub id: String,
}

impl DeleteRequest {
    #[must_use]
    pub fn new(id: impl Into<String>, relation_type: Option<String>) -> Self {
        Self {
            data: DeleteTarget { id: id.into() },
            relation_type,
        }
    }
}

/// Pairs stakeholder writes with their edge writes.
#[derive(Debug)]
pub struct StakeholderService<'s> {
    session: &'s Session,
}

impl<'s> StakeholderService<'s> {
    #[must_use]
    pub const fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Insert a stakeholder and, when `parent_id` is given, the edge from the
    /// parent to it.
    ///
    /// Returns `list_by_id(parent_id)` when a parent is given, else the root
    /// listing.
    ///
    /// # Errors
    ///
    /// [`WriteError::CreateFailed`] if the insert returned no row,
    /// [`WriteError::TransactionFailed`] for store errors (including a missing
    /// parent, detected at commit), [`WriteError::Refresh`] if the write
    /// committed but the listing could not be read.
    pub fn create_with_relation(
        &self,
        parent_id: Option<&str>,
        request: &CreateRequest,
    ) -> Result<Page<Stakeholder>, WriteError> {
        let created = self.in_transaction("create", |conn| {
            let created = mutate::insert_stakeholder(conn, &request.stakeholder)
                .map_err(WriteError::store("insert stakeholder"))?
                .ok_or(WriteError::CreateFailed)?;

            if let Some(parent_id) = parent_id {
                let edge = NewRelation::new(parent_id, created.id.clone())
                    .with_role(request.role.clone())
                    .with_type(request.relation_type.clone());
                mutate::insert_relation(conn, &edge)
                    .map_err(WriteError::store("insert relation"))?;
            }
            Ok(created)
        })?;

        info!(id = %created.id, parent = ?parent_id, "created stakeholder");
        self.refresh(parent_id)
    }

    /// Delete `request.data.id` and the edges touching it.
    ///
    /// Returns `list_by_id(id)` when `id` is given, else the root listing.
    ///
    /// # Errors
    ///
    /// [`WriteError::DeleteFailed`] if no stakeholder matched,
    /// [`WriteError::TransactionFailed`] for store errors (including edges of
    /// another type still referencing the row, detected at commit).
    pub fn delete_with_relation(
        &self,
        id: Option<&str>,
        request: &DeleteRequest,
    ) -> Result<Page<Stakeholder>, WriteError> {
        let target = request.data.id.as_str();
        let edges_removed = self.in_transaction("delete", |conn| {
            mutate::delete_stakeholder(conn, target)
                .map_err(WriteError::store("delete stakeholder"))?
                .ok_or_else(|| WriteError::DeleteFailed {
                    id: target.to_string(),
                })?;

            mutate::delete_relations(conn, target, request.relation_type.as_deref())
                .map_err(WriteError::store("delete relations"))
        })?;

        info!(id = target, edges_removed, "deleted stakeholder");
        self.refresh(id)
    }

    /// Overwrite the fields set in `patch` and return the stored row.
    ///
    /// # Errors
    ///
    /// [`WriteError::UpdateFailed`] if no stakeholder matched,
    /// [`WriteError::TransactionFailed`] for store errors.
    pub fn update(&self, id: &str, patch: &StakeholderFields) -> Result<Stakeholder, WriteError> {
        let updated = self.in_transaction("update", |conn| {
            mutate::update_stakeholder(conn, id, patch)
                .map_err(WriteError::store("update stakeholder"))?
                .ok_or_else(|| WriteError::UpdateFailed { id: id.to_string() })
        })?;

        info!(id, "updated stakeholder");
        Ok(updated)
    }

    /// Insert one edge between existing stakeholders.
    ///
    /// # Errors
    ///
    /// [`WriteError::TransactionFailed`] for store errors, including a
    /// missing endpoint detected at commit.
    pub fn link(&self, edge: &NewRelation) -> Result<Relation, WriteError> {
        let relation = self.in_transaction("link", |conn| {
            mutate::insert_relation(conn, edge).map_err(WriteError::store("insert relation"))
        })?;

        info!(parent = %relation.parent_id, child = %relation.child_id, "linked stakeholders");
        Ok(relation)
    }

    /// Remove the edges from `parent_id` to `child_id` (of `relation_type`
    /// when given) and return how many were removed.
    ///
    /// # Errors
    ///
    /// [`WriteError::RelationNotFound`] if no edge matched,
    /// [`WriteError::TransactionFailed`] for store errors.
    pub fn unlink(
        &self,
        parent_id: &str,
        child_id: &str,
        relation_type: Option<&str>,
    ) -> Result<usize, WriteError> {
        let removed = self.in_transaction("unlink", |conn| {
            let removed = mutate::delete_edge(conn, parent_id, child_id, relation_type)
                .map_err(WriteError::store("delete relation"))?;
            if removed == 0 {
                return Err(WriteError::RelationNotFound {
                    parent_id: parent_id.to_string(),
                    child_id: child_id.to_string(),
                });
            }
            Ok(removed)
        })?;

        info!(parent = parent_id, child = child_id, removed, "unlinked stakeholders");
        Ok(removed)
    }

    fn refresh(&self, id: Option<&str>) -> Result<Page<Stakeholder>, WriteError> {
        let conn = self.session.connection();
        match id {
            Some(id) => query::list_by_id(conn, id, Pagination::UNBOUNDED),
            None => query::list_roots(conn, Pagination::UNBOUNDED),
        }
        .map_err(WriteError::Refresh)
    }

    fn in_transaction<T>(
        &self,
        operation: &'static str,
        body: impl FnOnce(&Connection) -> Result<T, WriteError>,
    ) -> Result<T, WriteError> {
        let mut tx = self.session.begin_transaction()?;

        let outcome = body(tx.connection())
            .and_then(|value| self.session.commit_transaction(&mut tx).map(|()| value));
        let original = match outcome {
            Ok(value) => return Ok(value),
            Err(original) => original,
        };

        tx.sync_with_store();
        let rollback = tx
            .is_active()
            .then(|| self.session.rollback_transaction(&mut tx));
        Err(settle_failure(operation, original, rollback))
    }
}

/// Error to report for a failed write.
///
/// `rollback` is `None` when the store had already ended the transaction.
/// A failed rollback takes precedence and carries the original error.
fn settle_failure(
    operation: &'static str,
    original: WriteError,
    rollback: Option<Result<(), WriteError>>,
) -> WriteError {
    match rollback {
        None => {
            warn!(operation, error = %original, "transaction ended by the store");
            original
        }
        Some(Ok(())) => {
            warn!(operation, error = %original, "write rolled back");
            original
        }
        Some(Err(rollback)) => {
            error!(operation, error = %original, rollback_error = %rollback, "rollback failed");
            WriteError::RollbackFailed {
                original: Box::new(original),
                source: Box::new(rollback),
            }
        }
    }
}
