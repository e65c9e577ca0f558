use std::time::Duration;

use thiserror::Error;

use crate::entity::NodeId;

/// Errors returned by the closure-table APIs.
#[derive(Debug, Error)]
pub enum ClosureTableError {
    #[error("node {0} does not exist")]
    NotFound(NodeId),

    #[error("cannot move node {node} under {target}: the target lies inside the node's subtree")]
    InvalidMove { node: NodeId, target: NodeId },

    #[error("timed out after {0:?} waiting for the hierarchy lock")]
    Contention(Duration),

    #[error("closure-table invariant violation: {0}")]
    Invariant(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl ClosureTableError {
    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::Invariant(detail.into())
    }
}
