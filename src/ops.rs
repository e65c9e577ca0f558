use sea_orm::{DatabaseConnection, DatabaseTransaction};
use tracing::debug;

use crate::closure;
use crate::config::ClosureTableConfig;
use crate::entity::NodeId;
use crate::error::ClosureTableError;
use crate::lock::LockedTransaction;
use crate::query;
use crate::store;

/// Entry point for structural mutations.
///
/// Each operation runs as one [`LockedTransaction`]: preconditions are
/// checked before anything is written, and any failure after that point
/// rolls the whole operation back, so readers never observe a half-rewritten
/// closure relation.
#[derive(Debug, Default)]
pub struct TreeRepository {
    config: ClosureTableConfig,
}

impl TreeRepository {
    pub fn new() -> Self {
        Self {
            config: ClosureTableConfig::default(),
        }
    }

    pub fn with_config(config: ClosureTableConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClosureTableConfig {
        &self.config
    }

    /// Create a node and attach it, as a root when `parent` is `None` or
    /// under the given parent otherwise. Fails with `NotFound` (before any
    /// write) if the parent does not exist.
    pub async fn insert(
        &self,
        db: &DatabaseConnection,
        parent: Option<NodeId>,
        attrs: serde_json::Value,
    ) -> Result<NodeId, ClosureTableError> {
        let guard = LockedTransaction::acquire(&self.config, db).await?;
        match Self::insert_on(guard.connection(), parent, attrs).await {
            Ok(id) => {
                guard.commit().await?;
                debug!(node = id, ?parent, "inserted node");
                Ok(id)
            }
            Err(err) => {
                let _ = guard.rollback().await;
                Err(err)
            }
        }
    }

    /// Relocate the subtree rooted at `node` under `new_parent`.
    ///
    /// Fails with `InvalidMove` when the target is the node itself or one of
    /// its descendants (the cycle check is a single closure-relation read);
    /// the relation is left untouched in that case.
    pub async fn move_node(
        &self,
        db: &DatabaseConnection,
        node: NodeId,
        new_parent: NodeId,
    ) -> Result<(), ClosureTableError> {
        let guard = LockedTransaction::acquire(&self.config, db).await?;
        match Self::move_on(guard.connection(), node, new_parent).await {
            Ok(()) => {
                guard.commit().await?;
                debug!(node, new_parent, "moved subtree");
                Ok(())
            }
            Err(err) => {
                let _ = guard.rollback().await;
                Err(err)
            }
        }
    }

    /// Delete `node`. With `cascade` the whole subtree goes; without it the
    /// node's children are promoted to its former parent (or to roots when
    /// the node was itself a root) and only the node's record is removed.
    pub async fn delete(
        &self,
        db: &DatabaseConnection,
        node: NodeId,
        cascade: bool,
    ) -> Result<(), ClosureTableError> {
        let guard = LockedTransaction::acquire(&self.config, db).await?;
        match Self::delete_on(guard.connection(), node, cascade).await {
            Ok(()) => {
                guard.commit().await?;
                debug!(node, cascade, "deleted node");
                Ok(())
            }
            Err(err) => {
                let _ = guard.rollback().await;
                Err(err)
            }
        }
    }

    /// Sever `node` from its ancestors so it becomes a root. Relations
    /// inside the orphaned subtree are kept intact.
    pub async fn orphan(
        &self,
        db: &DatabaseConnection,
        node: NodeId,
    ) -> Result<(), ClosureTableError> {
        let guard = LockedTransaction::acquire(&self.config, db).await?;
        match Self::orphan_on(guard.connection(), node).await {
            Ok(()) => {
                guard.commit().await?;
                debug!(node, "orphaned subtree");
                Ok(())
            }
            Err(err) => {
                let _ = guard.rollback().await;
                Err(err)
            }
        }
    }

    async fn insert_on(
        conn: &DatabaseTransaction,
        parent: Option<NodeId>,
        attrs: serde_json::Value,
    ) -> Result<NodeId, ClosureTableError> {
        if let Some(parent) = parent {
            store::fetch(conn, parent).await?;
        }

        let model = store::create(conn, attrs).await?;
        match parent {
            Some(parent) => closure::attach_under(conn, model.id, parent).await?,
            None => closure::attach_root(conn, model.id).await?,
        }
        Ok(model.id)
    }

    async fn move_on(
        conn: &DatabaseTransaction,
        node: NodeId,
        new_parent: NodeId,
    ) -> Result<(), ClosureTableError> {
        store::fetch(conn, node).await?;
        store::fetch(conn, new_parent).await?;

        if new_parent == node || query::is_descendant_of(conn, new_parent, node).await? {
            return Err(ClosureTableError::InvalidMove {
                node,
                target: new_parent,
            });
        }

        closure::reattach_subtree(conn, node, new_parent).await
    }

    async fn delete_on(
        conn: &DatabaseTransaction,
        node: NodeId,
        cascade: bool,
    ) -> Result<(), ClosureTableError> {
        store::fetch(conn, node).await?;

        if cascade {
            let members = closure::purge_subtree(conn, node).await?;
            store::remove_many(conn, &members).await?;
        } else {
            let parent = query::parent(conn, node).await?;
            closure::promote_children(conn, node, parent).await?;
            store::remove(conn, node).await?;
        }
        Ok(())
    }

    async fn orphan_on(
        conn: &DatabaseTransaction,
        node: NodeId,
    ) -> Result<(), ClosureTableError> {
        store::fetch(conn, node).await?;
        closure::detach_subtree(conn, node).await
    }
}
