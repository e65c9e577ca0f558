//! Record-level access to the `nodes` table.
//!
//! Nothing here knows about the hierarchy: creating or removing a record
//! does not touch the closure relation, which is the caller's job (see
//! [`crate::ops`]). Attribute payloads are opaque JSON documents.

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::entity::{node, NodeId};
use crate::error::ClosureTableError;

/// Insert a fresh node record and return it with its allocated id.
pub async fn create<C: ConnectionTrait>(
    conn: &C,
    attrs: serde_json::Value,
) -> Result<node::Model, ClosureTableError> {
    let active = node::ActiveModel {
        attrs: Set(attrs),
        ..Default::default()
    };
    let model = active.insert(conn).await?;
    Ok(model)
}

/// Fetch a node record, failing with `NotFound` if it is absent.
pub async fn fetch<C: ConnectionTrait>(
    conn: &C,
    id: NodeId,
) -> Result<node::Model, ClosureTableError> {
    get(conn, id)
        .await?
        .ok_or(ClosureTableError::NotFound(id))
}

pub async fn get<C: ConnectionTrait>(
    conn: &C,
    id: NodeId,
) -> Result<Option<node::Model>, ClosureTableError> {
    let model = node::Entity::find_by_id(id).one(conn).await?;
    Ok(model)
}

/// Replace a node's attribute payload. Hierarchy edges are untouched.
pub async fn update_attrs<C: ConnectionTrait>(
    conn: &C,
    id: NodeId,
    attrs: serde_json::Value,
) -> Result<node::Model, ClosureTableError> {
    let mut active: node::ActiveModel = fetch(conn, id).await?.into();
    active.attrs = Set(attrs);
    let model = active.update(conn).await?;
    Ok(model)
}

pub async fn remove<C: ConnectionTrait>(conn: &C, id: NodeId) -> Result<(), ClosureTableError> {
    node::Entity::delete_by_id(id).exec(conn).await?;
    Ok(())
}

pub async fn remove_many<C: ConnectionTrait>(
    conn: &C,
    ids: &[NodeId],
) -> Result<(), ClosureTableError> {
    if ids.is_empty() {
        return Ok(());
    }
    node::Entity::delete_many()
        .filter(node::Column::Id.is_in(ids.iter().copied()))
        .exec(conn)
        .await?;
    Ok(())
}
