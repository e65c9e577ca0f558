//! Read-side traversal over the closure relation.
//!
//! Every query is a single non-recursive select. Functions take any
//! [`ConnectionTrait`], so callers can run them against the pooled
//! connection for a snapshot read or inside an open transaction for a view
//! consistent with pending writes. Unknown ids yield empty results rather
//! than errors; the mutating entry points are the ones that validate
//! existence up front.

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait,
};

use crate::entity::{hierarchy, node, NodeId};
use crate::error::ClosureTableError;

/// Ancestors of `node` with depth in `[min_depth, max_depth]`, closest
/// first. `None` leaves the upper bound open.
pub async fn ancestors<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
    min_depth: i32,
    max_depth: Option<i32>,
) -> Result<Vec<NodeId>, ClosureTableError> {
    let mut select = hierarchy::Entity::find()
        .filter(hierarchy::Column::DescendantId.eq(node))
        .filter(hierarchy::Column::Depth.gte(min_depth));
    if let Some(max_depth) = max_depth {
        select = select.filter(hierarchy::Column::Depth.lte(max_depth));
    }
    let rows = select
        .order_by_asc(hierarchy::Column::Depth)
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|link| link.ancestor_id).collect())
}

/// Descendants of `node` with depth in `[min_depth, max_depth]`, shallowest
/// first; ties broken by id so the order is deterministic.
pub async fn descendants<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
    min_depth: i32,
    max_depth: Option<i32>,
) -> Result<Vec<NodeId>, ClosureTableError> {
    let mut select = hierarchy::Entity::find()
        .filter(hierarchy::Column::AncestorId.eq(node))
        .filter(hierarchy::Column::Depth.gte(min_depth));
    if let Some(max_depth) = max_depth {
        select = select.filter(hierarchy::Column::Depth.lte(max_depth));
    }
    let rows = select
        .order_by_asc(hierarchy::Column::Depth)
        .order_by_asc(hierarchy::Column::DescendantId)
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|link| link.descendant_id).collect())
}

/// `node` followed by all of its descendants.
pub async fn subtree<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
) -> Result<Vec<NodeId>, ClosureTableError> {
    descendants(conn, node, 0, None).await
}

pub async fn children<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
) -> Result<Vec<NodeId>, ClosureTableError> {
    descendants(conn, node, 1, Some(1)).await
}

/// The unique depth-1 ancestor, or `None` for a root. Finding more than one
/// means a prior mutation corrupted the relation; that surfaces as an
/// `Invariant` error instead of being repaired here.
pub async fn parent<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
) -> Result<Option<NodeId>, ClosureTableError> {
    let parents = ancestors(conn, node, 1, Some(1)).await?;
    match parents.as_slice() {
        [] => Ok(None),
        [parent] => Ok(Some(*parent)),
        many => Err(ClosureTableError::invariant(format!(
            "node {node} has {} parents",
            many.len()
        ))),
    }
}

pub async fn is_root<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
) -> Result<bool, ClosureTableError> {
    Ok(parent(conn, node).await?.is_none())
}

/// Whether `ancestor` properly contains `node` in its subtree.
pub async fn is_descendant_of<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
    ancestor: NodeId,
) -> Result<bool, ClosureTableError> {
    let found = hierarchy::Entity::find()
        .filter(hierarchy::Column::AncestorId.eq(ancestor))
        .filter(hierarchy::Column::DescendantId.eq(node))
        .filter(hierarchy::Column::Depth.gte(1))
        .one(conn)
        .await?;
    Ok(found.is_some())
}

pub async fn has_children<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
) -> Result<bool, ClosureTableError> {
    let found = hierarchy::Entity::find()
        .filter(hierarchy::Column::AncestorId.eq(node))
        .filter(hierarchy::Column::Depth.eq(1))
        .one(conn)
        .await?;
    Ok(found.is_some())
}

/// Every live node without a parent edge, in id order.
pub async fn roots<C: ConnectionTrait>(conn: &C) -> Result<Vec<NodeId>, ClosureTableError> {
    let with_parent = hierarchy::Entity::find()
        .select_only()
        .column(hierarchy::Column::DescendantId)
        .filter(hierarchy::Column::Depth.eq(1))
        .into_query();

    let rows = node::Entity::find()
        .filter(node::Column::Id.not_in_subquery(with_parent))
        .order_by_asc(node::Column::Id)
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|model| model.id).collect())
}
