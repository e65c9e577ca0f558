//! Maintenance of the closure relation.
//!
//! Every function here expects to run inside the caller's transaction (the
//! mutating entry points in [`crate::ops`] provide one) and rewrites edges
//! in bulk: one read of the relevant chain or subtree edge set, then one
//! `insert_many`/`delete_many`. No traversal is ever recursive.

use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::entity::{hierarchy, NodeId};
use crate::error::ClosureTableError;
use crate::query;

fn edge(ancestor: NodeId, descendant: NodeId, depth: i32) -> hierarchy::ActiveModel {
    hierarchy::ActiveModel {
        ancestor_id: Set(ancestor),
        descendant_id: Set(descendant),
        depth: Set(depth),
    }
}

/// All edges whose ancestor is `node`, i.e. the subtree rooted at `node`
/// with each member's depth below it. Includes the self-edge.
async fn subtree_edges<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
) -> Result<Vec<hierarchy::Model>, ClosureTableError> {
    let rows = hierarchy::Entity::find()
        .filter(hierarchy::Column::AncestorId.eq(node))
        .all(conn)
        .await?;
    Ok(rows)
}

/// All edges whose descendant is `node`: its full ancestor chain, self-edge
/// included at depth 0.
async fn ancestor_edges<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
) -> Result<Vec<hierarchy::Model>, ClosureTableError> {
    let rows = hierarchy::Entity::find()
        .filter(hierarchy::Column::DescendantId.eq(node))
        .all(conn)
        .await?;
    Ok(rows)
}

/// Make `node` a root: insert its single self-edge.
pub async fn attach_root<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
) -> Result<(), ClosureTableError> {
    hierarchy::Entity::insert(edge(node, node, 0))
        .exec(conn)
        .await?;
    Ok(())
}

/// Attach a fresh node under `parent`: the self-edge, plus one edge per
/// entry in the parent's ancestor chain, each one step deeper.
pub async fn attach_under<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
    parent: NodeId,
) -> Result<(), ClosureTableError> {
    let chain = ancestor_edges(conn, parent).await?;
    if chain.is_empty() {
        return Err(ClosureTableError::invariant(format!(
            "node {parent} has no self-edge; its ancestor chain is unretrievable"
        )));
    }

    let mut rows = Vec::with_capacity(chain.len() + 1);
    rows.push(edge(node, node, 0));
    for link in &chain {
        rows.push(edge(link.ancestor_id, node, link.depth + 1));
    }

    hierarchy::Entity::insert_many(rows).exec(conn).await?;
    Ok(())
}

/// Sever the subtree rooted at `node` from the rest of the tree: delete
/// every edge whose descendant lies inside the subtree and whose ancestor is
/// a proper ancestor of `node`. Edges internal to the subtree survive, which
/// is what makes a later reattach a pure cross-product insert.
pub async fn detach_subtree<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
) -> Result<(), ClosureTableError> {
    let subtree = subtree_edges(conn, node).await?;
    if subtree.is_empty() {
        return Err(ClosureTableError::invariant(format!(
            "node {node} has no self-edge; cannot detach its subtree"
        )));
    }

    let outside: Vec<NodeId> = ancestor_edges(conn, node)
        .await?
        .into_iter()
        .filter(|link| link.depth >= 1)
        .map(|link| link.ancestor_id)
        .collect();
    if outside.is_empty() {
        // Already a root.
        return Ok(());
    }

    let members: Vec<NodeId> = subtree.iter().map(|link| link.descendant_id).collect();

    hierarchy::Entity::delete_many()
        .filter(hierarchy::Column::DescendantId.is_in(members))
        .filter(hierarchy::Column::AncestorId.is_in(outside))
        .exec(conn)
        .await?;
    Ok(())
}

/// Move the subtree rooted at `node` under `new_parent`.
///
/// Callers must have ruled out cycles (`new_parent` inside the subtree)
/// first; see [`crate::ops::TreeRepository::move_node`]. The rewrite is one
/// detach plus one bulk insert pairing every ancestor of `new_parent` with
/// every subtree member, summing the two depths across the new link.
pub async fn reattach_subtree<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
    new_parent: NodeId,
) -> Result<(), ClosureTableError> {
    detach_subtree(conn, node).await?;

    let chain = ancestor_edges(conn, new_parent).await?;
    if chain.is_empty() {
        return Err(ClosureTableError::invariant(format!(
            "node {new_parent} has no self-edge; its ancestor chain is unretrievable"
        )));
    }
    let subtree = subtree_edges(conn, node).await?;
    if subtree.is_empty() {
        return Err(ClosureTableError::invariant(format!(
            "node {node} has no self-edge; cannot reattach its subtree"
        )));
    }

    let mut rows = Vec::with_capacity(chain.len() * subtree.len());
    for above in &chain {
        for below in &subtree {
            rows.push(edge(
                above.ancestor_id,
                below.descendant_id,
                above.depth + 1 + below.depth,
            ));
        }
    }

    hierarchy::Entity::insert_many(rows).exec(conn).await?;
    Ok(())
}

/// Delete every edge referencing the subtree rooted at `node`, returning the
/// member ids so the caller can drop their node records too.
pub async fn purge_subtree<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
) -> Result<Vec<NodeId>, ClosureTableError> {
    let subtree = subtree_edges(conn, node).await?;
    if subtree.is_empty() {
        return Err(ClosureTableError::invariant(format!(
            "node {node} has no self-edge; cannot purge its subtree"
        )));
    }

    let members: Vec<NodeId> = subtree.iter().map(|link| link.descendant_id).collect();

    hierarchy::Entity::delete_many()
        .filter(hierarchy::Column::DescendantId.is_in(members.clone()))
        .exec(conn)
        .await?;
    Ok(members)
}

/// Re-home every immediate child of `node` under `new_parent` (or promote
/// each to a root when `new_parent` is `None`), then drop `node`'s own
/// edges. Used by non-cascading deletion.
pub async fn promote_children<C: ConnectionTrait>(
    conn: &C,
    node: NodeId,
    new_parent: Option<NodeId>,
) -> Result<(), ClosureTableError> {
    let children = query::children(conn, node).await?;

    for child in children {
        match new_parent {
            Some(parent) => reattach_subtree(conn, child, parent).await?,
            None => detach_subtree(conn, child).await?,
        }
    }

    hierarchy::Entity::delete_many()
        .filter(
            Condition::any()
                .add(hierarchy::Column::AncestorId.eq(node))
                .add(hierarchy::Column::DescendantId.eq(node)),
        )
        .exec(conn)
        .await?;
    Ok(())
}
