use sea_orm::entity::prelude::*;

/// One reachability fact: `ancestor_id` reaches `descendant_id` in `depth`
/// parent steps. Depth 0 is the self-edge every live node has. The composite
/// primary key keeps the relation to at most one edge per ordered pair.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "node_hierarchies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub ancestor_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub descendant_id: i64,
    pub depth: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
