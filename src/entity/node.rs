use sea_orm::entity::prelude::*;

/// A tree element: an identifier plus an opaque attribute document. The
/// hierarchy position lives exclusively in [`crate::entity::hierarchy`].
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "nodes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub attrs: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
