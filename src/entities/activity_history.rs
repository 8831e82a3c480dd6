use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "activity_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Event category (unlock, lock, rfid, system, ...).
    #[sea_orm(column_name = "type")]
    pub kind: String,

    pub title: String,

    pub description: String,

    pub icon: String,

    pub user_id: i32,

    /// Arbitrary JSON blob supplied by the caller.
    pub metadata: String,

    pub created_at: String,

    /// Soft-delete flag; deleted rows stay in the table but are
    /// excluded from listings.
    pub is_deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
