use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "rfid_cards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Card UID as broadcast by the reader. Uniqueness is enforced by
    /// the schema so concurrent inserts cannot race.
    #[sea_orm(unique)]
    pub uid: String,

    pub owner_name: String,

    pub description: String,

    /// "active" cards pass verification, anything else is rejected.
    pub status: String,

    pub last_used: Option<String>,

    /// User that registered the card.
    pub user_id: i32,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
