use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    error::SqlErr,
};

use crate::entities::rfid_cards;

/// Insert failure split out so the API layer can map a UID collision
/// to a 400 instead of a 500.
#[derive(Debug, thiserror::Error)]
pub enum InsertCardError {
    #[error("card UID already registered")]
    DuplicateUid,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub struct RfidRepository {
    conn: DatabaseConnection,
}

impl RfidRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, status: Option<&str>) -> Result<Vec<rfid_cards::Model>> {
        let mut query =
            rfid_cards::Entity::find().order_by_desc(rfid_cards::Column::CreatedAt);

        if let Some(status) = status {
            query = query.filter(rfid_cards::Column::Status.eq(status));
        }

        let cards = query.all(&self.conn).await?;
        Ok(cards)
    }

    /// Insert a card. The schema's unique index on `uid` makes the
    /// duplicate check atomic under concurrent inserts; the constraint
    /// violation is mapped rather than pre-checked.
    pub async fn insert(
        &self,
        uid: &str,
        owner_name: &str,
        description: &str,
        status: &str,
        user_id: i32,
    ) -> Result<rfid_cards::Model, InsertCardError> {
        let active = rfid_cards::ActiveModel {
            uid: Set(uid.to_string()),
            owner_name: Set(owner_name.to_string()),
            description: Set(description.to_string()),
            status: Set(status.to_string()),
            user_id: Set(user_id),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(card) => Ok(card),
            Err(e) => {
                if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    Err(InsertCardError::DuplicateUid)
                } else {
                    Err(InsertCardError::Other(
                        anyhow::Error::new(e).context("Failed to insert RFID card"),
                    ))
                }
            }
        }
    }

    /// Partial update; `None` fields are left untouched. Updating an
    /// unknown id affects zero rows and is not an error.
    pub async fn update(
        &self,
        id: i32,
        owner_name: Option<&str>,
        description: Option<&str>,
        status: Option<&str>,
    ) -> Result<()> {
        let mut update = rfid_cards::Entity::update_many()
            .filter(rfid_cards::Column::Id.eq(id));

        if let Some(owner_name) = owner_name {
            update = update.col_expr(
                rfid_cards::Column::OwnerName,
                sea_orm::sea_query::Expr::value(owner_name),
            );
        }
        if let Some(description) = description {
            update = update.col_expr(
                rfid_cards::Column::Description,
                sea_orm::sea_query::Expr::value(description),
            );
        }
        if let Some(status) = status {
            update = update.col_expr(
                rfid_cards::Column::Status,
                sea_orm::sea_query::Expr::value(status),
            );
        }

        update.exec(&self.conn).await?;
        Ok(())
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        rfid_cards::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete RFID card")?;
        Ok(())
    }

    /// Look up an active card by UID. A match stamps `last_used`; a
    /// miss touches nothing.
    pub async fn verify(&self, uid: &str) -> Result<Option<rfid_cards::Model>> {
        let card = rfid_cards::Entity::find()
            .filter(rfid_cards::Column::Uid.eq(uid))
            .filter(rfid_cards::Column::Status.eq("active"))
            .one(&self.conn)
            .await
            .context("Failed to query RFID card for verification")?;

        let Some(card) = card else {
            return Ok(None);
        };

        let mut active: rfid_cards::ActiveModel = card.into();
        active.last_used = Set(Some(chrono::Utc::now().to_rfc3339()));
        let card = active.update(&self.conn).await?;

        Ok(Some(card))
    }
}
