use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::activity_history;

pub struct HistoryRepository {
    conn: DatabaseConnection,
}

impl HistoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// List entries newest-first, excluding soft-deleted rows.
    /// `kind` of `None` or `"all"` means no type filter.
    pub async fn list(
        &self,
        kind: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<activity_history::Model>> {
        let mut query = activity_history::Entity::find()
            .filter(activity_history::Column::IsDeleted.eq(false))
            .order_by_desc(activity_history::Column::CreatedAt)
            .order_by_desc(activity_history::Column::Id);

        if let Some(kind) = kind
            && kind != "all"
        {
            query = query.filter(activity_history::Column::Kind.eq(kind));
        }

        let entries = query.limit(limit).offset(offset).all(&self.conn).await?;
        Ok(entries)
    }

    pub async fn insert(
        &self,
        kind: &str,
        title: &str,
        description: &str,
        icon: &str,
        user_id: i32,
        metadata: &serde_json::Value,
    ) -> Result<activity_history::Model> {
        let active = activity_history::ActiveModel {
            kind: Set(kind.to_string()),
            title: Set(title.to_string()),
            description: Set(description.to_string()),
            icon: Set(icon.to_string()),
            user_id: Set(user_id),
            metadata: Set(metadata.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            is_deleted: Set(false),
            ..Default::default()
        };

        let entry = active.insert(&self.conn).await?;
        Ok(entry)
    }

    /// Mark one entry deleted. Deleting an id that does not exist is a
    /// silent no-op.
    pub async fn soft_delete(&self, id: i64) -> Result<()> {
        activity_history::Entity::update_many()
            .col_expr(
                activity_history::Column::IsDeleted,
                sea_orm::sea_query::Expr::value(true),
            )
            .filter(activity_history::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Mark every remaining entry deleted.
    pub async fn clear(&self) -> Result<u64> {
        let result = activity_history::Entity::update_many()
            .col_expr(
                activity_history::Column::IsDeleted,
                sea_orm::sea_query::Expr::value(true),
            )
            .filter(activity_history::Column::IsDeleted.eq(false))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
