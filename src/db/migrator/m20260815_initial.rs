use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Hash the bootstrap password using Argon2id
fn hash_default_password() -> String {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let password = b"admin123";
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password, &salt)
        .expect("Failed to hash default password")
        .to_string()
}

/// Columns of activity_history as first shipped; the soft-delete flag
/// arrives in a later migration.
#[derive(DeriveIden)]
enum ActivityHistoryTable {
    #[sea_orm(iden = "activity_history")]
    Table,
    Id,
    Type,
    Title,
    Description,
    Icon,
    UserId,
    Metadata,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(RfidCards)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ActivityHistoryTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActivityHistoryTable::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ActivityHistoryTable::Type)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActivityHistoryTable::Title)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActivityHistoryTable::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActivityHistoryTable::Icon)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActivityHistoryTable::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActivityHistoryTable::Metadata)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActivityHistoryTable::CreatedAt)
                            .string()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Seed the bootstrap admin account; provisioning beyond this is
        // done out of band.
        let now = chrono::Utc::now().to_rfc3339();
        let password_hash = hash_default_password();

        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(Users)
            .columns([
                crate::entities::users::Column::Username,
                crate::entities::users::Column::PasswordHash,
                crate::entities::users::Column::FullName,
                crate::entities::users::Column::Role,
                crate::entities::users::Column::IsActive,
                crate::entities::users::Column::CreatedAt,
            ])
            .values_panic([
                "admin".into(),
                password_hash.into(),
                "Administrator".into(),
                "admin".into(),
                true.into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActivityHistoryTable::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RfidCards).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
