use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ActivityHistoryTable {
    #[sea_orm(iden = "activity_history")]
    Table,
    IsDeleted,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.has_column("activity_history", "is_deleted").await? {
            return Ok(());
        }

        manager
            .alter_table(
                Table::alter()
                    .table(ActivityHistoryTable::Table)
                    .add_column(
                        ColumnDef::new(ActivityHistoryTable::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(ActivityHistoryTable::Table)
                    .drop_column(ActivityHistoryTable::IsDeleted)
                    .to_owned(),
            )
            .await
    }
}
