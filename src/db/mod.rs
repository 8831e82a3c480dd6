use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::rfid::InsertCardError;
pub use repositories::user::User;

use crate::entities::{activity_history, rfid_cards};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 10, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn history_repo(&self) -> repositories::history::HistoryRepository {
        repositories::history::HistoryRepository::new(self.conn.clone())
    }

    fn rfid_repo(&self) -> repositories::rfid::RfidRepository {
        repositories::rfid::RfidRepository::new(self.conn.clone())
    }

    // Users

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn verify_user_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn touch_last_login(&self, id: i32) -> Result<()> {
        self.user_repo().touch_last_login(id).await
    }

    pub async fn set_user_active(&self, username: &str, active: bool) -> Result<()> {
        self.user_repo().set_active(username, active).await
    }

    pub async fn update_user_password(
        &self,
        username: &str,
        new_password: &str,
        security: Option<&crate::config::SecurityConfig>,
    ) -> Result<()> {
        self.user_repo()
            .update_password(username, new_password, security)
            .await
    }

    // Activity history

    pub async fn list_history(
        &self,
        kind: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<activity_history::Model>> {
        self.history_repo().list(kind, limit, offset).await
    }

    pub async fn insert_history(
        &self,
        kind: &str,
        title: &str,
        description: &str,
        icon: &str,
        user_id: i32,
        metadata: &serde_json::Value,
    ) -> Result<activity_history::Model> {
        self.history_repo()
            .insert(kind, title, description, icon, user_id, metadata)
            .await
    }

    pub async fn delete_history_entry(&self, id: i64) -> Result<()> {
        self.history_repo().soft_delete(id).await
    }

    pub async fn clear_history(&self) -> Result<u64> {
        self.history_repo().clear().await
    }

    // RFID cards

    pub async fn list_cards(&self, status: Option<&str>) -> Result<Vec<rfid_cards::Model>> {
        self.rfid_repo().list(status).await
    }

    pub async fn insert_card(
        &self,
        uid: &str,
        owner_name: &str,
        description: &str,
        status: &str,
        user_id: i32,
    ) -> Result<rfid_cards::Model, InsertCardError> {
        self.rfid_repo()
            .insert(uid, owner_name, description, status, user_id)
            .await
    }

    pub async fn update_card(
        &self,
        id: i32,
        owner_name: Option<&str>,
        description: Option<&str>,
        status: Option<&str>,
    ) -> Result<()> {
        self.rfid_repo()
            .update(id, owner_name, description, status)
            .await
    }

    pub async fn delete_card(&self, id: i32) -> Result<()> {
        self.rfid_repo().delete(id).await
    }

    pub async fn verify_card(&self, uid: &str) -> Result<Option<rfid_cards::Model>> {
        self.rfid_repo().verify(uid).await
    }
}
