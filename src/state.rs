use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::TokenService;
use crate::config::Config;
use crate::db::Store;

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub tokens: Arc<TokenService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let tokens = Arc::new(TokenService::new(
            config.auth.jwt_secret.as_bytes(),
            config.auth.token_ttl_hours,
        ));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            tokens,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
