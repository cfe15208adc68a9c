use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::{memory::MemoryStore, pg::PgStore, AuctionStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuctionStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = if config.uses_memory_store() {
            tracing::warn!("DATABASE_URL is memory://; data lives only as long as the process");
            Arc::new(MemoryStore::new()) as Arc<dyn AuctionStore>
        } else {
            let pg = PgStore::connect(&config.database_url).await?;

            // Run migrations if present
            if let Err(e) = sqlx::migrate!("./migrations").run(pg.pool()).await {
                tracing::warn!(error = %e, "migrations failed; continuing");
            }
            Arc::new(pg) as Arc<dyn AuctionStore>
        };

        Ok(Self::from_parts(store, config))
    }

    pub fn from_parts(store: Arc<dyn AuctionStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with(false)
    }

    #[cfg(test)]
    pub fn fake_with(restrict_close_to_creator: bool) -> Self {
        let config = Arc::new(AppConfig {
            database_url: crate::config::MEMORY_DATABASE_URL.into(),
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            restrict_close_to_creator,
        });
        Self::from_parts(Arc::new(MemoryStore::new()), config)
    }
}
