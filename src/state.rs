use crate::config::Config;
use crate::services::cache::ApiCache;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub cache: Arc<ApiCache>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let cache = Arc::new(ApiCache::new(Duration::from_secs(config.report_cache_ttl_secs)));
        Self {
            db,
            config: Arc::new(config),
            cache,
        }
    }
}
