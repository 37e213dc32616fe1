use std::sync::Arc;

use gather_cache::Cache;
use gather_db::Database;
use gather_files::FileStore;

use crate::blacklist::TokenBlacklist;
use crate::error::ApiError;
use crate::jwt::AuthConfig;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub cache: Arc<Cache>,
    pub files: FileStore,
    pub blacklist: TokenBlacklist,
    pub auth: AuthConfig,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    /// Runs a blocking DB closure off the async runtime and folds both the
    /// join error and the query error into the taxonomy.
    pub async fn query<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| ApiError::Internal(e.into()))?
            .map_err(ApiError::Internal)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Duration;

    use super::*;

    /// Fresh state over an in-memory DB and a throwaway blob directory.
    pub(crate) async fn test_state() -> AppState {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let cache = Arc::new(Cache::new());
        let dir = std::env::temp_dir().join(format!("gather-api-test-{}", uuid::Uuid::new_v4()));
        let files = FileStore::new(dir, db.clone(), cache.clone(), Duration::from_secs(600))
            .await
            .unwrap();

        Arc::new(AppStateInner {
            db,
            cache: cache.clone(),
            files,
            blacklist: TokenBlacklist::new(cache),
            auth: AuthConfig {
                secret: "test-secret".into(),
                issuer: "gather-test".into(),
                audience: "gather-clients".into(),
                token_ttl: Duration::from_secs(3600),
            },
        })
    }
}
