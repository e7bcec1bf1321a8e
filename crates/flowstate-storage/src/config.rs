// Environment configuration
//
// `DATABASE_URL` selects the PostgreSQL driver; without it the storage
// falls back to the in-memory driver (dev mode).

use flowstate_core::StoreResult;

use crate::WorkflowStorage;

/// Storage configuration loaded from the environment
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub database_url: Option<String>,
}

impl StorageConfig {
    /// Load from the process environment, honoring a `.env` file if present
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            database_url: std::env::var("DATABASE_URL").ok(),
        }
    }

    /// Whether this configuration runs without a database
    pub fn is_dev_mode(&self) -> bool {
        self.database_url.is_none()
    }

    /// Build the storage this configuration describes
    pub async fn connect(&self) -> StoreResult<WorkflowStorage> {
        match &self.database_url {
            Some(url) => WorkflowStorage::postgres(url).await,
            None => Ok(WorkflowStorage::in_memory()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_database_url_means_dev_mode() {
        let config = StorageConfig { database_url: None };
        assert!(config.is_dev_mode());

        let config = StorageConfig {
            database_url: Some("postgres://localhost/flowstate".to_string()),
        };
        assert!(!config.is_dev_mode());
    }
}
