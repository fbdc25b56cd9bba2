use mt_tenant::TenantId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown tenant: {0}")]
    UnknownTenant(TenantId),

    #[error("Tenant data sources are not initialized yet")]
    NotReady,

    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),
}

impl DatabaseError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
