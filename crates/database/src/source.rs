use crate::config::{redact_url, DriverKind, PoolSettings, TenantDataSourceConfig};
use crate::error::{DatabaseError, Result};
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres};
use std::fmt;

/// A managed provider of connections for a single tenant.
#[async_trait]
pub trait ConnectionSource: Send + Sync + Sized + 'static {
    type Connection: Send;

    /// Open the source described by `entry`. Called once per tenant at startup.
    async fn open(entry: &TenantDataSourceConfig, settings: &PoolSettings) -> Result<Self>;

    /// Errors from the underlying pool are returned as-is.
    async fn acquire(&self) -> Result<Self::Connection>;

    /// The configured URL this source connects to. May carry credentials;
    /// pass it through [`redact_url`] before logging.
    fn url(&self) -> &str;

    async fn close(&self);
}

/// Postgres connection pool for one tenant.
#[derive(Clone)]
pub struct PgDataSource {
    url: String,
    pool: PgPool,
}

// The pool's connect options hold the password
impl fmt::Debug for PgDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgDataSource")
            .field("url", &redact_url(&self.url))
            .field("size", &self.pool.size())
            .finish()
    }
}

impl PgDataSource {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn connect_options(entry: &TenantDataSourceConfig) -> Result<PgConnectOptions> {
        // Accept JDBC-style URLs as found in existing tenant configuration
        let url = entry.url.strip_prefix("jdbc:").unwrap_or(&entry.url);

        let mut options: PgConnectOptions = url.parse().map_err(|e| {
            DatabaseError::configuration(format!(
                "Invalid database URL for tenant {}: {}",
                entry.tenant_id, e
            ))
        })?;

        if !entry.username.is_empty() {
            options = options.username(&entry.username);
        }
        if !entry.password.is_empty() {
            options = options.password(&entry.password);
        }

        Ok(options)
    }
}

#[async_trait]
impl ConnectionSource for PgDataSource {
    type Connection = PoolConnection<Postgres>;

    async fn open(entry: &TenantDataSourceConfig, settings: &PoolSettings) -> Result<Self> {
        match entry.driver()? {
            DriverKind::Postgres => {}
        }

        let options = Self::connect_options(entry)?;
        let target = format!(
            "{}@{}:{}/{}",
            options.get_username(),
            options.get_host(),
            options.get_port(),
            options.get_database().unwrap_or_default()
        );
        let pool_options = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout())
            .idle_timeout(settings.idle_timeout());

        let pool = if settings.connect_eagerly {
            let pool = pool_options.connect_with(options).await?;
            sqlx::query("SELECT 1").execute(&pool).await?;
            pool
        } else {
            pool_options.connect_lazy_with(options)
        };

        tracing::info!("Created connection pool for tenant {} ({})", entry.tenant_id, target);

        Ok(Self {
            url: entry.url.clone(),
            pool,
        })
    }

    async fn acquire(&self) -> Result<Self::Connection> {
        Ok(self.pool.acquire().await?)
    }

    fn url(&self) -> &str {
        &self.url
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
