//! Tenant Connection Router
//!
//! Picks the data source for the current logical operation at the moment a
//! connection is requested:
//!
//! ```text
//! acquire_connection()
//!   └─ resolver.resolve_current_tenant()   (task context, or default tenant)
//!        └─ registry.lookup(tenant)        (UnknownTenant if absent)
//!             └─ source.acquire()          (pool errors returned unchanged)
//! ```
//!
//! The router is created before the registry exists and stays "not ready"
//! until [`ConnectionRouter::install`] is called once during startup.

use crate::config::redact_url;
use crate::error::{DatabaseError, Result};
use crate::registry::DataSourceRegistry;
use crate::source::ConnectionSource;
use mt_tenant::{ContextTenantResolver, TenantId, TenantIdentifierResolver};
use std::sync::{Arc, OnceLock};

pub struct ConnectionRouter<S, R = ContextTenantResolver> {
    inner: Arc<RouterInner<S, R>>,
}

struct RouterInner<S, R> {
    resolver: R,
    registry: OnceLock<DataSourceRegistry<S>>,
}

impl<S, R> Clone for ConnectionRouter<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, R> ConnectionRouter<S, R>
where
    S: ConnectionSource,
    R: TenantIdentifierResolver,
{
    /// Create a router with no registry installed yet.
    pub fn new(resolver: R) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                resolver,
                registry: OnceLock::new(),
            }),
        }
    }

    pub fn with_registry(resolver: R, registry: DataSourceRegistry<S>) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                resolver,
                registry: OnceLock::from(registry),
            }),
        }
    }

    /// Make the router ready. The registry can only be installed once; a
    /// rejected registry is closed before the error is returned.
    pub async fn install(&self, registry: DataSourceRegistry<S>) -> Result<()> {
        let tenants = registry.len();
        if let Err(rejected) = self.inner.registry.set(registry) {
            tracing::warn!("Closing {} data sources from a second install", rejected.len());
            rejected.close_all().await;
            return Err(DatabaseError::configuration(
                "Tenant data source registry is already installed",
            ));
        }

        tracing::info!("Connection router ready for {} tenants", tenants);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.inner.registry.get().is_some()
    }

    pub fn registry(&self) -> Result<&DataSourceRegistry<S>> {
        self.inner.registry.get().ok_or(DatabaseError::NotReady)
    }

    /// Tenant the next `acquire_connection` call would route to.
    pub fn current_tenant(&self) -> TenantId {
        self.inner.resolver.resolve_current_tenant()
    }

    /// Connection for the tenant of the current execution unit.
    pub async fn acquire_connection(&self) -> Result<S::Connection> {
        let registry = self.registry()?;
        let tenant = self.current_tenant();

        let source = registry.lookup(&tenant).ok_or_else(|| {
            tracing::warn!("No data source configured for tenant {}", tenant);
            DatabaseError::UnknownTenant(tenant.clone())
        })?;

        tracing::debug!(
            "Routing connection for tenant {} to {}",
            tenant,
            redact_url(source.url())
        );
        source.acquire().await
    }

    /// Connection from the first configured source, for work that must run
    /// without tenant context (metadata queries during startup).
    pub async fn acquire_any_connection(&self) -> Result<S::Connection> {
        let source = self.registry()?.any();
        tracing::debug!("Routing tenant-agnostic connection to {}", redact_url(source.url()));
        source.acquire().await
    }

    pub fn validate_existing_sessions(&self) -> bool {
        self.inner.resolver.validate_existing_sessions()
    }

    /// Close all tenant sources. A router that never became ready has
    /// nothing to close.
    pub async fn shutdown(&self) {
        if let Some(registry) = self.inner.registry.get() {
            registry.close_all().await;
        }
    }
}
