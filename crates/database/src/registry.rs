//! Tenant Data Source Registry
//!
//! Maps every configured tenant to its opened connection source. Built once
//! at startup from the configured tenant list and read-only afterwards:
//! - Keys are exactly the configured tenants, in configured order
//! - Invalid or unreachable entries abort startup instead of failing at the
//!   first query

use crate::config::{PoolSettings, TenantDataSourceConfig};
use crate::error::{DatabaseError, Result};
use crate::source::ConnectionSource;
use mt_tenant::TenantId;
use std::collections::{HashMap, HashSet};

pub struct DataSourceRegistry<S> {
    // Never empty
    sources: Vec<(TenantId, S)>,
    index: HashMap<TenantId, usize>,
}

impl<S: ConnectionSource> DataSourceRegistry<S> {
    /// Validate every entry, then open one source per tenant in order.
    ///
    /// Any failure is reported as [`DatabaseError::Configuration`]; sources
    /// opened before the failure are closed first.
    pub async fn build_all(
        entries: &[TenantDataSourceConfig],
        settings: &PoolSettings,
    ) -> Result<Self> {
        let tenants = validate_entries(entries)?;

        let mut opened: Vec<(TenantId, S)> = Vec::with_capacity(entries.len());
        for (tenant, entry) in tenants.into_iter().zip(entries) {
            match S::open(entry, settings).await {
                Ok(source) => opened.push((tenant, source)),
                Err(e) => {
                    tracing::error!("Failed to open data source for tenant {}: {}", tenant, e);
                    for (_, source) in &opened {
                        source.close().await;
                    }
                    return Err(DatabaseError::configuration(format!(
                        "Failed to open data source for tenant {}: {}",
                        tenant, e
                    )));
                }
            }
        }

        let registry = Self::from_sources(opened)?;
        tracing::info!(
            "Tenant data source registry ready with {} tenants",
            registry.len()
        );
        Ok(registry)
    }

    /// Assemble a registry from sources that are already open.
    pub fn from_sources(sources: Vec<(TenantId, S)>) -> Result<Self> {
        if sources.is_empty() {
            return Err(DatabaseError::configuration(
                "At least one tenant data source must be configured",
            ));
        }

        let mut index = HashMap::with_capacity(sources.len());
        for (position, (tenant, _)) in sources.iter().enumerate() {
            if index.insert(tenant.clone(), position).is_some() {
                return Err(DatabaseError::configuration(format!(
                    "Duplicate tenant id '{}'",
                    tenant
                )));
            }
        }

        Ok(Self { sources, index })
    }

    pub fn lookup(&self, tenant: &TenantId) -> Option<&S> {
        self.index.get(tenant).map(|&position| &self.sources[position].1)
    }

    /// First source in configured order. Only for tenant-agnostic work such
    /// as schema introspection.
    pub fn any(&self) -> &S {
        &self.sources[0].1
    }

    pub fn contains(&self, tenant: &TenantId) -> bool {
        self.index.contains_key(tenant)
    }

    pub fn tenants(&self) -> impl Iterator<Item = &TenantId> {
        self.sources.iter().map(|(tenant, _)| tenant)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TenantId, &S)> {
        self.sources.iter().map(|(tenant, source)| (tenant, source))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Close every source. Called once at process shutdown.
    pub async fn close_all(&self) {
        for (tenant, source) in &self.sources {
            source.close().await;
            tracing::info!("Closed data source for tenant {}", tenant);
        }
    }
}

fn validate_entries(entries: &[TenantDataSourceConfig]) -> Result<Vec<TenantId>> {
    if entries.is_empty() {
        return Err(DatabaseError::configuration(
            "At least one tenant data source must be configured",
        ));
    }

    let mut seen = HashSet::with_capacity(entries.len());
    let mut tenants = Vec::with_capacity(entries.len());

    for (position, entry) in entries.iter().enumerate() {
        let tenant = TenantId::new(&entry.tenant_id).map_err(|e| {
            DatabaseError::configuration(format!(
                "Data source #{} has an invalid tenant id: {}",
                position + 1,
                e
            ))
        })?;

        if !seen.insert(tenant.clone()) {
            return Err(DatabaseError::configuration(format!(
                "Duplicate tenant id '{}'",
                tenant
            )));
        }

        if entry.url.trim().is_empty() {
            return Err(DatabaseError::configuration(format!(
                "Tenant {} has no database URL configured",
                tenant
            )));
        }

        entry.driver().map_err(|e| {
            DatabaseError::configuration(format!("Tenant {}: {}", tenant, e))
        })?;

        tenants.push(tenant);
    }

    Ok(tenants)
}
