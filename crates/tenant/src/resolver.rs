use crate::context::TenantContext;
use crate::id::TenantId;

/// Tenant used when no tenant context is present (startup, background jobs,
/// requests that have not authenticated yet).
pub const DEFAULT_TENANT_ID: &str = "tenant_1";

/// Decides which tenant the current persistence operation routes to.
pub trait TenantIdentifierResolver: Send + Sync {
    /// Never fails: falls back to a default tenant when nothing is set.
    fn resolve_current_tenant(&self) -> TenantId;

    /// Whether a session opened for a previously resolved tenant may be
    /// reused for the current operation.
    fn validate_existing_sessions(&self) -> bool;
}

/// Production resolver backed by [`TenantContext`].
#[derive(Debug, Clone)]
pub struct ContextTenantResolver {
    default_tenant: TenantId,
    validate_existing_sessions: bool,
}

impl ContextTenantResolver {
    pub fn new(default_tenant: TenantId) -> Self {
        Self {
            default_tenant,
            validate_existing_sessions: true,
        }
    }

    pub fn with_session_validation(mut self, enabled: bool) -> Self {
        self.validate_existing_sessions = enabled;
        self
    }

    pub fn default_tenant(&self) -> &TenantId {
        &self.default_tenant
    }
}

impl Default for ContextTenantResolver {
    fn default() -> Self {
        Self::new(TenantId::from_static(DEFAULT_TENANT_ID))
    }
}

impl TenantIdentifierResolver for ContextTenantResolver {
    fn resolve_current_tenant(&self) -> TenantId {
        match TenantContext::get() {
            Some(tenant) => tenant,
            None => {
                tracing::trace!(
                    "No tenant in context, using default tenant {}",
                    self.default_tenant
                );
                self.default_tenant.clone()
            }
        }
    }

    fn validate_existing_sessions(&self) -> bool {
        self.validate_existing_sessions
    }
}

/// Resolver that ignores the context. Useful for jobs pinned to one tenant
/// and as a test double.
#[derive(Debug, Clone)]
pub struct FixedTenantResolver {
    tenant: TenantId,
}

impl FixedTenantResolver {
    pub fn new(tenant: TenantId) -> Self {
        Self { tenant }
    }
}

impl TenantIdentifierResolver for FixedTenantResolver {
    fn resolve_current_tenant(&self) -> TenantId {
        self.tenant.clone()
    }

    fn validate_existing_sessions(&self) -> bool {
        true
    }
}
