// Tenant resolution for request handling
// Carries the current tenant from the authentication boundary down to the
// persistence layer without threading it through every call.

pub mod context;
pub mod error;
pub mod id;
pub mod resolver;

pub use context::TenantContext;
pub use error::{Result, TenantError};
pub use id::TenantId;
pub use resolver::{
    ContextTenantResolver, FixedTenantResolver, TenantIdentifierResolver, DEFAULT_TENANT_ID,
};
