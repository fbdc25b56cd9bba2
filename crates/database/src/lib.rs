pub mod config;
pub mod error;
pub mod registry;
pub mod router;
pub mod source;

pub use self::config::{
    redact_url, DriverKind, MultitenancyConfig, PoolSettings, TenantDataSourceConfig,
};
pub use error::{DatabaseError, Result};
pub use registry::DataSourceRegistry;
pub use router::ConnectionRouter;
pub use source::{ConnectionSource, PgDataSource};
