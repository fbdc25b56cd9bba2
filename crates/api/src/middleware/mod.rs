pub mod tenant;

pub use tenant::{tenant_context, TENANT_HEADER};
