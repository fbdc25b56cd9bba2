use thiserror::Error;

pub type Result<T> = std::result::Result<T, TenantError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantError {
    #[error("Invalid tenant identifier: {0}")]
    InvalidArgument(String),

    #[error("No tenant scope is active for the current task or thread")]
    NoScope,
}
