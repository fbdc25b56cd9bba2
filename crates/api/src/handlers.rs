pub mod health;
pub mod tenant;

use axum::{http::StatusCode, Json};
use mt_database::DatabaseError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

/// Map a routing failure to an HTTP response. An unknown tenant is reported
/// as such and never answered from another tenant's database.
pub fn database_error(err: DatabaseError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &err {
        DatabaseError::UnknownTenant(_) => (StatusCode::NOT_FOUND, "unknown_tenant"),
        DatabaseError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, "not_ready"),
        DatabaseError::Connection(_) => (StatusCode::SERVICE_UNAVAILABLE, "database_unavailable"),
        DatabaseError::Configuration(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
        }
    };

    tracing::error!("Tenant routing failed: {}", err);
    (status, Json(ErrorResponse::new(code, &err.to_string())))
}
