use crate::handlers::ErrorResponse;
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use mt_tenant::{TenantContext, TenantError};

/// Tenant claim forwarded by the authenticating proxy
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Run the rest of the request inside its own tenant scope.
///
/// The scope ends with the request future, so the tenant is gone once the
/// response is produced, the handler fails, or the client disconnects.
/// Requests without a tenant claim run with an empty context and route to
/// the default tenant.
pub async fn tenant_context(request: Request, next: Next) -> Response {
    TenantContext::scope(async move {
        if let Some(value) = request.headers().get(TENANT_HEADER) {
            let applied = value
                .to_str()
                .map_err(|_| {
                    TenantError::InvalidArgument("tenant header is not valid UTF-8".to_string())
                })
                .and_then(TenantContext::set);

            if let Err(e) = applied {
                tracing::warn!("Rejected tenant claim: {}", e);
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new("invalid_tenant", &e.to_string())),
                )
                    .into_response();
            }
        }

        next.run(request).await
    })
    .await
}
