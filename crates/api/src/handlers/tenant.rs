use crate::handlers::{database_error, ErrorResponse};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentTenantResponse {
    pub tenant_id: String,
    pub database: String,
}

/// Report which tenant and physical database the request was routed to
/// GET /api/tenant/current
pub async fn current_tenant(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CurrentTenantResponse>, (StatusCode, Json<ErrorResponse>)> {
    let tenant = state.router.current_tenant();
    let mut conn = state
        .router
        .acquire_connection()
        .await
        .map_err(database_error)?;

    let database: String = sqlx::query_scalar("SELECT current_database()")
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| database_error(e.into()))?;

    Ok(Json(CurrentTenantResponse {
        tenant_id: tenant.to_string(),
        database,
    }))
}

#[cfg(test)]
mod tests {
    use crate::routes::create_router;
    use crate::AppState;
    use axum::{body::Body, http::{Request, StatusCode}};
    use mt_database::{
        ConnectionRouter, DataSourceRegistry, PgDataSource, PoolSettings, TenantDataSourceConfig,
    };
    use mt_tenant::ContextTenantResolver;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn lazy_router() -> ConnectionRouter<PgDataSource> {
        let entries: Vec<_> = [
            ("tenant_1", "postgres://localhost:5432/tenant_one"),
            ("tenant_2", "postgres://localhost:5432/tenant_two"),
        ]
        .iter()
        .map(|(id, url)| TenantDataSourceConfig::new(id, url, "app", "secret"))
        .collect();
        let settings = PoolSettings {
            connect_eagerly: false,
            min_connections: 0,
            ..Default::default()
        };
        let registry = DataSourceRegistry::build_all(&entries, &settings).await.unwrap();
        ConnectionRouter::with_registry(ContextTenantResolver::default(), registry)
    }

    async fn get(
        router: ConnectionRouter<PgDataSource>,
        uri: &str,
        tenant: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let app = create_router(Arc::new(AppState { router }));
        let mut request = Request::builder().uri(uri);
        if let Some(tenant) = tenant {
            request = request.header(crate::middleware::TENANT_HEADER, tenant);
        }

        let response = app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_not_ready_router_is_unavailable() {
        let router = ConnectionRouter::new(ContextTenantResolver::default());
        let (status, body) = get(router, "/api/tenant/current", Some("tenant_1")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "not_ready");
    }

    #[tokio::test]
    async fn test_unknown_tenant_is_not_found() {
        let router = lazy_router().await;
        let (status, body) = get(router, "/api/tenant/current", Some("tenant_9")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown_tenant");
    }

    #[tokio::test]
    async fn test_health_reports_tenant_count() {
        let (status, body) = get(lazy_router().await, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["tenants"], 2);

        let router = ConnectionRouter::new(ContextTenantResolver::default());
        let (_, body) = get(router, "/health", None).await;
        assert_eq!(body["status"], "starting");
    }
}
