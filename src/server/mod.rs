use axum::{
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::query::{CatalogSchema, StoreHandle, build_schema};

pub mod routes;

/// Server state
pub struct AppState {
    pub store: StoreHandle,
    pub schema: CatalogSchema,
}

impl AppState {
    pub fn new(store: StoreHandle) -> Self {
        let schema = build_schema(store.clone());
        Self { store, schema }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/graphql", get(routes::graphiql).post(routes::graphql))
        .route("/brands", get(routes::list_brands))
        .route("/categories", get(routes::list_categories))
        .route("/products", get(routes::list_products))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(addr: SocketAddr, store: StoreHandle) -> anyhow::Result<()> {
    let database = store.database_path().display().to_string();
    let app = router(Arc::new(AppState::new(store)));

    tracing::info!(%addr, %database, "starting catalog server");
    crate::ui::success(&format!("Catalog serving GraphQL at http://{addr}/graphql"));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
