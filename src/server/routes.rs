use axum::{
    extract::State,
    Json,
    http::StatusCode,
    response::Html,
};
use async_graphql::http::GraphiQLSource;
use serde::Serialize;
use crate::catalog::{Brand, Category, ProductListing};
use crate::query::graphql::STORAGE_UNAVAILABLE;
use crate::server::AppState;
use std::sync::Arc;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn unavailable(err: crate::Error) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!(error = %err, "catalog listing failed");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse { error: STORAGE_UNAVAILABLE.to_string() }),
    )
}

pub async fn graphql(
    State(state): State<Arc<AppState>>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    Json(state.schema.execute(request).await)
}

pub async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

pub async fn list_brands(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Brand>> {
    state.store.list_brands().await.map(Json).map_err(unavailable)
}

pub async fn list_categories(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Category>> {
    state.store.list_categories().await.map(Json).map_err(unavailable)
}

pub async fn list_products(State(state): State<Arc<AppState>>) -> ApiResult<Vec<ProductListing>> {
    state.store.list_products().await.map(Json).map_err(unavailable)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
