use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use contracts::domain::a001_product::{Locale, ProductListResponse};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub lang: Option<String>,
}

/// GET /api/products?lang=en
///
/// Только опубликованные товары; поля без перевода берутся из zh.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> (StatusCode, Json<ProductListResponse>) {
    let locale = Locale::from_tag_or_default(query.lang.as_deref());

    match state.store.list_by_status(&state.published_status).await {
        Ok(records) => {
            let data = records.iter().map(|r| r.to_view(locale)).collect();
            (StatusCode::OK, Json(ProductListResponse::ok(data)))
        }
        Err(e) => {
            tracing::error!("Failed to load products: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ProductListResponse::failed(e.to_string())),
            )
        }
    }
}
