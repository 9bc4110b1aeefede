use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::catalog::{CatalogQuery, CatalogStatsResponse, EntityDetailResponse, EntityListResponse},
    error::AppError,
    services::catalog_service,
    state::SharedState,
};

/// Routes browsing the reference catalog.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/catalog", get(list_entities))
        .route("/catalog/entities/{id}", get(get_entity))
        .route("/catalog/stats", get(get_stats))
}

/// List entities, optionally filtered.
#[utoipa::path(
    get,
    path = "/catalog",
    tag = "catalog",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Matching entities", body = EntityListResponse)
    )
)]
pub async fn list_entities(
    State(state): State<SharedState>,
    Query(query): Query<CatalogQuery>,
) -> Json<EntityListResponse> {
    Json(catalog_service::list_entities(&state, &query))
}

/// Entity page with variants, hint windows and bonus clips.
#[utoipa::path(
    get,
    path = "/catalog/entities/{id}",
    tag = "catalog",
    params(("id" = String, Path, description = "Identifier of the entity")),
    responses(
        (status = 200, description = "Entity details", body = EntityDetailResponse),
        (status = 404, description = "Unknown entity")
    )
)]
pub async fn get_entity(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<EntityDetailResponse>, AppError> {
    let detail = catalog_service::entity_detail(&state, &id)?;
    Ok(Json(detail))
}

/// Catalog counters.
#[utoipa::path(
    get,
    path = "/catalog/stats",
    tag = "catalog",
    responses(
        (status = 200, description = "Catalog counters", body = CatalogStatsResponse)
    )
)]
pub async fn get_stats(State(state): State<SharedState>) -> Json<CatalogStatsResponse> {
    Json(catalog_service::stats(&state))
}
