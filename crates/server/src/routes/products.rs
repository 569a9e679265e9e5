use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use service::record::{patch_from_value, CreatePayload, Created, Record};
use tracing::debug;

use crate::errors::JsonApiError;
use crate::routes::ServerState;

/// Ids that do not parse as a positive integer cannot match any record.
fn parse_id(raw: &str) -> Result<u64, JsonApiError> {
    match raw.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => {
            debug!(id = %raw, "unparsable product id");
            Err(JsonApiError::not_found())
        }
    }
}

#[utoipa::path(
    get, path = "/products", tag = "products",
    responses(
        (status = 200, description = "All products in stored order"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn list_products(State(state): State<ServerState>) -> Result<Json<Vec<Record>>, JsonApiError> {
    Ok(Json(state.products.list().await?))
}

#[utoipa::path(
    get, path = "/products/{id}", tag = "products",
    params(("id" = u64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "OK"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_product(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Record>, JsonApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.products.get(id).await?))
}

#[utoipa::path(
    post, path = "/products", tag = "products",
    responses(
        (status = 201, description = "Created product(s) with assigned ids"),
        (status = 400, description = "Validation Error"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn create_product(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Created>), JsonApiError> {
    let payload = CreatePayload::try_from(body)?;
    let created = state.products.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put, path = "/products/{id}", tag = "products",
    params(("id" = u64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Updated"),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Not Found"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn update_product(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Record>, JsonApiError> {
    let id = parse_id(&id)?;
    let patch = patch_from_value(body)?;
    Ok(Json(state.products.update(id, patch).await?))
}

#[utoipa::path(
    delete, path = "/products/{id}", tag = "products",
    params(("id" = u64, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn delete_product(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, JsonApiError> {
    let id = parse_id(&id)?;
    state.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
