use axum::extract::State;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::models::{CreateProduct, Product, UpdateProduct};

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
}

/// GET /admin/products - all products, inactive ones included.
pub async fn list_products(State(state): State<AppState>) -> Result<Json<ProductListResponse>> {
    let conn = state.db.get()?;
    let products = queries::list_products(&conn, true)?;
    Ok(Json(ProductListResponse { products }))
}

/// POST /admin/products - add a license tier.
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProduct>,
) -> Result<Json<Product>> {
    if input.name.is_empty() || input.license_type.is_empty() {
        return Err(AppError::BadRequest(
            "Name and license type are required".into(),
        ));
    }
    if input.price_cents < 0 {
        return Err(AppError::BadRequest("Price cannot be negative".into()));
    }

    let conn = state.db.get()?;
    let product = queries::create_product(&conn, &input)?;
    tracing::info!(product_id = %product.id, license_type = %product.license_type, "Product created");
    Ok(Json(product))
}

/// PUT /admin/products/{id} - partial update.
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(input): Json<UpdateProduct>,
) -> Result<Json<Product>> {
    let conn = state.db.get()?;

    if !queries::update_product(&conn, &product_id, &input)? {
        // No fields set, or no such product. Distinguish for the caller.
        if queries::get_product_by_id(&conn, &product_id)?.is_none() {
            return Err(AppError::NotFound("Product not found".into()));
        }
    }

    let product = queries::get_product_by_id(&conn, &product_id)?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    Ok(Json(product))
}

#[derive(Debug, Serialize)]
pub struct DeactivateProductResponse {
    pub success: bool,
    pub message: String,
}

/// DELETE /admin/products/{id} - deactivate, never delete.
///
/// Completed sales reference their product forever, so removal only takes
/// the tier off sale.
pub async fn deactivate_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<DeactivateProductResponse>> {
    let conn = state.db.get()?;

    if !queries::deactivate_product(&conn, &product_id)? {
        return Err(AppError::NotFound("Product not found".into()));
    }

    tracing::info!(product_id = %product_id, "Product deactivated");
    Ok(Json(DeactivateProductResponse {
        success: true,
        message: "Product deactivated".to_string(),
    }))
}
