use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    products::{
        dto::{BuyResponse, ProductResponse, UpdateProductRequest},
        repo::Product,
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/product/", get(list_products))
        .route(
            "/product/:id/",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/product/create_product/", post(create_product))
        .route("/product/:id/buy/", post(buy_product))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB, image uploads
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = Product::list_active(&state.db).await?;
    let items = products
        .into_iter()
        .map(|p| ProductResponse::from_product(p, state.storage.as_ref()))
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = Product::find_active(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found.".into()))?;
    Ok(Json(ProductResponse::from_product(
        product,
        state.storage.as_ref(),
    )))
}

/// POST /product/create_product/ (multipart)
/// Text fields: name, description, price, stock. Optional file field: image.
#[instrument(skip(state, mp))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let mut name: Option<String> = None;
    let mut description: Option<String> = None;
    let mut price: Option<Decimal> = None;
    let mut stock: Option<i32> = None;
    let mut image: Option<(Bytes, String)> = None;

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let field_name = field.name().map(|s| s.to_string());
        match field_name.as_deref() {
            Some("name") => name = Some(read_text(field).await?),
            Some("description") => description = Some(read_text(field).await?),
            Some("price") => {
                let raw = read_text(field).await?;
                let parsed = raw.trim().parse::<Decimal>().map_err(|_| {
                    ApiError::Validation("price must be a decimal number".into())
                })?;
                price = Some(parsed);
            }
            Some("stock") => {
                let raw = read_text(field).await?;
                let parsed = raw.trim().parse::<i32>().map_err(|_| {
                    ApiError::Validation("stock must be an integer".into())
                })?;
                stock = Some(parsed);
            }
            Some("image") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let data = field.bytes().await.map_err(|e| {
                    ApiError::Validation(format!("Unreadable image field: {e}"))
                })?;
                if !data.is_empty() {
                    image = Some((data, content_type));
                }
            }
            _ => {}
        }
    }

    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("name is required".into()))?;
    let description =
        description.ok_or_else(|| ApiError::Validation("description is required".into()))?;
    let price = price.ok_or_else(|| ApiError::Validation("price is required".into()))?;
    let stock = stock.ok_or_else(|| ApiError::Validation("stock is required".into()))?;

    if price < Decimal::ZERO {
        return Err(ApiError::Validation("Price must not be negative".into()));
    }
    if stock < 0 {
        return Err(ApiError::Validation("Stock must not be negative".into()));
    }

    let image_key = match image {
        Some((body, content_type)) => {
            let ext = ext_from_mime(&content_type).unwrap_or("bin");
            let key = format!("product_image/{}.{}", Uuid::new_v4(), ext);
            state.storage.put_object(&key, body).await?;
            Some(key)
        }
        None => None,
    };

    let product = Product::create(
        &state.db,
        user_id,
        &name,
        &description,
        price,
        stock,
        image_key.as_deref(),
    )
    .await?;

    info!(product_id = %product.id, owner = %user_id, "product created");
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::from_product(product, state.storage.as_ref())),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    payload.validate()?;

    let product = Product::find_active(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found.".into()))?;

    if product.user_id != user_id {
        warn!(product_id = %id, owner = %product.user_id, requester = %user_id, "update denied");
        return Err(ApiError::PermissionDenied(
            "You do not have permission to update this product.".into(),
        ));
    }

    let updated = Product::update(
        &state.db,
        id,
        payload.name.as_deref().map(str::trim),
        payload.description.as_deref(),
        payload.price,
        payload.stock,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Product not found.".into()))?;

    info!(product_id = %id, owner = %user_id, "product updated");
    Ok(Json(ProductResponse::from_product(
        updated,
        state.storage.as_ref(),
    )))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let product = Product::find_active(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found.".into()))?;

    if product.user_id != user_id {
        warn!(product_id = %id, owner = %product.user_id, requester = %user_id, "delete denied");
        return Err(ApiError::PermissionDenied(
            "You do not have permission to delete this product.".into(),
        ));
    }

    // Remove the stored image first; a stray file is acceptable, a
    // dangling key pointing at nothing is not worth failing the delete.
    if let Some(key) = &product.image {
        if let Err(e) = state.storage.delete_object(key).await {
            warn!(error = %e, key = %key, "product image delete failed");
        }
    }

    Product::delete(&state.db, id).await?;
    info!(product_id = %id, owner = %user_id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn buy_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BuyResponse>, ApiError> {
    if let Some(remaining) = Product::take_one(&state.db, id).await? {
        info!(product_id = %id, buyer = %user_id, remaining, "product purchased");
        return Ok(Json(BuyResponse::purchased(remaining)));
    }

    // The conditional update touched nothing: either the product is gone
    // or its stock already hit zero.
    match Product::find_active(&state.db, id).await? {
        Some(_) => Err(ApiError::OutOfStock),
        None => Err(ApiError::NotFound("Product not found.".into())),
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::Validation(format!("Unreadable field: {e}")))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/gif"), Some("gif"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("whatever/else"), None);
    }
}
