use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, products::repo::Product, storage::StorageClient};

/// Product as returned to clients. `user` is the owner's ID; `image` is
/// a servable URL, not the raw storage key.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub image: Option<String>,
}

impl ProductResponse {
    pub fn from_product(p: Product, storage: &dyn StorageClient) -> Self {
        Self {
            id: p.id,
            user: p.user_id,
            name: p.name,
            description: p.description,
            price: p.price,
            stock: p.stock,
            image: p.image.map(|key| storage.public_url(&key)),
        }
    }
}

/// JSON body for partial product update. Owner and id are not updatable.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
}

impl UpdateProductRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ApiError::Validation("Name must not be empty".into()));
            }
        }
        if let Some(price) = self.price {
            if price < Decimal::ZERO {
                return Err(ApiError::Validation("Price must not be negative".into()));
            }
        }
        if let Some(stock) = self.stock {
            if stock < 0 {
                return Err(ApiError::Validation("Stock must not be negative".into()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct BuyResponse {
    pub status: String,
    pub remaining_stock: i32,
}

impl BuyResponse {
    pub fn purchased(remaining_stock: i32) -> Self {
        Self {
            status: "Product purchased".into(),
            remaining_stock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(price: Option<&str>, stock: Option<i32>, name: Option<&str>) -> UpdateProductRequest {
        UpdateProductRequest {
            name: name.map(Into::into),
            description: None,
            price: price.map(|p| p.parse().unwrap()),
            stock,
        }
    }

    #[test]
    fn empty_update_is_valid() {
        assert!(update(None, None, None).validate().is_ok());
    }

    #[test]
    fn rejects_negative_price() {
        assert!(update(Some("-0.01"), None, None).validate().is_err());
        assert!(update(Some("0"), None, None).validate().is_ok());
        assert!(update(Some("19.99"), None, None).validate().is_ok());
    }

    #[test]
    fn rejects_negative_stock() {
        assert!(update(None, Some(-1), None).validate().is_err());
        assert!(update(None, Some(0), None).validate().is_ok());
    }

    #[test]
    fn rejects_blank_name() {
        assert!(update(None, None, Some("  ")).validate().is_err());
        assert!(update(None, None, Some("Widget")).validate().is_ok());
    }

    #[test]
    fn buy_response_shape() {
        let json = serde_json::to_string(&BuyResponse::purchased(4)).unwrap();
        assert!(json.contains("\"status\":\"Product purchased\""));
        assert!(json.contains("\"remaining_stock\":4"));
    }
}
