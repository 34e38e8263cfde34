use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Product record in the database. `user_id` is the owner and never
/// changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub image: Option<String>, // storage key, not a URL
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

const COLUMNS: &str = "id, user_id, name, description, price, stock, image, is_active, created_at";

impl Product {
    pub async fn list_active(db: &PgPool) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM products WHERE is_active ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_active(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM products WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn create(
        db: &PgPool,
        owner: Uuid,
        name: &str,
        description: &str,
        price: Decimal,
        stock: i32,
        image: Option<&str>,
    ) -> anyhow::Result<Product> {
        let row = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (user_id, name, description, price, stock, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(owner)
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(stock)
        .bind(image)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Partial update of the mutable fields; the owner column is not
    /// touchable through this query. Returns None when the product does
    /// not exist or is inactive.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        price: Option<Decimal>,
        stock: Option<i32>,
    ) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
               SET name        = COALESCE($2, name),
                   description = COALESCE($3, description),
                   price       = COALESCE($4, price),
                   stock       = COALESCE($5, stock)
             WHERE id = $1 AND is_active
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(stock)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Take one unit of stock in a single conditional update, so two
    /// concurrent buyers of the last unit cannot both succeed. Returns
    /// the remaining stock, or None when no row qualified (absent,
    /// inactive, or already empty).
    pub async fn take_one(db: &PgPool, id: Uuid) -> anyhow::Result<Option<i32>> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE products
               SET stock = stock - 1
             WHERE id = $1 AND is_active AND stock > 0
            RETURNING stock
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row.map(|(stock,)| stock))
    }
}
