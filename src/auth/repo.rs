use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

/// Blacklist a refresh token by its jti. Revoking an already-revoked
/// token is a no-op, not an error.
pub async fn revoke(
    db: &PgPool,
    jti: Uuid,
    user_id: Uuid,
    expires_at: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO revoked_tokens (jti, user_id, expires_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (jti) DO NOTHING
        "#,
    )
    .bind(jti)
    .bind(user_id)
    .bind(expires_at)
    .execute(db)
    .await?;
    Ok(())
}

/// Check whether a refresh token's jti has been blacklisted.
pub async fn is_revoked(db: &PgPool, jti: Uuid) -> anyhow::Result<bool> {
    let row: Option<(Uuid,)> =
        sqlx::query_as(r#"SELECT jti FROM revoked_tokens WHERE jti = $1"#)
            .bind(jti)
            .fetch_optional(db)
            .await?;
    Ok(row.is_some())
}
