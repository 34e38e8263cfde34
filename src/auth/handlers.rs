use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, RefreshRequest,
            RefreshResponse,
        },
        jwt::{JwtKeys, TokenError},
        password::verify_password,
        repo,
    },
    error::ApiError,
    state::AppState,
    users::{dto::is_valid_email, repo::User},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/authentication/login/", post(login))
        .route("/authentication/logout/", post(logout))
        .route("/authentication/refresh_token/", post(refresh_token))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }

    // Lookup miss, inactive account and password mismatch all surface the
    // same generic 401; only the logs tell them apart.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::AuthenticationFailed);
        }
    };

    if !user.is_active {
        warn!(user_id = %user.id, "login on inactive account");
        return Err(ApiError::AuthenticationFailed);
    }

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::AuthenticationFailed);
    }

    let keys = JwtKeys::from_ref(&state);
    let access = keys.sign_access(user.id)?;
    let refresh = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        refresh,
        access,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn logout(
    State(state): State<AppState>,
    payload: Option<Json<LogoutRequest>>,
) -> Result<Json<LogoutResponse>, ApiError> {
    let token = payload
        .map(|Json(p)| p)
        .unwrap_or_default()
        .refresh_token
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        // No token, nothing to revoke.
        return Ok(Json(LogoutResponse::ok()));
    };

    let keys = JwtKeys::from_ref(&state);
    match keys.verify_refresh(&token) {
        Ok(claims) => {
            repo::revoke(&state.db, claims.jti, claims.sub, claims.expires_at()).await?;
            info!(user_id = %claims.sub, jti = %claims.jti, "refresh token revoked");
        }
        Err(e) => {
            // A token we cannot verify cannot mint access tokens either;
            // logout still succeeds for the caller.
            warn!(error = %e, "logout with unusable refresh token");
        }
    }

    Ok(Json(LogoutResponse::ok()))
}

#[instrument(skip(state, payload))]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh)?;

    if repo::is_revoked(&state.db, claims.jti).await? {
        warn!(user_id = %claims.sub, jti = %claims.jti, "refresh with blacklisted token");
        return Err(TokenError::Blacklisted.into());
    }

    let access = keys.sign_access(claims.sub)?;
    Ok(Json(RefreshResponse { access }))
}
