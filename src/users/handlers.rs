use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{jwt::AuthUser, password::hash_password},
    error::{is_unique_violation, ApiError},
    state::AppState,
    users::{
        dto::{is_valid_email, CreateUserRequest, PublicUser, UpdateUserRequest},
        repo::User,
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/", get(list_users))
        .route("/user/create_user/", post(create_user))
        .route("/user/:id/", patch(update_user).delete(delete_user))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = User::list_active(&state.db).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(mut payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(ApiError::Validation("Name must not be empty".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Validation("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;

    // The pre-check races with concurrent registrations; the unique
    // constraint is the backstop and must not leak as a storage error.
    let user = User::create(
        &state.db,
        &payload.email,
        payload.first_name.trim(),
        payload.last_name.trim(),
        &hash,
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Validation("Email already registered".into())
        } else {
            ApiError::Internal(e)
        }
    })?;

    info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if let Some(email) = payload.email.as_mut() {
        *email = email.trim().to_lowercase();
        if !is_valid_email(email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
    }
    for name in [&payload.first_name, &payload.last_name].into_iter().flatten() {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("Name must not be empty".into()));
        }
    }

    let updated = User::update_profile(
        &state.db,
        id,
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        payload.email.as_deref(),
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Validation("Email already registered".into())
        } else {
            ApiError::Internal(e)
        }
    })?;

    let user = updated.ok_or_else(|| ApiError::NotFound("Object not found".into()))?;
    info!(user_id = %user.id, requester = %requester, "user updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let removed = User::delete(&state.db, id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("Object not found".into()));
    }
    info!(user_id = %id, requester = %requester, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
