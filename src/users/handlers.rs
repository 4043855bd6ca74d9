use axum::{
    extract::State,
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    error::ApiError,
    state::AppState,
    users::{
        dto::{NameChanges, NewUser},
        extractors::{JsonBody, LoadedUser},
        repo::User,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(list_users).post(create_user).fallback(not_found),
        )
        .route(
            "/users/:id",
            get(get_user)
                .put(replace_user)
                .patch(update_user)
                .delete(delete_user)
                .fallback(not_found),
        )
}

/// Unrouted methods on a known path look like an unknown path.
async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = User::list_all(&state.db).await?;
    Ok(Json(users))
}

pub async fn get_user(LoadedUser(user): LoadedUser) -> Json<User> {
    Json(user)
}

#[instrument(skip(state, body))]
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, ApiError> {
    let new_user = NewUser::from_body(&body, OffsetDateTime::now_utc())?;
    let user = User::insert(&state.db, &new_user).await?;

    info!(user_id = user.id, email = %user.email, "user created");
    Ok((
        StatusCode::CREATED,
        [(LOCATION, format!("/users/{}", user.id))],
        Json(user),
    ))
}

/// PUT replaces both names; absent or falsy values clear them.
#[instrument(skip(state, user, body), fields(user_id = user.id))]
pub async fn replace_user(
    State(state): State<AppState>,
    LoadedUser(mut user): LoadedUser,
    JsonBody(body): JsonBody,
) -> Result<Json<User>, ApiError> {
    let changes = NameChanges::from_body(&body)?;
    user.forename = changes.forename;
    user.surname = changes.surname;

    save(&state, user).await
}

/// PATCH only overwrites names that carry a truthy value.
#[instrument(skip(state, user, body), fields(user_id = user.id))]
pub async fn update_user(
    State(state): State<AppState>,
    LoadedUser(mut user): LoadedUser,
    JsonBody(body): JsonBody,
) -> Result<Json<User>, ApiError> {
    let changes = NameChanges::from_body(&body)?;
    if let Some(forename) = changes.forename {
        user.forename = Some(forename);
    }
    if let Some(surname) = changes.surname {
        user.surname = Some(surname);
    }

    save(&state, user).await
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    LoadedUser(user): LoadedUser,
) -> Result<StatusCode, ApiError> {
    let id = user.id;
    user.delete(&state.db).await?;
    info!(user_id = id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn save(state: &AppState, user: User) -> Result<Json<User>, ApiError> {
    // Row deleted between load and save.
    let saved = user.save(&state.db).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(saved))
}
