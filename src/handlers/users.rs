use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    entities::app_user::UserRole,
    errors::ApiError,
    handlers::AppState,
    services::users::{NewUser, UserUpdate},
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    /// `ADMIN` or `CLERK`; defaults to `CLERK`.
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub role: Option<String>,
}

fn parse_role(raw: &str) -> Result<UserRole, ApiError> {
    UserRole::from_str(raw).map_err(|_| {
        ApiError::BadRequest(format!(
            "Unknown user role '{}'; expected ADMIN or CLERK",
            raw
        ))
    })
}

/// Create a registering user
async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let role = match payload.role.as_deref() {
        Some(raw) => parse_role(raw)?,
        None => UserRole::Clerk,
    };

    let user = state
        .services
        .users
        .create_user(NewUser {
            name: payload.name,
            role,
        })
        .await
        .map_err(map_service_error)?;

    info!("User created: {}", user.id);

    Ok(created_response(user))
}

/// Get a user by ID
async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .services
        .users
        .get_user(user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(user))
}

/// List all users
async fn list_users(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .services
        .users
        .list_users()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(users))
}

/// Update a user
async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let role = match payload.role.as_deref() {
        Some(raw) => Some(parse_role(raw)?),
        None => None,
    };

    let user = state
        .services
        .users
        .update_user(
            user_id,
            UserUpdate {
                name: payload.name,
                role,
            },
        )
        .await
        .map_err(map_service_error)?;

    info!("User updated: {}", user_id);

    Ok(success_response(user))
}

/// Delete a user; their purchase and adjustment references null out
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .users
        .delete_user(user_id)
        .await
        .map_err(map_service_error)?;

    info!("User deleted: {}", user_id);

    Ok(no_content_response())
}

/// Creates the router for user endpoints
pub fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_user))
        .route("/", get(list_users))
        .route("/:id", get(get_user))
        .route("/:id", put(update_user))
        .route("/:id", delete(delete_user))
}
