//! HTTP surface: axum router, bearer-token authentication and the shared
//! application state.
//!
//! Error responses are a uniform `{"error": "..."}` body. Cross-team
//! access and role violations are returned as 404 so callers cannot
//! distinguish them from an absent row.

pub mod handlers;

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::storage::{SqliteStorage, Storage, TeamMember, TeamRole, User};

/// Shared application state
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// SQLite storage backend
    pub storage: SqliteStorage,
}

/// Thread-safe shared state
pub type SharedState = Arc<AppState>;

/// Uniform error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

/// Uniform body for delete-style operations
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    /// Always true; errors use [`ErrorResponse`]
    pub success: bool,
}

impl SuccessResponse {
    /// The canonical success body
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation { .. } | ApiError::BadId { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// The authenticated caller, resolved from the `Authorization: Bearer`
/// header against the sessions table.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated)?;

        let user = state
            .storage
            .get_session_user(token)
            .await
            .map_err(ApiError::from)?
            .ok_or(ApiError::Unauthenticated)?;

        Ok(CurrentUser(user))
    }
}

/// Reject malformed path/body ids before any store access.
pub fn parse_id(id: &str) -> ApiResult<()> {
    Uuid::parse_str(id).map_err(|_| ApiError::BadId { id: id.to_string() })?;
    Ok(())
}

/// The caller's membership in a team, or the indistinct not-found.
pub async fn require_member(
    state: &AppState,
    user: &User,
    team_id: &str,
) -> ApiResult<TeamMember> {
    state
        .storage
        .get_member(team_id, &user.id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)
}

/// Like [`require_member`], but the membership must carry the owner role.
pub async fn require_owner(state: &AppState, user: &User, team_id: &str) -> ApiResult<TeamMember> {
    let member = require_member(state, user, team_id).await?;
    if member.role != TeamRole::Owner {
        return Err(ApiError::NotFound);
    }
    Ok(member)
}

/// Build the application router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/auth/signup", post(handlers::signup))
        .route("/api/teams", get(handlers::list_teams).post(handlers::create_team))
        .route(
            "/api/teams/:id",
            get(handlers::get_team)
                .put(handlers::rename_team)
                .delete(handlers::delete_team),
        )
        .route("/api/teams/:id/members", get(handlers::list_members))
        .route(
            "/api/teams/:id/members/:user_id",
            delete(handlers::remove_member),
        )
        .route(
            "/api/invites",
            get(handlers::list_invites).post(handlers::create_invite),
        )
        .route("/api/invites/:id/accept", post(handlers::accept_invite))
        .route("/api/invites/:id", delete(handlers::cancel_invite))
        .route(
            "/api/story-maps",
            get(handlers::list_story_maps).post(handlers::create_story_map),
        )
        .route(
            "/api/story-maps/:id",
            get(handlers::get_story_map)
                .put(handlers::rename_story_map)
                .delete(handlers::delete_story_map),
        )
        .route(
            "/api/personas",
            post(handlers::create_persona).put(handlers::reorder_personas),
        )
        .route(
            "/api/personas/:id",
            get(handlers::get_persona)
                .put(handlers::update_persona)
                .delete(handlers::delete_persona),
        )
        .route(
            "/api/personas/:id/links/:kind/:target_id",
            put(handlers::link_persona).delete(handlers::unlink_persona),
        )
        .route(
            "/api/activities",
            post(handlers::create_activity).put(handlers::reorder_activities),
        )
        .route(
            "/api/activities/:id",
            get(handlers::get_activity)
                .put(handlers::rename_activity)
                .delete(handlers::delete_activity),
        )
        .route(
            "/api/tasks",
            post(handlers::create_task).put(handlers::reorder_tasks),
        )
        .route(
            "/api/tasks/:id",
            get(handlers::get_task)
                .put(handlers::rename_task)
                .delete(handlers::delete_task),
        )
        .route(
            "/api/releases",
            post(handlers::create_release).put(handlers::reorder_releases),
        )
        .route(
            "/api/releases/:id",
            get(handlers::get_release)
                .put(handlers::rename_release)
                .delete(handlers::delete_release),
        )
        .route(
            "/api/stories",
            post(handlers::create_story).put(handlers::reorder_stories),
        )
        .route(
            "/api/stories/:id",
            get(handlers::get_story)
                .put(handlers::update_story)
                .delete(handlers::delete_story),
        )
        .with_state(state)
}
