//! Request handlers for the HTTP API.
//!
//! Every handler follows the same shape: validate path/body ids, resolve
//! the entity's owning team, check the caller's membership, then call the
//! store. Authorization failures surface as the indistinct 404.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    parse_id, require_member, require_owner, AppState, CurrentUser, SharedState, SuccessResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::storage::{
    Activity, Persona, PersonaLinkKind, PersonaPatch, Release, SessionToken, Story, StoryMap,
    StoryMapTree, StoryPatch, StoryStatus, Storage, Task, Team, TeamInvite, TeamMember, User,
};

fn non_empty(value: &str, field: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Membership check against an already-resolved owning team. A missing
/// team means the entity does not exist; both cases collapse to 404.
async fn member_of(state: &AppState, user: &User, team: Option<String>) -> ApiResult<String> {
    let team = team.ok_or(ApiError::NotFound)?;
    require_member(state, user, &team).await?;
    Ok(team)
}

// Health

/// Liveness probe, open to unauthenticated callers
pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// Auth

/// Parameters for signup
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    /// Email address, unique across users
    pub email: String,
    /// Name shown in member lists
    pub display_name: String,
}

/// Response from signup
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    /// The created user
    pub user: User,
    /// Bearer token for subsequent requests
    pub token: String,
}

/// Provision a user and a session token. Identity verification proper is
/// an external collaborator; this endpoint is the minimal local stand-in
/// that makes the store operable.
pub async fn signup(
    State(state): State<SharedState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Json<SignupResponse>> {
    non_empty(&req.email, "email")?;
    non_empty(&req.display_name, "display_name")?;
    if !req.email.contains('@') {
        return Err(ApiError::validation("email must be an address"));
    }

    if state
        .storage
        .get_user_by_email(&req.email)
        .await
        .map_err(ApiError::from)?
        .is_some()
    {
        return Err(ApiError::validation("email already registered"));
    }

    let user = User::new(req.email, req.display_name);
    state
        .storage
        .create_user(&user)
        .await
        .map_err(ApiError::from)?;

    let session = SessionToken::new(&user.id);
    state
        .storage
        .create_session(&session)
        .await
        .map_err(ApiError::from)?;

    info!(user_id = %user.id, "user signed up");

    Ok(Json(SignupResponse {
        user,
        token: session.token,
    }))
}

// Teams

/// Parameters for team creation
#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    /// Team name
    pub name: String,
}

/// Shared body for the rename-style updates
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    /// The new name
    pub name: String,
}

/// List the caller's teams
pub async fn list_teams(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Team>>> {
    let teams = state
        .storage
        .list_user_teams(&user.id)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(teams))
}

/// Create a team with the caller as its owner
pub async fn create_team(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateTeamRequest>,
) -> ApiResult<Json<Team>> {
    non_empty(&req.name, "name")?;

    let team = Team::new(req.name);
    state
        .storage
        .create_team(&team, &user.id)
        .await
        .map_err(ApiError::from)?;

    info!(team_id = %team.id, "team created");
    Ok(Json(team))
}

/// Fetch one team the caller belongs to
pub async fn get_team(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Team>> {
    parse_id(&id)?;
    require_member(&state, &user, &id).await?;

    let team = state
        .storage
        .get_team(&id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(team))
}

/// Rename a team, owner only
pub async fn rename_team(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<Json<Team>> {
    parse_id(&id)?;
    non_empty(&req.name, "name")?;
    require_owner(&state, &user, &id).await?;

    let team = state
        .storage
        .rename_team(&id, &req.name)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(team))
}

/// Delete a team and everything under it, owner only
pub async fn delete_team(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    parse_id(&id)?;
    require_owner(&state, &user, &id).await?;

    state
        .storage
        .delete_team(&id)
        .await
        .map_err(ApiError::from)?;

    info!(team_id = %id, "team deleted");
    Ok(SuccessResponse::ok())
}

/// List a team's members
pub async fn list_members(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<TeamMember>>> {
    parse_id(&id)?;
    require_member(&state, &user, &id).await?;

    let members = state
        .storage
        .list_members(&id)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(members))
}

/// Remove a member from a team, owner only
pub async fn remove_member(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path((id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<SuccessResponse>> {
    parse_id(&id)?;
    parse_id(&user_id)?;
    require_owner(&state, &user, &id).await?;

    state
        .storage
        .remove_member(&id, &user_id)
        .await
        .map_err(ApiError::from)?;
    Ok(SuccessResponse::ok())
}

// Invites

/// Parameters for invite creation
#[derive(Debug, Deserialize)]
pub struct CreateInviteRequest {
    /// The team the invite is for
    pub team_id: String,
    /// Email address being invited
    pub email: String,
}

/// Query string for the team-scoped list endpoints
#[derive(Debug, Deserialize)]
pub struct TeamIdQuery {
    /// The team to list for
    pub team_id: String,
}

/// Invite an email address to a team, owner only
pub async fn create_invite(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateInviteRequest>,
) -> ApiResult<Json<TeamInvite>> {
    parse_id(&req.team_id)?;
    non_empty(&req.email, "email")?;
    require_owner(&state, &user, &req.team_id).await?;

    let invite = TeamInvite::new(&req.team_id, req.email, &user.id);
    state
        .storage
        .create_invite(&invite)
        .await
        .map_err(ApiError::from)?;

    info!(invite_id = %invite.id, team_id = %invite.team_id, "invite created");
    Ok(Json(invite))
}

/// List a team's invites
pub async fn list_invites(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<TeamIdQuery>,
) -> ApiResult<Json<Vec<TeamInvite>>> {
    parse_id(&query.team_id)?;
    require_member(&state, &user, &query.team_id).await?;

    let invites = state
        .storage
        .list_team_invites(&query.team_id)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(invites))
}

/// Accepting is keyed on the caller's email matching the invite; a
/// mismatch is indistinguishable from a missing invite.
pub async fn accept_invite(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<TeamInvite>> {
    parse_id(&id)?;

    let invite = state
        .storage
        .get_invite(&id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;

    if !invite.email.eq_ignore_ascii_case(&user.email) {
        return Err(ApiError::NotFound);
    }

    let accepted = state
        .storage
        .accept_invite(&id, &user.id)
        .await
        .map_err(ApiError::from)?;

    info!(invite_id = %id, user_id = %user.id, "invite accepted");
    Ok(Json(accepted))
}

/// Cancel a pending invite, owner only
pub async fn cancel_invite(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    parse_id(&id)?;

    let invite = state
        .storage
        .get_invite(&id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;

    require_owner(&state, &user, &invite.team_id).await?;

    state
        .storage
        .cancel_invite(&id)
        .await
        .map_err(ApiError::from)?;
    Ok(SuccessResponse::ok())
}

// Story maps

/// Parameters for story-map creation
#[derive(Debug, Deserialize)]
pub struct CreateStoryMapRequest {
    /// Owning team
    pub team_id: String,
    /// Map name
    pub name: String,
}

/// List a team's story maps
pub async fn list_story_maps(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<TeamIdQuery>,
) -> ApiResult<Json<Vec<StoryMap>>> {
    parse_id(&query.team_id)?;
    require_member(&state, &user, &query.team_id).await?;

    let maps = state
        .storage
        .list_team_story_maps(&query.team_id)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(maps))
}

/// Create a story map in a team
pub async fn create_story_map(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateStoryMapRequest>,
) -> ApiResult<Json<StoryMap>> {
    parse_id(&req.team_id)?;
    non_empty(&req.name, "name")?;
    require_member(&state, &user, &req.team_id).await?;

    let map = StoryMap::new(&req.team_id, req.name);
    state
        .storage
        .create_story_map(&map)
        .await
        .map_err(ApiError::from)?;

    info!(story_map_id = %map.id, "story map created");
    Ok(Json(map))
}

/// Single fetch of the whole hierarchy in display order; this is what the
/// canvas client renders from.
pub async fn get_story_map(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<StoryMapTree>> {
    parse_id(&id)?;
    let team = state
        .storage
        .story_map_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let tree = state
        .storage
        .get_story_map_tree(&id)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(tree))
}

/// Rename a story map
pub async fn rename_story_map(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<Json<StoryMap>> {
    parse_id(&id)?;
    non_empty(&req.name, "name")?;
    let team = state
        .storage
        .story_map_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let map = state
        .storage
        .rename_story_map(&id, &req.name)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(map))
}

/// Delete a story map and everything under it
pub async fn delete_story_map(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    parse_id(&id)?;
    let team = state
        .storage
        .story_map_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    state
        .storage
        .delete_story_map(&id)
        .await
        .map_err(ApiError::from)?;

    info!(story_map_id = %id, "story map deleted");
    Ok(SuccessResponse::ok())
}

// Personas

/// Parameters for persona creation
#[derive(Debug, Deserialize)]
pub struct CreatePersonaRequest {
    /// Owning story map
    pub story_map_id: String,
    /// Persona name
    pub name: String,
    /// Optional free-text description
    pub description: Option<String>,
}

/// Body for the collection-level reorder endpoints. The parent names the
/// sibling group: story map for personas, activities and releases,
/// activity for tasks.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// Owning story map, when that is the sibling group
    pub story_map_id: Option<String>,
    /// Owning activity, when reordering tasks
    pub activity_id: Option<String>,
    /// Sibling ids in their new display order
    pub ordered_ids: Vec<String>,
}

/// Create a persona in a story map
pub async fn create_persona(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreatePersonaRequest>,
) -> ApiResult<Json<Persona>> {
    parse_id(&req.story_map_id)?;
    non_empty(&req.name, "name")?;
    let team = state
        .storage
        .story_map_team(&req.story_map_id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let mut persona = Persona::new(&req.story_map_id, req.name);
    if let Some(description) = req.description {
        persona = persona.with_description(description);
    }

    let persona = state
        .storage
        .create_persona(&persona)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(persona))
}

/// Fetch one persona
pub async fn get_persona(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Persona>> {
    parse_id(&id)?;
    let team = state
        .storage
        .persona_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let persona = state
        .storage
        .get_persona(&id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(persona))
}

/// Apply a partial update to a persona
pub async fn update_persona(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(patch): Json<PersonaPatch>,
) -> ApiResult<Json<Persona>> {
    parse_id(&id)?;
    if let Some(name) = &patch.name {
        non_empty(name, "name")?;
    }
    let team = state
        .storage
        .persona_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let persona = state
        .storage
        .update_persona(&id, &patch)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(persona))
}

/// Delete a persona and its link rows
pub async fn delete_persona(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    parse_id(&id)?;
    let team = state
        .storage
        .persona_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    state
        .storage
        .delete_persona(&id)
        .await
        .map_err(ApiError::from)?;
    Ok(SuccessResponse::ok())
}

/// Reorder a map's personas
pub async fn reorder_personas(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let map_id = req
        .story_map_id
        .as_deref()
        .ok_or_else(|| ApiError::validation("story_map_id is required"))?;
    parse_id(map_id)?;
    if req.ordered_ids.is_empty() {
        return Err(ApiError::validation("ordered_ids must not be empty"));
    }
    let team = state
        .storage
        .story_map_team(map_id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    state
        .storage
        .reorder_personas(map_id, &req.ordered_ids)
        .await
        .map_err(ApiError::from)?;
    Ok(SuccessResponse::ok())
}

/// Attach a persona to an activity, task or story in the same map
pub async fn link_persona(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path((id, kind, target_id)): Path<(String, String, String)>,
) -> ApiResult<Json<SuccessResponse>> {
    parse_id(&id)?;
    parse_id(&target_id)?;
    let kind: PersonaLinkKind = kind
        .parse()
        .map_err(|_| ApiError::validation("link kind must be activities, tasks or stories"))?;

    let team = state
        .storage
        .persona_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    state
        .storage
        .link_persona(&id, kind, &target_id)
        .await
        .map_err(ApiError::from)?;
    Ok(SuccessResponse::ok())
}

/// Detach a persona from an activity, task or story
pub async fn unlink_persona(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path((id, kind, target_id)): Path<(String, String, String)>,
) -> ApiResult<Json<SuccessResponse>> {
    parse_id(&id)?;
    parse_id(&target_id)?;
    let kind: PersonaLinkKind = kind
        .parse()
        .map_err(|_| ApiError::validation("link kind must be activities, tasks or stories"))?;

    let team = state
        .storage
        .persona_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    state
        .storage
        .unlink_persona(&id, kind, &target_id)
        .await
        .map_err(ApiError::from)?;
    Ok(SuccessResponse::ok())
}

// Activities

/// Parameters for activity creation
#[derive(Debug, Deserialize)]
pub struct CreateActivityRequest {
    /// Owning story map
    pub story_map_id: String,
    /// Activity name
    pub name: String,
}

/// Create an activity at the end of the backbone
pub async fn create_activity(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateActivityRequest>,
) -> ApiResult<Json<Activity>> {
    parse_id(&req.story_map_id)?;
    non_empty(&req.name, "name")?;
    let team = state
        .storage
        .story_map_team(&req.story_map_id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let activity = state
        .storage
        .create_activity(&Activity::new(&req.story_map_id, req.name))
        .await
        .map_err(ApiError::from)?;
    Ok(Json(activity))
}

/// Fetch one activity
pub async fn get_activity(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Activity>> {
    parse_id(&id)?;
    let team = state
        .storage
        .activity_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let activity = state
        .storage
        .get_activity(&id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(activity))
}

/// Rename an activity
pub async fn rename_activity(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<Json<Activity>> {
    parse_id(&id)?;
    non_empty(&req.name, "name")?;
    let team = state
        .storage
        .activity_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let activity = state
        .storage
        .rename_activity(&id, &req.name)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(activity))
}

/// Deleting an activity cascades to its tasks and their stories.
pub async fn delete_activity(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    parse_id(&id)?;
    let team = state
        .storage
        .activity_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    state
        .storage
        .delete_activity(&id)
        .await
        .map_err(ApiError::from)?;

    info!(activity_id = %id, "activity deleted");
    Ok(SuccessResponse::ok())
}

/// Reorder a map's activities
pub async fn reorder_activities(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let map_id = req
        .story_map_id
        .as_deref()
        .ok_or_else(|| ApiError::validation("story_map_id is required"))?;
    parse_id(map_id)?;
    if req.ordered_ids.is_empty() {
        return Err(ApiError::validation("ordered_ids must not be empty"));
    }
    let team = state
        .storage
        .story_map_team(map_id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    state
        .storage
        .reorder_activities(map_id, &req.ordered_ids)
        .await
        .map_err(ApiError::from)?;
    Ok(SuccessResponse::ok())
}

// Tasks

/// Parameters for task creation
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    /// Owning activity
    pub activity_id: String,
    /// Task name
    pub name: String,
}

/// Create a task at the end of its activity's tasks
pub async fn create_task(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<Json<Task>> {
    parse_id(&req.activity_id)?;
    non_empty(&req.name, "name")?;
    let team = state
        .storage
        .activity_team(&req.activity_id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let task = state
        .storage
        .create_task(&Task::new(&req.activity_id, req.name))
        .await
        .map_err(ApiError::from)?;
    Ok(Json(task))
}

/// Fetch one task
pub async fn get_task(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    parse_id(&id)?;
    let team = state.storage.task_team(&id).await.map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let task = state
        .storage
        .get_task(&id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(task))
}

/// Rename a task
pub async fn rename_task(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<Json<Task>> {
    parse_id(&id)?;
    non_empty(&req.name, "name")?;
    let team = state.storage.task_team(&id).await.map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let task = state
        .storage
        .rename_task(&id, &req.name)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(task))
}

/// Delete a task, cascading to its stories
pub async fn delete_task(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    parse_id(&id)?;
    let team = state.storage.task_team(&id).await.map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    state
        .storage
        .delete_task(&id)
        .await
        .map_err(ApiError::from)?;
    Ok(SuccessResponse::ok())
}

/// Reorder an activity's tasks
pub async fn reorder_tasks(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let activity_id = req
        .activity_id
        .as_deref()
        .ok_or_else(|| ApiError::validation("activity_id is required"))?;
    parse_id(activity_id)?;
    if req.ordered_ids.is_empty() {
        return Err(ApiError::validation("ordered_ids must not be empty"));
    }
    let team = state
        .storage
        .activity_team(activity_id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    state
        .storage
        .reorder_tasks(activity_id, &req.ordered_ids)
        .await
        .map_err(ApiError::from)?;
    Ok(SuccessResponse::ok())
}

// Releases

/// Parameters for release creation
#[derive(Debug, Deserialize)]
pub struct CreateReleaseRequest {
    /// Owning story map
    pub story_map_id: String,
    /// Release name
    pub name: String,
}

/// Create a release at the end of the map's slices
pub async fn create_release(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateReleaseRequest>,
) -> ApiResult<Json<Release>> {
    parse_id(&req.story_map_id)?;
    non_empty(&req.name, "name")?;
    let team = state
        .storage
        .story_map_team(&req.story_map_id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let release = state
        .storage
        .create_release(&Release::new(&req.story_map_id, req.name))
        .await
        .map_err(ApiError::from)?;
    Ok(Json(release))
}

/// Fetch one release
pub async fn get_release(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Release>> {
    parse_id(&id)?;
    let team = state
        .storage
        .release_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let release = state
        .storage
        .get_release(&id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(release))
}

/// Rename a release
pub async fn rename_release(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<Json<Release>> {
    parse_id(&id)?;
    non_empty(&req.name, "name")?;
    let team = state
        .storage
        .release_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let release = state
        .storage
        .rename_release(&id, &req.name)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(release))
}

/// Deleting a release removes the release and every story in it as one
/// atomic unit.
pub async fn delete_release(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    parse_id(&id)?;
    let team = state
        .storage
        .release_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    state
        .storage
        .delete_release_with_stories(&id)
        .await
        .map_err(ApiError::from)?;

    info!(release_id = %id, "release deleted with its stories");
    Ok(SuccessResponse::ok())
}

/// Reorder a map's releases
pub async fn reorder_releases(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let map_id = req
        .story_map_id
        .as_deref()
        .ok_or_else(|| ApiError::validation("story_map_id is required"))?;
    parse_id(map_id)?;
    if req.ordered_ids.is_empty() {
        return Err(ApiError::validation("ordered_ids must not be empty"));
    }
    let team = state
        .storage
        .story_map_team(map_id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    state
        .storage
        .reorder_releases(map_id, &req.ordered_ids)
        .await
        .map_err(ApiError::from)?;
    Ok(SuccessResponse::ok())
}

// Stories

/// Parameters for story creation
#[derive(Debug, Deserialize)]
pub struct CreateStoryRequest {
    /// Owning task
    pub task_id: String,
    /// Containing release; absent means the backlog band
    pub release_id: Option<String>,
    /// Story title
    pub title: String,
    /// Free-text requirements
    pub requirements: String,
    /// Free-text acceptance criteria
    pub acceptance_criteria: String,
    /// Optional design-reference link
    pub design_link: Option<String>,
    /// Optional edge-case notes
    pub edge_cases: Option<String>,
    /// Optional technical guidance
    pub technical_notes: Option<String>,
    /// Initial workflow status, defaulting to backlog
    pub status: Option<StoryStatus>,
}

/// Body for the story reorder endpoint
#[derive(Debug, Deserialize)]
pub struct ReorderStoriesRequest {
    /// Owning task
    pub task_id: String,
    /// Release band to reorder within; absent or null means the backlog
    pub release_id: Option<String>,
    /// Story ids in their new display order
    pub ordered_ids: Vec<String>,
}

/// Create a story at the end of its (task, release) group
pub async fn create_story(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateStoryRequest>,
) -> ApiResult<Json<Story>> {
    parse_id(&req.task_id)?;
    non_empty(&req.title, "title")?;
    non_empty(&req.requirements, "requirements")?;
    non_empty(&req.acceptance_criteria, "acceptance_criteria")?;

    let team = state
        .storage
        .task_team(&req.task_id)
        .await
        .map_err(ApiError::from)?;
    let team = member_of(&state, &user, team).await?;

    let mut story = Story::new(
        &req.task_id,
        req.title,
        req.requirements,
        req.acceptance_criteria,
    );
    if let Some(release_id) = &req.release_id {
        parse_id(release_id)?;
        // The release must sit in the same team as the task.
        let release_team = state
            .storage
            .release_team(release_id)
            .await
            .map_err(ApiError::from)?;
        if release_team.as_deref() != Some(team.as_str()) {
            return Err(ApiError::NotFound);
        }
        story = story.with_release(release_id);
    }
    if let Some(link) = req.design_link {
        story = story.with_design_link(link);
    }
    if let Some(edge_cases) = req.edge_cases {
        story = story.with_edge_cases(edge_cases);
    }
    if let Some(notes) = req.technical_notes {
        story = story.with_technical_notes(notes);
    }
    if let Some(status) = req.status {
        story = story.with_status(status);
    }

    let story = state
        .storage
        .create_story(&story)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(story))
}

/// Fetch one story
pub async fn get_story(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Story>> {
    parse_id(&id)?;
    let team = state
        .storage
        .story_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    let story = state
        .storage
        .get_story(&id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(story))
}

/// Apply a partial update to a story; changing its (task, release)
/// position appends it at the end of the target group
pub async fn update_story(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(patch): Json<StoryPatch>,
) -> ApiResult<Json<Story>> {
    parse_id(&id)?;
    if let Some(title) = &patch.title {
        non_empty(title, "title")?;
    }
    if let Some(requirements) = &patch.requirements {
        non_empty(requirements, "requirements")?;
    }
    if let Some(criteria) = &patch.acceptance_criteria {
        non_empty(criteria, "acceptance_criteria")?;
    }

    let team = state
        .storage
        .story_team(&id)
        .await
        .map_err(ApiError::from)?;
    let team = member_of(&state, &user, team).await?;

    // A move target must stay inside the caller's team.
    if let Some(task_id) = &patch.task_id {
        parse_id(task_id)?;
        let task_team = state
            .storage
            .task_team(task_id)
            .await
            .map_err(ApiError::from)?;
        if task_team.as_deref() != Some(team.as_str()) {
            return Err(ApiError::NotFound);
        }
    }
    if let Some(Some(release_id)) = &patch.release_id {
        parse_id(release_id)?;
        let release_team = state
            .storage
            .release_team(release_id)
            .await
            .map_err(ApiError::from)?;
        if release_team.as_deref() != Some(team.as_str()) {
            return Err(ApiError::NotFound);
        }
    }

    let story = state
        .storage
        .update_story(&id, &patch)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(story))
}

/// Delete a story
pub async fn delete_story(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    parse_id(&id)?;
    let team = state
        .storage
        .story_team(&id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    state
        .storage
        .delete_story(&id)
        .await
        .map_err(ApiError::from)?;
    Ok(SuccessResponse::ok())
}

/// Reorder the stories of one (task, release) group
pub async fn reorder_stories(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ReorderStoriesRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    parse_id(&req.task_id)?;
    if let Some(release_id) = &req.release_id {
        parse_id(release_id)?;
    }
    if req.ordered_ids.is_empty() {
        return Err(ApiError::validation("ordered_ids must not be empty"));
    }
    let team = state
        .storage
        .task_team(&req.task_id)
        .await
        .map_err(ApiError::from)?;
    member_of(&state, &user, team).await?;

    state
        .storage
        .reorder_stories(&req.task_id, req.release_id.as_deref(), &req.ordered_ids)
        .await
        .map_err(ApiError::from)?;
    Ok(SuccessResponse::ok())
}
