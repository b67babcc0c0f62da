use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::SharedMcpState;
use crate::error::{McpError, McpResult};
use crate::prompts::STORY_CONTEXT_PREAMBLE;
use crate::storage::Storage;

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedMcpState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        "storymap_list" => handle_storymap_list(state).await,
        "storymap_get" => handle_storymap_get(state, arguments).await,
        "story_context" => handle_story_context(state, arguments).await,
        "release_stories" => handle_release_stories(state, arguments).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

/// Team-scope check for the service account. A missing entity and a
/// cross-team entity produce the same failure.
async fn require_visible(
    state: &SharedMcpState,
    team: Option<String>,
    entity: &str,
    id: &str,
) -> McpResult<()> {
    let team = team.ok_or_else(|| McpError::ExecutionFailed {
        message: format!("{} not found: {}", entity, id),
    })?;

    state
        .storage
        .get_member(&team, &state.service_user.id)
        .await
        .map_err(McpError::from)?
        .ok_or_else(|| McpError::ExecutionFailed {
            message: format!("{} not found: {}", entity, id),
        })?;

    Ok(())
}

/// Handle storymap_list - all maps in the service account's teams
async fn handle_storymap_list(state: &SharedMcpState) -> McpResult<Value> {
    let teams = state
        .storage
        .list_user_teams(&state.service_user.id)
        .await
        .map_err(McpError::from)?;

    let mut entries = Vec::new();
    for team in teams {
        let maps = state
            .storage
            .list_team_story_maps(&team.id)
            .await
            .map_err(McpError::from)?;
        entries.push(serde_json::json!({
            "team": team,
            "story_maps": maps,
        }));
    }

    Ok(serde_json::json!({ "teams": entries }))
}

/// Handle storymap_get - the full hierarchy of one map
async fn handle_storymap_get(state: &SharedMcpState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct GetParams {
        story_map_id: String,
    }

    let params: GetParams = parse_arguments("storymap_get", arguments)?;

    let team = state
        .storage
        .story_map_team(&params.story_map_id)
        .await
        .map_err(McpError::from)?;
    require_visible(state, team, "story_map", &params.story_map_id).await?;

    let tree = state
        .storage
        .get_story_map_tree(&params.story_map_id)
        .await
        .map_err(McpError::from)?;

    serde_json::to_value(tree).map_err(McpError::Json)
}

/// Handle story_context - one story as an implementation brief
async fn handle_story_context(state: &SharedMcpState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct ContextParams {
        story_id: String,
    }

    let params: ContextParams = parse_arguments("story_context", arguments)?;

    let team = state
        .storage
        .story_team(&params.story_id)
        .await
        .map_err(McpError::from)?;
    require_visible(state, team, "story", &params.story_id).await?;

    let context = state
        .storage
        .get_story_context(&params.story_id)
        .await
        .map_err(McpError::from)?;

    let mut value = serde_json::to_value(context).map_err(McpError::Json)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "instructions".to_string(),
            Value::String(STORY_CONTEXT_PREAMBLE.to_string()),
        );
    }

    Ok(value)
}

/// Handle release_stories - the stories of one release in backbone order
async fn handle_release_stories(
    state: &SharedMcpState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct ReleaseParams {
        release_id: String,
    }

    let params: ReleaseParams = parse_arguments("release_stories", arguments)?;

    let team = state
        .storage
        .release_team(&params.release_id)
        .await
        .map_err(McpError::from)?;
    require_visible(state, team, "release", &params.release_id).await?;

    let stories = state
        .storage
        .list_release_stories(&params.release_id)
        .await
        .map_err(McpError::from)?;

    serde_json::to_value(serde_json::json!({ "stories": stories })).map_err(McpError::Json)
}

/// Parse tool arguments into a typed parameter struct
fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}
