//! Integration tests for the MCP protocol surface
//!
//! Drives the JSON-RPC request handler directly against an in-memory
//! store seeded with a service account.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use storymap_server::config::{
    AgentConfig, Config, DatabaseConfig, HttpConfig, LogFormat, LoggingConfig,
};
use storymap_server::server::{JsonRpcRequest, McpServer, McpState};
use storymap_server::storage::{
    Activity, Release, SessionToken, SqliteStorage, Storage, Story, StoryMap, Task, Team, User,
};

struct Fixture {
    server: McpServer,
    map_id: String,
    story_id: String,
    release_id: String,
    foreign_map_id: String,
}

fn test_config(token: &str) -> Config {
    Config {
        http: HttpConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
        },
        database: DatabaseConfig {
            path: PathBuf::from(":memory:"),
            max_connections: 1,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        },
        agent: AgentConfig {
            service_token: Some(token.to_string()),
        },
    }
}

/// Seed a team the service account belongs to, one full backbone with a
/// story in a release, and a second team it cannot see.
async fn setup() -> Fixture {
    let storage = SqliteStorage::new_in_memory().await.unwrap();

    let service = User::new("agent@example.com", "Agent");
    storage.create_user(&service).await.unwrap();
    let session = SessionToken::new(&service.id);
    storage.create_session(&session).await.unwrap();

    let team = Team::new("Visible Team");
    storage.create_team(&team, &service.id).await.unwrap();
    let map = StoryMap::new(&team.id, "Checkout");
    storage.create_story_map(&map).await.unwrap();
    let activity = storage
        .create_activity(&Activity::new(&map.id, "Browse"))
        .await
        .unwrap();
    let task = storage
        .create_task(&Task::new(&activity.id, "Search"))
        .await
        .unwrap();
    let release = storage
        .create_release(&Release::new(&map.id, "MVP"))
        .await
        .unwrap();
    let story = storage
        .create_story(
            &Story::new(&task.id, "Search by name", "req", "ac").with_release(&release.id),
        )
        .await
        .unwrap();

    let outsider = User::new("other@example.com", "Other");
    storage.create_user(&outsider).await.unwrap();
    let foreign_team = Team::new("Hidden Team");
    storage.create_team(&foreign_team, &outsider.id).await.unwrap();
    let foreign_map = StoryMap::new(&foreign_team.id, "Secret Map");
    storage.create_story_map(&foreign_map).await.unwrap();

    let state = McpState::new(test_config(&session.token), storage)
        .await
        .unwrap();

    Fixture {
        server: McpServer::new(Arc::new(state)),
        map_id: map.id,
        story_id: story.id,
        release_id: release.id,
        foreign_map_id: foreign_map.id,
    }
}

fn request(id: Option<Value>, method: &str, params: Option<Value>) -> JsonRpcRequest {
    serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    }))
    .unwrap()
}

fn tool_call(name: &str, arguments: Value) -> JsonRpcRequest {
    request(
        Some(json!(1)),
        "tools/call",
        Some(json!({ "name": name, "arguments": arguments })),
    )
}

/// Unwrap the text payload of a tool result
fn tool_text(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap_or(Value::String(text.to_string()))
}

#[cfg(test)]
mod protocol_tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_handshake() {
        let fx = setup().await;
        let response = fx
            .server
            .handle_request(request(Some(json!(1)), "initialize", None))
            .await
            .unwrap();

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(value["result"]["serverInfo"]["name"], "storymap-server");
        assert_eq!(
            value["result"]["capabilities"]["tools"]["listChanged"],
            false
        );
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let fx = setup().await;
        let response = fx
            .server
            .handle_request(request(None, "initialized", None))
            .await;
        assert!(response.is_none());

        let response = fx
            .server
            .handle_request(request(None, "notifications/cancelled", None))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_ping_returns_empty_object() {
        let fx = setup().await;
        let response = fx
            .server
            .handle_request(request(Some(json!(7)), "ping", None))
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], 7);
        assert!(value["result"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_method_is_error() {
        let fx = setup().await;
        let response = fx
            .server
            .handle_request(request(Some(json!(2)), "resources/list", None))
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_tools_list_advertises_all_tools() {
        let fx = setup().await;
        let response = fx
            .server
            .handle_request(request(Some(json!(3)), "tools/list", None))
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();

        let names: Vec<&str> = value["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "storymap_list",
                "storymap_get",
                "story_context",
                "release_stories"
            ]
        );
    }
}

#[cfg(test)]
mod tool_tests {
    use super::*;

    #[tokio::test]
    async fn test_storymap_list_shows_only_visible_teams() {
        let fx = setup().await;
        let response = fx
            .server
            .handle_request(tool_call("storymap_list", json!({})))
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        let payload = tool_text(&value);

        let teams = payload["teams"].as_array().unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0]["team"]["name"], "Visible Team");
        assert_eq!(teams[0]["story_maps"][0]["id"], fx.map_id.as_str());
    }

    #[tokio::test]
    async fn test_storymap_get_returns_tree() {
        let fx = setup().await;
        let response = fx
            .server
            .handle_request(tool_call(
                "storymap_get",
                json!({ "story_map_id": fx.map_id }),
            ))
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert!(value["result"]["isError"].is_null());

        let tree = tool_text(&value);
        assert_eq!(tree["story_map"]["id"], fx.map_id.as_str());
        assert_eq!(tree["activities"].as_array().unwrap().len(), 1);
        assert_eq!(tree["stories"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_storymap_get_hides_foreign_maps() {
        let fx = setup().await;
        let response = fx
            .server
            .handle_request(tool_call(
                "storymap_get",
                json!({ "story_map_id": fx.foreign_map_id }),
            ))
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["result"]["isError"], true);
        let text = value["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("not found"));
    }

    #[tokio::test]
    async fn test_story_context_includes_instructions() {
        let fx = setup().await;
        let response = fx
            .server
            .handle_request(tool_call("story_context", json!({ "story_id": fx.story_id })))
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        let context = tool_text(&value);

        assert_eq!(context["story"]["id"], fx.story_id.as_str());
        assert_eq!(context["task"]["name"], "Search");
        assert_eq!(context["activity"]["name"], "Browse");
        assert_eq!(context["release"]["name"], "MVP");
        assert!(context["instructions"]
            .as_str()
            .unwrap()
            .contains("acceptance_criteria"));
    }

    #[tokio::test]
    async fn test_release_stories_in_order() {
        let fx = setup().await;
        let response = fx
            .server
            .handle_request(tool_call(
                "release_stories",
                json!({ "release_id": fx.release_id }),
            ))
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        let payload = tool_text(&value);

        let stories = payload["stories"].as_array().unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0]["id"], fx.story_id.as_str());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let fx = setup().await;
        let response = fx
            .server
            .handle_request(tool_call("storymap_delete", json!({})))
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["result"]["isError"], true);
    }

    #[tokio::test]
    async fn test_missing_arguments_is_error_result() {
        let fx = setup().await;
        let response = fx
            .server
            .handle_request(request(
                Some(json!(4)),
                "tools/call",
                Some(json!({ "name": "storymap_get" })),
            ))
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["result"]["isError"], true);
    }
}
