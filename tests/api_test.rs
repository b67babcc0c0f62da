//! Integration tests for the HTTP API
//!
//! Drives the axum router directly with tower's oneshot against an
//! in-memory SQLite database.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use storymap_server::config::{
    AgentConfig, Config, DatabaseConfig, HttpConfig, LogFormat, LoggingConfig,
};
use storymap_server::http::{router, AppState};
use storymap_server::storage::SqliteStorage;

fn test_config() -> Config {
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
            service_token: None,
        },
    }
}

async fn test_app() -> Router {
    let storage = SqliteStorage::new_in_memory()
        .await
        .expect("Failed to create in-memory storage");
    router(Arc::new(AppState {
        config: test_config(),
        storage,
    }))
}

/// Send a JSON request and return (status, parsed body)
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Sign up a user and return their bearer token
async fn signup(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "email": email, "display_name": "Test User" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

/// Create a team and return its id
async fn create_team(app: &Router, token: &str, name: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/teams",
        Some(token),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_str().unwrap().to_string()
}

/// Build team -> map -> activity -> task, returning their ids
async fn create_backbone(app: &Router, token: &str) -> (String, String, String, String) {
    let team_id = create_team(app, token, "Team").await;
    let (_, map) = send(
        app,
        "POST",
        "/api/story-maps",
        Some(token),
        Some(json!({ "team_id": team_id, "name": "Map" })),
    )
    .await;
    let map_id = map["id"].as_str().unwrap().to_string();
    let (_, activity) = send(
        app,
        "POST",
        "/api/activities",
        Some(token),
        Some(json!({ "story_map_id": map_id, "name": "Browse" })),
    )
    .await;
    let activity_id = activity["id"].as_str().unwrap().to_string();
    let (_, task) = send(
        app,
        "POST",
        "/api/tasks",
        Some(token),
        Some(json!({ "activity_id": activity_id, "name": "Search" })),
    )
    .await;
    let task_id = task["id"].as_str().unwrap().to_string();
    (team_id, map_id, activity_id, task_id)
}

#[cfg(test)]
mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_healthz_is_unauthenticated() {
        let app = test_app().await;
        let (status, body) = send(&app, "GET", "/healthz", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_api_requires_bearer_token() {
        let app = test_app().await;
        let (status, body) = send(&app, "GET", "/api/teams", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthenticated() {
        let app = test_app().await;
        let (status, _) = send(&app, "GET", "/api/teams", Some("bogus"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signup_rejects_duplicate_email() {
        let app = test_app().await;
        signup(&app, "dup@example.com").await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({ "email": "dup@example.com", "display_name": "Again" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("registered"));
    }
}

#[cfg(test)]
mod team_api_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_list_teams() {
        let app = test_app().await;
        let token = signup(&app, "owner@example.com").await;
        let team_id = create_team(&app, &token, "Product").await;

        let (status, body) = send(&app, "GET", "/api/teams", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], team_id.as_str());
    }

    #[tokio::test]
    async fn test_create_team_with_empty_name_is_rejected() {
        let app = test_app().await;
        let token = signup(&app, "owner@example.com").await;
        let (status, _) = send(
            &app,
            "POST",
            "/api/teams",
            Some(&token),
            Some(json!({ "name": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_id_is_bad_request() {
        let app = test_app().await;
        let token = signup(&app, "owner@example.com").await;
        let (status, _) = send(&app, "GET", "/api/teams/not-a-uuid", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_member_sees_not_found() {
        let app = test_app().await;
        let owner = signup(&app, "owner@example.com").await;
        let stranger = signup(&app, "stranger@example.com").await;
        let team_id = create_team(&app, &owner, "Private").await;

        let uri = format!("/api/teams/{}", team_id);
        let (status, _) = send(&app, "GET", &uri, Some(&stranger), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_member_cannot_rename_team() {
        let app = test_app().await;
        let owner = signup(&app, "owner@example.com").await;
        let member = signup(&app, "member@example.com").await;
        let team_id = create_team(&app, &owner, "Team").await;

        // Owner invites, the member accepts.
        let (_, invite) = send(
            &app,
            "POST",
            "/api/invites",
            Some(&owner),
            Some(json!({ "team_id": team_id, "email": "member@example.com" })),
        )
        .await;
        let invite_id = invite["id"].as_str().unwrap();
        let accept_uri = format!("/api/invites/{}/accept", invite_id);
        let (status, _) = send(&app, "POST", &accept_uri, Some(&member), None).await;
        assert_eq!(status, StatusCode::OK);

        // Role violation reads as 404, same as a missing team.
        let uri = format!("/api/teams/{}", team_id);
        let (status, _) = send(
            &app,
            "PUT",
            &uri,
            Some(&member),
            Some(json!({ "name": "Hijacked" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            "PUT",
            &uri,
            Some(&owner),
            Some(json!({ "name": "Renamed" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Renamed");
    }

    #[tokio::test]
    async fn test_invite_accept_requires_matching_email() {
        let app = test_app().await;
        let owner = signup(&app, "owner@example.com").await;
        let other = signup(&app, "other@example.com").await;
        let team_id = create_team(&app, &owner, "Team").await;

        let (_, invite) = send(
            &app,
            "POST",
            "/api/invites",
            Some(&owner),
            Some(json!({ "team_id": team_id, "email": "someone-else@example.com" })),
        )
        .await;
        let accept_uri = format!("/api/invites/{}/accept", invite["id"].as_str().unwrap());
        let (status, _) = send(&app, "POST", &accept_uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[cfg(test)]
mod content_api_tests {
    use super::*;

    #[tokio::test]
    async fn test_story_map_tree_fetch() {
        let app = test_app().await;
        let token = signup(&app, "owner@example.com").await;
        let (_, map_id, activity_id, task_id) = create_backbone(&app, &token).await;

        let (_, story) = send(
            &app,
            "POST",
            "/api/stories",
            Some(&token),
            Some(json!({
                "task_id": task_id,
                "title": "Search by name",
                "requirements": "Find products by title substring",
                "acceptance_criteria": "Results update as the user types",
            })),
        )
        .await;
        assert_eq!(story["status"], "backlog");
        assert_eq!(story["sort_order"], 0);

        let uri = format!("/api/story-maps/{}", map_id);
        let (status, tree) = send(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tree["activities"][0]["id"], activity_id.as_str());
        assert_eq!(tree["tasks"][0]["id"], task_id.as_str());
        assert_eq!(tree["stories"][0]["id"], story["id"]);
    }

    #[tokio::test]
    async fn test_story_requires_non_empty_requirements() {
        let app = test_app().await;
        let token = signup(&app, "owner@example.com").await;
        let (_, _, _, task_id) = create_backbone(&app, &token).await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/stories",
            Some(&token),
            Some(json!({
                "task_id": task_id,
                "title": "No requirements",
                "requirements": "",
                "acceptance_criteria": "Something",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reorder_activities_via_collection_put() {
        let app = test_app().await;
        let token = signup(&app, "owner@example.com").await;
        let (_, map_id, first_id, _) = create_backbone(&app, &token).await;

        let (_, second) = send(
            &app,
            "POST",
            "/api/activities",
            Some(&token),
            Some(json!({ "story_map_id": map_id, "name": "Pay" })),
        )
        .await;
        let second_id = second["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "PUT",
            "/api/activities",
            Some(&token),
            Some(json!({
                "story_map_id": map_id,
                "ordered_ids": [second_id, first_id],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let uri = format!("/api/activities/{}", second["id"].as_str().unwrap());
        let (_, reloaded) = send(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(reloaded["sort_order"], 0);
    }

    #[tokio::test]
    async fn test_reorder_with_empty_list_is_rejected() {
        let app = test_app().await;
        let token = signup(&app, "owner@example.com").await;
        let (_, map_id, _, _) = create_backbone(&app, &token).await;

        let (status, _) = send(
            &app,
            "PUT",
            "/api/activities",
            Some(&token),
            Some(json!({ "story_map_id": map_id, "ordered_ids": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_release_delete_removes_stories() {
        let app = test_app().await;
        let token = signup(&app, "owner@example.com").await;
        let (_, map_id, _, task_id) = create_backbone(&app, &token).await;

        let (_, release) = send(
            &app,
            "POST",
            "/api/releases",
            Some(&token),
            Some(json!({ "story_map_id": map_id, "name": "MVP" })),
        )
        .await;
        let release_id = release["id"].as_str().unwrap().to_string();

        let (_, story) = send(
            &app,
            "POST",
            "/api/stories",
            Some(&token),
            Some(json!({
                "task_id": task_id,
                "release_id": release_id,
                "title": "Doomed",
                "requirements": "req",
                "acceptance_criteria": "ac",
            })),
        )
        .await;

        let uri = format!("/api/releases/{}", release_id);
        let (status, body) = send(&app, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let story_uri = format!("/api/stories/{}", story["id"].as_str().unwrap());
        let (status, _) = send(&app, "GET", &story_uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_partial_story_update() {
        let app = test_app().await;
        let token = signup(&app, "owner@example.com").await;
        let (_, _, _, task_id) = create_backbone(&app, &token).await;

        let (_, story) = send(
            &app,
            "POST",
            "/api/stories",
            Some(&token),
            Some(json!({
                "task_id": task_id,
                "title": "Original",
                "requirements": "req",
                "acceptance_criteria": "ac",
            })),
        )
        .await;

        let uri = format!("/api/stories/{}", story["id"].as_str().unwrap());
        let (status, updated) = send(
            &app,
            "PUT",
            &uri,
            Some(&token),
            Some(json!({ "status": "in_progress" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "in_progress");
        assert_eq!(updated["title"], "Original");

        // Empty patch carries no recognized field.
        let (status, _) = send(&app, "PUT", &uri, Some(&token), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_member_can_create_and_edit_content() {
        let app = test_app().await;
        let owner = signup(&app, "owner@example.com").await;
        let member = signup(&app, "member@example.com").await;
        let (team_id, map_id, _, task_id) = create_backbone(&app, &owner).await;

        let (_, invite) = send(
            &app,
            "POST",
            "/api/invites",
            Some(&owner),
            Some(json!({ "team_id": team_id, "email": "member@example.com" })),
        )
        .await;
        let accept_uri = format!("/api/invites/{}/accept", invite["id"].as_str().unwrap());
        let (status, _) = send(&app, "POST", &accept_uri, Some(&member), None).await;
        assert_eq!(status, StatusCode::OK);

        // Content operations take the member role, not just owner.
        let (status, activity) = send(
            &app,
            "POST",
            "/api/activities",
            Some(&member),
            Some(json!({ "story_map_id": map_id, "name": "Pay" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, story) = send(
            &app,
            "POST",
            "/api/stories",
            Some(&member),
            Some(json!({
                "task_id": task_id,
                "title": "Member story",
                "requirements": "req",
                "acceptance_criteria": "ac",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let story_uri = format!("/api/stories/{}", story["id"].as_str().unwrap());
        let (status, updated) = send(
            &app,
            "PUT",
            &story_uri,
            Some(&member),
            Some(json!({ "status": "ready" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "ready");

        let activity_uri = format!("/api/activities/{}", activity["id"].as_str().unwrap());
        let (status, _) = send(&app, "DELETE", &activity_uri, Some(&member), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_story_release_must_share_the_tasks_map() {
        let app = test_app().await;
        let token = signup(&app, "owner@example.com").await;
        let (team_id, _, _, task_id) = create_backbone(&app, &token).await;

        // A second map in the same team with its own release.
        let (_, other_map) = send(
            &app,
            "POST",
            "/api/story-maps",
            Some(&token),
            Some(json!({ "team_id": team_id, "name": "Other Map" })),
        )
        .await;
        let (_, release) = send(
            &app,
            "POST",
            "/api/releases",
            Some(&token),
            Some(json!({ "story_map_id": other_map["id"], "name": "MVP" })),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/stories",
            Some(&token),
            Some(json!({
                "task_id": task_id,
                "release_id": release["id"],
                "title": "Misfiled",
                "requirements": "req",
                "acceptance_criteria": "ac",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("different story maps"));
    }

    #[tokio::test]
    async fn test_cross_team_story_access_is_not_found() {
        let app = test_app().await;
        let owner = signup(&app, "owner@example.com").await;
        let outsider = signup(&app, "outsider@example.com").await;
        let (_, _, _, task_id) = create_backbone(&app, &owner).await;
        // The outsider has their own team, but not this one.
        create_team(&app, &outsider, "Other Team").await;

        let (_, story) = send(
            &app,
            "POST",
            "/api/stories",
            Some(&owner),
            Some(json!({
                "task_id": task_id,
                "title": "Private",
                "requirements": "req",
                "acceptance_criteria": "ac",
            })),
        )
        .await;

        let uri = format!("/api/stories/{}", story["id"].as_str().unwrap());
        let (status, _) = send(&app, "GET", &uri, Some(&outsider), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_persona_link_round_trip() {
        let app = test_app().await;
        let token = signup(&app, "owner@example.com").await;
        let (_, map_id, _, task_id) = create_backbone(&app, &token).await;

        let (_, persona) = send(
            &app,
            "POST",
            "/api/personas",
            Some(&token),
            Some(json!({ "story_map_id": map_id, "name": "Shopper" })),
        )
        .await;
        let persona_id = persona["id"].as_str().unwrap();

        let link_uri = format!("/api/personas/{}/links/tasks/{}", persona_id, task_id);
        let (status, _) = send(&app, "PUT", &link_uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "DELETE", &link_uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        // Second unlink has nothing to remove.
        let (status, _) = send(&app, "DELETE", &link_uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_persona_link_kind_is_validated() {
        let app = test_app().await;
        let token = signup(&app, "owner@example.com").await;
        let (_, map_id, _, task_id) = create_backbone(&app, &token).await;

        let (_, persona) = send(
            &app,
            "POST",
            "/api/personas",
            Some(&token),
            Some(json!({ "story_map_id": map_id, "name": "Shopper" })),
        )
        .await;

        let uri = format!(
            "/api/personas/{}/links/releases/{}",
            persona["id"].as_str().unwrap(),
            task_id
        );
        let (status, _) = send(&app, "PUT", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
