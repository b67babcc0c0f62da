//! Server module for the agent-facing MCP protocol.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - The service-account state the tools run under

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::storage::{SqliteStorage, Storage, User};

/// State shared across MCP tool handlers.
///
/// The MCP process reads the store as a regular user resolved from the
/// configured service token, so every tool is subject to the same team
/// scoping as the HTTP surface.
pub struct McpState {
    /// Application configuration.
    pub config: Config,
    /// SQLite storage backend.
    pub storage: SqliteStorage,
    /// The service account the tools act as.
    pub service_user: User,
}

impl McpState {
    /// Create MCP state by resolving the configured service token.
    pub async fn new(config: Config, storage: SqliteStorage) -> AppResult<Self> {
        let token = config
            .agent
            .service_token
            .as_deref()
            .ok_or_else(|| AppError::Config {
                message: "SERVICE_TOKEN must be set for the agent context service".to_string(),
            })?;

        let service_user = storage
            .get_session_user(token)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::Config {
                message: "SERVICE_TOKEN does not resolve to a valid session".to_string(),
            })?;

        tracing::info!(user_id = %service_user.id, "agent context service authenticated");

        Ok(Self {
            config,
            storage,
            service_user,
        })
    }
}

/// Shared MCP state handle
pub type SharedMcpState = Arc<McpState>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentConfig, DatabaseConfig, HttpConfig, LogFormat, LoggingConfig};
    use crate::storage::SessionToken;
    use std::path::PathBuf;

    fn test_config(service_token: Option<String>) -> Config {
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
            agent: AgentConfig { service_token },
        }
    }

    #[tokio::test]
    async fn test_state_requires_service_token() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let result = McpState::new(test_config(None), storage).await;
        assert!(matches!(result, Err(AppError::Config { .. })));
    }

    #[tokio::test]
    async fn test_state_rejects_unknown_token() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let config = test_config(Some("no-such-session".to_string()));
        let result = McpState::new(config, storage).await;
        assert!(matches!(result, Err(AppError::Config { .. })));
    }

    #[tokio::test]
    async fn test_state_resolves_service_user() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let user = User::new("agent@example.com", "Agent");
        storage.create_user(&user).await.unwrap();
        let session = SessionToken::new(&user.id);
        storage.create_session(&session).await.unwrap();

        let config = test_config(Some(session.token.clone()));
        let state = McpState::new(config, storage).await.unwrap();
        assert_eq!(state.service_user.id, user.id);
    }
}
