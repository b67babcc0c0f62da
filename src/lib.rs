//! # Story-Map Server
//!
//! A collaborative story-mapping backend for product teams, with an
//! agent-facing context service over the Model Context Protocol (MCP).
//!
//! ## Features
//!
//! - **Teams**: workspaces with owner/member roles and email invites
//! - **Story maps**: the two-row backbone of activities and tasks
//! - **Releases**: horizontal delivery slices grouping stories
//! - **Stories**: implementation units with requirements, acceptance
//!   criteria, edge cases and technical notes
//! - **Personas**: user types attachable to activities, tasks and stories
//! - **Agent context service**: read-only MCP tools that hand coding
//!   agents a story with its full surrounding hierarchy
//!
//! ## Architecture
//!
//! ```text
//! Canvas client → HTTP API (axum) ─┐
//!                                  ├→ SQLite (sqlx)
//! Coding agent  → MCP (stdio)     ─┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use storymap_server::config::Config;
//! use storymap_server::http::{router, AppState};
//! use storymap_server::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = SqliteStorage::new(&config.database).await?;
//!     let addr = config.http.bind_addr;
//!     let app = router(Arc::new(AppState { config, storage }));
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management for the server.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// HTTP API surface (axum router and handlers).
pub mod http;
/// Fixed instructional text for coding agents.
pub mod prompts;
/// MCP server implementation and request handling.
pub mod server;
/// SQLite storage layer for persistence.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{McpServer, McpState, SharedMcpState};
