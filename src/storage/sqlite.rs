use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use super::{
    Activity, Persona, PersonaLinkKind, PersonaPatch, Release, SessionToken, Story, StoryContext,
    StoryMap, StoryMapTree, StoryPatch, Storage, Task, Team, TeamInvite, TeamMember, TeamRole,
    User,
};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true)
            // The cascade graph lives in the schema; SQLite only honors it
            // with foreign keys switched on per connection.
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Create an in-memory instance for tests
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .foreign_keys(true);

        // A single connection so every query sees the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Migration {
                message: format!("Failed to run migrations: {}", e),
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_user(&self, user: &User) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_user(&self, id: &str) -> StorageResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, display_name, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, display_name, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn create_session(&self, session: &SessionToken) -> StorageResult<()> {
        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(&session.token)
            .bind(&session.user_id)
            .bind(session.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_session_user(&self, token: &str) -> StorageResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.email, u.display_name, u.created_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn create_team(&self, team: &Team, owner_id: &str) -> StorageResult<()> {
        // Team and initial owner land together or not at all, so a team
        // can never exist without an owner.
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO teams (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(&team.id)
            .bind(&team.name)
            .bind(team.created_at.to_rfc3339())
            .bind(team.updated_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO team_members (team_id, user_id, role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&team.id)
        .bind(owner_id)
        .bind(TeamRole::Owner.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_team(&self, id: &str) -> StorageResult<Option<Team>> {
        let row: Option<TeamRow> =
            sqlx::query_as("SELECT id, name, created_at, updated_at FROM teams WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_user_teams(&self, user_id: &str) -> StorageResult<Vec<Team>> {
        let rows: Vec<TeamRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.name, t.created_at, t.updated_at
            FROM teams t
            JOIN team_members m ON m.team_id = t.id
            WHERE m.user_id = ?
            ORDER BY t.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn rename_team(&self, id: &str, name: &str) -> StorageResult<Team> {
        let result = sqlx::query("UPDATE teams SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("team", id));
        }

        self.get_team(id)
            .await?
            .ok_or_else(|| StorageError::not_found("team", id))
    }

    async fn delete_team(&self, id: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("team", id));
        }

        Ok(())
    }

    async fn get_member(&self, team_id: &str, user_id: &str) -> StorageResult<Option<TeamMember>> {
        let row: Option<MemberRow> = sqlx::query_as(
            r#"
            SELECT team_id, user_id, role, created_at
            FROM team_members
            WHERE team_id = ? AND user_id = ?
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_members(&self, team_id: &str) -> StorageResult<Vec<TeamMember>> {
        let rows: Vec<MemberRow> = sqlx::query_as(
            r#"
            SELECT team_id, user_id, role, created_at
            FROM team_members
            WHERE team_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn add_member(&self, member: &TeamMember) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO team_members (team_id, user_id, role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&member.team_id)
        .bind(&member.user_id)
        .bind(member.role.to_string())
        .bind(member.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_member(&self, team_id: &str, user_id: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM team_members WHERE team_id = ? AND user_id = ?")
            .bind(team_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("team_member", user_id));
        }

        Ok(())
    }

    async fn create_invite(&self, invite: &TeamInvite) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO team_invites (id, team_id, email, invited_by, created_at, accepted_at, accepted_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invite.id)
        .bind(&invite.team_id)
        .bind(&invite.email)
        .bind(&invite.invited_by)
        .bind(invite.created_at.to_rfc3339())
        .bind(invite.accepted_at.map(|t| t.to_rfc3339()))
        .bind(&invite.accepted_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_invite(&self, id: &str) -> StorageResult<Option<TeamInvite>> {
        let row: Option<InviteRow> = sqlx::query_as(
            r#"
            SELECT id, team_id, email, invited_by, created_at, accepted_at, accepted_by
            FROM team_invites
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_team_invites(&self, team_id: &str) -> StorageResult<Vec<TeamInvite>> {
        let rows: Vec<InviteRow> = sqlx::query_as(
            r#"
            SELECT id, team_id, email, invited_by, created_at, accepted_at, accepted_by
            FROM team_invites
            WHERE team_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn accept_invite(&self, id: &str, user_id: &str) -> StorageResult<TeamInvite> {
        let mut tx = self.pool.begin().await?;

        let row: Option<InviteRow> = sqlx::query_as(
            r#"
            SELECT id, team_id, email, invited_by, created_at, accepted_at, accepted_by
            FROM team_invites
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let invite: TeamInvite = match row {
            Some(r) => r.into(),
            None => return Err(StorageError::not_found("team_invite", id)),
        };

        if !invite.is_pending() {
            return Err(StorageError::Conflict {
                message: format!("invite {} has already been accepted", id),
            });
        }

        let now = Utc::now();

        sqlx::query("UPDATE team_invites SET accepted_at = ?, accepted_by = ? WHERE id = ?")
            .bind(now.to_rfc3339())
            .bind(user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO team_members (team_id, user_id, role, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&invite.team_id)
        .bind(user_id)
        .bind(TeamRole::Member.to_string())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut accepted = invite;
        accepted.accepted_at = Some(now);
        accepted.accepted_by = Some(user_id.to_string());
        Ok(accepted)
    }

    async fn cancel_invite(&self, id: &str) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        let row: Option<InviteRow> = sqlx::query_as(
            r#"
            SELECT id, team_id, email, invited_by, created_at, accepted_at, accepted_by
            FROM team_invites
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let invite: TeamInvite = match row {
            Some(r) => r.into(),
            None => return Err(StorageError::not_found("team_invite", id)),
        };

        if !invite.is_pending() {
            return Err(StorageError::Conflict {
                message: format!("invite {} has already been accepted", id),
            });
        }

        sqlx::query("DELETE FROM team_invites WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn create_story_map(&self, map: &StoryMap) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO story_maps (id, team_id, name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&map.id)
        .bind(&map.team_id)
        .bind(&map.name)
        .bind(map.created_at.to_rfc3339())
        .bind(map.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_story_map(&self, id: &str) -> StorageResult<Option<StoryMap>> {
        let row: Option<MapRow> = sqlx::query_as(
            "SELECT id, team_id, name, created_at, updated_at FROM story_maps WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_team_story_maps(&self, team_id: &str) -> StorageResult<Vec<StoryMap>> {
        let rows: Vec<MapRow> = sqlx::query_as(
            r#"
            SELECT id, team_id, name, created_at, updated_at
            FROM story_maps
            WHERE team_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn rename_story_map(&self, id: &str, name: &str) -> StorageResult<StoryMap> {
        let result = sqlx::query("UPDATE story_maps SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("story_map", id));
        }

        self.get_story_map(id)
            .await?
            .ok_or_else(|| StorageError::not_found("story_map", id))
    }

    async fn delete_story_map(&self, id: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM story_maps WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("story_map", id));
        }

        Ok(())
    }

    async fn get_story_map_tree(&self, id: &str) -> StorageResult<StoryMapTree> {
        let story_map = self
            .get_story_map(id)
            .await?
            .ok_or_else(|| StorageError::not_found("story_map", id))?;

        let personas: Vec<PersonaRow> = sqlx::query_as(
            r#"
            SELECT id, story_map_id, name, description, sort_order, created_at, updated_at
            FROM personas
            WHERE story_map_id = ?
            ORDER BY sort_order ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let activities: Vec<ActivityRow> = sqlx::query_as(
            r#"
            SELECT id, story_map_id, name, sort_order, created_at, updated_at
            FROM activities
            WHERE story_map_id = ?
            ORDER BY sort_order ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let tasks: Vec<TaskRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.activity_id, t.name, t.sort_order, t.created_at, t.updated_at
            FROM tasks t
            JOIN activities a ON a.id = t.activity_id
            WHERE a.story_map_id = ?
            ORDER BY a.sort_order ASC, t.sort_order ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let releases: Vec<ReleaseRow> = sqlx::query_as(
            r#"
            SELECT id, story_map_id, name, sort_order, created_at, updated_at
            FROM releases
            WHERE story_map_id = ?
            ORDER BY sort_order ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let stories: Vec<StoryRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.task_id, s.release_id, s.title, s.requirements,
                   s.acceptance_criteria, s.design_link, s.edge_cases,
                   s.technical_notes, s.status, s.sort_order, s.created_at, s.updated_at
            FROM stories s
            JOIN tasks t ON t.id = s.task_id
            JOIN activities a ON a.id = t.activity_id
            WHERE a.story_map_id = ?
            ORDER BY a.sort_order ASC, t.sort_order ASC, s.release_id ASC, s.sort_order ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(StoryMapTree {
            story_map,
            personas: personas.into_iter().map(|r| r.into()).collect(),
            activities: activities.into_iter().map(|r| r.into()).collect(),
            tasks: tasks.into_iter().map(|r| r.into()).collect(),
            releases: releases.into_iter().map(|r| r.into()).collect(),
            stories: stories.into_iter().map(|r| r.into()).collect(),
        })
    }

    async fn create_persona(&self, persona: &Persona) -> StorageResult<Persona> {
        sqlx::query(
            r#"
            INSERT INTO personas (id, story_map_id, name, description, sort_order, created_at, updated_at)
            VALUES (?, ?, ?, ?,
                (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM personas WHERE story_map_id = ?),
                ?, ?)
            "#,
        )
        .bind(&persona.id)
        .bind(&persona.story_map_id)
        .bind(&persona.name)
        .bind(&persona.description)
        .bind(&persona.story_map_id)
        .bind(persona.created_at.to_rfc3339())
        .bind(persona.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get_persona(&persona.id)
            .await?
            .ok_or_else(|| StorageError::not_found("persona", persona.id.as_str()))
    }

    async fn get_persona(&self, id: &str) -> StorageResult<Option<Persona>> {
        let row: Option<PersonaRow> = sqlx::query_as(
            r#"
            SELECT id, story_map_id, name, description, sort_order, created_at, updated_at
            FROM personas
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn update_persona(&self, id: &str, patch: &PersonaPatch) -> StorageResult<Persona> {
        if !patch.has_changes() {
            return Err(StorageError::Validation {
                message: "update must supply at least one field".to_string(),
            });
        }

        let mut persona = self
            .get_persona(id)
            .await?
            .ok_or_else(|| StorageError::not_found("persona", id))?;

        if let Some(name) = &patch.name {
            persona.name = name.clone();
        }
        if let Some(description) = &patch.description {
            persona.description = description.clone();
        }
        persona.updated_at = Utc::now();

        sqlx::query(
            "UPDATE personas SET name = ?, description = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&persona.name)
        .bind(&persona.description)
        .bind(persona.updated_at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(persona)
    }

    async fn delete_persona(&self, id: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM personas WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("persona", id));
        }

        Ok(())
    }

    async fn reorder_personas(
        &self,
        story_map_id: &str,
        ordered_ids: &[String],
    ) -> StorageResult<()> {
        reorder_rows(
            &self.pool,
            "UPDATE personas SET sort_order = ?, updated_at = ? WHERE id = ? AND story_map_id = ?",
            story_map_id,
            ordered_ids,
        )
        .await
    }

    async fn link_persona(
        &self,
        persona_id: &str,
        kind: PersonaLinkKind,
        target_id: &str,
    ) -> StorageResult<()> {
        let persona_map = self
            .persona_map(persona_id)
            .await?
            .ok_or_else(|| StorageError::not_found("persona", persona_id))?;
        let target_map = self
            .link_target_map(kind, target_id)
            .await?
            .ok_or_else(|| StorageError::not_found(kind.entity_name(), target_id))?;

        if persona_map != target_map {
            return Err(StorageError::Validation {
                message: "persona and target belong to different story maps".to_string(),
            });
        }

        let sql = match kind {
            PersonaLinkKind::Activity => {
                "INSERT OR IGNORE INTO persona_activities (persona_id, activity_id) VALUES (?, ?)"
            }
            PersonaLinkKind::Task => {
                "INSERT OR IGNORE INTO persona_tasks (persona_id, task_id) VALUES (?, ?)"
            }
            PersonaLinkKind::Story => {
                "INSERT OR IGNORE INTO persona_stories (persona_id, story_id) VALUES (?, ?)"
            }
        };

        sqlx::query(sql)
            .bind(persona_id)
            .bind(target_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn unlink_persona(
        &self,
        persona_id: &str,
        kind: PersonaLinkKind,
        target_id: &str,
    ) -> StorageResult<()> {
        let sql = match kind {
            PersonaLinkKind::Activity => {
                "DELETE FROM persona_activities WHERE persona_id = ? AND activity_id = ?"
            }
            PersonaLinkKind::Task => {
                "DELETE FROM persona_tasks WHERE persona_id = ? AND task_id = ?"
            }
            PersonaLinkKind::Story => {
                "DELETE FROM persona_stories WHERE persona_id = ? AND story_id = ?"
            }
        };

        let result = sqlx::query(sql)
            .bind(persona_id)
            .bind(target_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("persona_link", target_id));
        }

        Ok(())
    }

    async fn get_story_personas(&self, story_id: &str) -> StorageResult<Vec<Persona>> {
        let rows: Vec<PersonaRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.story_map_id, p.name, p.description, p.sort_order,
                   p.created_at, p.updated_at
            FROM personas p
            JOIN persona_stories ps ON ps.persona_id = p.id
            WHERE ps.story_id = ?
            ORDER BY p.sort_order ASC
            "#,
        )
        .bind(story_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn create_activity(&self, activity: &Activity) -> StorageResult<Activity> {
        sqlx::query(
            r#"
            INSERT INTO activities (id, story_map_id, name, sort_order, created_at, updated_at)
            VALUES (?, ?, ?,
                (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM activities WHERE story_map_id = ?),
                ?, ?)
            "#,
        )
        .bind(&activity.id)
        .bind(&activity.story_map_id)
        .bind(&activity.name)
        .bind(&activity.story_map_id)
        .bind(activity.created_at.to_rfc3339())
        .bind(activity.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get_activity(&activity.id)
            .await?
            .ok_or_else(|| StorageError::not_found("activity", activity.id.as_str()))
    }

    async fn get_activity(&self, id: &str) -> StorageResult<Option<Activity>> {
        let row: Option<ActivityRow> = sqlx::query_as(
            r#"
            SELECT id, story_map_id, name, sort_order, created_at, updated_at
            FROM activities
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn rename_activity(&self, id: &str, name: &str) -> StorageResult<Activity> {
        let result = sqlx::query("UPDATE activities SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("activity", id));
        }

        self.get_activity(id)
            .await?
            .ok_or_else(|| StorageError::not_found("activity", id))
    }

    async fn delete_activity(&self, id: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM activities WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("activity", id));
        }

        Ok(())
    }

    async fn reorder_activities(
        &self,
        story_map_id: &str,
        ordered_ids: &[String],
    ) -> StorageResult<()> {
        reorder_rows(
            &self.pool,
            "UPDATE activities SET sort_order = ?, updated_at = ? WHERE id = ? AND story_map_id = ?",
            story_map_id,
            ordered_ids,
        )
        .await
    }

    async fn create_task(&self, task: &Task) -> StorageResult<Task> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, activity_id, name, sort_order, created_at, updated_at)
            VALUES (?, ?, ?,
                (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM tasks WHERE activity_id = ?),
                ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(&task.activity_id)
        .bind(&task.name)
        .bind(&task.activity_id)
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get_task(&task.id)
            .await?
            .ok_or_else(|| StorageError::not_found("task", task.id.as_str()))
    }

    async fn get_task(&self, id: &str) -> StorageResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(
            r#"
            SELECT id, activity_id, name, sort_order, created_at, updated_at
            FROM tasks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn rename_task(&self, id: &str, name: &str) -> StorageResult<Task> {
        let result = sqlx::query("UPDATE tasks SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("task", id));
        }

        self.get_task(id)
            .await?
            .ok_or_else(|| StorageError::not_found("task", id))
    }

    async fn delete_task(&self, id: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("task", id));
        }

        Ok(())
    }

    async fn reorder_tasks(&self, activity_id: &str, ordered_ids: &[String]) -> StorageResult<()> {
        reorder_rows(
            &self.pool,
            "UPDATE tasks SET sort_order = ?, updated_at = ? WHERE id = ? AND activity_id = ?",
            activity_id,
            ordered_ids,
        )
        .await
    }

    async fn create_release(&self, release: &Release) -> StorageResult<Release> {
        sqlx::query(
            r#"
            INSERT INTO releases (id, story_map_id, name, sort_order, created_at, updated_at)
            VALUES (?, ?, ?,
                (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM releases WHERE story_map_id = ?),
                ?, ?)
            "#,
        )
        .bind(&release.id)
        .bind(&release.story_map_id)
        .bind(&release.name)
        .bind(&release.story_map_id)
        .bind(release.created_at.to_rfc3339())
        .bind(release.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get_release(&release.id)
            .await?
            .ok_or_else(|| StorageError::not_found("release", release.id.as_str()))
    }

    async fn get_release(&self, id: &str) -> StorageResult<Option<Release>> {
        let row: Option<ReleaseRow> = sqlx::query_as(
            r#"
            SELECT id, story_map_id, name, sort_order, created_at, updated_at
            FROM releases
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn rename_release(&self, id: &str, name: &str) -> StorageResult<Release> {
        let result = sqlx::query("UPDATE releases SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("release", id));
        }

        self.get_release(id)
            .await?
            .ok_or_else(|| StorageError::not_found("release", id))
    }

    async fn reorder_releases(
        &self,
        story_map_id: &str,
        ordered_ids: &[String],
    ) -> StorageResult<()> {
        reorder_rows(
            &self.pool,
            "UPDATE releases SET sort_order = ?, updated_at = ? WHERE id = ? AND story_map_id = ?",
            story_map_id,
            ordered_ids,
        )
        .await
    }

    async fn delete_release_with_stories(&self, id: &str) -> StorageResult<()> {
        // Stories and the release row go in one transaction; a reader can
        // never observe the release gone with its stories remaining, or
        // the reverse.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM stories WHERE release_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM releases WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the story deletes.
            return Err(StorageError::not_found("release", id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn create_story(&self, story: &Story) -> StorageResult<Story> {
        if let Some(release_id) = &story.release_id {
            self.require_same_map(&story.task_id, release_id).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO stories (id, task_id, release_id, title, requirements,
                acceptance_criteria, design_link, edge_cases, technical_notes,
                status, sort_order, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM stories
                 WHERE task_id = ? AND release_id IS ?),
                ?, ?)
            "#,
        )
        .bind(&story.id)
        .bind(&story.task_id)
        .bind(&story.release_id)
        .bind(&story.title)
        .bind(&story.requirements)
        .bind(&story.acceptance_criteria)
        .bind(&story.design_link)
        .bind(&story.edge_cases)
        .bind(&story.technical_notes)
        .bind(story.status.to_string())
        .bind(&story.task_id)
        .bind(&story.release_id)
        .bind(story.created_at.to_rfc3339())
        .bind(story.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get_story(&story.id)
            .await?
            .ok_or_else(|| StorageError::not_found("story", story.id.as_str()))
    }

    async fn get_story(&self, id: &str) -> StorageResult<Option<Story>> {
        let row: Option<StoryRow> = sqlx::query_as(
            r#"
            SELECT id, task_id, release_id, title, requirements, acceptance_criteria,
                   design_link, edge_cases, technical_notes, status, sort_order,
                   created_at, updated_at
            FROM stories
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn update_story(&self, id: &str, patch: &StoryPatch) -> StorageResult<Story> {
        if !patch.has_changes() {
            return Err(StorageError::Validation {
                message: "update must supply at least one field".to_string(),
            });
        }

        let current = self
            .get_story(id)
            .await?
            .ok_or_else(|| StorageError::not_found("story", id))?;

        let mut story = current.clone();
        if let Some(title) = &patch.title {
            story.title = title.clone();
        }
        if let Some(requirements) = &patch.requirements {
            story.requirements = requirements.clone();
        }
        if let Some(criteria) = &patch.acceptance_criteria {
            story.acceptance_criteria = criteria.clone();
        }
        if let Some(link) = &patch.design_link {
            story.design_link = link.clone();
        }
        if let Some(edge_cases) = &patch.edge_cases {
            story.edge_cases = edge_cases.clone();
        }
        if let Some(notes) = &patch.technical_notes {
            story.technical_notes = notes.clone();
        }
        if let Some(status) = patch.status {
            story.status = status;
        }
        if let Some(task_id) = &patch.task_id {
            story.task_id = task_id.clone();
        }
        if let Some(release_id) = &patch.release_id {
            story.release_id = release_id.clone();
        }
        story.updated_at = Utc::now();

        let moved =
            story.task_id != current.task_id || story.release_id != current.release_id;

        if moved {
            if let Some(release_id) = &story.release_id {
                self.require_same_map(&story.task_id, release_id).await?;
            }

            // Moving cells appends the story at the end of the target
            // (task, release) group; the subquery keeps that assignment in
            // the same statement as the move.
            sqlx::query(
                r#"
                UPDATE stories
                SET task_id = ?, release_id = ?, title = ?, requirements = ?,
                    acceptance_criteria = ?, design_link = ?, edge_cases = ?,
                    technical_notes = ?, status = ?,
                    sort_order = (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM stories
                                  WHERE task_id = ? AND release_id IS ? AND id <> ?),
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&story.task_id)
            .bind(&story.release_id)
            .bind(&story.title)
            .bind(&story.requirements)
            .bind(&story.acceptance_criteria)
            .bind(&story.design_link)
            .bind(&story.edge_cases)
            .bind(&story.technical_notes)
            .bind(story.status.to_string())
            .bind(&story.task_id)
            .bind(&story.release_id)
            .bind(id)
            .bind(story.updated_at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query(
                r#"
                UPDATE stories
                SET title = ?, requirements = ?, acceptance_criteria = ?,
                    design_link = ?, edge_cases = ?, technical_notes = ?,
                    status = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&story.title)
            .bind(&story.requirements)
            .bind(&story.acceptance_criteria)
            .bind(&story.design_link)
            .bind(&story.edge_cases)
            .bind(&story.technical_notes)
            .bind(story.status.to_string())
            .bind(story.updated_at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        }

        self.get_story(id)
            .await?
            .ok_or_else(|| StorageError::not_found("story", id))
    }

    async fn delete_story(&self, id: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM stories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("story", id));
        }

        Ok(())
    }

    async fn reorder_stories(
        &self,
        task_id: &str,
        release_id: Option<&str>,
        ordered_ids: &[String],
    ) -> StorageResult<()> {
        if ordered_ids.is_empty() {
            return Err(StorageError::Validation {
                message: "ordered id list must not be empty".to_string(),
            });
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for (position, story_id) in ordered_ids.iter().enumerate() {
            sqlx::query(
                r#"
                UPDATE stories SET sort_order = ?, updated_at = ?
                WHERE id = ? AND task_id = ? AND release_id IS ?
                "#,
            )
            .bind(position as i64)
            .bind(&now)
            .bind(story_id)
            .bind(task_id)
            .bind(release_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_release_stories(&self, release_id: &str) -> StorageResult<Vec<Story>> {
        let rows: Vec<StoryRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.task_id, s.release_id, s.title, s.requirements,
                   s.acceptance_criteria, s.design_link, s.edge_cases,
                   s.technical_notes, s.status, s.sort_order, s.created_at, s.updated_at
            FROM stories s
            JOIN tasks t ON t.id = s.task_id
            JOIN activities a ON a.id = t.activity_id
            WHERE s.release_id = ?
            ORDER BY a.sort_order ASC, t.sort_order ASC, s.sort_order ASC
            "#,
        )
        .bind(release_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn get_story_context(&self, story_id: &str) -> StorageResult<StoryContext> {
        let story = self
            .get_story(story_id)
            .await?
            .ok_or_else(|| StorageError::not_found("story", story_id))?;

        let task = self
            .get_task(&story.task_id)
            .await?
            .ok_or_else(|| StorageError::not_found("task", story.task_id.as_str()))?;

        let activity = self
            .get_activity(&task.activity_id)
            .await?
            .ok_or_else(|| StorageError::not_found("activity", task.activity_id.as_str()))?;

        let release = match &story.release_id {
            Some(release_id) => self.get_release(release_id).await?,
            None => None,
        };

        let personas = self.get_story_personas(story_id).await?;

        Ok(StoryContext {
            story,
            task,
            activity,
            release,
            personas,
        })
    }

    async fn story_map_team(&self, map_id: &str) -> StorageResult<Option<String>> {
        let team: Option<String> =
            sqlx::query_scalar("SELECT team_id FROM story_maps WHERE id = ?")
                .bind(map_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(team)
    }

    async fn persona_team(&self, persona_id: &str) -> StorageResult<Option<String>> {
        let team: Option<String> = sqlx::query_scalar(
            r#"
            SELECT sm.team_id
            FROM personas p
            JOIN story_maps sm ON sm.id = p.story_map_id
            WHERE p.id = ?
            "#,
        )
        .bind(persona_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    async fn activity_team(&self, activity_id: &str) -> StorageResult<Option<String>> {
        let team: Option<String> = sqlx::query_scalar(
            r#"
            SELECT sm.team_id
            FROM activities a
            JOIN story_maps sm ON sm.id = a.story_map_id
            WHERE a.id = ?
            "#,
        )
        .bind(activity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    async fn task_team(&self, task_id: &str) -> StorageResult<Option<String>> {
        let team: Option<String> = sqlx::query_scalar(
            r#"
            SELECT sm.team_id
            FROM tasks t
            JOIN activities a ON a.id = t.activity_id
            JOIN story_maps sm ON sm.id = a.story_map_id
            WHERE t.id = ?
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    async fn release_team(&self, release_id: &str) -> StorageResult<Option<String>> {
        let team: Option<String> = sqlx::query_scalar(
            r#"
            SELECT sm.team_id
            FROM releases r
            JOIN story_maps sm ON sm.id = r.story_map_id
            WHERE r.id = ?
            "#,
        )
        .bind(release_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    async fn story_team(&self, story_id: &str) -> StorageResult<Option<String>> {
        let team: Option<String> = sqlx::query_scalar(
            r#"
            SELECT sm.team_id
            FROM stories s
            JOIN tasks t ON t.id = s.task_id
            JOIN activities a ON a.id = t.activity_id
            JOIN story_maps sm ON sm.id = a.story_map_id
            WHERE s.id = ?
            "#,
        )
        .bind(story_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }
}

impl SqliteStorage {
    async fn persona_map(&self, persona_id: &str) -> StorageResult<Option<String>> {
        let map: Option<String> =
            sqlx::query_scalar("SELECT story_map_id FROM personas WHERE id = ?")
                .bind(persona_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(map)
    }

    async fn link_target_map(
        &self,
        kind: PersonaLinkKind,
        target_id: &str,
    ) -> StorageResult<Option<String>> {
        let sql = match kind {
            PersonaLinkKind::Activity => "SELECT story_map_id FROM activities WHERE id = ?",
            PersonaLinkKind::Task => {
                r#"
                SELECT a.story_map_id
                FROM tasks t
                JOIN activities a ON a.id = t.activity_id
                WHERE t.id = ?
                "#
            }
            PersonaLinkKind::Story => {
                r#"
                SELECT a.story_map_id
                FROM stories s
                JOIN tasks t ON t.id = s.task_id
                JOIN activities a ON a.id = t.activity_id
                WHERE s.id = ?
                "#
            }
        };

        let map: Option<String> = sqlx::query_scalar(sql)
            .bind(target_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(map)
    }

    /// A story's task and release must come from the same story map.
    async fn require_same_map(&self, task_id: &str, release_id: &str) -> StorageResult<()> {
        let task_map: Option<String> = sqlx::query_scalar(
            r#"
            SELECT a.story_map_id
            FROM tasks t
            JOIN activities a ON a.id = t.activity_id
            WHERE t.id = ?
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;
        let task_map = task_map.ok_or_else(|| StorageError::not_found("task", task_id))?;

        let release_map: Option<String> =
            sqlx::query_scalar("SELECT story_map_id FROM releases WHERE id = ?")
                .bind(release_id)
                .fetch_optional(&self.pool)
                .await?;
        let release_map =
            release_map.ok_or_else(|| StorageError::not_found("release", release_id))?;

        if task_map != release_map {
            return Err(StorageError::Validation {
                message: "task and release belong to different story maps".to_string(),
            });
        }

        Ok(())
    }
}

impl PersonaLinkKind {
    fn entity_name(self) -> &'static str {
        match self {
            PersonaLinkKind::Activity => "activity",
            PersonaLinkKind::Task => "task",
            PersonaLinkKind::Story => "story",
        }
    }
}

/// Reassign each listed sibling's sort_order to its list position in one
/// transaction. The update statement scopes on the parent column so ids
/// from another group are silently ignored; members not listed keep their
/// current values.
async fn reorder_rows(
    pool: &SqlitePool,
    sql: &str,
    parent_id: &str,
    ordered_ids: &[String],
) -> StorageResult<()> {
    if ordered_ids.is_empty() {
        return Err(StorageError::Validation {
            message: "ordered id list must not be empty".to_string(),
        });
    }

    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    for (position, id) in ordered_ids.iter().enumerate() {
        sqlx::query(sql)
            .bind(position as i64)
            .bind(&now)
            .bind(id)
            .bind(parent_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

// Internal row types for SQLx mapping

fn parse_ts(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    display_name: String,
    created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            created_at: parse_ts(&row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: String,
    name: String,
    created_at: String,
    updated_at: String,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: parse_ts(&row.created_at),
            updated_at: parse_ts(&row.updated_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    team_id: String,
    user_id: String,
    role: String,
    created_at: String,
}

impl From<MemberRow> for TeamMember {
    fn from(row: MemberRow) -> Self {
        Self {
            team_id: row.team_id,
            user_id: row.user_id,
            role: row.role.parse().unwrap_or_default(),
            created_at: parse_ts(&row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct InviteRow {
    id: String,
    team_id: String,
    email: String,
    invited_by: String,
    created_at: String,
    accepted_at: Option<String>,
    accepted_by: Option<String>,
}

impl From<InviteRow> for TeamInvite {
    fn from(row: InviteRow) -> Self {
        Self {
            id: row.id,
            team_id: row.team_id,
            email: row.email,
            invited_by: row.invited_by,
            created_at: parse_ts(&row.created_at),
            accepted_at: row.accepted_at.as_deref().map(parse_ts),
            accepted_by: row.accepted_by,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MapRow {
    id: String,
    team_id: String,
    name: String,
    created_at: String,
    updated_at: String,
}

impl From<MapRow> for StoryMap {
    fn from(row: MapRow) -> Self {
        Self {
            id: row.id,
            team_id: row.team_id,
            name: row.name,
            created_at: parse_ts(&row.created_at),
            updated_at: parse_ts(&row.updated_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct PersonaRow {
    id: String,
    story_map_id: String,
    name: String,
    description: Option<String>,
    sort_order: i64,
    created_at: String,
    updated_at: String,
}

impl From<PersonaRow> for Persona {
    fn from(row: PersonaRow) -> Self {
        Self {
            id: row.id,
            story_map_id: row.story_map_id,
            name: row.name,
            description: row.description,
            sort_order: row.sort_order,
            created_at: parse_ts(&row.created_at),
            updated_at: parse_ts(&row.updated_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    story_map_id: String,
    name: String,
    sort_order: i64,
    created_at: String,
    updated_at: String,
}

impl From<ActivityRow> for Activity {
    fn from(row: ActivityRow) -> Self {
        Self {
            id: row.id,
            story_map_id: row.story_map_id,
            name: row.name,
            sort_order: row.sort_order,
            created_at: parse_ts(&row.created_at),
            updated_at: parse_ts(&row.updated_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    activity_id: String,
    name: String,
    sort_order: i64,
    created_at: String,
    updated_at: String,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            activity_id: row.activity_id,
            name: row.name,
            sort_order: row.sort_order,
            created_at: parse_ts(&row.created_at),
            updated_at: parse_ts(&row.updated_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReleaseRow {
    id: String,
    story_map_id: String,
    name: String,
    sort_order: i64,
    created_at: String,
    updated_at: String,
}

impl From<ReleaseRow> for Release {
    fn from(row: ReleaseRow) -> Self {
        Self {
            id: row.id,
            story_map_id: row.story_map_id,
            name: row.name,
            sort_order: row.sort_order,
            created_at: parse_ts(&row.created_at),
            updated_at: parse_ts(&row.updated_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct StoryRow {
    id: String,
    task_id: String,
    release_id: Option<String>,
    title: String,
    requirements: String,
    acceptance_criteria: String,
    design_link: Option<String>,
    edge_cases: Option<String>,
    technical_notes: Option<String>,
    status: String,
    sort_order: i64,
    created_at: String,
    updated_at: String,
}

impl From<StoryRow> for Story {
    fn from(row: StoryRow) -> Self {
        Self {
            id: row.id,
            task_id: row.task_id,
            release_id: row.release_id,
            title: row.title,
            requirements: row.requirements,
            acceptance_criteria: row.acceptance_criteria,
            design_link: row.design_link,
            edge_cases: row.edge_cases,
            technical_notes: row.technical_notes,
            status: row.status.parse().unwrap_or_default(),
            sort_order: row.sort_order,
            created_at: parse_ts(&row.created_at),
            updated_at: parse_ts(&row.updated_at),
        }
    }
}
