//! Storage layer for the story-map hierarchy.
//!
//! This module defines the domain types (teams, story maps, personas,
//! activities, tasks, releases, stories) and the [`Storage`] trait that the
//! SQLite backend implements. The store owns the two invariant-bearing
//! operations: sibling reorder and the cascading release delete, both of
//! which must be atomic.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageResult;

/// A registered user. Identity management proper (passwords, OAuth) is an
/// external collaborator; this row is what team membership points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: String,
    /// Unique email address.
    pub email: String,
    /// Display name shown in member lists.
    pub display_name: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// A bearer session token for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    /// The opaque bearer token.
    pub token: String,
    /// The user this session belongs to.
    pub user_id: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// A workspace owning story maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// Unique team identifier.
    pub id: String,
    /// Team name.
    pub name: String,
    /// When the team was created.
    pub created_at: DateTime<Utc>,
    /// When the team was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Membership role within a team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    /// May rename/delete the team and manage membership and invites.
    Owner,
    /// May manage story-map content only.
    #[default]
    Member,
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamRole::Owner => write!(f, "owner"),
            TeamRole::Member => write!(f, "member"),
        }
    }
}

impl std::str::FromStr for TeamRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(TeamRole::Owner),
            "member" => Ok(TeamRole::Member),
            _ => Err(format!("Unknown team role: {}", s)),
        }
    }
}

/// Join of user and team with a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    /// The team.
    pub team_id: String,
    /// The user.
    pub user_id: String,
    /// Membership role.
    pub role: TeamRole,
    /// When the membership was created.
    pub created_at: DateTime<Utc>,
}

/// A pending invitation of an email address to a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamInvite {
    /// Unique invite identifier.
    pub id: String,
    /// The team the invite is for.
    pub team_id: String,
    /// The invited email address.
    pub email: String,
    /// The owner who created the invite.
    pub invited_by: String,
    /// When the invite was created.
    pub created_at: DateTime<Utc>,
    /// When the invite was accepted, if it has been.
    pub accepted_at: Option<DateTime<Utc>>,
    /// The user who accepted the invite, if it has been.
    pub accepted_by: Option<String>,
}

/// Root container for one product's planning hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryMap {
    /// Unique story-map identifier.
    pub id: String,
    /// Owning team.
    pub team_id: String,
    /// Map name.
    pub name: String,
    /// When the map was created.
    pub created_at: DateTime<Utc>,
    /// When the map was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A user-type tag scoped to a story map, attachable to activities, tasks
/// and stories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Unique persona identifier.
    pub id: String,
    /// Owning story map.
    pub story_map_id: String,
    /// Persona name.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Dense 0-based position among the map's personas.
    pub sort_order: i64,
    /// When the persona was created.
    pub created_at: DateTime<Utc>,
    /// When the persona was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Top-level journey phase (backbone row 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Unique activity identifier.
    pub id: String,
    /// Owning story map.
    pub story_map_id: String,
    /// Activity name.
    pub name: String,
    /// Dense 0-based position among the map's activities.
    pub sort_order: i64,
    /// When the activity was created.
    pub created_at: DateTime<Utc>,
    /// When the activity was last updated.
    pub updated_at: DateTime<Utc>,
}

/// User action within an activity (backbone row 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Owning activity.
    pub activity_id: String,
    /// Task name.
    pub name: String,
    /// Dense 0-based position among the activity's tasks.
    pub sort_order: i64,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Named horizontal slice grouping stories for delivery planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// Unique release identifier.
    pub id: String,
    /// Owning story map.
    pub story_map_id: String,
    /// Release name.
    pub name: String,
    /// Dense 0-based position among the map's releases.
    pub sort_order: i64,
    /// When the release was created.
    pub created_at: DateTime<Utc>,
    /// When the release was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Workflow status of a story.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    /// Not yet scheduled for work.
    #[default]
    Backlog,
    /// Refined and ready to pick up.
    Ready,
    /// Actively being implemented.
    InProgress,
    /// Implementation done, under review.
    Review,
    /// Accepted and complete.
    Done,
}

impl std::fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoryStatus::Backlog => write!(f, "backlog"),
            StoryStatus::Ready => write!(f, "ready"),
            StoryStatus::InProgress => write!(f, "in_progress"),
            StoryStatus::Review => write!(f, "review"),
            StoryStatus::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for StoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "backlog" => Ok(StoryStatus::Backlog),
            "ready" => Ok(StoryStatus::Ready),
            "in_progress" => Ok(StoryStatus::InProgress),
            "review" => Ok(StoryStatus::Review),
            "done" => Ok(StoryStatus::Done),
            _ => Err(format!("Unknown story status: {}", s)),
        }
    }
}

/// The leaf implementation unit, positioned by (task, release).
///
/// A `release_id` of `None` means the story sits in the backlog band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    /// Unique story identifier.
    pub id: String,
    /// Owning task.
    pub task_id: String,
    /// Containing release; `None` means backlog.
    pub release_id: Option<String>,
    /// Story title.
    pub title: String,
    /// Free-text requirements.
    pub requirements: String,
    /// Free-text acceptance criteria.
    pub acceptance_criteria: String,
    /// Optional design-reference link.
    pub design_link: Option<String>,
    /// Optional free-text edge cases.
    pub edge_cases: Option<String>,
    /// Optional free-text technical guidance.
    pub technical_notes: Option<String>,
    /// Workflow status.
    pub status: StoryStatus,
    /// Dense 0-based position among stories sharing the same (task, release).
    pub sort_order: i64,
    /// When the story was created.
    pub created_at: DateTime<Utc>,
    /// When the story was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Which association table a persona link targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaLinkKind {
    /// Link to an activity.
    Activity,
    /// Link to a task.
    Task,
    /// Link to a story.
    Story,
}

impl std::str::FromStr for PersonaLinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "activity" | "activities" => Ok(PersonaLinkKind::Activity),
            "task" | "tasks" => Ok(PersonaLinkKind::Task),
            "story" | "stories" => Ok(PersonaLinkKind::Story),
            _ => Err(format!("Unknown persona link kind: {}", s)),
        }
    }
}

/// Partial update for a persona. Absent fields are left untouched;
/// `description: Some(None)` clears the column.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonaPatch {
    /// New name, if supplied.
    pub name: Option<String>,
    /// New description; `Some(None)` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl PersonaPatch {
    /// Whether any recognized field is present.
    pub fn has_changes(&self) -> bool {
        self.name.is_some() || self.description.is_some()
    }
}

/// Partial update for a story. Absent fields are left untouched; the
/// double-`Option` fields distinguish "absent" from "set to null".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoryPatch {
    /// New title, if supplied.
    pub title: Option<String>,
    /// New requirements text, if supplied.
    pub requirements: Option<String>,
    /// New acceptance criteria, if supplied.
    pub acceptance_criteria: Option<String>,
    /// New design link; `Some(None)` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub design_link: Option<Option<String>>,
    /// New edge-case notes; `Some(None)` clears them.
    #[serde(default, deserialize_with = "double_option")]
    pub edge_cases: Option<Option<String>>,
    /// New technical guidance; `Some(None)` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub technical_notes: Option<Option<String>>,
    /// New status, if supplied.
    pub status: Option<StoryStatus>,
    /// Move to another task, if supplied.
    pub task_id: Option<String>,
    /// Move to another release; `Some(None)` moves to the backlog band.
    #[serde(default, deserialize_with = "double_option")]
    pub release_id: Option<Option<String>>,
}

impl StoryPatch {
    /// Whether any recognized field is present.
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.requirements.is_some()
            || self.acceptance_criteria.is_some()
            || self.design_link.is_some()
            || self.edge_cases.is_some()
            || self.technical_notes.is_some()
            || self.status.is_some()
            || self.task_id.is_some()
            || self.release_id.is_some()
    }
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// The full hierarchy of one story map, each sibling group in display
/// order, as the canvas client and the agent context service consume it.
#[derive(Debug, Clone, Serialize)]
pub struct StoryMapTree {
    /// The map itself.
    pub story_map: StoryMap,
    /// Personas in display order.
    pub personas: Vec<Persona>,
    /// Activities in display order.
    pub activities: Vec<Activity>,
    /// Tasks of all activities, grouped by activity in display order.
    pub tasks: Vec<Task>,
    /// Releases in display order.
    pub releases: Vec<Release>,
    /// Stories of all tasks, in (task, release, sort_order) order.
    pub stories: Vec<Story>,
}

/// One story with its surrounding hierarchy, as handed to coding agents.
#[derive(Debug, Clone, Serialize)]
pub struct StoryContext {
    /// The story.
    pub story: Story,
    /// Its task.
    pub task: Task,
    /// The task's activity.
    pub activity: Activity,
    /// The containing release, if any.
    pub release: Option<Release>,
    /// Personas attached to the story.
    pub personas: Vec<Persona>,
}

impl User {
    /// Create a new user
    pub fn new(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.into(),
            display_name: display_name.into(),
            created_at: Utc::now(),
        }
    }
}

impl SessionToken {
    /// Create a new session token for a user
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            created_at: Utc::now(),
        }
    }
}

impl Team {
    /// Create a new team
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl TeamMember {
    /// Create a new membership row
    pub fn new(team_id: impl Into<String>, user_id: impl Into<String>, role: TeamRole) -> Self {
        Self {
            team_id: team_id.into(),
            user_id: user_id.into(),
            role,
            created_at: Utc::now(),
        }
    }
}

impl TeamInvite {
    /// Create a new pending invite
    pub fn new(
        team_id: impl Into<String>,
        email: impl Into<String>,
        invited_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            team_id: team_id.into(),
            email: email.into(),
            invited_by: invited_by.into(),
            created_at: Utc::now(),
            accepted_at: None,
            accepted_by: None,
        }
    }

    /// Whether the invite is still pending.
    pub fn is_pending(&self) -> bool {
        self.accepted_at.is_none()
    }
}

impl StoryMap {
    /// Create a new story map for a team
    pub fn new(team_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            team_id: team_id.into(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Persona {
    /// Create a new persona in a story map
    pub fn new(story_map_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            story_map_id: story_map_id.into(),
            name: name.into(),
            description: None,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Activity {
    /// Create a new activity in a story map
    pub fn new(story_map_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            story_map_id: story_map_id.into(),
            name: name.into(),
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Task {
    /// Create a new task in an activity
    pub fn new(activity_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            activity_id: activity_id.into(),
            name: name.into(),
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Release {
    /// Create a new release in a story map
    pub fn new(story_map_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            story_map_id: story_map_id.into(),
            name: name.into(),
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Story {
    /// Create a new story in a task's backlog band with default status
    pub fn new(
        task_id: impl Into<String>,
        title: impl Into<String>,
        requirements: impl Into<String>,
        acceptance_criteria: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            release_id: None,
            title: title.into(),
            requirements: requirements.into(),
            acceptance_criteria: acceptance_criteria.into(),
            design_link: None,
            edge_cases: None,
            technical_notes: None,
            status: StoryStatus::Backlog,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Place the story in a release
    pub fn with_release(mut self, release_id: impl Into<String>) -> Self {
        self.release_id = Some(release_id.into());
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: StoryStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the design-reference link
    pub fn with_design_link(mut self, link: impl Into<String>) -> Self {
        self.design_link = Some(link.into());
        self
    }

    /// Set the edge-case notes
    pub fn with_edge_cases(mut self, edge_cases: impl Into<String>) -> Self {
        self.edge_cases = Some(edge_cases.into());
        self
    }

    /// Set the technical guidance
    pub fn with_technical_notes(mut self, notes: impl Into<String>) -> Self {
        self.technical_notes = Some(notes.into());
        self
    }
}

/// Storage trait for database operations.
///
/// Create operations compute `sort_order` at insert time (next dense value
/// in the sibling group) and return the stored row. Reorder and the
/// cascading release delete are single transactions.
#[async_trait]
pub trait Storage: Send + Sync {
    // User and session operations

    /// Create a new user.
    async fn create_user(&self, user: &User) -> StorageResult<()>;
    /// Get a user by ID.
    async fn get_user(&self, id: &str) -> StorageResult<Option<User>>;
    /// Get a user by email address.
    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;
    /// Create a new session token.
    async fn create_session(&self, session: &SessionToken) -> StorageResult<()>;
    /// Resolve a bearer token to its user.
    async fn get_session_user(&self, token: &str) -> StorageResult<Option<User>>;

    // Team operations

    /// Create a team with its creator as the initial owner, atomically.
    async fn create_team(&self, team: &Team, owner_id: &str) -> StorageResult<()>;
    /// Get a team by ID.
    async fn get_team(&self, id: &str) -> StorageResult<Option<Team>>;
    /// List the teams a user belongs to.
    async fn list_user_teams(&self, user_id: &str) -> StorageResult<Vec<Team>>;
    /// Rename a team.
    async fn rename_team(&self, id: &str, name: &str) -> StorageResult<Team>;
    /// Delete a team and everything under it.
    async fn delete_team(&self, id: &str) -> StorageResult<()>;

    // Membership operations

    /// Get a user's membership in a team.
    async fn get_member(&self, team_id: &str, user_id: &str) -> StorageResult<Option<TeamMember>>;
    /// List a team's members.
    async fn list_members(&self, team_id: &str) -> StorageResult<Vec<TeamMember>>;
    /// Add a member to a team.
    async fn add_member(&self, member: &TeamMember) -> StorageResult<()>;
    /// Remove a member from a team.
    async fn remove_member(&self, team_id: &str, user_id: &str) -> StorageResult<()>;

    // Invite operations

    /// Create a pending invite.
    async fn create_invite(&self, invite: &TeamInvite) -> StorageResult<()>;
    /// Get an invite by ID.
    async fn get_invite(&self, id: &str) -> StorageResult<Option<TeamInvite>>;
    /// List a team's invites.
    async fn list_team_invites(&self, team_id: &str) -> StorageResult<Vec<TeamInvite>>;
    /// Accept an invite: mark it accepted and add membership, atomically.
    async fn accept_invite(&self, id: &str, user_id: &str) -> StorageResult<TeamInvite>;
    /// Cancel a pending invite.
    async fn cancel_invite(&self, id: &str) -> StorageResult<()>;

    // Story map operations

    /// Create a story map.
    async fn create_story_map(&self, map: &StoryMap) -> StorageResult<()>;
    /// Get a story map by ID.
    async fn get_story_map(&self, id: &str) -> StorageResult<Option<StoryMap>>;
    /// List a team's story maps.
    async fn list_team_story_maps(&self, team_id: &str) -> StorageResult<Vec<StoryMap>>;
    /// Rename a story map.
    async fn rename_story_map(&self, id: &str, name: &str) -> StorageResult<StoryMap>;
    /// Delete a story map and everything under it.
    async fn delete_story_map(&self, id: &str) -> StorageResult<()>;
    /// Fetch the full hierarchy of a map in display order.
    async fn get_story_map_tree(&self, id: &str) -> StorageResult<StoryMapTree>;

    // Persona operations

    /// Create a persona; `sort_order` is assigned by the store.
    async fn create_persona(&self, persona: &Persona) -> StorageResult<Persona>;
    /// Get a persona by ID.
    async fn get_persona(&self, id: &str) -> StorageResult<Option<Persona>>;
    /// Apply a partial update to a persona.
    async fn update_persona(&self, id: &str, patch: &PersonaPatch) -> StorageResult<Persona>;
    /// Delete a persona and its link rows.
    async fn delete_persona(&self, id: &str) -> StorageResult<()>;
    /// Atomically reassign the listed personas' sort_order to list position.
    async fn reorder_personas(&self, story_map_id: &str, ordered_ids: &[String])
        -> StorageResult<()>;
    /// Attach a persona to an activity, task or story.
    async fn link_persona(
        &self,
        persona_id: &str,
        kind: PersonaLinkKind,
        target_id: &str,
    ) -> StorageResult<()>;
    /// Detach a persona from an activity, task or story.
    async fn unlink_persona(
        &self,
        persona_id: &str,
        kind: PersonaLinkKind,
        target_id: &str,
    ) -> StorageResult<()>;
    /// Personas attached to a story, in display order.
    async fn get_story_personas(&self, story_id: &str) -> StorageResult<Vec<Persona>>;

    // Activity operations

    /// Create an activity; `sort_order` is assigned by the store.
    async fn create_activity(&self, activity: &Activity) -> StorageResult<Activity>;
    /// Get an activity by ID.
    async fn get_activity(&self, id: &str) -> StorageResult<Option<Activity>>;
    /// Rename an activity.
    async fn rename_activity(&self, id: &str, name: &str) -> StorageResult<Activity>;
    /// Delete an activity, cascading to its tasks and their stories.
    async fn delete_activity(&self, id: &str) -> StorageResult<()>;
    /// Atomically reassign the listed activities' sort_order to list position.
    async fn reorder_activities(
        &self,
        story_map_id: &str,
        ordered_ids: &[String],
    ) -> StorageResult<()>;

    // Task operations

    /// Create a task; `sort_order` is assigned by the store.
    async fn create_task(&self, task: &Task) -> StorageResult<Task>;
    /// Get a task by ID.
    async fn get_task(&self, id: &str) -> StorageResult<Option<Task>>;
    /// Rename a task.
    async fn rename_task(&self, id: &str, name: &str) -> StorageResult<Task>;
    /// Delete a task, cascading to its stories.
    async fn delete_task(&self, id: &str) -> StorageResult<()>;
    /// Atomically reassign the listed tasks' sort_order to list position.
    async fn reorder_tasks(&self, activity_id: &str, ordered_ids: &[String]) -> StorageResult<()>;

    // Release operations

    /// Create a release; `sort_order` is assigned by the store.
    async fn create_release(&self, release: &Release) -> StorageResult<Release>;
    /// Get a release by ID.
    async fn get_release(&self, id: &str) -> StorageResult<Option<Release>>;
    /// Rename a release.
    async fn rename_release(&self, id: &str, name: &str) -> StorageResult<Release>;
    /// Atomically reassign the listed releases' sort_order to list position.
    async fn reorder_releases(
        &self,
        story_map_id: &str,
        ordered_ids: &[String],
    ) -> StorageResult<()>;
    /// Delete a release and all its stories as one atomic unit.
    ///
    /// A missing release yields the distinct not-found condition.
    async fn delete_release_with_stories(&self, id: &str) -> StorageResult<()>;

    // Story operations

    /// Create a story; `sort_order` is assigned within its (task, release)
    /// group by the store.
    async fn create_story(&self, story: &Story) -> StorageResult<Story>;
    /// Get a story by ID.
    async fn get_story(&self, id: &str) -> StorageResult<Option<Story>>;
    /// Apply a partial update to a story. Moving it to another (task,
    /// release) group appends it at the end of the target group.
    async fn update_story(&self, id: &str, patch: &StoryPatch) -> StorageResult<Story>;
    /// Delete a story.
    async fn delete_story(&self, id: &str) -> StorageResult<()>;
    /// Atomically reassign the listed stories' sort_order to list position
    /// within the (task, release) group; `None` release means the backlog
    /// band.
    async fn reorder_stories(
        &self,
        task_id: &str,
        release_id: Option<&str>,
        ordered_ids: &[String],
    ) -> StorageResult<()>;
    /// The stories of one release, in backbone order.
    async fn list_release_stories(&self, release_id: &str) -> StorageResult<Vec<Story>>;
    /// One story with its task, activity, release and personas.
    async fn get_story_context(&self, story_id: &str) -> StorageResult<StoryContext>;

    // Team scoping lookups (authorization support)

    /// The team owning a story map, if it exists.
    async fn story_map_team(&self, map_id: &str) -> StorageResult<Option<String>>;
    /// The team owning a persona, if it exists.
    async fn persona_team(&self, persona_id: &str) -> StorageResult<Option<String>>;
    /// The team owning an activity, if it exists.
    async fn activity_team(&self, activity_id: &str) -> StorageResult<Option<String>>;
    /// The team owning a task, if it exists.
    async fn task_team(&self, task_id: &str) -> StorageResult<Option<String>>;
    /// The team owning a release, if it exists.
    async fn release_team(&self, release_id: &str) -> StorageResult<Option<String>>;
    /// The team owning a story, if it exists.
    async fn story_team(&self, story_id: &str) -> StorageResult<Option<String>>;
}
