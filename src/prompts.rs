//! Centralized prompt definitions for the agent context service
//!
//! This module contains the fixed instructional text handed to coding
//! agents alongside story data. Centralizing it makes it easier to
//! maintain, test, and version.

/// Preamble attached to every story_context result.
///
/// Tells the agent how to read the brief and what to treat as binding.
pub const STORY_CONTEXT_PREAMBLE: &str = r#"You are implementing one user story from a story map.

How to read this brief:
- "requirements" describes what the story must do. Treat it as binding.
- "acceptance_criteria" is the checklist the implementation is judged
  against. Every criterion must hold before the story is done.
- "edge_cases", when present, lists conditions the implementation must
  handle explicitly. Do not skip them.
- "technical_notes", when present, carries constraints or guidance from
  the team. Follow it unless it conflicts with the requirements.
- "design_link", when present, points at the authoritative design
  reference for UI work.

Context:
- "task" and "activity" place the story in the user journey. Use them to
  understand intent, not as extra requirements.
- "release", when present, names the delivery slice the story belongs to.
- "personas" describes who this story is for. Prefer wording and flows
  that fit these users.

Scope discipline: implement exactly this story. Do not pull in work from
neighboring stories, and do not invent requirements that are not written
here. If the brief is ambiguous, prefer the narrowest reading that
satisfies the acceptance criteria."#;
