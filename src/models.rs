//! Core data models for the story-form domain.
//!
//! These are the JSON shapes persisted by the storage layer and exchanged
//! with the REST API. Optional fields marked with `skip_serializing_if` are
//! omitted from payloads when absent; `team_id` is always present and
//! explicitly `null` for personal (team-less) records.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Field-name → value mapping holding one step's answers.
pub type ResponseMap = serde_json::Map<String, Value>;

/// Current timestamp as an RFC 3339 string, the format used for all
/// `created_at`/`updated_at`/`read_at` fields.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("current time formats as RFC 3339")
}

/// Ordered phases of the story wizard.
///
/// Serialized in kebab-case (`"section-a"`), the spelling the step
/// configuration and API routes use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    #[default]
    Intro,
    SectionA,
    SectionB,
    SectionC,
    Complete,
}

impl StepId {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StepId::Intro => "intro",
            StepId::SectionA => "section-a",
            StepId::SectionB => "section-b",
            StepId::SectionC => "section-c",
            StepId::Complete => "complete",
        }
    }

    /// Parses a step id string; unknown ids yield `None`.
    pub fn parse(s: &str) -> Option<StepId> {
        match s {
            "intro" => Some(StepId::Intro),
            "section-a" => Some(StepId::SectionA),
            "section-b" => Some(StepId::SectionB),
            "section-c" => Some(StepId::SectionC),
            "complete" => Some(StepId::Complete),
            _ => None,
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    InProgress,
    Completed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatus {
    Active,
    Inactive,
}

/// An authenticated identity. Persisted at `user:{id}`, with the signed-in
/// copy mirrored at `auth:user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified_at: Option<String>,
}

/// A group that owns projects. Persisted at `team:{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TeamStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// One story: the wizard's unit of work. Persisted at `project:{id}`.
///
/// `responses` maps step-id strings to that step's answers; steps are
/// replaced wholesale when saved, never merged field-by-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub team_id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub current_step: StepId,
    #[serde(default)]
    pub responses: HashMap<String, ResponseMap>,
    pub created_at: String,
    pub updated_at: String,
}

impl Project {
    /// Answers stored for `step`, if any.
    pub fn step_responses(&self, step: &str) -> Option<&ResponseMap> {
        self.responses.get(step)
    }

    pub fn touch(&mut self) {
        self.updated_at = now_rfc3339();
    }
}

/// One inbox entry. `read_at` transitions `null` → timestamp exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppNotification {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub link: Option<String>,
    pub read_at: Option<String>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_ids_round_trip_kebab_case() {
        for (step, id) in [
            (StepId::Intro, "intro"),
            (StepId::SectionA, "section-a"),
            (StepId::SectionB, "section-b"),
            (StepId::SectionC, "section-c"),
            (StepId::Complete, "complete"),
        ] {
            assert_eq!(step.as_str(), id);
            assert_eq!(StepId::parse(id), Some(step));
            assert_eq!(serde_json::to_value(step).unwrap(), Value::String(id.into()));
        }
        assert_eq!(StepId::parse("section_a"), None);
    }

    #[test]
    fn project_json_layout_matches_wire_format() {
        let mut responses = HashMap::new();
        let mut intro = ResponseMap::new();
        intro.insert("intro_1".into(), Value::String("Once upon a time".into()));
        responses.insert("intro".to_string(), intro);

        let project = Project {
            id: "project-abc1234".into(),
            user_id: "1".into(),
            team_id: None,
            title: "Untitled Story".into(),
            description: None,
            status: ProjectStatus::Draft,
            current_step: StepId::Intro,
            responses,
            created_at: "2025-01-01T00:00:00Z".into(),
            updated_at: "2025-01-01T00:00:00Z".into(),
        };

        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["status"], "draft");
        assert_eq!(json["current_step"], "intro");
        // team-less projects carry an explicit null, absent description is omitted
        assert!(json["team_id"].is_null());
        assert!(json.get("description").is_none());
        assert_eq!(json["responses"]["intro"]["intro_1"], "Once upon a time");

        let back: Project = serde_json::from_value(json).unwrap();
        assert_eq!(back, project);
    }

    #[test]
    fn project_without_responses_field_deserializes_empty() {
        let raw = r#"{
            "id": "p1", "user_id": "1", "team_id": null,
            "title": "T", "status": "in_progress", "current_step": "section-b",
            "created_at": "2025-01-01T00:00:00Z", "updated_at": "2025-01-02T00:00:00Z"
        }"#;
        let project: Project = serde_json::from_str(raw).unwrap();
        assert!(project.responses.is_empty());
        assert_eq!(project.status, ProjectStatus::InProgress);
        assert_eq!(project.current_step, StepId::SectionB);
    }
}
