use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Self-reported skill level of the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

impl FromStr for SkillLevel {
    type Err = SkillLevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(SkillLevelParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`SkillLevel`] string.
#[derive(Debug, Clone)]
pub struct SkillLevelParseError(pub String);

impl fmt::Display for SkillLevelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid skill level: {:?} (expected beginner, intermediate, or advanced)",
            self.0
        )
    }
}

impl std::error::Error for SkillLevelParseError {}

// ---------------------------------------------------------------------------

/// How much time per week the learner can commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeAvailability {
    Low,
    Medium,
    High,
}

impl TimeAvailability {
    /// Hours-per-week range quoted to the model for this band.
    pub fn hours_per_week(self) -> &'static str {
        match self {
            Self::Low => "1-3",
            Self::Medium => "4-7",
            Self::High => "8+",
        }
    }
}

impl fmt::Display for TimeAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for TimeAvailability {
    type Err = TimeAvailabilityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(TimeAvailabilityParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TimeAvailability`] string.
#[derive(Debug, Clone)]
pub struct TimeAvailabilityParseError(pub String);

impl fmt::Display for TimeAvailabilityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid time availability: {:?} (expected low, medium, or high)",
            self.0
        )
    }
}

impl std::error::Error for TimeAvailabilityParseError {}

// ---------------------------------------------------------------------------

/// Completion status of a single module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for ModuleStatus {
    type Err = ModuleStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-started" => Ok(Self::NotStarted),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(ModuleStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ModuleStatus`] string.
#[derive(Debug, Clone)]
pub struct ModuleStatusParseError(pub String);

impl fmt::Display for ModuleStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid module status: {:?} (expected not-started, in-progress, or completed)",
            self.0
        )
    }
}

impl std::error::Error for ModuleStatusParseError {}

// ---------------------------------------------------------------------------

/// Kind of a recommended resource.
///
/// Kinds the model invents outside the documented three deserialize as
/// [`ResourceKind::Other`] instead of rejecting the whole plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Video,
    Article,
    Course,
    #[serde(other)]
    Other,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Video => "video",
            Self::Article => "article",
            Self::Course => "course",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// A recommended video, article, or course attached to a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningResource {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub title: String,
    pub url: String,
}

/// One unit of a learning path. `status` is the only field that changes
/// after generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningModule {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: ModuleStatus,
    #[serde(rename = "estimatedHours")]
    pub estimated_hours: f64,
    #[serde(default)]
    pub resources: Vec<LearningResource>,
}

/// A generated or saved learning path.
///
/// `id`, `created_at`, and `user_id` stay `None` until the path is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub modules: Vec<LearningModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl LearningPath {
    /// Look up a module by id.
    pub fn module(&self, id: &str) -> Option<&LearningModule> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Look up a module by id for mutation.
    pub fn module_mut(&mut self, id: &str) -> Option<&mut LearningModule> {
        self.modules.iter_mut().find(|m| m.id == id)
    }

    /// Whether every module id occurs exactly once.
    pub fn has_unique_module_ids(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.modules.iter().all(|m| seen.insert(m.id.as_str()))
    }

    /// Sum of the estimated hours across all modules.
    pub fn total_hours(&self) -> f64 {
        self.modules.iter().map(|m| m.estimated_hours).sum()
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row of the `learning_paths` table.
#[derive(Debug, Clone, FromRow)]
pub struct LearningPathRow {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub modules: Json<Vec<LearningModule>>,
    pub created_at: DateTime<Utc>,
}

impl From<LearningPathRow> for LearningPath {
    fn from(row: LearningPathRow) -> Self {
        Self {
            id: Some(row.id),
            title: row.title,
            description: row.description,
            modules: row.modules.0,
            created_at: Some(row.created_at),
            user_id: Some(row.user_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_module(id: &str) -> LearningModule {
        LearningModule {
            id: id.to_string(),
            title: format!("Module {id}"),
            description: "desc".to_string(),
            status: ModuleStatus::NotStarted,
            estimated_hours: 2.0,
            resources: vec![],
        }
    }

    #[test]
    fn skill_level_display_roundtrip() {
        let variants = [
            SkillLevel::Beginner,
            SkillLevel::Intermediate,
            SkillLevel::Advanced,
        ];
        for v in &variants {
            let parsed: SkillLevel = v.to_string().parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn skill_level_invalid() {
        let err = "expert".parse::<SkillLevel>().unwrap_err();
        assert!(err.to_string().contains("expert"));
    }

    #[test]
    fn time_availability_hours() {
        assert_eq!(TimeAvailability::Low.hours_per_week(), "1-3");
        assert_eq!(TimeAvailability::Medium.hours_per_week(), "4-7");
        assert_eq!(TimeAvailability::High.hours_per_week(), "8+");
    }

    #[test]
    fn time_availability_invalid() {
        assert!("weekends".parse::<TimeAvailability>().is_err());
    }

    #[test]
    fn module_status_display_roundtrip() {
        let variants = [
            ModuleStatus::NotStarted,
            ModuleStatus::InProgress,
            ModuleStatus::Completed,
        ];
        for v in &variants {
            let parsed: ModuleStatus = v.to_string().parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn module_status_wire_format_is_kebab_case() {
        let json = serde_json::to_string(&ModuleStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }

    #[test]
    fn module_status_invalid() {
        assert!("done".parse::<ModuleStatus>().is_err());
    }

    #[test]
    fn unknown_resource_kind_deserializes_as_other() {
        let res: LearningResource =
            serde_json::from_str(r#"{"type":"podcast","title":"T","url":"https://x"}"#).unwrap();
        assert_eq!(res.kind, ResourceKind::Other);
    }

    #[test]
    fn module_uses_camel_case_hours() {
        let json = serde_json::to_value(sample_module("1")).unwrap();
        assert_eq!(json["estimatedHours"], 2.0);
        assert_eq!(json["status"], "not-started");
    }

    #[test]
    fn unsaved_path_omits_persistence_fields() {
        let path = LearningPath {
            id: None,
            title: "t".to_string(),
            description: "d".to_string(),
            modules: vec![],
            created_at: None,
            user_id: None,
        };
        let json = serde_json::to_value(&path).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("created_at").is_none());
        assert!(json.get("user_id").is_none());
    }

    #[test]
    fn module_lookup_and_uniqueness() {
        let mut path = LearningPath {
            id: None,
            title: "t".to_string(),
            description: "d".to_string(),
            modules: vec![sample_module("a"), sample_module("b")],
            created_at: None,
            user_id: None,
        };
        assert!(path.module("a").is_some());
        assert!(path.module("zzz").is_none());
        assert!(path.has_unique_module_ids());
        assert_eq!(path.total_hours(), 4.0);

        path.module_mut("b").unwrap().status = ModuleStatus::Completed;
        assert_eq!(path.module("b").unwrap().status, ModuleStatus::Completed);

        path.modules.push(sample_module("a"));
        assert!(!path.has_unique_module_ids());
    }

    #[test]
    fn row_converts_to_saved_path() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let row = LearningPathRow {
            id,
            user_id: "user-1".to_string(),
            title: "Rust".to_string(),
            description: "Learn Rust".to_string(),
            modules: Json(vec![sample_module("1")]),
            created_at: now,
        };
        let path = LearningPath::from(row);
        assert_eq!(path.id, Some(id));
        assert_eq!(path.user_id.as_deref(), Some("user-1"));
        assert_eq!(path.created_at, Some(now));
        assert_eq!(path.modules.len(), 1);
    }
}
