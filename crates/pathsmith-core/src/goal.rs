use serde::{Deserialize, Serialize};

use pathsmith_db::models::{SkillLevel, TimeAvailability};

/// What the user asked for: created per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningGoalInput {
    /// Free-text learning goal, e.g. "Rust async programming".
    pub goal: String,
    pub skill_level: SkillLevel,
    pub time_availability: TimeAvailability,
}

impl LearningGoalInput {
    pub fn new(
        goal: impl Into<String>,
        skill_level: SkillLevel,
        time_availability: TimeAvailability,
    ) -> Self {
        Self {
            goal: goal.into(),
            skill_level,
            time_availability,
        }
    }
}
