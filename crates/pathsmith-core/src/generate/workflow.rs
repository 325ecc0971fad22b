//! The create-a-path workflow: try the model, fall back on any failure.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use pathsmith_db::models::LearningPath;

use crate::goal::LearningGoalInput;

use super::fallback::generate_fallback;
use super::generator::PathGenerator;

/// Shown to the user whenever the fallback path is served.
pub const FALLBACK_NOTICE: &str =
    "Could not generate a personalized learning path. Showing a general plan instead.";

/// Where a generated path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathSource {
    Ai,
    Fallback,
}

impl fmt::Display for PathSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ai => "ai",
            Self::Fallback => "fallback",
        };
        write!(f, "{s}")
    }
}

/// A freshly generated, unsaved learning path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedPath {
    pub path: LearningPath,
    pub source: PathSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Produce a learning path for `input`. Never fails: any generation error is
/// logged and the deterministic fallback is returned with a notice.
pub async fn create_learning_path(
    generator: &PathGenerator,
    input: &LearningGoalInput,
) -> GeneratedPath {
    match generator.generate(input).await {
        Ok(path) => GeneratedPath {
            path,
            source: PathSource::Ai,
            notice: None,
        },
        Err(e) => {
            warn!(error = %e, goal = %input.goal, "generation failed, using fallback path");
            GeneratedPath {
                path: generate_fallback(input),
                source: PathSource::Fallback,
                notice: Some(FALLBACK_NOTICE.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::generate::error::GenerationError;
    use crate::generate::generator::{GenerationParams, TextGenerator};
    use pathsmith_db::models::{ModuleStatus, SkillLevel, TimeAvailability};

    struct Fixed(Result<&'static str, ()>);

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate_text(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, GenerationError> {
            match self.0 {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(GenerationError::Remote {
                    status: 500,
                    payload: serde_json::json!({"error": "internal"}),
                }),
            }
        }

        fn model_id(&self) -> &str {
            "fixed"
        }
    }

    fn input() -> LearningGoalInput {
        LearningGoalInput::new("Chess", SkillLevel::Beginner, TimeAvailability::Low)
    }

    #[tokio::test]
    async fn successful_generation_is_ai_sourced() {
        let reply = r#"{"title":"Chess","description":"d","modules":[
            {"id":"m1","title":"Rules","description":"","estimatedHours":1,"resources":[]}
        ]}"#;
        let generator = PathGenerator::new(Box::new(Fixed(Ok(reply))));

        let generated = create_learning_path(&generator, &input()).await;

        assert_eq!(generated.source, PathSource::Ai);
        assert!(generated.notice.is_none());
        assert_eq!(generated.path.title, "Chess");
    }

    #[tokio::test]
    async fn remote_error_yields_fallback_with_notice() {
        let generator = PathGenerator::new(Box::new(Fixed(Err(()))));

        let generated = create_learning_path(&generator, &input()).await;

        assert_eq!(generated.source, PathSource::Fallback);
        assert_eq!(generated.notice.as_deref(), Some(FALLBACK_NOTICE));
        assert_eq!(generated.path, generate_fallback(&input()));
    }

    #[tokio::test]
    async fn reply_without_json_yields_fallback() {
        let generator = PathGenerator::new(Box::new(Fixed(Ok("no plan today"))));

        let generated = create_learning_path(&generator, &input()).await;

        assert_eq!(generated.source, PathSource::Fallback);
        assert_eq!(generated.path.modules.len(), 3);
        assert!(
            generated
                .path
                .modules
                .iter()
                .all(|m| m.status == ModuleStatus::NotStarted)
        );
    }

    #[tokio::test]
    async fn unconfigured_generator_yields_fallback() {
        let generated = create_learning_path(&PathGenerator::unconfigured(), &input()).await;
        assert_eq!(generated.source, PathSource::Fallback);
    }

    #[test]
    fn generated_path_serializes_source_lowercase() {
        let generated = GeneratedPath {
            path: generate_fallback(&input()),
            source: PathSource::Fallback,
            notice: None,
        };
        let json = serde_json::to_value(&generated).unwrap();
        assert_eq!(json["source"], "fallback");
        assert!(json.get("notice").is_none());
    }
}
