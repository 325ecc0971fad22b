//! The text-generation seam and the learning-path generator built on it.

use std::fmt;

use async_trait::async_trait;
use tracing::{info, warn};

use pathsmith_db::models::LearningPath;

use crate::goal::LearningGoalInput;

use super::error::GenerationError;
use super::extract::{FreeTextExtractor, PlanExtractor};
use super::prompt::build_prompt;

/// Fixed sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 2048,
        }
    }
}

/// A remote model that turns a prompt into free text.
///
/// Object-safe so it can be held as `Box<dyn TextGenerator>`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError>;

    fn model_id(&self) -> &str;
}

const _: () = {
    fn _assert_object_safe(_: &dyn TextGenerator) {}
};

/// Generates learning paths with a remote model.
pub struct PathGenerator {
    backend: Option<Box<dyn TextGenerator>>,
    extractor: Box<dyn PlanExtractor>,
    params: GenerationParams,
}

impl PathGenerator {
    /// Generator backed by `backend`, parsing free-text replies.
    pub fn new(backend: Box<dyn TextGenerator>) -> Self {
        Self {
            backend: Some(backend),
            extractor: Box::new(FreeTextExtractor),
            params: GenerationParams::default(),
        }
    }

    /// Generator with no backend: every call fails with
    /// [`GenerationError::MissingApiKey`], so callers fall back.
    pub fn unconfigured() -> Self {
        Self {
            backend: None,
            extractor: Box::new(FreeTextExtractor),
            params: GenerationParams::default(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn PlanExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Model id of the backend, if one is configured.
    pub fn model_id(&self) -> Option<&str> {
        self.backend.as_deref().map(|b| b.model_id())
    }

    /// Generate a learning path for `input` with one remote call.
    ///
    /// Every module of the result is `not-started`. Shape problems (module
    /// or resource counts, duplicate ids) are logged, not rejected.
    pub async fn generate(&self, input: &LearningGoalInput) -> Result<LearningPath, GenerationError> {
        let backend = self.backend.as_deref().ok_or(GenerationError::MissingApiKey)?;

        let prompt = build_prompt(input);
        let reply = backend.generate_text(&prompt, &self.params).await?;
        let path = self.extractor.extract(&reply)?;

        for warning in check_shape(&path) {
            warn!(model_id = backend.model_id(), %warning, "generated path has unexpected shape");
        }

        info!(
            model_id = backend.model_id(),
            modules = path.modules.len(),
            "learning path generated"
        );
        Ok(path)
    }
}

/// A deviation of a generated path from the shape requested in the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeWarning {
    ModuleCount(usize),
    ResourceCount { module_id: String, count: usize },
    DuplicateModuleId(String),
    NonPositiveHours { module_id: String, hours: f64 },
}

impl fmt::Display for ShapeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModuleCount(n) => write!(f, "{n} modules (expected 3-5)"),
            Self::ResourceCount { module_id, count } => {
                write!(f, "module {module_id:?} has {count} resources (expected 2-3)")
            }
            Self::DuplicateModuleId(id) => write!(f, "module id {id:?} appears more than once"),
            Self::NonPositiveHours { module_id, hours } => {
                write!(f, "module {module_id:?} has non-positive estimate {hours}")
            }
        }
    }
}

/// Compare a path against the requested shape. Empty means conforming.
pub fn check_shape(path: &LearningPath) -> Vec<ShapeWarning> {
    let mut warnings = Vec::new();

    if !(3..=5).contains(&path.modules.len()) {
        warnings.push(ShapeWarning::ModuleCount(path.modules.len()));
    }

    let mut seen = std::collections::HashSet::new();
    for module in &path.modules {
        if !seen.insert(module.id.as_str()) {
            warnings.push(ShapeWarning::DuplicateModuleId(module.id.clone()));
        }
        if !(2..=3).contains(&module.resources.len()) {
            warnings.push(ShapeWarning::ResourceCount {
                module_id: module.id.clone(),
                count: module.resources.len(),
            });
        }
        if module.estimated_hours <= 0.0 {
            warnings.push(ShapeWarning::NonPositiveHours {
                module_id: module.id.clone(),
                hours: module.estimated_hours,
            });
        }
    }

    warnings
}
