//! Learning-path generation: prompt construction, the text-generation
//! backend, reply parsing, the deterministic fallback, and the workflow that
//! ties them together.

pub mod error;
pub mod extract;
pub mod fallback;
pub mod gemini;
pub mod generator;
pub mod prompt;
pub mod workflow;

pub use error::GenerationError;
pub use extract::{FreeTextExtractor, JsonModeExtractor, PlanExtractor, find_json_object};
pub use fallback::generate_fallback;
pub use gemini::GeminiClient;
pub use generator::{GenerationParams, PathGenerator, ShapeWarning, TextGenerator, check_shape};
pub use prompt::build_prompt;
pub use workflow::{GeneratedPath, PathSource, create_learning_path};
