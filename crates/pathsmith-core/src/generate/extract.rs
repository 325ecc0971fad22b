//! Turning a model reply into a [`LearningPath`].
//!
//! Replies are free text that usually wraps one JSON object in prose or a
//! code fence. [`FreeTextExtractor`] scans for that object; a backend with a
//! structured-output mode can use [`JsonModeExtractor`] instead without any
//! change to callers.
//!
//! Parsing is deliberately lenient: missing fields take defaults, unknown
//! fields are ignored, and module/resource counts are not checked here (see
//! [`super::check_shape`]). Whatever status the model wrote is discarded and
//! every module starts `not-started`.

use serde::{Deserialize, Deserializer};

use pathsmith_db::models::{
    LearningModule, LearningPath, LearningResource, ModuleStatus, ResourceKind,
};

use super::error::GenerationError;

/// Parses a model reply into a learning path.
pub trait PlanExtractor: Send + Sync {
    fn extract(&self, reply: &str) -> Result<LearningPath, GenerationError>;
}

/// Finds the first JSON object embedded anywhere in free text.
#[derive(Debug, Default, Clone, Copy)]
pub struct FreeTextExtractor;

impl PlanExtractor for FreeTextExtractor {
    fn extract(&self, reply: &str) -> Result<LearningPath, GenerationError> {
        let json = find_json_object(reply).ok_or(GenerationError::MalformedResponse)?;
        parse_path(json)
    }
}

/// Expects the whole reply to be a single JSON object.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonModeExtractor;

impl PlanExtractor for JsonModeExtractor {
    fn extract(&self, reply: &str) -> Result<LearningPath, GenerationError> {
        let trimmed = reply.trim();
        if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
            return Err(GenerationError::MalformedResponse);
        }
        parse_path(trimmed)
    }
}

/// Locate the first `{...}` object in `text`.
///
/// Scans from the first `{`, tracking brace depth outside of string
/// literals, and returns the first balanced span. When the object never
/// closes, falls back to the span ending at the last `}` in the text.
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a JSON object into a path, stamping every module `not-started`.
fn parse_path(json: &str) -> Result<LearningPath, GenerationError> {
    let draft: PathDraft = serde_json::from_str(json)?;
    Ok(draft.into_path())
}

// ---------------------------------------------------------------------------
// Lenient draft shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PathDraft {
    title: String,
    description: String,
    modules: Vec<ModuleDraft>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModuleDraft {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    title: String,
    description: String,
    #[serde(rename = "estimatedHours")]
    estimated_hours: f64,
    resources: Vec<ResourceDraft>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResourceDraft {
    #[serde(rename = "type")]
    kind: Option<ResourceKind>,
    title: String,
    url: String,
}

impl PathDraft {
    fn into_path(self) -> LearningPath {
        LearningPath {
            id: None,
            title: self.title,
            description: self.description,
            modules: self.modules.into_iter().map(ModuleDraft::into_module).collect(),
            created_at: None,
            user_id: None,
        }
    }
}

impl ModuleDraft {
    fn into_module(self) -> LearningModule {
        LearningModule {
            id: self.id,
            title: self.title,
            description: self.description,
            status: ModuleStatus::NotStarted,
            estimated_hours: self.estimated_hours,
            resources: self
                .resources
                .into_iter()
                .map(|r| LearningResource {
                    kind: r.kind.unwrap_or(ResourceKind::Other),
                    title: r.title,
                    url: r.url,
                })
                .collect(),
        }
    }
}

/// Models sometimes emit numeric ids (`"id": 1`).
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN_JSON: &str = r#"{
        "title": "Rust in Practice",
        "description": "Hands-on Rust",
        "modules": [
            {
                "id": "1",
                "title": "Ownership",
                "description": "Moves and borrows",
                "status": "completed",
                "estimatedHours": 3,
                "resources": [
                    {"type": "article", "title": "The Book", "url": "https://doc.rust-lang.org/book/"},
                    {"type": "video", "title": "Crust of Rust", "url": "https://youtube.com/x"}
                ]
            },
            {
                "id": "2",
                "title": "Traits {and} generics",
                "description": "Shared behavior",
                "status": "in-progress",
                "estimatedHours": 4.5,
                "resources": []
            }
        ]
    }"#;

    // -- find_json_object --

    #[test]
    fn finds_object_wrapped_in_prose_and_fence() {
        let reply = format!("Sure! Here is your plan:\n```json\n{PLAN_JSON}\n```\nEnjoy.");
        let found = find_json_object(&reply).unwrap();
        assert!(found.starts_with('{'));
        assert!(found.ends_with('}'));
        assert!(serde_json::from_str::<serde_json::Value>(found).is_ok());
    }

    #[test]
    fn stops_at_first_balanced_object() {
        let reply = r#"{"title": "a"} and then {"title": "b"}"#;
        assert_eq!(find_json_object(reply), Some(r#"{"title": "a"}"#));
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let reply = r#"x {"title": "curly } brace", "n": {"k": 1}} trailing"#;
        assert_eq!(
            find_json_object(reply),
            Some(r#"{"title": "curly } brace", "n": {"k": 1}}"#)
        );
    }

    #[test]
    fn unbalanced_object_falls_back_to_last_brace() {
        let text = r#"{ { {"b": 1} } tail"#;
        assert_eq!(find_json_object(text), Some(r#"{ { {"b": 1} }"#));
    }

    #[test]
    fn no_object_returns_none() {
        assert_eq!(find_json_object("I cannot help with that."), None);
        assert_eq!(find_json_object("} backwards {"), None);
    }

    // -- FreeTextExtractor --

    #[test]
    fn extract_forces_not_started_status() {
        let reply = format!("Here you go: {PLAN_JSON}");
        let path = FreeTextExtractor.extract(&reply).unwrap();
        assert_eq!(path.title, "Rust in Practice");
        assert_eq!(path.modules.len(), 2);
        assert!(
            path.modules
                .iter()
                .all(|m| m.status == ModuleStatus::NotStarted)
        );
        assert_eq!(path.modules[0].resources.len(), 2);
        assert_eq!(path.modules[0].resources[0].kind, ResourceKind::Article);
        assert_eq!(path.modules[1].estimated_hours, 4.5);
        assert!(path.id.is_none());
    }

    #[test]
    fn extract_without_json_is_malformed() {
        let err = FreeTextExtractor
            .extract("Sorry, I can't produce a plan right now.")
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse));
    }

    #[test]
    fn extract_with_broken_json_is_invalid() {
        let err = FreeTextExtractor
            .extract(r#"{"title": "x", "modules": [,]}"#)
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidJson(_)));
    }

    #[test]
    fn structurally_unexpected_payload_passes_through() {
        // One module, no resources, numeric id, extra fields, unknown kind.
        let reply = r#"{
            "title": "Tiny",
            "difficulty": "hard",
            "modules": [
                {"id": 7, "title": "Only", "resources": [{"type": "podcast", "title": "P", "url": "u"}]}
            ]
        }"#;
        let path = FreeTextExtractor.extract(reply).unwrap();
        assert_eq!(path.title, "Tiny");
        assert_eq!(path.description, "");
        assert_eq!(path.modules.len(), 1);
        assert_eq!(path.modules[0].id, "7");
        assert_eq!(path.modules[0].estimated_hours, 0.0);
        assert_eq!(path.modules[0].resources[0].kind, ResourceKind::Other);
    }

    #[test]
    fn wrongly_typed_field_is_invalid_json() {
        let err = FreeTextExtractor
            .extract(r#"{"title": "x", "modules": "none"}"#)
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidJson(_)));
    }

    // -- JsonModeExtractor --

    #[test]
    fn json_mode_accepts_bare_object() {
        let path = JsonModeExtractor.extract(PLAN_JSON).unwrap();
        assert_eq!(path.modules.len(), 2);
    }

    #[test]
    fn json_mode_rejects_prose() {
        let err = JsonModeExtractor
            .extract(&format!("Here: {PLAN_JSON}"))
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse));
    }
}
