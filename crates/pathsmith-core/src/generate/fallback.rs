//! Deterministic learning path used whenever AI generation fails.

use pathsmith_db::models::{
    LearningModule, LearningPath, LearningResource, ModuleStatus, ResourceKind, TimeAvailability,
};

use crate::goal::LearningGoalInput;

/// Hours for (Getting Started, Core Concepts, Advanced Topics) per band.
fn hours_for(time: TimeAvailability) -> [f64; 3] {
    match time {
        TimeAvailability::Low => [2.0, 3.0, 3.0],
        TimeAvailability::Medium => [4.0, 5.0, 6.0],
        TimeAvailability::High => [6.0, 8.0, 10.0],
    }
}

fn resource(kind: ResourceKind, title: &str, url: &str) -> LearningResource {
    LearningResource {
        kind,
        title: title.to_string(),
        url: url.to_string(),
    }
}

/// Build the fixed three-module fallback path for `input`. Never fails.
pub fn generate_fallback(input: &LearningGoalInput) -> LearningPath {
    let [start_hours, core_hours, advanced_hours] = hours_for(input.time_availability);

    let modules = vec![
        LearningModule {
            id: "module_1".to_string(),
            title: "Getting Started".to_string(),
            description: "Introduction to the fundamentals.".to_string(),
            status: ModuleStatus::NotStarted,
            estimated_hours: start_hours,
            resources: vec![
                resource(
                    ResourceKind::Article,
                    "Introduction Guide",
                    "https://example.com/intro-guide",
                ),
                resource(
                    ResourceKind::Video,
                    "Beginner Tutorial",
                    "https://example.com/beginner-tutorial",
                ),
            ],
        },
        LearningModule {
            id: "module_2".to_string(),
            title: "Core Concepts".to_string(),
            description: "Essential principles and ideas.".to_string(),
            status: ModuleStatus::NotStarted,
            estimated_hours: core_hours,
            resources: vec![
                resource(
                    ResourceKind::Course,
                    "Core Principles Course",
                    "https://example.com/core-course",
                ),
                resource(
                    ResourceKind::Article,
                    "Best Practices Guide",
                    "https://example.com/best-practices",
                ),
            ],
        },
        LearningModule {
            id: "module_3".to_string(),
            title: "Advanced Topics".to_string(),
            description: "Taking your skills to the next level.".to_string(),
            status: ModuleStatus::NotStarted,
            estimated_hours: advanced_hours,
            resources: vec![
                resource(
                    ResourceKind::Video,
                    "Advanced Techniques",
                    "https://example.com/advanced-techniques",
                ),
                resource(
                    ResourceKind::Article,
                    "Expert Tips and Tricks",
                    "https://example.com/expert-tips",
                ),
            ],
        },
    ];

    LearningPath {
        id: None,
        title: format!("{} Learning Path", input.goal),
        description: format!(
            "A learning path for {} tailored for {} level with {} time availability.",
            input.goal, input.skill_level, input.time_availability
        ),
        modules,
        created_at: None,
        user_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathsmith_db::models::SkillLevel;

    const BANDS: [TimeAvailability; 3] = [
        TimeAvailability::Low,
        TimeAvailability::Medium,
        TimeAvailability::High,
    ];

    fn input(time: TimeAvailability) -> LearningGoalInput {
        LearningGoalInput::new("Photography", SkillLevel::Advanced, time)
    }

    #[test]
    fn every_band_yields_three_not_started_modules() {
        for band in BANDS {
            let path = generate_fallback(&input(band));
            assert_eq!(path.modules.len(), 3, "band {band}");
            assert!(path.has_unique_module_ids());
            for module in &path.modules {
                assert_eq!(module.status, ModuleStatus::NotStarted);
                assert!(module.estimated_hours > 0.0);
                assert_eq!(module.resources.len(), 2);
            }
        }
    }

    #[test]
    fn hours_come_from_band_table() {
        let hours = |band| -> Vec<f64> {
            generate_fallback(&input(band))
                .modules
                .iter()
                .map(|m| m.estimated_hours)
                .collect()
        };
        assert_eq!(hours(TimeAvailability::Low), vec![2.0, 3.0, 3.0]);
        assert_eq!(hours(TimeAvailability::Medium), vec![4.0, 5.0, 6.0]);
        assert_eq!(hours(TimeAvailability::High), vec![6.0, 8.0, 10.0]);
    }

    #[test]
    fn module_titles_are_fixed() {
        let path = generate_fallback(&input(TimeAvailability::Medium));
        let titles: Vec<&str> = path.modules.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, ["Getting Started", "Core Concepts", "Advanced Topics"]);
    }

    #[test]
    fn title_and_description_mention_input() {
        let path = generate_fallback(&input(TimeAvailability::Low));
        assert_eq!(path.title, "Photography Learning Path");
        assert!(path.description.contains("advanced level"));
        assert!(path.description.contains("low time availability"));
        assert!(path.id.is_none());
    }

    #[test]
    fn fallback_is_deterministic() {
        let a = generate_fallback(&input(TimeAvailability::High));
        let b = generate_fallback(&input(TimeAvailability::High));
        assert_eq!(a, b);
    }
}
