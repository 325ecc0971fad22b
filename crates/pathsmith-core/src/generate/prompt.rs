//! Prompt construction for learning-path generation. Pure logic, no I/O.

use crate::goal::LearningGoalInput;

/// JSON shape the model is asked to return.
const RESPONSE_SHAPE: &str = r#"{
  "title": "Learning Path Title",
  "description": "Brief description of the learning path",
  "modules": [
    {
      "id": "unique_id_1",
      "title": "Module Title",
      "description": "Module description",
      "estimatedHours": number_of_hours,
      "resources": [
        {
          "type": "video|article|course",
          "title": "Resource Title",
          "url": "https://example.com"
        }
      ]
    }
  ]
}"#;

/// Build the generation prompt for a learning goal.
///
/// Embeds the goal, skill level, time band with its hours-per-week range,
/// the expected JSON shape, and the module/resource count instructions.
pub fn build_prompt(input: &LearningGoalInput) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(&format!(
        "Create a detailed learning path for {} for someone with a {} skill level \
         and {} time availability ({} hours per week).\n\n",
        input.goal,
        input.skill_level,
        input.time_availability,
        input.time_availability.hours_per_week(),
    ));

    prompt.push_str("Format the response as a JSON object with the following structure:\n");
    prompt.push_str(RESPONSE_SHAPE);
    prompt.push_str("\n\n");

    prompt.push_str(
        "Please include 3-5 modules with 2-3 resources per module. \
         Make sure the resources are realistic and relevant to the skill level.\n",
    );
    prompt.push_str("Adjust the estimated hours based on the time availability.\n");

    prompt
}
