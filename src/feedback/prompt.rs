//! Turns a feedback request into the instructor brief and opening line
//! handed to the advisory channel.

use serde::{Deserialize, Serialize};

use crate::pose::BodyPart;
use crate::reference::Exercise;

use super::FeedbackRequest;

/// What the advisory channel receives for one spoken session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorySession {
    pub system_prompt: String,
    pub first_message: String,
}

impl AdvisorySession {
    pub fn from_request(request: &FeedbackRequest) -> Self {
        Self {
            system_prompt: system_prompt(
                request.exercise,
                &request.incorrect_parts,
                &request.feedback,
            ),
            first_message: first_message(request.exercise, &request.feedback),
        }
    }
}

pub fn system_prompt(exercise: Exercise, incorrect_parts: &[BodyPart], feedback: &[String]) -> String {
    let mistakes: Vec<String> = feedback.iter().map(|msg| format!("- {msg}")).collect();
    let focus: Vec<&str> = incorrect_parts.iter().map(|p| p.name()).collect();

    format!(
        "You are a yoga and fitness instructor coaching a student through their {name} pose.\n\
         You are giving real-time spoken feedback on their form.\n\
         \n\
         Right now the student needs these corrections:\n\
         {mistakes}\n\
         \n\
         Focus areas: {focus}\n\
         \n\
         Guidelines:\n\
         1. Be encouraging but direct about the correction\n\
         2. Use short, simple instructions\n\
         3. Keep each response under 10 seconds\n\
         4. Do not ask questions, only guide\n\
         5. Speak as if you are watching them right now\n\
         6. Skip introductions and pleasantries\n\
         \n\
         Help them fix their form immediately with clear, actionable guidance.",
        name = exercise.display_name(),
        mistakes = mistakes.join("\n"),
        focus = focus.join(", "),
    )
}

/// The line spoken first: the primary correction, capitalised.
pub fn first_message(exercise: Exercise, feedback: &[String]) -> String {
    let primary = match feedback.first() {
        Some(msg) => msg.trim().to_string(),
        None => format!("Adjust your {} pose", exercise.display_name().to_lowercase()),
    };

    let mut chars = primary.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => primary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_uses_primary_feedback() {
        let feedback = vec![
            "  keep your hips level with your shoulders ".to_string(),
            "Straighten your legs".to_string(),
        ];
        assert_eq!(
            first_message(Exercise::Plank, &feedback),
            "Keep your hips level with your shoulders"
        );
    }

    #[test]
    fn test_first_message_fallback() {
        assert_eq!(first_message(Exercise::DownwardDog, &[]), "Adjust your downward dog pose");
    }

    #[test]
    fn test_system_prompt_lists_feedback_and_focus() {
        let prompt = system_prompt(
            Exercise::Chaturanga,
            &[BodyPart::RightElbow, BodyPart::RightHip],
            &["Bend your elbows to 90 degrees".to_string()],
        );
        assert!(prompt.contains("Chaturanga pose"));
        assert!(prompt.contains("- Bend your elbows to 90 degrees"));
        assert!(prompt.contains("Focus areas: right_elbow, right_hip"));
    }
}
