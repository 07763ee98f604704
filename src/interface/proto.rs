//! Generated protobuf bindings and conversions from domain records.

tonic::include_proto!("ai_project_helper");

use crate::domain::types::Feedback;

impl From<Feedback> for ActionFeedback {
    fn from(feedback: Feedback) -> Self {
        Self {
            action_index: feedback.action_index,
            action_type: feedback.action_type,
            step_description: feedback.description,
            status: feedback.status.as_str().to_string(),
            output: feedback.output,
            error: feedback.error,
            command: feedback.command,
            step_index: feedback.step_index as i32,
            total_steps: feedback.total_steps as i32,
            exit_code: feedback.exit_code,
            complete_plan: feedback.complete_plan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ActionStatus, StepPosition};

    #[test]
    fn test_feedback_conversion() {
        let feedback = Feedback::plan_event(
            "llm_plan",
            "Complete plan generated",
            ActionStatus::Success,
            StepPosition::new(0, 2),
        )
        .with_complete_plan("a\n------\nb");
        let wire = ActionFeedback::from(feedback);
        assert_eq!(wire.action_index, -1);
        assert_eq!(wire.step_description, "Complete plan generated");
        assert_eq!(wire.status, "success");
        assert_eq!(wire.total_steps, 2);
        assert_eq!(wire.complete_plan.as_deref(), Some("a\n------\nb"));
    }
}
