use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::plan::PendingPlan;

/// Maximum number of chat turns kept per user. Older turns are dropped first.
pub const HISTORY_LIMIT: usize = 20;

/// Where a user currently is in the plan-building dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Welcome,
    GatheringInfo,
    GeneratingPlan,
    AwaitingApproval,
    Approved,
    Chat,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Welcome => "welcome",
            Phase::GatheringInfo => "gathering_info",
            Phase::GeneratingPlan => "generating_plan",
            Phase::AwaitingApproval => "awaiting_approval",
            Phase::Approved => "approved",
            Phase::Chat => "chat",
        }
    }

    /// Phases in which a generated plan may be held.
    pub fn holds_plan(self) -> bool {
        matches!(self, Phase::AwaitingApproval | Phase::Approved)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fitness goal slot. Serialized with the human labels used in prompts and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Goal {
    #[serde(rename = "weight loss")]
    WeightLoss,
    #[serde(rename = "muscle gain")]
    MuscleGain,
    #[serde(rename = "general fitness")]
    GeneralFitness,
    #[serde(rename = "endurance")]
    Endurance,
    #[serde(rename = "flexibility")]
    Flexibility,
}

impl Goal {
    pub fn label(self) -> &'static str {
        match self {
            Goal::WeightLoss => "weight loss",
            Goal::MuscleGain => "muscle gain",
            Goal::GeneralFitness => "general fitness",
            Goal::Endurance => "endurance",
            Goal::Flexibility => "flexibility",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Facts collected from the user so far. Every field is optional until extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GatheredInfo {
    pub goal: Option<Goal>,
    pub workout_style: Option<String>,
    /// Training days per week (1..=7)
    pub days: Option<u8>,
    /// Explicit target date as written by the user (ISO `YYYY-MM-DD`)
    pub deadline: Option<String>,
    pub duration_weeks: Option<i64>,
}

impl GatheredInfo {
    /// Overwrite fields that are present in `other`; never clears a field.
    pub fn merge(&mut self, other: &GatheredInfo) {
        if let Some(goal) = other.goal {
            self.goal = Some(goal);
        }
        if let Some(style) = &other.workout_style {
            self.workout_style = Some(style.clone());
        }
        if let Some(days) = other.days {
            self.days = Some(days);
        }
        if let Some(deadline) = &other.deadline {
            self.deadline = Some(deadline.clone());
        }
        if let Some(weeks) = other.duration_weeks {
            self.duration_weeks = Some(weeks);
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == GatheredInfo::default()
    }

    /// Goal, workout style and weekly days are required before a plan is generated.
    /// The timeframe is optional: the deadline resolver always supplies a safe default.
    pub fn is_complete(&self) -> bool {
        self.goal.is_some() && self.workout_style.is_some() && self.days.is_some()
    }

    /// Only the timeframe slots (`deadline`, `duration_weeks`).
    pub fn deadline_only(&self) -> GatheredInfo {
        GatheredInfo {
            deadline: self.deadline.clone(),
            duration_weeks: self.duration_weeks,
            ..GatheredInfo::default()
        }
    }
}

/// Per-user dialogue state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConversationState {
    pub phase: Phase,
    pub gathered_info: GatheredInfo,
    pub generated_plan: Option<PendingPlan>,
    pub is_first_message: bool,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            phase: Phase::Welcome,
            gathered_info: GatheredInfo::default(),
            generated_plan: None,
            is_first_message: true,
        }
    }
}

impl ConversationState {
    /// Apply a partial update. Leaving a plan-holding phase drops the plan.
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(phase) = update.phase {
            self.phase = phase;
        }
        if let Some(info) = update.gathered_info {
            self.gathered_info = info;
        }
        if let Some(plan) = update.generated_plan {
            self.generated_plan = plan;
        }
        if let Some(first) = update.is_first_message {
            self.is_first_message = first;
        }
        if !self.phase.holds_plan() {
            self.generated_plan = None;
        }
    }
}

/// Field-wise update for [`ConversationState`]. `None` means "leave as is".
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub phase: Option<Phase>,
    pub gathered_info: Option<GatheredInfo>,
    pub generated_plan: Option<Option<PendingPlan>>,
    pub is_first_message: Option<bool>,
}

impl StateUpdate {
    pub fn phase(phase: Phase) -> Self {
        Self {
            phase: Some(phase),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the bounded chat history sent to the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Profile facts supplied by the caller with every turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    /// Body weight in kg
    #[serde(default)]
    pub weight: Option<f64>,
    /// Height in cm
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
    /// Whether the user has access to training equipment
    #[serde(default)]
    pub equipment: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites_only_present_fields() {
        let mut info = GatheredInfo {
            goal: Some(Goal::WeightLoss),
            days: Some(3),
            ..GatheredInfo::default()
        };
        info.merge(&GatheredInfo {
            workout_style: Some("Cardio".to_string()),
            days: Some(4),
            ..GatheredInfo::default()
        });

        assert_eq!(info.goal, Some(Goal::WeightLoss));
        assert_eq!(info.workout_style.as_deref(), Some("Cardio"));
        assert_eq!(info.days, Some(4));
    }

    #[test]
    fn completeness_requires_goal_style_and_days() {
        let mut info = GatheredInfo::default();
        assert!(!info.is_complete());

        info.goal = Some(Goal::MuscleGain);
        info.workout_style = Some("Strength Training".to_string());
        assert!(!info.is_complete());

        info.days = Some(4);
        assert!(info.is_complete());
    }

    #[test]
    fn completeness_ignores_timeframe() {
        let info = GatheredInfo {
            goal: Some(Goal::Endurance),
            workout_style: Some("Cycling".to_string()),
            days: Some(2),
            deadline: None,
            duration_weeks: None,
        };
        assert!(info.is_complete());
    }

    #[test]
    fn apply_drops_plan_outside_plan_phases() {
        let mut state = ConversationState::default();
        state.apply(StateUpdate::phase(Phase::Chat));
        assert_eq!(state.phase, Phase::Chat);
        assert!(state.generated_plan.is_none());
        assert!(state.is_first_message);
    }

    #[test]
    fn goal_serializes_with_label() {
        let json = serde_json::to_value(Goal::GeneralFitness).unwrap();
        assert_eq!(json, serde_json::json!("general fitness"));
        let phase = serde_json::to_value(Phase::AwaitingApproval).unwrap();
        assert_eq!(phase, serde_json::json!("awaiting_approval"));
    }
}
