//! Conversation state machine.
//!
//! Pure transitions over [`ConversationState`]: no I/O, no store access. The
//! caller executes the returned effects and only then persists the new state.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::conversation::{ConversationState, GatheredInfo, Phase, StateUpdate, UserProfile};
use crate::deadline::{DeadlineRequest, compute_safe_deadline, resolve_duration_weeks};
use crate::plan::{self, PendingPlan};
use crate::slots;

static APPROVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:yes|yep|yeah|approve|looks good|perfect|great|ok|okay|sure|accept|save|confirm)\b",
    )
    .expect("valid approval regex")
});
static REJECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:no|nope|reject|change|modify|different|revise|but)\b")
        .expect("valid rejection regex")
});
static NEW_PLAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:new plan|another plan|start over)\b").expect("valid new plan regex")
});

/// Side effects requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Persist the pending plan through the approval workflow.
    CommitPlan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: ConversationState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(state: ConversationState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Outcome of evaluating the LLM reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcess {
    pub state: ConversationState,
    pub plan_generated: bool,
    pub awaiting_approval: bool,
}

pub fn is_approval(message: &str) -> bool {
    APPROVAL_RE.is_match(message.trim())
}

pub fn is_rejection(message: &str) -> bool {
    REJECTION_RE.is_match(message.trim())
}

pub fn wants_new_plan(message: &str) -> bool {
    NEW_PLAN_RE.is_match(message)
}

/// Pre-call pass: decide the phase for this turn before the LLM is asked.
pub fn advance(state: &ConversationState, message: &str) -> Transition {
    let mut next = state.clone();

    // The opening message only clears the flag; the LLM answers with its greeting.
    if next.is_first_message {
        next.is_first_message = false;
        return Transition::to(next);
    }

    match next.phase {
        Phase::Welcome => {
            next.gathered_info.merge(&slots::extract(message));
            next.apply(StateUpdate::phase(Phase::GatheringInfo));
            Transition::to(next)
        }
        Phase::GatheringInfo => {
            next.gathered_info.merge(&slots::extract(message));
            if next.gathered_info.is_complete() {
                next.apply(StateUpdate::phase(Phase::GeneratingPlan));
            }
            Transition::to(next)
        }
        Phase::GeneratingPlan => Transition::to(next),
        Phase::AwaitingApproval => {
            if is_rejection(message) {
                next.gathered_info.merge(&slots::extract(message));
                next.apply(StateUpdate {
                    phase: Some(Phase::GatheringInfo),
                    generated_plan: Some(None),
                    ..StateUpdate::default()
                });
                return Transition::to(next);
            }
            if is_approval(message) && next.generated_plan.is_some() {
                next.apply(StateUpdate::phase(Phase::Approved));
                return Transition::to(next).with_effect(Effect::CommitPlan);
            }
            Transition::to(next)
        }
        Phase::Approved | Phase::Chat => {
            if wants_new_plan(message) {
                next.apply(StateUpdate {
                    phase: Some(Phase::Welcome),
                    gathered_info: Some(GatheredInfo::default()),
                    generated_plan: Some(None),
                    ..StateUpdate::default()
                });
            } else {
                next.apply(StateUpdate::phase(Phase::Chat));
            }
            Transition::to(next)
        }
    }
}

/// Post-call pass: in `generating_plan`, turn a valid plan reply into the
/// pending plan and move to `awaiting_approval`. Anything else leaves the state as is.
pub fn post_process(
    state: &ConversationState,
    reply: &str,
    profile: &UserProfile,
    today: NaiveDate,
) -> PostProcess {
    if state.phase == Phase::GeneratingPlan {
        if let Some(candidate) = plan::parse(reply).filter(plan::validate) {
            let metadata = plan::extract_metadata(reply);
            let info = &state.gathered_info;
            let duration_weeks = resolve_duration_weeks(info, &metadata);
            let deadline = compute_safe_deadline(
                &DeadlineRequest {
                    provided_deadline: info.deadline.as_deref(),
                    provided_weeks: Some(duration_weeks),
                    fallback_weeks: None,
                },
                today,
            );

            let pending = PendingPlan {
                plan: candidate,
                goal: info.goal.or(metadata.goal),
                duration_weeks,
                deadline,
                current_weight: profile.weight,
                goal_weight: metadata.goal_weight,
            };

            let mut next = state.clone();
            next.apply(StateUpdate {
                phase: Some(Phase::AwaitingApproval),
                generated_plan: Some(Some(pending)),
                ..StateUpdate::default()
            });
            return PostProcess {
                state: next,
                plan_generated: true,
                awaiting_approval: true,
            };
        }
    }

    PostProcess {
        state: state.clone(),
        plan_generated: false,
        awaiting_approval: state.phase == Phase::AwaitingApproval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Goal;
    use crate::plan::{Category, PLAN_MARKERS};

    const PLAN_REPLY: &str = "Plan Name: Lean Start\n## Your Plan\n**Monday:**\n- Cardio: Running - 30 mins\n**Thursday:**\n- Stretching: Quad stretch - 10 mins\nWould you like to approve this plan?";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn in_phase(phase: Phase) -> ConversationState {
        ConversationState {
            phase,
            is_first_message: false,
            ..ConversationState::default()
        }
    }

    fn complete_info() -> GatheredInfo {
        GatheredInfo {
            goal: Some(Goal::WeightLoss),
            workout_style: Some("Cardio".to_string()),
            days: Some(3),
            ..GatheredInfo::default()
        }
    }

    fn awaiting_approval() -> ConversationState {
        let mut generating = in_phase(Phase::GeneratingPlan);
        generating.gathered_info = complete_info();
        post_process(&generating, PLAN_REPLY, &UserProfile::default(), today()).state
    }

    #[test]
    fn first_message_only_clears_flag() {
        let state = ConversationState::default();
        let transition = advance(&state, "I want to lose weight, I like cardio, 3 days a week");

        assert_eq!(transition.state.phase, Phase::Welcome);
        assert!(!transition.state.is_first_message);
        assert!(transition.state.gathered_info.is_empty());
        assert!(transition.effects.is_empty());
    }

    #[test]
    fn welcome_extracts_and_moves_to_gathering() {
        let transition = advance(&in_phase(Phase::Welcome), "I want to lose weight");
        assert_eq!(transition.state.phase, Phase::GatheringInfo);
        assert_eq!(transition.state.gathered_info.goal, Some(Goal::WeightLoss));
    }

    #[test]
    fn welcome_with_complete_info_still_stops_at_gathering() {
        let transition = advance(
            &in_phase(Phase::Welcome),
            "I want to lose weight, I like cardio, 3 days a week",
        );
        assert_eq!(transition.state.phase, Phase::GatheringInfo);
        assert!(transition.state.gathered_info.is_complete());
    }

    #[test]
    fn gathering_waits_for_all_three_slots() {
        let mut state = in_phase(Phase::GatheringInfo);
        state = advance(&state, "I want to build muscle").state;
        assert_eq!(state.phase, Phase::GatheringInfo);
        state = advance(&state, "strength training please").state;
        assert_eq!(state.phase, Phase::GatheringInfo);
        state = advance(&state, "4 days").state;
        assert_eq!(state.phase, Phase::GeneratingPlan);
        assert_eq!(state.gathered_info.goal, Some(Goal::MuscleGain));
    }

    #[test]
    fn generating_plan_does_not_move_before_reply() {
        let state = in_phase(Phase::GeneratingPlan);
        assert_eq!(advance(&state, "ok go").state, state);
    }

    #[test]
    fn post_process_stores_valid_plan_and_awaits_approval() {
        let mut state = in_phase(Phase::GeneratingPlan);
        state.gathered_info = GatheredInfo {
            duration_weeks: Some(8),
            ..complete_info()
        };
        let profile = UserProfile {
            weight: Some(90.0),
            ..UserProfile::default()
        };

        let outcome = post_process(&state, PLAN_REPLY, &profile, today());
        assert!(outcome.plan_generated);
        assert!(outcome.awaiting_approval);
        assert_eq!(outcome.state.phase, Phase::AwaitingApproval);

        let pending = outcome.state.generated_plan.expect("pending plan");
        assert_eq!(pending.plan.plan_name, "Lean Start");
        assert_eq!(pending.plan.exercises.len(), 2);
        assert_eq!(pending.plan.exercises[0].category, Category::Cardio);
        assert_eq!(pending.goal, Some(Goal::WeightLoss));
        assert_eq!(pending.duration_weeks, 8);
        assert_eq!(pending.deadline, today() + chrono::Duration::weeks(8));
        assert_eq!(pending.current_weight, Some(90.0));
    }

    #[test]
    fn explicit_deadline_and_goal_win_over_reply_metadata() {
        let mut state = in_phase(Phase::GeneratingPlan);
        state.gathered_info = GatheredInfo {
            deadline: Some("2026-06-30".to_string()),
            ..complete_info()
        };
        let reply = format!("This 12 week plan builds muscle.\n{PLAN_REPLY}");

        let pending = post_process(&state, &reply, &UserProfile::default(), today())
            .state
            .generated_plan
            .expect("pending plan");
        assert_eq!(pending.goal, Some(Goal::WeightLoss));
        assert_eq!(pending.duration_weeks, 12);
        assert_eq!(pending.deadline, NaiveDate::from_ymd_opt(2026, 6, 30).unwrap());
    }

    #[test]
    fn metadata_fills_missing_goal() {
        let mut state = in_phase(Phase::GeneratingPlan);
        state.gathered_info.goal = None;
        let reply = format!("A plan to build muscle.\n{PLAN_REPLY}");
        let pending = post_process(&state, &reply, &UserProfile::default(), today())
            .state
            .generated_plan
            .expect("pending plan");
        assert_eq!(pending.goal, Some(Goal::MuscleGain));
        assert_eq!(pending.duration_weeks, 4);
    }

    #[test]
    fn non_plan_reply_keeps_generating() {
        let state = in_phase(Phase::GeneratingPlan);
        let outcome = post_process(
            &state,
            "Great! Give me a second to think about it.",
            &UserProfile::default(),
            today(),
        );
        assert!(!outcome.plan_generated);
        assert!(!outcome.awaiting_approval);
        assert_eq!(outcome.state, state);

        let marker_only = format!("Here is {}", PLAN_MARKERS[0]);
        let outcome = post_process(&state, &marker_only, &UserProfile::default(), today());
        assert_eq!(outcome.state.phase, Phase::GeneratingPlan);
    }

    #[test]
    fn post_process_ignores_plans_outside_generating() {
        let state = in_phase(Phase::Chat);
        let outcome = post_process(&state, PLAN_REPLY, &UserProfile::default(), today());
        assert!(!outcome.plan_generated);
        assert!(outcome.state.generated_plan.is_none());
    }

    #[test]
    fn approval_with_plan_commits() {
        let transition = advance(&awaiting_approval(), "Yes, looks great");
        assert_eq!(transition.state.phase, Phase::Approved);
        assert_eq!(transition.effects, vec![Effect::CommitPlan]);
        assert!(transition.state.generated_plan.is_some());
    }

    #[test]
    fn approval_without_plan_stays() {
        let state = in_phase(Phase::AwaitingApproval);
        let transition = advance(&state, "yes");
        assert_eq!(transition.state.phase, Phase::AwaitingApproval);
        assert!(transition.effects.is_empty());
    }

    #[test]
    fn rejection_clears_plan_and_regathers() {
        let transition = advance(&awaiting_approval(), "no, change the days");
        assert_eq!(transition.state.phase, Phase::GatheringInfo);
        assert!(transition.state.generated_plan.is_none());
        assert!(transition.effects.is_empty());
    }

    #[test]
    fn rejection_merges_new_slots() {
        let transition = advance(&awaiting_approval(), "change it to 5 days and yoga");
        assert_eq!(transition.state.gathered_info.days, Some(5));
        assert_eq!(
            transition.state.gathered_info.workout_style.as_deref(),
            Some("Yoga")
        );
    }

    #[test]
    fn unclear_answer_reprompts() {
        let state = awaiting_approval();
        let transition = advance(&state, "what does a quad stretch involve?");
        assert_eq!(transition.state, state);
    }

    #[test]
    fn approved_moves_to_chat_and_new_plan_restarts() {
        let mut approved = in_phase(Phase::Approved);
        approved.gathered_info = complete_info();

        let chat = advance(&approved, "how do I stay motivated?").state;
        assert_eq!(chat.phase, Phase::Chat);
        assert!(chat.gathered_info.is_complete());

        let restarted = advance(&chat, "I'd like a new plan").state;
        assert_eq!(restarted.phase, Phase::Welcome);
        assert!(restarted.gathered_info.is_empty());
        assert!(restarted.generated_plan.is_none());
    }

    #[test]
    fn intent_classifiers() {
        assert!(is_approval("  OK, save it"));
        assert!(!is_approval("not yet"));
        assert!(is_rejection("No thanks"));
        assert!(!is_rejection("nothing else"));
        assert!(wants_new_plan("let's start over"));
    }
}
