//! Turn driver and approval workflow.
//!
//! [`Coach`] owns the conversation store and talks to the outside world through
//! two collaborators: a [`CompletionProvider`] for the LLM and a [`PlanSink`] for
//! the relational plan store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::conversation::{ChatTurn, ConversationState, Phase, StateUpdate, UserProfile};
use crate::error::{CoachError, LlmError, PersistenceError};
use crate::machine::{self, Effect};
use crate::plan::{PendingPlan, PlanRecord};
use crate::prompt;
use crate::slots;
use crate::store::ConversationStore;

/// Longest user message accepted for a single turn.
pub const MAX_MESSAGE_CHARS: usize = 4000;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// One completion for the system prompt followed by the chat history
    /// (oldest first, ending with the current user message).
    async fn complete(&self, system_prompt: &str, history: &[ChatTurn]) -> Result<String, LlmError>;
}

#[async_trait]
pub trait PlanSink: Send + Sync {
    /// Atomically deactivate the user's active plans, insert `plan` with its
    /// exercises and return the new plan id. Nothing is written on failure.
    async fn commit_plan(&self, user_id: Uuid, plan: &PlanRecord) -> Result<Uuid, PersistenceError>;

    /// Newest active plan for the user, if any.
    async fn active_plan(&self, user_id: Uuid) -> Result<Option<ActivePlan>, PersistenceError>;
}

/// A persisted plan as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActivePlan {
    pub id: Uuid,
    #[serde(flatten)]
    pub plan: PlanRecord,
    pub created_at: DateTime<Utc>,
}

/// Result of one conversational turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub conversation_state: ConversationState,
    /// True when this reply produced a new pending plan.
    pub plan_generated: bool,
    pub awaiting_approval: bool,
    /// Set when the user approved the pending plan in this turn.
    pub saved_plan_id: Option<Uuid>,
}

pub struct Coach {
    store: ConversationStore,
    provider: Arc<dyn CompletionProvider>,
    sink: Arc<dyn PlanSink>,
}

impl Coach {
    pub fn new(
        store: ConversationStore,
        provider: Arc<dyn CompletionProvider>,
        sink: Arc<dyn PlanSink>,
    ) -> Self {
        Self {
            store,
            provider,
            sink,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub async fn handle_turn(
        &self,
        user_id: Uuid,
        message: &str,
        profile: &UserProfile,
    ) -> Result<TurnOutcome, CoachError> {
        self.handle_turn_on(user_id, message, profile, Utc::now().date_naive())
            .await
    }

    /// [`Coach::handle_turn`] with an explicit calendar date for deadline math.
    pub async fn handle_turn_on(
        &self,
        user_id: Uuid,
        message: &str,
        profile: &UserProfile,
        today: NaiveDate,
    ) -> Result<TurnOutcome, CoachError> {
        let message = validate_message(message)?;

        let mut current = self.store.get(user_id);
        current
            .gathered_info
            .merge(&slots::extract(message).deadline_only());

        let transition = machine::advance(&current, message);
        let mut saved_plan_id = None;
        for effect in &transition.effects {
            match effect {
                Effect::CommitPlan => {
                    let pending = current
                        .generated_plan
                        .as_ref()
                        .ok_or(CoachError::NoPlanAwaitingApproval)?;
                    saved_plan_id = Some(self.commit(user_id, pending, profile).await?);
                }
            }
        }

        let pre_call = transition.state;
        if pre_call.phase != current.phase {
            tracing::debug!(
                %user_id,
                from = %current.phase,
                to = %pre_call.phase,
                "conversation phase changed"
            );
        }
        self.store.put(user_id, pre_call.clone());
        self.store.push_turn(user_id, ChatTurn::user(message));

        let system_prompt = prompt::build_system_prompt(profile, &pre_call, today);
        let history = self.store.history(user_id);
        let reply = self.provider.complete(&system_prompt, &history).await?;
        self.store.push_turn(user_id, ChatTurn::assistant(reply.clone()));

        let outcome = machine::post_process(&pre_call, &reply, profile, today);
        if outcome.plan_generated {
            tracing::info!(%user_id, "plan generated and awaiting approval");
        }
        self.store.put(user_id, outcome.state.clone());

        Ok(TurnOutcome {
            reply,
            conversation_state: outcome.state,
            plan_generated: outcome.plan_generated,
            awaiting_approval: outcome.awaiting_approval,
            saved_plan_id,
        })
    }

    /// Persist the pending plan. Only valid in `awaiting_approval` with a stored plan;
    /// otherwise nothing changes and [`CoachError::NoPlanAwaitingApproval`] is returned.
    pub async fn approve_plan(
        &self,
        user_id: Uuid,
        profile: &UserProfile,
    ) -> Result<Uuid, CoachError> {
        let state = self.store.get(user_id);
        let pending = match (state.phase, &state.generated_plan) {
            (Phase::AwaitingApproval, Some(pending)) => pending,
            _ => return Err(CoachError::NoPlanAwaitingApproval),
        };

        let plan_id = self.commit(user_id, pending, profile).await?;
        self.store.merge(user_id, StateUpdate::phase(Phase::Approved));
        Ok(plan_id)
    }

    pub fn conversation_state(&self, user_id: Uuid) -> ConversationState {
        self.store.get(user_id)
    }

    pub fn history(&self, user_id: Uuid) -> Vec<ChatTurn> {
        self.store.history(user_id)
    }

    pub fn reset(&self, user_id: Uuid) {
        self.store.reset(user_id);
        tracing::debug!(%user_id, "conversation reset");
    }

    pub async fn active_plan(&self, user_id: Uuid) -> Result<Option<ActivePlan>, CoachError> {
        Ok(self.sink.active_plan(user_id).await?)
    }

    async fn commit(
        &self,
        user_id: Uuid,
        pending: &PendingPlan,
        profile: &UserProfile,
    ) -> Result<Uuid, CoachError> {
        let record = pending.to_record(profile.weight);
        let plan_id = self.sink.commit_plan(user_id, &record).await?;
        tracing::info!(
            %user_id,
            %plan_id,
            exercises = record.exercises.len(),
            duration_weeks = record.duration_weeks,
            "plan approved and saved"
        );
        Ok(plan_id)
    }
}

fn validate_message(message: &str) -> Result<&str, CoachError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(CoachError::InvalidInput {
            field: "message",
            message: "message must not be empty".to_string(),
        });
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(CoachError::InvalidInput {
            field: "message",
            message: format!("message must be at most {MAX_MESSAGE_CHARS} characters"),
        });
    }
    Ok(trimmed)
}
