//! Postgres-backed [`PlanSink`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stride_core::coach::{ActivePlan, PlanSink};
use stride_core::error::PersistenceError;
use stride_core::plan::{ExerciseRecord, PlanRecord};

#[derive(Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Deactivate, insert plan, insert exercises. Dropping `tx` on any `?` rolls back.
    async fn insert_plan(
        &self,
        user_id: Uuid,
        plan: &PlanRecord,
        duration_weeks: i32,
    ) -> Result<Uuid, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE user_plans SET is_active = FALSE WHERE user_id = $1 AND is_active")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let plan_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO user_plans
                (id, user_id, plan_name, goal, duration_weeks, deadline, current_weight, goal_weight, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
            RETURNING id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(&plan.plan_name)
        .bind(&plan.goal)
        .bind(duration_weeks)
        .bind(plan.deadline)
        .bind(plan.current_weight)
        .bind(plan.goal_weight)
        .fetch_one(&mut *tx)
        .await?;

        for (position, exercise) in (0_i32..).zip(&plan.exercises) {
            sqlx::query(
                r#"
                INSERT INTO plan_exercises
                    (id, plan_id, position, category, exercise_name, duration, days)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(plan_id)
            .bind(position)
            .bind(&exercise.category)
            .bind(&exercise.exercise_name)
            .bind(&exercise.duration)
            .bind(&exercise.days)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(plan_id)
    }

    async fn fetch_active(&self, user_id: Uuid) -> Result<Option<ActivePlan>, sqlx::Error> {
        let Some(plan) = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, plan_name, goal, duration_weeks, deadline, current_weight, goal_weight, created_at
            FROM user_plans
            WHERE user_id = $1 AND is_active
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let exercises = sqlx::query_as::<_, ExerciseRow>(
            r#"
            SELECT category, exercise_name, duration, days
            FROM plan_exercises
            WHERE plan_id = $1
            ORDER BY position
            "#,
        )
        .bind(plan.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(plan.into_active_plan(exercises)))
    }
}

#[async_trait]
impl PlanSink for PgPlanStore {
    async fn commit_plan(&self, user_id: Uuid, plan: &PlanRecord) -> Result<Uuid, PersistenceError> {
        let duration_weeks = i32::try_from(plan.duration_weeks)
            .map_err(|e| PersistenceError::with_source("duration_weeks out of range", e))?;
        self.insert_plan(user_id, plan, duration_weeks)
            .await
            .map_err(|e| PersistenceError::with_source("failed to save plan", e))
    }

    async fn active_plan(&self, user_id: Uuid) -> Result<Option<ActivePlan>, PersistenceError> {
        self.fetch_active(user_id)
            .await
            .map_err(|e| PersistenceError::with_source("failed to load active plan", e))
    }
}

#[derive(sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    plan_name: String,
    goal: Option<String>,
    duration_weeks: i32,
    deadline: NaiveDate,
    current_weight: Option<f64>,
    goal_weight: Option<f64>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ExerciseRow {
    category: String,
    exercise_name: String,
    duration: String,
    days: Vec<String>,
}

impl PlanRow {
    fn into_active_plan(self, exercises: Vec<ExerciseRow>) -> ActivePlan {
        ActivePlan {
            id: self.id,
            plan: PlanRecord {
                plan_name: self.plan_name,
                goal: self.goal,
                duration_weeks: i64::from(self.duration_weeks),
                deadline: self.deadline,
                current_weight: self.current_weight,
                goal_weight: self.goal_weight,
                exercises: exercises
                    .into_iter()
                    .map(|row| ExerciseRecord {
                        category: row.category,
                        exercise_name: row.exercise_name,
                        duration: row.duration,
                        days: row.days,
                    })
                    .collect(),
            },
            created_at: self.created_at,
        }
    }
}
