//! Workout plan model: candidate plans parsed from LLM prose, the finalized
//! pending plan held in conversation state, and the database-ready record.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::conversation::Goal;
use crate::slots;

mod parser;

pub use parser::{DEFAULT_PLAN_NAME, PLAN_MARKERS, parse};

/// The only exercise categories a plan may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Category {
    Cardio,
    Yoga,
    #[serde(rename = "Strength Training")]
    StrengthTraining,
    #[serde(rename = "Core Exercises")]
    CoreExercises,
    Stretching,
    Pilates,
    Cycling,
    Swimming,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Cardio,
        Category::Yoga,
        Category::StrengthTraining,
        Category::CoreExercises,
        Category::Stretching,
        Category::Pilates,
        Category::Cycling,
        Category::Swimming,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Cardio => "Cardio",
            Category::Yoga => "Yoga",
            Category::StrengthTraining => "Strength Training",
            Category::CoreExercises => "Core Exercises",
            Category::Stretching => "Stretching",
            Category::Pilates => "Pilates",
            Category::Cycling => "Cycling",
            Category::Swimming => "Swimming",
        }
    }

    /// First category (in table order) whose name occurs in `lower`.
    pub fn find_in(lower: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|category| lower.contains(&category.label().to_lowercase()))
    }

    /// Exact, case-insensitive match on the category name.
    pub fn from_label(raw: &str) -> Option<Category> {
        let raw = raw.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Day of the week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    pub fn find_in(lower: &str) -> Option<Weekday> {
        Weekday::ALL
            .into_iter()
            .find(|day| lower.contains(&day.label().to_lowercase()))
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Exercise {
    pub category: Category,
    pub name: String,
    /// Time-based duration, e.g. "30 mins" or "45 seconds"
    pub duration: String,
    #[schema(value_type = Vec<Weekday>)]
    pub days: BTreeSet<Weekday>,
}

/// A plan as parsed from one LLM reply, before approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CandidatePlan {
    pub plan_name: String,
    pub exercises: Vec<Exercise>,
    pub is_valid: bool,
}

/// True iff the plan has at least one exercise and every exercise is fully specified.
/// This is the only gate before a candidate is stored as the user's pending plan.
pub fn validate(plan: &CandidatePlan) -> bool {
    !plan.exercises.is_empty()
        && plan.exercises.iter().all(|exercise| {
            !exercise.category.label().is_empty()
                && !exercise.name.trim().is_empty()
                && !exercise.duration.trim().is_empty()
                && !exercise.days.is_empty()
        })
}

static PLAN_WEEKS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})[\s-]*(?:week|weeks|wk|wks)\b").expect("valid plan weeks regex")
});
static GOAL_WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:goal|target)\s+weight\s*(?:of|is|:|-)?\s*(?:about|around|~)?\s*(\d{2,3}(?:\.\d+)?)\s*(kg|kgs|kilograms?|lbs?|pounds?)?",
    )
    .expect("valid goal weight regex")
});

/// Goal keywords for the model's own prose. Unlike user messages, plan text
/// talking about stretching is read as a flexibility goal.
const METADATA_GOAL_RULES: [(Goal, &[&str]); 5] = [
    (
        Goal::WeightLoss,
        &["lose weight", "weight loss", "fat loss", "slim down", "get lean"],
    ),
    (
        Goal::MuscleGain,
        &["build muscle", "muscle gain", "bulk up", "get bigger", "gain mass"],
    ),
    (
        Goal::GeneralFitness,
        &[
            "stay fit",
            "general fitness",
            "maintain fitness",
            "stay healthy",
            "get fit",
        ],
    ),
    (Goal::Endurance, &["endurance", "stamina", "cardio fitness"]),
    (Goal::Flexibility, &["flexibility", "stretching", "mobility"]),
];

/// Facts the LLM stated in its own prose. Only used to fill gaps in gathered info.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanMetadata {
    pub goal: Option<Goal>,
    pub duration_weeks: Option<i64>,
    /// Kilograms
    pub goal_weight: Option<f64>,
}

pub fn extract_metadata(text: &str) -> PlanMetadata {
    let duration_weeks = PLAN_WEEKS_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok());

    let goal_weight = GOAL_WEIGHT_RE.captures(text).and_then(|caps| {
        let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
        let unit = caps.get(2).map(|m| m.as_str().to_lowercase());
        let kg = match unit.as_deref() {
            Some(u) if u.starts_with("lb") || u.starts_with("pound") => value * 0.453_592,
            _ => value,
        };
        Some((kg * 10.0).round() / 10.0)
    });

    PlanMetadata {
        goal: slots::first_goal(&METADATA_GOAL_RULES, &text.to_lowercase()),
        duration_weeks,
        goal_weight,
    }
}

/// A validated candidate enriched with goal and timeframe, held until approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PendingPlan {
    pub plan: CandidatePlan,
    pub goal: Option<Goal>,
    pub duration_weeks: i64,
    pub deadline: NaiveDate,
    /// Kilograms, from the user profile at generation time
    pub current_weight: Option<f64>,
    /// Kilograms, if the plan text stated one
    pub goal_weight: Option<f64>,
}

impl PendingPlan {
    /// Database-ready shape. `profile_weight` fills `current_weight` when the
    /// plan was generated without one.
    pub fn to_record(&self, profile_weight: Option<f64>) -> PlanRecord {
        PlanRecord {
            plan_name: if self.plan.plan_name.trim().is_empty() {
                DEFAULT_PLAN_NAME.to_string()
            } else {
                self.plan.plan_name.clone()
            },
            goal: self.goal.map(|goal| goal.label().to_string()),
            duration_weeks: self.duration_weeks,
            deadline: self.deadline,
            current_weight: self.current_weight.or(profile_weight),
            goal_weight: self.goal_weight,
            exercises: self
                .plan
                .exercises
                .iter()
                .map(|exercise| ExerciseRecord {
                    category: exercise.category.label().to_string(),
                    exercise_name: exercise.name.clone(),
                    duration: exercise.duration.clone(),
                    days: exercise.days.iter().map(|d| d.label().to_string()).collect(),
                })
                .collect(),
        }
    }
}

/// One `user_plans` row plus its `plan_exercises` rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlanRecord {
    pub plan_name: String,
    pub goal: Option<String>,
    pub duration_weeks: i64,
    pub deadline: NaiveDate,
    pub current_weight: Option<f64>,
    pub goal_weight: Option<f64>,
    pub exercises: Vec<ExerciseRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ExerciseRecord {
    pub category: String,
    pub exercise_name: String,
    pub duration: String,
    pub days: Vec<String>,
}
