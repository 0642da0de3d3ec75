//! Keyword/regex slot filling over free-text user messages.
//!
//! Deliberately heuristic: ordered rule tables, no NLP.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::conversation::{GatheredInfo, Goal};

pub const MIXED_STYLE: &str = "Mixed";

/// Goals in priority order. The first goal with a matching keyword wins.
pub(crate) const GOAL_RULES: [(Goal, &[&str]); 5] = [
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
    (Goal::Flexibility, &["flexibility", "mobility", "flexible"]),
];

static STYLE_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("Cardio", r"\b(cardio|running|run|jogging|hiit)\b"),
        ("Yoga", r"\byoga\b"),
        (
            "Strength Training",
            r"\b(strength|weights|weight training|weightlifting|lifting|resistance)\b",
        ),
        ("Core Exercises", r"\b(core|abs|planks?)\b"),
        ("Stretching", r"\bstretch(es|ing)?\b"),
        ("Pilates", r"\bpilates\b"),
        ("Cycling", r"\b(cycling|bike|biking|spinning)\b"),
        ("Swimming", r"\b(swim|swimming)\b"),
        (MIXED_STYLE, r"\b(mix|mixed|variety|combination|a bit of everything)\b"),
    ]
    .into_iter()
    .map(|(label, pattern)| {
        let re = Regex::new(&format!("(?i){pattern}")).expect("valid style regex");
        (label, re)
    })
    .collect()
});

static DAYS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*(?:days?|times?)\b").expect("valid days regex"));
static WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)s?\b")
        .expect("valid weekday regex")
});
static WEEKS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:in\s*)?\b(\d{1,2})\s*(?:week|weeks|wk|wks)\b").expect("valid weeks regex")
});
static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").expect("valid iso date regex"));

/// Extract every slot we can find in `message`. Fields that are not mentioned stay `None`.
pub fn extract(message: &str) -> GatheredInfo {
    let lower = message.to_lowercase();
    let (duration_weeks, deadline) = extract_timeframe(&lower);

    GatheredInfo {
        goal: extract_goal(&lower),
        workout_style: extract_workout_style(&lower),
        days: extract_days(&lower),
        deadline,
        duration_weeks,
    }
}

pub fn extract_goal(text: &str) -> Option<Goal> {
    first_goal(&GOAL_RULES, &text.to_lowercase())
}

/// First goal in `rules` with a keyword contained in `lower`.
pub(crate) fn first_goal(rules: &[(Goal, &[&str])], lower: &str) -> Option<Goal> {
    rules
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(goal, _)| *goal)
}

/// All style groups are evaluated; two or more distinct hits collapse to "Mixed".
pub fn extract_workout_style(text: &str) -> Option<String> {
    let matched: Vec<&str> = STYLE_RULES
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(label, _)| *label)
        .collect();

    match matched.as_slice() {
        [] => None,
        [single] => Some((*single).to_string()),
        _ => Some(MIXED_STYLE.to_string()),
    }
}

/// An explicit "N days"/"N times" count wins; otherwise count distinct weekday names.
pub fn extract_days(text: &str) -> Option<u8> {
    let explicit = DAYS_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u8>().ok())
        .filter(|days| (1..=7).contains(days));
    if explicit.is_some() {
        return explicit;
    }

    let weekdays: HashSet<String> = WEEKDAY_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_lowercase()))
        .collect();
    if weekdays.is_empty() {
        None
    } else {
        u8::try_from(weekdays.len()).ok()
    }
}

/// Returns `(duration_weeks, deadline)`; at most one of the two is set.
fn extract_timeframe(text: &str) -> (Option<i64>, Option<String>) {
    if let Some(weeks) = WEEKS_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
    {
        return (Some(weeks), None);
    }

    let deadline = ISO_DATE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    (None, deadline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_goal_style_and_days_from_one_message() {
        let info = extract("I want to lose weight, I like cardio, 3 days a week");
        assert_eq!(info.goal, Some(Goal::WeightLoss));
        assert_eq!(info.workout_style.as_deref(), Some("Cardio"));
        assert_eq!(info.days, Some(3));
        assert_eq!(info.duration_weeks, None);
        assert_eq!(info.deadline, None);
    }

    #[test]
    fn strength_training_message() {
        let info = extract(
            "I want to build muscle, I like strength training, and I can work out 4 days per week",
        );
        assert_eq!(info.goal, Some(Goal::MuscleGain));
        assert_eq!(info.workout_style.as_deref(), Some("Strength Training"));
        assert_eq!(info.days, Some(4));
    }

    #[test]
    fn goal_priority_follows_table_order() {
        // both "weight loss" and "endurance" keywords present
        assert_eq!(
            extract_goal("weight loss and endurance please"),
            Some(Goal::WeightLoss)
        );
        assert_eq!(extract_goal("more stamina"), Some(Goal::Endurance));
        assert_eq!(extract_goal("hello there"), None);
    }

    #[test]
    fn two_style_groups_become_mixed() {
        assert_eq!(
            extract_workout_style("i like cardio and yoga").as_deref(),
            Some(MIXED_STYLE)
        );
        assert_eq!(
            extract_workout_style("swimming, pilates and some cycling").as_deref(),
            Some(MIXED_STYLE)
        );
        assert_eq!(extract_workout_style("just pilates").as_deref(), Some("Pilates"));
    }

    #[test]
    fn losing_weight_is_not_strength_training() {
        assert_eq!(extract_workout_style("i want to lose weight"), None);
    }

    #[test]
    fn explicit_day_count_beats_weekday_names() {
        assert_eq!(extract_days("2 times, ideally monday wednesday friday"), Some(2));
    }

    #[test]
    fn weekday_names_are_counted_when_no_number() {
        assert_eq!(extract_days("monday and friday"), Some(2));
        assert_eq!(extract_days("mondays, monday and tuesday"), Some(2));
        assert_eq!(extract_days("whenever"), None);
    }

    #[test]
    fn out_of_range_day_count_falls_back() {
        assert_eq!(extract_days("for 30 days on saturday"), Some(1));
    }

    #[test]
    fn weeks_pattern_wins_over_date() {
        let info = extract("in 8 weeks, ideally by 2026-03-01");
        assert_eq!(info.duration_weeks, Some(8));
        assert_eq!(info.deadline, None);
    }

    #[test]
    fn iso_date_sets_deadline() {
        let info = extract("I need to be ready by 2026-03-01");
        assert_eq!(info.deadline.as_deref(), Some("2026-03-01"));
        assert_eq!(info.duration_weeks, None);
    }

    #[test]
    fn short_week_forms_are_recognised() {
        assert_eq!(extract("12wks").duration_weeks, Some(12));
        assert_eq!(extract("in 6 wk").duration_weeks, Some(6));
    }
}
