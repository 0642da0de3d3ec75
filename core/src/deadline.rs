use chrono::{Days, NaiveDate};

use crate::conversation::GatheredInfo;
use crate::plan::PlanMetadata;

pub const MIN_WEEKS: i64 = 4;
pub const MAX_WEEKS: i64 = 52;
pub const DEFAULT_WEEKS: i64 = 4;

#[derive(Debug, Clone, Default)]
pub struct DeadlineRequest<'a> {
    /// Explicit target date, used verbatim when it parses.
    pub provided_deadline: Option<&'a str>,
    pub provided_weeks: Option<i64>,
    /// Used when `provided_weeks` is absent. Defaults to [`DEFAULT_WEEKS`].
    pub fallback_weeks: Option<i64>,
}

/// Clamp a week count into `[MIN_WEEKS, MAX_WEEKS]`.
pub fn clamp_weeks(weeks: i64) -> i64 {
    weeks.clamp(MIN_WEEKS, MAX_WEEKS)
}

/// Parse a loosely typed week count. Non-numeric input yields `None`.
pub fn parse_weeks(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

/// Resolve the plan deadline. Never fails: anything unusable degrades to the
/// default horizon of [`DEFAULT_WEEKS`] weeks from `today`.
pub fn compute_safe_deadline(request: &DeadlineRequest<'_>, today: NaiveDate) -> NaiveDate {
    if let Some(explicit) = request
        .provided_deadline
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
    {
        return explicit;
    }

    let weeks = clamp_weeks(
        request
            .provided_weeks
            .or(request.fallback_weeks)
            .unwrap_or(DEFAULT_WEEKS),
    );
    let days = u64::try_from(weeks * 7).unwrap_or(28);
    today.checked_add_days(Days::new(days)).unwrap_or(today)
}

/// Plan length in weeks: an explicit user timeframe wins over one inferred from
/// the LLM reply, falling back to the default; always within bounds.
pub fn resolve_duration_weeks(gathered: &GatheredInfo, metadata: &PlanMetadata) -> i64 {
    clamp_weeks(
        gathered
            .duration_weeks
            .or(metadata.duration_weeks)
            .unwrap_or(DEFAULT_WEEKS),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    #[test]
    fn explicit_date_is_returned_verbatim() {
        let request = DeadlineRequest {
            provided_deadline: Some("2026-02-01"),
            provided_weeks: Some(40),
            ..DeadlineRequest::default()
        };
        assert_eq!(
            compute_safe_deadline(&request, today()),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
    }

    #[test]
    fn invalid_date_falls_back_to_weeks() {
        let request = DeadlineRequest {
            provided_deadline: Some("2026-13-45"),
            provided_weeks: Some(8),
            ..DeadlineRequest::default()
        };
        assert_eq!(
            compute_safe_deadline(&request, today()),
            today() + chrono::Duration::days(56)
        );
    }

    #[test]
    fn weeks_are_clamped_into_bounds() {
        for (weeks, expected_days) in [(1, 28), (4, 28), (10, 70), (52, 364), (500, 364), (-3, 28)] {
            let request = DeadlineRequest {
                provided_weeks: Some(weeks),
                ..DeadlineRequest::default()
            };
            assert_eq!(
                compute_safe_deadline(&request, today()),
                today() + chrono::Duration::days(expected_days),
                "weeks={weeks}"
            );
        }
    }

    #[test]
    fn deadline_stays_within_horizon_for_any_weeks_input() {
        let lower = today() + chrono::Duration::days(28);
        let upper = today() + chrono::Duration::days(364);
        let inputs = ["0", "4", "17", "52", "53", "-10", "abc", "", "9999999", "NaN"];
        for raw in inputs {
            let request = DeadlineRequest {
                provided_weeks: parse_weeks(raw),
                ..DeadlineRequest::default()
            };
            let deadline = compute_safe_deadline(&request, today());
            assert!(deadline >= lower && deadline <= upper, "input {raw:?} gave {deadline}");
        }
        for weeks in [i64::MIN, -1, 0, 1, 26, i64::MAX] {
            let request = DeadlineRequest {
                provided_weeks: Some(weeks),
                ..DeadlineRequest::default()
            };
            let deadline = compute_safe_deadline(&request, today());
            assert!(deadline >= lower && deadline <= upper, "weeks {weeks} gave {deadline}");
        }
    }

    #[test]
    fn non_numeric_weeks_use_default() {
        assert_eq!(parse_weeks("soon"), None);
        assert_eq!(parse_weeks(" 12 "), Some(12));
        let request = DeadlineRequest::default();
        assert_eq!(
            compute_safe_deadline(&request, today()),
            today() + chrono::Duration::days(28)
        );
    }

    #[test]
    fn duration_prefers_gathered_info_over_metadata() {
        let gathered = GatheredInfo {
            duration_weeks: Some(10),
            ..GatheredInfo::default()
        };
        let metadata = PlanMetadata {
            duration_weeks: Some(20),
            ..PlanMetadata::default()
        };
        assert_eq!(resolve_duration_weeks(&gathered, &metadata), 10);
        assert_eq!(resolve_duration_weeks(&GatheredInfo::default(), &metadata), 20);
        assert_eq!(
            resolve_duration_weeks(&GatheredInfo::default(), &PlanMetadata::default()),
            DEFAULT_WEEKS
        );
        let huge = GatheredInfo {
            duration_weeks: Some(99),
            ..GatheredInfo::default()
        };
        assert_eq!(resolve_duration_weeks(&huge, &metadata), MAX_WEEKS);
    }
}
