use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::{CandidatePlan, Category, Exercise, Weekday};

pub const DEFAULT_PLAN_NAME: &str = "AI Generated Workout Plan";
pub const DEFAULT_DURATION: &str = "30 mins";
/// Phrases whose presence means the reply is presenting a plan.
pub const PLAN_MARKERS: [&str; 5] = [
    "workout plan",
    "weekly plan",
    "exercise plan",
    "your plan",
    "personalized plan",
];
/// Days handed out round-robin to exercises that appeared under no day header.
const DEFAULT_DAY_CYCLE: [Weekday; 3] = [Weekday::Monday, Weekday::Wednesday, Weekday::Friday];
const MIN_NAME_CHARS: usize = 3;

static PLAN_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)plan name\s*:\s*(.*)$").expect("valid plan name regex"));
static NOTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:tips|notes|recommendations)\s*:").expect("valid notes regex")
});
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-•]|\d+\.)\s*").expect("valid bullet regex"));
static INLINE_CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(cardio|yoga|strength training|core exercises|stretching|pilates|cycling|swimming)\s*(?::\s*(.*))?$",
    )
    .expect("valid inline category regex")
});
static INLINE_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b\s*(?:[:\-–—]\s*)?(.*)$",
    )
    .expect("valid inline day regex")
});
static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(minutes?|mins?|seconds?|secs?|hours?|hrs?)\b")
        .expect("valid duration regex")
});
/// Durations and rep/set counts; everything from the first hit on is not part of the name.
static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\d+\s*[-–]\s*)?\d+(?:\.\d+)?\s*(?:x\s*\d+\s*)?(?:minutes?|mins?|seconds?|secs?|hours?|hrs?|reps?|sets?|rounds?)\b",
    )
    .expect("valid noise regex")
});
static PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid parenthesis regex"));
static FILLER_EDGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:of|for)\s+|\s+(?:of|for|x|at|with)$").expect("valid filler regex")
});

#[derive(Default)]
struct ScanState {
    plan_name: Option<String>,
    category: Option<Category>,
    day: Option<Weekday>,
    in_notes: bool,
    exercises: Vec<Exercise>,
}

/// Turn an LLM reply into a candidate plan.
///
/// Returns `None` when the reply carries no plan marker (the model is still
/// talking, not presenting) or when no exercise could be recovered from it.
pub fn parse(text: &str) -> Option<CandidatePlan> {
    let lower = text.to_lowercase();
    if !PLAN_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return None;
    }

    let mut scan = ScanState::default();
    for raw_line in text.lines() {
        scan_line(&mut scan, raw_line);
    }

    if scan.exercises.is_empty() {
        return None;
    }

    let mut undated = 0usize;
    for exercise in scan.exercises.iter_mut().filter(|e| e.days.is_empty()) {
        exercise
            .days
            .insert(DEFAULT_DAY_CYCLE[undated % DEFAULT_DAY_CYCLE.len()]);
        undated += 1;
    }

    Some(CandidatePlan {
        plan_name: scan
            .plan_name
            .unwrap_or_else(|| DEFAULT_PLAN_NAME.to_string()),
        exercises: scan.exercises,
        is_valid: true,
    })
}

fn scan_line(scan: &mut ScanState, raw_line: &str) {
    let plain = strip_emphasis(raw_line);
    let line = plain.trim();
    if line.is_empty() {
        return;
    }

    if let Some(caps) = PLAN_NAME_RE.captures(line) {
        let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        if !name.is_empty() {
            scan.plan_name = Some(name.to_string());
        }
        return;
    }

    if NOTES_RE.is_match(line) {
        scan.category = None;
        scan.in_notes = true;
        return;
    }

    let Some(bullet) = BULLET_RE.find(line) else {
        scan_header(scan, &line.to_lowercase());
        return;
    };

    let mut body = line[bullet.end()..].trim().to_string();
    let mut day = None;
    if let Some(caps) = INLINE_DAY_RE.captures(&body) {
        day = caps.get(1).and_then(|m| Weekday::find_in(&m.as_str().to_lowercase()));
        body = caps.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
    }

    // An inline category is a header in its own right and ends a notes section.
    let mut category = scan.category;
    if let Some(caps) = INLINE_CATEGORY_RE.captures(&body) {
        let named = caps.get(1).and_then(|m| Category::from_label(m.as_str()));
        scan.in_notes = false;
        let rest = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
        if rest.is_empty() {
            // "- Cardio:" used as a sub-heading
            scan.category = named;
            if day.is_some() {
                scan.day = day;
            }
            return;
        }
        category = named;
        body = rest.to_string();
    }

    if scan.in_notes {
        return;
    }
    if day.is_some() {
        scan.day = day;
    }
    if body.is_empty() {
        return;
    }

    let Some(category) = category else {
        return;
    };
    let Some((name, duration)) = parse_exercise(&body) else {
        return;
    };
    record_exercise(scan, category, name, duration);
}

/// Non-bullet lines are headers: a category name, a weekday, or both.
fn scan_header(scan: &mut ScanState, lower: &str) {
    let category = Category::find_in(lower);
    let day = Weekday::find_in(lower);
    if let Some(category) = category {
        scan.category = Some(category);
        scan.in_notes = false;
    }
    if let Some(day) = day {
        scan.day = Some(day);
    }
}

fn record_exercise(scan: &mut ScanState, category: Category, name: String, duration: String) {
    let key = name.to_lowercase();
    if let Some(existing) = scan.exercises.iter_mut().find(|e| {
        e.category == category && e.duration == duration && e.name.to_lowercase() == key
    }) {
        if let Some(day) = scan.day {
            existing.days.insert(day);
        }
        return;
    }

    scan.exercises.push(Exercise {
        category,
        name,
        duration,
        days: scan.day.into_iter().collect::<BTreeSet<_>>(),
    });
}

/// Split an exercise line into `(name, duration)`. Reps and sets are noise.
fn parse_exercise(body: &str) -> Option<(String, String)> {
    let duration = DURATION_RE
        .captures(body)
        .and_then(|caps| {
            let amount = caps.get(1)?.as_str();
            let unit = caps.get(2)?.as_str().to_lowercase();
            Some(format!("{amount} {unit}"))
        })
        .unwrap_or_else(|| DEFAULT_DURATION.to_string());

    let without_asides = PAREN_RE.replace_all(body, " ").to_string();

    let truncated = match NOISE_RE.find(&without_asides) {
        Some(m) => clean_name(&without_asides[..m.start()]),
        None => clean_name(&without_asides),
    };
    let name = if truncated.chars().count() >= MIN_NAME_CHARS {
        truncated
    } else {
        // "30 mins of brisk walking": the name follows the duration
        clean_name(&NOISE_RE.replace_all(&without_asides, " "))
    };

    if name.chars().count() < MIN_NAME_CHARS {
        return None;
    }
    Some((name, duration))
}

fn clean_name(raw: &str) -> String {
    let mut name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    loop {
        let trimmed = name
            .trim_matches(|c: char| {
                c.is_whitespace() || matches!(c, '-' | '–' | '—' | ':' | '|' | ',' | ';' | '.')
            })
            .to_string();
        let trimmed = FILLER_EDGE_RE.replace_all(&trimmed, "").to_string();
        if trimmed == name {
            return name;
        }
        name = trimmed;
    }
}

fn strip_emphasis(line: &str) -> String {
    line.chars()
        .filter(|c| !matches!(c, '*' | '_' | '`'))
        .collect()
}
