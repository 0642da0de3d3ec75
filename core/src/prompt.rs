//! System prompt assembly: safety rules, the caller's profile, and per-phase
//! instructions.

use chrono::{Datelike, NaiveDate};

use crate::conversation::{ConversationState, GatheredInfo, Phase, UserProfile};
use crate::plan::Category;

pub const APPROVAL_QUESTION: &str =
    "Would you like to approve this plan? Reply 'Yes' to save it, or 'No' to request changes.";

const NOT_PROVIDED: &str = "NOT PROVIDED";

const SAFETY_RULES: &str = "You are a fitness assistant.

Follow these rules STRICTLY:

GENERAL SAFETY:
- Do NOT give medical advice
- Do NOT diagnose conditions
- Do NOT promise rapid or extreme results
- Recommend beginner-safe exercises
- Respect the user's time, equipment, and physical ability
- Encourage rest days, hydration, and recovery

SAFE WEIGHT CHANGE LIMITS:
- Weight Loss: 0.5 to 1 kg per week
- Muscle Gain: 0.25 to 0.5 kg per week
- Maintain Weight: about 0 kg per week (focus on consistency and body composition)

STRICT EXERCISE RULES:
- Use ONLY exercises from the provided \"Available exercises\" list
- Use ONLY these categories (exact spelling):
  Cardio, Yoga, Strength Training, Core Exercises,
  Stretching, Pilates, Cycling, Swimming
- Do NOT invent new categories (NO Warm-Up, Cool Down, HIIT, Mobility, etc.)
- Warm-up and cool-down are allowed ONLY inside a **Tips** section
  and MUST NOT appear as exercises

STRICT DURATION RULES:
- EVERY exercise MUST be TIME-BASED ONLY
- Allowed formats: \"X mins\", \"X seconds\", \"X hours\"
- Do NOT use sets, reps, rounds, circuits, or counts of movements

PLAN STRUCTURE RULES:
- Each day MUST have a clear header (e.g., **Monday:**)
- Each exercise is one bullet: \"- Category: Exercise Name - N mins\"
- Exercises on the same day should go well together
- Avoid training the same muscle group on consecutive days";

/// Exercises the model may choose from, per category.
pub const EXERCISE_CATALOGUE: [(Category, &str); 8] = [
    (
        Category::Cardio,
        "brisk walking, running, cycling, swimming, dancing, jumping rope",
    ),
    (
        Category::Yoga,
        "Downward Facing Dog, Mountain Pose, Tree Pose, Warrior 2, Cat Pose and Cow Pose, Chair Pose, Cobra Pose, Child's Pose",
    ),
    (
        Category::StrengthTraining,
        "Squats, Deadlifts, Overhead Press, Push-ups, Pull-ups, Lunges, Rows, Kettlebell Swings, Planks, Burpees, Tricep Dips, Bicep Curls, Glute Bridges, Step-ups, Renegade Rows",
    ),
    (
        Category::CoreExercises,
        "Plank, Crunches, Leg Raises, Glute Bridge, Bird Dog, Dead Bug, Russian Twists, Mountain Climbers, Hollow Hold, Side Plank with Rotation, Flutter Kicks, Bicycle Crunches, Reverse Crunches",
    ),
    (
        Category::Stretching,
        "Hamstring stretch, Standing calf stretch, Shoulder stretch, Triceps stretch, Knee to chest, Quad stretch, Kneeling hip flexor stretch, Side stretch, Neck Stretch, Spinal Twist",
    ),
    (
        Category::Pilates,
        "Pelvic Curl, Chest Lift, Chest Lift with Rotation, Spine Twist Supine, Single Leg Stretch, Roll Up, Roll-Like-a-Ball, Leg Circles",
    ),
    (
        Category::Cycling,
        "Indoor cycling, Outdoor cycling, Stationary bike intervals",
    ),
    (
        Category::Swimming,
        "Freestyle, Breaststroke, Backstroke, Water aerobics",
    ),
];

/// Whole years between `birthdate` and `today`; `None` for future birthdates.
pub fn age_on(birthdate: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - birthdate.year();
    if (today.month(), today.day()) < (birthdate.month(), birthdate.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

pub fn build_system_prompt(
    profile: &UserProfile,
    state: &ConversationState,
    today: NaiveDate,
) -> String {
    format!(
        "{SAFETY_RULES}\n\n{}\n\n{}\n\nApproval question, asked verbatim after every plan:\n\"{APPROVAL_QUESTION}\"\n",
        profile_block(profile, today),
        phase_instructions(state),
    )
}

fn profile_block(profile: &UserProfile, today: NaiveDate) -> String {
    let age = profile
        .birthdate
        .and_then(|birthdate| age_on(birthdate, today))
        .map(|years| format!("{years} years old"))
        .unwrap_or_else(|| "Not provided".to_string());
    let height = profile
        .height
        .map(|cm| format!("{cm} cm"))
        .unwrap_or_else(|| "Not provided".to_string());
    let weight = profile
        .weight
        .map(|kg| format!("{kg} kg"))
        .unwrap_or_else(|| "Not provided".to_string());
    let equipment = match profile.equipment {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "Not provided",
    };

    format!(
        "User Profile:\n- Age: {age}\n- Gender: {}\n- Height: {height}\n- Weight: {weight}\n- Equipment: {equipment}",
        profile.gender.as_deref().unwrap_or("Not provided"),
    )
}

fn phase_instructions(state: &ConversationState) -> String {
    let info = &state.gathered_info;
    match state.phase {
        Phase::Welcome => "CURRENT STATE: Welcome

Instructions:
1. Greet the user warmly and introduce yourself as their fitness coach
2. Explain that you'll help create a personalized workout plan
3. Ask for their fitness goal, preferred workout style, days per week they can commit, and an optional deadline or timeframe (e.g., \"by 2026-03-01\" or \"in 8 weeks\")

Keep it friendly, encouraging, and concise."
            .to_string(),
        Phase::GatheringInfo => format!(
            "CURRENT STATE: Gathering Information

Information collected so far:
{}

Missing information: {}

Instructions:
1. Acknowledge what the user has provided
2. Ask for the missing information in a friendly, conversational way
3. Accept a timeframe (e.g., \"in 8 weeks\") OR a date (e.g., \"2026-03-01\")

Do NOT generate a plan yet. Only gather information.",
            collected(info),
            missing(info),
        ),
        Phase::GeneratingPlan => format!(
            "CURRENT STATE: Generating Workout Plan

User Preferences:
{}

{}

Instructions:
1. Create a personalized weekly workout plan based on the user's goal, preferred workout style, and available days
2. Use ONLY exercises from the available list above
3. Start the plan with \"Plan Name: <short name aligned with goal and exercises>\"
4. Give every training day a header (e.g., **Monday:**) followed by bullets like \"- Cardio: Running - 30 mins\"
5. Put warm-up and cool-down advice under a **Tips:** section
6. End with the approval question",
            collected(info),
            catalogue(),
        ),
        Phase::AwaitingApproval => "CURRENT STATE: Awaiting Plan Approval

Instructions:
- If the user approves, confirm it will be saved and encourage them.
- If the user requests changes, ask what to change.
- If unclear, ask them to reply Yes or No."
            .to_string(),
        Phase::Approved => "CURRENT STATE: Plan Approved and Saved

Instructions:
- Congratulate them and encourage consistency.
- Offer to answer questions."
            .to_string(),
        Phase::Chat => format!(
            "CURRENT STATE: General Chat

Instructions:
- Answer fitness-related questions within the safety rules.
- If the user wants a different plan, tell them to ask for a new plan.

{}",
            catalogue()
        ),
    }
}

fn collected(info: &GatheredInfo) -> String {
    let goal = info.goal.map(|goal| goal.label().to_string());
    let days = info.days.map(|days| days.to_string());
    let weeks = info.duration_weeks.map(|weeks| weeks.to_string());
    format!(
        "- Goal: {}\n- Workout Style: {}\n- Days per week: {}\n- Deadline (date): {}\n- Timeframe (weeks): {}",
        goal.as_deref().unwrap_or(NOT_PROVIDED),
        info.workout_style.as_deref().unwrap_or(NOT_PROVIDED),
        days.as_deref().unwrap_or(NOT_PROVIDED),
        info.deadline.as_deref().unwrap_or(NOT_PROVIDED),
        weeks.as_deref().unwrap_or(NOT_PROVIDED),
    )
}

fn missing(info: &GatheredInfo) -> String {
    let mut missing = Vec::new();
    if info.goal.is_none() {
        missing.push("fitness goal");
    }
    if info.workout_style.is_none() {
        missing.push("preferred workout style");
    }
    if info.days.is_none() {
        missing.push("available days per week");
    }
    if info.deadline.is_none() && info.duration_weeks.is_none() {
        missing.push("deadline or timeframe (optional)");
    }
    if missing.is_empty() {
        "none".to_string()
    } else {
        missing.join(", ")
    }
}

fn catalogue() -> String {
    let mut out =
        String::from("Available exercises (ONLY choose from this list, do NOT invent or rename):\n");
    for (category, exercises) in EXERCISE_CATALOGUE {
        out.push_str(&format!("\n- {category}:\n  {exercises}"));
    }
    out
}
