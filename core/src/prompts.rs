//! Prompt builders for the model-backed endpoints. Pure string assembly.

use crate::ai::{AiTask, AiTaskKind};
use crate::users::UserProfile;
use crate::workouts::WorkoutLog;

/// Most recent logs considered for recommendations.
pub const RECOMMENDATION_HISTORY: i64 = 10;
/// Most recent logs considered for rest-day suggestions.
pub const REST_DAY_HISTORY: i64 = 7;

const COACH_SYSTEM: &str =
    "You are an expert fitness coach providing personalized workout recommendations.";
const TRAINER_SYSTEM: &str =
    "You are an expert fitness trainer analyzing exercise form from images.";
const RECOVERY_SYSTEM: &str = "You are an expert fitness recovery specialist.";

/// Consistency label from the number of recent completions.
pub fn consistency_label(recent_completions: usize) -> &'static str {
    match recent_completions {
        n if n > 5 => "High",
        n if n > 2 => "Moderate",
        _ => "Low",
    }
}

fn goal(user: &UserProfile) -> &str {
    user.fitness_goal.as_deref().unwrap_or("general fitness")
}

fn level(user: &UserProfile) -> &str {
    user.fitness_level.as_deref().unwrap_or("beginner")
}

pub fn workout_recommendations(user: &UserProfile, recent: &[WorkoutLog]) -> AiTask {
    let prompt = format!(
        r#"User Profile:
- Fitness Goal: {goal}
- Fitness Level: {level}
- Current Streak: {streak} days
- Total Workouts: {total}

Recent Progress:
- Workouts completed: {completed}
- Average consistency: {consistency}

Based on this information, provide 3 personalized workout recommendations for the next week.
For each workout, include:
1. Workout name
2. Duration (in minutes)
3. Difficulty level
4. 5 specific exercises with sets and reps
5. Brief rationale for why this workout is recommended

Format your response as JSON with this structure:
{{
  "recommendations": [
    {{
      "name": "workout name",
      "duration": "45 min",
      "difficulty": "Intermediate",
      "exercises": [
        {{"name": "exercise", "sets": 3, "reps": "12"}}
      ],
      "rationale": "explanation"
    }}
  ]
}}"#,
        goal = goal(user),
        level = level(user),
        streak = user.current_streak,
        total = user.total_workouts,
        completed = recent.len(),
        consistency = consistency_label(recent.len()),
    );

    AiTask {
        kind: AiTaskKind::WorkoutRecommendations,
        session_id: format!("workout_rec_{}", user.id),
        system_message: COACH_SYSTEM,
        prompt,
        image_base64: None,
    }
}

pub fn form_check(exercise_name: &str, image_base64: String) -> AiTask {
    let prompt = format!(
        r#"Analyze the exercise form in this image for: {exercise_name}

Provide feedback on:
1. Overall form quality (score 1-10)
2. What's being done correctly
3. What needs improvement
4. Safety concerns (if any)
5. Specific tips for better form

Format your response as JSON:
{{
  "score": 8,
  "strengths": ["point 1", "point 2"],
  "improvements": ["point 1", "point 2"],
  "safety_concerns": ["concern 1"],
  "tips": ["tip 1", "tip 2"]
}}
Use an empty list for safety_concerns when there are none."#
    );

    AiTask {
        kind: AiTaskKind::FormCheck,
        session_id: "form_check".to_string(),
        system_message: TRAINER_SYSTEM,
        prompt,
        image_base64: Some(image_base64),
    }
}

/// `recent` is expected newest first.
pub fn rest_day(user: &UserProfile, recent: &[WorkoutLog]) -> AiTask {
    let last_workout = recent
        .first()
        .map(|log| {
            format!(
                "{} ({}) completed at {}",
                log.workout_name,
                log.duration,
                log.completed_at.to_rfc3339()
            )
        })
        .unwrap_or_else(|| "None".to_string());

    let prompt = format!(
        r#"User Profile:
- Current Streak: {streak} days
- Total Workouts: {total}
- Fitness Level: {level}

Recent Workout History:
- Workouts in past week: {count}
- Last workout: {last_workout}

Should this user take a rest day? Provide:
1. Recommendation (yes/no)
2. Reasoning
3. Recovery tips if rest is recommended
4. Light activities they can do on rest day

Format as JSON:
{{
  "should_rest": true,
  "reasoning": "explanation",
  "recovery_tips": ["tip1", "tip2"],
  "light_activities": ["activity1", "activity2"]
}}"#,
        streak = user.current_streak,
        total = user.total_workouts,
        level = level(user),
        count = recent.len(),
    );

    AiTask {
        kind: AiTaskKind::RestDay,
        session_id: format!("rest_day_{}", user.id),
        system_message: RECOVERY_SYSTEM,
        prompt,
        image_base64: None,
    }
}
