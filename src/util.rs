use crate::metrics::ProgressSummary;
use crate::model::{CheckIn, DateKey, Exercise, Session, Settings};

const INSTRUCTIONS_PREVIEW: usize = 90;
const NOTES_PREVIEW: usize = 120;

pub fn greeting(settings: &Settings) -> String {
    let name = settings.name.trim();
    if name.is_empty() {
        "Your rehab, simplified.".to_string()
    } else {
        format!("Hi {name} — you've got this.")
    }
}

/// Cuts `text` to at most `max` characters, ending in an ellipsis when cut.
pub fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

pub fn format_date_long(date: DateKey) -> String {
    date.date().format("%A, %b %-d, %Y").to_string()
}

fn format_dose(exercise: &Exercise) -> String {
    format!("{} sets × {} reps/sec", exercise.sets, exercise.reps)
}

pub fn format_session_detail(date: DateKey, session: &Session, exercises: &[Exercise]) -> String {
    let mut output = String::new();
    output.push_str(&format!("Date: {}\n", format_date_long(date)));
    output.push_str(&format!("Status: {}\n", session.status().as_str()));
    if session.skipped && !session.skipped_reason.is_empty() {
        output.push_str(&format!("Reason: {}\n", session.skipped_reason));
    }
    output.push('\n');
    if exercises.is_empty() {
        output.push_str("Exercises: (none)");
        return output;
    }
    output.push_str("Exercises:\n");
    for exercise in exercises {
        let mark = if session.is_done(&exercise.id) { "x" } else { " " };
        output.push_str(&format!(
            "- [{mark}] {} ({}, id {})\n",
            exercise.name,
            format_dose(exercise),
            exercise.id
        ));
        if !exercise.video.is_empty() {
            output.push_str(&format!("  Video: {}\n", exercise.video));
        }
    }
    output.trim_end().to_string()
}

pub fn format_plan_list(exercises: &[Exercise]) -> String {
    if exercises.is_empty() {
        return "No exercises yet. Use `exercise add` to create your rehab plan.".to_string();
    }
    let mut output = String::new();
    for exercise in exercises {
        output.push_str(&format!(
            "{} {} ({})\n",
            exercise.id,
            exercise.name,
            format_dose(exercise)
        ));
        if exercise.instructions.is_empty() {
            output.push_str("  No instructions yet.\n");
        } else {
            output.push_str(&format!(
                "  {}\n",
                shorten(&exercise.instructions, INSTRUCTIONS_PREVIEW)
            ));
        }
    }
    output.trim_end().to_string()
}

pub fn format_exercise_detail(exercise: &Exercise) -> String {
    let mut output = String::new();
    output.push_str(&format!("Exercise ID: {}\n", exercise.id));
    output.push_str(&format!("Name: {}\n", exercise.name));
    output.push_str(&format!("Sets: {}\n", exercise.sets));
    output.push_str(&format!("Reps: {}\n", exercise.reps));
    if exercise.instructions.is_empty() {
        output.push_str("Instructions: (none)\n");
    } else {
        output.push_str(&format!("Instructions: {}\n", exercise.instructions));
    }
    if !exercise.video.is_empty() {
        output.push_str(&format!("Video: {}\n", exercise.video));
    }
    output.trim_end().to_string()
}

pub fn format_checkin_detail(date: DateKey, checkin: Option<&CheckIn>) -> String {
    let Some(checkin) = checkin else {
        return format!("Check-in for {date}: Not saved");
    };
    let mut output = String::new();
    output.push_str(&format!("Check-in for {date}: Saved\n"));
    output.push_str(&format!("Pain: {}/10\n", checkin.pain));
    output.push_str(&format!("Stiffness: {}/10\n", checkin.stiffness));
    output.push_str(&format!("Swelling: {}\n", checkin.swelling.as_str()));
    output.push_str(&format!("Sleep: {} h\n", checkin.sleep));
    if !checkin.notes.is_empty() {
        output.push_str(&format!("Notes: {}\n", checkin.notes));
    }
    output.trim_end().to_string()
}

/// One cell per day; `·` marks days without a check-in.
pub fn format_pain_series(points: &[Option<i32>]) -> String {
    points
        .iter()
        .map(|point| match point {
            Some(pain) => pain.to_string(),
            None => "·".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_progress(summary: &ProgressSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!("Adherence: {}%\n", summary.adherence));
    output.push_str(&format!(
        "Completed: {}/{} days\n",
        summary.completed,
        summary.window.len()
    ));
    output.push_str(&format!("Streak: {}\n", summary.streak));
    match &summary.latest {
        Some(latest) => output.push_str(&format!("Last pain: {}/10\n", latest.pain)),
        None => output.push_str("Last pain: —\n"),
    }
    if let (Some(first), Some(last)) = (summary.window.first(), summary.window.last()) {
        output.push_str(&format!(
            "Pain trend ({first} .. {last}): {}\n",
            format_pain_series(&summary.pain)
        ));
    }
    output.push('\n');
    if summary.recent.is_empty() {
        output.push_str("No check-ins yet. Save a daily check-in to see progress here.");
        return output;
    }
    output.push_str("Recent check-ins:\n");
    for checkin in &summary.recent {
        output.push_str(&format!(
            "- {}: pain {}/10, stiffness {}/10, swelling {}\n",
            checkin.date,
            checkin.pain,
            checkin.stiffness,
            checkin.swelling.as_str()
        ));
        if !checkin.notes.is_empty() {
            output.push_str(&format!("  {}\n", shorten(&checkin.notes, NOTES_PREVIEW)));
        }
    }
    output.trim_end().to_string()
}
