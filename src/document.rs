//! In-memory mutations of the [`Document`]. Nothing here touches storage;
//! the [`App`](crate::app::App) persists after every applied change.

use crate::ids::IdGenerator;
use crate::model::{
    sanitize_hours, Change, CheckIn, CheckInInput, DateKey, Document, Exercise, Session,
    Settings, SettingsChanges,
};

const SEED_EXERCISES: [(&str, u32, u32, &str); 3] = [
    (
        "Heel slides",
        2,
        10,
        "Lie down, slowly slide heel toward you, then return. Keep it smooth.",
    ),
    (
        "Quad sets",
        3,
        10,
        "Tighten thigh muscle, press knee down gently, hold 5 seconds, relax.",
    ),
    (
        "Glute bridge",
        3,
        10,
        "Feet on floor, lift hips, squeeze glutes, lower with control.",
    ),
];

pub const DEFAULT_SETS: u32 = 3;
pub const DEFAULT_REPS: u32 = 10;

impl Document {
    /// First-run document: three sample exercises and nothing else.
    pub fn seeded(ids: &dyn IdGenerator) -> Self {
        let exercises = SEED_EXERCISES
            .iter()
            .map(|(name, sets, reps, instructions)| Exercise {
                id: ids.generate(),
                name: name.to_string(),
                sets: *sets,
                reps: *reps,
                instructions: instructions.to_string(),
                video: String::new(),
            })
            .collect();
        Self {
            exercises,
            ..Default::default()
        }
    }

    pub fn find_exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|exercise| exercise.id == id)
    }

    pub fn exercise_ids(&self) -> Vec<String> {
        self.exercises
            .iter()
            .map(|exercise| exercise.id.clone())
            .collect()
    }

    pub fn session(&self, date: DateKey) -> Option<&Session> {
        self.sessions.get(&date)
    }

    /// Returns the session for `date` and whether it had to be created.
    pub fn ensure_session(&mut self, date: DateKey) -> (&mut Session, bool) {
        let created = !self.sessions.contains_key(&date);
        (self.sessions.entry(date).or_default(), created)
    }

    /// Full-coverage rule: every exercise ticked and the plan is not empty.
    fn covers_plan(&self, done: &[String]) -> bool {
        !self.exercises.is_empty() && done.len() == self.exercises.len()
    }

    pub fn toggle_exercise(
        &mut self,
        date: DateKey,
        exercise_id: &str,
        is_done: bool,
    ) -> Change<Session> {
        if self.find_exercise(exercise_id).is_none() {
            let current = self.session(date).cloned().unwrap_or_default();
            return Change::Rejected(current);
        }

        let mut session = self.session(date).cloned().unwrap_or_default();
        if is_done {
            if !session.is_done(exercise_id) {
                session.done_exercise_ids.push(exercise_id.to_string());
            }
        } else {
            session.done_exercise_ids.retain(|id| id != exercise_id);
        }
        session.skipped = false;
        session.skipped_reason.clear();
        session.completed = self.covers_plan(&session.done_exercise_ids);

        self.sessions.insert(date, session.clone());
        Change::Applied(session)
    }

    /// Marks every current exercise done, regardless of prior progress.
    pub fn complete_day(&mut self, date: DateKey) -> Change<Session> {
        if let Some(session) = self.session(date).filter(|session| session.is_resolved()) {
            return Change::Rejected(session.clone());
        }

        let done_exercise_ids = self.exercise_ids();
        let (session, _) = self.ensure_session(date);
        session.completed = true;
        session.skipped = false;
        session.done_exercise_ids = done_exercise_ids;
        Change::Applied(session.clone())
    }

    pub fn skip_day(&mut self, date: DateKey, reason: Option<String>) -> Change<Session> {
        if let Some(session) = self.session(date).filter(|session| session.is_resolved()) {
            return Change::Rejected(session.clone());
        }

        let (session, _) = self.ensure_session(date);
        session.skipped = true;
        session.skipped_reason = reason.unwrap_or_default();
        session.completed = false;
        session.done_exercise_ids.clear();
        Change::Applied(session.clone())
    }

    /// Replaces the exercise with the same id in place, or appends it.
    pub fn upsert_exercise(&mut self, mut record: Exercise) -> Change<Exercise> {
        record.name = record.name.trim().to_string();
        record.instructions = record.instructions.trim().to_string();
        record.video = record.video.trim().to_string();
        if record.name.is_empty() {
            return Change::Rejected(record);
        }

        match self
            .exercises
            .iter_mut()
            .find(|exercise| exercise.id == record.id)
        {
            Some(existing) => *existing = record.clone(),
            None => self.exercises.push(record.clone()),
        }
        Change::Applied(record)
    }

    /// Removes the exercise and scrubs its id from every session, then
    /// re-derives each session's completion against the smaller plan.
    pub fn delete_exercise(&mut self, id: &str) -> Option<Exercise> {
        let index = self.exercises.iter().position(|exercise| exercise.id == id)?;
        let removed = self.exercises.remove(index);

        let plan_size = self.exercises.len();
        for session in self.sessions.values_mut() {
            session.done_exercise_ids.retain(|done| done != id);
            session.completed = plan_size > 0 && session.done_exercise_ids.len() == plan_size;
        }
        Some(removed)
    }

    pub fn save_checkin(&mut self, input: CheckInInput) -> CheckIn {
        let entry = CheckIn {
            date: input.date,
            pain: input.pain,
            stiffness: input.stiffness,
            swelling: input.swelling,
            sleep: input.sleep.map(sanitize_hours).unwrap_or(0.0),
            notes: input.notes.trim().to_string(),
        };
        self.checkins.retain(|checkin| checkin.date != entry.date);
        self.checkins.push(entry.clone());
        self.checkins.sort_by(|a, b| a.date.cmp(&b.date));
        entry
    }

    pub fn clear_checkin(&mut self, date: DateKey) -> Option<CheckIn> {
        let index = self
            .checkins
            .iter()
            .position(|checkin| checkin.date == date)?;
        Some(self.checkins.remove(index))
    }

    pub fn find_checkin(&self, date: DateKey) -> Option<&CheckIn> {
        self.checkins.iter().find(|checkin| checkin.date == date)
    }

    pub fn update_settings(&mut self, changes: SettingsChanges) -> Settings {
        if let Some(name) = changes.name {
            self.settings.name = name;
        }
        if let Some(reminder) = changes.reminder {
            self.settings.reminder = reminder;
        }
        self.settings.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::testing::SequenceIds;
    use crate::model::{SessionStatus, Swelling};

    fn date(raw: &str) -> DateKey {
        raw.parse().expect("date")
    }

    fn seeded() -> Document {
        Document::seeded(&SequenceIds::default())
    }

    fn checkin(day: &str, pain: i32) -> CheckInInput {
        CheckInInput {
            date: date(day),
            pain,
            stiffness: 2,
            swelling: Swelling::Mild,
            sleep: None,
            notes: "  felt ok  ".to_string(),
        }
    }

    #[test]
    fn seeded_document_has_three_sample_exercises() {
        let doc = seeded();
        let names: Vec<_> = doc.exercises.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Heel slides", "Quad sets", "Glute bridge"]);
        assert_eq!(doc.exercise_ids(), ["ex-1", "ex-2", "ex-3"]);
        assert!(doc.sessions.is_empty());
        assert!(doc.checkins.is_empty());
        assert_eq!(doc.settings, Settings::default());
    }

    #[test]
    fn ensure_session_is_idempotent() {
        let mut doc = seeded();
        let day = date("2024-01-05");
        let (_, created) = doc.ensure_session(day);
        assert!(created);
        let (session, created) = doc.ensure_session(day);
        assert!(!created);
        assert_eq!(*session, Session::default());
        assert_eq!(doc.sessions.len(), 1);
    }

    #[test]
    fn ticking_every_exercise_completes_the_day() {
        let mut doc = seeded();
        let day = date("2024-01-05");
        for id in doc.exercise_ids() {
            doc.toggle_exercise(day, &id, true);
        }
        assert!(doc.session(day).expect("session").completed);

        let session = doc.toggle_exercise(day, "ex-2", false).into_inner();
        assert!(!session.completed);
        assert_eq!(session.done_exercise_ids, ["ex-1", "ex-3"]);
    }

    #[test]
    fn toggle_has_set_semantics() {
        let mut doc = seeded();
        let day = date("2024-01-05");
        doc.toggle_exercise(day, "ex-1", true);
        let session = doc.toggle_exercise(day, "ex-1", true).into_inner();
        assert_eq!(session.done_exercise_ids, ["ex-1"]);
        let session = doc.toggle_exercise(day, "ex-2", false).into_inner();
        assert_eq!(session.done_exercise_ids, ["ex-1"]);
        assert_eq!(session.status(), SessionStatus::InProgress);
    }

    #[test]
    fn toggle_unskips_the_day() {
        let mut doc = seeded();
        let day = date("2024-01-05");
        doc.skip_day(day, Some("tired".to_string()));
        let session = doc.toggle_exercise(day, "ex-1", true).into_inner();
        assert!(!session.skipped);
        assert!(session.skipped_reason.is_empty());
    }

    #[test]
    fn toggle_rejects_unknown_exercise() {
        let mut doc = seeded();
        let day = date("2024-01-05");
        let change = doc.toggle_exercise(day, "missing", true);
        assert!(!change.is_applied());
        assert!(doc.sessions.is_empty());
    }

    #[test]
    fn empty_plan_never_completes_by_coverage() {
        let mut doc = Document::default();
        let day = date("2024-01-05");
        doc.exercises.push(Exercise {
            id: "solo".to_string(),
            name: "Solo".to_string(),
            ..Default::default()
        });
        doc.toggle_exercise(day, "solo", true);
        doc.delete_exercise("solo");
        let session = doc.session(day).expect("session");
        assert!(!session.completed);
        assert!(session.done_exercise_ids.is_empty());
        assert!(!doc.covers_plan(&[]));
    }

    #[test]
    fn complete_day_marks_everything_done() {
        let mut doc = seeded();
        let day = date("2024-01-05");
        doc.toggle_exercise(day, "ex-2", true);
        let change = doc.complete_day(day);
        assert!(change.is_applied());
        let session = change.into_inner();
        assert!(session.completed);
        assert!(!session.skipped);
        assert_eq!(session.done_exercise_ids, ["ex-1", "ex-2", "ex-3"]);
    }

    #[test]
    fn resolved_days_reject_whole_day_actions() {
        let mut doc = seeded();
        let day = date("2024-01-05");
        doc.complete_day(day);
        assert!(!doc.skip_day(day, None).is_applied());
        assert!(!doc.complete_day(day).is_applied());
        assert!(doc.session(day).expect("session").completed);

        let other = date("2024-01-06");
        doc.skip_day(other, None);
        let change = doc.complete_day(other);
        assert!(!change.is_applied());
        assert!(change.into_inner().skipped);
    }

    #[test]
    fn skip_clears_progress() {
        let mut doc = seeded();
        let day = date("2024-01-05");
        doc.toggle_exercise(day, "ex-1", true);
        let session = doc.skip_day(day, Some("reason".to_string())).into_inner();
        assert_eq!(
            session,
            Session {
                completed: false,
                skipped: true,
                skipped_reason: "reason".to_string(),
                done_exercise_ids: Vec::new(),
            }
        );
        let blank = doc.skip_day(date("2024-01-06"), None).into_inner();
        assert_eq!(blank.skipped_reason, "");
    }

    #[test]
    fn upsert_replaces_in_place_and_appends_new() {
        let mut doc = seeded();
        let mut edited = doc.exercises[1].clone();
        edited.name = "  Quad sets (slow)  ".to_string();
        edited.sets = 4;
        assert!(doc.upsert_exercise(edited).is_applied());
        assert_eq!(doc.exercises[1].name, "Quad sets (slow)");
        assert_eq!(doc.exercises[1].sets, 4);

        let added = Exercise {
            id: "new".to_string(),
            name: "Calf raises".to_string(),
            ..Default::default()
        };
        doc.upsert_exercise(added);
        assert_eq!(doc.exercises.len(), 4);
        assert_eq!(doc.exercises[3].id, "new");
    }

    #[test]
    fn upsert_rejects_blank_name() {
        let mut doc = seeded();
        let before = doc.exercises.clone();
        let change = doc.upsert_exercise(Exercise {
            id: "x".to_string(),
            name: "   ".to_string(),
            ..Default::default()
        });
        assert!(!change.is_applied());
        assert_eq!(doc.exercises, before);

        let mut blanked = doc.exercises[0].clone();
        blanked.name = String::new();
        doc.upsert_exercise(blanked);
        assert_eq!(doc.exercises, before);
    }

    #[test]
    fn delete_scrubs_sessions_and_rederives_completion() {
        let mut doc = seeded();
        let full = date("2024-01-04");
        let partial = date("2024-01-05");
        let other = date("2024-01-06");
        doc.complete_day(full);
        doc.toggle_exercise(partial, "ex-1", true);
        doc.toggle_exercise(partial, "ex-2", true);
        doc.toggle_exercise(other, "ex-1", true);

        let removed = doc.delete_exercise("ex-3").expect("removed");
        assert_eq!(removed.name, "Glute bridge");

        for session in doc.sessions.values() {
            assert!(!session.is_done("ex-3"));
        }
        assert!(doc.session(full).expect("full").completed);
        // two of the remaining two exercises were already ticked
        assert!(doc.session(partial).expect("partial").completed);
        assert!(!doc.session(other).expect("other").completed);
        assert!(doc.delete_exercise("ex-3").is_none());
    }

    #[test]
    fn checkins_stay_unique_per_date() {
        let mut doc = seeded();
        doc.save_checkin(checkin("2024-01-05", 3));
        doc.save_checkin(checkin("2024-01-03", 5));
        doc.save_checkin(checkin("2024-01-05", 7));

        let matching: Vec<_> = doc
            .checkins
            .iter()
            .filter(|c| c.date == date("2024-01-05"))
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].pain, 7);
        assert_eq!(doc.checkins[0].date, date("2024-01-03"));
        assert_eq!(matching[0].notes, "felt ok");
        assert_eq!(matching[0].sleep, 0.0);
    }

    #[test]
    fn non_finite_sleep_is_stored_as_zero() {
        let mut doc = seeded();
        let mut input = checkin("2024-01-05", 3);
        input.sleep = Some(f64::NAN);
        assert_eq!(doc.save_checkin(input).sleep, 0.0);
        let mut input = checkin("2024-01-06", 3);
        input.sleep = Some(f64::NEG_INFINITY);
        assert_eq!(doc.save_checkin(input).sleep, 0.0);
        let raw = serde_json::to_string(&doc.checkins).expect("serialize");
        assert!(!raw.contains("null"));
    }

    #[test]
    fn checkin_values_are_not_clamped() {
        let mut doc = seeded();
        let saved = doc.save_checkin(checkin("2024-01-05", 14));
        assert_eq!(saved.pain, 14);
    }

    #[test]
    fn clear_checkin_removes_only_that_date() {
        let mut doc = seeded();
        doc.save_checkin(checkin("2024-01-05", 3));
        doc.save_checkin(checkin("2024-01-06", 4));
        assert!(doc.clear_checkin(date("2024-01-07")).is_none());
        let removed = doc.clear_checkin(date("2024-01-05")).expect("removed");
        assert_eq!(removed.pain, 3);
        assert!(doc.find_checkin(date("2024-01-05")).is_none());
        assert!(doc.find_checkin(date("2024-01-06")).is_some());
    }

    #[test]
    fn update_settings_changes_only_given_fields() {
        let mut doc = seeded();
        doc.update_settings(SettingsChanges {
            name: Some("Sam".to_string()),
            reminder: None,
        });
        let settings = doc.update_settings(SettingsChanges {
            name: None,
            reminder: Some(crate::model::Reminder::Evening),
        });
        assert_eq!(settings.name, "Sam");
        assert_eq!(settings.reminder.as_str(), "evening");
    }
}
