use sea_orm::DatabaseConnection;
use tracing::debug;

use crate::document::{DEFAULT_REPS, DEFAULT_SETS};
use crate::error::AppError;
use crate::ids::IdGenerator;
use crate::metrics::{self, ProgressSummary};
use crate::model::{
    Change, CheckIn, CheckInInput, DateKey, Document, Exercise, Session, Settings,
    SettingsChanges,
};
use crate::store::DocumentStore;

/// Owns the loaded document and is its only mutation surface. Every applied
/// change is written back in full before the call returns.
pub struct App {
    store: DocumentStore,
    ids: Box<dyn IdGenerator>,
    doc: Document,
}

impl App {
    pub async fn open(db: DatabaseConnection, ids: Box<dyn IdGenerator>) -> Result<Self, AppError> {
        let store = DocumentStore::new(db);
        let doc = store.load_or_seed(ids.as_ref()).await?;
        Ok(Self { store, ids, doc })
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn settings(&self) -> &Settings {
        &self.doc.settings
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.doc.exercises
    }

    pub fn get_exercise(&self, id: &str) -> Result<&Exercise, AppError> {
        self.doc
            .find_exercise(id)
            .ok_or_else(|| AppError::NotFound(format!("exercise {id}")))
    }

    /// A blank record with a fresh id, ready to be filled in and upserted.
    pub fn draft_exercise(&self) -> Exercise {
        Exercise {
            id: self.ids.generate(),
            sets: DEFAULT_SETS,
            reps: DEFAULT_REPS,
            ..Default::default()
        }
    }

    pub async fn ensure_session(&mut self, date: DateKey) -> Result<Session, AppError> {
        let (session, created) = self.doc.ensure_session(date);
        let session = session.clone();
        if created {
            debug!(%date, "created session");
            self.persist().await?;
        }
        Ok(session)
    }

    pub async fn toggle_exercise(
        &mut self,
        date: DateKey,
        exercise_id: &str,
        is_done: bool,
    ) -> Result<Change<Session>, AppError> {
        let change = self.doc.toggle_exercise(date, exercise_id, is_done);
        self.persist_if_applied(change).await
    }

    pub async fn complete_day(&mut self, date: DateKey) -> Result<Change<Session>, AppError> {
        let change = self.doc.complete_day(date);
        self.persist_if_applied(change).await
    }

    pub async fn skip_day(
        &mut self,
        date: DateKey,
        reason: Option<String>,
    ) -> Result<Change<Session>, AppError> {
        let change = self.doc.skip_day(date, reason);
        self.persist_if_applied(change).await
    }

    pub async fn upsert_exercise(&mut self, record: Exercise) -> Result<Change<Exercise>, AppError> {
        let change = self.doc.upsert_exercise(record);
        self.persist_if_applied(change).await
    }

    pub async fn delete_exercise(&mut self, id: &str) -> Result<Option<Exercise>, AppError> {
        let removed = self.doc.delete_exercise(id);
        if removed.is_some() {
            self.persist().await?;
        }
        Ok(removed)
    }

    pub async fn save_checkin(&mut self, input: CheckInInput) -> Result<CheckIn, AppError> {
        let saved = self.doc.save_checkin(input);
        self.persist().await?;
        Ok(saved)
    }

    pub async fn clear_checkin(&mut self, date: DateKey) -> Result<Option<CheckIn>, AppError> {
        let removed = self.doc.clear_checkin(date);
        if removed.is_some() {
            self.persist().await?;
        }
        Ok(removed)
    }

    pub fn find_checkin(&self, date: DateKey) -> Option<&CheckIn> {
        self.doc.find_checkin(date)
    }

    pub async fn update_settings(&mut self, changes: SettingsChanges) -> Result<Settings, AppError> {
        let settings = self.doc.update_settings(changes);
        self.persist().await?;
        Ok(settings)
    }

    pub async fn reset(&mut self) -> Result<(), AppError> {
        self.doc = self.store.reset(self.ids.as_ref()).await?;
        Ok(())
    }

    pub fn progress(&self, today: DateKey, days: usize) -> ProgressSummary {
        metrics::summarize(&self.doc, today, days)
    }

    async fn persist_if_applied<T>(&self, change: Change<T>) -> Result<Change<T>, AppError> {
        if change.is_applied() {
            self.persist().await?;
        }
        Ok(change)
    }

    async fn persist(&self) -> Result<(), AppError> {
        self.store.save(&self.doc).await
    }
}
