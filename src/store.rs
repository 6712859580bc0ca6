//! Whole-document persistence under a single key of the `kv_store` table.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::entities::kv;
use crate::error::AppError;
use crate::ids::IdGenerator;
use crate::model::Document;

pub const STORAGE_KEY: &str = "rehab_tracker_v1";

pub struct DocumentStore {
    db: DatabaseConnection,
}

impl DocumentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Reads the saved document. A missing blob seeds a fresh plan; an
    /// unreadable one is discarded and seeded too. Only storage failures
    /// surface as errors.
    pub async fn load(&self, ids: &dyn IdGenerator) -> Result<Document, AppError> {
        let (doc, _) = self.read(ids).await?;
        Ok(doc)
    }

    /// Same as [`load`](Self::load), but a seeded document is written back
    /// at once so its generated ids survive the next load.
    pub async fn load_or_seed(&self, ids: &dyn IdGenerator) -> Result<Document, AppError> {
        let (doc, seeded) = self.read(ids).await?;
        if seeded {
            self.save(&doc).await?;
        }
        Ok(doc)
    }

    async fn read(&self, ids: &dyn IdGenerator) -> Result<(Document, bool), AppError> {
        let Some(raw) = self.get_blob().await? else {
            info!(key = STORAGE_KEY, "no saved document, seeding sample plan");
            return Ok((Document::seeded(ids), true));
        };
        Ok(match decode(&raw) {
            Some(doc) => (doc, false),
            None => (Document::seeded(ids), true),
        })
    }

    pub async fn save(&self, doc: &Document) -> Result<(), AppError> {
        let raw = serde_json::to_string(doc)?;
        debug!(key = STORAGE_KEY, bytes = raw.len(), "persisting document");
        self.put_blob(raw).await
    }

    pub async fn reset(&self, ids: &dyn IdGenerator) -> Result<Document, AppError> {
        kv::Entity::delete_by_id(STORAGE_KEY.to_string())
            .exec(&self.db)
            .await?;
        info!(key = STORAGE_KEY, "document reset");
        let doc = Document::seeded(ids);
        self.save(&doc).await?;
        Ok(doc)
    }

    async fn get_blob(&self) -> Result<Option<String>, AppError> {
        let row = kv::Entity::find_by_id(STORAGE_KEY.to_string())
            .one(&self.db)
            .await?;
        Ok(row.map(|row| row.value))
    }

    async fn put_blob(&self, value: String) -> Result<(), AppError> {
        let active = kv::ActiveModel {
            key: Set(STORAGE_KEY.to_string()),
            value: Set(value),
            updated_at: Set(Utc::now()),
        };
        kv::Entity::insert(active)
            .on_conflict(
                OnConflict::column(kv::Column::Key)
                    .update_columns([kv::Column::Value, kv::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}

/// Back-fills each top-level field independently so older or hand-edited
/// documents stay usable. List and map fields are read record by record and
/// only the unreadable records are dropped. `None` when the blob is not a
/// JSON object.
fn decode(raw: &str) -> Option<Document> {
    let parsed = match serde_json::from_str::<Value>(raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(%err, "saved document is not valid json, starting over");
            return None;
        }
    };
    let Value::Object(mut fields) = parsed else {
        warn!("saved document is not an object, starting over");
        return None;
    };

    Some(Document {
        settings: backfill(&mut fields, "settings"),
        exercises: backfill_list(&mut fields, "exercises"),
        sessions: backfill_map(&mut fields, "sessions"),
        checkins: backfill_list(&mut fields, "checkins"),
    })
}

fn take_field(fields: &mut Map<String, Value>, name: &str) -> Option<Value> {
    match fields.remove(name) {
        None | Some(Value::Null) => {
            warn!(field = name, "saved document missing field, using default");
            None
        }
        Some(value) => Some(value),
    }
}

fn backfill<T: DeserializeOwned + Default>(fields: &mut Map<String, Value>, name: &str) -> T {
    let Some(value) = take_field(fields, name) else {
        return T::default();
    };
    serde_json::from_value(value).unwrap_or_else(|err| {
        warn!(field = name, %err, "saved document field malformed, using default");
        T::default()
    })
}

fn backfill_list<T: DeserializeOwned>(fields: &mut Map<String, Value>, name: &str) -> Vec<T> {
    let Some(value) = take_field(fields, name) else {
        return Vec::new();
    };
    let Value::Array(items) = value else {
        warn!(field = name, "saved document field is not a list, using default");
        return Vec::new();
    };
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(field = name, index, %err, "dropping unreadable record");
                None
            }
        })
        .collect()
}

fn backfill_map<K, V>(fields: &mut Map<String, Value>, name: &str) -> BTreeMap<K, V>
where
    K: FromStr + Ord,
    V: DeserializeOwned,
{
    let Some(value) = take_field(fields, name) else {
        return BTreeMap::new();
    };
    let Value::Object(entries) = value else {
        warn!(field = name, "saved document field is not a map, using default");
        return BTreeMap::new();
    };
    entries
        .into_iter()
        .filter_map(|(key, item)| {
            let Ok(parsed) = key.parse::<K>() else {
                warn!(field = name, %key, "dropping record with unreadable key");
                return None;
            };
            match serde_json::from_value(item) {
                Ok(record) => Some((parsed, record)),
                Err(err) => {
                    warn!(field = name, %key, %err, "dropping unreadable record");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::ids::testing::SequenceIds;
    use crate::model::{CheckInInput, DateKey, Reminder, Session, Swelling};
    use sea_orm::PaginatorTrait;
    use tempfile::TempDir;

    async fn setup_store() -> (TempDir, DocumentStore) {
        let dir = TempDir::new().expect("temp dir");
        let db_path = db::resolve_db_path(dir.path());
        db::ensure_parent_dir(&db_path).expect("ensure parent");
        let db = db::connect(&db_path).await.expect("connect db");
        db::ensure_schema(&db).await.expect("ensure schema");
        (dir, DocumentStore::new(db))
    }

    fn date(raw: &str) -> DateKey {
        raw.parse().expect("date")
    }

    fn sample_document() -> Document {
        let mut doc = Document::seeded(&SequenceIds::default());
        doc.settings.name = "Robin".to_string();
        doc.settings.reminder = Reminder::Morning;
        doc.toggle_exercise(date("2024-01-04"), "ex-1", true);
        doc.skip_day(date("2024-01-05"), Some("travel".to_string()));
        doc.save_checkin(CheckInInput {
            date: date("2024-01-05"),
            pain: 3,
            stiffness: 4,
            swelling: Swelling::Moderate,
            sleep: Some(6.5),
            notes: "long drive".to_string(),
        });
        doc
    }

    #[tokio::test]
    async fn missing_blob_seeds_default_plan() {
        let (_dir, store) = setup_store().await;
        let doc = store.load(&SequenceIds::default()).await.expect("load");
        assert_eq!(doc, Document::seeded(&SequenceIds::default()));
    }

    #[tokio::test]
    async fn load_or_seed_persists_the_seed() {
        let (_dir, store) = setup_store().await;
        let seeded = store
            .load_or_seed(&SequenceIds::default())
            .await
            .expect("load or seed");
        let other_ids = SequenceIds::default();
        other_ids.generate();
        let loaded = store.load(&other_ids).await.expect("load");
        assert_eq!(loaded, seeded);
    }

    #[tokio::test]
    async fn load_or_seed_replaces_corrupt_blob() {
        let (_dir, store) = setup_store().await;
        store.put_blob("42".to_string()).await.expect("write blob");
        let recovered = store
            .load_or_seed(&SequenceIds::default())
            .await
            .expect("load or seed");
        let raw = store.get_blob().await.expect("read").expect("blob");
        assert_eq!(decode(&raw), Some(recovered));
        assert!(raw.starts_with('{'));
    }

    #[tokio::test]
    async fn save_then_load_is_lossless() {
        let (_dir, store) = setup_store().await;
        let doc = sample_document();
        store.save(&doc).await.expect("save");
        let loaded = store.load(&SequenceIds::default()).await.expect("load");
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn save_overwrites_the_single_row() {
        let (_dir, store) = setup_store().await;
        let mut doc = sample_document();
        store.save(&doc).await.expect("first save");
        doc.settings.name = "Kai".to_string();
        store.save(&doc).await.expect("second save");

        let rows = kv::Entity::find().count(&store.db).await.expect("count");
        assert_eq!(rows, 1);
        let loaded = store.load(&SequenceIds::default()).await.expect("load");
        assert_eq!(loaded.settings.name, "Kai");
    }

    #[tokio::test]
    async fn corrupt_blob_recovers_to_seeded_default() {
        let (_dir, store) = setup_store().await;
        store
            .put_blob("{not json".to_string())
            .await
            .expect("write blob");
        let doc = store.load(&SequenceIds::default()).await.expect("load");
        assert_eq!(doc, Document::seeded(&SequenceIds::default()));
    }

    #[tokio::test]
    async fn reset_reseeds_and_persists() {
        let (_dir, store) = setup_store().await;
        store.save(&sample_document()).await.expect("save");
        let ids = SequenceIds::default();
        let fresh = store.reset(&ids).await.expect("reset");
        assert!(fresh.sessions.is_empty());
        assert_eq!(fresh.exercises.len(), 3);
        let loaded = store.load(&ids).await.expect("load");
        assert_eq!(loaded, fresh);
    }

    #[tokio::test]
    async fn non_finite_sleep_survives_a_reload() {
        let (_dir, store) = setup_store().await;
        let mut doc = sample_document();
        doc.save_checkin(CheckInInput {
            date: date("2024-01-06"),
            pain: 2,
            stiffness: 1,
            swelling: Swelling::None,
            sleep: Some(f64::NAN),
            notes: String::new(),
        });
        store.save(&doc).await.expect("save");
        let loaded = store.load(&SequenceIds::default()).await.expect("load");
        assert_eq!(loaded.checkins.len(), 2);
        assert_eq!(loaded, doc);
    }

    #[test]
    fn null_sleep_keeps_every_checkin() {
        let raw = r#"{"checkins":[
            {"date":"2024-01-05","pain":3,"sleep":null},
            {"date":"2024-01-06","pain":4,"sleep":7}
        ]}"#;
        let doc = decode(raw).expect("document");
        assert_eq!(doc.checkins.len(), 2);
        assert_eq!(doc.checkins[0].sleep, 0.0);
        assert_eq!(doc.checkins[1].sleep, 7.0);
    }

    #[test]
    fn bad_exercise_records_are_dropped_one_by_one() {
        let raw = r#"{"exercises":[
            {"id":"a","name":"Wall sit","sets":3,"reps":30},
            {"id":"b","name":"Step ups","sets":2.5,"reps":-1},
            {"id":"c","name":"Lunges","sets":"three"},
            7
        ]}"#;
        let doc = decode(raw).expect("document");
        let ids: Vec<_> = doc.exercises.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!((doc.exercises[1].sets, doc.exercises[1].reps), (2, 0));
    }

    #[test]
    fn bad_session_entries_are_dropped_one_by_one() {
        let raw = r#"{"sessions":{
            "2024-01-05":{"completed":true,"doneExerciseIds":["a"]},
            "2024-1-6":{"completed":true},
            "2024-01-07":{"completed":"yes"},
            "2024-01-08":{"skipped":true,"skippedReason":"rest"}
        }}"#;
        let doc = decode(raw).expect("document");
        let days: Vec<String> = doc.sessions.keys().map(ToString::to_string).collect();
        assert_eq!(days, ["2024-01-05", "2024-01-08"]);
        assert!(doc.sessions[&date("2024-01-08")].skipped);
    }

    #[test]
    fn bad_checkin_records_are_dropped_one_by_one() {
        let raw = r#"{"checkins":[
            {"date":"2024-01-05","pain":3},
            {"date":"yesterday","pain":9},
            {"pain":1}
        ]}"#;
        let doc = decode(raw).expect("document");
        assert_eq!(doc.checkins.len(), 1);
        assert_eq!(doc.checkins[0].pain, 3);
    }

    #[test]
    fn non_object_json_is_discarded() {
        assert!(decode("[1, 2, 3]").is_none());
        assert!(decode("").is_none());
    }

    #[test]
    fn missing_fields_are_backfilled() {
        let raw = r#"{"exercises":[{"id":"a","name":"Wall sit","sets":1,"reps":30}]}"#;
        let doc = decode(raw).expect("document");
        assert_eq!(doc.exercises.len(), 1);
        assert_eq!(doc.exercises[0].instructions, "");
        assert_eq!(doc.settings.reminder, Reminder::Off);
        assert!(doc.sessions.is_empty());
        assert!(doc.checkins.is_empty());
    }

    #[test]
    fn malformed_fields_become_empty() {
        let raw = r#"{
            "settings": null,
            "exercises": "oops",
            "sessions": {"2024-01-05": {"completed": true, "doneExerciseIds": ["a"]}},
            "checkins": {"date": "2024-01-05"},
            "extra": 1
        }"#;
        let doc = decode(raw).expect("document");
        assert!(doc.exercises.is_empty());
        assert!(doc.checkins.is_empty());
        let session = doc.sessions.get(&date("2024-01-05")).expect("session");
        assert_eq!(
            *session,
            Session {
                completed: true,
                done_exercise_ids: vec!["a".to_string()],
                ..Default::default()
            }
        );
    }
}
