use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar day, always rendered as fixed-width `YYYY-MM-DD`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn days_before(&self, days: u64) -> Option<Self> {
        self.0.checked_sub_days(Days::new(days)).map(Self)
    }
}

impl FromStr for DateKey {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let invalid =
            || AppError::InvalidInput(format!("invalid date '{value}', expected YYYY-MM-DD"));
        if value.len() != 10 {
            return Err(invalid());
        }
        NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(Self)
            .map_err(|_| invalid())
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Reminder {
    #[default]
    Off,
    Morning,
    Evening,
    Custom(String),
}

impl Reminder {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Off => "off",
            Self::Morning => "morning",
            Self::Evening => "evening",
            Self::Custom(value) => value,
        }
    }
}

impl From<String> for Reminder {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" | "off" => Self::Off,
            "morning" => Self::Morning,
            "evening" => Self::Evening,
            _ => Self::Custom(value),
        }
    }
}

impl From<Reminder> for String {
    fn from(value: Reminder) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub name: String,
    pub reminder: Reminder,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "lenient_count")]
    pub sets: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub reps: u32,
    pub instructions: String,
    pub video: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Session {
    pub completed: bool,
    pub skipped: bool,
    pub skipped_reason: String,
    pub done_exercise_ids: Vec<String>,
}

impl Session {
    pub fn status(&self) -> SessionStatus {
        if self.skipped {
            SessionStatus::Skipped
        } else if self.completed {
            SessionStatus::Done
        } else if !self.done_exercise_ids.is_empty() {
            SessionStatus::InProgress
        } else {
            SessionStatus::NotStarted
        }
    }

    pub fn is_done(&self, exercise_id: &str) -> bool {
        self.done_exercise_ids.iter().any(|id| id == exercise_id)
    }

    /// Completed or skipped days accept no further whole-day action.
    pub fn is_resolved(&self) -> bool {
        self.completed || self.skipped
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Done,
    Skipped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::InProgress => "In progress",
            Self::Done => "Done",
            Self::Skipped => "Skipped",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Swelling {
    #[default]
    None,
    Mild,
    Moderate,
    Severe,
}

impl Swelling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub date: DateKey,
    #[serde(default)]
    pub pain: i32,
    #[serde(default)]
    pub stiffness: i32,
    #[serde(default)]
    pub swelling: Swelling,
    #[serde(default, deserialize_with = "lenient_hours")]
    pub sleep: f64,
    #[serde(default)]
    pub notes: String,
}

/// Hours of sleep are finite and never negative; anything else reads as 0.
pub fn sanitize_hours(hours: f64) -> f64 {
    if hours.is_finite() && hours > 0.0 {
        hours
    } else {
        0.0
    }
}

/// Accepts any JSON number or `null`, truncating fractions and clamping
/// negatives to 0.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    if value.is_finite() && value > 0.0 {
        Ok(value.trunc().min(f64::from(u32::MAX)) as u32)
    } else {
        Ok(0)
    }
}

fn lenient_hours<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(sanitize_hours).unwrap_or(0.0))
}

/// The whole persisted unit. `Default` is the empty document; see
/// [`Document::seeded`] for the first-run plan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub settings: Settings,
    pub exercises: Vec<Exercise>,
    pub sessions: BTreeMap<DateKey, Session>,
    pub checkins: Vec<CheckIn>,
}

#[derive(Clone, Debug, Default)]
pub struct ExerciseChanges {
    pub name: Option<String>,
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub instructions: Option<String>,
    pub video: Option<String>,
}

impl ExerciseChanges {
    pub fn apply(self, exercise: &mut Exercise) {
        if let Some(name) = self.name {
            exercise.name = name;
        }
        if let Some(sets) = self.sets {
            exercise.sets = sets;
        }
        if let Some(reps) = self.reps {
            exercise.reps = reps;
        }
        if let Some(instructions) = self.instructions {
            exercise.instructions = instructions;
        }
        if let Some(video) = self.video {
            exercise.video = video;
        }
    }
}

#[derive(Clone, Debug)]
pub struct CheckInInput {
    pub date: DateKey,
    pub pain: i32,
    pub stiffness: i32,
    pub swelling: Swelling,
    pub sleep: Option<f64>,
    pub notes: String,
}

#[derive(Clone, Debug, Default)]
pub struct SettingsChanges {
    pub name: Option<String>,
    pub reminder: Option<Reminder>,
}

/// Outcome of a mutation. `Rejected` carries the unchanged entity and means
/// nothing was written.
#[derive(Clone, Debug, PartialEq)]
pub enum Change<T> {
    Applied(T),
    Rejected(T),
}

impl<T> Change<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Applied(value) | Self::Rejected(value) => value,
        }
    }
}
