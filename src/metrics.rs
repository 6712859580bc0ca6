//! Read-only views over a [`Document`] for a trailing window of days.

use crate::model::{CheckIn, DateKey, Document};

pub const WINDOW_DAYS: usize = 14;
pub const RECENT_CHECKINS: usize = 7;
/// Longest window the progress view accepts, about ten years.
pub const MAX_WINDOW_DAYS: u64 = 3650;

/// The `days` calendar dates ending at `today` inclusive, oldest first.
pub fn rolling_window(today: DateKey, days: usize) -> Vec<DateKey> {
    (0..days as u64)
        .rev()
        .filter_map(|offset| today.days_before(offset))
        .collect()
}

fn is_completed(doc: &Document, date: &DateKey) -> bool {
    doc.sessions
        .get(date)
        .is_some_and(|session| session.completed)
}

pub fn completed_count(doc: &Document, window: &[DateKey]) -> usize {
    window
        .iter()
        .filter(|date| is_completed(doc, date))
        .count()
}

/// Completed share of the window as a whole percent, halves rounded up.
/// An empty window is 0%.
pub fn adherence(doc: &Document, window: &[DateKey]) -> u32 {
    if window.is_empty() {
        return 0;
    }
    let completed = completed_count(doc, window);
    let len = window.len();
    ((200 * completed + len) / (2 * len)) as u32
}

/// Consecutive completed days counted back from the newest date in the window.
pub fn current_streak(doc: &Document, window: &[DateKey]) -> usize {
    window
        .iter()
        .rev()
        .take_while(|date| is_completed(doc, date))
        .count()
}

pub fn latest_checkin(doc: &Document) -> Option<&CheckIn> {
    doc.checkins.iter().max_by_key(|checkin| checkin.date)
}

/// Pain score per window day; `None` where no check-in exists.
pub fn pain_series(doc: &Document, window: &[DateKey]) -> Vec<Option<i32>> {
    window
        .iter()
        .map(|date| doc.find_checkin(*date).map(|checkin| checkin.pain))
        .collect()
}

pub fn recent_checkins(doc: &Document, limit: usize) -> Vec<&CheckIn> {
    let mut recent: Vec<&CheckIn> = doc.checkins.iter().collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent.truncate(limit);
    recent
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressSummary {
    pub window: Vec<DateKey>,
    pub adherence: u32,
    pub completed: usize,
    pub streak: usize,
    pub latest: Option<CheckIn>,
    pub pain: Vec<Option<i32>>,
    pub recent: Vec<CheckIn>,
}

pub fn summarize(doc: &Document, today: DateKey, days: usize) -> ProgressSummary {
    let window = rolling_window(today, days);
    ProgressSummary {
        adherence: adherence(doc, &window),
        completed: completed_count(doc, &window),
        streak: current_streak(doc, &window),
        latest: latest_checkin(doc).cloned(),
        pain: pain_series(doc, &window),
        recent: recent_checkins(doc, RECENT_CHECKINS)
            .into_iter()
            .cloned()
            .collect(),
        window,
    }
}
