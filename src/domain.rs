use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDate};

use crate::storage::{self, StorageError};

/// Category list shipped with the tool, used whenever no readable
/// category store exists on disk.
pub const DEFAULT_CATEGORIES: [&str; 11] = [
    "ACP",
    "Application Packaging",
    "Azure Kubernetes Platform",
    "Connected Hosting",
    "Identity Access Management",
    "iDP",
    "Local support",
    "M365 beheer",
    "Networking",
    "PAM",
    "SASE as a Service",
];

/// Accumulated seconds per category for one calendar day. Iteration order
/// (and thus the tie-break order in summaries) is lexicographic.
pub type DayRecord = BTreeMap<String, f64>;

/// All day records, keyed by local calendar date.
pub type Ledger = BTreeMap<NaiveDate, DayRecord>;

pub fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|name| name.to_string()).collect()
}

#[derive(Debug)]
pub enum CategoryError {
    /// The name is empty after trimming, or collides with an existing entry
    /// (for `rename`: with the entry's own current value).
    DuplicateOrEmpty,
    /// The index does not refer to an existing category.
    InvalidTarget,
    /// The change was applied in memory but the store could not be written.
    Save(StorageError),
}

impl Display for CategoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryError::DuplicateOrEmpty => {
                write!(f, "category name is empty or already in use")
            }
            CategoryError::InvalidTarget => write!(f, "no category at that position"),
            CategoryError::Save(err) => {
                write!(f, "category list changed but could not be saved: {err}")
            }
        }
    }
}

impl std::error::Error for CategoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CategoryError::Save(err) => Some(err),
            _ => None,
        }
    }
}

/// Ordered list of category names backed by a JSON file. Every successful
/// mutation is written through to the backing store immediately.
pub struct CategoryStore {
    path: PathBuf,
    categories: Vec<String>,
}

impl CategoryStore {
    /// Loads the store from `path`. A missing file silently yields the
    /// built-in list; an unreadable one yields the built-in list with a
    /// diagnostic. The bad file is left untouched either way.
    pub fn load(path: PathBuf) -> Self {
        let categories = match storage::load_categories(&path) {
            Ok(list) => list,
            Err(err) => {
                eprintln!("warning: using built-in categories: {err}");
                default_categories()
            }
        };
        Self { path, categories }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn add(&mut self, name: &str) -> Result<(), CategoryError> {
        let name = name.trim();
        if name.is_empty() || self.categories.iter().any(|existing| existing == name) {
            return Err(CategoryError::DuplicateOrEmpty);
        }

        self.categories.push(name.to_string());
        self.persist()
    }

    /// Replaces the entry at `index` in place, keeping its position. The new
    /// name is only checked against the entry's current value, not against
    /// the other entries; renaming onto an existing name is allowed (see
    /// `rename_may_duplicate_another_entry` in the tests).
    pub fn rename(&mut self, index: usize, new_name: &str) -> Result<(), CategoryError> {
        let Some(slot) = self.categories.get_mut(index) else {
            return Err(CategoryError::InvalidTarget);
        };

        let new_name = new_name.trim();
        if new_name.is_empty() || new_name == slot.as_str() {
            return Err(CategoryError::DuplicateOrEmpty);
        }

        *slot = new_name.to_string();
        self.persist()
    }

    pub fn delete(&mut self, index: usize) -> Result<(), CategoryError> {
        if index >= self.categories.len() {
            return Err(CategoryError::InvalidTarget);
        }

        self.categories.remove(index);
        self.persist()
    }

    fn persist(&self) -> Result<(), CategoryError> {
        storage::save_categories(&self.path, &self.categories).map_err(CategoryError::Save)
    }
}

/// The category currently accumulating time. Never serialized; a process
/// restart always comes back idle.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub category: String,
    pub started_at: DateTime<Local>,
}

#[derive(Debug)]
pub struct StoppedInterval {
    pub category: String,
    pub seconds: f64,
}

/// Outcome of a `stop` (explicit or implicit via `start`).
#[derive(Debug)]
pub struct StopReport {
    /// `None` when nothing was running.
    pub stopped: Option<StoppedInterval>,
    /// Set when the ledger snapshot could not be written. The recorded time
    /// is still present in memory.
    pub save_error: Option<StorageError>,
}

impl StopReport {
    pub fn nothing_running(&self) -> bool {
        self.stopped.is_none()
    }
}

/// Accumulates wall-clock time per category per day and owns the single
/// active-session slot. At most one category runs at a time: `start` always
/// closes the previous interval first, so no wall-time is double-counted or
/// dropped when switching.
///
/// Every operation takes the current instant as a parameter so the state
/// machine is deterministic under test.
pub struct TimeTracker {
    path: PathBuf,
    ledger: Ledger,
    active: Option<ActiveSession>,
}

impl TimeTracker {
    /// Loads the ledger from `path`. A missing file silently yields an empty
    /// ledger; an unreadable one yields an empty ledger with a diagnostic.
    pub fn load(path: PathBuf) -> Self {
        let ledger = match storage::load_ledger(&path) {
            Ok(ledger) => ledger,
            Err(err) => {
                eprintln!("warning: starting with an empty ledger: {err}");
                Ledger::new()
            }
        };
        Self {
            path,
            ledger,
            active: None,
        }
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    /// Live elapsed seconds of the running session, `None` when idle.
    /// Query only; safe to poll at any frequency.
    pub fn elapsed(&self, now: DateTime<Local>) -> Option<f64> {
        self.active
            .as_ref()
            .map(|session| seconds_between(session.started_at, now))
    }

    pub fn record_for(&self, day: NaiveDate) -> Option<&DayRecord> {
        self.ledger.get(&day)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Today's record, created and seeded with a zero entry for every known
    /// category the first time the day is touched. Seeding happens in memory
    /// only; the ledger is written on the next `stop`.
    pub fn today_record(&mut self, known: &[String], now: DateTime<Local>) -> &DayRecord {
        self.day_record_mut(known, now)
    }

    /// Starts tracking `category`, closing any running interval first.
    /// Unknown categories are accepted; tracking is not limited to the
    /// category store. Never fails; the returned report describes the
    /// implicitly stopped interval, if any.
    pub fn start(&mut self, category: &str, known: &[String], now: DateTime<Local>) -> StopReport {
        let report = self.stop(known, now);

        let record = self.day_record_mut(known, now);
        record.entry(category.to_string()).or_insert(0.0);
        self.active = Some(ActiveSession {
            category: category.to_string(),
            started_at: now,
        });

        report
    }

    /// Closes the running interval, accumulates it into the day record of
    /// the stop instant, and writes the full ledger snapshot. The tracker
    /// goes idle even when the write fails.
    pub fn stop(&mut self, known: &[String], now: DateTime<Local>) -> StopReport {
        let Some(session) = self.active.take() else {
            return StopReport {
                stopped: None,
                save_error: None,
            };
        };

        let seconds = seconds_between(session.started_at, now);
        let record = self.day_record_mut(known, now);
        *record.entry(session.category.clone()).or_insert(0.0) += seconds;

        let save_error = storage::save_ledger(&self.path, &self.ledger).err();
        StopReport {
            stopped: Some(StoppedInterval {
                category: session.category,
                seconds,
            }),
            save_error,
        }
    }

    /// Discards everything: stops any running session (its interval is wiped
    /// along with the rest), clears the ledger, and deletes the backing file.
    /// Memory is cleared even when the delete fails.
    pub fn reset_all(
        &mut self,
        known: &[String],
        now: DateTime<Local>,
    ) -> Result<(), StorageError> {
        let _ = self.stop(known, now);
        self.ledger.clear();
        storage::delete_ledger(&self.path)
    }

    fn day_record_mut(&mut self, known: &[String], now: DateTime<Local>) -> &mut DayRecord {
        self.ledger.entry(now.date_naive()).or_insert_with(|| {
            known
                .iter()
                .map(|category| (category.clone(), 0.0))
                .collect()
        })
    }
}

/// Summary rows for one day: `(category, HH:MM:SS)` for every entry with
/// accumulated time, plus the raw grand total in seconds. Known categories
/// come first in list order; the rest follow in the record's own order.
pub fn summarize(record: &DayRecord, category_order: &[String]) -> (Vec<(String, String)>, f64) {
    let mut rows: Vec<(&String, f64)> = record
        .iter()
        .filter(|(_, seconds)| **seconds > 0.0)
        .map(|(category, seconds)| (category, *seconds))
        .collect();

    // stable sort: entries outside category_order keep the record's order
    rows.sort_by_key(|(category, _)| {
        category_order
            .iter()
            .position(|known| known == *category)
            .unwrap_or(usize::MAX)
    });

    let total = rows.iter().map(|(_, seconds)| *seconds).sum();
    let rows = rows
        .into_iter()
        .map(|(category, seconds)| (category.clone(), format_seconds(seconds)))
        .collect();

    (rows, total)
}

/// Truncating `HH:MM:SS`. Hours are zero-padded to at least two digits but
/// never capped.
pub fn format_seconds(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0).floor() as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

fn seconds_between(start: DateTime<Local>, end: DateTime<Local>) -> f64 {
    let elapsed = end.signed_duration_since(start);
    let seconds = elapsed
        .num_microseconds()
        .map_or_else(|| elapsed.num_seconds() as f64, |us| us as f64 / 1_000_000.0);
    seconds.max(0.0)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use chrono::{DateTime, Duration, Local, TimeZone};

    use super::{
        CategoryError, CategoryStore, DayRecord, TimeTracker, default_categories, format_seconds,
        summarize,
    };

    fn instant(hour: u32, min: u32, sec: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, hour, min, sec).unwrap()
    }

    fn temp_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }

    fn temp_tracker(name: &str) -> TimeTracker {
        let path = temp_file(name);
        let _ = fs::remove_file(&path);
        TimeTracker::load(path)
    }

    fn temp_store(name: &str) -> CategoryStore {
        let path = temp_file(name);
        let _ = fs::remove_file(&path);
        CategoryStore::load(path)
    }

    fn seconds_for(record: &DayRecord, category: &str) -> f64 {
        *record.get(category).expect("category should be recorded")
    }

    #[test]
    fn switching_attributes_time_to_each_category_exactly() {
        let mut tracker = temp_tracker("timereg_domain_switch.json");
        let known: Vec<String> = Vec::new();

        let t0 = instant(9, 0, 0);
        let report = tracker.start("Networking", &known, t0);
        assert!(report.nothing_running());

        // switching stops the previous category at the same instant
        let t1 = instant(9, 1, 30);
        let report = tracker.start("PAM", &known, t1);
        let stopped = report.stopped.expect("Networking should have stopped");
        assert_eq!(stopped.category, "Networking");
        assert_eq!(stopped.seconds, 90.0);

        let t2 = instant(9, 2, 30);
        let report = tracker.stop(&known, t2);
        let stopped = report.stopped.expect("PAM should have stopped");
        assert_eq!(stopped.category, "PAM");
        assert_eq!(stopped.seconds, 60.0);

        let record = tracker.record_for(t2.date_naive()).expect("day record");
        assert_eq!(seconds_for(record, "Networking"), 90.0);
        assert_eq!(seconds_for(record, "PAM"), 60.0);
        let _ = fs::remove_file(temp_file("timereg_domain_switch.json"));
    }

    #[test]
    fn second_stop_is_a_no_op() {
        let mut tracker = temp_tracker("timereg_domain_stop_twice.json");
        let known: Vec<String> = Vec::new();

        tracker.start("ACP", &known, instant(10, 0, 0));
        let first = tracker.stop(&known, instant(10, 0, 30));
        assert!(!first.nothing_running());

        let snapshot = tracker
            .record_for(instant(10, 0, 30).date_naive())
            .expect("day record")
            .clone();

        let second = tracker.stop(&known, instant(10, 5, 0));
        assert!(second.nothing_running());
        let record = tracker
            .record_for(instant(10, 5, 0).date_naive())
            .expect("day record");
        assert_eq!(record, &snapshot);
        let _ = fs::remove_file(temp_file("timereg_domain_stop_twice.json"));
    }

    #[test]
    fn fractional_seconds_are_kept_internally_and_truncated_in_display() {
        let mut tracker = temp_tracker("timereg_domain_fraction.json");
        let known: Vec<String> = Vec::new();

        let t0 = instant(14, 0, 0);
        tracker.start("Networking", &known, t0);
        let report = tracker.stop(&known, t0 + Duration::milliseconds(125_700));
        let stopped = report.stopped.expect("interval");
        assert!((stopped.seconds - 125.7).abs() < 1e-9);

        let record = tracker.record_for(t0.date_naive()).expect("day record");
        assert!((seconds_for(record, "Networking") - 125.7).abs() < 1e-9);
        assert_eq!(format_seconds(125.7), "00:02:05");
        let _ = fs::remove_file(temp_file("timereg_domain_fraction.json"));
    }

    #[test]
    fn today_record_is_seeded_once_with_known_categories() {
        let mut tracker = temp_tracker("timereg_domain_seed.json");
        let now = instant(8, 0, 0);

        let record = tracker.today_record(&["ACP".to_string()], now);
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("ACP"), Some(&0.0));

        // a category added to the store later does not reseed the day
        let record = tracker.today_record(&["ACP".to_string(), "PAM".to_string()], now);
        assert_eq!(record.len(), 1);
        assert!(!record.contains_key("PAM"));
    }

    #[test]
    fn tracking_accepts_categories_outside_the_store() {
        let mut tracker = temp_tracker("timereg_domain_unknown.json");
        let known = vec!["ACP".to_string()];

        let t0 = instant(11, 0, 0);
        tracker.start("Side project", &known, t0);
        tracker.stop(&known, t0 + Duration::seconds(10));

        let record = tracker.record_for(t0.date_naive()).expect("day record");
        assert_eq!(seconds_for(record, "Side project"), 10.0);
        // the seeded store category is still present with zero time
        assert_eq!(record.get("ACP"), Some(&0.0));
        let _ = fs::remove_file(temp_file("timereg_domain_unknown.json"));
    }

    #[test]
    fn elapsed_reports_only_while_running() {
        let mut tracker = temp_tracker("timereg_domain_elapsed.json");
        let known: Vec<String> = Vec::new();
        let t0 = instant(9, 0, 0);

        assert!(tracker.elapsed(t0).is_none());
        tracker.start("iDP", &known, t0);
        assert_eq!(tracker.elapsed(t0 + Duration::seconds(42)), Some(42.0));
        tracker.stop(&known, t0 + Duration::seconds(60));
        assert!(tracker.elapsed(t0 + Duration::seconds(90)).is_none());
        let _ = fs::remove_file(temp_file("timereg_domain_elapsed.json"));
    }

    #[test]
    fn stop_goes_idle_even_when_the_write_fails() {
        // a directory as ledger path makes the snapshot write fail
        let path = temp_file("timereg_domain_write_fail.json");
        let _ = fs::remove_dir(&path);
        fs::create_dir_all(&path).expect("create blocking directory");
        let known: Vec<String> = Vec::new();

        let t0 = instant(9, 0, 0);
        let mut tracker = TimeTracker::load(path.clone());
        tracker.start("Networking", &known, t0);
        let report = tracker.stop(&known, t0 + Duration::seconds(10));

        assert!(report.save_error.is_some());
        let stopped = report.stopped.expect("interval still closes");
        assert_eq!(stopped.seconds, 10.0);
        // the tracker is idle and the recorded time stays in memory
        assert!(tracker.active().is_none());
        let record = tracker.record_for(t0.date_naive()).expect("day record");
        assert_eq!(seconds_for(record, "Networking"), 10.0);
        let _ = fs::remove_dir(path);
    }

    #[test]
    fn reset_while_running_discards_the_final_interval() {
        let path = temp_file("timereg_domain_reset_running.json");
        let _ = fs::remove_file(&path);
        let known: Vec<String> = Vec::new();

        let t0 = instant(9, 0, 0);
        let mut tracker = TimeTracker::load(path.clone());
        tracker.start("PAM", &known, t0);
        tracker
            .reset_all(&known, t0 + Duration::seconds(30))
            .expect("reset should succeed");

        assert!(tracker.active().is_none());
        assert!(tracker.ledger().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn duplicate_or_empty_names_are_rejected() {
        let mut store = temp_store("timereg_domain_add.json");
        let initial_len = store.categories().len();

        store.add("Documentation").expect("add should succeed");
        assert!(matches!(
            store.add("Documentation"),
            Err(CategoryError::DuplicateOrEmpty)
        ));
        assert!(matches!(
            store.add("   "),
            Err(CategoryError::DuplicateOrEmpty)
        ));
        assert_eq!(store.categories().len(), initial_len + 1);
        let _ = fs::remove_file(temp_file("timereg_domain_add.json"));
    }

    #[test]
    fn rename_validates_target_and_own_value() {
        let mut store = temp_store("timereg_domain_rename.json");

        assert!(matches!(
            store.rename(999, "Anything"),
            Err(CategoryError::InvalidTarget)
        ));

        let current = store.categories()[0].clone();
        assert!(matches!(
            store.rename(0, &current),
            Err(CategoryError::DuplicateOrEmpty)
        ));
        assert!(matches!(
            store.rename(0, "  "),
            Err(CategoryError::DuplicateOrEmpty)
        ));

        store.rename(0, "Renamed").expect("rename should succeed");
        assert_eq!(store.categories()[0], "Renamed");
        assert_eq!(store.categories().len(), default_categories().len());
        let _ = fs::remove_file(temp_file("timereg_domain_rename.json"));
    }

    #[test]
    fn rename_may_duplicate_another_entry() {
        // rename deliberately checks only the entry's own previous value,
        // so it can produce two identical names
        let mut store = temp_store("timereg_domain_rename_dup.json");
        let first = store.categories()[0].clone();

        store.rename(1, &first).expect("permissive rename");
        assert_eq!(store.categories()[0], store.categories()[1]);
        let _ = fs::remove_file(temp_file("timereg_domain_rename_dup.json"));
    }

    #[test]
    fn delete_checks_bounds_and_removes_in_place() {
        let mut store = temp_store("timereg_domain_delete.json");
        let initial = store.categories().to_vec();

        assert!(matches!(
            store.delete(initial.len()),
            Err(CategoryError::InvalidTarget)
        ));

        store.delete(0).expect("delete should succeed");
        assert_eq!(store.categories(), &initial[1..]);
        let _ = fs::remove_file(temp_file("timereg_domain_delete.json"));
    }

    #[test]
    fn summary_orders_known_categories_first() {
        let order = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let mut record = DayRecord::new();
        record.insert("C".to_string(), 10.0);
        record.insert("A".to_string(), 5.0);
        record.insert("Z".to_string(), 3.0);

        let (rows, total) = summarize(&record, &order);
        assert_eq!(
            rows,
            vec![
                ("A".to_string(), "00:00:05".to_string()),
                ("C".to_string(), "00:00:10".to_string()),
                ("Z".to_string(), "00:00:03".to_string()),
            ]
        );
        assert_eq!(total, 18.0);
    }

    #[test]
    fn summary_skips_zero_entries() {
        let order = vec!["A".to_string(), "B".to_string()];
        let mut record = DayRecord::new();
        record.insert("A".to_string(), 0.0);
        record.insert("B".to_string(), 1.5);

        let (rows, total) = summarize(&record, &order);
        assert_eq!(rows, vec![("B".to_string(), "00:00:01".to_string())]);
        assert_eq!(total, 1.5);
    }

    #[test]
    fn format_seconds_pads_and_never_caps_hours() {
        assert_eq!(format_seconds(0.0), "00:00:00");
        assert_eq!(format_seconds(59.999), "00:00:59");
        assert_eq!(format_seconds(3_661.2), "01:01:01");
        assert_eq!(format_seconds(360_000.0), "100:00:00");
        assert_eq!(format_seconds(-5.0), "00:00:00");
    }
}
