//! In-memory journal state plus the write-behind to a [`JournalStore`].
//!
//! Every ledger mutation rebuilds the affected day synchronously and then
//! schedules a save in the background. Reads always see the in-memory state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::badges::{self, AchievedBadge, BadgeProgress, BadgeStats};
use crate::date_key::DateKey;
use crate::domain::{DayRecord, DayRecordMap, EventLog, TimelineEvent};
use crate::reconstruct::rebuild_day;
use crate::stats::{Period, PeriodSummary, aggregate_period, window_rows};
use crate::storage::{CounterStore, JournalStore, StorageError};
use crate::streak::current_streak;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("event {id} not found on {date}")]
    EventNotFound { date: DateKey, id: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Identifies one load attempt. Only the most recently issued ticket may
/// commit its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Default)]
pub struct LoadGuard {
    generation: Arc<AtomicU64>,
}

impl LoadGuard {
    pub fn issue(&self) -> LoadTicket {
        LoadTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Orders background saves so an older snapshot never lands after a newer one.
#[derive(Debug, Default)]
struct WriteSequencer {
    issued: AtomicU64,
    written: Mutex<u64>,
}

impl WriteSequencer {
    fn next(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedState {
    pub days: DayRecordMap,
    pub achieved: Vec<AchievedBadge>,
}

/// Reads everything the journal needs. A failed read is logged and treated
/// as empty.
pub async fn load_state<S: JournalStore + ?Sized>(store: &S) -> LoadedState {
    let days = match store.load_all().await {
        Ok(days) => days,
        Err(err) => {
            tracing::warn!(error = %err, "failed to load day records, starting empty");
            DayRecordMap::new()
        }
    };
    let achieved = match store.load_achieved_badges().await {
        Ok(achieved) => achieved,
        Err(err) => {
            tracing::warn!(error = %err, "failed to load achieved badges, starting empty");
            Vec::new()
        }
    };
    LoadedState { days, achieved }
}

pub struct Journal<S> {
    store: Arc<S>,
    days: DayRecordMap,
    achieved: Vec<AchievedBadge>,
    loads: LoadGuard,
    day_writes: Arc<WriteSequencer>,
    badge_writes: Arc<WriteSequencer>,
    pending: Vec<JoinHandle<()>>,
}

impl<S> Journal<S>
where
    S: JournalStore + CounterStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            days: DayRecordMap::new(),
            achieved: Vec::new(),
            loads: LoadGuard::default(),
            day_writes: Arc::new(WriteSequencer::default()),
            badge_writes: Arc::new(WriteSequencer::default()),
            pending: Vec::new(),
        }
    }

    pub async fn open(store: Arc<S>) -> Self {
        let mut journal = Self::new(store);
        let ticket = journal.begin_load();
        let loaded = load_state(journal.store.as_ref()).await;
        journal.commit_load(ticket, loaded);
        journal
    }

    pub fn begin_load(&self) -> LoadTicket {
        self.loads.issue()
    }

    /// Applies `loaded` if `ticket` is still the latest load. Returns whether
    /// the state was replaced.
    pub fn commit_load(&mut self, ticket: LoadTicket, loaded: LoadedState) -> bool {
        if !self.loads.is_current(ticket) {
            tracing::debug!("discarding stale load");
            return false;
        }
        self.days = loaded.days;
        self.achieved = loaded.achieved;
        true
    }

    pub fn invalidate_loads(&self) {
        self.loads.invalidate();
    }

    pub fn days(&self) -> &DayRecordMap {
        &self.days
    }

    pub fn day(&self, date: DateKey) -> Option<&DayRecord> {
        self.days.get(&date)
    }

    pub fn achieved(&self) -> &[AchievedBadge] {
        &self.achieved
    }

    pub fn add_event(&mut self, date: DateKey, event: TimelineEvent) -> String {
        let mut log = self.ledger(date);
        let id = log.append(event);
        self.apply(date, log);
        id
    }

    pub fn replace_event(
        &mut self,
        date: DateKey,
        id: &str,
        event: TimelineEvent,
    ) -> Result<(), JournalError> {
        let mut log = self.ledger(date);
        if !log.replace(id, event) {
            return Err(JournalError::EventNotFound {
                date,
                id: id.to_string(),
            });
        }
        self.apply(date, log);
        Ok(())
    }

    pub fn remove_event(&mut self, date: DateKey, id: &str) -> Result<TimelineEvent, JournalError> {
        let mut log = self.ledger(date);
        let removed = log.remove(id).ok_or_else(|| JournalError::EventNotFound {
            date,
            id: id.to_string(),
        })?;
        self.apply(date, log);
        Ok(removed)
    }

    fn ledger(&self, date: DateKey) -> EventLog {
        self.days
            .get(&date)
            .map(|record| record.events.clone())
            .unwrap_or_default()
    }

    fn apply(&mut self, date: DateKey, log: EventLog) {
        // Local edits are newer than anything a pending load could bring back.
        self.loads.invalidate();

        let record = rebuild_day(
            date,
            &log,
            self.days.get(&date.previous()),
            self.days.get(&date),
            Utc::now(),
        );
        self.days.insert(date, record);
        self.persist_days();
    }

    pub fn current_streak(&self, today: DateKey) -> u32 {
        current_streak(&self.days, today)
    }

    pub fn period_summary(&self, today: DateKey, period: Period) -> PeriodSummary {
        aggregate_period(&window_rows(&self.days, today, period))
    }

    pub async fn badge_stats(&self, today: DateKey) -> BadgeStats {
        let breathing = match CounterStore::get(self.store.as_ref()).await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read breathing counter");
                0
            }
        };
        BadgeStats::from_days(&self.days, today, breathing)
    }

    pub fn badge_progress(&self, stats: &BadgeStats) -> Vec<BadgeProgress> {
        badges::progress_for(stats, &self.achieved)
    }

    pub fn commit_badges(&mut self, stats: &BadgeStats, now: DateTime<Utc>) -> Vec<AchievedBadge> {
        let newly = badges::check_and_commit(stats, &mut self.achieved, now);
        if !newly.is_empty() {
            self.persist_badges();
        }
        newly
    }

    pub async fn record_breathing(&self) -> Result<u32, JournalError> {
        Ok(self.store.increment().await?)
    }

    pub async fn flush(&mut self) {
        for handle in self.pending.drain(..) {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "background save task failed");
            }
        }
    }

    fn persist_days(&mut self) {
        let snapshot = self.days.clone();
        let store = Arc::clone(&self.store);
        let sequencer = Arc::clone(&self.day_writes);
        let seq = sequencer.next();
        self.spawn_write(async move {
            let mut written = sequencer.written.lock().await;
            if *written > seq {
                return;
            }
            match store.save_all(&snapshot).await {
                Ok(()) => *written = seq,
                Err(err) => tracing::warn!(error = %err, "failed to save day records"),
            }
        });
    }

    fn persist_badges(&mut self) {
        let snapshot = self.achieved.clone();
        let store = Arc::clone(&self.store);
        let sequencer = Arc::clone(&self.badge_writes);
        let seq = sequencer.next();
        self.spawn_write(async move {
            let mut written = sequencer.written.lock().await;
            if *written > seq {
                return;
            }
            match store.save_achieved_badges(&snapshot).await {
                Ok(()) => *written = seq,
                Err(err) => tracing::warn!(error = %err, "failed to save achieved badges"),
            }
        });
    }

    fn spawn_write<F>(&mut self, write: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        match Handle::try_current() {
            Ok(handle) => {
                self.pending.retain(|task| !task.is_finished());
                self.pending.push(handle.spawn(write));
            }
            Err(_) => tracing::warn!("no async runtime, skipping background save"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn key(raw: &str) -> DateKey {
        DateKey::parse(raw).expect("valid key")
    }

    #[tokio::test]
    async fn mutations_rebuild_and_persist() {
        let store = Arc::new(MemoryStore::new());
        let mut journal = Journal::open(Arc::clone(&store)).await;
        let date = key("2026-09-01");

        let id = journal.add_event(date, TimelineEvent::mood("09:00", 2.0));
        assert_eq!(journal.day(date).and_then(|day| day.mood.as_ref()).map(|m| m.value), Some(2.0));

        journal
            .replace_event(date, &id, TimelineEvent::mood("09:30", 0.0))
            .expect("replace");
        assert_eq!(journal.day(date).and_then(|day| day.mood.as_ref()).map(|m| m.value), Some(3.0));

        journal.flush().await;
        let stored = store.stored_days().await;
        assert_eq!(stored.get(&date), journal.day(date));

        journal.remove_event(date, &id).expect("remove");
        assert!(journal.day(date).and_then(|day| day.mood.as_ref()).is_none());
        journal.flush().await;
        assert!(store.stored_days().await[&date].events.is_empty());
    }

    #[tokio::test]
    async fn unknown_event_ids_are_reported() {
        let mut journal = Journal::new(Arc::new(MemoryStore::new()));
        let err = journal
            .remove_event(key("2026-09-01"), "nope")
            .expect_err("missing id");
        assert!(matches!(err, JournalError::EventNotFound { .. }));
        assert!(journal.days().is_empty());
    }

    #[tokio::test]
    async fn sleep_is_stitched_from_the_stored_previous_day() {
        let mut journal = Journal::new(Arc::new(MemoryStore::new()));
        journal.add_event(key("2026-09-01"), TimelineEvent::sleep("23:40"));
        journal.add_event(key("2026-09-02"), TimelineEvent::wake("06:50"));
        let sleep = journal
            .day(key("2026-09-02"))
            .and_then(|day| day.sleep.clone())
            .expect("sleep");
        assert_eq!(sleep.bed_time.as_deref(), Some("23:40"));
        assert_eq!(sleep.wake_time.as_deref(), Some("06:50"));
    }

    #[tokio::test]
    async fn each_night_pairs_with_its_own_bedtime() {
        let mut journal = Journal::new(Arc::new(MemoryStore::new()));
        journal.add_event(key("2026-09-01"), TimelineEvent::sleep("23:00"));
        journal.add_event(key("2026-09-02"), TimelineEvent::wake("07:00"));
        journal.add_event(key("2026-09-02"), TimelineEvent::sleep("21:30"));
        journal.add_event(key("2026-09-03"), TimelineEvent::wake("06:30"));

        let sleep = journal
            .day(key("2026-09-03"))
            .and_then(|day| day.sleep.clone())
            .expect("sleep");
        assert_eq!(sleep.bed_time.as_deref(), Some("21:30"));
        assert_eq!(sleep.duration_minutes(), Some(540));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn back_to_back_saves_leave_the_latest_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let mut journal = Journal::new(Arc::clone(&store));
        let date = key("2026-09-06");
        for minute in 0..40 {
            journal.add_event(date, TimelineEvent::note(format!("10:{minute:02}"), "tick"));
        }
        journal.add_event(key("2026-09-07"), TimelineEvent::wake("07:15"));
        journal.flush().await;

        assert_eq!(store.stored_days().await, *journal.days());
        assert_eq!(store.stored_days().await[&date].notes.len(), 40);
    }

    #[tokio::test]
    async fn failed_load_starts_empty_and_failed_save_keeps_memory() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_loads(true);
        store.set_fail_saves(true);
        let mut journal = Journal::open(Arc::clone(&store)).await;
        assert!(journal.days().is_empty());

        journal.add_event(key("2026-09-03"), TimelineEvent::note("12:00", "still here"));
        journal.flush().await;
        assert_eq!(store.save_count(), 0);
        assert_eq!(journal.day(key("2026-09-03")).map(|day| day.notes.len()), Some(1));
    }

    #[tokio::test]
    async fn stale_loads_are_discarded() {
        let mut journal = Journal::new(Arc::new(MemoryStore::new()));
        let stale = journal.begin_load();
        let fresh = journal.begin_load();

        let mut days = DayRecordMap::new();
        days.insert(key("2026-09-04"), DayRecord::default());
        let loaded = LoadedState {
            days,
            achieved: Vec::new(),
        };
        assert!(!journal.commit_load(stale, loaded.clone()));
        assert!(journal.days().is_empty());

        journal.invalidate_loads();
        assert!(!journal.commit_load(fresh, loaded.clone()));

        let ticket = journal.begin_load();
        journal.add_event(key("2026-09-05"), TimelineEvent::wake("07:00"));
        assert!(!journal.commit_load(ticket, loaded.clone()));
        assert!(journal.day(key("2026-09-05")).is_some());

        let ticket = journal.begin_load();
        assert!(journal.commit_load(ticket, loaded));
        assert!(journal.day(key("2026-09-04")).is_some());
    }

    #[tokio::test]
    async fn badges_commit_once_and_persist() {
        let store = Arc::new(MemoryStore::new());
        let mut journal = Journal::new(Arc::clone(&store));
        let today = key("2026-09-10");
        journal.add_event(today, TimelineEvent::note("08:00", "start"));
        journal.record_breathing().await.expect("count");

        let stats = journal.badge_stats(today).await;
        assert_eq!(stats.breathing_sessions, 1);

        let first = journal.commit_badges(&stats, Utc::now());
        let second = journal.commit_badges(&stats, Utc::now());
        let ids: Vec<&str> = first.iter().map(|badge| badge.badge_id.as_str()).collect();
        assert_eq!(ids, ["first_entry", "breath_1"]);
        assert!(second.is_empty());

        journal.flush().await;
        assert_eq!(store.stored_badges().await.len(), 2);
        assert!(
            journal
                .badge_progress(&stats)
                .iter()
                .filter(|progress| progress.achieved)
                .count()
                == 2
        );
    }
}
