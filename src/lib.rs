//! Event-sourced mood journal: per-day event ledgers, the day records derived
//! from them, and the streak, period and badge statistics built on top.

pub mod badges;
pub mod config;
pub mod date_key;
pub mod domain;
pub mod journal;
pub mod mood;
pub mod paths;
pub mod reconstruct;
pub mod report;
pub mod stats;
pub mod storage;
pub mod streak;

pub use badges::{AchievedBadge, BadgeDefinition, BadgeProgress, BadgeStats, check_and_commit, progress_for};
pub use date_key::DateKey;
pub use domain::{DayRecord, DayRecordMap, EventKind, EventLog, TimelineEvent};
pub use journal::{Journal, JournalError};
pub use reconstruct::rebuild_day;
pub use stats::{Period, PeriodSummary, StatsRow, aggregate_period, build_stats_row};
pub use storage::{CounterStore, JournalStore, JsonDirStore, MemoryStore, StorageError};
pub use streak::current_streak;
