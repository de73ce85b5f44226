use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

use crate::badges::AchievedBadge;
use crate::date_key::DateKey;
use crate::domain::{DayRecord, DayRecordMap};

pub const SCHEMA_VERSION: u32 = 1;

const DAYS_FILE: &str = "days.json";
const BADGES_FILE: &str = "badges.json";
const BREATHING_FILE: &str = "breathing.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse {file}: {source}")]
    JsonDecode {
        file: String,
        source: serde_json::Error,
    },
    #[error("failed to encode {file}: {source}")]
    JsonEncode {
        file: String,
        source: serde_json::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn load_all(&self) -> Result<DayRecordMap, StorageError>;
    async fn save_all(&self, days: &DayRecordMap) -> Result<(), StorageError>;
    async fn load_achieved_badges(&self) -> Result<Vec<AchievedBadge>, StorageError>;
    async fn save_achieved_badges(&self, badges: &[AchievedBadge]) -> Result<(), StorageError>;
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn get(&self) -> Result<u32, StorageError>;
    async fn increment(&self) -> Result<u32, StorageError>;
}

#[derive(Serialize)]
struct Envelope<'a, T: ?Sized> {
    version: u32,
    data: &'a T,
}

/// Files written before the envelope existed hold the bare payload.
#[derive(Deserialize)]
#[serde(untagged)]
enum Stored<T> {
    Versioned { version: u32, data: T },
    Legacy(T),
}

impl<T> Stored<T> {
    fn into_data(self, file: &str) -> T {
        match self {
            Stored::Versioned { version, data } => {
                if version > SCHEMA_VERSION {
                    tracing::warn!(file, version, "stored data is newer than this build understands");
                }
                data
            }
            Stored::Legacy(data) => data,
        }
    }
}

fn decode<T: DeserializeOwned>(file: &str, raw: &str) -> Result<T, StorageError> {
    let stored: Stored<T> = serde_json::from_str(raw).map_err(|source| StorageError::JsonDecode {
        file: file.to_string(),
        source,
    })?;
    Ok(stored.into_data(file))
}

fn encode<T: Serialize + ?Sized>(file: &str, data: &T) -> Result<String, StorageError> {
    let envelope = Envelope {
        version: SCHEMA_VERSION,
        data,
    };
    serde_json::to_string_pretty(&envelope).map_err(|source| StorageError::JsonEncode {
        file: file.to_string(),
        source,
    })
}

/// Decodes a stored day map entry by entry. Entries with a malformed date key
/// or an undecodable record are dropped rather than failing the whole load.
pub fn decode_days(file: &str, raw: &str) -> Result<DayRecordMap, StorageError> {
    let entries: BTreeMap<String, serde_json::Value> = decode(file, raw)?;
    let mut days = DayRecordMap::new();

    for (key, value) in entries {
        let Some(date) = DateKey::parse(&key) else {
            tracing::warn!(file, key = %key, "skipping day with invalid date key");
            continue;
        };
        match serde_json::from_value::<DayRecord>(value) {
            Ok(record) => {
                days.insert(date, record);
            }
            Err(err) => {
                tracing::warn!(file, %date, error = %err, "skipping undecodable day record");
            }
        }
    }

    Ok(days)
}

#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    async fn read(&self, file: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(file)).await {
            Ok(raw) if raw.trim().is_empty() => Ok(None),
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    async fn write(&self, file: &str, contents: String) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).await?;
        let target = self.path(file);
        let staging = self.path(&format!("{file}.tmp"));
        fs::write(&staging, contents).await?;
        fs::rename(&staging, &target).await?;
        Ok(())
    }
}

#[async_trait]
impl JournalStore for JsonDirStore {
    async fn load_all(&self) -> Result<DayRecordMap, StorageError> {
        match self.read(DAYS_FILE).await? {
            Some(raw) => decode_days(DAYS_FILE, &raw),
            None => Ok(DayRecordMap::new()),
        }
    }

    async fn save_all(&self, days: &DayRecordMap) -> Result<(), StorageError> {
        let contents = encode(DAYS_FILE, days)?;
        self.write(DAYS_FILE, contents).await
    }

    async fn load_achieved_badges(&self) -> Result<Vec<AchievedBadge>, StorageError> {
        match self.read(BADGES_FILE).await? {
            Some(raw) => decode(BADGES_FILE, &raw),
            None => Ok(Vec::new()),
        }
    }

    async fn save_achieved_badges(&self, badges: &[AchievedBadge]) -> Result<(), StorageError> {
        let contents = encode(BADGES_FILE, badges)?;
        self.write(BADGES_FILE, contents).await
    }
}

#[async_trait]
impl CounterStore for JsonDirStore {
    async fn get(&self) -> Result<u32, StorageError> {
        match self.read(BREATHING_FILE).await? {
            Some(raw) => decode(BREATHING_FILE, &raw),
            None => Ok(0),
        }
    }

    async fn increment(&self) -> Result<u32, StorageError> {
        let next = self.get().await?.saturating_add(1);
        let contents = encode(BREATHING_FILE, &next)?;
        self.write(BREATHING_FILE, contents).await?;
        Ok(next)
    }
}

/// In-process store. Loads and saves can be made to fail to exercise the
/// degraded paths of callers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    days: Mutex<DayRecordMap>,
    badges: Mutex<Vec<AchievedBadge>>,
    breathing: Mutex<u32>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_days(days: DayRecordMap) -> Self {
        Self {
            days: Mutex::new(days),
            ..Self::default()
        }
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn stored_days(&self) -> DayRecordMap {
        self.days.lock().await.clone()
    }

    pub async fn stored_badges(&self) -> Vec<AchievedBadge> {
        self.badges.lock().await.clone()
    }

    fn check_load(&self) -> Result<(), StorageError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("load rejected".to_string()));
        }
        Ok(())
    }

    fn check_save(&self) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("save rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl JournalStore for MemoryStore {
    async fn load_all(&self) -> Result<DayRecordMap, StorageError> {
        self.check_load()?;
        Ok(self.days.lock().await.clone())
    }

    async fn save_all(&self, days: &DayRecordMap) -> Result<(), StorageError> {
        self.check_save()?;
        *self.days.lock().await = days.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_achieved_badges(&self) -> Result<Vec<AchievedBadge>, StorageError> {
        self.check_load()?;
        Ok(self.badges.lock().await.clone())
    }

    async fn save_achieved_badges(&self, badges: &[AchievedBadge]) -> Result<(), StorageError> {
        self.check_save()?;
        *self.badges.lock().await = badges.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self) -> Result<u32, StorageError> {
        self.check_load()?;
        Ok(*self.breathing.lock().await)
    }

    async fn increment(&self) -> Result<u32, StorageError> {
        self.check_save()?;
        let mut count = self.breathing.lock().await;
        *count = count.saturating_add(1);
        Ok(*count)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{EventLog, TimelineEvent};
    use crate::reconstruct::rebuild_day;

    fn key(raw: &str) -> DateKey {
        DateKey::parse(raw).expect("valid key")
    }

    fn sample_days() -> DayRecordMap {
        let now = Utc.with_ymd_and_hms(2026, 8, 2, 9, 0, 0).unwrap();
        let events = EventLog::from_events(vec![
            TimelineEvent::wake("07:10"),
            TimelineEvent::mood("08:00", 4.0).with_memo("sunny"),
        ]);
        let date = key("2026-08-02");
        let mut days = DayRecordMap::new();
        days.insert(date, rebuild_day(date, &events, None, None, now));
        days
    }

    #[tokio::test]
    async fn round_trips_days_badges_and_counter() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = JsonDirStore::new(dir.path().join("journal"));

        assert!(store.load_all().await.expect("empty load").is_empty());
        assert_eq!(CounterStore::get(&store).await.expect("empty counter"), 0);

        let days = sample_days();
        store.save_all(&days).await.expect("save days");
        assert_eq!(store.load_all().await.expect("load days"), days);

        let badges = vec![AchievedBadge {
            badge_id: "first_entry".to_string(),
            achieved_at: Utc.with_ymd_and_hms(2026, 8, 2, 9, 0, 0).unwrap(),
        }];
        store.save_achieved_badges(&badges).await.expect("save badges");
        assert_eq!(store.load_achieved_badges().await.expect("load badges"), badges);

        assert_eq!(store.increment().await.expect("increment"), 1);
        assert_eq!(store.increment().await.expect("increment"), 2);
        assert_eq!(CounterStore::get(&store).await.expect("counter"), 2);
    }

    #[tokio::test]
    async fn writes_a_versioned_envelope() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = JsonDirStore::new(dir.path());
        store.save_all(&sample_days()).await.expect("save days");

        let raw = std::fs::read_to_string(dir.path().join(DAYS_FILE)).expect("read file");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["version"], SCHEMA_VERSION);
        assert_eq!(value["data"]["2026-08-02"]["sleep"]["wakeTime"], "07:10");
        assert!(!dir.path().join("days.json.tmp").exists());
    }

    #[test]
    fn reads_legacy_unversioned_maps_and_skips_bad_entries() {
        let raw = r#"{
            "2026-01-05": {
                "mood": {"value": 3, "time": "09:00"},
                "events": [{"id": "a", "time": "09:00", "type": "mood", "value": 0}],
                "createdAt": "2026-01-05T09:00:00Z",
                "updatedAt": "2026-01-05T09:00:00Z"
            },
            "2026-02-31": {"events": []},
            "2026-01-06": {"events": "not a list"}
        }"#;
        let days = decode_days(DAYS_FILE, raw).expect("legacy decode");
        assert_eq!(days.len(), 1);
        let record = &days[&key("2026-01-05")];
        assert_eq!(record.mood.as_ref().map(|mood| mood.value), Some(3.0));
        assert_eq!(record.events.len(), 1);
    }

    #[test]
    fn garbage_file_is_a_decode_error() {
        let err = decode_days(DAYS_FILE, "[1, 2, 3]").expect_err("not a map");
        assert!(matches!(err, StorageError::JsonDecode { .. }));
    }

    #[tokio::test]
    async fn memory_store_failure_injection() {
        let store = MemoryStore::new();
        store.set_fail_loads(true);
        assert!(store.load_all().await.is_err());
        store.set_fail_loads(false);

        store.set_fail_saves(true);
        assert!(store.save_all(&sample_days()).await.is_err());
        assert_eq!(store.save_count(), 0);
        store.set_fail_saves(false);

        store.save_all(&sample_days()).await.expect("save");
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.stored_days().await.len(), 1);
    }
}
