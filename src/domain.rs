use std::collections::BTreeMap;

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

use crate::date_key::DateKey;

const ID_LEN: usize = 8;
const CLOCK_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicationSlot {
    Morning,
    Noon,
    Evening,
    Bedtime,
    #[default]
    #[serde(other)]
    AsNeeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Exercise,
    Walk,
    Social,
    Work,
    Hobby,
    Chores,
    Rest,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EventKind {
    Wake,
    Sleep,
    Medication {
        #[serde(default)]
        medication_id: String,
        #[serde(default)]
        slot: MedicationSlot,
        #[serde(default)]
        dosage: String,
    },
    Mood {
        #[serde(default)]
        value: Option<f64>,
    },
    Symptom {
        #[serde(default)]
        flag_for_review: bool,
    },
    Activity {
        #[serde(default)]
        category: ActivityCategory,
    },
    Note,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Wake => "wake",
            EventKind::Sleep => "sleep",
            EventKind::Medication { .. } => "medication",
            EventKind::Mood { .. } => "mood",
            EventKind::Symptom { .. } => "symptom",
            EventKind::Activity { .. } => "activity",
            EventKind::Note => "note",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default)]
    pub planned: bool,
}

impl TimelineEvent {
    pub fn new(time: impl Into<String>, kind: EventKind, label: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            time: time.into(),
            end_time: None,
            kind,
            label: label.into(),
            memo: None,
            planned: false,
        }
    }

    pub fn wake(time: impl Into<String>) -> Self {
        Self::new(time, EventKind::Wake, "Woke up")
    }

    pub fn sleep(time: impl Into<String>) -> Self {
        Self::new(time, EventKind::Sleep, "Went to bed")
    }

    pub fn mood(time: impl Into<String>, value: f64) -> Self {
        Self::new(time, EventKind::Mood { value: Some(value) }, "Mood")
    }

    pub fn medication(
        time: impl Into<String>,
        medication_id: impl Into<String>,
        slot: MedicationSlot,
        dosage: impl Into<String>,
    ) -> Self {
        let medication_id = medication_id.into();
        let label = medication_id.clone();
        Self::new(
            time,
            EventKind::Medication {
                medication_id,
                slot,
                dosage: dosage.into(),
            },
            label,
        )
    }

    pub fn symptom(time: impl Into<String>, label: impl Into<String>, flag_for_review: bool) -> Self {
        Self::new(time, EventKind::Symptom { flag_for_review }, label)
    }

    pub fn activity(
        time: impl Into<String>,
        end_time: Option<String>,
        category: ActivityCategory,
        label: impl Into<String>,
    ) -> Self {
        let mut event = Self::new(time, EventKind::Activity { category }, label);
        event.end_time = end_time;
        event
    }

    pub fn note(time: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(time, EventKind::Note, text)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn clock_minutes(&self) -> Option<u32> {
        clock_minutes(&self.time)
    }
}

/// A single day's events in insertion order. This list is the source of
/// truth for the day; the [`DayRecord`] summary is always rebuilt from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<TimelineEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<TimelineEvent>) -> Self {
        let mut log = Self::new();
        for event in events {
            log.append(event);
        }
        log
    }

    /// Appends `event`, assigning a fresh id if its id is empty or already
    /// taken in this day. Returns the id the event was stored under.
    pub fn append(&mut self, mut event: TimelineEvent) -> String {
        while event.id.is_empty() || self.find(&event.id).is_some() {
            event.id = generate_id();
        }
        let id = event.id.clone();
        self.events.push(event);
        id
    }

    /// Replaces every field of the event stored under `id` except the id.
    pub fn replace(&mut self, id: &str, mut event: TimelineEvent) -> bool {
        match self.events.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => {
                event.id = existing.id.clone();
                *existing = event;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<TimelineEvent> {
        let index = self.events.iter().position(|event| event.id == id)?;
        Some(self.events.remove(index))
    }

    pub fn find(&self, id: &str) -> Option<&TimelineEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimelineEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events ordered by wall-clock time. Equal times keep insertion order and
    /// unparsable times sort last. The returned iterator can be cloned to walk
    /// the same order again.
    pub fn sorted_by_time(&self) -> std::vec::IntoIter<&TimelineEvent> {
        let mut ordered: Vec<&TimelineEvent> = self.events.iter().collect();
        ordered.sort_by_key(|event| event.clock_minutes().unwrap_or(u32::MAX));
        ordered.into_iter()
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a TimelineEvent;
    type IntoIter = std::slice::Iter<'a, TimelineEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodSnapshot {
    pub value: f64,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepSnapshot {
    #[serde(default)]
    pub bed_time: Option<String>,
    #[serde(default)]
    pub wake_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl SleepSnapshot {
    pub fn has_data(&self) -> bool {
        self.bed_time.is_some() || self.wake_time.is_some()
    }

    /// Minutes asleep, wrapping past midnight when waking is earlier on the
    /// clock than going to bed.
    pub fn duration_minutes(&self) -> Option<u32> {
        let bed = clock_minutes(self.bed_time.as_deref()?)?;
        let wake = clock_minutes(self.wake_time.as_deref()?)?;
        Some(minutes_between(bed, wake))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationLog {
    pub event_id: String,
    pub time: String,
    pub medication_id: String,
    pub slot: MedicationSlot,
    pub dosage: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomLog {
    pub event_id: String,
    pub time: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default)]
    pub flag_for_review: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteLog {
    pub event_id: String,
    pub time: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    #[serde(default)]
    pub mood: Option<MoodSnapshot>,
    #[serde(default)]
    pub sleep: Option<SleepSnapshot>,
    #[serde(default)]
    pub medications: Vec<MedicationLog>,
    #[serde(default)]
    pub symptoms: Vec<SymptomLog>,
    #[serde(default)]
    pub notes: Vec<NoteLog>,
    #[serde(default)]
    pub events: EventLog,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

pub type DayRecordMap = BTreeMap<DateKey, DayRecord>;

pub fn clock_minutes(raw: &str) -> Option<u32> {
    let time = NaiveTime::parse_from_str(raw.trim(), CLOCK_FORMAT).ok()?;
    Some(time.hour() * 60 + time.minute())
}

/// Forward distance on a 24h clock from `start` to `end`, in minutes.
pub fn minutes_between(start: u32, end: u32) -> u32 {
    const DAY_MINUTES: u32 = 24 * 60;
    (end + DAY_MINUTES - start % DAY_MINUTES) % DAY_MINUTES
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}
