use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::date_key::DateKey;
use crate::domain::{DayRecord, DayRecordMap, EventKind, clock_minutes, minutes_between};
use crate::mood;

const TREND_MIN_DAYS: usize = 3;
const TREND_THRESHOLD: f64 = 0.3;
const STABILITY_MIN_POINTS: usize = 2;
const MOOD_STABLE_RANGE: f64 = 1.0;
const MOOD_SLIGHT_RANGE: f64 = 2.0;
const SLEEP_STABLE_HOURS: f64 = 1.5;
const SLEEP_SLIGHT_HOURS: f64 = 3.0;
// Deltas and ranges are compared at this many steps per unit, so 3.3 - 3.0
// and 1.3 - 1.0 both land exactly on a 0.3 threshold.
const COMPARE_STEPS: f64 = 1e9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Week,
    Month,
    Quarter,
}

impl Period {
    pub fn days(self) -> u32 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Quarter => 90,
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "week" | "7" => Ok(Period::Week),
            "month" | "30" => Ok(Period::Month),
            "quarter" | "90" => Ok(Period::Quarter),
            other => Err(format!("unknown period: {other} (expected week, month or quarter)")),
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Period::Week => "week",
            Period::Month => "month",
            Period::Quarter => "quarter",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Stable,
    Unknown,
}

impl Trend {
    pub fn label(self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
            Trend::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    Stable,
    SlightlyUnstable,
    Unstable,
    Unknown,
}

impl Stability {
    pub fn label(self) -> &'static str {
        match self {
            Stability::Stable => "stable",
            Stability::SlightlyUnstable => "slightly unstable",
            Stability::Unstable => "unstable",
            Stability::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRow {
    pub date: DateKey,
    pub mood_average: Option<f64>,
    pub sleep_minutes: Option<u32>,
    pub medication_count: u32,
    pub note_count: u32,
    pub symptom_count: u32,
    pub flagged_symptom_count: u32,
    pub activity_minutes: u32,
    pub event_count: u32,
}

impl StatsRow {
    pub fn empty(date: DateKey) -> Self {
        Self {
            date,
            mood_average: None,
            sleep_minutes: None,
            medication_count: 0,
            note_count: 0,
            symptom_count: 0,
            flagged_symptom_count: 0,
            activity_minutes: 0,
            event_count: 0,
        }
    }

    pub fn has_signal(&self) -> bool {
        self.mood_average.is_some()
            || self.sleep_minutes.is_some()
            || self.medication_count > 0
            || self.note_count > 0
            || self.symptom_count > 0
            || self.activity_minutes > 0
            || self.event_count > 0
    }
}

pub(crate) fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Mean of every mood event logged that day. Records kept from before
/// events were stored fall back to the mood snapshot.
fn day_mood_average(record: &DayRecord) -> Option<f64> {
    let values: Vec<f64> = record
        .events
        .iter()
        .filter_map(|event| match &event.kind {
            EventKind::Mood { value: Some(raw) } => mood::normalize(*raw),
            EventKind::Mood { value: None } => mood::infer_from_label(&event.label),
            _ => None,
        })
        .collect();

    mean(&values).or_else(|| record.mood.as_ref().map(|snapshot| snapshot.value))
}

fn day_activity_minutes(record: &DayRecord) -> u32 {
    record
        .events
        .iter()
        .filter(|event| matches!(event.kind, EventKind::Activity { .. }))
        .filter_map(|event| {
            let start = clock_minutes(&event.time)?;
            let end = clock_minutes(event.end_time.as_deref()?)?;
            Some(minutes_between(start, end))
        })
        .sum()
}

pub fn build_stats_row(date: DateKey, record: &DayRecord) -> StatsRow {
    StatsRow {
        date,
        mood_average: day_mood_average(record),
        sleep_minutes: record.sleep.as_ref().and_then(|sleep| sleep.duration_minutes()),
        medication_count: count(record.medications.len()),
        note_count: count(record.notes.len()),
        symptom_count: count(record.symptoms.len()),
        flagged_symptom_count: count(
            record
                .symptoms
                .iter()
                .filter(|symptom| symptom.flag_for_review)
                .count(),
        ),
        activity_minutes: day_activity_minutes(record),
        event_count: count(record.events.len()),
    }
}

/// Rows for the `period` days ending on `today`. Days without a record
/// produce empty rows so the window stays contiguous.
pub fn window_rows(days: &DayRecordMap, today: DateKey, period: Period) -> Vec<StatsRow> {
    DateKey::window_ending(today, period.days())
        .into_iter()
        .map(|date| match days.get(&date) {
            Some(record) => build_stats_row(date, record),
            None => StatsRow::empty(date),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub total_days: u32,
    pub recorded_days: u32,
    pub recording_rate: f64,
    pub mood_average: Option<f64>,
    pub mood_trend: Trend,
    pub mood_stability: Stability,
    pub sleep_average_hours: Option<f64>,
    pub sleep_consistency: Stability,
    pub medication_days: u32,
    pub medication_adherence: f64,
    pub note_total: u32,
    pub symptom_total: u32,
    pub flagged_symptoms: u32,
    pub activity_minutes: u32,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn ratio(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole)
    }
}

fn settle(value: f64) -> f64 {
    (value * COMPARE_STEPS).round() / COMPARE_STEPS
}

fn range(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    settle(max - min)
}

/// Compares the mean of the first half of `moods` with the mean of the rest.
/// With an odd count the middle value belongs to the second half.
pub fn mood_trend(moods: &[f64]) -> Trend {
    if moods.len() < TREND_MIN_DAYS {
        return Trend::Unknown;
    }
    let (first, second) = moods.split_at(moods.len() / 2);
    let (Some(first), Some(second)) = (mean(first), mean(second)) else {
        return Trend::Unknown;
    };

    let delta = settle(second - first);
    if delta > TREND_THRESHOLD {
        Trend::Up
    } else if delta < -TREND_THRESHOLD {
        Trend::Down
    } else {
        Trend::Stable
    }
}

fn stability(values: &[f64], stable_max: f64, slight_max: f64) -> Stability {
    if values.len() < STABILITY_MIN_POINTS {
        return Stability::Unknown;
    }
    let spread = range(values);
    if spread <= stable_max {
        Stability::Stable
    } else if spread <= slight_max {
        Stability::SlightlyUnstable
    } else {
        Stability::Unstable
    }
}

pub fn mood_stability(moods: &[f64]) -> Stability {
    stability(moods, MOOD_STABLE_RANGE, MOOD_SLIGHT_RANGE)
}

pub fn sleep_consistency(sleep_hours: &[f64]) -> Stability {
    stability(sleep_hours, SLEEP_STABLE_HOURS, SLEEP_SLIGHT_HOURS)
}

pub fn aggregate_period(rows: &[StatsRow]) -> PeriodSummary {
    let total_days = count(rows.len());
    let recorded_days = count(rows.iter().filter(|row| row.has_signal()).count());
    let medication_days = count(rows.iter().filter(|row| row.medication_count > 0).count());

    let moods: Vec<f64> = rows.iter().filter_map(|row| row.mood_average).collect();
    let sleep_hours: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.sleep_minutes)
        .map(|minutes| f64::from(minutes) / 60.0)
        .collect();

    PeriodSummary {
        total_days,
        recorded_days,
        recording_rate: ratio(recorded_days, total_days),
        mood_average: mean(&moods),
        mood_trend: mood_trend(&moods),
        mood_stability: mood_stability(&moods),
        sleep_average_hours: mean(&sleep_hours),
        sleep_consistency: sleep_consistency(&sleep_hours),
        medication_days,
        medication_adherence: ratio(medication_days, total_days),
        note_total: rows.iter().map(|row| row.note_count).sum(),
        symptom_total: rows.iter().map(|row| row.symptom_count).sum(),
        flagged_symptoms: rows.iter().map(|row| row.flagged_symptom_count).sum(),
        activity_minutes: rows.iter().map(|row| row.activity_minutes).sum(),
    }
}
