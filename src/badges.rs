use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::date_key::DateKey;
use crate::domain::{DayRecord, DayRecordMap, EventKind};
use crate::stats::count;
use crate::streak::{current_streak, has_any_record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    Streak,
    Milestone,
    Sleep,
    Mood,
    Medication,
    Journal,
    Activity,
    Mindfulness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BadgeDefinition {
    pub id: &'static str,
    pub category: BadgeCategory,
    pub rarity: Rarity,
    pub requirement: u32,
    pub description: &'static str,
}

const fn badge(
    id: &'static str,
    category: BadgeCategory,
    rarity: Rarity,
    requirement: u32,
    description: &'static str,
) -> BadgeDefinition {
    BadgeDefinition {
        id,
        category,
        rarity,
        requirement,
        description,
    }
}

pub const CATALOG: &[BadgeDefinition] = &[
    badge("first_entry", BadgeCategory::Milestone, Rarity::Common, 1, "Record your first day"),
    badge("days_30", BadgeCategory::Milestone, Rarity::Rare, 30, "Record 30 days in total"),
    badge("days_100", BadgeCategory::Milestone, Rarity::Epic, 100, "Record 100 days in total"),
    badge("days_365", BadgeCategory::Milestone, Rarity::Legendary, 365, "Record 365 days in total"),
    badge("streak_3", BadgeCategory::Streak, Rarity::Common, 3, "Record 3 days in a row"),
    badge("streak_7", BadgeCategory::Streak, Rarity::Common, 7, "Record 7 days in a row"),
    badge("streak_30", BadgeCategory::Streak, Rarity::Rare, 30, "Record 30 days in a row"),
    badge("streak_100", BadgeCategory::Streak, Rarity::Epic, 100, "Record 100 days in a row"),
    badge("sleep_7", BadgeCategory::Sleep, Rarity::Common, 7, "Log sleep on 7 days"),
    badge("sleep_30", BadgeCategory::Sleep, Rarity::Rare, 30, "Log sleep on 30 days"),
    badge("mood_10", BadgeCategory::Mood, Rarity::Common, 10, "Check in your mood on 10 days"),
    badge("mood_50", BadgeCategory::Mood, Rarity::Rare, 50, "Check in your mood on 50 days"),
    badge("meds_7", BadgeCategory::Medication, Rarity::Common, 7, "Log medication on 7 days"),
    badge("meds_30", BadgeCategory::Medication, Rarity::Rare, 30, "Log medication on 30 days"),
    badge("notes_10", BadgeCategory::Journal, Rarity::Common, 10, "Write 10 notes or symptoms"),
    badge("notes_100", BadgeCategory::Journal, Rarity::Epic, 100, "Write 100 notes or symptoms"),
    badge("activity_10", BadgeCategory::Activity, Rarity::Common, 10, "Log 10 activities"),
    badge("breath_1", BadgeCategory::Mindfulness, Rarity::Common, 1, "Finish a breathing exercise"),
    badge("breath_10", BadgeCategory::Mindfulness, Rarity::Rare, 10, "Finish 10 breathing exercises"),
    badge("breath_50", BadgeCategory::Mindfulness, Rarity::Epic, 50, "Finish 50 breathing exercises"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BadgeStats {
    pub current_streak: u32,
    pub recorded_days: u32,
    pub sleep_days: u32,
    pub mood_days: u32,
    pub medication_days: u32,
    pub journal_entries: u32,
    pub activity_count: u32,
    pub breathing_sessions: u32,
}

impl BadgeStats {
    /// `breathing_sessions` comes from the separate completion counter.
    pub fn from_days(days: &DayRecordMap, today: DateKey, breathing_sessions: u32) -> Self {
        let mut stats = BadgeStats {
            current_streak: current_streak(days, today),
            breathing_sessions,
            ..BadgeStats::default()
        };

        for record in days.values() {
            if has_any_record(record) {
                stats.recorded_days += 1;
            }
            if logged_sleep(record) {
                stats.sleep_days += 1;
            }
            if record.mood.is_some() {
                stats.mood_days += 1;
            }
            if !record.medications.is_empty() {
                stats.medication_days += 1;
            }
            stats.journal_entries = stats
                .journal_entries
                .saturating_add(count(record.notes.len() + record.symptoms.len()));
            stats.activity_count = stats.activity_count.saturating_add(count(
                record
                    .events
                    .iter()
                    .filter(|event| matches!(event.kind, EventKind::Activity { .. }))
                    .count(),
            ));
        }
        stats
    }
}

// A bedtime stitched in from the day before does not count as logging sleep.
fn logged_sleep(record: &DayRecord) -> bool {
    if record.events.is_empty() {
        return record.sleep.as_ref().is_some_and(|sleep| sleep.has_data());
    }
    record
        .events
        .iter()
        .any(|event| matches!(event.kind, EventKind::Wake | EventKind::Sleep))
}

fn current_value(id: &str, stats: &BadgeStats) -> u32 {
    match id {
        "first_entry" | "days_30" | "days_100" | "days_365" => stats.recorded_days,
        "streak_3" | "streak_7" | "streak_30" | "streak_100" => stats.current_streak,
        "sleep_7" | "sleep_30" => stats.sleep_days,
        "mood_10" | "mood_50" => stats.mood_days,
        "meds_7" | "meds_30" => stats.medication_days,
        "notes_10" | "notes_100" => stats.journal_entries,
        "activity_10" => stats.activity_count,
        "breath_1" | "breath_10" | "breath_50" => stats.breathing_sessions,
        _ => 0,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AchievedBadge {
    pub badge_id: String,
    pub achieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeProgress {
    pub definition: &'static BadgeDefinition,
    pub current_value: u32,
    pub achieved: bool,
    pub progress: f64,
}

fn progress_ratio(current_value: u32, requirement: u32) -> f64 {
    if requirement == 0 {
        return 1.0;
    }
    (f64::from(current_value) / f64::from(requirement)).min(1.0)
}

fn achieved_ids(achieved: &[AchievedBadge]) -> HashSet<&str> {
    achieved.iter().map(|badge| badge.badge_id.as_str()).collect()
}

pub fn progress_for(stats: &BadgeStats, achieved: &[AchievedBadge]) -> Vec<BadgeProgress> {
    let achieved = achieved_ids(achieved);
    CATALOG
        .iter()
        .map(|definition| {
            let current_value = current_value(definition.id, stats);
            BadgeProgress {
                definition,
                current_value,
                achieved: achieved.contains(definition.id),
                progress: progress_ratio(current_value, definition.requirement),
            }
        })
        .collect()
}

/// Appends an [`AchievedBadge`] to `achieved` for every badge whose
/// requirement is met and that is not already in the list, and returns the
/// new entries. A badge id is never added twice.
pub fn check_and_commit(
    stats: &BadgeStats,
    achieved: &mut Vec<AchievedBadge>,
    now: DateTime<Utc>,
) -> Vec<AchievedBadge> {
    let newly: Vec<AchievedBadge> = progress_for(stats, achieved)
        .into_iter()
        .filter(|progress| !progress.achieved)
        .filter(|progress| progress.current_value >= progress.definition.requirement)
        .map(|progress| AchievedBadge {
            badge_id: progress.definition.id.to_string(),
            achieved_at: now,
        })
        .collect();

    for badge in &newly {
        tracing::debug!(badge = %badge.badge_id, "badge achieved");
    }
    achieved.extend(newly.iter().cloned());
    newly
}
