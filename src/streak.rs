use crate::date_key::DateKey;
use crate::domain::{DayRecord, DayRecordMap};

pub fn has_any_record(record: &DayRecord) -> bool {
    record.sleep.as_ref().is_some_and(|sleep| sleep.has_data())
        || !record.medications.is_empty()
        || record.mood.is_some()
        || !record.notes.is_empty()
        || !record.symptoms.is_empty()
        || !record.events.is_empty()
}

fn day_recorded(days: &DayRecordMap, day: DateKey) -> bool {
    days.get(&day).is_some_and(has_any_record)
}

/// Consecutive recorded days walking back from `today`.
///
/// An empty `today` does not break the streak because the day is still open;
/// counting then starts from yesterday.
pub fn current_streak(days: &DayRecordMap, today: DateKey) -> u32 {
    let mut cursor = today;
    if !day_recorded(days, cursor) {
        cursor = today.previous();
        if !day_recorded(days, cursor) {
            return 0;
        }
    }

    let mut streak = 0;
    while day_recorded(days, cursor) {
        streak += 1;
        let previous = cursor.previous();
        if previous == cursor {
            break;
        }
        cursor = previous;
    }
    streak
}

pub fn longest_streak(days: &DayRecordMap) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut last: Option<DateKey> = None;

    for (day, record) in days {
        if !has_any_record(record) {
            continue;
        }
        run = match last {
            Some(previous) if previous.days_until(*day) == 1 => run + 1,
            _ => 1,
        };
        best = best.max(run);
        last = Some(*day);
    }
    best
}
