//! Rebuilds a [`DayRecord`] from the day's event list.
//!
//! Each field has its own reducer. Reducers read the events in list order, so
//! "the last mood" means the last one appended, not the latest on the clock.

use chrono::{DateTime, Utc};

use crate::date_key::DateKey;
use crate::domain::{
    DayRecord, EventKind, EventLog, MedicationLog, MoodSnapshot, NoteLog, SleepSnapshot,
    SymptomLog, TimelineEvent,
};
use crate::mood;

/// Derives the record for `date` from `events`.
///
/// `previous_day` is the already persisted record for the day before and is
/// only read for sleep stitching. `existing` is the record currently stored
/// for `date`, which supplies `created_at` when present.
pub fn rebuild_day(
    date: DateKey,
    events: &EventLog,
    previous_day: Option<&DayRecord>,
    existing: Option<&DayRecord>,
    now: DateTime<Utc>,
) -> DayRecord {
    let record = DayRecord {
        mood: reduce_mood(events),
        sleep: reduce_sleep(events, previous_day),
        medications: reduce_medications(events),
        symptoms: reduce_symptoms(events),
        notes: reduce_notes(events),
        events: events.clone(),
        created_at: existing.map(|record| record.created_at).unwrap_or(now),
        updated_at: now,
    };

    tracing::debug!(
        %date,
        events = events.len(),
        has_mood = record.mood.is_some(),
        has_sleep = record.sleep.is_some(),
        "rebuilt day record"
    );
    record
}

fn last_of_kind<'a>(
    events: &'a EventLog,
    matches: impl Fn(&EventKind) -> bool,
) -> Option<&'a TimelineEvent> {
    events.iter().rev().find(|event| matches(&event.kind))
}

fn reduce_mood(events: &EventLog) -> Option<MoodSnapshot> {
    let event = last_of_kind(events, |kind| matches!(kind, EventKind::Mood { .. }))?;
    let value = match &event.kind {
        EventKind::Mood { value: Some(raw) } => mood::normalize(*raw),
        _ => mood::infer_from_label(&event.label).and_then(mood::normalize),
    }?;

    Some(MoodSnapshot {
        value,
        time: event.time.clone(),
        memo: event.memo.clone(),
    })
}

fn reduce_sleep(events: &EventLog, previous_day: Option<&DayRecord>) -> Option<SleepSnapshot> {
    let last_sleep = last_of_kind(events, |kind| matches!(kind, EventKind::Sleep));
    let last_wake = last_of_kind(events, |kind| matches!(kind, EventKind::Wake));

    // Last night's bedtime was logged on the previous day. Records saved
    // without events only carry the snapshot.
    let stitched_bed = previous_day.and_then(|record| {
        if record.events.is_empty() {
            record.sleep.as_ref().and_then(|sleep| sleep.bed_time.clone())
        } else {
            last_of_kind(&record.events, |kind| matches!(kind, EventKind::Sleep))
                .map(|event| event.time.clone())
        }
    });

    let bed_time = stitched_bed.or_else(|| last_sleep.map(|event| event.time.clone()));
    let wake_time = last_wake.map(|event| event.time.clone());

    if bed_time.is_none() && wake_time.is_none() {
        return None;
    }

    let memo = last_wake
        .and_then(|event| event.memo.clone())
        .or_else(|| last_sleep.and_then(|event| event.memo.clone()));

    Some(SleepSnapshot {
        bed_time,
        wake_time,
        memo,
    })
}

fn reduce_medications(events: &EventLog) -> Vec<MedicationLog> {
    events
        .iter()
        .filter_map(|event| match &event.kind {
            EventKind::Medication {
                medication_id,
                slot,
                dosage,
            } => Some(MedicationLog {
                event_id: event.id.clone(),
                time: event.time.clone(),
                medication_id: medication_id.clone(),
                slot: *slot,
                dosage: dosage.clone(),
                label: event.label.clone(),
                memo: event.memo.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn reduce_symptoms(events: &EventLog) -> Vec<SymptomLog> {
    events
        .iter()
        .filter_map(|event| match &event.kind {
            EventKind::Symptom { flag_for_review } => Some(SymptomLog {
                event_id: event.id.clone(),
                time: event.time.clone(),
                label: event.label.clone(),
                memo: event.memo.clone(),
                flag_for_review: *flag_for_review,
            }),
            _ => None,
        })
        .collect()
}

fn reduce_notes(events: &EventLog) -> Vec<NoteLog> {
    events
        .iter()
        .filter(|event| matches!(event.kind, EventKind::Note))
        .map(|event| NoteLog {
            event_id: event.id.clone(),
            time: event.time.clone(),
            text: event.label.clone(),
            memo: event.memo.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::rebuild_day;
    use crate::date_key::DateKey;
    use crate::domain::{
        DayRecord, EventKind, EventLog, MedicationSlot, MoodSnapshot, SleepSnapshot, TimelineEvent,
    };

    fn day() -> DateKey {
        DateKey::parse("2026-03-10").expect("valid key")
    }

    fn at(hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, hour, 0, 0).unwrap()
    }

    fn log(events: Vec<TimelineEvent>) -> EventLog {
        EventLog::from_events(events)
    }

    #[test]
    fn last_mood_in_list_order_wins() {
        let events = log(vec![
            TimelineEvent::mood("21:00", 2.0),
            TimelineEvent::mood("08:00", 5.0).with_memo("after coffee"),
        ]);
        let record = rebuild_day(day(), &events, None, None, at(22));
        let mood = record.mood.expect("mood recorded");
        assert_eq!(mood.value, 5.0);
        assert_eq!(mood.time, "08:00");
        assert_eq!(mood.memo.as_deref(), Some("after coffee"));
    }

    #[test]
    fn centered_and_label_only_moods_are_normalized() {
        let centered = log(vec![TimelineEvent::mood("09:00", -1.0)]);
        let record = rebuild_day(day(), &centered, None, None, at(10));
        assert_eq!(record.mood.map(|mood| mood.value), Some(2.0));

        let mut legacy = TimelineEvent::new("09:00", EventKind::Mood { value: None }, "Great");
        legacy.id = "legacy".to_string();
        let record = rebuild_day(day(), &log(vec![legacy]), None, None, at(10));
        assert_eq!(record.mood.map(|mood| mood.value), Some(5.0));

        let junk = log(vec![TimelineEvent::mood("09:00", 11.0)]);
        let record = rebuild_day(day(), &junk, None, None, at(10));
        assert!(record.mood.is_none());
    }

    #[test]
    fn removing_every_mood_clears_the_mood_field() {
        let previous = DayRecord {
            mood: Some(MoodSnapshot {
                value: 4.0,
                time: "12:00".to_string(),
                memo: None,
            }),
            ..DayRecord::default()
        };
        let events = log(vec![TimelineEvent::note("13:00", "lunch")]);
        let record = rebuild_day(day(), &events, Some(&previous), Some(&previous), at(14));
        assert!(record.mood.is_none());
    }

    #[test]
    fn bedtime_is_stitched_from_the_previous_day() {
        let yesterday = DayRecord {
            sleep: Some(SleepSnapshot {
                bed_time: Some("23:30".to_string()),
                wake_time: None,
                memo: None,
            }),
            ..DayRecord::default()
        };
        let events = log(vec![TimelineEvent::wake("07:00")]);
        let record = rebuild_day(day(), &events, Some(&yesterday), None, at(8));
        assert_eq!(
            record.sleep,
            Some(SleepSnapshot {
                bed_time: Some("23:30".to_string()),
                wake_time: Some("07:00".to_string()),
                memo: None,
            })
        );
    }

    #[test]
    fn stitched_bedtime_does_not_carry_past_one_night() {
        let first_day = DateKey::parse("2026-03-08").expect("valid key");
        let second_day = DateKey::parse("2026-03-09").expect("valid key");

        let first = rebuild_day(
            first_day,
            &log(vec![TimelineEvent::sleep("23:00")]),
            None,
            None,
            at(23),
        );
        let second = rebuild_day(
            second_day,
            &log(vec![TimelineEvent::wake("07:00"), TimelineEvent::sleep("21:30")]),
            Some(&first),
            None,
            at(22),
        );
        assert_eq!(
            second.sleep.as_ref().and_then(|sleep| sleep.bed_time.as_deref()),
            Some("23:00")
        );

        let third = rebuild_day(
            day(),
            &log(vec![TimelineEvent::wake("06:30")]),
            Some(&second),
            None,
            at(7),
        );
        let sleep = third.sleep.expect("sleep recorded");
        assert_eq!(sleep.bed_time.as_deref(), Some("21:30"));
        assert_eq!(sleep.wake_time.as_deref(), Some("06:30"));
        assert_eq!(sleep.duration_minutes(), Some(540));
    }

    #[test]
    fn a_day_without_bedtime_does_not_pass_one_on() {
        let first = rebuild_day(
            DateKey::parse("2026-03-08").expect("valid key"),
            &log(vec![TimelineEvent::sleep("23:00")]),
            None,
            None,
            at(23),
        );
        let second = rebuild_day(
            DateKey::parse("2026-03-09").expect("valid key"),
            &log(vec![TimelineEvent::note("12:00", "busy")]),
            Some(&first),
            None,
            at(12),
        );
        assert!(second.sleep.is_some());

        let third = rebuild_day(
            day(),
            &log(vec![TimelineEvent::note("12:00", "busy")]),
            Some(&second),
            None,
            at(12),
        );
        assert!(third.sleep.is_none());
    }

    #[test]
    fn own_sleep_event_is_used_without_a_stitched_bedtime() {
        let events = log(vec![
            TimelineEvent::wake("06:45").with_memo("groggy"),
            TimelineEvent::sleep("22:50"),
        ]);
        let record = rebuild_day(day(), &events, Some(&DayRecord::default()), None, at(23));
        let sleep = record.sleep.expect("sleep recorded");
        assert_eq!(sleep.bed_time.as_deref(), Some("22:50"));
        assert_eq!(sleep.wake_time.as_deref(), Some("06:45"));
        assert_eq!(sleep.memo.as_deref(), Some("groggy"));
    }

    #[test]
    fn no_sleep_anywhere_means_not_recorded() {
        let events = log(vec![TimelineEvent::note("10:00", "quiet day")]);
        let record = rebuild_day(day(), &events, None, None, at(11));
        assert!(record.sleep.is_none());
    }

    #[test]
    fn list_fields_map_every_matching_event_in_list_order() {
        let events = log(vec![
            TimelineEvent::medication("20:00", "lithium", MedicationSlot::Evening, "300mg"),
            TimelineEvent::symptom("11:00", "headache", true),
            TimelineEvent::medication("08:00", "lithium", MedicationSlot::Morning, "300mg"),
            TimelineEvent::medication("08:00", "lithium", MedicationSlot::Morning, "300mg"),
            TimelineEvent::note("15:00", "walked to the park"),
        ]);
        let record = rebuild_day(day(), &events, None, None, at(21));
        assert_eq!(record.medications.len(), 3);
        assert_eq!(record.medications[0].time, "20:00");
        assert_eq!(record.medications[1].slot, MedicationSlot::Morning);
        assert_eq!(record.symptoms.len(), 1);
        assert!(record.symptoms[0].flag_for_review);
        assert_eq!(record.notes.len(), 1);
        assert_eq!(record.notes[0].text, "walked to the park");
        assert_eq!(record.events.len(), 5);
    }

    #[test]
    fn created_at_survives_rebuilds_and_updated_at_moves() {
        let events = log(vec![TimelineEvent::wake("07:00")]);
        let first = rebuild_day(day(), &events, None, None, at(8));
        let second = rebuild_day(day(), &events, None, Some(&first), at(12));
        assert_eq!(second.created_at, at(8));
        assert_eq!(second.updated_at, at(12));
    }

    #[test]
    fn identical_inputs_produce_identical_output() {
        let events = log(vec![
            TimelineEvent::wake("07:00"),
            TimelineEvent::mood("09:00", 3.0),
            TimelineEvent::note("10:00", "ok"),
        ]);
        let first = rebuild_day(day(), &events, None, None, at(12));
        let second = rebuild_day(day(), &events, None, None, at(12));
        assert_eq!(
            serde_json::to_vec(&first).expect("encode"),
            serde_json::to_vec(&second).expect("encode")
        );
    }
}
