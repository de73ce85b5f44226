use crate::badges::BadgeProgress;
use crate::date_key::DateKey;
use crate::domain::{DayRecord, EventKind, TimelineEvent};
use crate::mood;
use crate::stats::{Period, PeriodSummary};

pub fn format_minutes(minutes: u32) -> String {
	format!("{}h{:02}m", minutes / 60, minutes % 60)
}

fn percent(ratio: f64) -> String {
	format!("{:.0}%", ratio * 100.0)
}

pub fn event_line(event: &TimelineEvent) -> String {
	let span = match &event.end_time {
		Some(end) => format!("{}-{}", event.time, end),
		None => event.time.clone(),
	};
	let detail = match &event.kind {
		EventKind::Mood { value } => {
			let described = value
				.map(mood::describe)
				.unwrap_or_else(|| mood::describe_average(mood::infer_from_label(&event.label)));
			format!(" {} {}", described.emoji, described.label)
		}
		EventKind::Medication {
			medication_id,
			dosage,
			..
		} if !dosage.is_empty() => format!(" {medication_id} {dosage}"),
		EventKind::Symptom {
			flag_for_review: true,
		} => " [review]".to_string(),
		_ => String::new(),
	};

	format!(
		"{} {} {}{}{} id={}",
		span,
		event.kind.name(),
		event.label,
		detail,
		event
			.memo
			.as_ref()
			.map(|value| format!(" memo={value}"))
			.unwrap_or_default(),
		event.id
	)
}

pub fn day_lines(date: DateKey, record: Option<&DayRecord>) -> Vec<String> {
	let mut lines = vec![format!("day {date}")];
	let Some(record) = record.filter(|record| !record.events.is_empty()) else {
		lines.push("no events recorded for this day".to_string());
		return lines;
	};

	let mood_line = match &record.mood {
		Some(snapshot) => {
			let described = mood::describe(snapshot.value);
			format!(
				"mood: {} {} ({:.1}) at {}",
				described.emoji, described.label, snapshot.value, snapshot.time
			)
		}
		None => format!("mood: {} {}", mood::NO_VALUE_EMOJI, mood::NO_VALUE_LABEL),
	};
	lines.push(mood_line);

	let sleep_line = match &record.sleep {
		Some(sleep) => format!(
			"sleep: {} -> {}{}",
			sleep.bed_time.as_deref().unwrap_or("?"),
			sleep.wake_time.as_deref().unwrap_or("?"),
			sleep
				.duration_minutes()
				.map(|minutes| format!(" ({})", format_minutes(minutes)))
				.unwrap_or_default()
		),
		None => "sleep: not recorded".to_string(),
	};
	lines.push(sleep_line);
	lines.push(format!(
		"medications: {} | symptoms: {} | notes: {}",
		record.medications.len(),
		record.symptoms.len(),
		record.notes.len()
	));

	lines.push(String::new());
	lines.extend(record.events.sorted_by_time().map(event_line));
	lines
}

pub fn streak_lines(current: u32, longest: u32) -> Vec<String> {
	vec![
		format!("current streak: {current} day{}", if current == 1 { "" } else { "s" }),
		format!("longest streak: {longest} day{}", if longest == 1 { "" } else { "s" }),
	]
}

pub fn period_lines(today: DateKey, period: Period, summary: &PeriodSummary) -> Vec<String> {
	let mood = mood::describe_average(summary.mood_average);
	let mood_value = summary
		.mood_average
		.map(|value| format!(" ({value:.2})"))
		.unwrap_or_default();
	let sleep_value = summary
		.sleep_average_hours
		.map(|hours| format!("{hours:.1}h avg, "))
		.unwrap_or_default();

	vec![
		format!("{period} ending {today}"),
		format!(
			"recorded: {}/{} days ({})",
			summary.recorded_days,
			summary.total_days,
			percent(summary.recording_rate)
		),
		format!("mood: {} {}{}", mood.emoji, mood.label, mood_value),
		format!(
			"mood trend: {} | mood stability: {}",
			summary.mood_trend.label(),
			summary.mood_stability.label()
		),
		format!("sleep: {}consistency {}", sleep_value, summary.sleep_consistency.label()),
		format!(
			"medication adherence: {} ({} days)",
			percent(summary.medication_adherence),
			summary.medication_days
		),
		format!(
			"notes: {} | symptoms: {} ({} flagged for review) | activity: {}",
			summary.note_total,
			summary.symptom_total,
			summary.flagged_symptoms,
			format_minutes(summary.activity_minutes)
		),
	]
}

pub fn badge_lines(progress: &[BadgeProgress]) -> Vec<String> {
	progress
		.iter()
		.map(|entry| {
			format!(
				"{} {:<12} {:>4}/{:<4} {:>4} {:?} - {}",
				if entry.achieved { "[x]" } else { "[ ]" },
				entry.definition.id,
				entry.current_value,
				entry.definition.requirement,
				percent(entry.progress),
				entry.definition.rarity,
				entry.definition.description
			)
		})
		.collect()
}
