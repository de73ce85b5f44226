use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand};

use mood_ledger::config::Config;
use mood_ledger::domain::{ActivityCategory, MedicationSlot, clock_minutes};
use mood_ledger::paths::{resolve_config_path, resolve_store_dir};
use mood_ledger::report::{badge_lines, day_lines, period_lines, streak_lines};
use mood_ledger::streak::longest_streak;
use mood_ledger::{DateKey, Journal, JsonDirStore, Period, TimelineEvent};

const LOG_ENV: &str = "MOOD_LEDGER_LOG";

#[derive(Debug, Parser)]
#[command(name = "mood-ledger", about = "Timestamped mood, sleep and medication journal")]
struct Cli {
	#[arg(long)]
	config: Option<PathBuf>,
	#[arg(long)]
	store: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Args)]
struct When {
	/// Day the event belongs to (YYYY-MM-DD), defaults to today
	#[arg(long)]
	day: Option<DateKey>,
	/// Wall-clock time (HH:MM), defaults to now
	#[arg(long)]
	time: Option<String>,
	#[arg(long)]
	memo: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Wake {
		#[command(flatten)]
		when: When,
	},
	Sleep {
		#[command(flatten)]
		when: When,
	},
	Mood {
		/// 1..5, or -2..2 for the centered scale
		#[arg(allow_hyphen_values = true)]
		value: f64,
		#[command(flatten)]
		when: When,
	},
	Med {
		#[arg(long)]
		name: String,
		#[arg(long, default_value = "as_needed", value_parser = parse_slot)]
		slot: MedicationSlot,
		#[arg(long, default_value = "")]
		dosage: String,
		#[command(flatten)]
		when: When,
	},
	Symptom {
		label: String,
		#[arg(long)]
		review: bool,
		#[command(flatten)]
		when: When,
	},
	Activity {
		label: String,
		#[arg(long, default_value = "other", value_parser = parse_category)]
		category: ActivityCategory,
		#[arg(long)]
		end: Option<String>,
		#[command(flatten)]
		when: When,
	},
	Note {
		text: String,
		#[command(flatten)]
		when: When,
	},
	Edit {
		#[arg(long)]
		day: Option<DateKey>,
		#[arg(long)]
		id: String,
		#[arg(long)]
		time: Option<String>,
		#[arg(long)]
		label: Option<String>,
		#[arg(long)]
		memo: Option<String>,
	},
	Delete {
		#[arg(long)]
		day: Option<DateKey>,
		#[arg(long)]
		id: String,
	},
	Day {
		#[arg(long)]
		day: Option<DateKey>,
	},
	Streak,
	Stats {
		#[arg(long)]
		period: Option<Period>,
	},
	Badges,
	Breathe,
}

#[tokio::main]
async fn main() {
	if let Err(err) = run().await {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

async fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	let config_path = resolve_config_path(cli.config);
	let config = Config::load(&config_path)?;
	init_tracing(config.log_filter.as_deref());

	let store_dir = resolve_store_dir(cli.store, config.store_dir.clone());
	tracing::debug!(store = %store_dir.display(), config = %config_path.display(), "opening journal");
	let mut journal = Journal::open(Arc::new(JsonDirStore::new(store_dir))).await;
	let today = DateKey::today();

	match cli.command.unwrap_or(Command::Day { day: None }) {
		Command::Wake { when } => {
			let event = TimelineEvent::wake(clock(&when)?);
			record(&mut journal, when, event).await?;
		}
		Command::Sleep { when } => {
			let event = TimelineEvent::sleep(clock(&when)?);
			record(&mut journal, when, event).await?;
		}
		Command::Mood { value, when } => {
			let event = TimelineEvent::mood(clock(&when)?, value);
			record(&mut journal, when, event).await?;
		}
		Command::Med {
			name,
			slot,
			dosage,
			when,
		} => {
			let event = TimelineEvent::medication(clock(&when)?, name, slot, dosage);
			record(&mut journal, when, event).await?;
		}
		Command::Symptom {
			label,
			review,
			when,
		} => {
			let event = TimelineEvent::symptom(clock(&when)?, label, review);
			record(&mut journal, when, event).await?;
		}
		Command::Activity {
			label,
			category,
			end,
			when,
		} => {
			if let Some(end) = &end {
				checked_clock(end)?;
			}
			let event = TimelineEvent::activity(clock(&when)?, end, category, label);
			record(&mut journal, when, event).await?;
		}
		Command::Note { text, when } => {
			let event = TimelineEvent::note(clock(&when)?, text);
			record(&mut journal, when, event).await?;
		}
		Command::Edit {
			day,
			id,
			time,
			label,
			memo,
		} => {
			let day = day.unwrap_or(today);
			let mut event = journal
				.day(day)
				.and_then(|record| record.events.find(&id))
				.cloned()
				.ok_or_else(|| format!("event {id} not found on {day}"))?;
			if let Some(time) = time {
				event.time = checked_clock(&time)?;
			}
			if let Some(label) = label {
				event.label = label;
			}
			if memo.is_some() {
				event.memo = memo;
			}
			journal.replace_event(day, &id, event)?;
			println!("updated {id} on {day}");
			commit_badges(&mut journal, today).await;
		}
		Command::Delete { day, id } => {
			let day = day.unwrap_or(today);
			let removed = journal.remove_event(day, &id)?;
			println!("deleted {} {} on {day}", removed.kind.name(), removed.id);
		}
		Command::Day { day } => {
			let day = day.unwrap_or(today);
			print_lines(day_lines(day, journal.day(day)));
		}
		Command::Streak => {
			print_lines(streak_lines(
				journal.current_streak(today),
				longest_streak(journal.days()),
			));
		}
		Command::Stats { period } => {
			let period = period.unwrap_or(config.default_period);
			let summary = journal.period_summary(today, period);
			print_lines(period_lines(today, period, &summary));
		}
		Command::Badges => {
			commit_badges(&mut journal, today).await;
			let stats = journal.badge_stats(today).await;
			print_lines(badge_lines(&journal.badge_progress(&stats)));
		}
		Command::Breathe => {
			let count = journal.record_breathing().await?;
			println!("breathing exercises completed: {count}");
			commit_badges(&mut journal, today).await;
		}
	}

	journal.flush().await;
	Ok(())
}

fn init_tracing(configured: Option<&str>) {
	let filter = std::env::var(LOG_ENV)
		.or_else(|_| std::env::var("RUST_LOG"))
		.ok()
		.or_else(|| configured.map(str::to_string))
		.unwrap_or_else(|| "warn".to_string());
	let env_filter = tracing_subscriber::EnvFilter::try_new(&filter)
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
	tracing_subscriber::fmt()
		.compact()
		.with_writer(std::io::stderr)
		.with_target(false)
		.with_env_filter(env_filter)
		.init();
}

async fn record(
	journal: &mut Journal<JsonDirStore>,
	when: When,
	mut event: TimelineEvent,
) -> Result<(), Box<dyn Error>> {
	let today = DateKey::today();
	let day = when.day.unwrap_or(today);
	if let Some(memo) = when.memo {
		event = event.with_memo(memo);
	}
	let kind = event.kind.name();
	let id = journal.add_event(day, event);
	println!("recorded {kind} {id} on {day}");
	commit_badges(journal, today).await;
	Ok(())
}

async fn commit_badges(journal: &mut Journal<JsonDirStore>, today: DateKey) {
	let stats = journal.badge_stats(today).await;
	for badge in journal.commit_badges(&stats, Utc::now()) {
		println!("new badge: {}", badge.badge_id);
	}
}

fn clock(when: &When) -> Result<String, Box<dyn Error>> {
	match &when.time {
		Some(time) => checked_clock(time),
		None => Ok(Local::now().format("%H:%M").to_string()),
	}
}

fn checked_clock(raw: &str) -> Result<String, Box<dyn Error>> {
	if clock_minutes(raw).is_none() {
		return Err(format!("invalid time: {raw} (expected HH:MM)").into());
	}
	Ok(raw.trim().to_string())
}

fn parse_slot(raw: &str) -> Result<MedicationSlot, String> {
	match raw.trim().to_lowercase().as_str() {
		"morning" => Ok(MedicationSlot::Morning),
		"noon" => Ok(MedicationSlot::Noon),
		"evening" => Ok(MedicationSlot::Evening),
		"bedtime" => Ok(MedicationSlot::Bedtime),
		"as_needed" | "as-needed" | "prn" => Ok(MedicationSlot::AsNeeded),
		other => Err(format!("unknown slot: {other}")),
	}
}

fn parse_category(raw: &str) -> Result<ActivityCategory, String> {
	match raw.trim().to_lowercase().as_str() {
		"exercise" => Ok(ActivityCategory::Exercise),
		"walk" => Ok(ActivityCategory::Walk),
		"social" => Ok(ActivityCategory::Social),
		"work" => Ok(ActivityCategory::Work),
		"hobby" => Ok(ActivityCategory::Hobby),
		"chores" => Ok(ActivityCategory::Chores),
		"rest" => Ok(ActivityCategory::Rest),
		"other" => Ok(ActivityCategory::Other),
		other => Err(format!("unknown activity category: {other}")),
	}
}

fn print_lines(lines: Vec<String>) {
	for line in lines {
		println!("{line}");
	}
}
