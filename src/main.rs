mod config;
mod context;
mod domain;
mod memo;
mod mutate;
mod planner;
mod routines;
mod slots;
mod storage;
mod transfer;
mod ui;
mod usage;
mod validate;

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, load_config, resolve_config_path, resolve_data_dir};
use crate::context::{LocalMoment, NowView, resolve_now};
use crate::domain::{ChecklistItem, Day, RoutineTrack, SlotCategory, TimeRange, WeekSchedule};
use crate::memo::{add_memo, add_todo, move_todo, remove_memo, remove_todo, toggle_todo};
use crate::mutate::{
	SlotPatch, add_checklist_item, add_routine, move_checklist_item, remove_checklist_item,
	remove_routine, toggle_checklist_item, update_slot,
};
use crate::planner::{Planner, ResetScope};
use crate::routines::{routine_history, unfinished_tasks};
use crate::slots::migration_preview;
use crate::storage::{FileStore, LoadStatus};
use crate::transfer::{ExportPart, export};
use crate::ui::run_dashboard;
use crate::usage::category_usage;

const LOG_FILE: &str = "weekslots.log";
const DEFAULT_LOG_FILTER: &str = "weekslots=info";

#[derive(Debug, Parser)]
#[command(name = "weekslots", about = "Weekly time-slot planner")]
struct Cli {
	/// Directory holding schedule.json, todos.json and memos.json.
	#[arg(long)]
	data_dir: Option<PathBuf>,
	#[arg(long)]
	config: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Init,
	Dashboard,
	Show {
		#[arg(long)]
		day: Option<Day>,
	},
	Now,
	Slot {
		id: u32,
		#[arg(long)]
		title: Option<String>,
		#[arg(long)]
		note: Option<String>,
		#[arg(long)]
		category: Option<SlotCategory>,
	},
	Check {
		#[command(subcommand)]
		action: CheckCommand,
	},
	Ranges {
		#[command(subcommand)]
		action: RangesCommand,
	},
	Routine {
		#[arg(long, global = true, default_value = "morning")]
		track: RoutineTrack,
		#[command(subcommand)]
		action: RoutineCommand,
	},
	Review {
		#[arg(long)]
		day: Option<Day>,
		/// Move one task to the memo pad, as SLOT:ITEM.
		#[arg(long = "move")]
		move_task: Option<TaskRef>,
	},
	Todo {
		#[command(subcommand)]
		action: TodoCommand,
	},
	Memo {
		#[command(subcommand)]
		action: MemoCommand,
	},
	Usage,
	Export {
		#[arg(long, default_value = "all")]
		part: ExportPart,
		#[arg(long)]
		out: Option<PathBuf>,
	},
	Import {
		#[arg(long, default_value = "all")]
		part: ExportPart,
		file: PathBuf,
	},
	Reset {
		scope: ResetScope,
		#[arg(long)]
		yes: bool,
	},
}

#[derive(Debug, Subcommand)]
enum CheckCommand {
	Add { slot: u32, text: String },
	Toggle { slot: u32, item: String },
	Remove { slot: u32, item: String },
	Move { slot: u32, item: String, to: usize },
}

#[derive(Debug, Subcommand)]
enum RangesCommand {
	Show,
	Set {
		/// LABEL=HH:MM-HH:MM, in display order.
		#[arg(required = true, num_args = 1..)]
		ranges: Vec<TimeRange>,
		/// Apply even when slot content would be dropped.
		#[arg(long)]
		yes: bool,
	},
}

#[derive(Debug, Subcommand)]
enum RoutineCommand {
	Add {
		text: String,
	},
	Remove {
		id: String,
	},
	Check {
		id: String,
		#[arg(long)]
		date: Option<NaiveDate>,
	},
	Note {
		id: String,
		note: String,
		#[arg(long)]
		date: Option<NaiveDate>,
	},
	List {
		#[arg(long)]
		date: Option<NaiveDate>,
	},
	History {
		id: String,
		#[arg(long)]
		weeks: Option<usize>,
	},
}

#[derive(Debug, Subcommand)]
enum TodoCommand {
	Add { text: String },
	Toggle { id: String },
	Remove { id: String },
	Move { id: String, to: usize },
	List,
}

#[derive(Debug, Subcommand)]
enum MemoCommand {
	Add { text: String },
	Remove { id: String },
	List,
}

#[derive(Debug, Clone)]
struct TaskRef {
	slot_id: u32,
	item_id: String,
}

impl FromStr for TaskRef {
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		let (slot, item) = raw
			.split_once(':')
			.ok_or_else(|| format!("expected SLOT:ITEM, got {raw}"))?;
		let slot_id = slot
			.trim()
			.parse()
			.map_err(|_| format!("invalid slot id: {slot}"))?;
		let item_id = item.trim();
		if item_id.is_empty() {
			return Err("item id is empty".to_string());
		}
		Ok(Self {
			slot_id,
			item_id: item_id.to_string(),
		})
	}
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	let data_dir = resolve_data_dir(cli.data_dir);
	let config_path = resolve_config_path(cli.config, &data_dir);
	let config = load_config(&config_path)?;
	init_logging(&data_dir, config.log_filter.as_deref());

	let store = FileStore::new(&data_dir);
	let mut planner = Planner::open(store, config.default_time_ranges.clone(), Utc::now());
	match planner.load_status() {
		LoadStatus::Recovered { reason } => {
			eprintln!("warning: stored schedule was unusable and has been reset ({reason})");
		}
		LoadStatus::Unavailable { reason } => {
			eprintln!("warning: storage unavailable, changes may not persist ({reason})");
		}
		LoadStatus::Stored | LoadStatus::Missing => {}
	}

	let today = LocalMoment::now();
	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Init => {
			planner.commit(planner.schedule().clone())?;
			println!("initialized schedule in {}", data_dir.display());
		}
		Command::Dashboard => {
			run_dashboard(&mut planner)?;
		}
		Command::Show { day } => {
			print_schedule(planner.schedule(), day);
		}
		Command::Now => {
			print_now(planner.schedule(), &today);
		}
		Command::Slot {
			id,
			title,
			note,
			category,
		} => {
			require_slot(planner.schedule(), id)?;
			let patch = SlotPatch {
				title,
				note,
				category,
				checklist: None,
			};
			if patch.is_empty() {
				return Err("nothing to change: pass --title, --note or --category".into());
			}
			planner.commit(update_slot(planner.schedule(), id, &patch, Utc::now()))?;
			println!("updated slot {id}");
		}
		Command::Check { action } => run_check(&mut planner, action)?,
		Command::Ranges { action } => run_ranges(&mut planner, action)?,
		Command::Routine { track, action } => run_routine(&mut planner, &config, track, action, &today)?,
		Command::Review { day, move_task } => {
			if let Some(task) = move_task {
				let todo = planner.move_task_to_memo(task.slot_id, &task.item_id, Utc::now())?;
				println!("moved to todo {}: {}", todo.id, todo.text);
			} else {
				print_review(planner.schedule(), day.unwrap_or(today.day));
			}
		}
		Command::Todo { action } => run_todo(&mut planner, action)?,
		Command::Memo { action } => run_memo(&mut planner, action)?,
		Command::Usage => {
			print_usage(planner.schedule());
		}
		Command::Export { part, out } => {
			let text = export(planner.schedule(), part)?;
			match out {
				Some(path) => {
					fs::write(&path, text)?;
					println!("exported to {}", path.display());
				}
				None => println!("{text}"),
			}
		}
		Command::Import { part, file } => {
			let text = fs::read_to_string(&file)?;
			planner.import(part, &text, Utc::now())?;
			println!("imported {}", file.display());
		}
		Command::Reset { scope, yes } => {
			if !yes {
				return Err("reset discards data: rerun with --yes to confirm".into());
			}
			planner.reset(scope, Utc::now())?;
			println!("reset {scope:?}");
		}
	}

	Ok(())
}

fn init_logging(data_dir: &Path, configured: Option<&str>) {
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(configured.unwrap_or(DEFAULT_LOG_FILTER)))
		.unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

	let log_file = fs::create_dir_all(data_dir).and_then(|_| {
		OpenOptions::new()
			.create(true)
			.append(true)
			.open(data_dir.join(LOG_FILE))
	});

	match log_file {
		Ok(file) => tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_ansi(false)
			.with_writer(Mutex::new(file))
			.init(),
		Err(_) => tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(io::stderr)
			.init(),
	}
}

fn require_slot(schedule: &WeekSchedule, slot_id: u32) -> Result<(), Box<dyn Error>> {
	if schedule.slot(slot_id).is_none() {
		return Err(format!("slot {slot_id} does not exist").into());
	}
	Ok(())
}

fn edit_checklist(
	planner: &mut Planner<FileStore>,
	slot_id: u32,
	edit: impl FnOnce(&[ChecklistItem]) -> Vec<ChecklistItem>,
) -> Result<(), Box<dyn Error>> {
	let slot = planner
		.schedule()
		.slot(slot_id)
		.ok_or_else(|| format!("slot {slot_id} does not exist"))?;
	let checklist = edit(&slot.checklist);
	planner.commit(update_slot(
		planner.schedule(),
		slot_id,
		&SlotPatch::checklist(checklist),
		Utc::now(),
	))?;
	Ok(())
}

fn run_check(planner: &mut Planner<FileStore>, action: CheckCommand) -> Result<(), Box<dyn Error>> {
	let slot_id = match action {
		CheckCommand::Add { slot, text } => {
			edit_checklist(planner, slot, |items| add_checklist_item(items, &text))?;
			slot
		}
		CheckCommand::Toggle { slot, item } => {
			edit_checklist(planner, slot, |items| toggle_checklist_item(items, &item))?;
			slot
		}
		CheckCommand::Remove { slot, item } => {
			edit_checklist(planner, slot, |items| remove_checklist_item(items, &item))?;
			slot
		}
		CheckCommand::Move { slot, item, to } => {
			edit_checklist(planner, slot, |items| move_checklist_item(items, &item, to))?;
			slot
		}
	};

	if let Some(slot) = planner.schedule().slot(slot_id) {
		print_checklist(&slot.checklist);
	}
	Ok(())
}

fn run_ranges(planner: &mut Planner<FileStore>, action: RangesCommand) -> Result<(), Box<dyn Error>> {
	match action {
		RangesCommand::Show => {
			for range in planner.schedule().time_ranges() {
				println!("{range}");
			}
		}
		RangesCommand::Set { ranges, yes } => {
			let preview = migration_preview(planner.schedule(), &ranges);
			if preview.is_lossy() {
				println!("these slots have content under removed ranges:");
				for (day, label) in &preview.lost_slots {
					println!("  {day} {label}");
				}
				if !yes {
					return Err("rerun with --yes to drop that content".into());
				}
			}

			let overlaps = planner.apply_time_ranges(ranges, Utc::now())?;
			for overlap in overlaps {
				println!(
					"warning: {} overlaps {}; the earlier slot wins",
					overlap.first, overlap.second
				);
			}
			println!(
				"applied {} time ranges, {} slots",
				planner.schedule().time_ranges().len(),
				planner.schedule().slots.len()
			);
		}
	}

	Ok(())
}

fn run_routine(
	planner: &mut Planner<FileStore>,
	config: &Config,
	track: RoutineTrack,
	action: RoutineCommand,
	today: &LocalMoment,
) -> Result<(), Box<dyn Error>> {
	match action {
		RoutineCommand::Add { text } => {
			if text.trim().is_empty() {
				return Err("routine text is empty".into());
			}
			planner.commit(add_routine(planner.schedule(), track, &text, Utc::now()))?;
			if let Some(routine) = planner.schedule().routines(track).last() {
				println!("added {} routine {}: {}", track.name(), routine.id, routine.text);
			}
		}
		RoutineCommand::Remove { id } => {
			require_routine(planner.schedule(), track, &id)?;
			planner.commit(remove_routine(planner.schedule(), track, &id, Utc::now()))?;
			println!("removed {} routine {id}", track.name());
		}
		RoutineCommand::Check { id, date } => {
			require_routine(planner.schedule(), track, &id)?;
			let date = date.unwrap_or(today.date);
			if planner.check_in(track, &id, date, Utc::now())? {
				println!("checked in {id} for {date}");
			} else {
				println!("{id} was already done on {date}");
			}
		}
		RoutineCommand::Note { id, note, date } => {
			require_routine(planner.schedule(), track, &id)?;
			let date = date.unwrap_or(today.date);
			planner.set_routine_note(track, &id, date, &note, Utc::now())?;
			println!("noted {id} for {date}");
		}
		RoutineCommand::List { date } => {
			let date = date.unwrap_or(today.date);
			let routines = planner.schedule().routines(track);
			if routines.is_empty() {
				println!("no {} routines yet", track.name());
			}
			for routine in routines {
				let status = routine.status(date);
				let mark = if routine.is_completed_on(date) { "x" } else { " " };
				let note = status
					.and_then(|status| status.note.as_deref())
					.map(|note| format!(" ({note})"))
					.unwrap_or_default();
				println!("[{mark}] {} | {}{note}", routine.id, routine.text);
			}
		}
		RoutineCommand::History { id, weeks } => {
			let routine = planner
				.schedule()
				.routine(track, &id)
				.ok_or_else(|| format!("no {} routine {id}", track.name()))?;
			let grid = routine_history(routine, today.date, weeks.unwrap_or(config.history_weeks));
			println!("{}", routine.text);
			for (day, row) in Day::ALL.iter().zip(&grid) {
				let cells: String = row
					.iter()
					.map(|cell| match cell {
						Some(cell) if cell.completed => '#',
						Some(_) => '.',
						None => ' ',
					})
					.collect();
				println!("{} {cells}", day.short_name());
			}
		}
	}

	Ok(())
}

fn require_routine(schedule: &WeekSchedule, track: RoutineTrack, routine_id: &str) -> Result<(), Box<dyn Error>> {
	if schedule.routine(track, routine_id).is_none() {
		return Err(format!("no {} routine {routine_id}", track.name()).into());
	}
	Ok(())
}

fn run_todo(planner: &mut Planner<FileStore>, action: TodoCommand) -> Result<(), Box<dyn Error>> {
	let now = Utc::now();
	let next = match action {
		TodoCommand::Add { text } => add_todo(planner.todos(), &text, now),
		TodoCommand::Toggle { id } => toggle_todo(planner.todos(), &id),
		TodoCommand::Remove { id } => remove_todo(planner.todos(), &id),
		TodoCommand::Move { id, to } => move_todo(planner.todos(), &id, to),
		TodoCommand::List => planner.todos().to_vec(),
	};
	if next != planner.todos() {
		planner.commit_todos(next)?;
	}

	if planner.todos().is_empty() {
		println!("no todos");
	}
	for (index, todo) in planner.todos().iter().enumerate() {
		let mark = if todo.completed { "x" } else { " " };
		println!("{index:>2}. [{mark}] {} | {}", todo.id, todo.text);
	}
	Ok(())
}

fn run_memo(planner: &mut Planner<FileStore>, action: MemoCommand) -> Result<(), Box<dyn Error>> {
	let next = match action {
		MemoCommand::Add { text } => add_memo(planner.memos(), &text, Utc::now()),
		MemoCommand::Remove { id } => remove_memo(planner.memos(), &id),
		MemoCommand::List => planner.memos().to_vec(),
	};
	if next != planner.memos() {
		planner.commit_memos(next)?;
	}

	if planner.memos().is_empty() {
		println!("no memos");
	}
	for memo in planner.memos() {
		let written = memo.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
		println!("{} | {written} | {}", memo.id, memo.text);
	}
	Ok(())
}

fn print_schedule(schedule: &WeekSchedule, day: Option<Day>) {
	let days = match day {
		Some(day) => vec![day],
		None => Day::ALL.to_vec(),
	};

	for day in days {
		println!("{day} ({})", day.short_name());
		for slot in schedule.visible_slots().filter(|slot| slot.day == day) {
			let progress = if slot.checklist.is_empty() {
				String::new()
			} else {
				format!(" [{}/{}]", slot.completed_count(), slot.checklist.len())
			};
			println!(
				"  #{:<3} {} {}-{} | {}{progress}",
				slot.id,
				slot.period,
				slot.time_range.start,
				slot.time_range.end,
				slot.display_title(),
			);
			if !slot.note.is_empty() {
				println!("        {}", slot.note);
			}
		}
	}
}

fn print_checklist(items: &[ChecklistItem]) {
	if items.is_empty() {
		println!("checklist is empty");
	}
	for item in items {
		let mark = if item.completed { "x" } else { " " };
		println!("[{mark}] {} | {}", item.id, item.text);
	}
}

fn print_now(schedule: &WeekSchedule, moment: &LocalMoment) {
	match resolve_now(schedule, moment.day, &moment.time) {
		NowView::InSlot(slot) => {
			println!(
				"{} {} now: #{} [{}] {} ({}-{})",
				moment.day,
				moment.time,
				slot.id,
				slot.period,
				slot.display_title(),
				slot.time_range.start,
				slot.time_range.end
			);
			print_checklist(&slot.checklist);
		}
		NowView::BeforeDay { first_start } => println!("the day starts at {first_start}"),
		NowView::BetweenSlots { next } => match next {
			Some(range) => println!("break; next up {} at {}", range.label, range.start),
			None => println!("break between slots"),
		},
		NowView::AfterDay => {
			let open = unfinished_tasks(&schedule.slots, moment.day).count();
			println!("the day is over; {open} unfinished task(s), see `weekslots review`");
		}
		NowView::Idle => println!("no slot right now"),
	}
}

fn print_review(schedule: &WeekSchedule, day: Day) {
	let mut tasks = unfinished_tasks(&schedule.slots, day).peekable();
	if tasks.peek().is_none() {
		println!("nothing left open on {day}");
		return;
	}

	for task in tasks {
		println!("{}:{} | {} | {}", task.slot_id, task.item.id, task.origin, task.item.text);
	}
}

fn print_usage(schedule: &WeekSchedule) {
	for usage in category_usage(schedule.visible_slots()) {
		let meta = usage.category.meta();
		let verdict = match (usage.recommended, usage.within_recommendation()) {
			(Some((min, max)), Some(true)) => format!("ok ({min}-{max})"),
			(Some((min, max)), _) if usage.count < min => format!("below {min}-{max}"),
			(Some((min, max)), _) => format!("above {min}-{max}"),
			(None, _) => String::new(),
		};
		println!("{:<16} {:>2} {verdict}", meta.name, usage.count);
	}
}
