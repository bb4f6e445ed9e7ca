use std::error::Error;
use std::io;
use std::time::Duration as StdDuration;

use chrono::Utc;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use crossterm::{ExecutableCommand, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap};
use ratatui::{Frame, Terminal};

use crate::context::{LocalMoment, NowView, resolve_now};
use crate::domain::{ChecklistItem, Day, RoutineTrack, TimeRange, TimeSlot, WeekSchedule};
use crate::mutate::{SlotPatch, add_checklist_item, remove_checklist_item, toggle_checklist_item, update_slot};
use crate::planner::Planner;
use crate::routines::unfinished_tasks;
use crate::storage::KeyValueStore;

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);
const CELL_TITLE_CHARS: usize = 8;

pub fn run_dashboard<S: KeyValueStore>(planner: &mut Planner<S>) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, planner);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop<S: KeyValueStore>(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	planner: &mut Planner<S>,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::new(LocalMoment::now().day);

	loop {
		let view = build_view(planner.schedule(), LocalMoment::now());
		app.clamp_selection(&view);
		terminal.draw(|frame| draw_dashboard(frame, &app, &view))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match app.mode {
					InputMode::Prompt(_) => handle_prompt_key(&mut app, key.code, planner),
					InputMode::Normal => handle_normal_key(&mut app, key.code, planner, &view),
				};

				if should_quit {
					break;
				}
			}
		}
	}

	Ok(())
}

fn draw_dashboard(frame: &mut Frame, app: &App, view: &ViewModel) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Min(12), Constraint::Length(5)])
		.split(frame.area());

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage(50),
			Constraint::Percentage(25),
			Constraint::Percentage(25),
		])
		.split(layout[0]);

	let right = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(4), Constraint::Min(5), Constraint::Min(6)])
		.split(body[2]);

	render_grid_panel(frame, body[0], app, view);
	render_slot_panel(frame, body[1], app, view);
	render_now_panel(frame, right[0], view);
	render_review_panel(frame, right[1], app, view);
	render_routine_panel(frame, right[2], app, view);
	render_footer(frame, layout[1], app);
}

fn render_grid_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let header = Row::new(
		std::iter::once(Cell::from(""))
			.chain(Day::ALL.iter().map(|day| {
				let style = if *day == view.moment.day {
					Style::default().fg(Color::LightYellow).add_modifier(Modifier::BOLD)
				} else {
					Style::default()
				};
				Cell::from(Span::styled(day.label(), style))
			})),
	);

	let rows = view.ranges.iter().enumerate().map(|(row_index, range)| {
		let label = Cell::from(vec![
			Line::from(range.label.clone()),
			Line::from(Span::styled(
				range.start.clone(),
				Style::default().fg(Color::DarkGray),
			)),
		]);
		let cells = view.grid[row_index].iter().enumerate().map(|(col_index, slot)| {
			let selected = app.grid_row == row_index && app.grid_col == col_index;
			grid_cell(slot.as_ref(), selected, view.current_slot)
		});
		Row::new(std::iter::once(label).chain(cells)).height(2)
	});

	let mut widths = vec![Constraint::Length(6)];
	widths.extend(Day::ALL.iter().map(|_| Constraint::Ratio(1, Day::ALL.len() as u32)));

	let table = Table::new(rows, widths)
		.header(header)
		.column_spacing(1)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(format!("Week | {} {}", view.moment.date.format("%Y-%m-%d"), view.moment.time))
				.border_style(border_style(app.focus == FocusPane::Grid)),
		);
	frame.render_widget(table, area);
}

fn grid_cell(slot: Option<&TimeSlot>, selected: bool, current_slot: Option<u32>) -> Cell<'static> {
	let Some(slot) = slot else {
		return Cell::from("-");
	};

	let mut style = category_style(slot);
	if slot.has_content() {
		style = style.add_modifier(Modifier::BOLD);
	}
	if current_slot == Some(slot.id) {
		style = style.add_modifier(Modifier::UNDERLINED | Modifier::REVERSED);
	}
	if selected {
		style = style.bg(HIGHLIGHT_BACKGROUND_COLOR);
	}

	let progress = if slot.checklist.is_empty() {
		String::new()
	} else {
		format!("{}/{}", slot.completed_count(), slot.checklist.len())
	};
	let title = if slot.has_content() {
		truncate(slot.display_title(), CELL_TITLE_CHARS)
	} else {
		"·".to_string()
	};
	Cell::from(vec![Line::from(title), Line::from(progress)]).style(style)
}

fn render_slot_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let sections = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(7), Constraint::Min(3)])
		.split(area);

	let Some(slot) = app.selected_slot(view) else {
		let empty = Paragraph::new("(no slot selected)")
			.block(Block::default().borders(Borders::ALL).title("Slot"));
		frame.render_widget(empty, area);
		return;
	};

	let meta = slot.category.meta();
	let lines = vec![
		Line::from(format!(
			"#{} {} {} {}-{}",
			slot.id, slot.day, slot.period, slot.time_range.start, slot.time_range.end
		)),
		Line::from(Span::styled(meta.name, category_style(slot))),
		Line::from(if slot.title.is_empty() {
			"(no title)".to_string()
		} else {
			slot.title.clone()
		}),
		Line::from(Span::styled(
			if slot.note.is_empty() {
				"(no note)".to_string()
			} else {
				slot.note.clone()
			},
			Style::default().fg(Color::Gray),
		)),
	];
	let info = Paragraph::new(lines)
		.wrap(Wrap { trim: true })
		.block(Block::default().borders(Borders::ALL).title("Slot"));
	frame.render_widget(info, sections[0]);

	let items = slot
		.checklist
		.iter()
		.map(|item| ListItem::new(checklist_line(item)))
		.collect::<Vec<_>>();
	let mut state = ListState::default();
	if !items.is_empty() && app.focus == FocusPane::Checklist {
		state.select(Some(app.checklist_index.min(items.len() - 1)));
	}

	let title = format!("Checklist {}/{}", slot.completed_count(), slot.checklist.len());
	let list = List::new(if items.is_empty() {
		vec![ListItem::new("(empty, press a to add)")]
	} else {
		items
	})
	.block(
		Block::default()
			.borders(Borders::ALL)
			.title(title)
			.border_style(border_style(app.focus == FocusPane::Checklist)),
	)
	.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));
	frame.render_stateful_widget(list, sections[1], &mut state);
}

fn checklist_line(item: &ChecklistItem) -> Line<'static> {
	if item.completed {
		Line::from(Span::styled(
			format!("[x] {}", item.text),
			Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT),
		))
	} else {
		Line::from(format!("[ ] {}", item.text))
	}
}

fn render_now_panel(frame: &mut Frame, area: Rect, view: &ViewModel) {
	let panel = Paragraph::new(view.now_line.clone())
		.wrap(Wrap { trim: true })
		.block(Block::default().borders(Borders::ALL).title("Now"));
	frame.render_widget(panel, area);
}

fn render_review_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let items = view
		.review_rows
		.iter()
		.map(|row| {
			ListItem::new(vec![
				Line::from(Span::styled(row.origin.clone(), Style::default().fg(Color::Gray))),
				Line::from(format!("  {}", row.text)),
			])
		})
		.collect::<Vec<_>>();

	let mut state = ListState::default();
	if !items.is_empty() && app.focus == FocusPane::Review {
		state.select(Some(app.review_index.min(items.len() - 1)));
	}

	let placeholder = if view.after_day {
		"(all done today)"
	} else {
		"(listed once the day is over)"
	};
	let list = List::new(if items.is_empty() {
		vec![ListItem::new(placeholder)]
	} else {
		items
	})
	.block(
		Block::default()
			.borders(Borders::ALL)
			.title("Unfinished")
			.border_style(border_style(app.focus == FocusPane::Review)),
	)
	.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));
	frame.render_stateful_widget(list, area, &mut state);
}

fn render_routine_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let items = view
		.routine_rows
		.iter()
		.map(|row| {
			let mark = if row.done { "[x]" } else { "[ ]" };
			let style = if row.done {
				Style::default().fg(Color::Green)
			} else {
				Style::default()
			};
			ListItem::new(Line::from(vec![
				Span::styled(format!("{mark} "), style),
				Span::styled(
					format!("{} ", track_short_name(row.track)),
					Style::default().fg(Color::DarkGray),
				),
				Span::raw(row.text.clone()),
			]))
		})
		.collect::<Vec<_>>();

	let mut state = ListState::default();
	if !items.is_empty() && app.focus == FocusPane::Routines {
		state.select(Some(app.routine_index.min(items.len() - 1)));
	}

	let list = List::new(if items.is_empty() {
		vec![ListItem::new("(no routines)")]
	} else {
		items
	})
	.block(
		Block::default()
			.borders(Borders::ALL)
			.title(format!("Routines {}", view.moment.date.format("%m-%d")))
			.border_style(border_style(app.focus == FocusPane::Routines)),
	)
	.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));
	frame.render_stateful_widget(list, area, &mut state);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from("Tab pane | arrows/hjkl move | q quit"),
			Line::from(
				"c category | t title | n note | a add item | space toggle item / check in routine | d delete item | m move task to memo",
			),
			Line::from(app.status.clone()),
		],
		InputMode::Prompt(prompt) => vec![
			Line::from(prompt.title.clone()),
			Line::from(format!("> {}", prompt.input)),
			Line::from("Enter submit | Esc cancel"),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn handle_normal_key<S: KeyValueStore>(
	app: &mut App,
	code: KeyCode,
	planner: &mut Planner<S>,
	view: &ViewModel,
) -> bool {
	match code {
		KeyCode::Char('q') | KeyCode::Esc => return true,
		KeyCode::Tab => app.focus = app.focus.next(),
		KeyCode::BackTab => app.focus = app.focus.prev(),
		KeyCode::Left | KeyCode::Char('h') => app.move_selection(0, -1, view),
		KeyCode::Right | KeyCode::Char('l') => app.move_selection(0, 1, view),
		KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1, 0, view),
		KeyCode::Down | KeyCode::Char('j') => app.move_selection(1, 0, view),
		KeyCode::Char('c') => {
			let result = app
				.selected_slot(view)
				.ok_or_else(|| "no slot selected".to_string())
				.and_then(|slot| cycle_category(planner, slot));
			app.report(result);
		}
		KeyCode::Char('t') => {
			if let Some(slot) = app.selected_slot(view) {
				app.mode = InputMode::Prompt(PromptState::with_input(
					format!("Title for {} {}", slot.day, slot.period),
					slot.title.clone(),
					PromptKind::SlotTitle { slot_id: slot.id },
				));
			}
		}
		KeyCode::Char('n') => {
			if let Some(slot) = app.selected_slot(view) {
				app.mode = InputMode::Prompt(PromptState::with_input(
					format!("Note for {} {}", slot.day, slot.period),
					slot.note.clone(),
					PromptKind::SlotNote { slot_id: slot.id },
				));
			}
		}
		KeyCode::Char('a') => {
			if let Some(slot) = app.selected_slot(view) {
				app.mode = InputMode::Prompt(PromptState::new(
					format!("New checklist item for {} {}", slot.day, slot.period),
					PromptKind::ChecklistItem { slot_id: slot.id },
				));
			}
		}
		KeyCode::Char(' ') => {
			let result = match app.focus {
				FocusPane::Checklist => app
					.selected_checklist_item(view)
					.ok_or_else(|| "no checklist item selected".to_string())
					.and_then(|(slot_id, item)| {
						edit_checklist(planner, slot_id, |items| toggle_checklist_item(items, &item.id))
							.map(|()| format!("toggled: {}", item.text))
					}),
				FocusPane::Routines => app
					.selected_routine(view)
					.ok_or_else(|| "no routine selected".to_string())
					.and_then(|row| check_in_routine(planner, row, view)),
				FocusPane::Grid | FocusPane::Review => return false,
			};
			app.report(result);
		}
		KeyCode::Char('d') if app.focus == FocusPane::Checklist => {
			let result = app
				.selected_checklist_item(view)
				.ok_or_else(|| "no checklist item selected".to_string())
				.and_then(|(slot_id, item)| {
					edit_checklist(planner, slot_id, |items| remove_checklist_item(items, &item.id))
						.map(|()| format!("deleted: {}", item.text))
				});
			app.report(result);
		}
		KeyCode::Char('m') if app.focus == FocusPane::Review => {
			let result = view
				.review_rows
				.get(app.review_index)
				.ok_or_else(|| "no unfinished task selected".to_string())
				.and_then(|row| {
					planner
						.move_task_to_memo(row.slot_id, &row.item_id, Utc::now())
						.map(|todo| format!("moved to memo pad: {}", todo.text))
						.map_err(|err| err.to_string())
				});
			app.report(result);
		}
		_ => {}
	}

	false
}

fn handle_prompt_key<S: KeyValueStore>(app: &mut App, code: KeyCode, planner: &mut Planner<S>) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Input cancelled".to_string();
		}
		KeyCode::Backspace => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.pop();
			}
		}
		KeyCode::Char(value) => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.push(value);
			}
		}
		KeyCode::Enter => {
			let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt,
				InputMode::Normal => return false,
			};

			match submit_prompt(&prompt, planner) {
				Ok(message) => app.status = message,
				Err(err) => {
					app.mode = InputMode::Prompt(prompt);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn submit_prompt<S: KeyValueStore>(prompt: &PromptState, planner: &mut Planner<S>) -> Result<String, String> {
	match prompt.kind {
		PromptKind::SlotTitle { slot_id } => {
			let patch = SlotPatch {
				title: Some(prompt.input.trim().to_string()),
				..SlotPatch::default()
			};
			commit_patch(planner, slot_id, &patch)?;
			Ok("title saved".to_string())
		}
		PromptKind::SlotNote { slot_id } => {
			let patch = SlotPatch {
				note: Some(prompt.input.trim().to_string()),
				..SlotPatch::default()
			};
			commit_patch(planner, slot_id, &patch)?;
			Ok("note saved".to_string())
		}
		PromptKind::ChecklistItem { slot_id } => {
			let text = required_text(&prompt.input, "checklist item")?;
			edit_checklist(planner, slot_id, |items| add_checklist_item(items, &text))?;
			Ok(format!("added: {text}"))
		}
	}
}

fn cycle_category<S: KeyValueStore>(planner: &mut Planner<S>, slot: &TimeSlot) -> Result<String, String> {
	let category = slot.category.next();
	let patch = SlotPatch {
		category: Some(category),
		..SlotPatch::default()
	};
	commit_patch(planner, slot.id, &patch)?;
	Ok(format!("category: {}", category.name()))
}

fn commit_patch<S: KeyValueStore>(planner: &mut Planner<S>, slot_id: u32, patch: &SlotPatch) -> Result<(), String> {
	let next = update_slot(planner.schedule(), slot_id, patch, Utc::now());
	planner.commit(next).map_err(|err| err.to_string())
}

fn edit_checklist<S: KeyValueStore>(
	planner: &mut Planner<S>,
	slot_id: u32,
	edit: impl FnOnce(&[ChecklistItem]) -> Vec<ChecklistItem>,
) -> Result<(), String> {
	let slot = planner
		.schedule()
		.slot(slot_id)
		.ok_or_else(|| format!("slot {slot_id} no longer exists"))?;
	let checklist = edit(&slot.checklist);
	commit_patch(planner, slot_id, &SlotPatch::checklist(checklist))
}

fn check_in_routine<S: KeyValueStore>(
	planner: &mut Planner<S>,
	row: &RoutineRow,
	view: &ViewModel,
) -> Result<String, String> {
	let changed = planner
		.check_in(row.track, &row.id, view.moment.date, Utc::now())
		.map_err(|err| err.to_string())?;
	if changed {
		Ok(format!("checked in: {}", row.text))
	} else {
		Ok(format!("already done today: {}", row.text))
	}
}

fn required_text(input: &str, field_name: &str) -> Result<String, String> {
	let value = input.trim();
	if value.is_empty() {
		Err(format!("{field_name} cannot be empty"))
	} else {
		Ok(value.to_string())
	}
}

fn truncate(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}
	let mut short = text.chars().take(max_chars.saturating_sub(1)).collect::<String>();
	short.push('…');
	short
}

fn track_short_name(track: RoutineTrack) -> &'static str {
	match track {
		RoutineTrack::Morning => "AM",
		RoutineTrack::Evening => "PM",
	}
}

fn category_style(slot: &TimeSlot) -> Style {
	color_from_name(slot.category.meta().color)
		.map(|color| Style::default().fg(color))
		.unwrap_or_default()
}

fn color_from_name(color_name: &str) -> Option<Color> {
	match color_name {
		"blue" => Some(Color::LightBlue),
		"pink" => Some(Color::LightMagenta),
		"purple" => Some(Color::Magenta),
		"yellow" => Some(Color::Yellow),
		"green" => Some(Color::Green),
		"orange" => Some(Color::LightRed),
		"gray" => Some(Color::Gray),
		_ => None,
	}
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default()
			.fg(FOCUSED_PANEL_BORDER_COLOR)
			.add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

fn step(index: usize, delta: i32, len: usize) -> usize {
	if len == 0 {
		return 0;
	}

	if delta >= 0 {
		(index + delta as usize).min(len - 1)
	} else {
		index.saturating_sub(delta.unsigned_abs() as usize)
	}
}

fn build_view(schedule: &WeekSchedule, moment: LocalMoment) -> ViewModel {
	let ranges = schedule.time_ranges().to_vec();
	let grid = ranges
		.iter()
		.map(|range| {
			Day::ALL
				.iter()
				.map(|day| schedule.slot_at(*day, &range.label).cloned())
				.collect()
		})
		.collect();

	let now = resolve_now(schedule, moment.day, &moment.time);
	let current_slot = match &now {
		NowView::InSlot(slot) => Some(slot.id),
		_ => None,
	};
	let after_day = now == NowView::AfterDay;
	let now_line = match now {
		NowView::InSlot(slot) => format!(
			"[{}] {} until {}",
			slot.period,
			slot.display_title(),
			slot.time_range.end
		),
		NowView::BeforeDay { first_start } => format!("Day starts at {first_start}"),
		NowView::BetweenSlots { next: Some(range) } => format!("Break, {} at {}", range.label, range.start),
		NowView::BetweenSlots { next: None } => "Break".to_string(),
		NowView::AfterDay => "Day is over, review what is left".to_string(),
		NowView::Idle => "No slot right now".to_string(),
	};

	let review_rows = if after_day {
		unfinished_tasks(&schedule.slots, moment.day)
			.map(|task| ReviewRow {
				slot_id: task.slot_id,
				item_id: task.item.id.clone(),
				origin: task.origin,
				text: task.item.text.clone(),
			})
			.collect()
	} else {
		Vec::new()
	};

	let routine_rows = [RoutineTrack::Morning, RoutineTrack::Evening]
		.into_iter()
		.flat_map(|track| {
			schedule.routines(track).iter().map(move |routine| RoutineRow {
				track,
				id: routine.id.clone(),
				text: routine.text.clone(),
				done: routine.is_completed_on(moment.date),
			})
		})
		.collect();

	ViewModel {
		ranges,
		grid,
		current_slot,
		now_line,
		after_day,
		review_rows,
		routine_rows,
		moment,
	}
}

#[derive(Debug, Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self::with_input(title, String::new(), kind)
	}

	fn with_input(title: impl Into<String>, input: String, kind: PromptKind) -> Self {
		Self {
			title: title.into(),
			input,
			kind,
		}
	}
}

#[derive(Debug, Clone, Copy)]
enum PromptKind {
	SlotTitle { slot_id: u32 },
	SlotNote { slot_id: u32 },
	ChecklistItem { slot_id: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusPane {
	Grid,
	Checklist,
	Review,
	Routines,
}

impl FocusPane {
	fn next(self) -> Self {
		match self {
			FocusPane::Grid => FocusPane::Checklist,
			FocusPane::Checklist => FocusPane::Review,
			FocusPane::Review => FocusPane::Routines,
			FocusPane::Routines => FocusPane::Grid,
		}
	}

	fn prev(self) -> Self {
		match self {
			FocusPane::Grid => FocusPane::Routines,
			FocusPane::Checklist => FocusPane::Grid,
			FocusPane::Review => FocusPane::Checklist,
			FocusPane::Routines => FocusPane::Review,
		}
	}
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Prompt(PromptState),
}

#[derive(Debug, Clone)]
struct App {
	focus: FocusPane,
	grid_row: usize,
	grid_col: usize,
	checklist_index: usize,
	review_index: usize,
	routine_index: usize,
	mode: InputMode,
	status: String,
}

impl App {
	fn new(today: Day) -> Self {
		Self {
			focus: FocusPane::Grid,
			grid_row: 0,
			grid_col: Day::ALL.iter().position(|day| *day == today).unwrap_or(0),
			checklist_index: 0,
			review_index: 0,
			routine_index: 0,
			mode: InputMode::Normal,
			status: "Ready".to_string(),
		}
	}

	fn clamp_selection(&mut self, view: &ViewModel) {
		self.grid_row = step(self.grid_row, 0, view.ranges.len());
		self.grid_col = step(self.grid_col, 0, Day::ALL.len());
		let checklist_len = self.selected_slot(view).map_or(0, |slot| slot.checklist.len());
		self.checklist_index = step(self.checklist_index, 0, checklist_len);
		self.review_index = step(self.review_index, 0, view.review_rows.len());
		self.routine_index = step(self.routine_index, 0, view.routine_rows.len());
	}

	fn move_selection(&mut self, delta_row: i32, delta_col: i32, view: &ViewModel) {
		match self.focus {
			FocusPane::Grid => {
				self.grid_row = step(self.grid_row, delta_row, view.ranges.len());
				self.grid_col = step(self.grid_col, delta_col, Day::ALL.len());
				self.checklist_index = 0;
			}
			FocusPane::Checklist => {
				let len = self.selected_slot(view).map_or(0, |slot| slot.checklist.len());
				self.checklist_index = step(self.checklist_index, delta_row, len);
			}
			FocusPane::Review => {
				self.review_index = step(self.review_index, delta_row, view.review_rows.len());
			}
			FocusPane::Routines => {
				self.routine_index = step(self.routine_index, delta_row, view.routine_rows.len());
			}
		}
	}

	fn selected_slot<'a>(&self, view: &'a ViewModel) -> Option<&'a TimeSlot> {
		view.grid.get(self.grid_row)?.get(self.grid_col)?.as_ref()
	}

	fn selected_checklist_item<'a>(&self, view: &'a ViewModel) -> Option<(u32, &'a ChecklistItem)> {
		let slot = self.selected_slot(view)?;
		slot.checklist
			.get(self.checklist_index)
			.map(|item| (slot.id, item))
	}

	fn selected_routine<'a>(&self, view: &'a ViewModel) -> Option<&'a RoutineRow> {
		view.routine_rows.get(self.routine_index)
	}

	fn report(&mut self, result: Result<String, String>) {
		self.status = match result {
			Ok(message) => message,
			Err(err) => format!("error: {err}"),
		};
	}
}

struct ViewModel {
	moment: LocalMoment,
	ranges: Vec<TimeRange>,
	/// `grid[range][day]`
	grid: Vec<Vec<Option<TimeSlot>>>,
	current_slot: Option<u32>,
	now_line: String,
	after_day: bool,
	review_rows: Vec<ReviewRow>,
	routine_rows: Vec<RoutineRow>,
}

#[derive(Debug, Clone)]
struct ReviewRow {
	slot_id: u32,
	item_id: String,
	origin: String,
	text: String,
}

#[derive(Debug, Clone)]
struct RoutineRow {
	track: RoutineTrack,
	id: String,
	text: String,
	done: bool,
}
