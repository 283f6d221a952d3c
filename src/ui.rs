use std::error::Error;
use std::io;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Local};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use crate::domain::{format_seconds, summarize, CategoryStore, StopReport, TimeTracker};
use crate::paths::display_user;

const TRACKING_COLOR: Color = Color::LightGreen;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);

pub fn run_dashboard(
	store: &mut CategoryStore,
	tracker: &mut TimeTracker,
) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, store, tracker);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	store: &mut CategoryStore,
	tracker: &mut TimeTracker,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::default();

	loop {
		let now = Local::now();
		app.clamp_selection(store.categories().len());
		terminal.draw(|frame| draw_dashboard(frame, &app, store, tracker, now))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match app.mode.clone() {
					InputMode::Prompt(prompt) => handle_prompt_key(&mut app, prompt, key.code, store),
					InputMode::Confirm(confirm) => {
						handle_confirm_key(&mut app, confirm, key.code, store, tracker)
					}
					InputMode::Normal => handle_normal_key(&mut app, key.code, store, tracker),
				};

				if should_quit {
					break;
				}
			}
		}
	}

	// close the running interval before leaving so it is recorded
	let report = tracker.stop(store.categories(), Local::now());
	if let Some(err) = report.save_error {
		eprintln!("warning: failed to save ledger: {err}");
	}

	Ok(())
}

fn draw_dashboard(
	frame: &mut Frame,
	app: &App,
	store: &CategoryStore,
	tracker: &TimeTracker,
	now: DateTime<Local>,
) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(4), Constraint::Min(8), Constraint::Length(4)])
		.split(frame.area());

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
		.split(layout[1]);

	render_status_panel(frame, layout[0], app, tracker, now);
	render_categories_panel(frame, body[0], app, store, tracker);
	render_today_panel(frame, body[1], store, tracker, now);
	render_footer(frame, layout[2], app);

	if let Some(lines) = &app.summary {
		render_summary_popup(frame, lines);
	}
}

fn render_status_panel(
	frame: &mut Frame,
	area: Rect,
	app: &App,
	tracker: &TimeTracker,
	now: DateTime<Local>,
) {
	let tracking_line = match tracker.active() {
		Some(session) => Line::styled(
			format!(
				"tracking {} | elapsed {}",
				session.category,
				format_seconds(tracker.elapsed(now).unwrap_or(0.0))
			),
			Style::default().fg(TRACKING_COLOR).add_modifier(Modifier::BOLD),
		),
		None => Line::from("idle - select a category and press Enter"),
	};

	let panel = Paragraph::new(vec![tracking_line, Line::from(app.status.clone())]).block(
		Block::default()
			.borders(Borders::ALL)
			.title(format!("Time Registration | {}", app.user)),
	);
	frame.render_widget(panel, area);
}

fn render_categories_panel(
	frame: &mut Frame,
	area: Rect,
	app: &App,
	store: &CategoryStore,
	tracker: &TimeTracker,
) {
	let active_category = tracker.active().map(|session| session.category.as_str());
	let items = store
		.categories()
		.iter()
		.map(|category| {
			if Some(category.as_str()) == active_category {
				ListItem::new(format!("> {category}"))
					.style(Style::default().fg(TRACKING_COLOR).add_modifier(Modifier::BOLD))
			} else {
				ListItem::new(format!("  {category}"))
			}
		})
		.collect::<Vec<_>>();

	let mut state = ListState::default();
	if !store.categories().is_empty() {
		state.select(Some(app.selected.min(store.categories().len() - 1)));
	}

	let list = List::new(if items.is_empty() {
		vec![ListItem::new("(no categories)")]
	} else {
		items
	})
	.block(Block::default().borders(Borders::ALL).title("Categories"))
	.highlight_style(
		Style::default()
			.bg(HIGHLIGHT_BACKGROUND_COLOR)
			.add_modifier(Modifier::BOLD),
	);

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_today_panel(
	frame: &mut Frame,
	area: Rect,
	store: &CategoryStore,
	tracker: &TimeTracker,
	now: DateTime<Local>,
) {
	let (rows, total_seconds) = match tracker.record_for(now.date_naive()) {
		Some(record) => summarize(record, store.categories()),
		None => (Vec::new(), 0.0),
	};

	let items = if rows.is_empty() {
		vec![ListItem::new("(no time recorded yet)")]
	} else {
		rows.iter()
			.map(|(category, formatted)| ListItem::new(format!("{formatted}  {category}")))
			.collect()
	};

	let title = format!(
		"Today {} | total {}",
		now.format("%Y-%m-%d"),
		format_seconds(total_seconds)
	);
	let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
	frame.render_widget(list, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from("arrows/jk move | Enter start | s stop | d day summary | q quit"),
			Line::from("a add | r rename | x delete | R reset all data"),
		],
		InputMode::Prompt(prompt) => vec![
			Line::from(prompt.title.clone()),
			Line::from(format!("> {}", prompt.input)),
			Line::from("Enter submit | Esc cancel"),
		],
		InputMode::Confirm(confirm) => vec![
			Line::from(confirm.question()),
			Line::from("y confirm | any other key cancels"),
		],
	};

	let footer = Paragraph::new(footer_lines)
		.block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn render_summary_popup(frame: &mut Frame, lines: &[String]) {
	let area = centered_rect(64, 60, frame.area());
	frame.render_widget(Clear, area);

	let text = lines.iter().map(|line| Line::from(line.clone())).collect::<Vec<_>>();
	let popup = Paragraph::new(text).block(
		Block::default()
			.borders(Borders::ALL)
			.title("Day Summary (any key to close)"),
	);
	frame.render_widget(popup, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);
	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}

fn handle_normal_key(
	app: &mut App,
	code: KeyCode,
	store: &mut CategoryStore,
	tracker: &mut TimeTracker,
) -> bool {
	if app.summary.is_some() {
		app.summary = None;
		return false;
	}

	match code {
		KeyCode::Char('q') | KeyCode::Esc => true,
		KeyCode::Up | KeyCode::Char('k') => {
			app.selected = app.selected.saturating_sub(1);
			false
		}
		KeyCode::Down | KeyCode::Char('j') => {
			app.selected = app
				.selected
				.saturating_add(1)
				.min(store.categories().len().saturating_sub(1));
			false
		}
		KeyCode::Enter => {
			let Some(category) = store.categories().get(app.selected).cloned() else {
				app.status = "no category selected".to_string();
				return false;
			};
			let report = tracker.start(&category, store.categories(), Local::now());
			app.status = start_status(&category, &report);
			false
		}
		KeyCode::Char('s') => {
			let report = tracker.stop(store.categories(), Local::now());
			app.status = stop_status(&report);
			false
		}
		KeyCode::Char('d') => {
			// stop before reporting so the interval that just ended
			// is included in the summary
			let now = Local::now();
			let report = tracker.stop(store.categories(), now);
			if !report.nothing_running() {
				app.status = stop_status(&report);
			}
			app.summary = Some(summary_lines(store, tracker, now));
			false
		}
		KeyCode::Char('a') => {
			app.mode = InputMode::Prompt(PromptState::new("New category name", PromptKind::Add));
			false
		}
		KeyCode::Char('r') => {
			if let Some(current) = store.categories().get(app.selected) {
				app.mode = InputMode::Prompt(PromptState::prefilled(
					format!("Rename '{current}'"),
					current.clone(),
					PromptKind::Rename {
						index: app.selected,
					},
				));
			} else {
				app.status = "no category selected".to_string();
			}
			false
		}
		KeyCode::Char('x') => {
			if let Some(current) = store.categories().get(app.selected) {
				app.mode = InputMode::Confirm(ConfirmKind::DeleteCategory {
					index: app.selected,
					name: current.clone(),
				});
			} else {
				app.status = "no category selected".to_string();
			}
			false
		}
		KeyCode::Char('R') => {
			app.mode = InputMode::Confirm(ConfirmKind::ResetAll);
			false
		}
		_ => false,
	}
}

fn handle_prompt_key(
	app: &mut App,
	mut prompt: PromptState,
	code: KeyCode,
	store: &mut CategoryStore,
) -> bool {
	match code {
		KeyCode::Esc => {
			app.status = "cancelled".to_string();
			app.mode = InputMode::Normal;
		}
		KeyCode::Enter => {
			let input = prompt.input.trim().to_string();
			let result = match prompt.kind {
				PromptKind::Add => store.add(&input).map(|_| format!("added '{input}'")),
				PromptKind::Rename { index } => store
					.rename(index, &input)
					.map(|_| format!("renamed to '{input}'")),
			};
			app.status = match result {
				Ok(message) => message,
				Err(err) => format!("error: {err}"),
			};
			app.mode = InputMode::Normal;
		}
		KeyCode::Backspace => {
			prompt.input.pop();
			app.mode = InputMode::Prompt(prompt);
		}
		KeyCode::Char(value) => {
			prompt.input.push(value);
			app.mode = InputMode::Prompt(prompt);
		}
		_ => {
			app.mode = InputMode::Prompt(prompt);
		}
	}

	false
}

fn handle_confirm_key(
	app: &mut App,
	confirm: ConfirmKind,
	code: KeyCode,
	store: &mut CategoryStore,
	tracker: &mut TimeTracker,
) -> bool {
	app.mode = InputMode::Normal;

	if !matches!(code, KeyCode::Char('y') | KeyCode::Char('Y')) {
		app.status = "cancelled".to_string();
		return false;
	}

	match confirm {
		ConfirmKind::DeleteCategory { index, name } => {
			app.status = match store.delete(index) {
				Ok(()) => format!("deleted '{name}'"),
				Err(err) => format!("error: {err}"),
			};
		}
		ConfirmKind::ResetAll => {
			app.status = match tracker.reset_all(store.categories(), Local::now()) {
				Ok(()) => "all recorded time deleted".to_string(),
				Err(err) => format!("reset failed: {err}"),
			};
		}
	}

	false
}

fn summary_lines(store: &CategoryStore, tracker: &mut TimeTracker, now: DateTime<Local>) -> Vec<String> {
	let record = tracker.today_record(store.categories(), now);
	let (rows, total_seconds) = summarize(record, store.categories());

	let mut lines = vec![format!("Daily summary: {}", now.format("%Y-%m-%d")), String::new()];
	if rows.is_empty() {
		lines.push("no time registered today".to_string());
		return lines;
	}

	for (category, formatted) in &rows {
		lines.push(format!("{category:<30}: {formatted}"));
	}
	lines.push(String::new());
	lines.push(format!("TOTAL REGISTERED TIME: {}", format_seconds(total_seconds)));
	lines
}

fn start_status(category: &str, report: &StopReport) -> String {
	match &report.stopped {
		Some(previous) => format!(
			"stopped {} after {} | tracking {}",
			previous.category,
			format_seconds(previous.seconds),
			category
		),
		None => format!("tracking {category}"),
	}
}

fn stop_status(report: &StopReport) -> String {
	match (&report.stopped, &report.save_error) {
		(None, _) => "nothing is running".to_string(),
		(Some(interval), None) => format!(
			"stopped {} after {}",
			interval.category,
			format_seconds(interval.seconds)
		),
		(Some(interval), Some(err)) => format!(
			"stopped {} after {} (save failed: {err})",
			interval.category,
			format_seconds(interval.seconds)
		),
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
		Self {
			title: title.into(),
			input: String::new(),
			kind,
		}
	}

	fn prefilled(title: impl Into<String>, input: String, kind: PromptKind) -> Self {
		Self {
			title: title.into(),
			input,
			kind,
		}
	}
}

#[derive(Debug, Clone)]
enum PromptKind {
	Add,
	Rename { index: usize },
}

#[derive(Debug, Clone)]
enum ConfirmKind {
	DeleteCategory { index: usize, name: String },
	ResetAll,
}

impl ConfirmKind {
	fn question(&self) -> String {
		match self {
			ConfirmKind::DeleteCategory { name, .. } => {
				format!("Delete category '{name}'?")
			}
			ConfirmKind::ResetAll => {
				"Permanently delete ALL recorded time? This cannot be undone.".to_string()
			}
		}
	}
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Prompt(PromptState),
	Confirm(ConfirmKind),
}

struct App {
	selected: usize,
	mode: InputMode,
	summary: Option<Vec<String>>,
	status: String,
	user: String,
}

impl Default for App {
	fn default() -> Self {
		Self {
			selected: 0,
			mode: InputMode::Normal,
			summary: None,
			status: "Ready".to_string(),
			user: display_user(),
		}
	}
}

impl App {
	fn clamp_selection(&mut self, category_count: usize) {
		if category_count == 0 {
			self.selected = 0;
		} else {
			self.selected = self.selected.min(category_count - 1);
		}
	}
}
