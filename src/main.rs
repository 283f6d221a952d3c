mod domain;
mod paths;
mod storage;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::domain::{format_seconds, summarize, CategoryStore, TimeTracker};
use crate::paths::resolve_storage_config;
use crate::ui::run_dashboard;

#[derive(Debug, Parser)]
#[command(name = "timereg", about = "Terminal-first daily time registration")]
struct Cli {
	/// Category store path (JSON array of names)
	#[arg(long)]
	categories: Option<PathBuf>,
	/// Time ledger path (JSON object keyed by day)
	#[arg(long)]
	ledger: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Interactive tracking dashboard (the default)
	Dashboard,
	/// Print the summary for a day
	Summary {
		/// Day as YYYY-MM-DD, today when omitted
		#[arg(long)]
		day: Option<String>,
	},
	/// Manage the category list
	Category {
		#[command(subcommand)]
		action: CategoryCommand,
	},
	/// Delete all recorded time and the ledger file
	Reset {
		/// Skip the confirmation
		#[arg(long)]
		yes: bool,
	},
}

#[derive(Debug, Subcommand)]
enum CategoryCommand {
	/// Print the ordered category list
	List,
	/// Append a new category
	Add { name: String },
	/// Rename the category at a position (as shown by `list`)
	Rename { position: usize, name: String },
	/// Delete the category at a position (as shown by `list`)
	Delete { position: usize },
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	let config = resolve_storage_config(cli.categories, cli.ledger);
	let mut store = CategoryStore::load(config.categories_path);
	let mut tracker = TimeTracker::load(config.ledger_path);

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Dashboard => {
			run_dashboard(&mut store, &mut tracker)?;
		}
		Command::Summary { day } => {
			print_summary(&tracker, &store, day.as_deref())?;
		}
		Command::Category { action } => {
			run_category_command(&mut store, action)?;
		}
		Command::Reset { yes } => {
			if !yes {
				println!("refusing to delete all recorded time; pass --yes to confirm");
				return Ok(());
			}
			tracker.reset_all(store.categories(), Local::now())?;
			println!("all recorded time deleted");
		}
	}

	Ok(())
}

fn print_summary(
	tracker: &TimeTracker,
	store: &CategoryStore,
	day: Option<&str>,
) -> Result<(), Box<dyn Error>> {
	let day = parse_day(day)?;
	println!("summary for {}", day.format("%Y-%m-%d"));

	let rows = tracker
		.ledger()
		.get(&day)
		.map(|record| summarize(record, store.categories()));
	let Some((rows, total_seconds)) = rows.filter(|(rows, _)| !rows.is_empty()) else {
		println!("no time registered");
		return Ok(());
	};

	for (category, formatted) in &rows {
		println!("{category:<30}: {formatted}");
	}
	println!("total: {}", format_seconds(total_seconds));

	Ok(())
}

fn run_category_command(
	store: &mut CategoryStore,
	action: CategoryCommand,
) -> Result<(), Box<dyn Error>> {
	match action {
		CategoryCommand::List => {
			for (index, name) in store.categories().iter().enumerate() {
				println!("{:>2}. {}", index + 1, name);
			}
		}
		CategoryCommand::Add { name } => {
			store.add(&name)?;
			println!("added '{}'", name.trim());
		}
		CategoryCommand::Rename { position, name } => {
			store.rename(to_index(position), &name)?;
			println!("renamed category {} to '{}'", position, name.trim());
		}
		CategoryCommand::Delete { position } => {
			store.delete(to_index(position))?;
			println!("deleted category {position}");
		}
	}

	Ok(())
}

// positions are 1-based on the CLI, matching `category list` output
fn to_index(position: usize) -> usize {
	position.checked_sub(1).unwrap_or(usize::MAX)
}

fn parse_day(input: Option<&str>) -> Result<NaiveDate, Box<dyn Error>> {
	if let Some(raw) = input {
		Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")?)
	} else {
		Ok(Local::now().date_naive())
	}
}
