use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

const CONFIG_FILE: &str = "config.toml";
const CATEGORIES_FILE: &str = "categories.json";
const LEDGER_FILE: &str = "ledger.json";

/// Locations of the two backing stores. Resolved once by the composition
/// layer and handed to the core; nothing below this reads ambient globals.
#[derive(Debug, Clone)]
pub struct StorageConfig {
	pub categories_path: PathBuf,
	pub ledger_path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
	categories_path: Option<PathBuf>,
	ledger_path: Option<PathBuf>,
}

/// Resolution order per store: CLI flag, environment variable
/// (`TIMEREG_CATEGORIES` / `TIMEREG_LEDGER`), `config.toml` in the state
/// directory, then a default file in the state directory.
pub fn resolve_storage_config(
	cli_categories: Option<PathBuf>,
	cli_ledger: Option<PathBuf>,
) -> StorageConfig {
	let file = read_config_file();
	let state_dir = state_dir();

	let categories_path = cli_categories
		.or_else(|| env_path("TIMEREG_CATEGORIES"))
		.or(file.categories_path)
		.unwrap_or_else(|| state_dir.join(CATEGORIES_FILE));
	let ledger_path = cli_ledger
		.or_else(|| env_path("TIMEREG_LEDGER"))
		.or(file.ledger_path)
		.unwrap_or_else(|| state_dir.join(LEDGER_FILE));

	StorageConfig {
		categories_path: absolutize(categories_path),
		ledger_path: absolutize(ledger_path),
	}
}

/// Ambient user name, display only. Not part of any store's key space.
pub fn display_user() -> String {
	env::var("USERNAME")
		.or_else(|_| env::var("USER"))
		.unwrap_or_else(|_| "user".to_string())
}

fn env_path(key: &str) -> Option<PathBuf> {
	let value = env::var_os(key)?;
	if value.is_empty() {
		None
	} else {
		Some(PathBuf::from(value))
	}
}

fn read_config_file() -> ConfigFile {
	let path = state_dir().join(CONFIG_FILE);
	let raw = match fs::read_to_string(&path) {
		Ok(raw) => raw,
		Err(_) => return ConfigFile::default(),
	};

	match toml::from_str(&raw) {
		Ok(config) => config,
		Err(err) => {
			eprintln!("warning: ignoring {}: {err}", path.display());
			ConfigFile::default()
		}
	}
}

fn state_dir() -> PathBuf {
	if let Some(path) = env::var_os("TIMEREG_STATE_DIR") {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("LOCALAPPDATA") {
			return PathBuf::from(path).join("timereg");
		}
	}

	if let Some(path) = env::var_os("XDG_STATE_HOME") {
		return PathBuf::from(path).join("timereg");
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path)
			.join(".local")
			.join("state")
			.join("timereg");
	}

	PathBuf::from(".timereg")
}

fn absolutize(path: PathBuf) -> PathBuf {
	let path = if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	};

	if path.exists() {
		fs::canonicalize(&path).unwrap_or(path)
	} else {
		path
	}
}
