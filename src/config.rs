use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{TimeRange, default_time_ranges};
use crate::validate::{SettingsError, check_time_range_settings};

const APP_DIR: &str = "weekslots";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_HISTORY_WEEKS: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config {}: {source}", .path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("invalid config {}: {source}", .path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},
	#[error("invalid default_time_ranges in {}: {source}", .path.display())]
	Ranges {
		path: PathBuf,
		#[source]
		source: SettingsError,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
	pub default_time_ranges: Vec<TimeRange>,
	pub log_filter: Option<String>,
	pub history_weeks: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			default_time_ranges: default_time_ranges(),
			log_filter: None,
			history_weeks: DEFAULT_HISTORY_WEEKS,
		}
	}
}

/// Reads the TOML config at `path`. A missing file means defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
	let raw = match fs::read_to_string(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
		Err(source) => {
			return Err(ConfigError::Read {
				path: path.to_path_buf(),
				source,
			});
		}
	};

	let config: Config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
		path: path.to_path_buf(),
		source,
	})?;
	check_time_range_settings(&config.default_time_ranges).map_err(|source| ConfigError::Ranges {
		path: path.to_path_buf(),
		source,
	})?;

	Ok(config)
}

pub fn resolve_data_dir(cli_path: Option<PathBuf>) -> PathBuf {
	data_dir_from(cli_path, |name| env::var_os(name))
}

pub fn resolve_config_path(cli_path: Option<PathBuf>, data_dir: &Path) -> PathBuf {
	if let Some(path) = cli_path {
		return absolutize(path);
	}
	config_dir_from(data_dir, |name| env::var_os(name)).join(CONFIG_FILE)
}

fn data_dir_from(cli_path: Option<PathBuf>, var: impl Fn(&str) -> Option<OsString>) -> PathBuf {
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	if let Some(path) = non_empty(var("WEEKSLOTS_DATA_DIR")) {
		return absolutize(PathBuf::from(path));
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = non_empty(var("LOCALAPPDATA")) {
			return PathBuf::from(path).join(APP_DIR);
		}
	}

	if let Some(path) = non_empty(var("XDG_STATE_HOME")) {
		return PathBuf::from(path).join(APP_DIR);
	}

	if let Some(path) = non_empty(var("HOME")) {
		return PathBuf::from(path).join(".local").join("state").join(APP_DIR);
	}

	PathBuf::from(".weekslots")
}

fn config_dir_from(data_dir: &Path, var: impl Fn(&str) -> Option<OsString>) -> PathBuf {
	if let Some(path) = non_empty(var("WEEKSLOTS_CONFIG_DIR")) {
		return PathBuf::from(path);
	}

	if let Some(path) = non_empty(var("XDG_CONFIG_HOME")) {
		return PathBuf::from(path).join(APP_DIR);
	}

	if let Some(path) = non_empty(var("HOME")) {
		return PathBuf::from(path).join(".config").join(APP_DIR);
	}

	data_dir.to_path_buf()
}

fn non_empty(value: Option<OsString>) -> Option<OsString> {
	value.filter(|value| !value.is_empty())
}

fn absolutize(path: PathBuf) -> PathBuf {
	if path.is_absolute() {
		return path;
	}

	match env::current_dir() {
		Ok(cwd) => cwd.join(path),
		Err(_) => path,
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;
	use std::ffi::OsString;
	use std::fs;
	use std::path::{Path, PathBuf};

	use crate::domain::{TimeRange, default_time_ranges};

	use super::{ConfigError, config_dir_from, data_dir_from, load_config};

	fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> + use<> {
		let map: HashMap<String, OsString> = pairs
			.iter()
			.map(|(name, value)| (name.to_string(), OsString::from(*value)))
			.collect();
		move |name| map.get(name).cloned()
	}

	#[test]
	fn data_dir_prefers_flag_then_env() {
		let env = vars(&[("WEEKSLOTS_DATA_DIR", "/srv/slots"), ("HOME", "/home/kim")]);
		assert_eq!(
			data_dir_from(Some(PathBuf::from("/tmp/explicit")), &env),
			PathBuf::from("/tmp/explicit")
		);
		assert_eq!(data_dir_from(None, &env), PathBuf::from("/srv/slots"));
	}

	#[cfg(not(target_os = "windows"))]
	#[test]
	fn data_dir_falls_back_through_state_dirs() {
		let env = vars(&[("XDG_STATE_HOME", "/state"), ("HOME", "/home/kim")]);
		assert_eq!(data_dir_from(None, &env), PathBuf::from("/state/weekslots"));

		let env = vars(&[("HOME", "/home/kim"), ("XDG_STATE_HOME", "")]);
		assert_eq!(
			data_dir_from(None, &env),
			PathBuf::from("/home/kim/.local/state/weekslots")
		);

		assert_eq!(data_dir_from(None, vars(&[])), PathBuf::from(".weekslots"));
	}

	#[test]
	fn config_dir_falls_back_to_data_dir() {
		let data_dir = Path::new("/data");
		let env = vars(&[("XDG_CONFIG_HOME", "/cfg"), ("HOME", "/home/kim")]);
		assert_eq!(config_dir_from(data_dir, &env), PathBuf::from("/cfg/weekslots"));

		let env = vars(&[("HOME", "/home/kim")]);
		assert_eq!(
			config_dir_from(data_dir, &env),
			PathBuf::from("/home/kim/.config/weekslots")
		);
		assert_eq!(config_dir_from(data_dir, vars(&[])), data_dir.to_path_buf());
	}

	#[test]
	fn missing_config_means_defaults() {
		let dir = tempfile::tempdir().expect("tempdir");
		let config = load_config(&dir.path().join("config.toml")).expect("defaults");
		assert_eq!(config.default_time_ranges, default_time_ranges());
		assert_eq!(config.history_weeks, 16);
		assert!(config.log_filter.is_none());
	}

	#[test]
	fn reads_ranges_and_filter() {
		let dir = tempfile::tempdir().expect("tempdir");
		let path = dir.path().join("config.toml");
		fs::write(
			&path,
			r#"
log_filter = "weekslots=debug"
history_weeks = 8

[[default_time_ranges]]
label = "아침"
start = "06:00"
end = "09:00"
"#,
		)
		.expect("write config");

		let config = load_config(&path).expect("config parses");
		assert_eq!(config.default_time_ranges, vec![TimeRange::new("아침", "06:00", "09:00")]);
		assert_eq!(config.log_filter.as_deref(), Some("weekslots=debug"));
		assert_eq!(config.history_weeks, 8);
	}

	#[test]
	fn rejects_bad_config() {
		let dir = tempfile::tempdir().expect("tempdir");
		let path = dir.path().join("config.toml");

		fs::write(&path, "history_weeks = \"many\"").expect("write config");
		assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));

		fs::write(&path, "default_time_ranges = []").expect("write config");
		assert!(matches!(load_config(&path), Err(ConfigError::Ranges { .. })));
	}
}
