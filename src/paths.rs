use std::env;
use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "mood_ledger";
const CONFIG_FILE: &str = "config.toml";
const STORE_DIR: &str = "journal";

pub const CONFIG_ENV: &str = "MOOD_LEDGER_CONFIG";
pub const STORE_ENV: &str = "MOOD_LEDGER_STORE";
pub const STATE_DIR_ENV: &str = "MOOD_LEDGER_STATE_DIR";

pub fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
	resolve_config_path_with(cli_path, |key| env::var_os(key).map(PathBuf::from))
}

pub fn resolve_config_path_with<F>(cli_path: Option<PathBuf>, get: F) -> PathBuf
where
	F: Fn(&str) -> Option<PathBuf>,
{
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	if let Some(path) = get(CONFIG_ENV).filter(|path| !path.as_os_str().is_empty()) {
		return absolutize(path);
	}

	state_dir_with(&get).join(CONFIG_FILE)
}

/// Store directory precedence: `--store`, then `MOOD_LEDGER_STORE`, then the
/// config file, then the state directory.
pub fn resolve_store_dir(cli_path: Option<PathBuf>, configured: Option<PathBuf>) -> PathBuf {
	resolve_store_dir_with(cli_path, configured, |key| env::var_os(key).map(PathBuf::from))
}

pub fn resolve_store_dir_with<F>(
	cli_path: Option<PathBuf>,
	configured: Option<PathBuf>,
	get: F,
) -> PathBuf
where
	F: Fn(&str) -> Option<PathBuf>,
{
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	if let Some(path) = get(STORE_ENV).filter(|path| !path.as_os_str().is_empty()) {
		return absolutize(path);
	}

	if let Some(path) = configured {
		return absolutize(path);
	}

	state_dir_with(&get).join(STORE_DIR)
}

fn state_dir_with<F>(get: &F) -> PathBuf
where
	F: Fn(&str) -> Option<PathBuf>,
{
	if let Some(path) = get(STATE_DIR_ENV) {
		return path;
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = get("LOCALAPPDATA") {
			return path.join(APP_DIR);
		}
	}

	if let Some(path) = get("XDG_STATE_HOME") {
		return path.join(APP_DIR);
	}

	if let Some(path) = get("HOME") {
		return path.join(".local").join("state").join(APP_DIR);
	}

	PathBuf::from(format!(".{APP_DIR}"))
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
