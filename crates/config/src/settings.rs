// Bot settings
// Loaded from ~/.config/nasiya/config.toml, then .env, then the process
// environment. Later sources win.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nasiya_engine::layout::SheetLayout;
use nasiya_engine::DeskSettings;
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "NASIYA_CONFIG";

/// Environment names kept from the deployments that predate the config file.
pub const ENV_SPREADSHEET_ID: &str = "spreadsheetID";
pub const ENV_TELEGRAM_TOKEN: &str = "telegramToken";
pub const ENV_ALLOWED_USERS: &str = "allowedUsers";
pub const ENV_CREDENTIALS_PATH: &str = "credentialsPath";

/// Where a value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
    #[default]
    Default,
    File,
    Environment,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Default => "default",
            Source::File => "config file",
            Source::Environment => "environment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Read { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
    /// A required value is unset; carries the environment name to set.
    Missing(&'static str),
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, message } => {
                write!(f, "cannot read {}: {}", path.display(), message)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "invalid config {}: {}", path.display(), message)
            }
            ConfigError::Missing(name) => write!(f, "{} is required", name),
            ConfigError::Invalid { key, reason } => write!(f, "invalid {}: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub spreadsheet_id: String,
    pub telegram_token: String,
    /// Chat handles allowed to use the bot, with or without `@`.
    pub allowed_users: Vec<String>,
    /// Google service-account key file.
    pub credentials_path: PathBuf,
    pub sheet_name: String,
    /// A1 range read on every refresh, without the sheet name.
    pub read_range: String,
    /// Localized name of SUM in the target spreadsheet.
    pub sum_function: String,

    pub session_ttl_secs: u64,
    pub poll_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub max_retries: u32,

    pub layout: SheetLayout,

    pub sheets_api_base: String,
    pub telegram_api_base: String,

    #[serde(skip)]
    pub token_source: Source,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            telegram_token: String::new(),
            allowed_users: Vec::new(),
            credentials_path: PathBuf::from("credentials.json"),
            sheet_name: "Лист1".to_string(),
            read_range: "A2:AZ".to_string(),
            sum_function: "СУММ".to_string(),
            session_ttl_secs: 30 * 60,
            poll_timeout_secs: 10,
            http_timeout_secs: 30,
            max_retries: 3,
            layout: SheetLayout::default(),
            sheets_api_base: "https://sheets.googleapis.com".to_string(),
            telegram_api_base: "https://api.telegram.org".to_string(),
            token_source: Source::Default,
        }
    }
}

impl BotConfig {
    /// Default config file location
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nasiya")
            .join("config.toml")
    }

    /// Load from every source.
    ///
    /// An explicit path (argument or `NASIYA_CONFIG`) must exist; the default
    /// location is optional. `.env` in the working directory is loaded into
    /// the process environment without overriding variables already set.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = Self::config_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    log::debug!("no config file at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };

        match dotenv::dotenv() {
            Ok(path) => log::debug!("loaded {}", path.display()),
            Err(e) => log::debug!("no .env loaded: {}", e),
        }
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if !config.telegram_token.is_empty() {
            config.token_source = Source::File;
        }
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Overlay values from an environment lookup. Blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(id) = get(ENV_SPREADSHEET_ID) {
            self.spreadsheet_id = id;
        }
        if let Some(token) = get(ENV_TELEGRAM_TOKEN) {
            self.telegram_token = token;
            self.token_source = Source::Environment;
        }
        if let Some(users) = get(ENV_ALLOWED_USERS) {
            self.allowed_users = users
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(path) = get(ENV_CREDENTIALS_PATH) {
            self.credentials_path = PathBuf::from(path);
        }
    }

    /// First problem that would stop the bot from starting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_SPREADSHEET_ID));
        }
        if self.telegram_token.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_TELEGRAM_TOKEN));
        }
        if self.sheet_name.trim().is_empty() {
            return Err(invalid("sheet_name", "must not be empty"));
        }
        if self.sum_function.trim().is_empty() {
            return Err(invalid("sum_function", "must not be empty"));
        }
        if self.layout.data_start_row == 0 || self.layout.first_payment_column == 0 {
            return Err(invalid("layout", "rows and columns are 1-based"));
        }
        if self.layout.year_count == 0 {
            return Err(invalid("layout.year_count", "at least one year is required"));
        }
        match range_start_row(&self.read_range) {
            None => return Err(invalid("read_range", "expected A1 notation such as A2:AZ")),
            Some(row) if row != self.layout.data_start_row => {
                return Err(invalid(
                    "read_range",
                    &format!(
                        "starts at row {} but layout.data_start_row is {}",
                        row, self.layout.data_start_row,
                    ),
                ));
            }
            Some(_) => {}
        }
        if self.poll_timeout_secs >= self.http_timeout_secs {
            return Err(invalid(
                "poll_timeout_secs",
                "must be shorter than http_timeout_secs",
            ));
        }
        Ok(())
    }

    /// `Sheet!A2:AZ`
    pub fn qualified_range(&self) -> String {
        format!("{}!{}", self.sheet_name, self.read_range)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn desk_settings(&self) -> DeskSettings {
        DeskSettings {
            layout: self.layout.clone(),
            sum_function: self.sum_function.clone(),
            session_ttl: Duration::from_secs(self.session_ttl_secs),
        }
    }
}

/// Sheet row where an A1 range begins: `A2:AZ` → 2, `A:AZ` → 1.
fn range_start_row(range: &str) -> Option<u32> {
    let start = range.split(':').next()?.trim();
    let digits = start.trim_start_matches(|c: char| c.is_ascii_alphabetic() || c == '$');
    if digits.len() == start.len() {
        return None;
    }
    if digits.is_empty() {
        return Some(1);
    }
    digits.parse().ok()
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid { key, reason: reason.to_string() }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.telegram_token.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("BotConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("telegram_token", &format_args!("{} ({})", token, self.token_source.as_str()))
            .field("allowed_users", &self.allowed_users)
            .field("credentials_path", &self.credentials_path)
            .field("range", &self.qualified_range())
            .field("sum_function", &self.sum_function)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("layout", &self.layout)
            .field("sheets_api_base", &self.sheets_api_base)
            .field("telegram_api_base", &self.telegram_api_base)
            .finish()
    }
}
