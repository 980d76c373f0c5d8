use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::{self};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const DEFAULT_CONFIG_FILE: &str = ".twitter-sms.conf";
const SECS_PER_HOUR: u64 = 3600;

/// Everything parsed out of one config file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    #[serde(rename = "user")]
    pub account: Account,
    #[serde(rename = "bot")]
    pub relay: Relay,
    #[serde(rename = "config", default)]
    pub options: Options,
}

/// Identity on the timeline service, plus the phone that gets the texts.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Account {
    pub name: String,
    pub password: String,
    /// Email-to-SMS address. The only sender allowed to issue commands.
    pub phone: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

/// The mail account used both to send notifications and receive commands.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Relay {
    pub email: String,
    pub password: String,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_imap_host")]
    pub imap_host: String,
    #[serde(default = "default_imap_port")]
    pub imap_port: u16,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    File,
    Console,
}

/// Runtime switches. Missing keys fall back to the defaults below.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Options {
    pub own_tweets: bool,
    pub keep_alive: bool,
    pub per_hour: i64,
    pub debug: bool,
    pub dont_refresh: bool,
    pub active: bool,
    pub log_to: LogTarget,
    /// Authors whose posts are never forwarded.
    pub no_follow: BTreeSet<String>,
    pub timeout_secs: u64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            own_tweets: false,
            keep_alive: true,
            per_hour: 30,
            debug: false,
            dont_refresh: false,
            active: true,
            log_to: LogTarget::File,
            no_follow: BTreeSet::new(),
            timeout_secs: 60,
        }
    }
}

impl Options {
    /// Seconds between checks.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(SECS_PER_HOUR / normalize_rate(self.per_hour) as u64)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Rates of zero or less become one check an hour.
pub fn normalize_rate(per_hour: i64) -> i64 {
    if per_hour <= 0 {
        1
    } else {
        per_hour
    }
}

fn default_api_url() -> String {
    "https://api.twitter.com/1".to_string()
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_imap_host() -> String {
    "imap.gmail.com".to_string()
}

fn default_imap_port() -> u16 {
    993
}

impl Settings {
    pub fn from_toml(s: &str, path: &Path) -> Result<Settings, ConfigError> {
        let mut settings: Settings = toml::from_str(s).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        settings.options.per_hour = normalize_rate(settings.options.per_hour);
        Ok(settings)
    }
}

/// Where the current settings came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub path: PathBuf,
    pub modified_at: SystemTime,
}

/// Current settings together with the file they were loaded from.
#[derive(Debug)]
pub struct ConfigStore {
    settings: Settings,
    source: Source,
}

impl ConfigStore {
    pub fn load(path: impl AsRef<Path>) -> Result<ConfigStore, ConfigError> {
        let (settings, source) = read(path.as_ref())?;
        Ok(ConfigStore { settings, source })
    }

    /// Re-parses the file we loaded from. On failure the current settings
    /// are left exactly as they were.
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        let path = self.source.path.clone();
        self.load_from(path)
    }

    /// Replaces the settings with the contents of another file.
    pub fn load_from(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let (settings, source) = read(path.as_ref())?;
        self.settings = settings;
        self.source = source;
        Ok(())
    }

    /// True once the file on disk is newer than what we loaded. A file that
    /// can't be stat'ed isn't considered stale; there'd be nothing to reload.
    pub fn is_stale(&self) -> bool {
        match modified_at(&self.source.path) {
            Ok(modified) => modified > self.source.modified_at,
            Err(_) => false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn interval(&self) -> Duration {
        self.settings.options.interval()
    }
}

fn modified_at(path: &Path) -> Result<SystemTime, ConfigError> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn read(path: &Path) -> Result<(Settings, Source), ConfigError> {
    // Stat before reading so an edit landing in between still looks stale.
    let modified_at = modified_at(path)?;
    let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = Settings::from_toml(&s, path)?;
    Ok((
        settings,
        Source {
            path: path.to_path_buf(),
            modified_at,
        },
    ))
}

/// `~/.twitter-sms.conf`, or the bare file name if there's no home directory.
pub fn default_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}
