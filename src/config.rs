use crate::constants::{
    APP_DIR, CONFIG_FILE, DEFAULT_BATCH_SIZE, DEFAULT_MOUNT_POINT, DEFAULT_SETTLE_DELAY,
    SYSTEM_CONFIG_PATH,
};
use crate::protect::ProtectList;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

const SECOND: Duration = Duration::from_secs(1);
const DAY: Duration = Duration::from_secs(86_400);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config syntax: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{name} must be between 0 and 100, got {value}")]
    ThresholdRange { name: &'static str, value: i64 },
    #[error("trigger_threshold ({trigger}) must be greater than target_threshold ({target})")]
    ThresholdOrder { trigger: u8, target: u8 },
    #[error("batch_size must be greater than zero, got {0}")]
    BatchSize(i64),
    #[error("no directories configured")]
    NoDirectories,
    #[error("invalid duration for {field}: {value:?}")]
    Duration { field: &'static str, value: String },
}

/// Verbosity of the log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    /// Accepts level names and their numeric codes (`0` = error .. `3` = debug).
    pub fn try_parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" | "0" => Some(Self::Error),
            "warn" | "warning" | "1" => Some(Self::Warn),
            "info" | "2" => Some(Self::Info),
            "debug" | "3" => Some(Self::Debug),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

/// Parses `<n><unit>` where unit is `ms`, `s`, `m`, `h`, `d` or `w`.
/// A bare number is multiplied by `bare_unit`.
pub fn parse_duration(raw: &str, bare_unit: Duration) -> Option<Duration> {
    let s = raw.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let n: u64 = digits.parse().ok()?;

    let secs_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "" => return bare_unit.checked_mul(u32::try_from(n).ok()?),
        "ms" => return Some(Duration::from_millis(n)),
        "s" | "sec" | "secs" => 1,
        "m" | "min" | "mins" => 60,
        "h" | "hr" | "hrs" => 3_600,
        "d" | "day" | "days" => 86_400,
        "w" | "week" | "weeks" => 604_800,
        _ => return None,
    };
    n.checked_mul(secs_per_unit).map(Duration::from_secs)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Count(u64),
    Text(String),
}

impl DurationValue {
    fn resolve(&self, field: &'static str, bare_unit: Duration) -> Result<Duration, ConfigError> {
        let parsed = match self {
            Self::Count(n) => u32::try_from(*n)
                .ok()
                .and_then(|n| bare_unit.checked_mul(n)),
            Self::Text(s) => parse_duration(s, bare_unit),
        };
        parsed.ok_or_else(|| ConfigError::Duration {
            field,
            value: match self {
                Self::Count(n) => n.to_string(),
                Self::Text(s) => s.clone(),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DirectoryList {
    List(Vec<String>),
    Joined(String),
}

impl DirectoryList {
    fn into_paths(self) -> Vec<PathBuf> {
        let entries = match self {
            Self::List(list) => list,
            Self::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        entries
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .map(PathBuf::from)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Verbosity {
    Code(i64),
    Name(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    mount_point: Option<PathBuf>,
    trigger_threshold: i64,
    target_threshold: i64,
    retention: DurationValue,
    batch_size: Option<i64>,
    directories: DirectoryList,
    log_verbosity: Option<Verbosity>,
    settle_delay: Option<DurationValue>,
    #[serde(default)]
    protect: Vec<PathBuf>,
}

/// Validated, immutable run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mount_point: PathBuf,
    pub trigger_threshold: u8,
    pub target_threshold: u8,
    pub retention: Duration,
    pub batch_size: usize,
    pub directories: Vec<PathBuf>,
    pub log_verbosity: LogLevel,
    pub settle_delay: Duration,
    pub protect: ProtectList,
    /// Non-fatal remarks from validation, logged once logging is up.
    pub notes: Vec<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        Self::from_raw(raw)
    }

    pub fn log_summary(&self) {
        let dirs: Vec<String> = self
            .directories
            .iter()
            .map(|d| d.display().to_string())
            .collect();
        info!(
            mount_point = %self.mount_point.display(),
            trigger = self.trigger_threshold,
            target = self.target_threshold,
            retention_secs = self.retention.as_secs(),
            batch_size = self.batch_size,
            directories = %dirs.join(", "),
            "configuration loaded"
        );
        if !self.protect.is_empty() {
            info!(count = self.protect.len(), "protected paths configured");
        }
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let trigger_threshold = threshold("trigger_threshold", raw.trigger_threshold)?;
        let target_threshold = threshold("target_threshold", raw.target_threshold)?;
        if trigger_threshold <= target_threshold {
            return Err(ConfigError::ThresholdOrder {
                trigger: trigger_threshold,
                target: target_threshold,
            });
        }

        let batch_size = match raw.batch_size {
            None => DEFAULT_BATCH_SIZE,
            Some(n) => usize::try_from(n)
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::BatchSize(n))?,
        };

        let directories = raw.directories.into_paths();
        if directories.is_empty() {
            return Err(ConfigError::NoDirectories);
        }

        let retention = raw.retention.resolve("retention", DAY)?;
        let settle_delay = match raw.settle_delay {
            Some(value) => value.resolve("settle_delay", SECOND)?,
            None => DEFAULT_SETTLE_DELAY,
        };

        let mut notes = Vec::new();
        let log_verbosity = match raw.log_verbosity {
            None => LogLevel::default(),
            Some(v) => {
                let raw_level = match v {
                    Verbosity::Code(n) => n.to_string(),
                    Verbosity::Name(s) => s,
                };
                LogLevel::try_parse(&raw_level).unwrap_or_else(|| {
                    notes.push(format!(
                        "unrecognised log_verbosity {raw_level:?}, using {}",
                        LogLevel::default().name()
                    ));
                    LogLevel::default()
                })
            }
        };

        Ok(Self {
            mount_point: raw
                .mount_point
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MOUNT_POINT)),
            trigger_threshold,
            target_threshold,
            retention,
            batch_size,
            directories,
            log_verbosity,
            settle_delay,
            protect: ProtectList::new(raw.protect),
            notes,
        })
    }
}

fn threshold(name: &'static str, value: i64) -> Result<u8, ConfigError> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= 100)
        .ok_or(ConfigError::ThresholdRange { name, value })
}

/// `/etc/diskreap/config.toml` when present, else the per-user config dir.
pub fn default_config_path() -> PathBuf {
    let system = PathBuf::from(SYSTEM_CONFIG_PATH);
    if system.exists() {
        return system;
    }
    dirs::config_dir().map_or(system, |dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
