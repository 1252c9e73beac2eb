use std::time::Duration;

pub const APP_DIR: &str = "diskreap";
pub const CONFIG_FILE: &str = "config.toml";
pub const SYSTEM_CONFIG_PATH: &str = "/etc/diskreap/config.toml";

pub const DEFAULT_MOUNT_POINT: &str = "/";
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Consecutive failed target checks after which a sweep is abandoned.
pub const MAX_PROBE_FAILURES: u32 = 3;
