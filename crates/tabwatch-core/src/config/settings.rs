use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::RngExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Watch a chat tab, retry refused responses, notify on completion")]
pub struct Config {
    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a scripted page through the monitor and relay
    Demo {
        /// Which page timeline to play
        #[arg(long, value_enum, default_value_t = DemoScenario::Simple)]
        scenario: DemoScenario,

        /// Keep the scripted tab in the background
        #[arg(long)]
        hidden: bool,

        /// Override the configured alert option for this run
        #[arg(long, value_enum)]
        alert: Option<AlertOption>,
    },
    /// Inspect or change the retry/alert policy
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `config` subcommand actions
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the effective settings
    Show,
    /// Validate and persist new policy values
    Set {
        /// Lower bound of the retry countdown, in seconds
        #[arg(long)]
        min_delay: Option<u64>,

        /// Upper bound of the retry countdown, in seconds
        #[arg(long)]
        max_delay: Option<u64>,

        /// When to raise a completion notification
        #[arg(long, value_enum)]
        alert: Option<AlertOption>,
    },
}

/// Scripted page timelines available to `demo`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoScenario {
    /// Loading, partial response, completion
    Simple,
    /// Server refuses once, countdown, retry click, completion
    Retry,
    /// Retry click is swallowed, block banner shows, then recovers
    Blocked,
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// When a completed response should raise a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AlertOption {
    /// Every completion
    Always,
    /// Only when the page is in the background
    #[default]
    Inactive,
    /// Only when at least one retry happened
    Retry,
}

impl AlertOption {
    /// Decide whether a completion should be announced
    pub fn should_notify(self, page_hidden: bool, retries: u32) -> bool {
        match self {
            AlertOption::Always => true,
            AlertOption::Inactive => page_hidden,
            AlertOption::Retry => retries > 0,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            AlertOption::Always => "always",
            AlertOption::Inactive => "inactive",
            AlertOption::Retry => "retry",
        }
    }
}

impl fmt::Display for AlertOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected policy values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A delay bound of zero seconds
    #[error("{field} must be a positive number of seconds")]
    NonPositive { field: &'static str },

    /// Lower bound above upper bound
    #[error("min delay ({min}s) must not exceed max delay ({max}s)")]
    InvertedBounds { min: u64, max: u64 },

    /// A delay bound longer than a day
    #[error("{field} must be at most {limit} seconds, got {value}")]
    TooLarge {
        field: &'static str,
        value: u64,
        limit: u64,
    },
}

/// Application settings (from config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// When to raise completion notifications
    #[serde(default)]
    pub alert_option: AlertOption,

    /// Retry countdown bounds
    #[serde(default)]
    pub retry: RetrySettings,

    /// Monitor cadences
    #[serde(default)]
    pub monitor: MonitorSettings,

    /// Notification presentation
    #[serde(default)]
    pub notification: NotificationSettings,
}

/// Retry countdown bounds (inclusive)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_min_delay")]
    pub min_delay_secs: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,
}

/// Upper limit for either retry bound
pub const MAX_DELAY_SECS: u64 = 86_400;

fn default_min_delay() -> u64 {
    30
}

fn default_max_delay() -> u64 {
    45
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            min_delay_secs: default_min_delay(),
            max_delay_secs: default_max_delay(),
        }
    }
}

impl RetrySettings {
    /// Pick a countdown uniformly from `[min_delay_secs, max_delay_secs]`
    pub fn pick_delay(&self) -> Duration {
        let lo = self.min_delay_secs.min(self.max_delay_secs);
        let hi = self.min_delay_secs.max(self.max_delay_secs);
        let mut rng = rand::rng();
        Duration::from_secs(rng.random_range(lo..=hi))
    }
}

/// Cadences of the page monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Title/countdown refresh interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Retry-control probe interval while awaiting a response
    #[serde(default = "default_probe_interval")]
    pub probe_interval_ms: u64,

    /// Wait after the completion marker before reading the final content
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Wait after settling before showing the done favicon
    #[serde(default = "default_done_delay")]
    pub done_delay_ms: u64,

    /// Maximum retry clicks after a countdown
    #[serde(default = "default_click_attempts")]
    pub click_attempts: u32,

    /// Spacing between retry clicks
    #[serde(default = "default_click_spacing")]
    pub click_spacing_ms: u64,

    /// Wait after the last click before restarting the cycle
    #[serde(default = "default_restart_delay")]
    pub restart_delay_ms: u64,

    /// Time a loading marker has to appear after a click before the block banner shows
    #[serde(default = "default_block_check")]
    pub block_check_ms: u64,
}

fn default_tick_interval() -> u64 {
    500
}

fn default_probe_interval() -> u64 {
    1000
}

fn default_settle_delay() -> u64 {
    300
}

fn default_done_delay() -> u64 {
    500
}

fn default_click_attempts() -> u32 {
    3
}

fn default_click_spacing() -> u64 {
    1000
}

fn default_restart_delay() -> u64 {
    1000
}

fn default_block_check() -> u64 {
    3000
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            probe_interval_ms: default_probe_interval(),
            settle_delay_ms: default_settle_delay(),
            done_delay_ms: default_done_delay(),
            click_attempts: default_click_attempts(),
            click_spacing_ms: default_click_spacing(),
            restart_delay_ms: default_restart_delay(),
            block_check_ms: default_block_check(),
        }
    }
}

impl MonitorSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn done_delay(&self) -> Duration {
        Duration::from_millis(self.done_delay_ms)
    }

    pub fn click_spacing(&self) -> Duration {
        Duration::from_millis(self.click_spacing_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn block_check(&self) -> Duration {
        Duration::from_millis(self.block_check_ms)
    }
}

/// Notification presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Title of every notification, also used as the app name in messages
    #[serde(default = "default_notification_title")]
    pub title: String,

    /// Prefix of generated notification ids
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
}

fn default_notification_title() -> String {
    "Tab Watch".to_string()
}

fn default_id_prefix() -> String {
    "tabwatch-notification".to_string()
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            id_prefix: default_id_prefix(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            alert_option: AlertOption::default(),
            retry: RetrySettings::default(),
            monitor: MonitorSettings::default(),
            notification: NotificationSettings::default(),
        }
    }
}

/// Partial policy change coming from the CLI
#[derive(Debug, Clone, Default)]
pub struct PolicyUpdate {
    pub min_delay_secs: Option<u64>,
    pub max_delay_secs: Option<u64>,
    pub alert_option: Option<AlertOption>,
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                return Self::read_from(p);
            }
        }

        for path in Self::default_paths().iter().flatten() {
            if path.exists() {
                return Self::read_from(path);
            }
        }

        Ok(Self::default())
    }

    /// Candidate config locations, most specific first
    pub fn default_paths() -> [Option<PathBuf>; 3] {
        [
            dirs::config_dir().map(|p| p.join("tabwatch/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/tabwatch/config.toml")),
            dirs::home_dir().map(|p| p.join(".tabwatch.toml")),
        ]
    }

    /// Path `config set` writes to when `--config` is not given
    pub fn save_path(explicit: Option<&PathBuf>) -> Option<PathBuf> {
        if let Some(p) = explicit {
            return Some(p.clone());
        }
        let candidates = Self::default_paths();
        candidates
            .iter()
            .flatten()
            .find(|p| p.exists())
            .cloned()
            .or_else(|| candidates.into_iter().flatten().next())
    }

    fn read_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Clamp cadences to a minimum so timers never spin
    pub fn normalize(&mut self) {
        const MIN_INTERVAL_MS: u64 = 1;

        let m = &mut self.monitor;
        for value in [
            &mut m.tick_interval_ms,
            &mut m.probe_interval_ms,
            &mut m.click_spacing_ms,
        ] {
            if *value < MIN_INTERVAL_MS {
                *value = MIN_INTERVAL_MS;
            }
        }
        if m.click_attempts == 0 {
            m.click_attempts = 1;
        }
    }

    /// Check the retry bounds
    pub fn validate_policy(&self) -> Result<(), ConfigError> {
        let RetrySettings {
            min_delay_secs: min,
            max_delay_secs: max,
        } = self.retry;
        for (field, value) in [("min delay", min), ("max delay", max)] {
            if value == 0 {
                return Err(ConfigError::NonPositive { field });
            }
            if value > MAX_DELAY_SECS {
                return Err(ConfigError::TooLarge {
                    field,
                    value,
                    limit: MAX_DELAY_SECS,
                });
            }
        }
        if min > max {
            return Err(ConfigError::InvertedBounds { min, max });
        }
        Ok(())
    }

    /// Apply `update` in memory and validate it without persisting
    pub fn apply_policy(&self, update: &PolicyUpdate) -> Result<Self, ConfigError> {
        let mut next = self.clone();
        if let Some(min) = update.min_delay_secs {
            next.retry.min_delay_secs = min;
        }
        if let Some(max) = update.max_delay_secs {
            next.retry.max_delay_secs = max;
        }
        if let Some(alert) = update.alert_option {
            next.alert_option = alert;
        }
        next.validate_policy()?;
        Ok(next)
    }

    /// Validate `update` and write it to `path`, keeping unrelated keys and comments.
    ///
    /// Nothing is written when validation fails.
    pub fn save_policy(&self, path: &Path, update: &PolicyUpdate) -> Result<Self> {
        let next = self.apply_policy(update)?;

        let mut doc = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            content
                .parse::<toml_edit::DocumentMut>()
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            toml_edit::DocumentMut::new()
        };

        doc["alert_option"] = toml_edit::value(next.alert_option.as_str());
        if !doc.contains_table("retry") {
            doc["retry"] = toml_edit::table();
        }
        let min = i64::try_from(next.retry.min_delay_secs).context("min delay out of range")?;
        let max = i64::try_from(next.retry.max_delay_secs).context("max delay out of range")?;
        doc["retry"]["min_delay_secs"] = toml_edit::value(min);
        doc["retry"]["max_delay_secs"] = toml_edit::value(max);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        std::fs::write(path, doc.to_string())
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!(
            path = %path.display(),
            min = next.retry.min_delay_secs,
            max = next.retry.max_delay_secs,
            alert = %next.alert_option,
            "Saved retry policy"
        );
        Ok(next)
    }
}
