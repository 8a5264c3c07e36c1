use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, ScorerError};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Live scoring agent for outer/inner sweep measurements
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sweep-scorer",
    about = "Live scoring agent for outer/inner sweep measurements",
    version
)]
pub struct Settings {
    /// URL of the scoreboard system
    #[arg(short = 'u', long, env = "SCOREBOARD_URL")]
    pub url: Option<String>,

    /// API key for the scoreboard
    #[arg(short = 'k', long, env = "SCOREBOARD_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Name of contestant being scored
    #[arg(short = 'n', long, default_value = "")]
    pub name: String,

    /// Email of competitor
    #[arg(short = 'e', long)]
    pub email: Option<String>,

    /// Competition class e.g. unlimited
    #[arg(short = 'c', long, default_value = "")]
    pub class: String,

    /// Score locally without contacting the scoreboard
    #[arg(long)]
    pub offline: bool,

    /// How often the sweep files are polled for new data, in milliseconds
    #[arg(long, default_value = "250", value_parser = clap::value_parser!(u64).range(10..=5000))]
    pub poll_interval_ms: u64,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,

    /// Outer sweep CSV file
    pub outer_sweep_file: PathBuf,

    /// Inner sweep CSV file
    pub inner_sweep_file: PathBuf,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.sweep-scorer/last_used.json`.
///
/// The API key is deliberately absent.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".sweep-scorer").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and fill gaps from last-used params.
    ///
    /// Nothing is written here; call [`Settings::persist_last_used`] once
    /// logging is up so failures are reported.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            return Self::resolve_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // Command line and environment always win over saved values.
        if settings.url.is_none() {
            settings.url = last.url;
        }
        if !is_arg_explicitly_set(&matches, "class") && settings.class.is_empty() {
            if let Some(v) = last.class {
                settings.class = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "log_level") {
            if let Some(v) = last.log_level {
                settings.log_level = v;
            }
        }

        Self::resolve_debug(settings)
    }

    /// Save these settings as the new last-used params, or delete the saved
    /// file when `--clear` was given.
    pub fn persist_last_used(&self) -> Result<()> {
        self.persist_last_used_to(&LastUsedParams::config_path())
    }

    pub fn persist_last_used_to(&self, config_path: &std::path::Path) -> Result<()> {
        if self.clear {
            return LastUsedParams::clear_at(config_path);
        }
        LastUsedParams::from(self).save_to(config_path)
    }

    /// Check that everything needed to talk to the scoreboard is present.
    pub fn validate(&self) -> Result<()> {
        if self.offline {
            return Ok(());
        }
        let missing = |v: &Option<String>| v.as_deref().map_or(true, str::is_empty);
        if missing(&self.url) || missing(&self.key) {
            return Err(ScorerError::Config("-u and -k required".to_string()));
        }
        Ok(())
    }

    /// The contestant email, with an empty string treated as absent.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }

    /// `--debug` overrides the log level.
    fn resolve_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            url: s.url.clone(),
            class: Some(s.class.clone()).filter(|c| !c.is_empty()),
            log_level: if s.debug {
                None
            } else {
                Some(s.log_level.clone())
            },
        }
    }
}

/// Returns `true` when `name` was supplied on the command line or through its
/// environment variable.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(clap::parser::ValueSource::CommandLine | clap::parser::ValueSource::EnvVariable)
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
