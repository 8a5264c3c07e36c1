use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use scorer_core::settings::Settings;
use scorer_runtime::{HttpScoreboard, OfflineScoreboard, Scoreboard};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure `~/.sweep-scorer/` exists so last-used settings can be saved.
pub fn ensure_directories() -> anyhow::Result<()> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(home.join(".sweep-scorer"))?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `--log-level` value onto a tracing filter directive.
///
/// Unknown strings are passed through unchanged so that full `EnvFilter`
/// directives keep working.
pub fn normalise_level(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `log_level` when set. Output goes to
/// stderr, or is appended to `log_file` without ANSI colours.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(normalise_level(log_level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()?;
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()?;
        }
    }

    Ok(())
}

// ── Scoreboard selection ───────────────────────────────────────────────────────

/// Validate the settings and build the scoreboard client they ask for.
///
/// No network traffic happens here, so this runs before the sweep files are
/// opened.
pub fn build_scoreboard(settings: &Settings) -> anyhow::Result<Arc<dyn Scoreboard>> {
    settings.validate()?;
    if settings.offline {
        tracing::info!("Offline mode: scores are logged, not submitted");
        return Ok(Arc::new(OfflineScoreboard));
    }
    let url = settings.url.as_deref().unwrap_or_default();
    let key = settings.key.as_deref().unwrap_or_default();
    Ok(Arc::new(HttpScoreboard::new(url, key)?))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn settings(args: &[&str]) -> Settings {
        Settings::parse_from(
            std::iter::once("sweep-scorer")
                .chain(args.iter().copied())
                .chain(["outer.csv", "inner.csv"]),
        )
    }

    // ── test_ensure_directories ───────────────────────────────────────────────

    #[test]
    fn test_ensure_directories() {
        let tmp = TempDir::new().expect("tempdir");

        let original_home = std::env::var_os("HOME");
        std::env::set_var("HOME", tmp.path());

        let result = ensure_directories();

        match original_home {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }

        result.expect("ensure_directories should succeed");
        assert!(tmp.path().join(".sweep-scorer").is_dir());
    }

    // ── normalise_level ───────────────────────────────────────────────────────

    #[test]
    fn test_normalise_level() {
        assert_eq!(normalise_level("DEBUG"), "debug");
        assert_eq!(normalise_level("info"), "info");
        assert_eq!(normalise_level("WARNING"), "warn");
        assert_eq!(normalise_level("ERROR"), "error");
        assert_eq!(normalise_level("scorer_runtime=trace"), "scorer_runtime=trace");
    }

    // ── build_scoreboard ──────────────────────────────────────────────────────

    #[test]
    fn test_build_scoreboard_offline() {
        assert!(build_scoreboard(&settings(&["--offline"])).is_ok());
    }

    #[test]
    fn test_build_scoreboard_requires_credentials() {
        let err = build_scoreboard(&settings(&["-u", "http://board"]))
            .err()
            .expect("missing key must fail");
        assert!(err.to_string().contains("-u and -k required"));
    }

    #[test]
    fn test_build_scoreboard_rejects_empty_key() {
        let err = build_scoreboard(&settings(&["-u", "http://board", "-k", ""]))
            .err()
            .expect("empty key must fail");
        assert!(err.to_string().contains("-u and -k required"));
    }

    #[test]
    fn test_build_scoreboard_http() {
        let result = build_scoreboard(&settings(&["-u", "http://board", "-k", "secret"]));
        assert!(result.is_ok());
    }
}
