//! Configuration management

use serde::Deserialize;
use std::time::Duration;

/// Runtime settings for the dashboard client.
///
/// The browser build always runs with the defaults; the native CLI layers a
/// config file and `DASHBOARD_*` environment variables on top.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// Prefix for API URLs. Empty means same-origin relative URLs.
    #[serde(default)]
    pub base_url: String,

    /// Refresh period for widgets in near-time mode.
    #[serde(default = "default_near_refresh_secs")]
    pub near_refresh_secs: u64,

    /// Header carrying the anti-forgery token.
    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,

    /// Name of the page input holding the anti-forgery token.
    #[serde(default = "default_csrf_field")]
    pub csrf_field: String,

    /// Anti-forgery token for native clients (the browser reads it from the page).
    #[serde(default)]
    pub csrf_token: Option<String>,

    /// Session cookie for native clients.
    #[serde(default)]
    pub session_cookie: Option<String>,

    /// Prompt shown before a widget is deleted.
    #[serde(default = "default_delete_confirmation")]
    pub delete_confirmation: String,
}

fn default_near_refresh_secs() -> u64 {
    300
}

fn default_csrf_header() -> String {
    "X-CSRFToken".to_string()
}

fn default_csrf_field() -> String {
    "csrfmiddlewaretoken".to_string()
}

fn default_delete_confirmation() -> String {
    "Sind sie sicher, dass sie diese Datenrepräsentation löschen wollen?".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            near_refresh_secs: default_near_refresh_secs(),
            csrf_header: default_csrf_header(),
            csrf_field: default_csrf_field(),
            csrf_token: None,
            session_cookie: None,
            delete_confirmation: default_delete_confirmation(),
        }
    }
}

impl Settings {
    /// Period of the near-time refresh timer (never zero).
    pub fn near_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.near_refresh_secs.max(1))
    }

    /// `base_url` without a trailing slash, ready for path concatenation.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Get config directory (DASHBOARD_CONFIG_DIR, XDG_CONFIG_HOME or platform default)
#[cfg(feature = "native")]
pub fn get_config_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("DASHBOARD_CONFIG_DIR") {
        return std::path::PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home)
                .join("Library/Application Support/occupancy-dashboard");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return std::path::PathBuf::from(xdg).join("occupancy-dashboard");
        }
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home).join(".config/occupancy-dashboard");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return std::path::PathBuf::from(appdata).join("occupancy-dashboard");
        }
    }

    // Fallback to current directory
    std::path::PathBuf::from(".")
}

/// Load settings: defaults, then `<config dir>/config.{toml,json,yaml}`, then
/// `DASHBOARD_*` environment variables.
#[cfg(feature = "native")]
pub fn load_settings() -> anyhow::Result<Settings> {
    let config_dir = get_config_dir();

    let builder = ::config::Config::builder()
        .set_default("near_refresh_secs", default_near_refresh_secs() as i64)?
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        // DASHBOARD_BASE_URL, DASHBOARD_CSRF_TOKEN, ...
        .add_source(
            ::config::Environment::with_prefix("DASHBOARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let settings: Settings = builder.build()?.try_deserialize()?;
    tracing::debug!(
        "Settings loaded from {:?} (base_url={:?})",
        config_dir,
        settings.base_url
    );
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.near_refresh_interval(), Duration::from_secs(300));
        assert_eq!(settings.csrf_header, "X-CSRFToken");
        assert_eq!(settings.csrf_field, "csrfmiddlewaretoken");
        assert_eq!(settings.api_root(), "");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"base_url": "http://localhost:8000/"}"#).unwrap();
        assert_eq!(settings.api_root(), "http://localhost:8000");
        assert_eq!(settings.near_refresh_secs, 300);
    }

    #[test]
    fn test_zero_refresh_is_clamped() {
        let settings = Settings {
            near_refresh_secs: 0,
            ..Settings::default()
        };
        assert_eq!(settings.near_refresh_interval(), Duration::from_secs(1));
    }

    #[cfg(feature = "native")]
    mod loading {
        use super::super::*;
        use serial_test::serial;
        use std::env;

        #[test]
        #[serial]
        fn test_env_overrides() {
            let dir = tempfile::tempdir().unwrap();
            env::set_var("DASHBOARD_CONFIG_DIR", dir.path());
            env::set_var("DASHBOARD_BASE_URL", "http://dashboard.local");
            env::set_var("DASHBOARD_NEAR_REFRESH_SECS", "60");

            let settings = load_settings().expect("settings should load");

            env::remove_var("DASHBOARD_BASE_URL");
            env::remove_var("DASHBOARD_NEAR_REFRESH_SECS");
            env::remove_var("DASHBOARD_CONFIG_DIR");

            assert_eq!(settings.base_url, "http://dashboard.local");
            assert_eq!(settings.near_refresh_secs, 60);
            assert_eq!(settings.csrf_header, "X-CSRFToken");
        }

        #[test]
        #[serial]
        fn test_config_file_is_read() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(
                dir.path().join("config.json"),
                r#"{"base_url": "http://file.local", "csrf_token": "abc"}"#,
            )
            .unwrap();
            env::set_var("DASHBOARD_CONFIG_DIR", dir.path());

            let settings = load_settings().expect("settings should load");

            env::remove_var("DASHBOARD_CONFIG_DIR");

            assert_eq!(settings.base_url, "http://file.local");
            assert_eq!(settings.csrf_token.as_deref(), Some("abc"));
        }
    }
}
