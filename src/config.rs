use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ThemeError;
use crate::schedule::Schedule;
use crate::theme::browsers::Browser;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Browser whose chrome surfaces get themed
    #[serde(default = "default_browser")]
    pub browser: String,
    /// Daily schedule boundaries (fractional hours)
    #[serde(default)]
    pub schedule: Schedule,
    /// Period of the automatic schedule check, in seconds
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    /// Default duration of a manual override, in minutes
    #[serde(default = "default_override_minutes")]
    pub override_minutes: u64,
    /// Directory the generated stylesheets are written to.
    /// Defaults to ~/.themeshift/out when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

fn default_browser() -> String {
    Browser::Generic.as_str().to_string()
}

fn default_tick_seconds() -> u64 {
    60
}

fn default_override_minutes() -> u64 {
    60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            browser: default_browser(),
            schedule: Schedule::default(),
            tick_seconds: default_tick_seconds(),
            override_minutes: default_override_minutes(),
            output_dir: None,
        }
    }
}

impl Settings {
    /// Returns the config directory path (~/.themeshift)
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".themeshift"))
    }

    /// Returns the config file path (~/.themeshift/settings.json)
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("settings.json"))
    }

    /// Returns the persisted key-value state file path (~/.themeshift/state.json)
    pub fn state_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("state.json"))
    }

    /// Returns the log file path (~/.themeshift/themeshift.log)
    pub fn log_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("themeshift.log"))
    }

    /// Directory the generated stylesheets land in
    pub fn resolved_output_dir(&self) -> Option<PathBuf> {
        match &self.output_dir {
            Some(dir) => Some(PathBuf::from(dir)),
            None => Self::config_dir().map(|d| d.join("out")),
        }
    }

    /// Ensures config directory and default settings file exist.
    /// Called on startup to initialize configuration.
    pub fn ensure_config_exists() {
        if let Some(config_dir) = Self::config_dir() {
            if !config_dir.exists() {
                if fs::create_dir_all(&config_dir).is_ok() {
                    // Set directory permissions to user-only on Unix
                    #[cfg(unix)]
                    {
                        use std::os::unix::fs::PermissionsExt;
                        let perms = fs::Permissions::from_mode(0o700);
                        let _ = fs::set_permissions(&config_dir, perms);
                    }
                }
            }
        }

        if let Some(config_path) = Self::config_path() {
            if !config_path.exists() {
                let default_settings = Self::default();
                let _ = default_settings.save();
            }
        }
    }

    /// Loads settings from the config file, returns default if not found or invalid
    pub fn load() -> Self {
        Self::load_with_error().unwrap_or_default()
    }

    /// Loads settings from the config file with error information
    pub fn load_with_error() -> Result<Self, ThemeError> {
        Self::ensure_config_exists();

        let config_path = Self::config_path()
            .ok_or_else(|| ThemeError::Config("Could not determine config path".to_string()))?;

        let content = fs::read_to_string(&config_path)?;

        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| ThemeError::Config(format!("Invalid JSON in settings.json: {}", e)))?;

        settings.schedule.validate()?;
        Ok(settings)
    }

    /// Saves settings to the config file using atomic write pattern
    pub fn save(&self) -> io::Result<()> {
        let Some(config_dir) = Self::config_dir() else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine config directory",
            ));
        };

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = fs::Permissions::from_mode(0o700);
                let _ = fs::set_permissions(&config_dir, perms);
            }
        }

        let config_path = config_dir.join("settings.json");
        let temp_path = config_dir.join("settings.json.tmp");
        let content = serde_json::to_string_pretty(self)?;

        // Atomic write: write to temp file first, then rename
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &config_path)?;

        Ok(())
    }

    /// Parses the configured browser id
    pub fn parsed_browser(&self) -> Result<Browser, ThemeError> {
        Browser::parse(&self.browser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.browser, "generic");
        assert_eq!(settings.tick_seconds, 60);
        assert_eq!(settings.override_minutes, 60);
        assert_eq!(settings.schedule.day_start, 7.0);
        assert_eq!(settings.schedule.evening_start, 17.5);
        assert_eq!(settings.schedule.night_start, 19.0);
    }

    #[test]
    fn test_parse_partial_json() {
        let json = r#"{"browser":"opera"}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.browser, "opera");
        assert_eq!(settings.tick_seconds, 60);
        assert_eq!(settings.schedule.night_start, 19.0);
    }

    #[test]
    fn test_parse_partial_schedule() {
        let json = r#"{"schedule":{"evening_start":18.0}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.schedule.day_start, 7.0);
        assert_eq!(settings.schedule.evening_start, 18.0);
    }

    #[test]
    fn test_parsed_browser() {
        let mut settings = Settings::default();
        assert!(settings.parsed_browser().is_ok());
        settings.browser = "netscape".to_string();
        assert!(settings.parsed_browser().is_err());
    }
}
