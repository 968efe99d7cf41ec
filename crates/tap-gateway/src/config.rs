use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use tap_types::config::LiveConfig;

/// Returns the livetap home directory (~/.livetap/), or `./.livetap` when no
/// home directory can be determined.
pub fn livetap_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".livetap")
}

/// Returns the path to the config file (~/.livetap/config.toml)
pub fn config_path() -> PathBuf {
    livetap_home().join("config.toml")
}

/// Load config from the default location, creating it if it doesn't exist.
pub fn load_config() -> Result<LiveConfig> {
    load_config_from(&config_path())
}

/// Load config from `path`, writing defaults there first if it is missing.
pub fn load_config_from(path: &Path) -> Result<LiveConfig> {
    if !path.exists() {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let default = LiveConfig::default();
        save_config_to(path, &default)?;
        return Ok(default);
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: LiveConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config at {}", path.display()))?;
    Ok(config)
}

/// Save config to `path`, overwriting the existing file.
pub fn save_config_to(path: &Path, config: &LiveConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, toml_str)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn livetap_home_exists() {
        let home = livetap_home();
        assert!(home.to_string_lossy().contains(".livetap"));
    }

    #[test]
    fn default_config_roundtrips() {
        let config = LiveConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: LiveConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.history.capacity, 100);
        assert_eq!(parsed.media.recorder, "ffmpeg");
    }

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load_config_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.reconnect.max_attempts, 5);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[source]\ncommand = \"live-bridge\"\nhandshake_timeout_ms = 2000\nfetch_room_info = true\nprocess_initial_data = false\n",
        )
        .unwrap();
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.source.command.as_deref(), Some("live-bridge"));
        assert!(!cfg.source.process_initial_data);
        assert_eq!(cfg.history.default_count, 10);
    }
}
