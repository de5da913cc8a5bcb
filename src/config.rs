//! Layered configuration: CLI flags and environment, then the config file, then defaults.

use crate::model::ViewerRole;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub role: Option<ViewerRole>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

/// Values supplied on the command line (or through their environment variables).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub role: Option<ViewerRole>,
    pub user_id: Option<u64>,
    pub timeout: Option<Duration>,
}

/// Fully resolved settings used by the API client and the views.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub token: Option<String>,
    pub role: ViewerRole,
    /// Needed to tell whether the viewer is the invitee or approver of an invitation.
    pub user_id: Option<u64>,
    pub timeout: Duration,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("supervision-cli").join("config.toml"))
}

/// Read a config file. A missing default file is not an error; a missing explicit one is.
pub fn load_file(path: &Path, explicit: bool) -> Result<FileConfig> {
    if !explicit && !path.exists() {
        return Ok(FileConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parse config file {}", path.display()))
}

pub fn resolve(overrides: Overrides) -> Result<Settings> {
    let file = match overrides.config_path.as_deref() {
        Some(path) => load_file(path, true)?,
        None => match default_config_path() {
            Some(path) => load_file(&path, false)?,
            None => FileConfig::default(),
        },
    };
    Ok(merge(overrides, file))
}

fn merge(overrides: Overrides, file: FileConfig) -> Settings {
    Settings {
        base_url: overrides
            .base_url
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        token: overrides.token.or(file.token).filter(|t| !t.trim().is_empty()),
        role: overrides.role.or(file.role).unwrap_or(ViewerRole::Student),
        user_id: overrides.user_id.or(file.user_id),
        timeout: overrides
            .timeout
            .or(file.timeout)
            .unwrap_or(DEFAULT_TIMEOUT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_nothing_is_set() {
        let s = merge(Overrides::default(), FileConfig::default());
        assert_eq!(s.base_url, DEFAULT_BASE_URL);
        assert_eq!(s.role, ViewerRole::Student);
        assert_eq!(s.timeout, DEFAULT_TIMEOUT);
        assert!(s.token.is_none());
    }

    #[test]
    fn flags_win_over_file() {
        let file: FileConfig = toml::from_str(
            r#"
base_url = "https://portal.uni.edu/api"
token = "from-file"
role = "supervisor"
user_id = 42
timeout = "10s"
"#,
        )
        .unwrap();
        let s = merge(
            Overrides {
                token: Some("from-flag".into()),
                timeout: Some(Duration::from_secs(3)),
                ..Default::default()
            },
            file,
        );
        assert_eq!(s.base_url, "https://portal.uni.edu/api");
        assert_eq!(s.token.as_deref(), Some("from-flag"));
        assert_eq!(s.role, ViewerRole::Supervisor);
        assert_eq!(s.user_id, Some(42));
        assert_eq!(s.timeout, Duration::from_secs(3));
    }

    #[test]
    fn blank_token_is_ignored() {
        let s = merge(
            Overrides {
                token: Some("  ".into()),
                ..Default::default()
            },
            FileConfig::default(),
        );
        assert!(s.token.is_none());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_file(&missing, true).is_err());
        assert!(load_file(&missing, false).is_ok());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "base_uri = \"typo\"").unwrap();
        let err = load_file(f.path(), true).unwrap_err();
        assert!(format!("{err:#}").contains("parse config file"));
    }

    #[test]
    fn resolve_reads_explicit_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "role = \"supervisor\"\nuser_id = 7").unwrap();
        let s = resolve(Overrides {
            config_path: Some(f.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(s.role, ViewerRole::Supervisor);
        assert_eq!(s.user_id, Some(7));
    }
}
