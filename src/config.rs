use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::notifier::Permission;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Plain dashboard sync with a single fixed test report.
    Basic,
    /// Resolve360 dashboard sync with the template catalog.
    Enhanced,
}

impl Variant {
    pub fn notification_title(&self) -> &'static str {
        match self {
            Variant::Basic => "New Civic Report",
            Variant::Enhanced => "New Resolve360 Report",
        }
    }

    /// Product name used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Variant::Basic => "civic",
            Variant::Enhanced => "Resolve360",
        }
    }
}

impl FromStr for Variant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Variant::Basic),
            "enhanced" => Ok(Variant::Enhanced),
            other => Err(ConfigError::InvalidEnvVar(
                "DASHBOARD_VARIANT".to_string(),
                format!("expected basic or enhanced, got {:?}", other),
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    // Storage
    pub sync_key: String,
    pub data_dir: PathBuf,

    // Timers
    pub poll_interval: Duration,
    pub sync_interval: Duration,

    // Dashboard
    pub variant: Variant,
    /// `None` when the platform has no notification API.
    pub notification_permission: Option<Permission>,
    /// How a pending permission prompt gets answered.
    pub notification_prompt_answer: Permission,
    pub notification_icon: String,
    pub priority_filter: Option<String>,
    pub category_filter: Option<String>,

    // Remote
    pub remote_snapshot_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_key: "civicReports".to_string(),
            data_dir: PathBuf::from("./data"),
            poll_interval: Duration::from_secs(5),
            sync_interval: Duration::from_secs(10),
            variant: Variant::Enhanced,
            notification_permission: Some(Permission::Granted),
            notification_prompt_answer: Permission::Granted,
            notification_icon: "/favicon.ico".to_string(),
            priority_filter: None,
            category_filter: None,
            remote_snapshot_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let optional = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let notification_permission = match env("NOTIFICATION_PERMISSION", "granted").trim() {
            "unsupported" => None,
            other => Some(other.parse::<Permission>().map_err(|e| {
                ConfigError::InvalidEnvVar("NOTIFICATION_PERMISSION".to_string(), e)
            })?),
        };

        let notification_prompt_answer = env("NOTIFICATION_PROMPT_ANSWER", "granted")
            .parse::<Permission>()
            .map_err(|e| ConfigError::InvalidEnvVar("NOTIFICATION_PROMPT_ANSWER".to_string(), e))?;

        let config = Self {
            sync_key: env("SYNC_KEY", "civicReports"),
            data_dir: PathBuf::from(env("DATA_DIR", "./data")),
            poll_interval: parse_duration("POLL_INTERVAL", &env("POLL_INTERVAL", "5s"))?,
            sync_interval: parse_duration("SYNC_INTERVAL", &env("SYNC_INTERVAL", "10s"))?,
            variant: env("DASHBOARD_VARIANT", "enhanced").parse()?,
            notification_permission,
            notification_prompt_answer,
            notification_icon: env("NOTIFICATION_ICON", "/favicon.ico"),
            priority_filter: optional("DASHBOARD_PRIORITY_FILTER"),
            category_filter: optional("DASHBOARD_CATEGORY_FILTER"),
            remote_snapshot_path: optional("REMOTE_SNAPSHOT_PATH").map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if crate::store::validate_key(&self.sync_key).is_err() {
            return Err(ConfigError::InvalidEnvVar(
                "SYNC_KEY".to_string(),
                "must be non-empty and contain only letters, digits, '-' or '_'".to_string(),
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidEnvVar("DATA_DIR".to_string(), "cannot be empty".to_string()));
        }
        if self.notification_prompt_answer == Permission::Default {
            return Err(ConfigError::InvalidEnvVar(
                "NOTIFICATION_PROMPT_ANSWER".to_string(),
                "must be granted or denied".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidEnvVar("POLL_INTERVAL".to_string(), "must be positive".to_string()));
        }
        if self.sync_interval.is_zero() {
            return Err(ConfigError::InvalidEnvVar("SYNC_INTERVAL".to_string(), "must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.sync_key, "civicReports");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.sync_interval, Duration::from_secs(10));
        assert_eq!(config.variant, Variant::Enhanced);
        assert_eq!(config.notification_permission, Some(Permission::Granted));
        assert_eq!(config.notification_prompt_answer, Permission::Granted);
        assert_eq!(config.notification_icon, "/favicon.ico");
        assert_eq!(config.priority_filter, None);
        assert_eq!(config.remote_snapshot_path, None);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SYNC_KEY", "reports-dev"),
            ("POLL_INTERVAL", "250ms"),
            ("SYNC_INTERVAL", "1m"),
            ("DASHBOARD_VARIANT", "Basic"),
            ("NOTIFICATION_PERMISSION", "unsupported"),
            ("DASHBOARD_PRIORITY_FILTER", "critical"),
            ("DASHBOARD_CATEGORY_FILTER", "  "),
            ("REMOTE_SNAPSHOT_PATH", "/tmp/reports.json"),
        ])
        .unwrap();
        assert_eq!(config.sync_key, "reports-dev");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.sync_interval, Duration::from_secs(60));
        assert_eq!(config.variant, Variant::Basic);
        assert_eq!(config.notification_permission, None);
        assert_eq!(config.priority_filter.as_deref(), Some("critical"));
        assert_eq!(config.category_filter, None);
        assert_eq!(config.remote_snapshot_path, Some(PathBuf::from("/tmp/reports.json")));
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("POLL_INTERVAL", "soon")]).is_err());
        assert!(load(&[("POLL_INTERVAL", "0s")]).is_err());
        assert!(load(&[("DASHBOARD_VARIANT", "deluxe")]).is_err());
        assert!(load(&[("NOTIFICATION_PERMISSION", "sometimes")]).is_err());
        assert!(load(&[("SYNC_KEY", "civic reports")]).is_err());
        assert!(load(&[("NOTIFICATION_PROMPT_ANSWER", "default")]).is_err());
    }

    #[test]
    fn test_prompt_answer() {
        let config = load(&[
            ("NOTIFICATION_PERMISSION", "default"),
            ("NOTIFICATION_PROMPT_ANSWER", "denied"),
        ])
        .unwrap();
        assert_eq!(config.notification_permission, Some(Permission::Default));
        assert_eq!(config.notification_prompt_answer, Permission::Denied);
    }

    #[test]
    fn test_variant_branding() {
        assert_eq!(Variant::Basic.notification_title(), "New Civic Report");
        assert_eq!(Variant::Enhanced.notification_title(), "New Resolve360 Report");
    }
}
