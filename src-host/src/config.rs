//! Host configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use talentbridge_core::RuntimeConfig;

#[derive(Debug, Clone)]
pub struct HostConfig {
    pub data_dir: PathBuf,
    pub admission_poll_ms: Option<u64>,
    pub call_tick_ms: Option<u64>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl HostConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `TALENTBRIDGE_DATA_DIR` | Directory of the shared JSON store | local data dir + `talentbridge` |
    /// | `TALENTBRIDGE_POLL_MS` | Admission poll interval | `2000` |
    /// | `TALENTBRIDGE_TICK_MS` | Call timer tick | `1000` |
    /// | `TALENTBRIDGE_ADMIN_EMAIL` | Moderation login | `admin@talentbridge.app` |
    /// | `TALENTBRIDGE_ADMIN_PASSWORD` | Moderation password | `admin123` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = lookup("TALENTBRIDGE_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        Ok(Self {
            data_dir,
            admission_poll_ms: millis(&lookup, "TALENTBRIDGE_POLL_MS")?,
            call_tick_ms: millis(&lookup, "TALENTBRIDGE_TICK_MS")?,
            admin_email: lookup("TALENTBRIDGE_ADMIN_EMAIL"),
            admin_password: lookup("TALENTBRIDGE_ADMIN_PASSWORD"),
        })
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        let mut config = RuntimeConfig {
            data_dir: Some(self.data_dir.to_string_lossy().into_owned()),
            ..RuntimeConfig::default()
        };
        if let Some(ms) = self.admission_poll_ms {
            config.admission_poll_interval_ms = ms;
        }
        if let Some(ms) = self.call_tick_ms {
            config.call_tick_interval_ms = ms;
        }
        if let Some(email) = &self.admin_email {
            config.admin_email = email.clone();
        }
        if let Some(password) = &self.admin_password {
            config.admin_password = password.clone();
        }
        config
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Some(ms)),
        _ => Err(ConfigError::InvalidInterval { name, value: raw }),
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_local_dir() {
        return dir.join("talentbridge");
    }

    env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".talentbridge")
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a positive number of milliseconds, got {value:?}")]
    InvalidInterval { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = HostConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.data_dir.ends_with("talentbridge") || config.data_dir.ends_with(".talentbridge"));

        let runtime = config.runtime_config();
        assert_eq!(runtime.admission_poll_interval_ms, 2000);
        assert_eq!(runtime.call_tick_interval_ms, 1000);
        assert!(runtime.data_dir.is_some());
    }

    #[test]
    fn test_overrides_apply() {
        let config = HostConfig::from_lookup(lookup(&[
            ("TALENTBRIDGE_DATA_DIR", "/tmp/tb-demo"),
            ("TALENTBRIDGE_POLL_MS", "250"),
            ("TALENTBRIDGE_ADMIN_EMAIL", "ops@example.com"),
        ]))
        .unwrap();

        let runtime = config.runtime_config();
        assert_eq!(runtime.data_dir.as_deref(), Some("/tmp/tb-demo"));
        assert_eq!(runtime.admission_poll_interval_ms, 250);
        assert_eq!(runtime.admin_email, "ops@example.com");
        assert_eq!(runtime.admin_password, "admin123");
    }

    #[test]
    fn test_rejects_bad_interval() {
        for value in ["soon", "0"] {
            let error =
                HostConfig::from_lookup(lookup(&[("TALENTBRIDGE_TICK_MS", value)])).unwrap_err();
            assert!(error.to_string().starts_with("TALENTBRIDGE_TICK_MS"));
        }
    }
}
