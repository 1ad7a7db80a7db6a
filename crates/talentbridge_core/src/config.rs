use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::AdminCredentials;
use crate::calls::DEFAULT_CALL_TICK_INTERVAL;
use crate::waiting_room::DEFAULT_ADMISSION_POLL_INTERVAL;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Directory holding the JSON store. `None` keeps everything in memory.
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default = "default_admission_poll_interval_ms")]
    pub admission_poll_interval_ms: u64,
    #[serde(default = "default_call_tick_interval_ms")]
    pub call_tick_interval_ms: u64,
    #[serde(default = "default_seed_sample_data")]
    pub seed_sample_data: bool,
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            admission_poll_interval_ms: default_admission_poll_interval_ms(),
            call_tick_interval_ms: default_call_tick_interval_ms(),
            seed_sample_data: default_seed_sample_data(),
            admin_email: default_admin_email(),
            admin_password: default_admin_password(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(config_json: &str) -> serde_json::Result<Self> {
        if config_json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(config_json)
    }

    pub fn admission_poll_interval(&self) -> Duration {
        Duration::from_millis(self.admission_poll_interval_ms.max(1))
    }

    pub fn call_tick_interval(&self) -> Duration {
        Duration::from_millis(self.call_tick_interval_ms.max(1))
    }

    pub fn admin_credentials(&self) -> AdminCredentials {
        AdminCredentials {
            email: self.admin_email.clone(),
            password: self.admin_password.clone(),
        }
    }
}

fn default_admission_poll_interval_ms() -> u64 {
    DEFAULT_ADMISSION_POLL_INTERVAL.as_millis() as u64
}

fn default_call_tick_interval_ms() -> u64 {
    DEFAULT_CALL_TICK_INTERVAL.as_millis() as u64
}

fn default_seed_sample_data() -> bool {
    true
}

fn default_admin_email() -> String {
    AdminCredentials::default().email
}

fn default_admin_password() -> String {
    AdminCredentials::default().password
}
