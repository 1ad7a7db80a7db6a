//! Headless core of TalentBridge.
//!
//! [`Runtime`] bundles the local store, the call-admission flow, the
//! moderation dashboard and the mock procedure backend behind a single JSON
//! request/response entry point, [`Runtime::invoke_json`]. Server-pushed
//! updates (admission, call ticks) are delivered through the callback set
//! with [`Runtime::set_event_callback`].

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{runtime::Handle, task::JoinHandle};

pub mod backend;
pub mod calls;
mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod moderation;
pub mod session;
pub mod storage;
pub mod waiting_room;

pub use config::RuntimeConfig;
pub use error::{CoreError, Result};

use backend::MockBackend;
use calls::{ActiveCallManager, ScheduledCalls};
use events::EventEmitter;
use moderation::Moderation;
use session::LocalSession;
use storage::LocalStore;
use waiting_room::WaitingRoom;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    pub command: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeError {
    pub code: String,
    pub message: String,
}

impl From<CoreError> for InvokeError {
    fn from(error: CoreError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<InvokeError>,
}

type WatcherKey = (String, String);

pub struct Runtime {
    config: RuntimeConfig,
    store: LocalStore,
    backend: MockBackend,
    session: LocalSession,
    waiting_room: WaitingRoom,
    scheduled: ScheduledCalls,
    moderation: Moderation,
    active_call: ActiveCallManager,
    emitter: EventEmitter,
    admission_watchers: Arc<Mutex<HashMap<WatcherKey, JoinHandle<()>>>>,
    tasks: Handle,
    /// Taken on drop and shut down without blocking, so a `Runtime` may be
    /// dropped from inside another tokio runtime.
    task_runtime: Option<tokio::runtime::Runtime>,
}

impl Runtime {
    pub fn new(config_json: &str) -> anyhow::Result<Self> {
        let config = RuntimeConfig::from_json(config_json)?;
        Ok(Self::with_config(config)?)
    }

    pub fn with_config(config: RuntimeConfig) -> Result<Self> {
        let store = match config.data_dir.as_deref() {
            Some(dir) => LocalStore::open(PathBuf::from(dir))?,
            None => LocalStore::in_memory(),
        };
        let backend = if config.seed_sample_data {
            MockBackend::with_sample_data(config.admin_credentials())
        } else {
            MockBackend::empty(config.admin_credentials())
        };

        let task_runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("talentbridge-runtime")
            .enable_time()
            .build()
            .map_err(|error| CoreError::Internal(format!("failed to start task runtime: {error}")))?;

        let emitter = EventEmitter::new();
        let scheduled = ScheduledCalls::new(store.clone());
        let active_call = ActiveCallManager::new(
            task_runtime.handle().clone(),
            scheduled.clone(),
            emitter.clone(),
            config.call_tick_interval(),
        );

        tracing::info!(
            persistent = config.data_dir.is_some(),
            seeded = config.seed_sample_data,
            "runtime initialized"
        );

        Ok(Self {
            session: LocalSession::new(store.clone()),
            waiting_room: WaitingRoom::new(store.clone()),
            moderation: Moderation::new(store.clone()),
            scheduled,
            active_call,
            backend,
            store,
            emitter,
            admission_watchers: Arc::new(Mutex::new(HashMap::new())),
            config,
            tasks: task_runtime.handle().clone(),
            task_runtime: Some(task_runtime),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn waiting_room(&self) -> &WaitingRoom {
        &self.waiting_room
    }

    pub fn backend(&self) -> &MockBackend {
        &self.backend
    }

    pub fn set_event_callback<F>(&self, callback: F)
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.emitter.set_callback(callback);
    }

    pub fn clear_event_callback(&self) {
        self.emitter.clear_callback();
    }

    pub fn invoke_json(&self, request_json: &str) -> String {
        let parsed = serde_json::from_str::<InvokeRequest>(request_json);
        let response = match parsed {
            Ok(request) => self.invoke(request),
            Err(error) => Err(InvokeError {
                code: "invalid_request".to_string(),
                message: format!("invalid request JSON: {error}"),
            }),
        };

        let payload = match response {
            Ok(data) => InvokeResponse {
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(error) => InvokeResponse {
                ok: false,
                data: None,
                error: Some(error),
            },
        };

        serde_json::to_string(&payload).unwrap_or_else(|_| {
            r#"{"ok":false,"error":{"code":"serialization_failure","message":"failed to serialize response"}}"#
                .to_string()
        })
    }

    pub fn invoke(&self, request: InvokeRequest) -> std::result::Result<Value, InvokeError> {
        let command = request.command;
        let result = self.dispatch(&command, request.payload);
        if let Err(error) = &result {
            match error {
                CoreError::Storage(_) | CoreError::Internal(_) => {
                    tracing::error!(command = %command, %error, "command failed");
                }
                _ => tracing::debug!(command = %command, code = error.code(), "command rejected"),
            }
        }
        result.map_err(InvokeError::from)
    }

    fn dispatch(&self, command: &str, payload: Value) -> Result<Value> {
        let (namespace, method) = command
            .split_once('.')
            .ok_or_else(|| CoreError::UnknownCommand(command.to_string()))?;

        let result = match namespace {
            "session" | "auth" => commands::auth::handle(self, namespace, method, payload),
            "jobs" => commands::jobs::handle(self, method, payload),
            "posts" | "users" => commands::social::handle(self, namespace, method, payload),
            "calls" | "waitingRoom" | "activeCall" => {
                commands::calls::handle(self, namespace, method, payload)
            }
            "admin" | "applications" => commands::admin::handle(self, namespace, method, payload),
            _ => Err(CoreError::UnknownCommand(command.to_string())),
        };

        match result {
            Err(CoreError::UnknownCommand(_)) => Err(CoreError::UnknownCommand(command.to_string())),
            other => other,
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if let Ok(mut watchers) = self.admission_watchers.lock() {
            for (_, watcher) in watchers.drain() {
                watcher.abort();
            }
        }
        if let Some(task_runtime) = self.task_runtime.take() {
            task_runtime.shutdown_background();
        }
    }
}

pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
