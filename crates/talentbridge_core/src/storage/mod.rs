//! Local key-value store shared by every client screen.
//!
//! All reads and writes go through [`LocalStore`], which serializes
//! read-modify-write cycles behind one lock and notifies subscribers after
//! each successful write. Every operation reloads from the backend so that a
//! second process sharing the same file sees fresh data on its next read.

use std::{
    fmt,
    fs::File,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::broadcast;

use crate::error::Result;

pub mod json_repo;
pub mod schema;

use json_repo::JsonFileBackend;
use schema::PersistedState;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    User,
    WaitingRoom,
    ScheduledCalls,
    Applications,
    PostedJobs,
    ProfessionalApplications,
    RecruiterApplications,
    CompanyApplications,
    JobPostings,
    Companies,
}

impl StoreKey {
    pub const ALL: [StoreKey; 10] = [
        Self::User,
        Self::WaitingRoom,
        Self::ScheduledCalls,
        Self::Applications,
        Self::PostedJobs,
        Self::ProfessionalApplications,
        Self::RecruiterApplications,
        Self::CompanyApplications,
        Self::JobPostings,
        Self::Companies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::WaitingRoom => "waitingRoom",
            Self::ScheduledCalls => "scheduledCalls",
            Self::Applications => "applications",
            Self::PostedJobs => "postedJobs",
            Self::ProfessionalApplications => "professionalApplications",
            Self::RecruiterApplications => "recruiterApplications",
            Self::CompanyApplications => "companyApplications",
            Self::JobPostings => "jobPostings",
            Self::Companies => "companies",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == raw)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait StoreBackend: Send + Sync {
    fn load(&self) -> anyhow::Result<PersistedState>;
    fn persist(&self, state: &PersistedState) -> anyhow::Result<()>;

    /// Held across every load/persist cycle. Backends shared between
    /// processes return a guard that excludes the other writers.
    fn lock(&self) -> anyhow::Result<StoreLock> {
        Ok(StoreLock::default())
    }

    fn migrate_if_needed(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Guard returned by [`StoreBackend::lock`]; released on drop.
#[derive(Debug, Default)]
pub struct StoreLock {
    _file: Option<File>,
}

impl StoreLock {
    pub fn file(file: File) -> Self {
        Self { _file: Some(file) }
    }
}

/// Process-memory backend; contents vanish with the process.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<PersistedState>,
}

impl StoreBackend for MemoryBackend {
    fn load(&self) -> anyhow::Result<PersistedState> {
        Ok(self
            .state
            .lock()
            .expect("memory store mutex poisoned")
            .clone())
    }

    fn persist(&self, state: &PersistedState) -> anyhow::Result<()> {
        *self.state.lock().expect("memory store mutex poisoned") = state.clone();
        Ok(())
    }
}

/// Several keys changed under one lock and persisted once.
pub struct StoreTransaction<'a> {
    state: &'a mut PersistedState,
    touched: Vec<StoreKey>,
}

impl StoreTransaction<'_> {
    pub fn update<T, R, F>(&mut self, key: StoreKey, apply: F) -> Result<R>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let mut value = match self.state.entries.get(key.as_str()) {
            Some(raw) => decode::<T>(key, raw.clone())?,
            None => T::default(),
        };
        let result = apply(&mut value)?;
        self.write(key, &value)?;
        Ok(result)
    }

    /// Leaves an absent key absent and returns `Ok(None)` without calling
    /// `apply`.
    pub fn update_existing<T, R, F>(&mut self, key: StoreKey, apply: F) -> Result<Option<R>>
    where
        T: DeserializeOwned + Serialize,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let Some(raw) = self.state.entries.get(key.as_str()) else {
            return Ok(None);
        };
        let mut value = decode::<T>(key, raw.clone())?;
        let result = apply(&mut value)?;
        self.write(key, &value)?;
        Ok(Some(result))
    }

    fn write<T: Serialize>(&mut self, key: StoreKey, value: &T) -> Result<()> {
        self.state
            .entries
            .insert(key.as_str().to_string(), encode(key, value)?);
        if !self.touched.contains(&key) {
            self.touched.push(key);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn StoreBackend>,
    lock: Arc<Mutex<()>>,
    changes: broadcast::Sender<StoreKey>,
}

impl LocalStore {
    pub fn with_backend(backend: Arc<dyn StoreBackend>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            backend,
            lock: Arc::new(Mutex::new(())),
            changes,
        }
    }

    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryBackend::default()))
    }

    pub fn open(base_dir: PathBuf) -> Result<Self> {
        let backend = JsonFileBackend::new(base_dir);
        backend.migrate_if_needed()?;
        tracing::info!(path = %backend.path().display(), "opened local store");
        Ok(Self::with_backend(Arc::new(backend)))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreKey> {
        self.changes.subscribe()
    }

    pub fn contains(&self, key: StoreKey) -> Result<bool> {
        self.read(|state| Ok(state.entries.contains_key(key.as_str())))
    }

    pub fn get<T: DeserializeOwned>(&self, key: StoreKey) -> Result<Option<T>> {
        self.read(|state| match state.entries.get(key.as_str()) {
            Some(value) => Ok(Some(decode(key, value.clone())?)),
            None => Ok(None),
        })
    }

    /// Reads a list-valued key, treating an absent key as empty.
    pub fn get_list<T: DeserializeOwned>(&self, key: StoreKey) -> Result<Vec<T>> {
        Ok(self.get::<Vec<T>>(key)?.unwrap_or_default())
    }

    pub fn set<T: Serialize>(&self, key: StoreKey, value: &T) -> Result<()> {
        self.transaction(|txn| txn.write(key, value))
    }

    pub fn remove(&self, key: StoreKey) -> Result<bool> {
        let removed = {
            let _guard = self.lock.lock().expect("local store mutex poisoned");
            let _file_lock = self.backend.lock()?;
            let mut state = self.backend.load()?;
            let removed = state.entries.remove(key.as_str()).is_some();
            if removed {
                self.backend.persist(&state)?;
            }
            removed
        };
        if removed {
            self.notify(key);
        }
        Ok(removed)
    }

    /// Atomic read-modify-write of one key.
    ///
    /// The store lock is held across load, mutation and persist. An absent
    /// key starts from `T::default()`. When `apply` fails nothing is written.
    pub fn update<T, R, F>(&self, key: StoreKey, apply: F) -> Result<R>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> Result<R>,
    {
        self.transaction(|txn| txn.update(key, apply))
    }

    /// Like [`LocalStore::update`], but leaves an absent key absent and
    /// returns `Ok(None)` without calling `apply`.
    pub fn update_existing<T, R, F>(&self, key: StoreKey, apply: F) -> Result<Option<R>>
    where
        T: DeserializeOwned + Serialize,
        F: FnOnce(&mut T) -> Result<R>,
    {
        self.transaction(|txn| txn.update_existing(key, apply))
    }

    /// Runs `apply` against every key it touches under one lock. The state is
    /// persisted once at the end, and not at all if `apply` fails.
    pub fn transaction<R, F>(&self, apply: F) -> Result<R>
    where
        F: FnOnce(&mut StoreTransaction<'_>) -> Result<R>,
    {
        let (result, touched) = {
            let _guard = self.lock.lock().expect("local store mutex poisoned");
            let _file_lock = self.backend.lock()?;
            let mut state = self.backend.load()?;
            let mut txn = StoreTransaction {
                state: &mut state,
                touched: Vec::new(),
            };
            let result = apply(&mut txn)?;
            let touched = txn.touched;
            if !touched.is_empty() {
                self.backend.persist(&state)?;
            }
            (result, touched)
        };
        for key in touched {
            self.notify(key);
        }
        Ok(result)
    }

    fn read<R>(&self, apply: impl FnOnce(&PersistedState) -> Result<R>) -> Result<R> {
        let _guard = self.lock.lock().expect("local store mutex poisoned");
        let _file_lock = self.backend.lock()?;
        apply(&self.backend.load()?)
    }

    fn notify(&self, key: StoreKey) {
        tracing::trace!(key = %key, "local store key changed");
        let _ = self.changes.send(key);
    }
}

fn decode<T: DeserializeOwned>(key: StoreKey, value: serde_json::Value) -> Result<T> {
    Ok(serde_json::from_value(value)
        .with_context(|| format!("stored value under `{key}` has an unexpected shape"))?)
}

fn encode<T: Serialize>(key: StoreKey, value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)
        .with_context(|| format!("failed to encode value for `{key}`"))?)
}
