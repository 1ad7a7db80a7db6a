use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use tempfile::NamedTempFile;

use super::schema::{PersistedState, CURRENT_SCHEMA_VERSION};
use super::{StoreBackend, StoreLock};

pub const STORE_FILE_NAME: &str = "talentbridge-store.json";
const LOCK_FILE_NAME: &str = "talentbridge-store.lock";

#[derive(Clone)]
pub struct JsonFileBackend {
    db_path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            db_path: base_dir.join(STORE_FILE_NAME),
            lock_path: base_dir.join(LOCK_FILE_NAME),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.db_path
    }

    fn read_state(&self) -> Result<PersistedState> {
        self.ensure_store_exists()?;
        let raw = fs::read_to_string(&self.db_path)
            .with_context(|| format!("failed to read {}", self.db_path.display()))?;

        if raw.trim().is_empty() {
            return Ok(PersistedState::default());
        }

        serde_json::from_str(&raw).with_context(|| {
            format!(
                "failed to deserialize talentbridge store from {}",
                self.db_path.display()
            )
        })
    }

    fn write_state(&self, state: &PersistedState) -> Result<()> {
        self.ensure_parent_dir()?;
        let dir = self
            .db_path
            .parent()
            .context("store path has no parent directory")?;

        // Unique per writer so concurrent handles never share a tmp file.
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create tmp file in {}", dir.display()))?;
        serde_json::to_writer_pretty(&mut tmp, state)?;
        tmp.flush()
            .with_context(|| format!("failed to write {}", tmp.path().display()))?;
        tmp.persist(&self.db_path).with_context(|| {
            format!("failed to atomically replace {}", self.db_path.display())
        })?;

        Ok(())
    }

    /// Exclusive advisory lock on a sidecar file. The store file itself is
    /// replaced on every write, so it cannot carry the lock.
    fn acquire_lock(&self) -> Result<StoreLock> {
        self.ensure_parent_dir()?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .with_context(|| format!("failed to open {}", self.lock_path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("failed to lock {}", self.lock_path.display()))?;
        Ok(StoreLock::file(file))
    }

    fn ensure_store_exists(&self) -> Result<()> {
        if self.db_path.exists() {
            return Ok(());
        }

        self.write_state(&PersistedState::default())
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        Ok(())
    }
}

impl StoreBackend for JsonFileBackend {
    fn load(&self) -> Result<PersistedState> {
        self.read_state()
    }

    fn persist(&self, state: &PersistedState) -> Result<()> {
        self.write_state(state)
    }

    fn lock(&self) -> Result<StoreLock> {
        self.acquire_lock()
    }

    fn migrate_if_needed(&self) -> Result<()> {
        let _lock = self.acquire_lock()?;
        let mut state = self.read_state()?;
        if state.schema_version < CURRENT_SCHEMA_VERSION {
            tracing::info!(
                from = state.schema_version,
                to = CURRENT_SCHEMA_VERSION,
                path = %self.db_path.display(),
                "migrating local store"
            );
            state.schema_version = CURRENT_SCHEMA_VERSION;
            self.write_state(&state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_creates_store_on_first_read() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nested"));

        let state = backend.load().unwrap();
        assert_eq!(state, PersistedState::default());
        assert!(backend.path().exists());
    }

    #[test]
    fn test_empty_file_reads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().to_path_buf());
        fs::write(backend.path(), "  \n").unwrap();

        assert_eq!(backend.load().unwrap(), PersistedState::default());
    }

    #[test]
    fn test_persist_leaves_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().to_path_buf());
        let mut state = PersistedState::default();
        state.entries.insert("user".to_string(), json!({ "id": "1" }));

        backend.persist(&state).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name != STORE_FILE_NAME)
            .collect();
        assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");
        assert_eq!(backend.load().unwrap(), state);
    }

    #[test]
    fn test_migrate_bumps_old_schema() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().to_path_buf());
        fs::write(
            backend.path(),
            r#"{"schemaVersion":1,"entries":{"waitingRoom":[]}}"#,
        )
        .unwrap();

        backend.migrate_if_needed().unwrap();

        let state = backend.load().unwrap();
        assert_eq!(state.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(state.entries["waitingRoom"], json!([]));
    }

    #[test]
    fn test_corrupt_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().to_path_buf());
        fs::write(backend.path(), "{not json").unwrap();

        let error = backend.load().unwrap_err();
        assert!(format!("{error:#}").contains(STORE_FILE_NAME));
    }
}
