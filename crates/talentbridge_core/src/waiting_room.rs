//! Waiting room registrar, admission console and candidate-side admission
//! watch.
//!
//! Entries live under the `waitingRoom` key and are keyed by
//! `(callId, candidateName)`. Every mutation runs as one atomic store update,
//! and admissions and removals are published on a broadcast channel so a
//! waiting candidate learns of them without polling. A slow poll of the store
//! is kept as a fallback for writers in other processes.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::MissedTickBehavior;

use crate::error::{CoreError, Result};
use crate::models::WaitingRoomEntry;
use crate::storage::{LocalStore, StoreKey};

const ADMISSION_CHANNEL_CAPACITY: usize = 64;

pub const DEFAULT_ADMISSION_POLL_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionEvent {
    Registered(WaitingRoomEntry),
    Admitted(WaitingRoomEntry),
    Removed {
        call_id: String,
        candidate_name: String,
    },
}

#[derive(Clone)]
pub struct WaitingRoom {
    store: LocalStore,
    events: broadcast::Sender<AdmissionEvent>,
}

impl WaitingRoom {
    pub fn new(store: LocalStore) -> Self {
        let (events, _) = broadcast::channel(ADMISSION_CHANNEL_CAPACITY);
        Self { store, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AdmissionEvent> {
        self.events.subscribe()
    }

    /// Upserts the candidate's entry as not yet admitted with a fresh
    /// timestamp.
    pub fn register(&self, call_id: &str, candidate_name: &str) -> Result<WaitingRoomEntry> {
        let (call_id, candidate_name) = normalize(call_id, candidate_name)?;
        let entry = WaitingRoomEntry {
            call_id,
            candidate_name,
            is_admitted: false,
            timestamp: Utc::now().timestamp_millis(),
        };

        let stored = entry.clone();
        let replaced = self
            .store
            .update(StoreKey::WaitingRoom, |entries: &mut Vec<WaitingRoomEntry>| {
                match entries
                    .iter_mut()
                    .find(|existing| existing.matches(&stored.call_id, &stored.candidate_name))
                {
                    Some(existing) => {
                        *existing = stored;
                        Ok(true)
                    }
                    None => {
                        entries.push(stored);
                        Ok(false)
                    }
                }
            })
            .inspect_err(|error| {
                tracing::warn!(call_id = %entry.call_id, candidate = %entry.candidate_name, %error, "waiting room registration failed");
            })?;

        tracing::info!(
            call_id = %entry.call_id,
            candidate = %entry.candidate_name,
            replaced,
            "candidate entered waiting room"
        );
        let _ = self.events.send(AdmissionEvent::Registered(entry.clone()));
        Ok(entry)
    }

    pub fn entry(&self, call_id: &str, candidate_name: &str) -> Result<Option<WaitingRoomEntry>> {
        let (call_id, candidate_name) = normalize(call_id, candidate_name)?;
        Ok(self
            .store
            .get_list::<WaitingRoomEntry>(StoreKey::WaitingRoom)?
            .into_iter()
            .find(|entry| entry.matches(&call_id, &candidate_name)))
    }

    /// Un-admitted entries for `call_id`, in insertion order.
    pub fn waiting(&self, call_id: &str) -> Result<Vec<WaitingRoomEntry>> {
        let call_id = call_id.trim();
        Ok(self
            .store
            .get_list::<WaitingRoomEntry>(StoreKey::WaitingRoom)?
            .into_iter()
            .filter(|entry| entry.call_id == call_id && !entry.is_admitted)
            .collect())
    }

    /// Flips `isAdmitted` on the matching entry. Admitting twice is a no-op
    /// and publishes nothing the second time.
    pub fn admit(&self, call_id: &str, candidate_name: &str) -> Result<WaitingRoomEntry> {
        let (call_id, candidate_name) = normalize(call_id, candidate_name)?;
        let (call_id, candidate_name) = (call_id.as_str(), candidate_name.as_str());
        let (entry, changed) = self.store.update(
            StoreKey::WaitingRoom,
            |entries: &mut Vec<WaitingRoomEntry>| {
                let entry = entries
                    .iter_mut()
                    .find(|entry| entry.matches(call_id, candidate_name))
                    .ok_or_else(|| missing_entry(call_id, candidate_name))?;
                let changed = !entry.is_admitted;
                entry.is_admitted = true;
                Ok((entry.clone(), changed))
            },
        )?;

        if changed {
            tracing::info!(call_id, candidate = candidate_name, "candidate admitted");
            let _ = self.events.send(AdmissionEvent::Admitted(entry.clone()));
        }
        Ok(entry)
    }

    /// Host-side removal; fails when no entry matches.
    pub fn remove(&self, call_id: &str, candidate_name: &str) -> Result<WaitingRoomEntry> {
        let (call_id, candidate_name) = normalize(call_id, candidate_name)?;
        let (call_id, candidate_name) = (call_id.as_str(), candidate_name.as_str());
        let removed = self.store.update(
            StoreKey::WaitingRoom,
            |entries: &mut Vec<WaitingRoomEntry>| {
                let position = entries
                    .iter()
                    .position(|entry| entry.matches(call_id, candidate_name))
                    .ok_or_else(|| missing_entry(call_id, candidate_name))?;
                Ok(entries.remove(position))
            },
        )?;

        tracing::info!(call_id, candidate = candidate_name, "candidate removed from waiting room");
        self.publish_removed(call_id, candidate_name);
        Ok(removed)
    }

    /// Candidate-side exit. Leaving a room you are not in is not an error.
    pub fn leave(&self, call_id: &str, candidate_name: &str) -> Result<bool> {
        let (call_id, candidate_name) = normalize(call_id, candidate_name)?;
        let (call_id, candidate_name) = (call_id.as_str(), candidate_name.as_str());
        let removed = self.store.update(
            StoreKey::WaitingRoom,
            |entries: &mut Vec<WaitingRoomEntry>| {
                let before = entries.len();
                entries.retain(|entry| !entry.matches(call_id, candidate_name));
                Ok(entries.len() != before)
            },
        )?;

        if removed {
            tracing::info!(call_id, candidate = candidate_name, "candidate left waiting room");
            self.publish_removed(call_id, candidate_name);
        }
        Ok(removed)
    }

    /// Refuses to start while anyone for this call is still waiting.
    pub fn ensure_ready_to_start(&self, call_id: &str) -> Result<()> {
        let count = self.waiting(call_id)?.len();
        if count > 0 {
            tracing::debug!(call_id, count, "start refused, candidates waiting");
            return Err(CoreError::CandidatesWaiting { count });
        }
        Ok(())
    }

    /// Resolves once the candidate's entry is admitted.
    ///
    /// Listens for admission events and re-reads the store every
    /// `poll_interval` to pick up writes made by another process. The entry
    /// must already be registered; if it is missing or gets removed the wait
    /// ends with [`CoreError::RemovedFromWaitingRoom`].
    pub async fn wait_for_admission(
        &self,
        call_id: &str,
        candidate_name: &str,
        poll_interval: Duration,
    ) -> Result<WaitingRoomEntry> {
        let (call_id, candidate_name) = normalize(call_id, candidate_name)?;
        let (call_id, candidate_name) = (call_id.as_str(), candidate_name.as_str());
        let mut events = self.subscribe();
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll_entry(call_id, candidate_name).await? {
                        Some(entry) if entry.is_admitted => return Ok(entry),
                        Some(_) => {}
                        None => return Err(removed_error(call_id, candidate_name)),
                    }
                }
                event = events.recv() => match event {
                    Ok(AdmissionEvent::Admitted(entry)) if entry.matches(call_id, candidate_name) => {
                        return Ok(entry);
                    }
                    Ok(AdmissionEvent::Removed { call_id: removed_call, candidate_name: removed_name })
                        if removed_call == call_id && removed_name == candidate_name =>
                    {
                        return Err(removed_error(call_id, candidate_name));
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(call_id, skipped, "admission watcher lagged, relying on poll");
                    }
                    Err(RecvError::Closed) => {
                        return Err(anyhow::anyhow!("admission channel closed").into());
                    }
                }
            }
        }
    }

    /// Reads the entry on the blocking pool; the store does file I/O under a lock.
    async fn poll_entry(&self, call_id: &str, candidate_name: &str) -> Result<Option<WaitingRoomEntry>> {
        let room = self.clone();
        let (call_id, candidate_name) = (call_id.to_string(), candidate_name.to_string());
        tokio::task::spawn_blocking(move || room.entry(&call_id, &candidate_name))
            .await
            .map_err(|error| CoreError::Internal(format!("admission poll task failed: {error}")))?
    }

    fn publish_removed(&self, call_id: &str, candidate_name: &str) {
        let _ = self.events.send(AdmissionEvent::Removed {
            call_id: call_id.to_string(),
            candidate_name: candidate_name.to_string(),
        });
    }
}

fn normalize(call_id: &str, candidate_name: &str) -> Result<(String, String)> {
    let call_id = call_id.trim();
    let candidate_name = candidate_name.trim();
    if call_id.is_empty() {
        return Err(CoreError::invalid("callId cannot be empty"));
    }
    if candidate_name.is_empty() {
        return Err(CoreError::invalid("candidateName cannot be empty"));
    }
    Ok((call_id.to_string(), candidate_name.to_string()))
}

fn missing_entry(call_id: &str, candidate_name: &str) -> CoreError {
    CoreError::not_found("Waiting room entry", format!("{call_id}/{candidate_name}"))
}

fn removed_error(call_id: &str, candidate_name: &str) -> CoreError {
    CoreError::RemovedFromWaitingRoom {
        call_id: call_id.to_string(),
        candidate: candidate_name.to_string(),
    }
}
