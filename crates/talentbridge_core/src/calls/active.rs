use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use tokio::{runtime::Handle, sync::watch, task::JoinHandle, time::Instant};

use crate::{
    calls::scheduled::ScheduledCalls,
    error::{CoreError, Result},
    events::{EventEmitter, EVENT_CALL_CONTROLS, EVENT_CALL_STATE, EVENT_CALL_TICK},
    models::{
        ActiveCallParams, ActiveCallSnapshot, CallControls, CallLifecycleState, CallStateEvent,
        CallSummary, CallTickEvent,
    },
};

pub const DEFAULT_CALL_TICK_INTERVAL: Duration = Duration::from_secs(1);

struct RunningCall {
    params: ActiveCallParams,
    controls: CallControls,
    elapsed: Arc<AtomicU64>,
    stop_tx: watch::Sender<bool>,
    ticker: JoinHandle<()>,
}

impl RunningCall {
    fn snapshot(&self) -> ActiveCallSnapshot {
        ActiveCallSnapshot {
            call_id: self.params.call_id.clone(),
            candidate_name: self.params.candidate_name.clone(),
            call_type: self.params.call_type,
            job_title: self.params.job_title.clone(),
            controls: self.controls,
            elapsed_seconds: self.elapsed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Copy)]
enum Control {
    Mute,
    Video,
    Speaker,
}

/// Owns the single in-progress call of this runtime: its local controls and
/// the elapsed-time ticker.
pub struct ActiveCallManager {
    running: Mutex<Option<RunningCall>>,
    handle: Handle,
    scheduled: ScheduledCalls,
    emitter: EventEmitter,
    tick_interval: Duration,
}

impl ActiveCallManager {
    pub fn new(
        handle: Handle,
        scheduled: ScheduledCalls,
        emitter: EventEmitter,
        tick_interval: Duration,
    ) -> Self {
        Self {
            running: Mutex::new(None),
            handle,
            scheduled,
            emitter,
            tick_interval,
        }
    }

    pub fn start(&self, params: ActiveCallParams) -> Result<ActiveCallSnapshot> {
        if params.call_id.trim().is_empty() {
            return Err(CoreError::invalid("callId cannot be empty"));
        }

        let mut guard = self.running.lock().expect("active call mutex poisoned");
        if let Some(running) = guard.as_ref() {
            return Err(CoreError::CallAlreadyActive(running.params.call_id.clone()));
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let elapsed = Arc::new(AtomicU64::new(0));
        let tick = self.tick_interval;
        let tick_elapsed = Arc::clone(&elapsed);
        let tick_emitter = self.emitter.clone();
        let tick_call_id = params.call_id.clone();

        let ticker = self.handle.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + tick, tick);
            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        let elapsed_seconds = tick_elapsed.fetch_add(1, Ordering::Relaxed) + 1;
                        tick_emitter.emit(
                            EVENT_CALL_TICK,
                            &CallTickEvent {
                                call_id: tick_call_id.clone(),
                                elapsed_seconds,
                            },
                        );
                    }
                }
            }
        });

        let running = RunningCall {
            controls: CallControls::for_call_type(params.call_type),
            params,
            elapsed,
            stop_tx,
            ticker,
        };
        let snapshot = running.snapshot();
        *guard = Some(running);
        drop(guard);

        tracing::info!(
            call_id = %snapshot.call_id,
            candidate = %snapshot.candidate_name,
            "call started"
        );
        self.emitter.emit(
            EVENT_CALL_STATE,
            &CallStateEvent {
                call_id: snapshot.call_id.clone(),
                state: CallLifecycleState::Active,
                elapsed_seconds: 0,
            },
        );
        Ok(snapshot)
    }

    pub fn snapshot(&self) -> Option<ActiveCallSnapshot> {
        self.running
            .lock()
            .expect("active call mutex poisoned")
            .as_ref()
            .map(RunningCall::snapshot)
    }

    pub fn toggle_mute(&self) -> Result<CallControls> {
        self.toggle(Control::Mute)
    }

    pub fn toggle_video(&self) -> Result<CallControls> {
        self.toggle(Control::Video)
    }

    pub fn toggle_speaker(&self) -> Result<CallControls> {
        self.toggle(Control::Speaker)
    }

    fn toggle(&self, control: Control) -> Result<CallControls> {
        let (call_id, controls) = {
            let mut guard = self.running.lock().expect("active call mutex poisoned");
            let running = guard.as_mut().ok_or(CoreError::NoActiveCall)?;
            let controls = &mut running.controls;
            match control {
                Control::Mute => controls.muted = !controls.muted,
                Control::Video => controls.video_enabled = !controls.video_enabled,
                Control::Speaker => controls.speaker_on = !controls.speaker_on,
            }
            (running.params.call_id.clone(), *controls)
        };

        self.emitter.emit(
            EVENT_CALL_CONTROLS,
            &serde_json::json!({ "callId": call_id, "controls": controls }),
        );
        Ok(controls)
    }

    /// Stops the ticker and marks the matching scheduled call completed.
    ///
    /// The call ends even when the scheduled call cannot be updated; the
    /// summary reports whether it was.
    pub fn end(&self) -> Result<CallSummary> {
        let running = self
            .running
            .lock()
            .expect("active call mutex poisoned")
            .take()
            .ok_or(CoreError::NoActiveCall)?;

        let _ = running.stop_tx.send(true);
        running.ticker.abort();

        let call_id = running.params.call_id;
        let elapsed_seconds = running.elapsed.load(Ordering::Relaxed);
        let scheduled_call_updated = match self.scheduled.complete(&call_id) {
            Ok(Some(_)) => true,
            Ok(None) => {
                tracing::warn!(call_id = %call_id, "no scheduled call to mark completed");
                false
            }
            Err(error) => {
                tracing::warn!(call_id = %call_id, %error, "failed to mark scheduled call completed");
                false
            }
        };

        tracing::info!(call_id = %call_id, elapsed_seconds, "call ended");
        self.emitter.emit(
            EVENT_CALL_STATE,
            &CallStateEvent {
                call_id: call_id.clone(),
                state: CallLifecycleState::Ended,
                elapsed_seconds,
            },
        );

        Ok(CallSummary {
            call_id,
            elapsed_seconds,
            scheduled_call_updated,
        })
    }
}

impl Drop for ActiveCallManager {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.running.lock() {
            if let Some(running) = guard.take() {
                running.ticker.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CallStatus, CallType, ScheduleCallInput};
    use crate::storage::LocalStore;

    fn manager(scheduled: ScheduledCalls, emitter: EventEmitter) -> ActiveCallManager {
        ActiveCallManager::new(
            Handle::current(),
            scheduled,
            emitter,
            Duration::from_millis(10),
        )
    }

    fn params(call_id: &str, call_type: CallType) -> ActiveCallParams {
        ActiveCallParams {
            call_id: call_id.to_string(),
            candidate_name: "Amara".to_string(),
            call_type,
            job_title: None,
        }
    }

    #[tokio::test]
    async fn test_ticker_counts_and_end_completes_scheduled_call() {
        let scheduled = ScheduledCalls::new(LocalStore::in_memory());
        let call = scheduled
            .schedule(ScheduleCallInput {
                date: "2026-10-20".to_string(),
                time: "09:00".to_string(),
                duration: 15,
                call_type: CallType::Video,
                notes: String::new(),
                candidate_name: "Amara".to_string(),
                job_title: None,
            })
            .unwrap();
        let ticks = Arc::new(AtomicU64::new(0));
        let emitter = EventEmitter::new();
        let seen = Arc::clone(&ticks);
        emitter.set_callback(move |event, _| {
            if event == EVENT_CALL_TICK {
                seen.fetch_add(1, Ordering::Relaxed);
            }
        });
        let manager = manager(scheduled.clone(), emitter);

        manager.start(params(&call.id, CallType::Video)).unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        let summary = manager.end().unwrap();

        assert!(summary.elapsed_seconds >= 2);
        assert_eq!(summary.elapsed_seconds, ticks.load(Ordering::Relaxed));
        assert!(summary.scheduled_call_updated);
        assert_eq!(
            scheduled.get(&call.id).unwrap().unwrap().status,
            CallStatus::Completed
        );
        assert!(manager.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_end_without_scheduled_calls_still_ends() {
        let manager = manager(
            ScheduledCalls::new(LocalStore::in_memory()),
            EventEmitter::new(),
        );
        manager.start(params("X", CallType::Audio)).unwrap();

        let summary = manager.end().unwrap();

        assert!(!summary.scheduled_call_updated);
        assert_eq!(manager.end().unwrap_err().code(), "no_active_call");
    }

    #[tokio::test]
    async fn test_only_one_call_at_a_time() {
        let manager = manager(
            ScheduledCalls::new(LocalStore::in_memory()),
            EventEmitter::new(),
        );
        manager.start(params("c1", CallType::Video)).unwrap();

        let error = manager.start(params("c2", CallType::Video)).unwrap_err();
        assert_eq!(error.code(), "call_already_active");
    }

    #[tokio::test]
    async fn test_toggles_flip_local_controls() {
        let manager = manager(
            ScheduledCalls::new(LocalStore::in_memory()),
            EventEmitter::new(),
        );
        assert_eq!(manager.toggle_mute().unwrap_err().code(), "no_active_call");

        let snapshot = manager.start(params("c1", CallType::Audio)).unwrap();
        assert!(!snapshot.controls.video_enabled);

        assert!(manager.toggle_mute().unwrap().muted);
        assert!(manager.toggle_video().unwrap().video_enabled);
        assert!(!manager.toggle_speaker().unwrap().speaker_on);
        assert!(!manager.toggle_mute().unwrap().muted);
    }
}
