use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse, respond, unknown};
use crate::error::{CoreError, Result};
use crate::events::{
    EVENT_RUNTIME_ERROR, EVENT_WAITING_ROOM_ADMITTED, EVENT_WAITING_ROOM_CHANGED,
    EVENT_WAITING_ROOM_REMOVED,
};
use crate::models::{ActiveCallParams, AdmittedEvent, CallStatus, CallType, ScheduleCallInput};
use crate::Runtime;

#[derive(Deserialize)]
struct IdInput {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallIdInput {
    call_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidateInput {
    call_id: String,
    candidate_name: String,
}

/// Join/start payload; anything left out is taken from the scheduled call.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallInput {
    call_id: String,
    #[serde(default)]
    candidate_name: Option<String>,
    #[serde(default)]
    call_type: Option<CallType>,
    #[serde(default)]
    job_title: Option<String>,
}

pub(crate) fn handle(runtime: &Runtime, namespace: &str, method: &str, payload: Value) -> Result<Value> {
    match (namespace, method) {
        ("calls", "schedule") => {
            let input = parse::<ScheduleCallInput>(payload)?;
            respond(&runtime.scheduled.schedule(input)?)
        }
        ("calls", "list") => {
            #[derive(Deserialize)]
            struct Input {
                #[serde(default)]
                status: Option<CallStatus>,
            }

            let input = parse::<Input>(payload)?;
            respond(&runtime.scheduled.list(input.status)?)
        }
        ("calls", "get") => {
            let input = parse::<IdInput>(payload)?;
            let call = runtime
                .scheduled
                .get(&input.id)?
                .ok_or_else(|| CoreError::not_found("Scheduled call", input.id))?;
            respond(&call)
        }
        ("calls", "cancel") => {
            let input = parse::<IdInput>(payload)?;
            respond(&runtime.scheduled.cancel(&input.id)?)
        }
        ("calls", "start") => start_call(runtime, payload),
        ("calls", "join") => join_call(runtime, payload),

        ("waitingRoom", "join") => join_waiting_room(runtime, payload),
        ("waitingRoom", "status") => {
            let input = parse::<CandidateInput>(payload)?;
            respond(
                &runtime
                    .waiting_room
                    .entry(&input.call_id, &input.candidate_name)?,
            )
        }
        ("waitingRoom", "leave") => {
            let input = parse::<CandidateInput>(payload)?;
            stop_watcher(runtime, &input.call_id, &input.candidate_name);
            let left = runtime
                .waiting_room
                .leave(&input.call_id, &input.candidate_name)?;
            if left {
                emit_waiting_changed(runtime, input.call_id.trim())?;
            }
            Ok(json!({ "left": left }))
        }
        ("waitingRoom", "list") => {
            let input = parse::<CallIdInput>(payload)?;
            respond(&runtime.waiting_room.waiting(&input.call_id)?)
        }
        ("waitingRoom", "admit") => {
            let input = parse::<CandidateInput>(payload)?;
            let was_admitted = runtime
                .waiting_room
                .entry(&input.call_id, &input.candidate_name)?
                .is_some_and(|entry| entry.is_admitted);
            let entry = runtime
                .waiting_room
                .admit(&input.call_id, &input.candidate_name)?;
            if !was_admitted {
                emit_waiting_changed(runtime, &entry.call_id)?;
            }
            respond(&entry)
        }
        ("waitingRoom", "remove") => {
            let input = parse::<CandidateInput>(payload)?;
            let removed = runtime
                .waiting_room
                .remove(&input.call_id, &input.candidate_name)?;
            emit_waiting_changed(runtime, &removed.call_id)?;
            respond(&removed)
        }

        ("activeCall", "state") => respond(&runtime.active_call.snapshot()),
        ("activeCall", "toggleMute") => respond(&runtime.active_call.toggle_mute()?),
        ("activeCall", "toggleVideo") => respond(&runtime.active_call.toggle_video()?),
        ("activeCall", "toggleSpeaker") => respond(&runtime.active_call.toggle_speaker()?),
        ("activeCall", "end") => respond(&runtime.active_call.end()?),
        _ => Err(unknown(method)),
    }
}

/// Host "Start Call": refused while anyone is still waiting.
fn start_call(runtime: &Runtime, payload: Value) -> Result<Value> {
    let input = parse::<CallInput>(payload)?;
    runtime.waiting_room.ensure_ready_to_start(input.call_id.trim())?;
    let params = call_params(runtime, input)?;
    respond(&runtime.active_call.start(params)?)
}

/// Candidate join: only an admitted candidate gets into the call.
fn join_call(runtime: &Runtime, payload: Value) -> Result<Value> {
    let input = parse::<CallInput>(payload)?;
    let params = call_params(runtime, input)?;
    let admitted = runtime
        .waiting_room
        .entry(&params.call_id, &params.candidate_name)?
        .is_some_and(|entry| entry.is_admitted);
    if !admitted {
        return Err(CoreError::NotAdmitted {
            call_id: params.call_id,
            candidate: params.candidate_name,
        });
    }

    // Host and candidate may share one runtime in local demos.
    if let Some(snapshot) = runtime.active_call.snapshot() {
        if snapshot.call_id == params.call_id {
            return respond(&snapshot);
        }
    }
    respond(&runtime.active_call.start(params)?)
}

fn call_params(runtime: &Runtime, input: CallInput) -> Result<ActiveCallParams> {
    let call_id = input.call_id.trim().to_string();
    let scheduled = runtime.scheduled.get(&call_id)?;

    let candidate_name = input
        .candidate_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .or_else(|| scheduled.as_ref().map(|call| call.candidate_name.clone()))
        .ok_or_else(|| CoreError::invalid("candidateName is required"))?;

    Ok(ActiveCallParams {
        call_type: input
            .call_type
            .or_else(|| scheduled.as_ref().map(|call| call.call_type))
            .unwrap_or_default(),
        job_title: input
            .job_title
            .or_else(|| scheduled.and_then(|call| call.job_title)),
        call_id,
        candidate_name,
    })
}

/// Registers the candidate and starts watching for their admission.
///
/// The watcher pushes `waiting-room://admitted` once when the host admits
/// the candidate, or `waiting-room://removed` if the entry goes away first.
/// Joining again replaces the previous watcher for the same candidate.
fn join_waiting_room(runtime: &Runtime, payload: Value) -> Result<Value> {
    let input = parse::<CallInput>(payload)?;
    let candidate_name = input.candidate_name.clone().unwrap_or_default();
    let entry = runtime.waiting_room.register(&input.call_id, &candidate_name)?;

    let scheduled = runtime.scheduled.get(&entry.call_id)?;
    let call_type = input
        .call_type
        .or_else(|| scheduled.as_ref().map(|call| call.call_type));
    let job_title = input
        .job_title
        .or_else(|| scheduled.and_then(|call| call.job_title));

    let waiting_room = runtime.waiting_room.clone();
    let emitter = runtime.emitter.clone();
    let poll_interval = runtime.config.admission_poll_interval();
    let call_id = entry.call_id.clone();
    let candidate = entry.candidate_name.clone();

    let task = runtime.tasks.spawn(async move {
        match waiting_room
            .wait_for_admission(&call_id, &candidate, poll_interval)
            .await
        {
            Ok(_) => {
                tracing::info!(call_id = %call_id, candidate = %candidate, "candidate admitted");
                emitter.emit(
                    EVENT_WAITING_ROOM_ADMITTED,
                    &AdmittedEvent {
                        call_id,
                        candidate_name: candidate,
                        call_type,
                        job_title,
                    },
                );
            }
            Err(CoreError::RemovedFromWaitingRoom { call_id, candidate }) => {
                tracing::info!(call_id = %call_id, candidate = %candidate, "candidate removed");
                emitter.emit(
                    EVENT_WAITING_ROOM_REMOVED,
                    &json!({ "callId": call_id, "candidateName": candidate }),
                );
            }
            Err(error) => {
                tracing::warn!(call_id = %call_id, candidate = %candidate, %error, "admission watch failed");
                emitter.emit(
                    EVENT_RUNTIME_ERROR,
                    &json!({ "code": error.code(), "message": error.to_string() }),
                );
            }
        }
    });

    {
        let mut watchers = runtime
            .admission_watchers
            .lock()
            .expect("admission watchers mutex poisoned");
        watchers.retain(|_, watcher| !watcher.is_finished());
        let key = (entry.call_id.clone(), entry.candidate_name.clone());
        if let Some(previous) = watchers.insert(key, task) {
            previous.abort();
        }
    }

    emit_waiting_changed(runtime, &entry.call_id)?;
    respond(&entry)
}

fn stop_watcher(runtime: &Runtime, call_id: &str, candidate_name: &str) {
    let key = (call_id.trim().to_string(), candidate_name.trim().to_string());
    let watcher = runtime
        .admission_watchers
        .lock()
        .expect("admission watchers mutex poisoned")
        .remove(&key);
    if let Some(watcher) = watcher {
        watcher.abort();
    }
}

/// Pushes the current waiting list to the host console.
fn emit_waiting_changed(runtime: &Runtime, call_id: &str) -> Result<()> {
    let waiting = runtime.waiting_room.waiting(call_id)?;
    runtime.emitter.emit(
        EVENT_WAITING_ROOM_CHANGED,
        &json!({ "callId": call_id, "waiting": waiting }),
    );
    Ok(())
}
