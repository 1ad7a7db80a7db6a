use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::{CallStatus, ScheduleCallInput, ScheduledCall};
use crate::now_iso;
use crate::storage::{LocalStore, StoreKey};

#[derive(Clone)]
pub struct ScheduledCalls {
    store: LocalStore,
}

impl ScheduledCalls {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn schedule(&self, input: ScheduleCallInput) -> Result<ScheduledCall> {
        NaiveDate::parse_from_str(input.date.trim(), "%Y-%m-%d")
            .map_err(|_| CoreError::invalid(format!("invalid date: {}", input.date)))?;
        NaiveTime::parse_from_str(input.time.trim(), "%H:%M")
            .map_err(|_| CoreError::invalid(format!("invalid time: {}", input.time)))?;
        if input.duration == 0 {
            return Err(CoreError::invalid("duration must be greater than zero"));
        }
        let candidate_name = input.candidate_name.trim();
        if candidate_name.is_empty() {
            return Err(CoreError::invalid("candidateName cannot be empty"));
        }

        let call = ScheduledCall {
            id: Uuid::new_v4().to_string(),
            date: input.date.trim().to_string(),
            time: input.time.trim().to_string(),
            duration: input.duration,
            call_type: input.call_type,
            notes: input.notes,
            candidate_name: candidate_name.to_string(),
            job_title: input
                .job_title
                .map(|title| title.trim().to_string())
                .filter(|title| !title.is_empty()),
            status: CallStatus::Scheduled,
            created_at: now_iso(),
        };

        let stored = call.clone();
        self.store
            .update(StoreKey::ScheduledCalls, |calls: &mut Vec<ScheduledCall>| {
                calls.push(stored);
                Ok(())
            })?;
        tracing::info!(call_id = %call.id, candidate = %call.candidate_name, "call scheduled");
        Ok(call)
    }

    pub fn list(&self, status: Option<CallStatus>) -> Result<Vec<ScheduledCall>> {
        let calls = self.store.get_list::<ScheduledCall>(StoreKey::ScheduledCalls)?;
        Ok(match status {
            Some(status) => calls.into_iter().filter(|call| call.status == status).collect(),
            None => calls,
        })
    }

    pub fn get(&self, id: &str) -> Result<Option<ScheduledCall>> {
        Ok(self
            .store
            .get_list::<ScheduledCall>(StoreKey::ScheduledCalls)?
            .into_iter()
            .find(|call| call.id == id))
    }

    pub fn cancel(&self, id: &str) -> Result<ScheduledCall> {
        self.transition(id, CallStatus::Cancelled)?
            .ok_or_else(|| CoreError::not_found("Scheduled call", id))
    }

    /// Marks the call completed. `Ok(None)` when there is no `scheduledCalls`
    /// key or no call with this id.
    pub fn complete(&self, id: &str) -> Result<Option<ScheduledCall>> {
        self.transition(id, CallStatus::Completed)
    }

    fn transition(&self, id: &str, next: CallStatus) -> Result<Option<ScheduledCall>> {
        let updated = self
            .store
            .update_existing(StoreKey::ScheduledCalls, |calls: &mut Vec<ScheduledCall>| {
                let Some(call) = calls.iter_mut().find(|call| call.id == id) else {
                    return Ok(None);
                };
                if !call.status.can_transition_to(next) {
                    return Err(CoreError::InvalidTransition {
                        entity: "Scheduled call",
                        from: call.status.to_string(),
                        to: next.to_string(),
                    });
                }
                call.status = next;
                Ok(Some(call.clone()))
            })?
            .flatten();

        if updated.is_some() {
            tracing::info!(call_id = id, status = %next, "scheduled call status changed");
        }
        Ok(updated)
    }
}
