//! Per-namespace handlers behind [`crate::Runtime::invoke_json`].

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};

pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod calls;
pub(crate) mod jobs;
pub(crate) mod social;

fn parse<T: DeserializeOwned>(payload: Value) -> Result<T> {
    // A missing payload deserializes like an empty object.
    let payload = if payload.is_null() {
        Value::Object(Default::default())
    } else {
        payload
    };
    serde_json::from_value(payload).map_err(|error| CoreError::InvalidPayload(error.to_string()))
}

fn respond<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|error| CoreError::Internal(error.to_string()))
}

fn unknown(method: &str) -> CoreError {
    CoreError::UnknownCommand(method.to_string())
}
