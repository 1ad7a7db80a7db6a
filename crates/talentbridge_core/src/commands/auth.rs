use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse, respond, unknown};
use crate::error::Result;
use crate::models::UserKind;
use crate::Runtime;

pub(crate) fn handle(runtime: &Runtime, namespace: &str, method: &str, payload: Value) -> Result<Value> {
    match (namespace, method) {
        ("session", "current") => respond(&runtime.session.current_user()?),
        ("session", "logout") => {
            let signed_out = runtime.session.sign_out()?;
            Ok(json!({ "signedOut": signed_out }))
        }
        ("auth", "login") => login(runtime, payload),
        ("auth", "signup") => signup(runtime, payload),
        ("auth", "adminLogin") => {
            let input = parse::<Credentials>(payload)?;
            respond(&runtime.backend.admin_login(&input.email, &input.password)?)
        }
        ("auth", "adminVerify") => {
            let input = parse::<TokenInput>(payload)?;
            respond(&runtime.backend.admin_verify(&input.token)?)
        }
        _ => Err(unknown(method)),
    }
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub(super) struct TokenInput {
    pub(super) token: String,
}

fn login(runtime: &Runtime, payload: Value) -> Result<Value> {
    let input = parse::<Credentials>(payload)?;
    let response = runtime.backend.login(&input.email, &input.password)?;
    runtime.session.sign_in(&response.user)?;
    respond(&response)
}

fn signup(runtime: &Runtime, payload: Value) -> Result<Value> {
    #[derive(Deserialize)]
    struct Input {
        email: String,
        password: String,
        name: String,
        #[serde(default, rename = "type")]
        kind: UserKind,
    }

    let input = parse::<Input>(payload)?;
    let response = runtime
        .backend
        .signup(&input.email, &input.password, &input.name, input.kind)?;
    runtime.session.sign_in(&response.user)?;
    respond(&response)
}
