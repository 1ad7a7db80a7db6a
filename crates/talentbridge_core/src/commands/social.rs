use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::TokenInput;
use super::{parse, respond, unknown};
use crate::backend::DEFAULT_FEED_LIMIT;
use crate::error::Result;
use crate::models::{ProfilePatch, UserKind};
use crate::Runtime;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostInput {
    token: String,
    post_id: String,
}

pub(crate) fn handle(runtime: &Runtime, namespace: &str, method: &str, payload: Value) -> Result<Value> {
    let backend = &runtime.backend;
    match (namespace, method) {
        ("posts", "getFeed") => {
            #[derive(Deserialize)]
            struct Input {
                #[serde(default)]
                limit: Option<usize>,
                #[serde(default)]
                offset: usize,
            }

            let input = parse::<Input>(payload)?;
            respond(&backend.feed(input.limit.unwrap_or(DEFAULT_FEED_LIMIT), input.offset))
        }
        ("posts", "create") => {
            #[derive(Deserialize)]
            struct Input {
                token: String,
                content: String,
            }

            let input = parse::<Input>(payload)?;
            respond(&backend.create_post(&input.token, &input.content)?)
        }
        ("posts", "like") => {
            let input = parse::<PostInput>(payload)?;
            respond(&backend.toggle_like(&input.token, &input.post_id)?)
        }
        ("posts", "delete") => {
            let input = parse::<PostInput>(payload)?;
            backend.delete_post(&input.token, &input.post_id)?;
            Ok(json!({ "deleted": true }))
        }
        ("users", "getById") => {
            #[derive(Deserialize)]
            struct Input {
                id: String,
            }

            let input = parse::<Input>(payload)?;
            respond(&backend.user(&input.id)?)
        }
        ("users", "search") => {
            #[derive(Deserialize)]
            struct Input {
                #[serde(default)]
                query: String,
                #[serde(default, rename = "type")]
                kind: Option<UserKind>,
            }

            let input = parse::<Input>(payload)?;
            respond(&backend.search_users(&input.query, input.kind))
        }
        ("users", "updateProfile") => update_profile(runtime, payload),
        ("users", "connect") => {
            #[derive(Deserialize)]
            #[serde(rename_all = "camelCase")]
            struct Input {
                token: String,
                target_id: String,
            }

            let input = parse::<Input>(payload)?;
            respond(&backend.connect(&input.token, &input.target_id)?)
        }
        ("users", "getConnections") => {
            let input = parse::<TokenInput>(payload)?;
            respond(&backend.connections(&input.token)?)
        }
        ("users", "acceptConnection") => {
            #[derive(Deserialize)]
            #[serde(rename_all = "camelCase")]
            struct Input {
                token: String,
                connection_id: String,
            }

            let input = parse::<Input>(payload)?;
            respond(&backend.accept_connection(&input.token, &input.connection_id)?)
        }
        _ => Err(unknown(method)),
    }
}

/// Updates the profile and, when it belongs to the signed-in user, the
/// locally stored session copy as well.
fn update_profile(runtime: &Runtime, payload: Value) -> Result<Value> {
    #[derive(Deserialize)]
    struct Input {
        token: String,
        #[serde(flatten)]
        patch: ProfilePatch,
    }

    let input = parse::<Input>(payload)?;
    let user = runtime.backend.update_profile(&input.token, input.patch)?;
    if let Some(current) = runtime.session.current_user()? {
        if current.id == user.id {
            runtime.session.sign_in(&user)?;
        }
    }
    respond(&user)
}
