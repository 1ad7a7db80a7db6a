use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse, respond, unknown};
use crate::error::Result;
use crate::models::{ReviewDecision, ReviewStatus, SubmitApplicationInput, UserKind};
use crate::Runtime;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminInput {
    admin_token: String,
}

#[derive(Deserialize)]
struct ReviewInput {
    id: String,
    decision: ReviewDecision,
}

#[derive(Deserialize)]
struct IdInput {
    id: String,
}

pub(crate) fn handle(runtime: &Runtime, namespace: &str, method: &str, payload: Value) -> Result<Value> {
    if namespace == "applications" {
        return match method {
            "submit" => {
                let input = parse::<SubmitApplicationInput>(payload)?;
                respond(&runtime.moderation.submit_application(input)?)
            }
            _ => Err(unknown(method)),
        };
    }

    let auth = parse::<AdminInput>(payload.clone())?;
    let admin = runtime.backend.admin_verify(&auth.admin_token)?;
    tracing::debug!(admin_id = %admin.id, method, "admin command");

    let moderation = &runtime.moderation;
    match method {
        "stats" => respond(&moderation.stats()?),
        "listApplications" => {
            #[derive(Deserialize)]
            struct Input {
                kind: UserKind,
                #[serde(default)]
                status: Option<ReviewStatus>,
            }

            let input = parse::<Input>(payload)?;
            respond(&moderation.applications(input.kind, input.status)?)
        }
        "reviewApplication" => {
            #[derive(Deserialize)]
            struct Input {
                kind: UserKind,
                #[serde(flatten)]
                review: ReviewInput,
            }

            let input = parse::<Input>(payload)?;
            respond(&moderation.review_application(
                input.kind,
                &input.review.id,
                input.review.decision,
            )?)
        }
        "deleteApplication" => {
            #[derive(Deserialize)]
            struct Input {
                kind: UserKind,
                id: String,
            }

            let input = parse::<Input>(payload)?;
            moderation.delete_application(input.kind, &input.id)?;
            Ok(json!({ "deleted": true }))
        }
        "listJobPostings" => {
            #[derive(Deserialize)]
            struct Input {
                #[serde(default)]
                status: Option<ReviewStatus>,
            }

            let input = parse::<Input>(payload)?;
            respond(&moderation.job_postings(input.status)?)
        }
        "reviewJobPosting" => {
            let input = parse::<ReviewInput>(payload)?;
            respond(&moderation.review_job_posting(&input.id, input.decision)?)
        }
        "removeJobPosting" => {
            let input = parse::<IdInput>(payload)?;
            respond(&moderation.remove_job_posting(&input.id)?)
        }
        "listCompanies" => respond(&moderation.companies()?),
        "verifyCompany" => {
            #[derive(Deserialize)]
            struct Input {
                id: String,
                #[serde(default = "default_verified")]
                verified: bool,
            }

            let input = parse::<Input>(payload)?;
            respond(&moderation.set_company_verified(&input.id, input.verified)?)
        }
        "removeCompany" => {
            let input = parse::<IdInput>(payload)?;
            respond(&moderation.remove_company(&input.id)?)
        }
        _ => Err(unknown(method)),
    }
}

fn default_verified() -> bool {
    true
}
