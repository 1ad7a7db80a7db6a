use serde::Deserialize;
use serde_json::Value;

use super::{parse, respond, unknown};
use crate::error::Result;
use crate::models::{CreateJobInput, JobFilter, JobPosting, ReviewStatus};
use crate::Runtime;

pub(crate) fn handle(runtime: &Runtime, method: &str, payload: Value) -> Result<Value> {
    match method {
        "getAll" => {
            let filter = parse::<JobFilter>(payload)?;
            respond(&runtime.backend.jobs(&filter))
        }
        "getById" => {
            #[derive(Deserialize)]
            struct Input {
                id: String,
            }

            let input = parse::<Input>(payload)?;
            respond(&runtime.backend.job(&input.id)?)
        }
        "create" => create(runtime, payload),
        "apply" => apply(runtime, payload),
        "getApplications" => {
            #[derive(Deserialize)]
            #[serde(rename_all = "camelCase")]
            struct Input {
                token: String,
                #[serde(default)]
                job_id: Option<String>,
            }

            let input = parse::<Input>(payload)?;
            respond(
                &runtime
                    .backend
                    .applications(&input.token, input.job_id.as_deref())?,
            )
        }
        _ => Err(unknown(method)),
    }
}

/// Creates the job, records it as posted from this device and queues it for
/// moderation.
fn create(runtime: &Runtime, payload: Value) -> Result<Value> {
    #[derive(Deserialize)]
    struct Input {
        token: String,
        #[serde(flatten)]
        job: CreateJobInput,
    }

    let input = parse::<Input>(payload)?;
    let job = runtime.backend.create_job(&input.token, input.job)?;
    runtime.session.record_posted_job(job.clone())?;
    runtime.moderation.queue_job_posting(JobPosting {
        id: job.id.clone(),
        title: job.title.clone(),
        company: job.company.clone(),
        location: job.location.clone(),
        posted_by: job.posted_by.clone(),
        status: ReviewStatus::Pending,
        created_at: job.posted_at.clone(),
    })?;
    respond(&job)
}

fn apply(runtime: &Runtime, payload: Value) -> Result<Value> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Input {
        token: String,
        job_id: String,
        #[serde(default)]
        cover_letter: Option<String>,
    }

    let input = parse::<Input>(payload)?;
    let application = runtime
        .backend
        .apply(&input.token, &input.job_id, input.cover_letter)?;
    runtime.session.record_application(application.clone())?;
    respond(&application)
}
