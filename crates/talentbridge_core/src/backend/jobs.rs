use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::{ApplicationStatus, CreateJobInput, Job, JobApplication, JobFilter};
use crate::now_iso;

use super::MockBackend;

impl MockBackend {
    /// Jobs matching every provided filter, newest first.
    pub fn jobs(&self, filter: &JobFilter) -> Vec<Job> {
        let search = filter
            .search
            .as_deref()
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());
        let location = filter
            .location
            .as_deref()
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());

        let state = self.lock();
        let mut jobs = state
            .jobs
            .iter()
            .filter(|job| {
                search.as_ref().map_or(true, |needle| {
                    job.title.to_lowercase().contains(needle)
                        || job.company.to_lowercase().contains(needle)
                        || job.description.to_lowercase().contains(needle)
                })
            })
            .filter(|job| {
                location
                    .as_ref()
                    .map_or(true, |needle| job.location.to_lowercase().contains(needle))
            })
            .filter(|job| filter.job_type.map_or(true, |kind| job.job_type == kind))
            .cloned()
            .collect::<Vec<_>>();
        jobs.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        jobs
    }

    pub fn job(&self, id: &str) -> Result<Job> {
        self.lock()
            .jobs
            .iter()
            .find(|job| job.id == id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Job", id))
    }

    pub fn create_job(&self, token: &str, input: CreateJobInput) -> Result<Job> {
        if input.title.trim().is_empty() {
            return Err(CoreError::invalid("title cannot be empty"));
        }
        if input.company.trim().is_empty() {
            return Err(CoreError::invalid("company cannot be empty"));
        }

        let mut state = self.lock();
        let user_id = state.authenticate(token)?;
        let job = Job {
            id: Uuid::new_v4().to_string(),
            title: input.title.trim().to_string(),
            company: input.company.trim().to_string(),
            location: input.location.trim().to_string(),
            job_type: input.job_type,
            salary: input.salary,
            description: input.description,
            requirements: input.requirements,
            posted_by: user_id,
            posted_at: now_iso(),
            applicants: 0,
        };
        state.jobs.push(job.clone());

        tracing::info!(job_id = %job.id, posted_by = %job.posted_by, "job created");
        Ok(job)
    }

    /// One application per `(user, job)`; each accepted one bumps the job's
    /// applicant count by exactly one.
    pub fn apply(
        &self,
        token: &str,
        job_id: &str,
        cover_letter: Option<String>,
    ) -> Result<JobApplication> {
        let mut state = self.lock();
        let user_id = state.authenticate(token)?;
        let job_index = state
            .jobs
            .iter()
            .position(|job| job.id == job_id)
            .ok_or_else(|| CoreError::not_found("Job", job_id))?;

        if state
            .applications
            .iter()
            .any(|application| application.job_id == job_id && application.user_id == user_id)
        {
            return Err(CoreError::AlreadyApplied);
        }

        let application = JobApplication {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            user_id,
            status: ApplicationStatus::Pending,
            cover_letter: cover_letter.filter(|letter| !letter.trim().is_empty()),
            applied_at: now_iso(),
        };
        state.applications.push(application.clone());
        state.jobs[job_index].applicants += 1;

        tracing::info!(job_id, user_id = %application.user_id, "application submitted");
        Ok(application)
    }

    /// Applications to `job_id` (poster only), or the caller's own
    /// applications when no job is given.
    pub fn applications(&self, token: &str, job_id: Option<&str>) -> Result<Vec<JobApplication>> {
        let state = self.lock();
        let user_id = state.authenticate(token)?;

        match job_id {
            Some(job_id) => {
                let job = state
                    .jobs
                    .iter()
                    .find(|job| job.id == job_id)
                    .ok_or_else(|| CoreError::not_found("Job", job_id))?;
                if job.posted_by != user_id {
                    return Err(CoreError::Forbidden(
                        "only the poster can view applications for this job".to_string(),
                    ));
                }
                Ok(state
                    .applications
                    .iter()
                    .filter(|application| application.job_id == job_id)
                    .cloned()
                    .collect())
            }
            None => Ok(state
                .applications
                .iter()
                .filter(|application| application.user_id == user_id)
                .cloned()
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::AdminCredentials;
    use super::*;
    use crate::models::JobType;

    fn backend() -> MockBackend {
        MockBackend::with_sample_data(AdminCredentials::default())
    }

    #[test]
    fn test_filters_combine() {
        let backend = backend();
        let all = backend.jobs(&JobFilter::default());
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, "3");

        let austin_full_time = backend.jobs(&JobFilter {
            search: Some("engineer".to_string()),
            location: Some("austin".to_string()),
            job_type: Some(JobType::FullTime),
        });
        assert_eq!(austin_full_time.len(), 1);
        assert_eq!(austin_full_time[0].id, "1");
    }

    #[test]
    fn test_job_by_id() {
        let backend = backend();
        assert_eq!(backend.job("2").unwrap().title, "Product Designer");
        assert_eq!(backend.job("42").unwrap_err().to_string(), "Job not found: 42");
    }

    #[test]
    fn test_apply_rejects_second_application() {
        let backend = backend();
        let before = backend.job("1").unwrap().applicants;

        backend.apply("token_1", "1", None).unwrap();
        assert_eq!(backend.job("1").unwrap().applicants, before + 1);

        let error = backend.apply("token_1", "1", None).unwrap_err();
        assert!(matches!(error, CoreError::AlreadyApplied));
        assert_eq!(error.to_string(), "Already applied");
        assert_eq!(backend.job("1").unwrap().applicants, before + 1);

        backend.apply("token_2", "1", None).unwrap();
        assert_eq!(backend.job("1").unwrap().applicants, before + 2);
    }

    #[test]
    fn test_apply_requires_auth_and_job() {
        let backend = backend();
        assert_eq!(
            backend.apply("bogus", "1", None).unwrap_err().code(),
            "unauthorized"
        );
        assert_eq!(
            backend.apply("token_1", "404", None).unwrap_err().code(),
            "not_found"
        );
    }

    #[test]
    fn test_applications_visible_to_poster_only() {
        let backend = backend();
        backend
            .apply("token_1", "1", Some("Hello".to_string()))
            .unwrap();

        let for_job = backend.applications("token_3", Some("1")).unwrap();
        assert_eq!(for_job.len(), 1);
        assert_eq!(for_job[0].cover_letter.as_deref(), Some("Hello"));

        assert_eq!(
            backend.applications("token_2", Some("1")).unwrap_err().code(),
            "forbidden"
        );
        assert_eq!(backend.applications("token_1", None).unwrap().len(), 1);
    }

    #[test]
    fn test_create_job_records_poster() {
        let backend = backend();
        let job = backend
            .create_job(
                "token_2",
                CreateJobInput {
                    title: "Recruiting Coordinator".to_string(),
                    company: "TalentFinders".to_string(),
                    location: "NYC".to_string(),
                    job_type: JobType::Contract,
                    salary: None,
                    description: "Coordinate interviews".to_string(),
                    requirements: Vec::new(),
                },
            )
            .unwrap();
        assert_eq!(job.posted_by, "2");
        assert_eq!(job.applicants, 0);
        assert_eq!(backend.jobs(&JobFilter::default()).len(), 4);
    }
}
