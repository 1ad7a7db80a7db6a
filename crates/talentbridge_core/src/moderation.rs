//! Admin moderation dashboard over the locally stored review queues.

use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::{
    Company, JobPosting, ModerationApplication, ModerationStats, QueueStats, ReviewDecision,
    ReviewStatus, SubmitApplicationInput, UserKind,
};
use crate::now_iso;
use crate::storage::{LocalStore, StoreKey};

fn application_key(kind: UserKind) -> StoreKey {
    match kind {
        UserKind::Professional => StoreKey::ProfessionalApplications,
        UserKind::Recruiter => StoreKey::RecruiterApplications,
        UserKind::Company => StoreKey::CompanyApplications,
    }
}

#[derive(Clone)]
pub struct Moderation {
    store: LocalStore,
}

impl Moderation {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn submit_application(&self, input: SubmitApplicationInput) -> Result<ModerationApplication> {
        let applicant_name = input.applicant_name.trim();
        let email = input.email.trim();
        if applicant_name.is_empty() {
            return Err(CoreError::invalid("applicantName cannot be empty"));
        }
        if !email.contains('@') {
            return Err(CoreError::invalid("a valid email is required"));
        }

        let application = ModerationApplication {
            id: Uuid::new_v4().to_string(),
            kind: input.kind,
            applicant_name: applicant_name.to_string(),
            email: email.to_string(),
            details: input.details,
            status: ReviewStatus::Pending,
            submitted_at: now_iso(),
            reviewed_at: None,
        };
        let stored = application.clone();
        self.store.update(
            application_key(input.kind),
            |queue: &mut Vec<ModerationApplication>| {
                queue.push(stored);
                Ok(())
            },
        )?;
        Ok(application)
    }

    pub fn applications(
        &self,
        kind: UserKind,
        status: Option<ReviewStatus>,
    ) -> Result<Vec<ModerationApplication>> {
        let queue = self
            .store
            .get_list::<ModerationApplication>(application_key(kind))?;
        Ok(filter_status(queue, status, |item| item.status))
    }

    pub fn review_application(
        &self,
        kind: UserKind,
        id: &str,
        decision: ReviewDecision,
    ) -> Result<ModerationApplication> {
        let reviewed = self.store.transaction(|txn| {
            let reviewed = txn.update(
                application_key(kind),
                |queue: &mut Vec<ModerationApplication>| {
                    let application = queue
                        .iter_mut()
                        .find(|application| application.id == id)
                        .ok_or_else(|| CoreError::not_found("Application", id))?;
                    check_review(application.status, decision, "Application")?;
                    application.status = decision.target();
                    application.reviewed_at = Some(now_iso());
                    Ok(application.clone())
                },
            )?;

            // Approved companies join the directory unverified.
            if kind == UserKind::Company && reviewed.status == ReviewStatus::Approved {
                let company = Company {
                    id: reviewed.id.clone(),
                    name: reviewed.applicant_name.clone(),
                    industry: reviewed.details.clone(),
                    verified: false,
                };
                txn.update(StoreKey::Companies, |companies: &mut Vec<Company>| {
                    if !companies.iter().any(|existing| existing.id == company.id) {
                        companies.push(company);
                    }
                    Ok(())
                })?;
            }
            Ok(reviewed)
        })?;
        tracing::info!(id, kind = ?kind, status = reviewed.status.as_str(), "application reviewed");
        Ok(reviewed)
    }

    pub fn delete_application(&self, kind: UserKind, id: &str) -> Result<()> {
        self.store.update(
            application_key(kind),
            |queue: &mut Vec<ModerationApplication>| {
                remove_by(queue, |application| application.id == id)
                    .map(|_| ())
                    .ok_or_else(|| CoreError::not_found("Application", id))
            },
        )
    }

    pub fn job_postings(&self, status: Option<ReviewStatus>) -> Result<Vec<JobPosting>> {
        let postings = self.store.get_list::<JobPosting>(StoreKey::JobPostings)?;
        Ok(filter_status(postings, status, |posting| posting.status))
    }

    pub fn review_job_posting(&self, id: &str, decision: ReviewDecision) -> Result<JobPosting> {
        self.store
            .update(StoreKey::JobPostings, |postings: &mut Vec<JobPosting>| {
                let posting = postings
                    .iter_mut()
                    .find(|posting| posting.id == id)
                    .ok_or_else(|| CoreError::not_found("Job posting", id))?;
                check_review(posting.status, decision, "Job posting")?;
                posting.status = decision.target();
                Ok(posting.clone())
            })
    }

    pub fn remove_job_posting(&self, id: &str) -> Result<JobPosting> {
        self.store
            .update(StoreKey::JobPostings, |postings: &mut Vec<JobPosting>| {
                remove_by(postings, |posting| posting.id == id)
                    .ok_or_else(|| CoreError::not_found("Job posting", id))
            })
    }

    /// Queues a locally created job for admin review.
    pub fn queue_job_posting(&self, posting: JobPosting) -> Result<()> {
        self.store
            .update(StoreKey::JobPostings, |postings: &mut Vec<JobPosting>| {
                postings.push(posting);
                Ok(())
            })
    }

    pub fn companies(&self) -> Result<Vec<Company>> {
        self.store.get_list(StoreKey::Companies)
    }

    pub fn set_company_verified(&self, id: &str, verified: bool) -> Result<Company> {
        self.store
            .update(StoreKey::Companies, |companies: &mut Vec<Company>| {
                let company = companies
                    .iter_mut()
                    .find(|company| company.id == id)
                    .ok_or_else(|| CoreError::not_found("Company", id))?;
                company.verified = verified;
                Ok(company.clone())
            })
    }

    pub fn remove_company(&self, id: &str) -> Result<Company> {
        self.store
            .update(StoreKey::Companies, |companies: &mut Vec<Company>| {
                remove_by(companies, |company| company.id == id)
                    .ok_or_else(|| CoreError::not_found("Company", id))
            })
    }

    pub fn stats(&self) -> Result<ModerationStats> {
        let queue_stats = |kind| -> Result<QueueStats> {
            Ok(count(
                self.store
                    .get_list::<ModerationApplication>(application_key(kind))?
                    .iter()
                    .map(|application| application.status),
            ))
        };

        Ok(ModerationStats {
            professional_applications: queue_stats(UserKind::Professional)?,
            recruiter_applications: queue_stats(UserKind::Recruiter)?,
            company_applications: queue_stats(UserKind::Company)?,
            job_postings: count(self.job_postings(None)?.iter().map(|posting| posting.status)),
            companies: self.companies()?.len(),
        })
    }
}

fn check_review(current: ReviewStatus, decision: ReviewDecision, entity: &'static str) -> Result<()> {
    let next = decision.target();
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            entity,
            from: current.as_str().to_string(),
            to: next.as_str().to_string(),
        })
    }
}

fn filter_status<T>(
    items: Vec<T>,
    status: Option<ReviewStatus>,
    status_of: impl Fn(&T) -> ReviewStatus,
) -> Vec<T> {
    match status {
        Some(status) => items.into_iter().filter(|item| status_of(item) == status).collect(),
        None => items,
    }
}

fn remove_by<T>(items: &mut Vec<T>, predicate: impl Fn(&T) -> bool) -> Option<T> {
    let index = items.iter().position(predicate)?;
    Some(items.remove(index))
}

fn count(statuses: impl Iterator<Item = ReviewStatus>) -> QueueStats {
    statuses.fold(QueueStats::default(), |mut stats, status| {
        match status {
            ReviewStatus::Pending => stats.pending += 1,
            ReviewStatus::Approved => stats.approved += 1,
            ReviewStatus::Rejected => stats.rejected += 1,
        }
        stats
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(moderation: &Moderation, kind: UserKind, name: &str) -> ModerationApplication {
        moderation
            .submit_application(SubmitApplicationInput {
                kind,
                applicant_name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                details: String::new(),
            })
            .unwrap()
    }

    #[test]
    fn test_applications_land_in_their_own_queue() {
        let store = LocalStore::in_memory();
        let moderation = Moderation::new(store.clone());
        submit(&moderation, UserKind::Recruiter, "Ria");
        submit(&moderation, UserKind::Company, "Acme");

        assert_eq!(
            store
                .get_list::<ModerationApplication>(StoreKey::RecruiterApplications)
                .unwrap()
                .len(),
            1
        );
        assert!(moderation
            .applications(UserKind::Professional, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_review_only_from_pending() {
        let moderation = Moderation::new(LocalStore::in_memory());
        let application = submit(&moderation, UserKind::Professional, "Amara");

        let approved = moderation
            .review_application(UserKind::Professional, &application.id, ReviewDecision::Approve)
            .unwrap();
        assert_eq!(approved.status, ReviewStatus::Approved);
        assert!(approved.reviewed_at.is_some());

        let error = moderation
            .review_application(UserKind::Professional, &application.id, ReviewDecision::Reject)
            .unwrap_err();
        assert_eq!(error.code(), "invalid_transition");
        assert_eq!(
            moderation
                .applications(UserKind::Professional, Some(ReviewStatus::Approved))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_delete_application() {
        let moderation = Moderation::new(LocalStore::in_memory());
        let application = submit(&moderation, UserKind::Company, "Acme");

        moderation
            .delete_application(UserKind::Company, &application.id)
            .unwrap();
        assert_eq!(
            moderation
                .delete_application(UserKind::Company, &application.id)
                .unwrap_err()
                .code(),
            "not_found"
        );
    }

    #[test]
    fn test_job_postings_and_companies() {
        let store = LocalStore::in_memory();
        let moderation = Moderation::new(store.clone());
        moderation
            .queue_job_posting(JobPosting {
                id: "p1".to_string(),
                title: "Engineer".to_string(),
                company: "Acme".to_string(),
                location: String::new(),
                posted_by: "2".to_string(),
                status: ReviewStatus::Pending,
                created_at: now_iso(),
            })
            .unwrap();
        store
            .set(
                StoreKey::Companies,
                &vec![Company {
                    id: "co1".to_string(),
                    name: "Acme".to_string(),
                    industry: "Software".to_string(),
                    verified: false,
                }],
            )
            .unwrap();

        moderation
            .review_job_posting("p1", ReviewDecision::Reject)
            .unwrap();
        assert!(moderation.set_company_verified("co1", true).unwrap().verified);

        let stats = moderation.stats().unwrap();
        assert_eq!(stats.job_postings.rejected, 1);
        assert_eq!(stats.companies, 1);

        moderation.remove_job_posting("p1").unwrap();
        moderation.remove_company("co1").unwrap();
        assert!(moderation.job_postings(None).unwrap().is_empty());
        assert!(moderation.companies().unwrap().is_empty());
    }

    #[test]
    fn test_approved_company_joins_directory() {
        let moderation = Moderation::new(LocalStore::in_memory());
        let application = submit(&moderation, UserKind::Company, "Acme");
        moderation
            .review_application(UserKind::Company, &application.id, ReviewDecision::Approve)
            .unwrap();

        let companies = moderation.companies().unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].name, "Acme");
        assert!(!companies[0].verified);
    }

    #[test]
    fn test_company_approval_rolls_back_when_directory_write_fails() {
        let store = LocalStore::in_memory();
        let moderation = Moderation::new(store.clone());
        let application = submit(&moderation, UserKind::Company, "Acme");
        store.set(StoreKey::Companies, &"not a list").unwrap();

        let error = moderation
            .review_application(UserKind::Company, &application.id, ReviewDecision::Approve)
            .unwrap_err();
        assert_eq!(error.code(), "storage_error");

        let queue = moderation.applications(UserKind::Company, None).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].status, ReviewStatus::Pending);
        assert!(queue[0].reviewed_at.is_none());
    }

    #[test]
    fn test_stats_count_per_status() {
        let moderation = Moderation::new(LocalStore::in_memory());
        let first = submit(&moderation, UserKind::Professional, "A");
        submit(&moderation, UserKind::Professional, "B");
        moderation
            .review_application(UserKind::Professional, &first.id, ReviewDecision::Reject)
            .unwrap();

        let stats = moderation.stats().unwrap();
        assert_eq!(
            stats.professional_applications,
            QueueStats {
                pending: 1,
                approved: 0,
                rejected: 1
            }
        );
        assert_eq!(stats.recruiter_applications, QueueStats::default());
    }
}
