//! The device-local session: the signed-in user plus the applications and
//! job posts made from this device.

use crate::error::Result;
use crate::models::{Job, JobApplication, User};
use crate::storage::{LocalStore, StoreKey};

#[derive(Clone)]
pub struct LocalSession {
    store: LocalStore,
}

impl LocalSession {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn current_user(&self) -> Result<Option<User>> {
        self.store.get(StoreKey::User)
    }

    pub fn sign_in(&self, user: &User) -> Result<()> {
        self.store.set(StoreKey::User, user)?;
        tracing::debug!(user_id = %user.id, "session user stored");
        Ok(())
    }

    pub fn sign_out(&self) -> Result<bool> {
        self.store.remove(StoreKey::User)
    }

    pub fn record_application(&self, application: JobApplication) -> Result<()> {
        self.store
            .update(StoreKey::Applications, |items: &mut Vec<JobApplication>| {
                items.push(application);
                Ok(())
            })
    }

    pub fn applications(&self) -> Result<Vec<JobApplication>> {
        self.store.get_list(StoreKey::Applications)
    }

    pub fn record_posted_job(&self, job: Job) -> Result<()> {
        self.store
            .update(StoreKey::PostedJobs, |items: &mut Vec<Job>| {
                items.push(job);
                Ok(())
            })
    }

    pub fn posted_jobs(&self) -> Result<Vec<Job>> {
        self.store.get_list(StoreKey::PostedJobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApplicationStatus, UserKind};

    #[test]
    fn test_sign_in_and_out() {
        let session = LocalSession::new(LocalStore::in_memory());
        assert_eq!(session.current_user().unwrap(), None);

        let user = User {
            id: "1".to_string(),
            email: "sarah.chen@example.com".to_string(),
            name: "Sarah Chen".to_string(),
            kind: UserKind::Professional,
            headline: None,
            location: None,
            bio: None,
            skills: Vec::new(),
            is_premium: Some(true),
        };
        session.sign_in(&user).unwrap();
        assert_eq!(session.current_user().unwrap(), Some(user));

        assert!(session.sign_out().unwrap());
        assert_eq!(session.current_user().unwrap(), None);
    }

    #[test]
    fn test_records_accumulate() {
        let session = LocalSession::new(LocalStore::in_memory());
        for job_id in ["1", "2"] {
            session
                .record_application(JobApplication {
                    id: format!("a{job_id}"),
                    job_id: job_id.to_string(),
                    user_id: "1".to_string(),
                    status: ApplicationStatus::Pending,
                    cover_letter: None,
                    applied_at: "2026-10-01T00:00:00.000Z".to_string(),
                })
                .unwrap();
        }
        assert_eq!(session.applications().unwrap().len(), 2);
        assert!(session.posted_jobs().unwrap().is_empty());
    }
}
