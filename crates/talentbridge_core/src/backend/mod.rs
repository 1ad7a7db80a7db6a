//! In-memory procedure backend standing in for a real server.
//!
//! Data lives in process memory and is lost on restart. Tokens are
//! `token_<userId>` and `admin_token_<adminId>`; checking one is a prefix strip
//! plus an existence lookup, nothing more.

use std::sync::{Mutex, MutexGuard};

use crate::error::{CoreError, Result};
use crate::models::{Admin, Connection, Job, JobApplication, Post, User};

mod auth;
mod jobs;
mod posts;
mod seed;
mod users;

pub use posts::{LikeOutcome, DEFAULT_FEED_LIMIT};

pub const USER_TOKEN_PREFIX: &str = "token_";
pub const ADMIN_TOKEN_PREFIX: &str = "admin_token_";

pub fn user_token(user_id: &str) -> String {
    format!("{USER_TOKEN_PREFIX}{user_id}")
}

pub fn admin_token(admin_id: &str) -> String {
    format!("{ADMIN_TOKEN_PREFIX}{admin_id}")
}

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            email: "admin@talentbridge.app".to_string(),
            password: "admin123".to_string(),
        }
    }
}

struct UserRecord {
    user: User,
    password: String,
}

struct AdminRecord {
    admin: Admin,
    password: String,
}

#[derive(Default)]
struct BackendState {
    users: Vec<UserRecord>,
    admins: Vec<AdminRecord>,
    jobs: Vec<Job>,
    applications: Vec<JobApplication>,
    posts: Vec<Post>,
    connections: Vec<Connection>,
}

impl BackendState {
    fn user(&self, id: &str) -> Result<&UserRecord> {
        self.users
            .iter()
            .find(|record| record.user.id == id)
            .ok_or_else(|| CoreError::not_found("User", id))
    }

    /// Resolves a `token_<id>` to the id of an existing user.
    fn authenticate(&self, token: &str) -> Result<String> {
        let id = token
            .strip_prefix(USER_TOKEN_PREFIX)
            .filter(|id| !id.is_empty())
            .ok_or(CoreError::Unauthorized)?;
        self.user(id)
            .map(|record| record.user.id.clone())
            .map_err(|_| CoreError::Unauthorized)
    }
}

pub struct MockBackend {
    state: Mutex<BackendState>,
}

impl MockBackend {
    /// An empty backend with just the configured admin account.
    pub fn empty(admin: AdminCredentials) -> Self {
        let mut state = BackendState::default();
        state.admins.push(AdminRecord {
            admin: Admin {
                id: "1".to_string(),
                email: admin.email,
                name: "TalentBridge Admin".to_string(),
            },
            password: admin.password,
        });
        Self {
            state: Mutex::new(state),
        }
    }

    /// A backend pre-populated with sample users, jobs and posts.
    pub fn with_sample_data(admin: AdminCredentials) -> Self {
        let backend = Self::empty(admin);
        seed::populate(&mut backend.lock());
        backend
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().expect("backend state mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shapes() {
        assert_eq!(user_token("7"), "token_7");
        assert_eq!(admin_token("1"), "admin_token_1");
    }

    #[test]
    fn test_authenticate_requires_known_user() {
        let backend = MockBackend::with_sample_data(AdminCredentials::default());
        let state = backend.lock();

        assert_eq!(state.authenticate("token_1").unwrap(), "1");
        assert!(matches!(
            state.authenticate("token_999"),
            Err(CoreError::Unauthorized)
        ));
        assert!(matches!(
            state.authenticate("admin_token_1"),
            Err(CoreError::Unauthorized)
        ));
        assert!(matches!(state.authenticate("token_"), Err(CoreError::Unauthorized)));
    }
}
