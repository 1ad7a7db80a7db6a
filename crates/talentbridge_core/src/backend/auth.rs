use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::{Admin, AdminAuthResponse, AuthResponse, User, UserKind};

use super::{admin_token, user_token, MockBackend, UserRecord, ADMIN_TOKEN_PREFIX};

const MIN_PASSWORD_LEN: usize = 6;

impl MockBackend {
    pub fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let state = self.lock();
        let record = state
            .users
            .iter()
            .find(|record| record.user.email.eq_ignore_ascii_case(email.trim()))
            .filter(|record| record.password == password)
            .ok_or(CoreError::InvalidCredentials)?;

        tracing::debug!(user_id = %record.user.id, "user logged in");
        Ok(AuthResponse {
            token: user_token(&record.user.id),
            user: record.user.clone(),
        })
    }

    pub fn signup(
        &self,
        email: &str,
        password: &str,
        name: &str,
        kind: UserKind,
    ) -> Result<AuthResponse> {
        let email = email.trim();
        let name = name.trim();
        if !email.contains('@') {
            return Err(CoreError::invalid("a valid email is required"));
        }
        if name.is_empty() {
            return Err(CoreError::invalid("name cannot be empty"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::invalid(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let mut state = self.lock();
        if state
            .users
            .iter()
            .any(|record| record.user.email.eq_ignore_ascii_case(email))
        {
            return Err(CoreError::AlreadyExists {
                entity: "User",
                id: email.to_string(),
            });
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            kind,
            headline: None,
            location: None,
            bio: None,
            skills: Vec::new(),
            is_premium: Some(false),
        };
        state.users.push(UserRecord {
            user: user.clone(),
            password: password.to_string(),
        });

        tracing::info!(user_id = %user.id, kind = ?kind, "user signed up");
        Ok(AuthResponse {
            token: user_token(&user.id),
            user,
        })
    }

    pub fn admin_login(&self, email: &str, password: &str) -> Result<AdminAuthResponse> {
        let state = self.lock();
        let record = state
            .admins
            .iter()
            .find(|record| record.admin.email.eq_ignore_ascii_case(email.trim()))
            .filter(|record| record.password == password)
            .ok_or(CoreError::InvalidCredentials)?;

        tracing::info!(admin_id = %record.admin.id, "admin logged in");
        Ok(AdminAuthResponse {
            token: admin_token(&record.admin.id),
            admin: record.admin.clone(),
        })
    }

    pub fn admin_verify(&self, token: &str) -> Result<Admin> {
        let id = token
            .strip_prefix(ADMIN_TOKEN_PREFIX)
            .filter(|id| !id.is_empty())
            .ok_or(CoreError::Unauthorized)?;
        self.lock()
            .admins
            .iter()
            .find(|record| record.admin.id == id)
            .map(|record| record.admin.clone())
            .ok_or(CoreError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::super::seed::SAMPLE_PASSWORD;
    use super::super::AdminCredentials;
    use super::*;

    fn backend() -> MockBackend {
        MockBackend::with_sample_data(AdminCredentials::default())
    }

    #[test]
    fn test_login_issues_prefixed_token() {
        let response = backend()
            .login("Sarah.Chen@example.com", SAMPLE_PASSWORD)
            .unwrap();
        assert_eq!(response.user.id, "1");
        assert_eq!(response.token, "token_1");
    }

    #[test]
    fn test_login_rejects_wrong_password() {
        let error = backend().login("sarah.chen@example.com", "nope").unwrap_err();
        assert_eq!(error.code(), "invalid_credentials");
    }

    #[test]
    fn test_signup_rejects_duplicate_email() {
        let backend = backend();
        let created = backend
            .signup("new@example.com", "secret1", "New Person", UserKind::Recruiter)
            .unwrap();
        assert_eq!(created.user.kind, UserKind::Recruiter);
        assert!(backend.login("new@example.com", "secret1").is_ok());

        let error = backend
            .signup("NEW@example.com", "secret1", "Again", UserKind::Professional)
            .unwrap_err();
        assert_eq!(error.code(), "already_exists");
    }

    #[test]
    fn test_signup_validates_fields() {
        let backend = backend();
        assert_eq!(
            backend
                .signup("bad-email", "secret1", "X", UserKind::Professional)
                .unwrap_err()
                .code(),
            "invalid_input"
        );
        assert_eq!(
            backend
                .signup("x@y.z", "123", "X", UserKind::Professional)
                .unwrap_err()
                .code(),
            "invalid_input"
        );
    }

    #[test]
    fn test_admin_login_and_verify() {
        let backend = backend();
        let response = backend
            .admin_login("admin@talentbridge.app", "admin123")
            .unwrap();
        assert_eq!(response.token, "admin_token_1");

        assert_eq!(backend.admin_verify(&response.token).unwrap(), response.admin);
        assert_eq!(
            backend.admin_verify("token_1").unwrap_err().code(),
            "unauthorized"
        );
        assert_eq!(
            backend.admin_verify("admin_token_2").unwrap_err().code(),
            "unauthorized"
        );
    }
}
