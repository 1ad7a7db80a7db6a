use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::{Connection, ConnectionStatus, ProfilePatch, User, UserKind};
use crate::now_iso;

use super::MockBackend;

impl MockBackend {
    pub fn user(&self, id: &str) -> Result<User> {
        Ok(self.lock().user(id)?.user.clone())
    }

    /// Case-insensitive match on name, headline or skills.
    pub fn search_users(&self, query: &str, kind: Option<UserKind>) -> Vec<User> {
        let needle = query.trim().to_lowercase();
        self.lock()
            .users
            .iter()
            .map(|record| &record.user)
            .filter(|user| kind.map_or(true, |kind| user.kind == kind))
            .filter(|user| {
                needle.is_empty()
                    || user.name.to_lowercase().contains(&needle)
                    || user
                        .headline
                        .as_deref()
                        .is_some_and(|headline| headline.to_lowercase().contains(&needle))
                    || user
                        .skills
                        .iter()
                        .any(|skill| skill.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    pub fn update_profile(&self, token: &str, patch: ProfilePatch) -> Result<User> {
        let mut state = self.lock();
        let user_id = state.authenticate(token)?;
        let record = state
            .users
            .iter_mut()
            .find(|record| record.user.id == user_id)
            .ok_or_else(|| CoreError::not_found("User", &user_id))?;
        let user = &mut record.user;

        if let Some(name) = patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(CoreError::invalid("name cannot be empty"));
            }
            user.name = name.to_string();
        }
        if let Some(headline) = patch.headline {
            user.headline = non_empty(headline);
        }
        if let Some(location) = patch.location {
            user.location = non_empty(location);
        }
        if let Some(bio) = patch.bio {
            user.bio = non_empty(bio);
        }
        if let Some(skills) = patch.skills {
            user.skills = skills
                .into_iter()
                .map(|skill| skill.trim().to_string())
                .filter(|skill| !skill.is_empty())
                .collect();
        }

        Ok(user.clone())
    }

    /// Sends a pending connection request to `target_id`.
    pub fn connect(&self, token: &str, target_id: &str) -> Result<Connection> {
        let mut state = self.lock();
        let user_id = state.authenticate(token)?;
        if user_id == target_id {
            return Err(CoreError::invalid("cannot connect to yourself"));
        }
        state.user(target_id)?;

        if let Some(existing) = state.connections.iter().find(|connection| {
            (connection.from_user_id == user_id && connection.to_user_id == target_id)
                || (connection.from_user_id == target_id && connection.to_user_id == user_id)
        }) {
            return Err(CoreError::AlreadyExists {
                entity: "Connection",
                id: existing.id.clone(),
            });
        }

        let connection = Connection {
            id: Uuid::new_v4().to_string(),
            from_user_id: user_id,
            to_user_id: target_id.to_string(),
            status: ConnectionStatus::Pending,
            created_at: now_iso(),
        };
        state.connections.push(connection.clone());
        Ok(connection)
    }

    /// Users the caller has an accepted connection with.
    pub fn connections(&self, token: &str) -> Result<Vec<User>> {
        let state = self.lock();
        let user_id = state.authenticate(token)?;
        let peers = state
            .connections
            .iter()
            .filter(|connection| connection.status == ConnectionStatus::Accepted)
            .filter_map(|connection| {
                if connection.from_user_id == user_id {
                    Some(connection.to_user_id.as_str())
                } else if connection.to_user_id == user_id {
                    Some(connection.from_user_id.as_str())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();

        Ok(state
            .users
            .iter()
            .filter(|record| peers.contains(&record.user.id.as_str()))
            .map(|record| record.user.clone())
            .collect())
    }

    /// Only the recipient of a request may accept it.
    pub fn accept_connection(&self, token: &str, connection_id: &str) -> Result<Connection> {
        let mut state = self.lock();
        let user_id = state.authenticate(token)?;
        let connection = state
            .connections
            .iter_mut()
            .find(|connection| connection.id == connection_id)
            .ok_or_else(|| CoreError::not_found("Connection", connection_id))?;
        if connection.to_user_id != user_id {
            return Err(CoreError::Forbidden(
                "only the recipient can accept this request".to_string(),
            ));
        }
        connection.status = ConnectionStatus::Accepted;
        Ok(connection.clone())
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
