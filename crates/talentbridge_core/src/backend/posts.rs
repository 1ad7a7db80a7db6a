use serde::Serialize;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::Post;
use crate::now_iso;

use super::MockBackend;

pub const DEFAULT_FEED_LIMIT: usize = 20;
const MAX_POST_LEN: usize = 3000;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub post_id: String,
    pub liked: bool,
    pub likes: u32,
}

impl MockBackend {
    /// Newest-first page of the feed.
    pub fn feed(&self, limit: usize, offset: usize) -> Vec<Post> {
        let state = self.lock();
        let mut posts = state.posts.clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.into_iter().skip(offset).take(limit).collect()
    }

    pub fn create_post(&self, token: &str, content: &str) -> Result<Post> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::invalid("post content cannot be empty"));
        }
        if content.chars().count() > MAX_POST_LEN {
            return Err(CoreError::invalid(format!(
                "post content cannot exceed {MAX_POST_LEN} characters"
            )));
        }

        let mut state = self.lock();
        let author_id = state.authenticate(token)?;
        let author_name = state.user(&author_id)?.user.name.clone();
        let post = Post {
            id: Uuid::new_v4().to_string(),
            author_id,
            author_name,
            content: content.to_string(),
            likes: 0,
            liked_by: Vec::new(),
            comments: 0,
            created_at: now_iso(),
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    /// Likes the post, or unlikes it if the caller already did.
    pub fn toggle_like(&self, token: &str, post_id: &str) -> Result<LikeOutcome> {
        let mut state = self.lock();
        let user_id = state.authenticate(token)?;
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == post_id)
            .ok_or_else(|| CoreError::not_found("Post", post_id))?;

        let liked = match post.liked_by.iter().position(|id| *id == user_id) {
            Some(index) => {
                post.liked_by.remove(index);
                post.likes = post.likes.saturating_sub(1);
                false
            }
            None => {
                post.liked_by.push(user_id);
                post.likes += 1;
                true
            }
        };

        Ok(LikeOutcome {
            post_id: post.id.clone(),
            liked,
            likes: post.likes,
        })
    }

    pub fn delete_post(&self, token: &str, post_id: &str) -> Result<()> {
        let mut state = self.lock();
        let user_id = state.authenticate(token)?;
        let index = state
            .posts
            .iter()
            .position(|post| post.id == post_id)
            .ok_or_else(|| CoreError::not_found("Post", post_id))?;
        if state.posts[index].author_id != user_id {
            return Err(CoreError::Forbidden(
                "only the author can delete this post".to_string(),
            ));
        }
        state.posts.remove(index);
        tracing::info!(post_id, "post deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::AdminCredentials;
    use super::*;

    fn backend() -> MockBackend {
        MockBackend::with_sample_data(AdminCredentials::default())
    }

    #[test]
    fn test_feed_is_newest_first_and_paged() {
        let backend = backend();
        let ids = backend
            .feed(DEFAULT_FEED_LIMIT, 0)
            .into_iter()
            .map(|post| post.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["3", "2", "1"]);

        let page = backend.feed(1, 1);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "2");
    }

    #[test]
    fn test_created_post_leads_feed() {
        let backend = backend();
        let post = backend.create_post("token_1", "  Hello network  ").unwrap();
        assert_eq!(post.content, "Hello network");
        assert_eq!(post.author_name, "Sarah Chen");
        assert_eq!(backend.feed(1, 0)[0].id, post.id);
        assert_eq!(
            backend.create_post("token_1", "   ").unwrap_err().code(),
            "invalid_input"
        );
    }

    #[test]
    fn test_like_toggles() {
        let backend = backend();
        let first = backend.toggle_like("token_1", "2").unwrap();
        assert!(first.liked);
        assert_eq!(first.likes, 10);

        let second = backend.toggle_like("token_1", "2").unwrap();
        assert!(!second.liked);
        assert_eq!(second.likes, 9);
    }

    #[test]
    fn test_only_author_deletes() {
        let backend = backend();
        assert_eq!(
            backend.delete_post("token_2", "1").unwrap_err().code(),
            "forbidden"
        );
        backend.delete_post("token_1", "1").unwrap();
        assert_eq!(
            backend.delete_post("token_1", "1").unwrap_err().code(),
            "not_found"
        );
    }
}
