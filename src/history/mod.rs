//! Thread-list adapter: maps repository records into the paginated list and
//! detail shapes the external history UI expects.
//!
//! Ids arrive as strings from the UI; a non-numeric id means "not found",
//! never an error. Pagination beyond the first page is not implemented, so
//! every page reports `has_more: false`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::llm::types::MessageRole;
use crate::store::conversations::ConversationRepository;
use crate::store::error::StoreResult;

#[derive(Debug, Clone, Serialize)]
pub struct ThreadSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadPage {
    pub threads: Vec<ThreadSummary>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    UserMessage,
    AssistantMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadStep {
    pub kind: StepKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadDetail {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub owner_id: String,
    pub steps: Vec<ThreadStep>,
}

pub struct ThreadListAdapter {
    repo: Arc<ConversationRepository>,
}

impl ThreadListAdapter {
    pub fn new(repo: Arc<ConversationRepository>) -> Self {
        Self { repo }
    }

    fn parse_id(id: &str) -> Option<i64> {
        id.trim().parse().ok()
    }

    /// Metadata-only page of a user's threads, newest first.
    pub async fn list_threads(&self, user_id: i64, page_size: usize) -> StoreResult<ThreadPage> {
        let conversations = self.repo.list_for_user(user_id, page_size).await?;

        Ok(ThreadPage {
            threads: conversations
                .into_iter()
                .map(|c| ThreadSummary {
                    id: c.id.to_string(),
                    title: c.title,
                    created_at: c.created_at,
                })
                .collect(),
            has_more: false,
        })
    }

    /// Full thread detail including all messages.
    pub async fn get_thread(&self, id: &str) -> StoreResult<Option<ThreadDetail>> {
        let Some(conversation_id) = Self::parse_id(id) else {
            return Ok(None);
        };
        let Some(conversation) = self.repo.get(conversation_id).await? else {
            return Ok(None);
        };

        let steps = self
            .repo
            .messages(conversation_id)
            .await?
            .into_iter()
            .map(|m| ThreadStep {
                kind: match m.role {
                    MessageRole::User => StepKind::UserMessage,
                    // System rows render on the assistant side.
                    MessageRole::Assistant | MessageRole::System => StepKind::AssistantMessage,
                },
                content: m.content,
                created_at: m.created_at,
            })
            .collect();

        Ok(Some(ThreadDetail {
            id: conversation.id.to_string(),
            title: conversation.title,
            created_at: conversation.created_at,
            owner_id: conversation.user_id.to_string(),
            steps,
        }))
    }

    pub async fn rename_thread(&self, id: &str, name: &str) -> StoreResult<()> {
        if let Some(conversation_id) = Self::parse_id(id) {
            self.repo.rename(conversation_id, name).await?;
        }
        Ok(())
    }

    pub async fn delete_thread(&self, id: &str) -> StoreResult<()> {
        if let Some(conversation_id) = Self::parse_id(id) {
            self.repo.delete(conversation_id).await?;
        }
        Ok(())
    }

    pub async fn thread_owner(&self, id: &str) -> StoreResult<Option<String>> {
        let Some(conversation_id) = Self::parse_id(id) else {
            return Ok(None);
        };
        Ok(self
            .repo
            .find_owner(conversation_id)
            .await?
            .map(|owner| owner.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::database::Database;
    use crate::store::users::CredentialStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        repo: Arc<ConversationRepository>,
        adapter: ThreadListAdapter,
        user_id: i64,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open_at(dir.path().join("test.db")).unwrap());
        let users = CredentialStore::new(db.clone());
        let user = users.create_user("a@b.com", "pw123").await.unwrap();
        let repo = Arc::new(ConversationRepository::new(db));

        Fixture {
            _dir: dir,
            adapter: ThreadListAdapter::new(repo.clone()),
            repo,
            user_id: user.id,
        }
    }

    #[tokio::test]
    async fn lists_metadata_newest_first_with_no_further_pages() {
        let fx = fixture().await;
        for i in 0..3 {
            fx.repo
                .create(fx.user_id, Some(&format!("thread {i}")))
                .await
                .unwrap();
        }

        let page = fx.adapter.list_threads(fx.user_id, 2).await.unwrap();
        assert_eq!(page.threads.len(), 2);
        assert_eq!(page.threads[0].title, "thread 2");
        assert_eq!(page.threads[1].title, "thread 1");
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn detail_maps_roles_to_step_kinds() {
        let fx = fixture().await;
        let conversation = fx.repo.create(fx.user_id, Some("greeting")).await.unwrap();
        fx.repo
            .append(conversation.id, MessageRole::User, "hi")
            .await
            .unwrap();
        fx.repo
            .append(conversation.id, MessageRole::Assistant, "hello")
            .await
            .unwrap();

        let detail = fx
            .adapter
            .get_thread(&conversation.id.to_string())
            .await
            .unwrap()
            .expect("thread should exist");

        assert_eq!(detail.id, conversation.id.to_string());
        assert_eq!(detail.owner_id, fx.user_id.to_string());
        assert_eq!(detail.steps.len(), 2);
        assert_eq!(detail.steps[0].kind, StepKind::UserMessage);
        assert_eq!(detail.steps[0].content, "hi");
        assert_eq!(detail.steps[1].kind, StepKind::AssistantMessage);
    }

    #[tokio::test]
    async fn non_numeric_ids_read_as_not_found() {
        let fx = fixture().await;

        assert!(fx.adapter.get_thread("not-a-number").await.unwrap().is_none());
        assert!(fx.adapter.thread_owner("abc").await.unwrap().is_none());
        // Rename and delete with a bad id are silent no-ops.
        fx.adapter.rename_thread("abc", "new name").await.unwrap();
        fx.adapter.delete_thread("abc").await.unwrap();
    }

    #[tokio::test]
    async fn rename_and_delete_pass_through() {
        let fx = fixture().await;
        let conversation = fx.repo.create(fx.user_id, None).await.unwrap();
        let id = conversation.id.to_string();

        fx.adapter.rename_thread(&id, "renamed").await.unwrap();
        let detail = fx.adapter.get_thread(&id).await.unwrap().unwrap();
        assert_eq!(detail.title, "renamed");

        fx.adapter.delete_thread(&id).await.unwrap();
        assert!(fx.adapter.get_thread(&id).await.unwrap().is_none());
    }
}
