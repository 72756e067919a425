//! Conversation repository: durable conversations and their append-only
//! message log.
//!
//! Messages are replayed in `created_at` order with the row id as tiebreak,
//! so history reads return exactly the submission order. A message can only
//! be appended to an existing conversation; the foreign key makes that a hard
//! guarantee rather than a convention.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::llm::types::{ChatMessage, MessageRole};
use crate::store::database::{parse_timestamp, Database};
use crate::store::error::{StoreError, StoreResult};

/// Placeholder title until the first user turn names the conversation.
pub const DEFAULT_TITLE: &str = "New conversation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: i64,
    pub conversation_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

pub struct ConversationRepository {
    db: Arc<Database>,
}

impl ConversationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a conversation and return it with the generated id, so the id
    /// can be used as the thread key without a second round trip.
    pub async fn create(&self, user_id: i64, title: Option<&str>) -> StoreResult<Conversation> {
        let conn = self.db.lock().await;
        let created_at = Utc::now();
        let title = title.unwrap_or(DEFAULT_TITLE);

        conn.execute(
            "INSERT INTO conversations (user_id, title, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, title, created_at.to_rfc3339()],
        )?;

        Ok(Conversation {
            id: conn.last_insert_rowid(),
            user_id,
            title: title.to_string(),
            created_at,
        })
    }

    /// Append one message. There is no partial-message state: this either
    /// inserts the full row or errors.
    pub async fn append(
        &self,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
    ) -> StoreResult<MessageRecord> {
        let conn = self.db.lock().await;
        let created_at = Utc::now();

        let inserted = conn.execute(
            "INSERT INTO messages (conversation_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                conversation_id,
                role.as_str(),
                content,
                created_at.to_rfc3339()
            ],
        );

        match inserted {
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::ConversationNotFound(conversation_id));
            }
            other => {
                other?;
            }
        }

        Ok(MessageRecord {
            id: conn.last_insert_rowid(),
            conversation_id,
            role,
            content: content.to_string(),
            created_at,
        })
    }

    /// Full replay of a conversation in submission order, in the shape fed
    /// back to the model.
    pub async fn history(&self, conversation_id: i64) -> StoreResult<Vec<ChatMessage>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT role, content FROM messages
             WHERE conversation_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;

        let rows = stmt
            .query_map(params![conversation_id], |row| {
                let role: String = row.get(0)?;
                let content: String = row.get(1)?;
                Ok((role, content))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(role, content)| {
                let role = MessageRole::parse(&role).ok_or(StoreError::InvalidRole(role))?;
                Ok(ChatMessage { role, content })
            })
            .collect()
    }

    /// Full message records for the detail view.
    pub async fn messages(&self, conversation_id: i64) -> StoreResult<Vec<MessageRecord>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, role, content, created_at FROM messages
             WHERE conversation_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;

        let rows = stmt
            .query_map(params![conversation_id], |row| {
                let created_at: String = row.get(3)?;
                let role: String = row.get(1)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    role,
                    row.get::<_, String>(2)?,
                    parse_timestamp(3, &created_at)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, role, content, created_at)| {
                let role = MessageRole::parse(&role).ok_or(StoreError::InvalidRole(role))?;
                Ok(MessageRecord {
                    id,
                    conversation_id,
                    role,
                    content,
                    created_at,
                })
            })
            .collect()
    }

    pub async fn get(&self, conversation_id: i64) -> StoreResult<Option<Conversation>> {
        let conn = self.db.lock().await;
        let conversation = conn
            .query_row(
                "SELECT id, user_id, title, created_at FROM conversations WHERE id = ?1",
                params![conversation_id],
                |row| {
                    let created_at: String = row.get(3)?;
                    Ok(Conversation {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        title: row.get(2)?,
                        created_at: parse_timestamp(3, &created_at)?,
                    })
                },
            )
            .optional()?;

        Ok(conversation)
    }

    /// Newest-first conversations for one user.
    pub async fn list_for_user(&self, user_id: i64, limit: usize) -> StoreResult<Vec<Conversation>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, created_at FROM conversations
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;

        let conversations = stmt
            .query_map(params![user_id, limit as i64], |row| {
                let created_at: String = row.get(3)?;
                Ok(Conversation {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    title: row.get(2)?,
                    created_at: parse_timestamp(3, &created_at)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(conversations)
    }

    /// Idempotent title overwrite.
    pub async fn rename(&self, conversation_id: i64, title: &str) -> StoreResult<()> {
        let conn = self.db.lock().await;
        conn.execute(
            "UPDATE conversations SET title = ?1 WHERE id = ?2",
            params![title, conversation_id],
        )?;
        Ok(())
    }

    /// Remove a conversation; messages go with it via cascade.
    pub async fn delete(&self, conversation_id: i64) -> StoreResult<()> {
        let conn = self.db.lock().await;
        conn.execute(
            "DELETE FROM conversations WHERE id = ?1",
            params![conversation_id],
        )?;
        Ok(())
    }

    /// Cheap connectivity check for the status endpoint.
    pub async fn ping(&self) -> StoreResult<()> {
        let conn = self.db.lock().await;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    pub async fn find_owner(&self, conversation_id: i64) -> StoreResult<Option<i64>> {
        let conn = self.db.lock().await;
        let owner = conn
            .query_row(
                "SELECT user_id FROM conversations WHERE id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::users::CredentialStore;

    async fn fixture() -> (tempfile::TempDir, ConversationRepository, i64) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open_at(dir.path().join("test.db")).unwrap());
        let users = CredentialStore::new(db.clone());
        let user = users.create_user("a@b.com", "pw123").await.unwrap();
        (dir, ConversationRepository::new(db), user.id)
    }

    #[tokio::test]
    async fn history_round_trips_in_submission_order() {
        let (_dir, repo, user_id) = fixture().await;
        let conversation = repo.create(user_id, None).await.unwrap();
        assert_eq!(conversation.title, DEFAULT_TITLE);

        let turns = [
            (MessageRole::User, "first"),
            (MessageRole::Assistant, "second"),
            (MessageRole::User, "third"),
            (MessageRole::Assistant, "fourth"),
        ];
        for (role, content) in turns {
            repo.append(conversation.id, role, content).await.unwrap();
        }

        let history = repo.history(conversation.id).await.unwrap();
        assert_eq!(history.len(), 4);
        for ((role, content), replayed) in turns.iter().zip(&history) {
            assert_eq!(replayed.role, *role);
            assert_eq!(replayed.content, *content);
        }
    }

    #[tokio::test]
    async fn append_to_missing_conversation_is_an_error() {
        let (_dir, repo, _user_id) = fixture().await;
        let err = repo
            .append(9999, MessageRole::User, "orphan")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConversationNotFound(9999)));
    }

    #[tokio::test]
    async fn delete_cascades_to_messages() {
        let (_dir, repo, user_id) = fixture().await;
        let conversation = repo.create(user_id, None).await.unwrap();
        repo.append(conversation.id, MessageRole::User, "hello")
            .await
            .unwrap();

        repo.delete(conversation.id).await.unwrap();

        assert!(repo.get(conversation.id).await.unwrap().is_none());
        assert!(repo.history(conversation.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rename_is_an_idempotent_overwrite() {
        let (_dir, repo, user_id) = fixture().await;
        let conversation = repo.create(user_id, None).await.unwrap();

        repo.rename(conversation.id, "First topic").await.unwrap();
        repo.rename(conversation.id, "First topic").await.unwrap();

        let stored = repo.get(conversation.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "First topic");
    }

    #[tokio::test]
    async fn list_for_user_is_newest_first_and_bounded() {
        let (_dir, repo, user_id) = fixture().await;
        let mut ids = Vec::new();
        for i in 0..3 {
            let conversation = repo
                .create(user_id, Some(&format!("conversation {i}")))
                .await
                .unwrap();
            ids.push(conversation.id);
        }

        let listed = repo.list_for_user(user_id, 2).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, ids[2]);
        assert_eq!(listed[1].id, ids[1]);
    }

    #[tokio::test]
    async fn find_owner_reports_the_owning_user() {
        let (_dir, repo, user_id) = fixture().await;
        let conversation = repo.create(user_id, None).await.unwrap();

        assert_eq!(
            repo.find_owner(conversation.id).await.unwrap(),
            Some(user_id)
        );
        assert_eq!(repo.find_owner(4242).await.unwrap(), None);
    }
}
