//! Credential store: user lookup and password verification.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::store::database::{parse_timestamp, Database};
use crate::store::error::StoreResult;

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
}

/// Authenticated identity carrying the durable user id. Downstream components
/// key persistence by `user_id`, never by the login identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
}

pub struct CredentialStore {
    db: Arc<Database>,
}

impl CredentialStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.db.lock().await;
        let user = conn
            .query_row(
                "SELECT id, email, hashed_password, created_at
                 FROM users WHERE email = ?1",
                params![email],
                |row| {
                    let created_at: String = row.get(3)?;
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        hashed_password: row.get(2)?,
                        created_at: parse_timestamp(3, &created_at)?,
                    })
                },
            )
            .optional()?;

        Ok(user)
    }

    /// Authenticate a login attempt.
    ///
    /// Succeeds only if the user exists and the password verifies. Unknown
    /// user and wrong password are the same observable outcome, so callers
    /// cannot enumerate accounts.
    pub async fn authenticate(&self, email: &str, password: &str) -> StoreResult<Option<Principal>> {
        let Some(user) = self.find_by_email(email).await? else {
            debug!("authentication failed");
            return Ok(None);
        };

        if verify_password(password, &user.hashed_password) {
            Ok(Some(Principal {
                user_id: user.id,
                email: user.email,
            }))
        } else {
            debug!("authentication failed");
            Ok(None)
        }
    }

    /// Insert a user. Registration proper lives outside this backend; this
    /// exists for seeding and tests.
    pub async fn create_user(&self, email: &str, password: &str) -> StoreResult<User> {
        let conn = self.db.lock().await;
        let created_at = Utc::now();
        let hashed_password = hash_password(password);

        conn.execute(
            "INSERT INTO users (email, hashed_password, created_at) VALUES (?1, ?2, ?3)",
            params![email, hashed_password, created_at.to_rfc3339()],
        )?;

        Ok(User {
            id: conn.last_insert_rowid(),
            email: email.to_string(),
            hashed_password,
            created_at,
        })
    }
}

/// Hex-encoded blake3 digest of the password.
pub fn hash_password(password: &str) -> String {
    blake3::hash(password.as_bytes()).to_hex().to_string()
}

/// Compare a password against the stored digest in constant time.
/// Malformed stored hashes never verify.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(stored) = hex::decode(stored_hash) else {
        return false;
    };
    let computed = blake3::hash(password.as_bytes());
    computed.as_bytes().as_slice().ct_eq(stored.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open_at(dir.path().join("test.db")).unwrap());
        (dir, CredentialStore::new(db))
    }

    #[tokio::test]
    async fn valid_credentials_yield_principal_with_durable_id() {
        let (_dir, store) = store().await;
        let user = store.create_user("a@b.com", "pw123").await.unwrap();

        let principal = store.authenticate("a@b.com", "pw123").await.unwrap();
        assert_eq!(
            principal,
            Some(Principal {
                user_id: user.id,
                email: "a@b.com".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_indistinguishable() {
        let (_dir, store) = store().await;
        store.create_user("a@b.com", "pw123").await.unwrap();

        let wrong_password = store.authenticate("a@b.com", "nope").await.unwrap();
        let unknown_user = store.authenticate("x@y.com", "pw123").await.unwrap();
        assert_eq!(wrong_password, unknown_user);
        assert!(wrong_password.is_none());
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("pw123", "not-hex"));
        assert!(!verify_password("pw123", ""));
    }

    #[test]
    fn hash_round_trip() {
        let hash = hash_password("pw123");
        assert!(verify_password("pw123", &hash));
        assert!(!verify_password("pw124", &hash));
    }
}
