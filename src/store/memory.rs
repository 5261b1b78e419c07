use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::{
    CredentialStore, Message, MessageStore, NewMessage, NewUser, RefreshTokenRecord,
    RefreshTokenStore, User,
};
use crate::error::DatabaseError;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    refresh_tokens: Vec<RefreshTokenRecord>,
    messages: Vec<Message>,
}

/// Process-local store with the same uniqueness guarantees as the Postgres
/// schema. Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, DatabaseError> {
        self.tables
            .lock()
            .map_err(|_| DatabaseError::UnexpectedError("store lock poisoned".to_string()))
    }

    pub fn user_count(&self) -> usize {
        self.lock().map(|t| t.users.len()).unwrap_or(0)
    }

    /// Refresh tokens recorded for `user_id`, in issue order.
    pub fn refresh_tokens_for(&self, user_id: Uuid) -> Vec<RefreshTokenRecord> {
        self.lock()
            .map(|t| {
                t.refresh_tokens
                    .iter()
                    .filter(|r| r.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn insert_user(&self, new_user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.lock()?;

        // Check and insert under one lock, mirroring a UNIQUE index.
        if tables
            .users
            .values()
            .any(|u| u.username == new_user.username || u.email == new_user.email)
        {
            return Err(DatabaseError::UniqueConstraintViolation(
                "username or email".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            bio: new_user.bio,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn insert_refresh_token(
        &self,
        record: &RefreshTokenRecord,
    ) -> Result<(), DatabaseError> {
        let mut tables = self.lock()?;

        // Mirrors the foreign key on refresh_tokens.user_id.
        if !tables.users.contains_key(&record.user_id) {
            return Err(DatabaseError::QueryExecution(
                "refresh token references unknown user".to_string(),
            ));
        }
        if tables.refresh_tokens.iter().any(|r| r.token == record.token) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "refresh token".to_string(),
            ));
        }

        tables.refresh_tokens.push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn insert_message(&self, new_message: NewMessage) -> Result<Message, DatabaseError> {
        let mut tables = self.lock()?;

        let message = Message {
            id: Uuid::new_v4(),
            sender_id: new_message.sender_id,
            receiver_id: new_message.receiver_id,
            body: new_message.body,
            created_at: Utc::now(),
        };
        tables.messages.push(message.clone());

        Ok(message)
    }

    async fn find_message(&self, id: Uuid) -> Result<Option<Message>, DatabaseError> {
        let tables = self.lock()?;
        Ok(tables.messages.iter().find(|m| m.id == id).cloned())
    }

    async fn list_conversation(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Vec<Message>, DatabaseError> {
        let tables = self.lock()?;
        // Insertion order is chronological.
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.sender_id == sender_id && m.receiver_id == receiver_id)
            .cloned()
            .collect())
    }

    async fn last_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Option<Message>, DatabaseError> {
        let tables = self.lock()?;
        Ok(tables
            .messages
            .iter()
            .rev()
            .find(|m| m.sender_id == sender_id && m.receiver_id == receiver_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$2b$12$hash".to_string(),
            bio: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_or_email_is_rejected() {
        let store = InMemoryStore::new();
        store.insert_user(new_user("alice", "a@x.com")).await.unwrap();

        let same_name = store.insert_user(new_user("alice", "other@x.com")).await;
        let same_email = store.insert_user(new_user("bob", "a@x.com")).await;

        assert!(matches!(
            same_name,
            Err(DatabaseError::UniqueConstraintViolation(_))
        ));
        assert!(matches!(
            same_email,
            Err(DatabaseError::UniqueConstraintViolation(_))
        ));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_signups_only_one_wins() {
        let store = InMemoryStore::new();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert_user(new_user("racer", &format!("racer{}@x.com", i)))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_token_requires_existing_user() {
        let store = InMemoryStore::new();
        let record = RefreshTokenRecord {
            token: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            issued_at: Utc::now(),
            expires_at: Utc::now(),
        };

        assert!(store.insert_refresh_token(&record).await.is_err());
    }

    #[tokio::test]
    async fn test_last_message_is_newest() {
        let store = InMemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        for body in ["first", "second"] {
            store
                .insert_message(NewMessage {
                    sender_id: a,
                    receiver_id: b,
                    body: body.to_string(),
                })
                .await
                .unwrap();
        }

        let last = store.last_message(a, b).await.unwrap().unwrap();
        assert_eq!(last.body, "second");
        assert_eq!(store.list_conversation(a, b).await.unwrap().len(), 2);
        assert!(store.last_message(b, a).await.unwrap().is_none());
    }
}
