/// Persistence seams
///
/// The authentication core only talks to these traits. `postgres` backs them
/// with sqlx in production; `memory` backs them in tests and local tooling.
/// Uniqueness of usernames and emails is the store's job, never a
/// check-then-insert in the caller.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::DatabaseError;

/// A registered account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub bio: Option<String>,
}

/// A persisted refresh token. Stores see the plaintext value and decide how
/// to keep it at rest.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub token: Uuid,
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub body: String,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user, failing with `UniqueConstraintViolation` when the
    /// username or email is taken.
    async fn insert_user(&self, new_user: NewUser) -> Result<User, DatabaseError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert_refresh_token(&self, record: &RefreshTokenRecord)
        -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(&self, new_message: NewMessage) -> Result<Message, DatabaseError>;

    async fn find_message(&self, id: Uuid) -> Result<Option<Message>, DatabaseError>;

    /// Messages from `sender_id` to `receiver_id`, oldest first.
    async fn list_conversation(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Vec<Message>, DatabaseError>;

    async fn last_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Option<Message>, DatabaseError>;
}
