use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    CredentialStore, Message, MessageStore, NewMessage, NewUser, RefreshTokenRecord,
    RefreshTokenStore, User,
};
use crate::error::DatabaseError;

type UserRow = (
    Uuid,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

type MessageRow = (Uuid, Uuid, Uuid, String, DateTime<Utc>);

const USER_COLUMNS: &str =
    "id, username, email, password_hash, bio, profile_picture, created_at, updated_at";

/// Postgres-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Refresh tokens are kept as SHA-256 digests; a leaked table does not hand
/// out usable tokens.
fn hash_token(token: &Uuid) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_hyphenated().to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn user_from_row(row: UserRow) -> User {
    let (id, username, email, password_hash, bio, profile_picture, created_at, updated_at) = row;
    User {
        id,
        username,
        email,
        password_hash,
        bio,
        profile_picture,
        created_at,
        updated_at,
    }
}

fn message_from_row(row: MessageRow) -> Message {
    let (id, sender_id, receiver_id, body, created_at) = row;
    Message {
        id,
        sender_id,
        receiver_id,
        body,
        created_at,
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn insert_user(&self, new_user: NewUser) -> Result<User, DatabaseError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, bio, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.bio)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(row))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn insert_refresh_token(
        &self,
        record: &RefreshTokenRecord,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.user_id)
        .bind(hash_token(&record.token))
        .bind(record.issued_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn insert_message(&self, new_message: NewMessage) -> Result<Message, DatabaseError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, body, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, sender_id, receiver_id, body, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_message.sender_id)
        .bind(new_message.receiver_id)
        .bind(&new_message.body)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(message_from_row(row))
    }

    async fn find_message(&self, id: Uuid) -> Result<Option<Message>, DatabaseError> {
        let row = sqlx::query_as::<_, MessageRow>(
            "SELECT id, sender_id, receiver_id, body, created_at FROM messages WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(message_from_row))
    }

    async fn list_conversation(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Vec<Message>, DatabaseError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender_id, receiver_id, body, created_at
            FROM messages
            WHERE sender_id = $1 AND receiver_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(message_from_row).collect())
    }

    async fn last_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Option<Message>, DatabaseError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender_id, receiver_id, body, created_at
            FROM messages
            WHERE sender_id = $1 AND receiver_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(message_from_row))
    }
}
