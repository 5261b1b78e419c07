/// Refresh token ledger
///
/// Issues opaque UUID refresh tokens, 30 days by default, and records each
/// one against its user before handing it out. There is no exchange,
/// rotation or revocation path, and expired records are never swept.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::store::{RefreshTokenRecord, RefreshTokenStore};

/// A refresh token that has been persisted.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RefreshTokenLedger {
    store: Arc<dyn RefreshTokenStore>,
    ttl: Duration,
}

impl RefreshTokenLedger {
    pub fn new(store: Arc<dyn RefreshTokenStore>, ttl_seconds: i64) -> Self {
        Self {
            store,
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Issue and persist a refresh token for `user_id`.
    ///
    /// # Errors
    /// Returns an error, and no token, if the record could not be stored.
    pub async fn issue_refresh_token(&self, user_id: Uuid) -> Result<IssuedRefreshToken, AppError> {
        let issued_at = Utc::now();
        let record = RefreshTokenRecord {
            token: Uuid::new_v4(),
            user_id,
            issued_at,
            expires_at: issued_at + self.ttl,
        };

        self.store.insert_refresh_token(&record).await?;

        tracing::debug!(
            user_id = %user_id,
            expires_at = %record.expires_at.to_rfc3339(),
            "Refresh token recorded"
        );

        Ok(IssuedRefreshToken {
            token: record.token,
            expires_at: record.expires_at,
        })
    }
}
