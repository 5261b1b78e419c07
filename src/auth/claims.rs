/// Access token claims
///
/// The signed payload of every access token: the user identity plus the
/// registered claims (RFC 7519) `sub`, `iat`, `exp` and `jti`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Owner of the token
    pub user_id: Uuid,
    /// Subject, the user ID as a string
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Unique token identifier
    pub jti: String,
}

impl Claims {
    /// Build claims for `user_id` issued at `now`, valid for `ttl`.
    pub fn new(user_id: Uuid, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            user_id,
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}
