/// Authentication service
///
/// Signup hashes and persists a new user. Login verifies the password and
/// hands back an access token plus a freshly recorded refresh token. Every
/// call is independent; there is no session state here.

use std::sync::Arc;
use uuid::Uuid;

use crate::auth::jwt::TokenCodec;
use crate::auth::password::{hash_password, verify_against_dummy, verify_password};
use crate::auth::refresh_token::RefreshTokenLedger;
use crate::error::{AppError, AuthError};
use crate::store::{CredentialStore, NewUser, User};
use crate::validators::{
    is_valid_bio, is_valid_email, is_valid_password, is_valid_username, required,
    required_secret,
};

pub const TOKEN_TYPE: &str = "Bearer";

/// Raw signup input, exactly as received.
#[derive(Debug, Default)]
pub struct SignupInput<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password: Option<&'a str>,
    pub bio: Option<&'a str>,
}

/// Everything a successful login returns.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: Uuid,
    pub expires_in: i64,
    pub token_type: &'static str,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    ledger: RefreshTokenLedger,
    codec: TokenCodec,
}

impl AuthService {
    pub fn new(users: Arc<dyn CredentialStore>, ledger: RefreshTokenLedger, codec: TokenCodec) -> Self {
        Self {
            users,
            ledger,
            codec,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Register a new user.
    ///
    /// # Errors
    /// - `Validation` for missing or malformed fields
    /// - `Database(UniqueConstraintViolation)` when the username or email is taken
    /// - `Internal`/`Database` for hashing or store failures
    pub async fn signup(&self, input: SignupInput<'_>) -> Result<User, AppError> {
        let username = is_valid_username(required(input.username, "username")?)?;
        let email = is_valid_email(required(input.email, "email")?)?;
        let password = is_valid_password(required_secret(input.password, "password")?)?;
        let bio = is_valid_bio(input.bio)?;

        let password_hash = hash_password(password)?;

        // The store's unique indexes decide duplicates.
        let user = self
            .users
            .insert_user(NewUser {
                username,
                email,
                password_hash,
                bio,
            })
            .await?;

        Ok(user)
    }

    /// Verify credentials and issue both tokens.
    ///
    /// Unknown usernames and wrong passwords produce the same
    /// `AuthError::InvalidCredentials`.
    pub async fn login(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<TokenPair, AppError> {
        let username = required(username, "username")?.trim();
        let password = required_secret(password, "password")?;

        let user = match self.users.find_by_username(username).await? {
            Some(user) => user,
            None => {
                verify_against_dummy(password);
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let access_token = self.codec.issue_access_token(user.id)?;
        let refresh = self.ledger.issue_refresh_token(user.id).await?;

        Ok(TokenPair {
            user_id: user.id,
            access_token,
            refresh_token: refresh.token,
            expires_in: self.codec.access_ttl_seconds(),
            token_type: TOKEN_TYPE,
        })
    }
}
