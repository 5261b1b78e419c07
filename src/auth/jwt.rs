/// Access token codec
///
/// Issues and validates compact HS256 JWTs. The signing secret is injected at
/// construction; nothing here reads global state.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::error::TokenError;

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
}

impl TokenCodec {
    /// Create a codec signing with `secret`, issuing tokens that live for
    /// `access_ttl_seconds`.
    pub fn new(secret: &[u8], access_ttl_seconds: i64) -> Self {
        // Only HS256 is accepted, whatever the token header claims.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl: Duration::seconds(access_ttl_seconds),
        }
    }

    /// Lifetime of issued access tokens, in seconds
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue_access_token_at(user_id, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_access_token_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims::new(user_id, now, self.access_ttl);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, algorithm, structure and expiry.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;

        // `sub` and `user_id` are both signed; they must agree.
        if claims.sub != claims.user_id.to_string() {
            return Err(TokenError::Invalid("subject does not match user_id".to_string()));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-characters-long";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, 900)
    }

    #[test]
    fn test_generate_and_validate_token() {
        let codec = codec();
        let user_id = Uuid::new_v4();

        let token = codec.issue_access_token(user_id).expect("Failed to generate token");
        let claims = codec.validate_access_token(&token).expect("Failed to validate token");

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_invalid_token() {
        let result = codec().validate_access_token("invalid.token.here");
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_empty_token() {
        assert!(codec().validate_access_token("").is_err());
    }

    #[test]
    fn test_expired_token() {
        let codec = codec();
        let issued = Utc::now() - Duration::hours(1);

        let token = codec.issue_access_token_at(Uuid::new_v4(), issued).unwrap();
        let result = codec.validate_access_token(&token);

        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn test_token_signed_with_other_key() {
        let user_id = Uuid::new_v4();
        let other = TokenCodec::new(b"a-completely-different-signing-secret!!", 900);

        let token = other.issue_access_token(user_id).unwrap();
        assert!(codec().validate_access_token(&token).is_err());
    }

    #[test]
    fn test_tampered_payload() {
        let codec = codec();
        let token = codec.issue_access_token(Uuid::new_v4()).unwrap();

        // Swap the payload for one naming another user, keep the signature.
        let forged_claims = Claims::new(Uuid::new_v4(), Utc::now(), Duration::minutes(15));
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &forged_claims,
            &EncodingKey::from_secret(b"attacker-key"),
        )
        .unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert!(codec.validate_access_token(&spliced).is_err());
    }

    #[test]
    fn test_tampered_signature() {
        let codec = codec();
        let token = codec.issue_access_token(Uuid::new_v4()).unwrap();

        let tampered = format!("{}X", token);
        assert!(codec.validate_access_token(&tampered).is_err());
    }

    #[test]
    fn test_other_algorithm_is_rejected() {
        // Same secret, different HMAC variant in the header.
        let claims = Claims::new(Uuid::new_v4(), Utc::now(), Duration::minutes(15));
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(
            codec().validate_access_token(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_mismatched_subject_is_rejected() {
        let mut claims = Claims::new(Uuid::new_v4(), Utc::now(), Duration::minutes(15));
        claims.sub = Uuid::new_v4().to_string();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(codec().validate_access_token(&token).is_err());
    }
}
