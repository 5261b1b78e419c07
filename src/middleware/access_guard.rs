/// Access guard
///
/// Admits a request only when it carries `Authorization: Bearer <token>` with
/// a valid access token, and attaches the resolved identity to the request
/// extensions. Every rejection is the same 401 whatever the cause.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use uuid::Uuid;

use crate::auth::TokenCodec;
use crate::error::{AppError, AuthError, TokenError};

const BEARER_PREFIX: &str = "Bearer ";

/// Identity of the caller, resolved from a verified access token.
///
/// Handlers take it as `web::ReqData<AuthenticatedUser>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    /// `jti` of the token that admitted the request
    pub token_id: Uuid,
}

/// Pull the token out of an `Authorization` header value.
///
/// The scheme is case-sensitive. Surrounding whitespace around the token is
/// ignored; an empty token is no token.
pub fn extract_bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub struct AccessGuard {
    codec: Rc<TokenCodec>,
}

impl AccessGuard {
    pub fn new(codec: TokenCodec) -> Self {
        Self {
            codec: Rc::new(codec),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AccessGuardService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AccessGuardService {
            service: Rc::new(service),
            codec: self.codec.clone(),
        }))
    }
}

pub struct AccessGuardService<S> {
    service: Rc<S>,
    codec: Rc<TokenCodec>,
}

fn authenticate(
    codec: &TokenCodec,
    req: &ServiceRequest,
) -> Result<AuthenticatedUser, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = extract_bearer_token(header).ok_or(AuthError::MissingToken)?;

    let claims = codec.validate_access_token(token).map_err(|e| match e {
        TokenError::Expired => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    })?;

    // Tokens we issue always carry a UUID jti.
    let token_id = Uuid::parse_str(&claims.jti).map_err(|_| AuthError::TokenInvalid)?;

    Ok(AuthenticatedUser {
        user_id: claims.user_id,
        token_id,
    })
}

impl<S, B> Service<ServiceRequest> for AccessGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match authenticate(&self.codec, &req) {
            Ok(user) => {
                tracing::debug!(user_id = %user.user_id, path = %req.path(), "Access token accepted");
                req.extensions_mut().insert(user);

                let service = self.service.clone();
                Box::pin(async move { Ok(service.call(req).await?.map_into_left_body()) })
            }
            Err(e) => {
                tracing::warn!(path = %req.path(), reason = %e, "Access token rejected");
                // Outer middleware (request logger) must see the 401 as a response.
                let response = req
                    .into_response(ResponseError::error_response(&e))
                    .map_into_right_body();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}
