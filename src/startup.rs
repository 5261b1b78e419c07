use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthService, RefreshTokenLedger, TokenCodec};
use crate::configuration::JwtSettings;
use crate::error::{AppError, DatabaseError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::AccessGuard;
use crate::routes::{
    current_user, health_check, login, read_chat, read_last_sent, read_message, send_message,
    signup, MessageState,
};
use crate::store::{CredentialStore, MessageStore, RefreshTokenStore};

/// Store handles the server runs on.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn CredentialStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    pub messages: Arc<dyn MessageStore>,
}

impl Stores {
    /// Use one backend for every store.
    pub fn from_backend<T>(backend: T) -> Self
    where
        T: CredentialStore + RefreshTokenStore + MessageStore + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            users: backend.clone(),
            refresh_tokens: backend.clone(),
            messages: backend,
        }
    }
}

/// Wire the authentication core from a resolved signing secret.
pub fn build_auth_service(stores: &Stores, secret: &str, jwt_config: &JwtSettings) -> AuthService {
    let codec = TokenCodec::new(secret.as_bytes(), jwt_config.access_token_expiry);
    let ledger = RefreshTokenLedger::new(
        stores.refresh_tokens.clone(),
        jwt_config.refresh_token_expiry,
    );
    AuthService::new(stores.users.clone(), ledger, codec)
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(ValidationError::MalformedBody(err.to_string())).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::Validation(ValidationError::MalformedBody(err.to_string())).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|_err, _req| {
        AppError::Database(DatabaseError::NotFound("resource".to_string())).into()
    })
}

pub fn run(
    listener: TcpListener,
    stores: Stores,
    auth_service: AuthService,
) -> Result<Server, std::io::Error> {
    let codec = auth_service.codec().clone();
    let auth_service = web::Data::new(auth_service);
    let message_state = web::Data::new(MessageState {
        users: stores.users.clone(),
        messages: stores.messages.clone(),
    });

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .app_data(auth_service.clone())
            .app_data(message_state.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/signup", web::post().to(signup))
            .route("/login", web::post().to(login))
            // Everything under /api needs a valid access token
            .service(
                web::scope("/api")
                    .wrap(AccessGuard::new(codec.clone()))
                    .route("/user/me", web::get().to(current_user))
                    .route("/messages", web::post().to(send_message))
                    .route("/messages/chat", web::get().to(read_chat))
                    .route("/messages/last", web::get().to(read_last_sent))
                    .route("/messages/{id}", web::get().to(read_message)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
