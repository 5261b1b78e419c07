/// Direct message routes
///
/// All of these sit behind the access guard; the sender is always the
/// authenticated caller.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, DatabaseError, ErrorContext, ValidationError};
use crate::middleware::AuthenticatedUser;
use crate::store::{CredentialStore, MessageStore, NewMessage};
use crate::validators::is_valid_message_body;

/// Store handles shared by the message routes.
#[derive(Clone)]
pub struct MessageState {
    pub users: Arc<dyn CredentialStore>,
    pub messages: Arc<dyn MessageStore>,
}

#[derive(Deserialize)]
pub struct MessageRequest {
    pub receiver_id: Option<Uuid>,
    pub receiver_username: Option<String>,
    pub body: Option<String>,
}

/// Query identifying the other side of a conversation
#[derive(Deserialize)]
pub struct ReceiverQuery {
    pub receiver_id: Option<Uuid>,
    pub receiver_username: Option<String>,
}

fn user_not_found() -> AppError {
    DatabaseError::NotFound("user".to_string()).into()
}

/// Resolve a receiver to a user id. A username wins over an id when both are
/// given; the resolved user must exist.
async fn resolve_receiver(
    users: &dyn CredentialStore,
    receiver_id: Option<Uuid>,
    receiver_username: Option<&str>,
) -> Result<Uuid, AppError> {
    match (receiver_username.map(str::trim).filter(|u| !u.is_empty()), receiver_id) {
        (Some(username), _) => users
            .find_by_username(username)
            .await?
            .map(|u| u.id)
            .ok_or_else(user_not_found),
        (None, Some(id)) => users
            .find_by_id(id)
            .await?
            .map(|u| u.id)
            .ok_or_else(user_not_found),
        (None, None) => Err(ValidationError::EmptyField(
            "receiver_id or receiver_username".to_string(),
        )
        .into()),
    }
}

/// POST /api/messages
pub async fn send_message(
    user: web::ReqData<AuthenticatedUser>,
    form: web::Json<MessageRequest>,
    state: web::Data<MessageState>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("send_message").with_user_id(user.user_id.to_string());

    let result = async {
        let body = is_valid_message_body(form.body.as_deref().unwrap_or_default())?;
        let receiver_id = resolve_receiver(
            state.users.as_ref(),
            form.receiver_id,
            form.receiver_username.as_deref(),
        )
        .await?;

        let message = state
            .messages
            .insert_message(NewMessage {
                sender_id: user.user_id,
                receiver_id,
                body,
            })
            .await?;

        Ok::<_, AppError>(message)
    }
    .await;

    let message = result.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    tracing::info!(
        request_id = %context.request_id,
        message_id = %message.id,
        sender_id = %message.sender_id,
        receiver_id = %message.receiver_id,
        "Message created"
    );

    Ok(HttpResponse::Created().json(serde_json::json!({
        "feedback": "New message created successfully",
        "message": message,
    })))
}

/// GET /api/messages/{id}
///
/// Only the sender or the receiver may read a message; anyone else gets 404.
pub async fn read_message(
    user: web::ReqData<AuthenticatedUser>,
    path: web::Path<Uuid>,
    state: web::Data<MessageState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let message = state
        .messages
        .find_message(id)
        .await?
        .filter(|m| m.sender_id == user.user_id || m.receiver_id == user.user_id)
        .ok_or_else(|| AppError::from(DatabaseError::NotFound("message".to_string())))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": message })))
}

/// GET /api/messages/chat
///
/// Messages the caller sent to the given receiver, oldest first.
pub async fn read_chat(
    user: web::ReqData<AuthenticatedUser>,
    query: web::Query<ReceiverQuery>,
    state: web::Data<MessageState>,
) -> Result<HttpResponse, AppError> {
    let receiver_id = resolve_receiver(
        state.users.as_ref(),
        query.receiver_id,
        query.receiver_username.as_deref(),
    )
    .await?;

    let messages = state
        .messages
        .list_conversation(user.user_id, receiver_id)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "messages": messages })))
}

/// GET /api/messages/last
pub async fn read_last_sent(
    user: web::ReqData<AuthenticatedUser>,
    query: web::Query<ReceiverQuery>,
    state: web::Data<MessageState>,
) -> Result<HttpResponse, AppError> {
    let receiver_id = resolve_receiver(
        state.users.as_ref(),
        query.receiver_id,
        query.receiver_username.as_deref(),
    )
    .await?;

    let message = state
        .messages
        .last_message(user.user_id, receiver_id)
        .await?
        .ok_or_else(|| AppError::from(DatabaseError::NotFound("message".to_string())))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": message })))
}
