mod auth;
mod health_check;
mod messages;

pub use auth::{current_user, login, signup, AuthResponse, LoginRequest, SignupRequest};
pub use health_check::health_check;
pub use messages::{read_chat, read_last_sent, read_message, send_message, MessageState};
