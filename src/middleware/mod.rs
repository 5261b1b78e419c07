/// Middleware module
///
/// Custom middleware for authentication and request logging.

mod access_guard;

pub use access_guard::{extract_bearer_token, AccessGuard, AuthenticatedUser};
