/// Authentication module
///
/// Access token codec, password hashing, the refresh token ledger and the
/// service that ties them together for signup and login.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use claims::Claims;
pub use jwt::TokenCodec;
pub use password::hash_password;
pub use password::verify_password;
pub use refresh_token::{IssuedRefreshToken, RefreshTokenLedger};
pub use service::{AuthService, SignupInput, TokenPair, TOKEN_TYPE};
