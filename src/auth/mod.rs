//! Bearer-token authentication for protected API routes.
//!
//! Every protected handler takes the `Auth` extractor, which verifies the access
//! token from `Authorization: Bearer <token>`. There is no server-side session:
//! the claim inside the token is the whole identity.
//!
//! - 401: no credential supplied
//! - 403: credential present but invalid, expired, or of the wrong kind

mod bearer;
mod errors;
mod extractors;
mod ip;
mod state;

pub use bearer::bearer_token;
pub use errors::{AuthError, INVALID_TOKEN_CODE, MISSING_TOKEN_CODE};
pub use extractors::{Auth, authenticate_request};
pub use ip::extract_client_ip;
pub use state::HasAuthBackend;
