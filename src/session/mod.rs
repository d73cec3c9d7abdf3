// Guest sessions: signed tokens carrying the user id and display name

// Public API - what other modules can use
pub use handlers::create_session;
pub use middleware::jwt_auth;
pub use token::TokenConfig;
pub use types::{CreateSessionRequest, SessionClaims, SessionResponse};

// Internal modules
mod generators;
mod handlers;
mod middleware;
mod token;
mod types;
