//! Auth Module
//!
//! JWT session tokens, the owner account and the request guard.

pub mod jwt;
pub mod middleware;
pub mod owner;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::require_auth;
pub use owner::OwnerCredentials;
