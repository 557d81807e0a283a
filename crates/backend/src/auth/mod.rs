//! Authentication: Google OAuth login and JWT sessions.

pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod types;

pub use types::{AuthConfig, AuthUser};
