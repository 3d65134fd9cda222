//! Authentication: signup, login, bearer token issuance and verification.

pub mod handlers;
pub mod middleware;
mod service;

pub use middleware::{token_required, Identity};
pub use service::{Claims, TokenService};
