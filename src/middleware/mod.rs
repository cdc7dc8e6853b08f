pub mod auth;
pub mod security_headers;

pub use auth::{AuthMiddleware, Claims};
pub use security_headers::SecurityHeaders;
