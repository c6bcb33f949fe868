//! Server-side records that never leave the backend's trust boundary.

pub mod admin_user;
pub mod security;

pub use admin_user::AdminUser;
pub use security::{LockoutRecord, LogSource, NewSecurityLog, SecurityLog};
