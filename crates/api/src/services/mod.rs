//! Business logic services.
//!
//! - `assets` - Cloudinary image upload and deletion
//! - `auth` - Owner registration, login and bearer tokens
//! - `lockout` - Login throttle and request-rate guard

pub mod assets;
pub mod auth;
pub mod lockout;
