//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS
//! 5. Lockout guard (per-IP request-rate lock, `/api` only)

pub mod auth;
pub mod client_ip;
pub mod lockout;
pub mod request_id;

pub use auth::{RequireOwner, bearer_token};
pub use client_ip::{ClientIp, resolve_client_ip};
pub use lockout::lockout_guard;
pub use request_id::request_id_middleware;
