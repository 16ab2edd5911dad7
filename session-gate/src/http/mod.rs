//! HTTP layer: Axum router, session extraction, admin guard, and handlers.
//!
//! Exposes `/`, `/logout`, `/admin`, `/login`, `/register` and `/health`.

mod auth;
mod error;
mod extract;
mod handlers;
mod responses;
mod state;


pub use handlers::router;
pub use state::{AppState, CookieSettings};
