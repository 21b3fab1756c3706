//! HTTP/WebSocket surface: thin request->service handlers over
//! `AppContext`. Per the system's scope, this layer is intentionally
//! thin — routing and serialization only, no business logic.

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod ws;

pub use routes::build_router;
