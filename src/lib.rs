pub mod auth;
pub mod config;
pub mod cookies;
pub mod error;
pub mod headers;
pub mod models;
pub mod openapi;
pub mod protection;
pub mod repo;
pub mod routes;
pub mod security; // edge-security quota middleware
pub mod service;

// Re-export commonly used items for tests / external users
pub use headers::SecurityHeaders;
pub use routes::{config, AppState};
pub use security::SecurityMiddleware;
