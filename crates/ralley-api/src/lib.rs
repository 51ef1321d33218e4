//! # Ralley API
//!
//! HTTP listener for the ralley dev queue. Every inbound request on any path is
//! registered as a job whose target is the request path:
//!
//! ```text
//! POST http://localhost:4747/https://example.com/hook?_delay=30
//!   -> job delivering POST https://example.com/hook in 30 seconds
//! ```
//!
//! `GET /_health` reports liveness and the number of stored jobs.

pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use server::{ApiConfig, ApiServer};
pub use state::AppState;
