//! # tvresearch API
//!
//! HTTP boundary of the research pipeline.
//!
//! ```text
//! POST   /research        - Request a research workflow
//! GET    /research        - List workflow records
//! GET    /research/{id}   - Poll one record
//! DELETE /research/{id}   - Delete a record
//! GET    /queue/status    - Waiting jobs per stage lane
//! GET    /metrics         - Aggregate workflow statistics
//! GET    /health          - Health check
//! ```

pub mod error;
pub mod handlers;
pub mod monitoring;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use server::{ApiConfig, ApiServer};
pub use state::AppState;
