//! HTTP stage capability.
//!
//! Each stage is a POST to `{base_url}/{lane}` carrying the accumulated
//! inputs as a flat map. The service answers with the stage's text output.

mod api;
mod capability;

pub use api::{StageRequest, StageResponse};
pub use capability::HttpCapability;
