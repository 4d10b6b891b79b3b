//! Wire types of the research service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body posted for one stage.
#[derive(Debug, Serialize)]
pub struct StageRequest<'a> {
    pub stage: &'a str,
    pub inputs: BTreeMap<String, String>,
}

/// Body returned by the service.
#[derive(Debug, Deserialize)]
pub struct StageResponse {
    pub output: Option<String>,
}
