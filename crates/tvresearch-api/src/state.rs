//! Application state.

use std::time::Instant;

use tvresearch_pipeline::ResearchService;

/// State shared across handlers.
pub struct AppState {
    pub service: ResearchService,
    start_time: Instant,
}

impl AppState {
    pub fn new(service: ResearchService) -> Self {
        Self {
            service,
            start_time: Instant::now(),
        }
    }

    /// Seconds since the state was created.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
