use std::time::Duration;

/// Default search radius around the worker, in meters.
pub const DEFAULT_SEARCH_RADIUS_M: f64 = 1000.0;
/// Default cap on the number of nearby facilities offered.
pub const DEFAULT_MAX_RESULTS: usize = 10;
/// Default budget for a single position request.
pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_secs(20);

/// Tunables for the facility question.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityConfig {
    pub search_radius_m: f64,
    pub max_results: usize,
    pub locate_timeout: Duration,
    /// Ask the position source for its most accurate fix.
    pub high_accuracy: bool,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            max_results: DEFAULT_MAX_RESULTS,
            locate_timeout: DEFAULT_LOCATE_TIMEOUT,
            high_accuracy: true,
        }
    }
}

impl FacilityConfig {
    pub fn with_search_radius(mut self, meters: f64) -> Self {
        self.search_radius_m = meters;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_locate_timeout(mut self, timeout: Duration) -> Self {
        self.locate_timeout = timeout;
        self
    }

    pub fn with_high_accuracy(mut self, high_accuracy: bool) -> Self {
        self.high_accuracy = high_accuracy;
        self
    }
}
