use std::time::Duration;

use web_time::Instant;

/// Per-frame compilation deadline.
///
/// A budget of `None` never expires. A zero budget is already exhausted when it
/// starts, which tests use to force the degraded path.
#[derive(Debug, Copy, Clone)]
pub struct FrameBudget {
    started: Instant,
    limit: Option<Duration>,
}

impl FrameBudget {
    pub fn start(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn unlimited() -> Self {
        Self::start(None)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        match self.limit {
            Some(limit) => self.started.elapsed() >= limit,
            None => false,
        }
    }
}
