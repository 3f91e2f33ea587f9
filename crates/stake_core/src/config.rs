use std::time::Duration;

use shared::domain::PoolId;

pub const DEFAULT_POOL_ID: &str = "pool12jthfp4uqah0yndtdu6x2tqaxvgnlpc7h30gvwey3rsrc789tme";
pub const DEFAULT_STATUS_MAX_AGE: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cached statuses older than this are treated as unknown by the planner.
    pub status_max_age: Duration,
    pub default_pool_id: PoolId,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            status_max_age: DEFAULT_STATUS_MAX_AGE,
            default_pool_id: PoolId::new(DEFAULT_POOL_ID),
        }
    }
}
