//! Query cache
//!
//! A process-wide moka cache in front of read-mostly queries. Keys are
//! listed in [`keys`]; services invalidate them after every write.
//!
//! ```rust,ignore
//! let cache = create_cache(&CacheConfig::default());
//! let rooms = cache.get_or_load(keys::ROOMS, || repo.list()).await?;
//! ```

pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache keys shared between readers and the writers that invalidate them
pub mod keys {
    pub const ROOMS: &str = "rooms";
    pub const DONATIONS_TOTAL: &str = "donations:total";
    pub const SITE_IMAGES: &str = "images";
    pub const EVENTS_UPCOMING: &str = "events:upcoming";
    pub const EVENTS_ALL: &str = "events:all";
    /// Glob covering every events listing
    pub const EVENTS_PATTERN: &str = "events:*";
}

/// Build the shared cache from configuration
pub fn create_cache(config: &CacheConfig) -> Arc<MemoryCache> {
    Arc::new(MemoryCache::with_capacity_and_ttl(
        config.max_capacity,
        Duration::from_secs(config.ttl_seconds),
    ))
}
