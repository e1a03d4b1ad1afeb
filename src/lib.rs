// Pluggable content cache for opaque byte blobs.
// Backends implement `Cacher`; lookups hand back `Cache` entries the caller owns.

pub mod cache;
pub mod context;
pub mod error;

pub use cache::{Cache, Cacher, LocalCache, LocalCacher, MemoryCache, MemoryCacher};
pub use context::Context;
pub use error::{CacheError, Result};
