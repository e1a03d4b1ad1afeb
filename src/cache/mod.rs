// Cache module for storing opaque byte blobs under UNIX-style names.
// Defines the backend capability and the entry capability, plus the backends.

pub mod local;
pub mod memory;
pub mod name;

use std::fmt;
use std::io::{self, Read, Seek, Write};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::context::Context;
use crate::error::Result;

pub use local::{LocalCache, LocalCacher};
pub use memory::{MemoryCache, MemoryCacher};

/// Chunk size used when draining a caller's source.
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// A storage backend for cached blobs.
///
/// Names must be UNIX-style relative paths regardless of the host platform.
/// A miss is reported as [`CacheError::NotFound`](crate::CacheError::NotFound);
/// everything else is a store failure.
pub trait Cacher: Send + Sync {
    /// Open the entry stored under `name`, positioned at offset 0.
    fn get(&self, ctx: &Context, name: &str) -> Result<Box<dyn Cache>>;

    /// Drain `source` and store its bytes under `name`, replacing any prior entry.
    fn set(&self, ctx: &Context, name: &str, source: &mut dyn Read) -> Result<()>;
}

/// One opened cache entry.
///
/// The read/seek cursor is single-owner state. The caller owns the entry and
/// releases it with [`Cache::close`] or by dropping it.
pub trait Cache: Read + Seek + Send + fmt::Debug {
    /// The name the entry was looked up with.
    fn name(&self) -> &str;

    /// Last modification time, captured when the entry was opened.
    fn mod_time(&self) -> DateTime<Utc>;

    /// Release the underlying resource. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;
}

impl<C: Cacher + ?Sized> Cacher for &C {
    fn get(&self, ctx: &Context, name: &str) -> Result<Box<dyn Cache>> {
        (**self).get(ctx, name)
    }

    fn set(&self, ctx: &Context, name: &str, source: &mut dyn Read) -> Result<()> {
        (**self).set(ctx, name, source)
    }
}

impl<C: Cacher + ?Sized> Cacher for Box<C> {
    fn get(&self, ctx: &Context, name: &str) -> Result<Box<dyn Cache>> {
        (**self).get(ctx, name)
    }

    fn set(&self, ctx: &Context, name: &str, source: &mut dyn Read) -> Result<()> {
        (**self).set(ctx, name, source)
    }
}

impl<C: Cacher + ?Sized> Cacher for Arc<C> {
    fn get(&self, ctx: &Context, name: &str) -> Result<Box<dyn Cache>> {
        (**self).get(ctx, name)
    }

    fn set(&self, ctx: &Context, name: &str, source: &mut dyn Read) -> Result<()> {
        (**self).set(ctx, name, source)
    }
}

/// Copy `source` into `dest` chunk by chunk, checking `ctx` before each chunk.
pub(crate) fn copy_with_context(
    ctx: &Context,
    source: &mut dyn Read,
    dest: &mut dyn Write,
) -> Result<u64> {
    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        ctx.check()?;
        let n = match source.read(&mut buf) {
            Ok(0) => return Ok(written),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        dest.write_all(&buf[..n])?;
        written += n as u64;
    }
}
