// In-memory cache backend.
// Keeps entries in a shared map; each opened entry is an independent cursor over immutable bytes.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use super::{Cache, Cacher, copy_with_context, name};
use crate::context::Context;
use crate::error::{CacheError, Result};

#[derive(Debug)]
struct Stored {
    data: Arc<[u8]>,
    mod_time: DateTime<Utc>,
}

/// A [`Cacher`] that keeps every entry in process memory.
#[derive(Debug, Default)]
pub struct MemoryCacher {
    entries: RwLock<HashMap<String, Arc<Stored>>>,
}

impl MemoryCacher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Cacher for MemoryCacher {
    fn get(&self, ctx: &Context, name: &str) -> Result<Box<dyn Cache>> {
        ctx.check()?;
        name::validate(name)?;

        let stored = self.entries.read().get(name).cloned();
        match stored {
            Some(stored) => {
                debug!(name = %name, size = stored.data.len(), "cache hit");
                Ok(Box::new(MemoryCache {
                    cursor: Some(Cursor::new(Arc::clone(&stored.data))),
                    name: name.to_string(),
                    mod_time: stored.mod_time,
                }))
            }
            None => {
                debug!(name = %name, "cache miss");
                Err(CacheError::NotFound(name.to_string()))
            }
        }
    }

    fn set(&self, ctx: &Context, name: &str, source: &mut dyn Read) -> Result<()> {
        ctx.check()?;
        name::validate(name)?;

        // Drain outside the lock so a slow source never blocks readers.
        let mut buf = Vec::new();
        let size = copy_with_context(ctx, source, &mut buf)?;

        let stored = Arc::new(Stored {
            data: buf.into(),
            mod_time: Utc::now(),
        });
        self.entries.write().insert(name.to_string(), stored);

        debug!(name = %name, size, "stored cache entry");
        Ok(())
    }
}

/// An entry opened by [`MemoryCacher`].
#[derive(Debug)]
pub struct MemoryCache {
    cursor: Option<Cursor<Arc<[u8]>>>,
    name: String,
    mod_time: DateTime<Utc>,
}

impl MemoryCache {
    fn cursor_mut(&mut self) -> io::Result<&mut Cursor<Arc<[u8]>>> {
        self.cursor.as_mut().ok_or_else(|| CacheError::Closed.into())
    }
}

impl Read for MemoryCache {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor_mut()?.read(buf)
    }
}

impl Seek for MemoryCache {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor_mut()?.seek(pos)
    }
}

impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn mod_time(&self) -> DateTime<Utc> {
        self.mod_time
    }

    fn close(&mut self) -> Result<()> {
        self.cursor = None;
        Ok(())
    }
}
