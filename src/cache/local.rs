// Local disk cache backend.
// Maps cache names onto a directory tree and writes entries atomically via temp files.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::{Cache, Cacher, copy_with_context, name};
use crate::context::Context;
use crate::error::{CacheError, Result};

/// Prefix and suffix of the temp files an in-flight `set` writes before renaming.
const TEMP_PREFIX: &str = ".cacher-";
const TEMP_SUFFIX: &str = ".tmp";

/// A [`Cacher`] backed by the local disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalCacher {
    /// Root of the caches, as a UNIX-style path.
    ///
    /// If empty, the platform temporary directory is used, looked up again
    /// on every call.
    pub root: String,
}

impl LocalCacher {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// The native root directory entries are stored under.
    pub fn root_dir(&self) -> PathBuf {
        name::root_path(&self.root)
    }

    /// The native path `name` is stored at. Performs no existence check.
    pub fn local_path(&self, name: &str) -> Result<PathBuf> {
        name::resolve(&self.root_dir(), name)
    }

    /// Open the entry stored under `name`.
    pub fn open(&self, ctx: &Context, name: &str) -> Result<LocalCache> {
        ctx.check()?;
        let path = self.local_path(name)?;
        if is_temp_file(&path) {
            debug!(name = %name, "cache name matches an in-flight spool file");
            return Err(CacheError::NotFound(name.to_string()));
        }

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if is_missing(&e) || path.is_dir() => {
                debug!(name = %name, "cache miss");
                return Err(CacheError::NotFound(name.to_string()));
            }
            Err(e) => {
                warn!(name = %name, path = ?path, error = %e, "failed to open cache entry");
                return Err(e.into());
            }
        };

        let metadata = file.metadata()?;
        if !metadata.is_file() {
            debug!(name = %name, path = ?path, "cache name resolves to a non-file");
            return Err(CacheError::NotFound(name.to_string()));
        }
        let mod_time = DateTime::<Utc>::from(metadata.modified()?);

        debug!(name = %name, size = metadata.len(), "cache hit");
        Ok(LocalCache {
            file: Some(file),
            name: name.to_string(),
            mod_time,
            size: metadata.len(),
        })
    }

    /// Store everything `source` yields under `name`, returning the byte count.
    ///
    /// The bytes land in a temp file next to the target and are renamed into
    /// place only once fully written and synced, so readers see either the
    /// old entry or the new one.
    pub fn store(&self, ctx: &Context, name: &str, source: &mut dyn Read) -> Result<u64> {
        ctx.check()?;
        let path = self.local_path(name)?;
        let dir = match path.parent() {
            Some(parent) => parent.to_path_buf(),
            None => self.root_dir(),
        };

        fs::create_dir_all(&dir).inspect_err(|e| {
            warn!(name = %name, dir = ?dir, error = %e, "failed to create cache directory");
        })?;

        let mut temp = temp_builder().tempfile_in(&dir)?;
        trace!(name = %name, temp = ?temp.path(), "spooling cache entry");

        // The temp file is removed on drop if anything below fails.
        let size = copy_with_context(ctx, source, temp.as_file_mut())?;
        temp.as_file().sync_all()?;
        ctx.check()?;

        temp.persist(&path).map_err(|e| {
            warn!(
                name = %name,
                path = ?path,
                error = %e.error,
                "failed to move cache entry into place"
            );
            CacheError::Io(e.error)
        })?;
        sync_dir(&dir)?;

        debug!(name = %name, size, "stored cache entry");
        Ok(size)
    }
}

impl Cacher for LocalCacher {
    fn get(&self, ctx: &Context, name: &str) -> Result<Box<dyn Cache>> {
        Ok(Box::new(self.open(ctx, name)?))
    }

    fn set(&self, ctx: &Context, name: &str, source: &mut dyn Read) -> Result<()> {
        self.store(ctx, name, source).map(|_| ())
    }
}

/// An entry opened by [`LocalCacher`].
#[derive(Debug)]
pub struct LocalCache {
    file: Option<File>,
    name: String,
    mod_time: DateTime<Utc>,
    size: u64,
}

impl LocalCache {
    /// Size in bytes at the time the entry was opened.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(|| CacheError::Closed.into())
    }
}

impl Read for LocalCache {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file_mut()?.read(buf)
    }
}

impl Seek for LocalCache {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file_mut()?.seek(pos)
    }
}

impl Cache for LocalCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn mod_time(&self) -> DateTime<Utc> {
        self.mod_time
    }

    fn close(&mut self) -> Result<()> {
        if self.file.take().is_some() {
            trace!(name = %self.name, "closed cache entry");
        }
        Ok(())
    }
}

fn temp_builder() -> tempfile::Builder<'static, 'static> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(TEMP_PREFIX).suffix(TEMP_SUFFIX);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder
}

/// Flush the directory entry of a freshly renamed file.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Whether an open error means nothing is stored at the path.
fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Whether `path` is a temp file left by an in-flight or crashed `store`.
pub(crate) fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX))
}
