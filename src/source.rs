//! Read-only byte view over the whole input file.

use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::error::{Error, Result};

/// The input file mapped into memory. Empty files are not mapped at all.
pub struct MappedFile {
    mmap: Option<Mmap>,
}

impl MappedFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| Error::Stat {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if len == 0 {
            debug!(path = %path.display(), "input file is empty");
            return Ok(Self { mmap: None });
        }
        // SAFETY: the map is read-only and the file is assumed not to be
        // truncated or rewritten while the run holds it.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| Error::Map {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = len, "mapped input file");
        Ok(Self { mmap: Some(mmap) })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

impl Deref for MappedFile {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}
