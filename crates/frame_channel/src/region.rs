//! 共享内存区域访问
//!
//! The reader only ever needs three things from the region: its length, an
//! acquire load of the sequence word, and a raw byte copy. Keeping that
//! behind [`SharedRegion`] lets tests script concurrent-writer behavior.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use contracts::{RegionConfig, HEADER_SIZE, SEQUENCE_OFFSET};
use memmap2::Mmap;
use tracing::{debug, instrument};

use crate::error::{FrameChannelError, Result};

/// Read-side view of a region that another process writes concurrently
pub trait SharedRegion: Send {
    /// Mapped length in bytes
    fn len(&self) -> usize;

    /// Acquire-load of the sequence word at [`SEQUENCE_OFFSET`]
    fn load_sequence(&self) -> u32;

    /// Copy `dst.len()` bytes starting at `offset`
    ///
    /// Returns `false` (copying nothing) if the range is outside the region.
    fn copy_into(&self, offset: usize, dst: &mut [u8]) -> bool;
}

/// Something that can (re)establish a mapping
pub trait RegionSource: Send {
    type Region: SharedRegion;

    /// Region identifier, for logs
    fn describe(&self) -> String;

    /// Try to map the region; failures are expected before the producer starts
    fn open(&mut self) -> Result<Self::Region>;
}

/// Read-only file-backed mapping
pub struct MappedRegion {
    map: Mmap,
}

impl MappedRegion {
    /// Map `path` read-only, requiring at least `min_len` bytes
    pub fn open(path: &Path, min_len: usize) -> Result<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FrameChannelError::RegionMissing {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata()?.len() as usize;
        let required = min_len.max(HEADER_SIZE);
        if len < required {
            return Err(FrameChannelError::RegionUndersized {
                path: path.to_path_buf(),
                len,
                required,
            });
        }

        // SAFETY: the mapping is only ever read through `load_sequence`
        // (atomic) and `copy_into` (raw copy whose result is discarded unless
        // the sequence check passes).
        let map = unsafe { Mmap::map(&file)? };
        if map.len() < required {
            return Err(FrameChannelError::RegionUndersized {
                path: path.to_path_buf(),
                len: map.len(),
                required,
            });
        }

        Ok(Self { map })
    }
}

impl SharedRegion for MappedRegion {
    #[inline]
    fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    fn load_sequence(&self) -> u32 {
        // SAFETY: length >= HEADER_SIZE was checked at open; the mapping is
        // page aligned so offset 8 is 4-byte aligned.
        let word = unsafe { &*(self.map.as_ptr().add(SEQUENCE_OFFSET) as *const AtomicU32) };
        word.load(Ordering::Acquire)
    }

    fn copy_into(&self, offset: usize, dst: &mut [u8]) -> bool {
        let Some(end) = offset.checked_add(dst.len()) else {
            return false;
        };
        if end > self.map.len() {
            return false;
        }
        // SAFETY: bounds checked above; the bytes may be concurrently
        // modified, which the caller detects via the sequence word.
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.map.as_ptr().add(offset),
                dst.as_mut_ptr(),
                dst.len(),
            );
        }
        true
    }
}

/// Opens the configured region file on demand
#[derive(Debug, Clone)]
pub struct FileRegionSource {
    path: PathBuf,
    min_len: usize,
}

impl FileRegionSource {
    pub fn new(path: impl Into<PathBuf>, min_len: usize) -> Self {
        Self {
            path: path.into(),
            min_len,
        }
    }

    pub fn from_config(config: &RegionConfig) -> Self {
        Self::new(config.path.clone(), config.mapping_size())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegionSource for FileRegionSource {
    type Region = MappedRegion;

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    #[instrument(name = "region_open", skip(self), fields(path = %self.path.display()))]
    fn open(&mut self) -> Result<MappedRegion> {
        let region = MappedRegion::open(&self.path, self.min_len)?;
        debug!(len = region.len(), "shared region mapped");
        Ok(region)
    }
}
