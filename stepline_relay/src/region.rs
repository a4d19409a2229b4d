//! The shared-memory region and its field-write surface.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use memmap2::MmapMut;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RelayError;
use crate::layout::REGION_SIZE;

/// Field-level access to a command region.
///
/// This is the seam between the relay's commit protocol and the physical
/// memory: production code maps the real region, tests substitute an
/// instrumented implementation that records write order.
///
/// Offsets are byte offsets of 4-byte-aligned u32 fields inside the
/// 80-byte layout; implementations must panic on anything else. An
/// out-of-layout write is a programming error, never data.
pub trait CommandRegion {
    /// Write one u32 field at `offset`.
    fn write_u32(&mut self, offset: usize, value: u32);

    /// Read one u32 field at `offset`.
    fn read_u32(&self, offset: usize) -> u32;

    /// Zero the whole region.
    fn clear(&mut self);
}

// A mutable borrow of a region is itself a region, so callers can lend a
// region to a relay and keep it afterwards (tests rely on this).
impl<T: CommandRegion + ?Sized> CommandRegion for &mut T {
    fn write_u32(&mut self, offset: usize, value: u32) {
        (**self).write_u32(offset, value);
    }

    fn read_u32(&self, offset: usize) -> u32 {
        (**self).read_u32(offset)
    }

    fn clear(&mut self) {
        (**self).clear();
    }
}

#[inline]
fn check_offset(offset: usize) {
    assert!(
        offset % 4 == 0 && offset + 4 <= REGION_SIZE,
        "offset {offset} outside the region layout"
    );
}

// ─── Mapped region ──────────────────────────────────────────────────

/// Diagnostic side-file describing an active region mapping.
#[derive(Debug, Serialize, Deserialize)]
struct RegionMetadata {
    path: PathBuf,
    size: usize,
    writer_pid: u32,
    created_at: SystemTime,
}

/// The memory-mapped 80-byte window shared with the pulse engine.
///
/// One instance exists per engine session; the relay holds exclusive write
/// access for that session's lifetime, the engine only reads. Field writes
/// are volatile so the compiler never elides or reorders them against each
/// other into the mapping.
#[derive(Debug)]
pub struct SharedMemoryRegion {
    map: MmapMut,
    path: PathBuf,
    meta_path: PathBuf,
}

impl SharedMemoryRegion {
    /// Open and map the backing resource.
    ///
    /// The file is created if missing and sized to the region layout.
    /// Fails fast with [`RelayError::RegionUnavailable`]; callers must not
    /// continue without a region.
    pub fn open(path: &Path) -> Result<Self, RelayError> {
        let unavailable = |source| RelayError::RegionUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(unavailable)?;
        file.set_len(REGION_SIZE as u64).map_err(unavailable)?;

        // SAFETY: the mapping is private to this process pair by deployment
        // contract; the file stays alive as long as the map does.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(unavailable)?;

        let meta_path = path.with_extension("meta");
        let region = Self {
            map,
            path: path.to_path_buf(),
            meta_path,
        };
        region.write_metadata();
        debug!(target: "stepline_relay", path = %region.path.display(), "region mapped");
        Ok(region)
    }

    /// Backing path of the mapping.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the active mapping in a JSON side-file for diagnostics.
    /// Best-effort: the session does not depend on it.
    fn write_metadata(&self) {
        let meta = RegionMetadata {
            path: self.path.clone(),
            size: REGION_SIZE,
            writer_pid: std::process::id(),
            created_at: SystemTime::now(),
        };
        let result = serde_json::to_string_pretty(&meta)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&self.meta_path, json));
        if let Err(e) = result {
            warn!(target: "stepline_relay", error = %e, "region metadata not written");
        }
    }
}

impl CommandRegion for SharedMemoryRegion {
    fn write_u32(&mut self, offset: usize, value: u32) {
        check_offset(offset);
        // SAFETY: offset is validated against the layout; the mapping is at
        // least REGION_SIZE bytes and u32-aligned (page-aligned base,
        // 4-byte offsets).
        unsafe {
            let ptr = self.map.as_mut_ptr().add(offset).cast::<u32>();
            ptr.write_volatile(value);
        }
    }

    fn read_u32(&self, offset: usize) -> u32 {
        check_offset(offset);
        // SAFETY: as above.
        unsafe {
            let ptr = self.map.as_ptr().add(offset).cast::<u32>();
            ptr.read_volatile()
        }
    }

    fn clear(&mut self) {
        for offset in (0..REGION_SIZE).step_by(4) {
            self.write_u32(offset, 0);
        }
    }
}

impl Drop for SharedMemoryRegion {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.meta_path);
    }
}
