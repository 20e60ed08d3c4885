//! Backing store media and the medium selector.
//!
//! A pixel store lives on exactly one medium, chosen once when the cache is
//! materialized: heap memory, an anonymous memory-mapped file, or a plain
//! anonymous file on disk. The selector walks the resource limits from the
//! cheapest tier outward; when a preferred tier's own ceiling is also
//! exceeded the acquisition fails outright rather than degrading further.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use memmap2::MmapMut;
use pix_core::{Error, ResourceLimits, Result};

/// The medium a pixel store occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Heap memory.
    Memory,
    /// Anonymous file mapped into the address space.
    Mapped,
    /// Anonymous file on disk, accessed through seeks.
    Disk,
}

impl std::fmt::Display for CacheKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Memory => "memory",
            Self::Mapped => "memory-mapped",
            Self::Disk => "disk",
        };
        f.write_str(name)
    }
}

/// Chooses the medium for a `bytes`-sized pixel store.
///
/// Footprints above the `area` ceiling go to disk; above the `memory`
/// ceiling, to a memory-mapped file; otherwise the heap. If the chosen
/// medium's own ceiling (`disk` or `map`) is also exceeded the acquisition
/// fails with an allocation error - there is no further fallback.
pub(crate) fn select_medium(bytes: u64, limits: &ResourceLimits) -> Result<CacheKind> {
    if bytes > limits.area() {
        if bytes > limits.disk() {
            return Err(Error::allocation(
                bytes,
                format!("pixel footprint exceeds the disk limit of {} bytes", limits.disk()),
            ));
        }
        Ok(CacheKind::Disk)
    } else if bytes > limits.memory() {
        if bytes > limits.map() {
            return Err(Error::allocation(
                bytes,
                format!("pixel footprint exceeds the map limit of {} bytes", limits.map()),
            ));
        }
        Ok(CacheKind::Mapped)
    } else {
        Ok(CacheKind::Memory)
    }
}

/// One materialized backing store.
///
/// Offsets are raw byte positions within the store; callers own the layout.
#[derive(Debug)]
pub(crate) enum Backing {
    Memory(Vec<u8>),
    Mapped(MmapMut),
    Disk(File),
}

impl Backing {
    /// Allocates a zero-filled store of `bytes` on the given medium.
    pub(crate) fn allocate(kind: CacheKind, bytes: u64) -> Result<Self> {
        match kind {
            CacheKind::Memory => {
                let len = usize::try_from(bytes).map_err(|_| {
                    Error::allocation(bytes, "pixel footprint exceeds addressable memory")
                })?;
                let mut data = Vec::new();
                data.try_reserve_exact(len)
                    .map_err(|e| Error::allocation(bytes, e.to_string()))?;
                data.resize(len, 0);
                Ok(Self::Memory(data))
            }
            CacheKind::Mapped => {
                let file = spill_file(bytes)?;
                // Safety: the file is anonymous and exclusively owned by this
                // store, so nothing else can truncate it under the mapping.
                let map = unsafe { MmapMut::map_mut(&file) }
                    .map_err(|e| Error::allocation(bytes, e.to_string()))?;
                Ok(Self::Mapped(map))
            }
            CacheKind::Disk => Ok(Self::Disk(spill_file(bytes)?)),
        }
    }

    /// The medium this store occupies.
    pub(crate) fn kind(&self) -> CacheKind {
        match self {
            Self::Memory(_) => CacheKind::Memory,
            Self::Mapped(_) => CacheKind::Mapped,
            Self::Disk(_) => CacheKind::Disk,
        }
    }

    /// Total store size in bytes.
    pub(crate) fn len(&self) -> u64 {
        match self {
            Self::Memory(data) => data.len() as u64,
            Self::Mapped(map) => map.len() as u64,
            Self::Disk(file) => file.metadata().map(|m| m.len()).unwrap_or(0),
        }
    }

    /// Reads `buf.len()` bytes starting at `offset`.
    pub(crate) fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        match self {
            Self::Memory(data) => copy_from(data, offset, buf),
            Self::Mapped(map) => copy_from(map, offset, buf),
            Self::Disk(file) => {
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(buf)
            }
        }
    }

    /// Writes `data` starting at `offset`.
    pub(crate) fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        match self {
            Self::Memory(buf) => copy_into(buf, offset, data),
            Self::Mapped(map) => copy_into(map, offset, data),
            Self::Disk(file) => {
                file.seek(SeekFrom::Start(offset))?;
                file.write_all(data)
            }
        }
    }
}

/// Creates an anonymous temp file extended to `bytes`.
fn spill_file(bytes: u64) -> Result<File> {
    let file = tempfile::tempfile().map_err(|e| Error::allocation(bytes, e.to_string()))?;
    file.set_len(bytes)
        .map_err(|e| Error::allocation(bytes, e.to_string()))?;
    Ok(file)
}

fn copy_from(store: &[u8], offset: u64, buf: &mut [u8]) -> io::Result<()> {
    let range = checked_range(store.len(), offset, buf.len())?;
    buf.copy_from_slice(&store[range]);
    Ok(())
}

fn copy_into(store: &mut [u8], offset: u64, data: &[u8]) -> io::Result<()> {
    let range = checked_range(store.len(), offset, data.len())?;
    store[range].copy_from_slice(data);
    Ok(())
}

fn checked_range(store_len: usize, offset: u64, len: usize) -> io::Result<std::ops::Range<usize>> {
    let start = usize::try_from(offset)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset out of range"))?;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= store_len)
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "access past end of pixel store")
        })?;
    Ok(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(area: u64, memory: u64, map: u64, disk: u64) -> ResourceLimits {
        let mut l = ResourceLimits::default();
        l.set_area(area);
        l.set_memory(memory);
        l.set_map(map);
        l.set_disk(disk);
        l
    }

    #[test]
    fn selector_prefers_memory() {
        let l = limits(1000, 1000, 1000, 1000);
        assert_eq!(select_medium(500, &l).unwrap(), CacheKind::Memory);
    }

    #[test]
    fn selector_spills_to_map_past_memory_limit() {
        let l = limits(1000, 100, 1000, 1000);
        assert_eq!(select_medium(500, &l).unwrap(), CacheKind::Mapped);
    }

    #[test]
    fn selector_spills_to_disk_past_area_limit() {
        let l = limits(100, 100, 100, 1000);
        assert_eq!(select_medium(500, &l).unwrap(), CacheKind::Disk);
    }

    #[test]
    fn selector_fails_when_map_limit_also_exceeded() {
        let l = limits(1000, 100, 200, 1000);
        let err = select_medium(500, &l).unwrap_err();
        assert!(err.is_allocation());
    }

    #[test]
    fn selector_fails_when_disk_limit_also_exceeded() {
        let l = limits(100, 100, 100, 200);
        let err = select_medium(500, &l).unwrap_err();
        assert!(err.is_allocation());
    }

    #[test]
    fn backing_round_trip_all_media() {
        for kind in [CacheKind::Memory, CacheKind::Mapped, CacheKind::Disk] {
            let mut store = Backing::allocate(kind, 64).unwrap();
            assert_eq!(store.kind(), kind);
            assert_eq!(store.len(), 64);

            store.write_at(16, &[1, 2, 3, 4]).unwrap();
            let mut buf = [0u8; 4];
            store.read_at(16, &mut buf).unwrap();
            assert_eq!(buf, [1, 2, 3, 4]);

            // Zero-filled elsewhere
            store.read_at(0, &mut buf).unwrap();
            assert_eq!(buf, [0, 0, 0, 0]);
        }
    }

    #[test]
    fn backing_rejects_access_past_end() {
        let mut store = Backing::allocate(CacheKind::Memory, 16).unwrap();
        let mut buf = [0u8; 8];
        assert!(store.read_at(12, &mut buf).is_err());
        assert!(store.write_at(12, &buf).is_err());
    }
}
