//! Resource ceilings for pixel store placement.
//!
//! [`ResourceLimits`] carries the ceilings the backing store selector
//! consults each time a cache is materialized: how large a pixel footprint
//! may live on the heap, in a memory-mapped file, or on disk, and how many
//! threads parallel pixel loops may use.
//!
//! # Design
//!
//! This is deliberately a plain `Copy` value, not process-global state.
//! Whoever constructs an image owns a `ResourceLimits` and the selector
//! reads whichever value it is handed - two images built with different
//! limits in the same process never interfere, and tests run isolated limit
//! sets concurrently.
//!
//! # Usage
//!
//! ```rust
//! use pix_core::ResourceLimits;
//!
//! let mut limits = ResourceLimits::default();
//! limits.set_memory(64 * 1024 * 1024);   // spill to a mapped file past 64MiB
//! assert_eq!(limits.memory(), 64 * 1024 * 1024);
//! ```

/// Default heap ceiling in bytes (256MiB).
pub const DEFAULT_MEMORY_LIMIT: u64 = 256 * 1024 * 1024;

/// Default pixel area ceiling in bytes (twice the memory ceiling).
pub const DEFAULT_AREA_LIMIT: u64 = 2 * DEFAULT_MEMORY_LIMIT;

/// Default memory-map ceiling in bytes (twice the memory ceiling).
pub const DEFAULT_MAP_LIMIT: u64 = 2 * DEFAULT_MEMORY_LIMIT;

/// Default disk ceiling in bytes (unlimited).
pub const DEFAULT_DISK_LIMIT: u64 = u64::MAX;

/// Ceilings consulted when a pixel store is placed.
///
/// All byte ceilings compare against the cache's full footprint
/// (`columns * rows * bytes_per_pixel`). The `thread` ceiling is consulted
/// only by parallel pixel loops, never by the store selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    area: u64,
    memory: u64,
    map: u64,
    disk: u64,
    thread: usize,
}

impl ResourceLimits {
    /// Creates limits with the default ceilings.
    ///
    /// The thread ceiling defaults to the host's available parallelism
    /// (1 if that cannot be determined).
    pub fn new() -> Self {
        let thread = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            area: DEFAULT_AREA_LIMIT,
            memory: DEFAULT_MEMORY_LIMIT,
            map: DEFAULT_MAP_LIMIT,
            disk: DEFAULT_DISK_LIMIT,
            thread,
        }
    }

    /// The pixel area ceiling in bytes; footprints above it go to disk.
    #[inline]
    pub fn area(&self) -> u64 {
        self.area
    }

    /// Sets the pixel area ceiling in bytes.
    #[inline]
    pub fn set_area(&mut self, bytes: u64) {
        self.area = bytes;
    }

    /// The heap ceiling in bytes; footprints above it are memory-mapped.
    #[inline]
    pub fn memory(&self) -> u64 {
        self.memory
    }

    /// Sets the heap ceiling in bytes.
    #[inline]
    pub fn set_memory(&mut self, bytes: u64) {
        self.memory = bytes;
    }

    /// The memory-map ceiling in bytes.
    #[inline]
    pub fn map(&self) -> u64 {
        self.map
    }

    /// Sets the memory-map ceiling in bytes.
    #[inline]
    pub fn set_map(&mut self, bytes: u64) {
        self.map = bytes;
    }

    /// The disk ceiling in bytes.
    #[inline]
    pub fn disk(&self) -> u64 {
        self.disk
    }

    /// Sets the disk ceiling in bytes.
    #[inline]
    pub fn set_disk(&mut self, bytes: u64) {
        self.disk = bytes;
    }

    /// The thread ceiling for parallel pixel loops.
    #[inline]
    pub fn thread(&self) -> usize {
        self.thread
    }

    /// Sets the thread ceiling (clamped to at least 1).
    #[inline]
    pub fn set_thread(&mut self, threads: usize) {
        self.thread = threads.max(1);
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = ResourceLimits::default();
        assert_eq!(limits.memory(), DEFAULT_MEMORY_LIMIT);
        assert_eq!(limits.area(), DEFAULT_AREA_LIMIT);
        assert_eq!(limits.map(), DEFAULT_MAP_LIMIT);
        assert_eq!(limits.disk(), DEFAULT_DISK_LIMIT);
        assert!(limits.thread() >= 1);
    }

    #[test]
    fn test_setters() {
        let mut limits = ResourceLimits::default();
        limits.set_area(1);
        limits.set_memory(2);
        limits.set_map(3);
        limits.set_disk(4);
        limits.set_thread(5);
        assert_eq!(
            (
                limits.area(),
                limits.memory(),
                limits.map(),
                limits.disk(),
                limits.thread()
            ),
            (1, 2, 3, 4, 5)
        );
    }

    #[test]
    fn test_thread_floor() {
        let mut limits = ResourceLimits::default();
        limits.set_thread(0);
        assert_eq!(limits.thread(), 1);
    }

    #[test]
    fn test_isolated_values() {
        // Two limit sets never observe each other
        let a = ResourceLimits::default();
        let mut b = a;
        b.set_memory(1);
        assert_eq!(a.memory(), DEFAULT_MEMORY_LIMIT);
        assert_eq!(b.memory(), 1);
    }
}
