//! The canonical pixel store for one image.
//!
//! A [`PixelCache`] owns `columns x rows` interleaved quantum tuples plus,
//! for pseudo-class images, a parallel index plane stored after the color
//! plane. The backing medium is chosen once at acquisition from the resource
//! limits and never changes; resizing an image means acquiring a new cache.
//!
//! All row I/O clips to the raster; reads outside it resolve through the
//! caller's [`VirtualPixel`] policy. Store access is serialized behind a
//! mutex because the disk medium's file handle is stateful.

use std::io;
use std::sync::Mutex;

use pix_core::{ChannelLayout, Error, Quantum, Region, ResourceLimits, Result, VirtualPixel};
use tracing::debug;

use crate::store::{select_medium, Backing, CacheKind};

const QUANTUM_BYTES: u64 = std::mem::size_of::<Quantum>() as u64;

/// Canonical pixel storage for one image.
///
/// Acquired once per image; clones of an image share one cache behind an
/// `Arc` until a mutable view forces a private copy (see
/// [`Image`](crate::Image)). Dropping the last owner releases the medium.
#[derive(Debug)]
pub struct PixelCache {
    columns: u32,
    rows: u32,
    layout: ChannelLayout,
    kind: CacheKind,
    store: Mutex<Backing>,
}

impl PixelCache {
    /// Materializes a zero-filled cache for a `columns x rows` raster.
    ///
    /// The medium is selected from `limits` at call time; a zero-extent
    /// raster or an overflowing footprint is rejected with an allocation
    /// error rather than producing an unusable store.
    pub fn acquire(
        columns: u32,
        rows: u32,
        layout: ChannelLayout,
        limits: &ResourceLimits,
    ) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(Error::allocation(0, "no pixels defined in cache"));
        }
        let pixels = columns as u64 * rows as u64;
        let bytes = pixels
            .checked_mul(layout.bytes_per_pixel() as u64)
            .ok_or_else(|| Error::allocation(u64::MAX, "pixel footprint overflows"))?;
        let kind = select_medium(bytes, limits)?;
        let store = Backing::allocate(kind, bytes)?;
        debug_assert_eq!(store.len(), bytes);
        debug!(
            columns,
            rows,
            channels = layout.channel_count(),
            indexed = layout.is_indexed(),
            kind = %kind,
            bytes,
            "open pixel cache"
        );
        Ok(Self {
            columns,
            rows,
            layout,
            kind,
            store: Mutex::new(store),
        })
    }

    /// Raster width in pixels.
    #[inline]
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Raster height in pixels.
    #[inline]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// The channel layout the cache was shaped for.
    #[inline]
    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    /// The medium this cache occupies.
    #[inline]
    pub fn kind(&self) -> CacheKind {
        self.kind
    }

    /// Total store size in bytes.
    pub fn len_bytes(&self) -> u64 {
        self.columns as u64 * self.rows as u64 * self.layout.bytes_per_pixel() as u64
    }

    /// Copies this cache's bytes into a freshly materialized cache.
    ///
    /// The new medium is selected from `limits` independently of this
    /// cache's medium. Used by the copy-on-write path.
    pub(crate) fn clone_storage(&self, limits: &ResourceLimits) -> Result<PixelCache> {
        let clone = PixelCache::acquire(self.columns, self.rows, self.layout.clone(), limits)?;
        let total = self.len_bytes();
        debug!(bytes = total, from = %self.kind, to = %clone.kind, "clone pixel cache");
        let mut src = self.store.lock().unwrap();
        let mut dst = clone.store.lock().unwrap();
        const CHUNK: usize = 1 << 16;
        let mut buf = vec![0u8; CHUNK.min(total as usize)];
        let mut offset = 0u64;
        while offset < total {
            let n = CHUNK.min((total - offset) as usize);
            src.read_at(offset, &mut buf[..n])
                .map_err(|e| Error::allocation(total, e.to_string()))?;
            dst.write_at(offset, &buf[..n])
                .map_err(|e| Error::allocation(total, e.to_string()))?;
            offset += n as u64;
        }
        drop(dst);
        drop(src);
        Ok(clone)
    }

    /// Byte offset of pixel (x, y) in the color plane.
    #[inline]
    fn color_offset(&self, x: u32, y: u32) -> u64 {
        let tuple = y as u64 * self.columns as u64 + x as u64;
        tuple * self.layout.channel_count() as u64 * QUANTUM_BYTES
    }

    /// Byte offset of pixel (x, y) in the index plane.
    #[inline]
    fn index_offset(&self, x: u32, y: u32) -> u64 {
        let pixels = self.columns as u64 * self.rows as u64;
        let base = pixels * self.layout.channel_count() as u64 * QUANTUM_BYTES;
        base + (y as u64 * self.columns as u64 + x as u64) * QUANTUM_BYTES
    }

    /// Materializes the color tuples for `region` into an owned buffer.
    ///
    /// Out-of-bounds coordinates resolve through `policy`; the call only
    /// fails when the staging buffer or a store read fails.
    pub(crate) fn read_region(
        &self,
        region: Region,
        policy: VirtualPixel,
    ) -> Result<Vec<Quantum>> {
        if region.is_empty() {
            return Err(Error::cache_access(region, "empty region"));
        }
        let nch = self.layout.channel_count();
        let row_len = region.width as usize * nch;
        let mut out = staging(region, row_len * region.height as usize)?;
        let mut store = self.store.lock().unwrap();
        for row in 0..region.height as usize {
            let y = region.y + row as i64;
            let dst = &mut out[row * row_len..(row + 1) * row_len];
            let authentic_row = y >= 0
                && y < self.rows as i64
                && region.x >= 0
                && region.right() <= self.columns as i64;
            if authentic_row {
                let offset = self.color_offset(region.x as u32, y as u32);
                read_quantums(&mut store, offset, dst)
                    .map_err(|e| Error::cache_access(region, e.to_string()))?;
            } else {
                for col in 0..region.width as usize {
                    let x = region.x + col as i64;
                    let px = &mut dst[col * nch..(col + 1) * nch];
                    match policy.resolve(x, y, self.columns, self.rows) {
                        Some((ax, ay)) => {
                            let offset = self.color_offset(ax, ay);
                            read_quantums(&mut store, offset, px)
                                .map_err(|e| Error::cache_access(region, e.to_string()))?;
                        }
                        None => px.fill(0),
                    }
                }
            }
        }
        Ok(out)
    }

    /// Commits `data` (one tuple per region pixel, row-major) back to the
    /// color plane. Only the authentic intersection with the raster is
    /// written; virtual portions of the region are dropped.
    pub(crate) fn write_region(&self, region: Region, data: &[Quantum]) -> Result<()> {
        let nch = self.layout.channel_count();
        debug_assert_eq!(data.len(), region.area() as usize * nch);
        let Some(auth) = region.intersect_bounds(self.columns, self.rows) else {
            return Ok(());
        };
        let mut store = self.store.lock().unwrap();
        for row in 0..auth.height as usize {
            let y = auth.y + row as i64;
            let src_row = (y - region.y) as usize;
            let src_col = (auth.x - region.x) as usize;
            let start = (src_row * region.width as usize + src_col) * nch;
            let src = &data[start..start + auth.width as usize * nch];
            let offset = self.color_offset(auth.x as u32, y as u32);
            write_quantums(&mut store, offset, src).map_err(Error::sync)?;
        }
        Ok(())
    }

    /// Materializes the index plane for `region`, or `None` for
    /// direct-class caches. Virtual coordinates resolve like color reads;
    /// a black virtual pixel carries index zero.
    pub(crate) fn read_index_region(
        &self,
        region: Region,
        policy: VirtualPixel,
    ) -> Result<Option<Vec<Quantum>>> {
        if !self.layout.is_indexed() {
            return Ok(None);
        }
        if region.is_empty() {
            return Err(Error::cache_access(region, "empty region"));
        }
        let mut out = staging(region, region.area() as usize)?;
        let mut store = self.store.lock().unwrap();
        for (i, (x, y)) in region.iter_coords().enumerate() {
            out[i] = match policy.resolve(x, y, self.columns, self.rows) {
                Some((ax, ay)) => {
                    let mut one = [0 as Quantum];
                    read_quantums(&mut store, self.index_offset(ax, ay), &mut one)
                        .map_err(|e| Error::cache_access(region, e.to_string()))?;
                    one[0]
                }
                None => 0,
            };
        }
        Ok(Some(out))
    }

    /// Commits index staging back to the index plane; no-op for
    /// direct-class caches.
    pub(crate) fn write_index_region(&self, region: Region, data: &[Quantum]) -> Result<()> {
        if !self.layout.is_indexed() {
            return Ok(());
        }
        debug_assert_eq!(data.len(), region.area() as usize);
        let Some(auth) = region.intersect_bounds(self.columns, self.rows) else {
            return Ok(());
        };
        let mut store = self.store.lock().unwrap();
        for row in 0..auth.height as usize {
            let y = auth.y + row as i64;
            let src_row = (y - region.y) as usize;
            let src_col = (auth.x - region.x) as usize;
            let start = src_row * region.width as usize + src_col;
            let src = &data[start..start + auth.width as usize];
            let offset = self.index_offset(auth.x as u32, y as u32);
            write_quantums(&mut store, offset, src).map_err(Error::sync)?;
        }
        Ok(())
    }
}

/// Allocates a zeroed staging buffer, reporting failure as a cache access
/// error for `region`.
fn staging(region: Region, len: usize) -> Result<Vec<Quantum>> {
    let mut out = Vec::new();
    out.try_reserve_exact(len)
        .map_err(|e| Error::cache_access(region, e.to_string()))?;
    out.resize(len, 0);
    Ok(out)
}

fn read_quantums(store: &mut Backing, offset: u64, out: &mut [Quantum]) -> io::Result<()> {
    let mut bytes = vec![0u8; std::mem::size_of_val(out)];
    store.read_at(offset, &mut bytes)?;
    for (q, b) in out.iter_mut().zip(bytes.chunks_exact(2)) {
        *q = Quantum::from_ne_bytes([b[0], b[1]]);
    }
    Ok(())
}

fn write_quantums(store: &mut Backing, offset: u64, data: &[Quantum]) -> io::Result<()> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(data));
    for q in data {
        bytes.extend_from_slice(&q.to_ne_bytes());
    }
    store.write_at(offset, &bytes)
}
