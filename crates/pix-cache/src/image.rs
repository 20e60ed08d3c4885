//! The image collaborator that owns a pixel cache.
//!
//! An [`Image`] is the property bag the cache subsystem serves: extents,
//! color space, storage class, alpha, a virtual pixel policy, the resource
//! limits its caches are placed with, and the cache itself. Cloning an
//! image shares the cache behind an `Arc`; the first mutable view against a
//! shared cache clones the bytes privately (copy-on-write).

use std::sync::Arc;

use pix_core::{
    ChannelLayout, ColorSpace, Quantum, ResourceLimits, Result, StorageClass, VirtualPixel,
};
use tracing::debug;

use crate::cache::PixelCache;
use crate::store::CacheKind;
use crate::view::{CacheView, CacheViewMut};

/// An RGBA colormap entry for pseudo-class images.
pub type ColormapEntry = [Quantum; 4];

/// An image backed by one pixel cache.
///
/// # Copy-on-Write
///
/// `Image` is `Clone`; a clone shares the cache and only bumps a reference
/// count. The bytes are duplicated lazily, the first time a mutable view
/// ([`pixels_mut`](Self::pixels_mut) followed by `get`/`set`) targets a
/// shared cache. Read-only access never forces the copy.
///
/// # Example
///
/// ```rust
/// use pix_cache::Image;
/// use pix_core::{ColorSpace, Region};
///
/// let mut image = Image::new(4, 4, ColorSpace::Rgb, false).unwrap();
/// let mut view = image.pixels_mut();
/// let pixels = view.set(Region::from_size(4, 4)).unwrap();
/// pixels.fill(65535);
/// view.sync().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Image {
    columns: u32,
    rows: u32,
    colorspace: ColorSpace,
    storage_class: StorageClass,
    alpha: bool,
    virtual_pixel: VirtualPixel,
    limits: ResourceLimits,
    colormap: Option<Vec<ColormapEntry>>,
    cache: Arc<PixelCache>,
}

impl Image {
    /// Creates a direct-class image with default resource limits.
    pub fn new(columns: u32, rows: u32, colorspace: ColorSpace, alpha: bool) -> Result<Self> {
        Self::with_limits(columns, rows, colorspace, alpha, ResourceLimits::default())
    }

    /// Creates a direct-class image, placing its cache with `limits`.
    ///
    /// The same limits govern later copy-on-write clones of the cache.
    pub fn with_limits(
        columns: u32,
        rows: u32,
        colorspace: ColorSpace,
        alpha: bool,
        limits: ResourceLimits,
    ) -> Result<Self> {
        let layout = ChannelLayout::for_colorspace(colorspace, alpha);
        let cache = PixelCache::acquire(columns, rows, layout, &limits)?;
        Ok(Self {
            columns,
            rows,
            colorspace,
            storage_class: StorageClass::Direct,
            alpha,
            virtual_pixel: VirtualPixel::default(),
            limits,
            colormap: None,
            cache: Arc::new(cache),
        })
    }

    /// Creates a pseudo-class (colormapped) image.
    ///
    /// The cache carries RGB tuples plus a parallel index plane; `colormap`
    /// supplies the palette the indexes refer to.
    pub fn new_indexed(
        columns: u32,
        rows: u32,
        colormap: Vec<ColormapEntry>,
        limits: ResourceLimits,
    ) -> Result<Self> {
        let layout = ChannelLayout::for_colorspace(ColorSpace::Rgb, false).with_index();
        let cache = PixelCache::acquire(columns, rows, layout, &limits)?;
        Ok(Self {
            columns,
            rows,
            colorspace: ColorSpace::Rgb,
            storage_class: StorageClass::Pseudo,
            alpha: false,
            virtual_pixel: VirtualPixel::default(),
            limits,
            colormap: Some(colormap),
            cache: Arc::new(cache),
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

    /// The color model channel values are expressed in.
    #[inline]
    pub fn colorspace(&self) -> ColorSpace {
        self.colorspace
    }

    /// Direct or pseudo (colormapped) storage.
    #[inline]
    pub fn storage_class(&self) -> StorageClass {
        self.storage_class
    }

    /// Returns `true` if pixels carry an alpha channel.
    #[inline]
    pub fn has_alpha(&self) -> bool {
        self.alpha
    }

    /// The policy for reads outside the raster.
    #[inline]
    pub fn virtual_pixel(&self) -> VirtualPixel {
        self.virtual_pixel
    }

    /// Sets the policy for reads outside the raster.
    #[inline]
    pub fn set_virtual_pixel(&mut self, policy: VirtualPixel) {
        self.virtual_pixel = policy;
    }

    /// The resource limits this image's caches are placed with.
    #[inline]
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// The channel layout of the cache tuples.
    #[inline]
    pub fn channel_layout(&self) -> &ChannelLayout {
        self.cache.layout()
    }

    /// The medium the current cache occupies.
    #[inline]
    pub fn cache_kind(&self) -> CacheKind {
        self.cache.kind()
    }

    /// The colormap of a pseudo-class image, if any.
    #[inline]
    pub fn colormap(&self) -> Option<&[ColormapEntry]> {
        self.colormap.as_deref()
    }

    /// Looks up a colormap entry by pixel index.
    pub fn colormap_color(&self, index: Quantum) -> Option<ColormapEntry> {
        self.colormap
            .as_ref()
            .and_then(|map| map.get(index as usize))
            .copied()
    }

    /// Returns `true` if two images currently share one pixel cache.
    pub fn shares_storage(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.cache, &other.cache)
    }

    /// Opens a read-only view; any number may coexist.
    pub fn pixels(&self) -> CacheView<'_> {
        CacheView::new(self)
    }

    /// Opens a mutable view; exclusive while it lives.
    pub fn pixels_mut(&mut self) -> CacheViewMut<'_> {
        CacheViewMut::new(self)
    }

    pub(crate) fn cache(&self) -> &PixelCache {
        &self.cache
    }

    /// Replaces a shared cache with a private copy of its bytes.
    ///
    /// No-op when this image is the cache's only owner.
    pub(crate) fn ensure_unique_cache(&mut self) -> Result<()> {
        if Arc::strong_count(&self.cache) > 1 {
            debug!(
                columns = self.columns,
                rows = self.rows,
                "clone shared pixel cache for writing"
            );
            let cloned = self.cache.clone_storage(&self.limits)?;
            self.cache = Arc::new(cloned);
        }
        Ok(())
    }
}
