//! Rectangle-scoped views over a pixel cache.
//!
//! Views are the sole sanctioned way to read or write cached pixels. A view
//! binds at most one rectangle at a time; requesting another rectangle
//! replaces the binding. Mutable bindings are staged in an owned buffer and
//! committed back with an explicit [`sync`](CacheViewMut::sync) - a view
//! never auto-syncs on drop, so pending writes are lost unless synced.
//!
//! Two view types split read and write capability along Rust's borrow
//! rules:
//!
//! - [`CacheView`] borrows the image shared; any number may coexist.
//! - [`CacheViewMut`] borrows the image exclusively; its `get`/`set` are
//!   what trigger copy-on-write on a shared cache.
//!
//! # State machine
//!
//! ```text
//! Unbound --get/set/get_const--> Bound(region, mode)
//! Bound   --sync-->               Bound (unchanged; commit if mutable+dirty)
//! Bound   --get/set/get_const--> Bound(new region, new mode)
//! any     --drop-->               gone (no implicit sync)
//! ```

use pix_core::{Error, PixelChannel, Quantum, Region, Result};
use tracing::trace;

use crate::image::Image;

/// Access intent of the current binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindMode {
    /// Inspection only; sync is a guaranteed no-op success.
    Read,
    /// Staged for write-back.
    Write,
}

#[derive(Debug)]
struct Binding {
    region: Region,
    mode: BindMode,
    pixels: Vec<Quantum>,
    indexes: Option<Vec<Quantum>>,
    dirty: bool,
}

/// Read-only view over an image's pixel cache.
///
/// Created by [`Image::pixels`]. Never triggers copy-on-write and never
/// acquires a write-back obligation.
#[derive(Debug)]
pub struct CacheView<'a> {
    image: &'a Image,
    binding: Option<Binding>,
}

impl<'a> CacheView<'a> {
    pub(crate) fn new(image: &'a Image) -> Self {
        Self {
            image,
            binding: None,
        }
    }

    /// Binds `region` for inspection and returns the materialized tuples.
    ///
    /// Out-of-bounds portions resolve through the image's virtual pixel
    /// policy. The slice lives until the next bind or view destruction.
    pub fn get_const(&mut self, region: Region) -> Result<&[Quantum]> {
        trace!(region = %region, "view get_const");
        let pixels = self.image.cache().read_region(region, self.image.virtual_pixel())?;
        let indexes = self
            .image
            .cache()
            .read_index_region(region, self.image.virtual_pixel())?;
        let binding = self.binding.insert(Binding {
            region,
            mode: BindMode::Read,
            pixels,
            indexes,
            dirty: false,
        });
        Ok(&binding.pixels)
    }

    /// The index-plane staging parallel to the last bound rectangle, or
    /// `None` when unbound or the cache is direct-class.
    pub fn indexes(&self) -> Option<&[Quantum]> {
        self.binding.as_ref()?.indexes.as_deref()
    }

    /// The auxiliary per-pixel plane of the last bound rectangle.
    ///
    /// Pseudo-class caches keep their colormap indexes there, so this is
    /// [`indexes`](Self::indexes) under the plane's generic name.
    pub fn metacontent(&self) -> Option<&[Quantum]> {
        self.indexes()
    }

    /// The rectangle currently bound, if any.
    pub fn region(&self) -> Option<Region> {
        self.binding.as_ref().map(|b| b.region)
    }

    /// Element offset of `channel` within one pixel tuple.
    pub fn offset(&self, channel: PixelChannel) -> Result<usize> {
        self.image
            .channel_layout()
            .offset_of(channel)
            .ok_or(Error::MissingChannel(channel))
    }
}

/// Mutable view over an image's pixel cache.
///
/// Created by [`Image::pixels_mut`]. The first [`get`](Self::get) or
/// [`set`](Self::set) against a cache shared with a clone copies the bytes
/// privately before binding (copy-on-write); [`get_const`](Self::get_const)
/// does not.
#[derive(Debug)]
pub struct CacheViewMut<'a> {
    image: &'a mut Image,
    binding: Option<Binding>,
}

impl<'a> CacheViewMut<'a> {
    pub(crate) fn new(image: &'a mut Image) -> Self {
        Self {
            image,
            binding: None,
        }
    }

    /// Binds `region` read-write: materializes current contents and returns
    /// mutable staging. Call [`sync`](Self::sync) to commit changes.
    pub fn get(&mut self, region: Region) -> Result<&mut [Quantum]> {
        trace!(region = %region, "view get");
        self.image.ensure_unique_cache()?;
        let pixels = self.image.cache().read_region(region, self.image.virtual_pixel())?;
        let indexes = self
            .image
            .cache()
            .read_index_region(region, self.image.virtual_pixel())?;
        Ok(self.bind(region, BindMode::Write, pixels, indexes))
    }

    /// Binds `region` for inspection only. Same materialization as
    /// [`get`](Self::get) but the binding is never written back and a
    /// shared cache stays shared.
    pub fn get_const(&mut self, region: Region) -> Result<&[Quantum]> {
        trace!(region = %region, "view get_const");
        let pixels = self.image.cache().read_region(region, self.image.virtual_pixel())?;
        let indexes = self
            .image
            .cache()
            .read_index_region(region, self.image.virtual_pixel())?;
        Ok(self.bind(region, BindMode::Read, pixels, indexes))
    }

    /// Binds `region` write-only: staging starts zero-filled instead of
    /// being populated from the store, trading a read for speed when every
    /// pixel will be overwritten.
    ///
    /// Channels the caller does not write remain zero after sync; prior
    /// store contents never leak into the staging buffer.
    pub fn set(&mut self, region: Region) -> Result<&mut [Quantum]> {
        trace!(region = %region, "view set");
        if region.is_empty() {
            return Err(Error::cache_access(region, "empty region"));
        }
        self.image.ensure_unique_cache()?;
        let nch = self.image.channel_layout().channel_count();
        let pixels = vec![0; region.area() as usize * nch];
        let indexes = self
            .image
            .channel_layout()
            .is_indexed()
            .then(|| vec![0; region.area() as usize]);
        Ok(self.bind(region, BindMode::Write, pixels, indexes))
    }

    /// Commits the bound region back to the backing store.
    ///
    /// A guaranteed no-op success when the binding came from
    /// [`get_const`](Self::get_const) or was already committed. The binding
    /// survives the call; only a new `get`/`set` replaces it. Failure means
    /// the authentic portion of the region is in an indeterminate state -
    /// partial writes are not rolled back.
    pub fn sync(&mut self) -> Result<()> {
        let Some(binding) = self.binding.as_mut() else {
            return Err(Error::ViewNotBound);
        };
        if binding.mode == BindMode::Read || !binding.dirty {
            trace!(region = %binding.region, "sync no-op");
            return Ok(());
        }
        trace!(region = %binding.region, "sync commit");
        self.image.cache().write_region(binding.region, &binding.pixels)?;
        if let Some(indexes) = &binding.indexes {
            self.image.cache().write_index_region(binding.region, indexes)?;
        }
        binding.dirty = false;
        Ok(())
    }

    /// The index-plane staging parallel to the last bound rectangle, or
    /// `None` when unbound or the cache is direct-class.
    pub fn indexes(&self) -> Option<&[Quantum]> {
        self.binding.as_ref()?.indexes.as_deref()
    }

    /// Mutable index-plane staging; mutations commit on the next
    /// [`sync`](Self::sync). `None` for read-only bindings.
    pub fn indexes_mut(&mut self) -> Option<&mut [Quantum]> {
        let binding = self.binding.as_mut()?;
        if binding.mode == BindMode::Read {
            return None;
        }
        binding.indexes.as_deref_mut()
    }

    /// The auxiliary per-pixel plane of the last bound rectangle; see
    /// [`CacheView::metacontent`].
    pub fn metacontent(&self) -> Option<&[Quantum]> {
        self.indexes()
    }

    /// Mutable auxiliary-plane staging; see [`indexes_mut`](Self::indexes_mut).
    pub fn metacontent_mut(&mut self) -> Option<&mut [Quantum]> {
        self.indexes_mut()
    }

    /// Mutable pixel staging of the current binding, if it is writable.
    pub fn pixels_mut(&mut self) -> Option<&mut [Quantum]> {
        let binding = self.binding.as_mut()?;
        if binding.mode == BindMode::Read {
            return None;
        }
        Some(&mut binding.pixels)
    }

    /// The rectangle currently bound, if any.
    pub fn region(&self) -> Option<Region> {
        self.binding.as_ref().map(|b| b.region)
    }

    /// Element offset of `channel` within one pixel tuple.
    pub fn offset(&self, channel: PixelChannel) -> Result<usize> {
        self.image
            .channel_layout()
            .offset_of(channel)
            .ok_or(Error::MissingChannel(channel))
    }

    fn bind(
        &mut self,
        region: Region,
        mode: BindMode,
        pixels: Vec<Quantum>,
        indexes: Option<Vec<Quantum>>,
    ) -> &mut [Quantum] {
        let binding = self.binding.insert(Binding {
            region,
            mode,
            pixels,
            indexes,
            dirty: mode == BindMode::Write,
        });
        &mut binding.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pix_core::{ColorSpace, ResourceLimits, QUANTUM_MAX};

    fn rgb_image(columns: u32, rows: u32) -> Image {
        Image::new(columns, rows, ColorSpace::Rgb, false).unwrap()
    }

    #[test]
    fn sync_without_binding_is_an_error() {
        let mut image = rgb_image(4, 4);
        let mut view = image.pixels_mut();
        assert!(matches!(view.sync(), Err(Error::ViewNotBound)));
    }

    #[test]
    fn get_write_sync_round_trip() {
        let mut image = rgb_image(4, 4);
        let mut view = image.pixels_mut();
        let region = Region::from_size(4, 4);

        let pixels = view.get(region).unwrap();
        for (i, q) in pixels.iter_mut().enumerate() {
            *q = i as Quantum;
        }
        view.sync().unwrap();

        let back = view.get_const(region).unwrap();
        let expected: Vec<Quantum> = (0..48).map(|i| i as Quantum).collect();
        assert_eq!(back, &expected[..]);
    }

    #[test]
    fn unsynced_writes_are_lost() {
        let mut image = rgb_image(2, 2);
        let region = Region::from_size(2, 2);
        {
            let mut view = image.pixels_mut();
            let pixels = view.get(region).unwrap();
            pixels.fill(QUANTUM_MAX);
            // dropped without sync
        }
        let mut view = image.pixels();
        let back = view.get_const(region).unwrap();
        assert!(back.iter().all(|&q| q == 0));
    }

    #[test]
    fn set_staging_is_zeroed_not_store_contents() {
        let mut image = rgb_image(2, 2);
        let region = Region::from_size(2, 2);
        {
            let mut view = image.pixels_mut();
            view.get(region).unwrap().fill(1234);
            view.sync().unwrap();
        }
        let mut view = image.pixels_mut();
        let staging = view.set(region).unwrap();
        assert!(staging.iter().all(|&q| q == 0));
    }

    #[test]
    fn sync_after_get_const_is_noop_success() {
        let mut image = rgb_image(2, 2);
        let mut view = image.pixels_mut();
        view.get_const(Region::from_size(2, 2)).unwrap();
        assert!(view.sync().is_ok());
    }

    #[test]
    fn double_sync_reports_success() {
        let mut image = rgb_image(2, 2);
        let mut view = image.pixels_mut();
        view.set(Region::from_size(2, 2)).unwrap().fill(7);
        view.sync().unwrap();
        assert!(view.sync().is_ok());
        // Binding survives sync
        assert_eq!(view.region(), Some(Region::from_size(2, 2)));
    }

    #[test]
    fn rebinding_replaces_the_rectangle() {
        let mut image = rgb_image(4, 4);
        let mut view = image.pixels_mut();
        view.get(Region::from_size(2, 2)).unwrap();
        view.get(Region::new(2, 2, 2, 2)).unwrap();
        assert_eq!(view.region(), Some(Region::new(2, 2, 2, 2)));
    }

    #[test]
    fn oob_get_virtualizes_instead_of_failing() {
        let mut image = rgb_image(2, 2);
        {
            let mut view = image.pixels_mut();
            view.set(Region::from_size(2, 2)).unwrap().fill(50);
            view.sync().unwrap();
        }
        let mut view = image.pixels();
        // Entirely outside the raster: edge policy replicates pixels
        let pixels = view.get_const(Region::new(-4, -4, 2, 2)).unwrap();
        assert!(pixels.iter().all(|&q| q == 50));
    }

    #[test]
    fn read_mode_exposes_no_mutable_staging() {
        let mut image = rgb_image(2, 2);
        let mut view = image.pixels_mut();
        view.get_const(Region::from_size(2, 2)).unwrap();
        assert!(view.pixels_mut().is_none());

        view.get(Region::from_size(2, 2)).unwrap();
        assert!(view.pixels_mut().is_some());
    }

    #[test]
    fn offset_reports_layout_positions() {
        let mut image = Image::new(2, 2, ColorSpace::Rgb, true).unwrap();
        let view = image.pixels_mut();
        assert_eq!(view.offset(PixelChannel::Green).unwrap(), 1);
        assert_eq!(view.offset(PixelChannel::Alpha).unwrap(), 3);
        assert!(matches!(
            view.offset(PixelChannel::Black),
            Err(Error::MissingChannel(PixelChannel::Black))
        ));
    }

    #[test]
    fn indexed_staging_round_trip() {
        let mut image =
            Image::new_indexed(2, 2, vec![[0; 4]; 4], ResourceLimits::default()).unwrap();
        let region = Region::from_size(2, 2);
        {
            let mut view = image.pixels_mut();
            view.set(region).unwrap();
            let indexes = view.indexes_mut().unwrap();
            indexes.copy_from_slice(&[3, 2, 1, 0]);
            view.sync().unwrap();
        }
        let mut view = image.pixels();
        view.get_const(region).unwrap();
        assert_eq!(view.indexes().unwrap(), &[3, 2, 1, 0]);
        // metacontent is the same plane
        assert_eq!(view.metacontent(), view.indexes());
    }

    #[test]
    fn direct_class_binding_has_no_metacontent() {
        let mut image = rgb_image(2, 2);
        let mut view = image.pixels_mut();
        view.get(Region::from_size(2, 2)).unwrap();
        assert!(view.indexes().is_none());
        assert!(view.metacontent_mut().is_none());
    }
}
