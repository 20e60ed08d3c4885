//! # pix-cache
//!
//! Resource-tiered pixel cache with rectangle-scoped views.
//!
//! A [`PixelCache`] holds the canonical pixels of one [`Image`] on a medium
//! chosen from [`ResourceLimits`](pix_core::ResourceLimits) - heap memory,
//! an anonymous memory-mapped file, or an anonymous disk file. Callers
//! never touch the backing store directly: all access flows through views
//! with get/set-then-sync semantics, and [`export`]/[`import`] flatten
//! rectangles into caller-specified layouts.
//!
//! # Example
//!
//! ```rust
//! use pix_cache::{export, Image, StorageType};
//! use pix_core::{ColorSpace, Region};
//!
//! let mut image = Image::new(4, 4, ColorSpace::Rgb, false)?;
//!
//! // Write a rectangle through a view
//! let mut view = image.pixels_mut();
//! let pixels = view.set(Region::from_size(4, 4))?;
//! pixels.fill(32768);
//! view.sync()?;
//! drop(view);
//!
//! // Flatten it for an external consumer
//! let data = export(&image, Region::from_size(4, 4), "RGB", StorageType::U8)?;
//! assert_eq!(data.length(), 4 * 4 * 3);
//! # Ok::<(), pix_core::Error>(())
//! ```

pub mod cache;
pub mod export;
pub mod image;
pub mod store;
pub mod view;

pub use cache::PixelCache;
pub use export::{export, import, PixelData, StorageType};
pub use image::{ColormapEntry, Image};
pub use store::CacheKind;
pub use view::{CacheView, CacheViewMut};
