//! # pix-core
//!
//! Core types for the pix-rs pixel cache subsystem.
//!
//! This crate provides the foundational types used throughout the pix-rs
//! workspace:
//!
//! - [`Quantum`] - The channel sample type and its scaling helpers
//! - [`Region`] - Signed-origin rectangles for pixel windows
//! - [`ChannelLayout`], [`PixelChannel`] - Per-pixel tuple descriptions
//! - [`ColorSpace`], [`StorageClass`] - Image classification tags
//! - [`ResourceLimits`] - Ceilings consulted when a pixel store is placed
//! - [`VirtualPixel`] - Policy for reads outside the raster
//!
//! ## Design Philosophy
//!
//! Everything here is a plain value type. In particular [`ResourceLimits`]
//! is an explicit configuration value owned by whoever constructs the cache
//! subsystem and passed down by reference - there is no process-global
//! registry, so tests can run with isolated limit sets concurrently.
//!
//! ## Crate Structure
//!
//! `pix-core` has no internal dependencies; the cache engine in `pix-cache`
//! builds on it:
//!
//! ```text
//! pix-core (this crate)
//!    ^
//!    |
//!    +-- pix-cache (backing store, cache, views, export)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channel;
pub mod colorspace;
pub mod error;
pub mod limits;
pub mod quantum;
pub mod region;
pub mod virtual_pixel;

// Re-exports for convenience
pub use channel::*;
pub use colorspace::*;
pub use error::*;
pub use limits::*;
pub use quantum::{Quantum, QUANTUM_MAX, REC709_LUMA};
pub use region::*;
pub use virtual_pixel::*;

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use pix_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::channel::{ChannelLayout, PixelChannel};
    pub use crate::colorspace::{ColorSpace, StorageClass};
    pub use crate::error::{Error, Result};
    pub use crate::limits::ResourceLimits;
    pub use crate::quantum::{Quantum, QUANTUM_MAX};
    pub use crate::region::Region;
    pub use crate::virtual_pixel::VirtualPixel;
}
