//! Error types for pixel cache operations.
//!
//! This module provides the unified error taxonomy for cache acquisition,
//! view materialization, synchronization, and pixel export/import.
//!
//! # Overview
//!
//! Four failure families cover the subsystem:
//!
//! - **Allocation**: no backing medium can be acquired at any tier the
//!   resource limits permit (also zero-extent and overflowing requests)
//! - **Cache access**: a view could not materialize any pixels for a
//!   rectangle - a genuine staging/store failure, not mere out-of-bounds,
//!   which is virtualized instead
//! - **Invalid region / channel map**: strict consumers (export, import)
//!   rejected their arguments
//! - **Synchronization**: a mutable region could not be committed back
//!
//! The policy everywhere is fail fast: no retries, no silent degradation,
//! no rollback of partial writes before a failed sync.
//!
//! # Usage
//!
//! ```rust
//! use pix_core::{Error, Region, Result};
//!
//! fn check(region: Region, columns: u32, rows: u32) -> Result<()> {
//!     if !region.within(columns, rows) {
//!         return Err(Error::invalid_region(region, columns, rows));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - For derive macro error implementation

use crate::channel::PixelChannel;
use crate::region::Region;
use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the pixel cache subsystem.
#[derive(Debug, Error)]
pub enum Error {
    /// No backing medium could be acquired for a pixel store.
    ///
    /// Raised when the requested footprint exceeds every tier the resource
    /// limits permit, when the chosen medium fails to materialize, and for
    /// zero-extent or overflowing requests.
    #[error("cannot allocate {requested} byte pixel store: {reason}")]
    Allocation {
        /// Bytes the store would have occupied
        requested: u64,
        /// Why the allocation was refused or failed
        reason: String,
    },

    /// A view could not materialize pixels for the requested rectangle.
    #[error("cannot materialize pixels for region {region}: {reason}")]
    CacheAccess {
        /// The rectangle the view was asked for
        region: Region,
        /// What failed during materialization
        reason: String,
    },

    /// A strict consumer was given a rectangle outside image bounds.
    #[error("region {region} is not wholly inside the {columns}x{rows} raster")]
    InvalidRegion {
        /// The offending rectangle
        region: Region,
        /// Raster width
        columns: u32,
        /// Raster height
        rows: u32,
    },

    /// A channel map string was empty.
    #[error("channel map is empty")]
    EmptyChannelMap,

    /// A channel map contained a code this exporter does not understand.
    #[error("unknown channel code {0:?}")]
    UnknownChannelCode(char),

    /// A channel was requested that the cache's layout does not include.
    #[error("channel {0:?} is not part of this pixel layout")]
    MissingChannel(PixelChannel),

    /// A caller buffer did not match the size the operation computed.
    #[error("buffer holds {got} bytes, operation requires {expected}")]
    BufferSize {
        /// Bytes the operation requires
        expected: usize,
        /// Bytes the caller supplied
        got: usize,
    },

    /// `sync` was called on a view with no bound region.
    #[error("view has no bound region to synchronize")]
    ViewNotBound,

    /// A mutable region could not be committed back to its backing store.
    #[error("failed to commit pixels to the backing store: {reason}")]
    Sync {
        /// The underlying I/O or remap failure
        reason: String,
    },
}

impl Error {
    /// Creates an [`Error::Allocation`].
    #[inline]
    pub fn allocation(requested: u64, reason: impl Into<String>) -> Self {
        Self::Allocation {
            requested,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::CacheAccess`].
    #[inline]
    pub fn cache_access(region: Region, reason: impl Into<String>) -> Self {
        Self::CacheAccess {
            region,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::InvalidRegion`].
    #[inline]
    pub fn invalid_region(region: Region, columns: u32, rows: u32) -> Self {
        Self::InvalidRegion {
            region,
            columns,
            rows,
        }
    }

    /// Creates an [`Error::Sync`] from any displayable cause.
    #[inline]
    pub fn sync(cause: impl std::fmt::Display) -> Self {
        Self::Sync {
            reason: cause.to_string(),
        }
    }

    /// Returns `true` if this is an allocation failure.
    #[inline]
    pub fn is_allocation(&self) -> bool {
        matches!(self, Self::Allocation { .. })
    }

    /// Returns `true` if this is a strict region/map rejection.
    #[inline]
    pub fn is_invalid_region(&self) -> bool {
        matches!(
            self,
            Self::InvalidRegion { .. } | Self::EmptyChannelMap | Self::UnknownChannelCode(_)
        )
    }

    /// Returns `true` if this is a synchronization failure.
    #[inline]
    pub fn is_sync(&self) -> bool {
        matches!(self, Self::Sync { .. })
    }
}
