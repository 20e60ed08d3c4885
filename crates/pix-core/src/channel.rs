//! Per-pixel channel layout descriptions.
//!
//! A [`ChannelLayout`] records which channels a cache interleaves into each
//! pixel tuple and whether a parallel index plane exists (pseudo-class
//! images). The cache sizes its backing store from the layout; views use it
//! to answer [`offset_of`](ChannelLayout::offset_of) queries for callers
//! doing their own tuple arithmetic.
//!
//! # Usage
//!
//! ```rust
//! use pix_core::{ChannelLayout, ColorSpace, PixelChannel};
//!
//! let layout = ChannelLayout::for_colorspace(ColorSpace::Rgb, true);
//! assert_eq!(layout.channel_count(), 4);
//! assert_eq!(layout.offset_of(PixelChannel::Alpha), Some(3));
//! assert_eq!(layout.bytes_per_pixel(), 8);
//! ```

use crate::colorspace::ColorSpace;
use crate::quantum::Quantum;

/// A named channel within a pixel tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelChannel {
    /// Red (also hosts the first component of HSL/YCbCr).
    Red,
    /// Green (second component of three-component spaces).
    Green,
    /// Blue (third component of three-component spaces).
    Blue,
    /// Opacity.
    Alpha,
    /// The sole channel of grayscale images.
    Gray,
    /// Cyan.
    Cyan,
    /// Magenta.
    Magenta,
    /// Yellow.
    Yellow,
    /// Black (the K of CMYK).
    Black,
}

/// The interleaved channel order of one pixel tuple, plus whether a
/// parallel index plane accompanies the color plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    channels: Vec<PixelChannel>,
    indexed: bool,
}

impl ChannelLayout {
    /// Builds the layout for a color space, optionally with alpha appended.
    pub fn for_colorspace(colorspace: ColorSpace, alpha: bool) -> Self {
        let mut channels: Vec<PixelChannel> = if colorspace.uses_rgb_slots() {
            vec![PixelChannel::Red, PixelChannel::Green, PixelChannel::Blue]
        } else if colorspace == ColorSpace::Gray {
            vec![PixelChannel::Gray]
        } else {
            vec![
                PixelChannel::Cyan,
                PixelChannel::Magenta,
                PixelChannel::Yellow,
                PixelChannel::Black,
            ]
        };
        if alpha {
            channels.push(PixelChannel::Alpha);
        }
        Self {
            channels,
            indexed: false,
        }
    }

    /// Returns a copy of this layout with a parallel index plane.
    #[must_use]
    pub fn with_index(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// The interleaved channels, in tuple order.
    #[inline]
    pub fn channels(&self) -> &[PixelChannel] {
        &self.channels
    }

    /// Number of interleaved channels per tuple (index plane not counted).
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if a parallel index plane accompanies the tuples.
    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Returns `true` if the tuple carries an alpha channel.
    #[inline]
    pub fn has_alpha(&self) -> bool {
        self.has(PixelChannel::Alpha)
    }

    /// Returns `true` if `channel` is part of the tuple.
    #[inline]
    pub fn has(&self, channel: PixelChannel) -> bool {
        self.channels.contains(&channel)
    }

    /// Element offset of `channel` within one tuple, or `None` if the
    /// layout does not include it.
    #[inline]
    pub fn offset_of(&self, channel: PixelChannel) -> Option<usize> {
        self.channels.iter().position(|&c| c == channel)
    }

    /// Bytes one pixel occupies in the backing store, index plane included.
    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        (self.channel_count() + self.indexed as usize) * std::mem::size_of::<Quantum>()
    }
}
