//! Color space and storage class tags.
//!
//! These are *classification* tags consumed by the cache layer to size and
//! shape pixel tuples - actual color conversion math lives outside this
//! workspace. Three-component spaces other than RGB store their components
//! in the red/green/blue tuple slots, so a cache never needs to know which
//! three-component space it holds.

/// The color model an image's channel values are expressed in.
///
/// The cache consults only [`component_count`](Self::component_count); the
/// tag itself travels with the image so converters and writers downstream
/// can interpret the tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    /// Linear RGB.
    #[default]
    Rgb,
    /// Nonlinear sRGB.
    Srgb,
    /// Single-channel grayscale.
    Gray,
    /// Cyan, magenta, yellow, black.
    Cmyk,
    /// Hue, saturation, lightness (stored in the RGB slots).
    Hsl,
    /// Luma plus chroma (stored in the RGB slots).
    YCbCr,
}

impl ColorSpace {
    /// Number of color components a pixel in this space carries,
    /// not counting alpha.
    #[inline]
    pub const fn component_count(&self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb | Self::Srgb | Self::Hsl | Self::YCbCr => 3,
            Self::Cmyk => 4,
        }
    }

    /// Returns `true` if the components live in the red/green/blue slots.
    #[inline]
    pub const fn uses_rgb_slots(&self) -> bool {
        matches!(self, Self::Rgb | Self::Srgb | Self::Hsl | Self::YCbCr)
    }
}

impl std::fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Rgb => "RGB",
            Self::Srgb => "sRGB",
            Self::Gray => "Gray",
            Self::Cmyk => "CMYK",
            Self::Hsl => "HSL",
            Self::YCbCr => "YCbCr",
        };
        f.write_str(name)
    }
}

/// Whether pixels carry full color tuples or colormap indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageClass {
    /// Every pixel stores its own channel tuple.
    #[default]
    Direct,
    /// Pixels reference a colormap through a parallel index plane.
    Pseudo,
}
