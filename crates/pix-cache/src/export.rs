//! Flattening cached pixels into caller-specified layouts, and back.
//!
//! [`export`] produces a tightly packed buffer from a rectangle of an image
//! for a named channel map ("RGB", "BGRA", "I", ...) and element datatype.
//! Unlike the view layer it is strict: the rectangle must lie wholly inside
//! the raster and the map must be non-empty, otherwise the call fails
//! instead of clamping. [`import`] is the inverse, writing a packed buffer
//! into the cache through a write-only view binding.
//!
//! Large exports fan rows out across a rayon pool capped at the image's
//! `thread` resource limit; each row streams through its own read-only view.

use half::f16;
use pix_core::{
    quantum, ChannelLayout, Error, PixelChannel, Quantum, Region, Result, QUANTUM_MAX,
};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::image::Image;

/// Pixel count above which export rows are processed in parallel.
const PARALLEL_PIXEL_MIN: u64 = 16 * 1024;

/// Element datatype of an exported or imported buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer (the cache's native depth).
    U16,
    /// 16-bit half-precision float, normalized to [0, 1].
    F16,
    /// 32-bit float, normalized to [0, 1].
    F32,
    /// 64-bit float, normalized to [0, 1].
    F64,
}

impl StorageType {
    /// Bytes one element occupies.
    #[inline]
    pub const fn element_size(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::F16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

/// One code of a channel map string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapCode {
    Red,
    Green,
    Blue,
    Alpha,
    Cyan,
    Magenta,
    Yellow,
    Black,
    Intensity,
    Pad,
}

fn parse_map(map: &str) -> Result<Vec<MapCode>> {
    if map.is_empty() {
        return Err(Error::EmptyChannelMap);
    }
    map.chars()
        .map(|c| match c.to_ascii_uppercase() {
            'R' => Ok(MapCode::Red),
            'G' => Ok(MapCode::Green),
            'B' => Ok(MapCode::Blue),
            'A' => Ok(MapCode::Alpha),
            'C' => Ok(MapCode::Cyan),
            'M' => Ok(MapCode::Magenta),
            'Y' => Ok(MapCode::Yellow),
            'K' => Ok(MapCode::Black),
            'I' => Ok(MapCode::Intensity),
            'P' => Ok(MapCode::Pad),
            other => Err(Error::UnknownChannelCode(other)),
        })
        .collect()
}

/// Where an exported element's quantum comes from.
#[derive(Debug, Clone, Copy)]
enum Source {
    Offset(usize),
    Luma([usize; 3]),
    Opaque,
    Zero,
}

/// Where an imported element's quantum goes.
#[derive(Debug, Clone, Copy)]
enum Dest {
    Offset(usize),
    Splat([usize; 3]),
    Skip,
}

/// Offset of a color code's channel; gray images serve their sole channel
/// for each of R, G, and B.
fn color_slot(layout: &ChannelLayout, channel: PixelChannel) -> Option<usize> {
    layout
        .offset_of(channel)
        .or_else(|| layout.offset_of(PixelChannel::Gray))
}

fn rgb_slots(layout: &ChannelLayout) -> Option<[usize; 3]> {
    Some([
        layout.offset_of(PixelChannel::Red)?,
        layout.offset_of(PixelChannel::Green)?,
        layout.offset_of(PixelChannel::Blue)?,
    ])
}

fn resolve_sources(layout: &ChannelLayout, codes: &[MapCode]) -> Result<Vec<Source>> {
    codes
        .iter()
        .map(|code| {
            let plain = |channel| {
                color_slot(layout, channel)
                    .map(Source::Offset)
                    .ok_or(Error::MissingChannel(channel))
            };
            match code {
                MapCode::Red => plain(PixelChannel::Red),
                MapCode::Green => plain(PixelChannel::Green),
                MapCode::Blue => plain(PixelChannel::Blue),
                MapCode::Cyan => plain(PixelChannel::Cyan),
                MapCode::Magenta => plain(PixelChannel::Magenta),
                MapCode::Yellow => plain(PixelChannel::Yellow),
                MapCode::Black => plain(PixelChannel::Black),
                MapCode::Alpha => Ok(layout
                    .offset_of(PixelChannel::Alpha)
                    .map(Source::Offset)
                    .unwrap_or(Source::Opaque)),
                MapCode::Intensity => {
                    if let Some(gray) = layout.offset_of(PixelChannel::Gray) {
                        Ok(Source::Offset(gray))
                    } else if let Some(rgb) = rgb_slots(layout) {
                        Ok(Source::Luma(rgb))
                    } else {
                        Err(Error::MissingChannel(PixelChannel::Gray))
                    }
                }
                MapCode::Pad => Ok(Source::Zero),
            }
        })
        .collect()
}

fn resolve_dests(layout: &ChannelLayout, codes: &[MapCode]) -> Result<Vec<Dest>> {
    codes
        .iter()
        .map(|code| {
            let plain = |channel| {
                color_slot(layout, channel)
                    .map(Dest::Offset)
                    .ok_or(Error::MissingChannel(channel))
            };
            match code {
                MapCode::Red => plain(PixelChannel::Red),
                MapCode::Green => plain(PixelChannel::Green),
                MapCode::Blue => plain(PixelChannel::Blue),
                MapCode::Cyan => plain(PixelChannel::Cyan),
                MapCode::Magenta => plain(PixelChannel::Magenta),
                MapCode::Yellow => plain(PixelChannel::Yellow),
                MapCode::Black => plain(PixelChannel::Black),
                MapCode::Alpha => Ok(layout
                    .offset_of(PixelChannel::Alpha)
                    .map(Dest::Offset)
                    .unwrap_or(Dest::Skip)),
                MapCode::Intensity => {
                    if let Some(gray) = layout.offset_of(PixelChannel::Gray) {
                        Ok(Dest::Offset(gray))
                    } else if let Some(rgb) = rgb_slots(layout) {
                        Ok(Dest::Splat(rgb))
                    } else {
                        Err(Error::MissingChannel(PixelChannel::Gray))
                    }
                }
                MapCode::Pad => Ok(Dest::Skip),
            }
        })
        .collect()
}

#[inline]
fn sample(tuple: &[Quantum], source: Source) -> Quantum {
    match source {
        Source::Offset(i) => tuple[i],
        Source::Luma([r, g, b]) => quantum::luminance([tuple[r], tuple[g], tuple[b]]),
        Source::Opaque => QUANTUM_MAX,
        Source::Zero => 0,
    }
}

#[inline]
fn put_element(q: Quantum, storage: StorageType, out: &mut [u8]) {
    match storage {
        StorageType::U8 => out[0] = quantum::to_u8(q),
        StorageType::U16 => out.copy_from_slice(&q.to_ne_bytes()),
        StorageType::F16 => {
            out.copy_from_slice(&f16::from_f32(quantum::to_f32(q)).to_ne_bytes())
        }
        StorageType::F32 => out.copy_from_slice(&quantum::to_f32(q).to_ne_bytes()),
        StorageType::F64 => out.copy_from_slice(&quantum::to_f64(q).to_ne_bytes()),
    }
}

#[inline]
fn take_element(storage: StorageType, bytes: &[u8]) -> Quantum {
    match storage {
        StorageType::U8 => quantum::from_u8(bytes[0]),
        StorageType::U16 => Quantum::from_ne_bytes([bytes[0], bytes[1]]),
        StorageType::F16 => {
            quantum::from_f32(f16::from_ne_bytes([bytes[0], bytes[1]]).to_f32())
        }
        StorageType::F32 => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(bytes);
            quantum::from_f32(f32::from_ne_bytes(raw))
        }
        StorageType::F64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            quantum::from_f64(f64::from_ne_bytes(raw))
        }
    }
}

/// An owned, tightly packed pixel buffer produced by [`export`].
///
/// Immutable after construction. Invariants:
/// `length == width * height * map_len` and
/// `size == length * element_size(storage)`.
#[derive(Debug)]
pub struct PixelData {
    data: Vec<u8>,
    width: u32,
    height: u32,
    map: String,
    storage: StorageType,
    length: usize,
    size: usize,
}

impl PixelData {
    /// The packed bytes, `size()` long.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of elements in the buffer.
    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of bytes in the buffer.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Exported rectangle width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Exported rectangle height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The channel map the buffer was packed with.
    #[inline]
    pub fn map(&self) -> &str {
        &self.map
    }

    /// The element datatype of the buffer.
    #[inline]
    pub fn storage(&self) -> StorageType {
        self.storage
    }
}

/// Flattens `region` of `image` into a packed buffer.
///
/// Strict by design: `region` must lie wholly inside the raster and be
/// non-empty, and `map` must be non-empty - failures that the view layer
/// would clamp are rejected here so writers get exactly the bytes they
/// asked for. Underlying cache read failures propagate unchanged.
pub fn export(
    image: &Image,
    region: Region,
    map: &str,
    storage: StorageType,
) -> Result<PixelData> {
    let codes = parse_map(map)?;
    if !region.within(image.columns(), image.rows()) {
        return Err(Error::invalid_region(region, image.columns(), image.rows()));
    }
    let sources = resolve_sources(image.channel_layout(), &codes)?;
    let nch = image.channel_layout().channel_count();
    let length = region.area() as usize * codes.len();
    let size = length * storage.element_size();
    debug!(region = %region, map, ?storage, size, "export pixels");

    let mut data = vec![0u8; size];
    let row_bytes = region.width as usize * codes.len() * storage.element_size();
    encode_rows(image, region, nch, &sources, storage, row_bytes, &mut data)?;

    Ok(PixelData {
        data,
        width: region.width,
        height: region.height,
        map: map.to_string(),
        storage,
        length,
        size,
    })
}

fn encode_rows(
    image: &Image,
    region: Region,
    nch: usize,
    sources: &[Source],
    storage: StorageType,
    row_bytes: usize,
    data: &mut [u8],
) -> Result<()> {
    let threads = image.limits().thread().min(region.height as usize).max(1);
    if threads > 1 && region.area() >= PARALLEL_PIXEL_MIN {
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => {
                return pool.install(|| {
                    data.par_chunks_mut(row_bytes).enumerate().try_for_each(
                        |(row, out_row)| {
                            encode_row(image, region, row, nch, sources, storage, out_row)
                        },
                    )
                });
            }
            Err(e) => warn!("thread pool unavailable, exporting serially: {e}"),
        }
    }
    for (row, out_row) in data.chunks_mut(row_bytes).enumerate() {
        encode_row(image, region, row, nch, sources, storage, out_row)?;
    }
    Ok(())
}

fn encode_row(
    image: &Image,
    region: Region,
    row: usize,
    nch: usize,
    sources: &[Source],
    storage: StorageType,
    out_row: &mut [u8],
) -> Result<()> {
    let mut view = image.pixels();
    let row_region = Region::new(region.x, region.y + row as i64, region.width, 1);
    let pixels = view.get_const(row_region)?;
    let esize = storage.element_size();
    for (tuple, out_px) in pixels
        .chunks_exact(nch)
        .zip(out_row.chunks_exact_mut(sources.len() * esize))
    {
        for (k, &source) in sources.iter().enumerate() {
            put_element(sample(tuple, source), storage, &mut out_px[k * esize..(k + 1) * esize]);
        }
    }
    Ok(())
}

/// Writes a packed buffer into `region` of `image`.
///
/// Validation mirrors [`export`], plus `data` must hold exactly
/// `width * height * map_len * element_size` bytes. Channels the map does
/// not name are left at the write-only staging's zero fill. The write
/// commits through a single view sync.
pub fn import(
    image: &mut Image,
    region: Region,
    map: &str,
    storage: StorageType,
    data: &[u8],
) -> Result<()> {
    let codes = parse_map(map)?;
    if !region.within(image.columns(), image.rows()) {
        return Err(Error::invalid_region(region, image.columns(), image.rows()));
    }
    let expected = region.area() as usize * codes.len() * storage.element_size();
    if data.len() != expected {
        return Err(Error::BufferSize {
            expected,
            got: data.len(),
        });
    }
    let dests = resolve_dests(image.channel_layout(), &codes)?;
    let nch = image.channel_layout().channel_count();
    let esize = storage.element_size();
    debug!(region = %region, map, ?storage, bytes = data.len(), "import pixels");

    let mut view = image.pixels_mut();
    let staging = view.set(region)?;
    for (tuple, src_px) in staging
        .chunks_exact_mut(nch)
        .zip(data.chunks_exact(codes.len() * esize))
    {
        for (k, &dest) in dests.iter().enumerate() {
            let q = take_element(storage, &src_px[k * esize..(k + 1) * esize]);
            match dest {
                Dest::Offset(i) => tuple[i] = q,
                Dest::Splat([r, g, b]) => {
                    tuple[r] = q;
                    tuple[g] = q;
                    tuple[b] = q;
                }
                Dest::Skip => {}
            }
        }
    }
    view.sync()
}
