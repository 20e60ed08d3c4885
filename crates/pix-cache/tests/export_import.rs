//! Strict exporter semantics against the clamping view layer.

use pix_cache::{export, import, Image, StorageType};
use pix_core::{ColorSpace, Region, VirtualPixel, QUANTUM_MAX};

#[test]
fn views_clamp_where_export_rejects() {
    let mut image = Image::new(10, 10, ColorSpace::Rgb, false).unwrap();
    {
        let mut view = image.pixels_mut();
        view.set(Region::from_size(10, 10)).unwrap().fill(7);
        view.sync().unwrap();
    }

    let hanging = Region::new(5, 5, 10, 10);

    // The view virtualizes the overhang per the edge policy
    let mut view = image.pixels();
    let pixels = view.get_const(hanging).unwrap();
    assert_eq!(pixels.len(), 10 * 10 * 3);
    assert!(pixels.iter().all(|&q| q == 7));
    drop(view);

    // The exporter is strict about the same rectangle
    let err = export(&image, hanging, "RGBA", StorageType::U8).unwrap_err();
    assert!(err.is_invalid_region());
}

#[test]
fn black_policy_zeroes_the_overhang() {
    let mut image = Image::new(2, 2, ColorSpace::Rgb, false).unwrap();
    image.set_virtual_pixel(VirtualPixel::Black);
    {
        let mut view = image.pixels_mut();
        view.set(Region::from_size(2, 2)).unwrap().fill(QUANTUM_MAX);
        view.sync().unwrap();
    }
    let mut view = image.pixels();
    let pixels = view.get_const(Region::new(-1, 0, 3, 1)).unwrap();
    // First pixel is virtual black, the rest authentic
    assert_eq!(&pixels[0..3], &[0, 0, 0]);
    assert!(pixels[3..].iter().all(|&q| q == QUANTUM_MAX));
}

#[test]
fn tile_policy_wraps_the_overhang() {
    let mut image = Image::new(2, 1, ColorSpace::Gray, false).unwrap();
    image.set_virtual_pixel(VirtualPixel::Tile);
    {
        let mut view = image.pixels_mut();
        let pixels = view.set(Region::from_size(2, 1)).unwrap();
        pixels.copy_from_slice(&[100, 200]);
        view.sync().unwrap();
    }
    let mut view = image.pixels();
    let pixels = view.get_const(Region::new(0, 0, 4, 1)).unwrap();
    assert_eq!(pixels, &[100, 200, 100, 200]);
}

#[test]
fn import_then_export_preserves_bytes() {
    let mut image = Image::new(8, 8, ColorSpace::Rgb, true).unwrap();
    let region = Region::from_size(8, 8);
    let bytes: Vec<u8> = (0..8 * 8 * 4).map(|i| (i * 7) as u8).collect();

    import(&mut image, region, "RGBA", StorageType::U8, &bytes).unwrap();
    let pd = export(&image, region, "RGBA", StorageType::U8).unwrap();

    assert_eq!(pd.data(), &bytes[..]);
    assert_eq!(pd.length(), 8 * 8 * 4);
    assert_eq!(pd.size(), pd.length());
}

#[test]
fn export_propagates_across_storage_types() {
    let mut image = Image::new(4, 4, ColorSpace::Rgb, false).unwrap();
    let region = Region::from_size(4, 4);
    {
        let mut view = image.pixels_mut();
        view.set(region).unwrap().fill(QUANTUM_MAX);
        view.sync().unwrap();
    }
    // Full intensity survives every element datatype
    let u8_pd = export(&image, region, "RGB", StorageType::U8).unwrap();
    assert!(u8_pd.data().iter().all(|&b| b == 255));

    let f64_pd = export(&image, region, "I", StorageType::F64).unwrap();
    for chunk in f64_pd.data().chunks_exact(8) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        assert_eq!(f64::from_ne_bytes(raw), 1.0);
    }
}

#[test]
fn subregion_export_reads_the_right_rows() {
    let mut image = Image::new(4, 4, ColorSpace::Gray, false).unwrap();
    {
        let mut view = image.pixels_mut();
        let pixels = view.set(Region::from_size(4, 4)).unwrap();
        for (i, q) in pixels.iter_mut().enumerate() {
            *q = i as u16;
        }
        view.sync().unwrap();
    }
    let pd = export(&image, Region::new(1, 2, 2, 2), "I", StorageType::U16).unwrap();
    let elems: Vec<u16> = pd
        .data()
        .chunks_exact(2)
        .map(|b| u16::from_ne_bytes([b[0], b[1]]))
        .collect();
    // Rows 2 and 3, columns 1 and 2 of the gradient
    assert_eq!(elems, vec![9, 10, 13, 14]);
}
