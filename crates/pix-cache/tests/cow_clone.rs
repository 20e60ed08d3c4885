//! Copy-on-write isolation between an image and its clones.

use pix_cache::Image;
use pix_core::{ColorSpace, Quantum, Region};

fn checkerboard(image: &mut Image) {
    let region = Region::from_size(image.columns(), image.rows());
    let mut view = image.pixels_mut();
    let pixels = view.set(region).unwrap();
    for (i, q) in pixels.iter_mut().enumerate() {
        *q = ((i % 2) * 40000) as Quantum;
    }
    view.sync().unwrap();
}

#[test]
fn mutating_the_clone_leaves_the_original_alone() {
    let mut original = Image::new(4, 4, ColorSpace::Rgb, false).unwrap();
    checkerboard(&mut original);
    let region = Region::from_size(4, 4);

    let before = {
        let mut view = original.pixels();
        view.get_const(region).unwrap().to_vec()
    };

    let mut clone = original.clone();
    assert!(original.shares_storage(&clone));
    {
        let mut view = clone.pixels_mut();
        view.get(region).unwrap().fill(1);
        view.sync().unwrap();
    }
    assert!(!original.shares_storage(&clone));

    let mut view = original.pixels();
    assert_eq!(view.get_const(region).unwrap(), &before[..]);
}

#[test]
fn mutating_the_original_leaves_the_clone_alone() {
    let mut original = Image::new(4, 4, ColorSpace::Rgb, false).unwrap();
    checkerboard(&mut original);
    let region = Region::from_size(4, 4);

    let clone = original.clone();
    {
        let mut view = original.pixels_mut();
        view.get(region).unwrap().fill(2);
        view.sync().unwrap();
    }

    let mut view = clone.pixels();
    let pixels = view.get_const(region).unwrap();
    for (i, &q) in pixels.iter().enumerate() {
        assert_eq!(q, ((i % 2) * 40000) as Quantum);
    }
}

#[test]
fn inspection_never_forces_the_copy() {
    let original = Image::new(4, 4, ColorSpace::Rgb, false).unwrap();
    let clone = original.clone();
    {
        let mut view = clone.pixels();
        view.get_const(Region::from_size(4, 4)).unwrap();
    }
    {
        let mut view = original.pixels();
        view.get_const(Region::from_size(4, 4)).unwrap();
    }
    assert!(original.shares_storage(&clone));
}

#[test]
fn second_generation_clones_unshare_independently() {
    let mut a = Image::new(2, 2, ColorSpace::Rgb, false).unwrap();
    checkerboard(&mut a);
    let mut b = a.clone();
    let c = a.clone();
    assert!(a.shares_storage(&b) && a.shares_storage(&c));

    {
        let mut view = b.pixels_mut();
        view.set(Region::from_size(2, 2)).unwrap().fill(9);
        view.sync().unwrap();
    }
    // b split off; a and c still share
    assert!(!a.shares_storage(&b));
    assert!(a.shares_storage(&c));
}
