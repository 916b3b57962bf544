use super::*;

#[test]
fn new_raster_is_transparent_and_sized() {
    let r = Raster::new(3, 2).unwrap();
    assert_eq!(r.data().len(), 24);
    assert!(r.data().iter().all(|&b| b == 0));
    assert_eq!(r.size(), PixelSize::new(3, 2));
}

#[test]
fn from_parts_rejects_length_mismatch() {
    assert!(Raster::from_rgba8_premul(2, 2, vec![0; 15]).is_err());
    assert!(Raster::from_rgba8_premul(2, 2, vec![0; 16]).is_ok());
}

#[test]
fn out_of_bounds_access_is_structural() {
    let mut r = Raster::new(2, 2).unwrap();
    assert_eq!(r.pixel(2, 0), None);
    assert_eq!(r.pixel(0, 2), None);
    assert!(!r.set_pixel(5, 5, [1, 2, 3, 4]));
    assert!(r.set_pixel(1, 1, [1, 2, 3, 4]));
    assert_eq!(r.pixel(1, 1), Some([1, 2, 3, 4]));
}

#[test]
fn straight_roundtrip_for_opaque_pixels_is_exact() {
    let src = vec![10u8, 20, 30, 255, 200, 100, 50, 255];
    let r = Raster::from_straight_rgba8(2, 1, src.clone()).unwrap();
    assert_eq!(r.to_straight_rgba8(), src);
}

#[test]
fn premultiply_zeroes_transparent_pixels() {
    let r = Raster::from_straight_rgba8(1, 1, vec![200, 100, 50, 0]).unwrap();
    assert_eq!(r.data(), &[0, 0, 0, 0]);
}

#[test]
fn into_data_hands_back_the_premultiplied_bytes() {
    let r = Raster::filled(2, 1, Rgba8Premul::from_straight_rgba(255, 0, 0, 128)).unwrap();
    assert_eq!(r.into_data(), vec![128, 0, 0, 128, 128, 0, 0, 128]);
}
