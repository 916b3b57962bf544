use super::*;

fn one(px: PremulRgba8) -> Vec<u8> {
    px.to_vec()
}

#[test]
fn source_over_opaque_replaces_destination() {
    let mut dst = one([0, 0, 255, 255]);
    composite_rgba8_premul(&mut dst, &one([255, 0, 0, 255]), 1.0, BlendMode::SourceOver).unwrap();
    assert_eq!(dst, vec![255, 0, 0, 255]);
}

#[test]
fn source_over_half_opacity_mixes() {
    let mut dst = one([0, 0, 255, 255]);
    composite_rgba8_premul(&mut dst, &one([255, 0, 0, 255]), 0.5, BlendMode::SourceOver).unwrap();
    assert_eq!(dst[3], 255);
    assert!((dst[0] as i32 - 128).abs() <= 1);
    assert!((dst[2] as i32 - 127).abs() <= 1);
}

#[test]
fn transparent_source_leaves_destination_for_over_and_separable_modes() {
    for mode in [BlendMode::SourceOver, BlendMode::Multiply, BlendMode::Difference] {
        let mut dst = one([10, 20, 30, 255]);
        composite_rgba8_premul(&mut dst, &one([0, 0, 0, 0]), 1.0, mode).unwrap();
        assert_eq!(dst, vec![10, 20, 30, 255], "{mode}");
    }
}

#[test]
fn difference_with_white_inverts_opaque_pixels() {
    let mut dst = vec![100, 0, 255, 255, 7, 8, 9, 255];
    let white = vec![255u8; 8];
    composite_rgba8_premul(&mut dst, &white, 1.0, BlendMode::Difference).unwrap();
    assert_eq!(dst, vec![155, 255, 0, 255, 248, 247, 246, 255]);
}

#[test]
fn difference_over_transparent_destination_yields_source() {
    let mut dst = one([0, 0, 0, 0]);
    composite_rgba8_premul(&mut dst, &one([255, 255, 255, 255]), 1.0, BlendMode::Difference)
        .unwrap();
    assert_eq!(dst, vec![255, 255, 255, 255]);
}

#[test]
fn destination_out_erases_under_opaque_source() {
    let mut dst = one([50, 60, 70, 255]);
    composite_rgba8_premul(
        &mut dst,
        &one([255, 255, 255, 255]),
        1.0,
        BlendMode::DestinationOut,
    )
    .unwrap();
    assert_eq!(dst, vec![0, 0, 0, 0]);
}

#[test]
fn copy_clears_where_source_is_transparent() {
    let mut dst = vec![50, 60, 70, 255, 50, 60, 70, 255];
    let src = vec![0, 0, 0, 0, 255, 0, 0, 255];
    composite_rgba8_premul(&mut dst, &src, 1.0, BlendMode::Copy).unwrap();
    assert_eq!(dst, vec![0, 0, 0, 0, 255, 0, 0, 255]);
}

#[test]
fn multiply_with_white_is_identity_on_opaque() {
    let mut dst = one([40, 80, 120, 255]);
    composite_rgba8_premul(&mut dst, &one([255, 255, 255, 255]), 1.0, BlendMode::Multiply)
        .unwrap();
    assert_eq!(dst, vec![40, 80, 120, 255]);
}

#[test]
fn unsupported_operator_falls_back_to_source_over() {
    let mut a = one([0, 0, 255, 255]);
    let mut b = one([0, 0, 255, 255]);
    let src = one([200, 100, 0, 255]);
    composite_rgba8_premul(&mut a, &src, 0.7, BlendMode::Hue).unwrap();
    composite_rgba8_premul(&mut b, &src, 0.7, BlendMode::SourceOver).unwrap();
    assert_eq!(a, b);
}

#[test]
fn mismatched_buffers_are_rejected() {
    let mut dst = vec![0u8; 8];
    assert!(composite_rgba8_premul(&mut dst, &[0u8; 4], 1.0, BlendMode::SourceOver).is_err());
}

#[test]
fn blend_mode_names_roundtrip_and_fall_back() {
    for m in BlendMode::ALL {
        assert_eq!(m.as_str().parse::<BlendMode>().unwrap(), m);
    }
    assert_eq!(BlendMode::parse_or_default("plus-darker"), BlendMode::SourceOver);
    let parsed: BlendMode = serde_json::from_str("\"color-dodge\"").unwrap();
    assert_eq!(parsed, BlendMode::ColorDodge);
    let unknown: BlendMode = serde_json::from_str("\"nope\"").unwrap();
    assert_eq!(unknown, BlendMode::SourceOver);
}
