use super::*;

#[test]
fn hex_colors_parse_with_and_without_alpha() {
    assert_eq!(
        Rgba8::from_hex("#e94f37").unwrap(),
        Rgba8::opaque(0xe9, 0x4f, 0x37)
    );
    assert_eq!(
        Rgba8::from_hex("#ffffff80").unwrap(),
        Rgba8::new(255, 255, 255, 0x80)
    );
    assert!(Rgba8::from_hex("e94f37").is_err());
    assert!(Rgba8::from_hex("#e94f3").is_err());
    assert!(Rgba8::from_hex("#zz4f37").is_err());
}

#[test]
fn hex_colors_roundtrip_through_serde() {
    let c = Rgba8::new(1, 2, 3, 4);
    let json = serde_json::to_string(&c).unwrap();
    assert_eq!(json, "\"#01020304\"");
    let back: Rgba8 = serde_json::from_str(&json).unwrap();
    assert_eq!(back, c);
}

#[test]
fn premul_scales_color_channels_only() {
    let p = Rgba8::new(200, 100, 50, 128).premul();
    assert_eq!(p.a, 128);
    assert_eq!(p.r, ((200u16 * 128 + 127) / 255) as u8);
    assert_eq!(Rgba8::WHITE.premul().to_array(), [255, 255, 255, 255]);
}

#[test]
fn pixel_size_byte_len() {
    assert_eq!(PixelSize::new(3, 2).rgba8_len().unwrap(), 24);
    assert!(PixelSize::new(0, 5).is_empty());
}
