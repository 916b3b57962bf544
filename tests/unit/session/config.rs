use super::*;

#[test]
fn default_is_the_sticker_playground() {
    let c = SessionConfig::default();
    assert_eq!(c.scene, SceneMode::Stickers);
    assert_eq!(c.logical_size(), Size::new(600.0, 400.0));
    assert_eq!(c.stickers.len(), 2);
    assert_eq!(c.stickers[0].id, Some(EntityId::new("A")));
    assert_eq!(c.stickers[0].fill, Rgba8::opaque(0xe9, 0x4f, 0x37));
    assert_eq!(c.selected, Some(EntityId::new("A")));
    assert!(c.validate().is_ok());
}

#[test]
fn presets_carry_their_scene_defaults() {
    let bench = SessionConfig::frame_benchmark();
    assert_eq!(bench.scene, SceneMode::Particles);
    assert_eq!(bench.particle_count, 9000);
    assert_eq!(bench.resolution_scale, 2.0);
    assert_eq!(bench.logical_size(), Size::new(900.0, 600.0));
    assert!(bench.stickers.is_empty());

    assert_eq!(SessionConfig::cache_comparison().fps_window_ms, 300.0);
    assert_eq!(SessionConfig::for_scene(SceneMode::Snow).scene, SceneMode::Snow);
    for mode in SceneMode::ALL {
        assert!(SessionConfig::for_scene(mode).validate().is_ok());
    }
}

#[test]
fn partial_json_fills_defaults() {
    let json = r##"{
        "scene": "snow",
        "width": 320,
        "filter": "edge",
        "filter_params": { "pixelate_block": 8 },
        "timing": { "duration_ms": 2000 },
        "stickers": [
            { "id": "Z", "kind": "triangle", "position": { "x": 10, "y": 20 },
              "size": { "width": 30, "height": 40 }, "fill": "#ff0000", "blend": "difference" }
        ],
        "selected": "Z"
    }"##;
    let c = SessionConfig::from_json_str(json).unwrap();
    assert_eq!(c.scene, SceneMode::Snow);
    assert_eq!(c.width, 320.0);
    assert_eq!(c.height, 400.0);
    assert_eq!(c.filter, FilterKind::Edge);
    assert_eq!(c.filter_params.pixelate_block, 8);
    assert_eq!(c.filter_params.contrast, 1.5);
    assert_eq!(c.timing.duration_ms, 2000.0);
    assert_eq!(c.timing.warmup_ms, 1000.0);
    let z = &c.stickers[0];
    assert_eq!(z.kind, crate::scene::model::EntityKind::Triangle);
    assert_eq!(z.position, Point::new(10.0, 20.0));
    assert_eq!(z.fill, Rgba8::opaque(255, 0, 0));
    assert_eq!(z.blend, crate::render::blend::BlendMode::Difference);
    assert_eq!(z.opacity, 1.0);
}

#[test]
fn json_round_trip_keeps_everything() {
    let c = SessionConfig::magic_photo();
    let back = SessionConfig::from_json_str(&c.to_json_pretty().unwrap()).unwrap();
    assert_eq!(back, c);
}

#[test]
fn invalid_configs_are_rejected() {
    let err = SessionConfig::from_json_str(r#"{ "width": 0 }"#).unwrap_err();
    assert!(matches!(err, CanvasError::Validation(_)));

    let err = SessionConfig::from_json_str(r#"{ "timing": { "duration_ms": 500, "warmup_ms": 500 } }"#)
        .unwrap_err();
    assert!(matches!(err, CanvasError::Validation(_)));

    let err = SessionConfig::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, CanvasError::Serde(_)));

    let err = SessionConfig::from_json_str(r#"{ "scene": "confetti" }"#).unwrap_err();
    assert!(matches!(err, CanvasError::Serde(_)));
}

#[test]
fn missing_config_file_has_context() {
    let err = SessionConfig::from_path(Path::new("/definitely/not/here.json")).unwrap_err();
    assert!(err.to_string().contains("read session config"));
}

#[test]
fn mode_names_parse() {
    assert_eq!("Particles".parse::<SceneMode>().unwrap(), SceneMode::Particles);
    assert!("nope".parse::<SceneMode>().is_err());
    assert_eq!("full".parse::<RenderMode>().unwrap(), RenderMode::Full);
    assert_eq!(RenderMode::Cached.to_string(), "cached");
}
