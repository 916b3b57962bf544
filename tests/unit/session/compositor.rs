use super::*;
use crate::assets::image::Bitmap;
use crate::filter::engine::FilterParams;
use crate::scene::model::EntitySpec;
use crate::timing::clock::ManualClock;
use crate::timing::scheduler::{Scheduler, ScriptedFrames, StopReason, TimingConfig};

fn px(s: &CompositorSession, x: u32, y: u32) -> [u8; 4] {
    s.frame().pixel(x, y).unwrap()
}

fn close(a: [u8; 4], b: [u8; 4], tol: u8) -> bool {
    a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= tol)
}

fn small(scene: SceneMode) -> SessionConfig {
    SessionConfig {
        width: 120.0,
        height: 90.0,
        resolution_scale: 1.0,
        particle_count: 200,
        tile_count: 60,
        ..SessionConfig::for_scene(scene)
    }
}

#[test]
fn default_scene_renders_stickers_over_background() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    assert!(s.is_dirty());
    let frame = s.render_frame().unwrap();
    assert_eq!((frame.width(), frame.height()), (600, 400));
    assert!(!s.is_dirty());

    // Center of rect A and inside triangle B.
    assert!(close(px(&s, 360, 260), [0xe9, 0x4f, 0x37, 255], 1));
    assert!(close(px(&s, 220, 200), [0xf9, 0xc7, 0x4f, 255], 1));
    // Top-left corner is the gradient start.
    assert!(close(px(&s, 1, 1), [0x4a, 0x90, 0xe2, 255], 8));
    assert_eq!(s.status_line(), "Selected: rect | Filter: none");
}

#[test]
fn selecting_the_lower_sticker_raises_it_for_drawing_and_picking() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    // Overlaps the lower-right of rect A and starts on top of it.
    let blue = Rgba8::new(0x27, 0x7d, 0xa1, 255);
    s.apply(Command::AddEntity(EntitySpec::rect(
        "C",
        Point::new(400.0, 280.0),
        Size::new(100.0, 80.0),
        blue,
    )))
    .unwrap();
    let overlap = Point::new(390.0, 280.0);
    s.render_frame().unwrap();
    assert!(close(px(&s, 390, 280), [0x27, 0x7d, 0xa1, 255], 1));
    assert_eq!(s.scene().hit_test(overlap).unwrap().id, EntityId::new("C"));

    s.apply(Command::Select(EntityId::new("A"))).unwrap();
    s.render_frame().unwrap();
    assert!(close(px(&s, 390, 280), [0xe9, 0x4f, 0x37, 255], 1));
    assert_eq!(s.scene().hit_test(overlap).unwrap().id, EntityId::new("A"));
    assert_eq!(s.status_line(), "Selected: rect | Filter: none");
}

#[test]
fn filter_params_replace_tunables_and_reapply_the_filter() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    s.apply(Command::ApplyFilter(FilterKind::Grayscale)).unwrap();
    let rebuilds = s.cache_stats().filter_rebuilds;

    let params = FilterParams {
        contrast: 1.0,
        ..FilterParams::default()
    };
    s.apply(Command::SetFilterParams(params)).unwrap();
    assert_eq!(s.cache().params(), &params);
    assert_eq!(s.cache_stats().filter_rebuilds, rebuilds + 1);
    assert_eq!(s.status_line(), "Selected: rect | Filter: grayscale");
    assert_eq!(s.message(), None);

    let bad = FilterParams {
        contrast: -1.0,
        ..FilterParams::default()
    };
    s.apply(Command::SetFilterParams(bad)).unwrap();
    assert!(s.message().unwrap().starts_with("Filter failed"));
    assert_eq!(s.cache().params(), &params);
    s.render_frame().unwrap();
}

#[test]
fn transparent_background_leaves_gaps_clear() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    s.apply(Command::SetTransparentBackground(true)).unwrap();
    s.render_frame().unwrap();
    assert_eq!(px(&s, 1, 1), [0, 0, 0, 0]);
    assert!(close(px(&s, 360, 260), [0xe9, 0x4f, 0x37, 255], 1));
}

#[test]
fn select_brings_to_front_and_updates_status() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    s.apply(Command::Select(EntityId::new("B"))).unwrap();
    assert_eq!(s.scene().entities().last().unwrap().id, EntityId::new("B"));
    assert_eq!(s.status_line(), "Selected: triangle | Filter: none");
    assert!(s.apply(Command::Select(EntityId::new("nope"))).is_err());
}

#[test]
fn pointer_drag_moves_the_hit_entity() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    s.apply(Command::PointerDown(Point::new(220.0, 200.0))).unwrap();
    assert!(s.is_dragging());
    assert_eq!(s.scene().selected_id(), Some(&EntityId::new("B")));

    s.apply(Command::PointerMove(Point::new(240.0, 230.0))).unwrap();
    let b = s.scene().get(&EntityId::new("B")).unwrap();
    assert_eq!(b.position, Point::new(240.0, 210.0));

    s.apply(Command::PointerUp).unwrap();
    s.apply(Command::PointerMove(Point::new(0.0, 0.0))).unwrap();
    let b = s.scene().get(&EntityId::new("B")).unwrap();
    assert_eq!(b.position, Point::new(240.0, 210.0));
}

#[test]
fn pointer_maps_through_the_viewport() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    // Element shown at half size, offset by (100, 50).
    s.apply(Command::SetViewport {
        origin: Point::new(100.0, 50.0),
        size: Size::new(300.0, 200.0),
    })
    .unwrap();
    s.apply(Command::PointerDown(Point::new(210.0, 150.0))).unwrap();
    assert_eq!(s.scene().selected_id(), Some(&EntityId::new("B")));
}

#[test]
fn pointer_down_on_empty_space_keeps_selection() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    s.apply(Command::PointerDown(Point::new(5.0, 5.0))).unwrap();
    assert!(!s.is_dragging());
    assert_eq!(s.scene().selected_id(), Some(&EntityId::new("A")));
}

#[test]
fn transform_controls_edit_the_selection() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    let a = EntityId::new("A");
    for _ in 0..12 {
        s.apply(Command::RotateStep).unwrap();
    }
    assert!((s.scene().get(&a).unwrap().rotation_rad - PI).abs() < 1e-9);
    for _ in 0..12 {
        s.apply(Command::RotateStep).unwrap();
    }
    let r = s.scene().get(&a).unwrap().rotation_rad;
    assert!((0.0..TAU).contains(&r));
    assert!(r < 1e-9 || TAU - r < 1e-9);

    for _ in 0..20 {
        s.apply(Command::ScaleUp).unwrap();
    }
    assert_eq!(s.scene().get(&a).unwrap().scale, 3.0);

    s.apply(Command::ResetTransform).unwrap();
    let e = s.scene().get(&a).unwrap();
    assert_eq!((e.rotation_rad, e.scale), (0.0, 1.0));

    s.apply(Command::SetOpacity(2.0)).unwrap();
    s.apply(Command::SetBlend(BlendMode::Multiply)).unwrap();
    let e = s.scene().get(&a).unwrap();
    assert_eq!(e.opacity, 1.0);
    assert_eq!(e.blend, BlendMode::Multiply);
}

#[test]
fn controls_without_selection_are_rejected() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    s.apply(Command::RemoveEntity(EntityId::new("A"))).unwrap();
    assert!(s.scene().selected().is_none());
    assert!(s.apply(Command::SetOpacity(0.5)).is_err());
    assert!(s.apply(Command::RemoveEntity(EntityId::new("A"))).is_err());
    assert_eq!(s.status_line(), "Selected: none | Filter: none");
}

#[test]
fn added_entity_becomes_selected() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    let spec = EntitySpec {
        position: Point::new(50.0, 50.0),
        size: Size::new(20.0, 20.0),
        ..EntitySpec::default()
    };
    s.apply(Command::AddEntity(spec)).unwrap();
    assert_eq!(s.scene().len(), 3);
    assert_eq!(s.scene().selected_id(), Some(&EntityId::new("e1")));
    s.render_frame().unwrap();
    assert!(close(px(&s, 50, 50), [255, 255, 255, 255], 1));
}

#[test]
fn filters_rebuild_the_cached_background() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    let before = s.cache_stats().filter_rebuilds;
    s.apply(Command::ApplyFilter(FilterKind::Grayscale)).unwrap();
    assert_eq!(s.cache_stats().filter_rebuilds, before + 1);
    assert_eq!(s.status_line(), "Selected: rect | Filter: grayscale");

    s.render_frame().unwrap();
    let [r, g, b, a] = px(&s, 1, 1);
    assert_eq!((r, r, a), (g, b, 255));

    s.apply(Command::ResetFilter).unwrap();
    assert_eq!(s.filter(), FilterKind::None);
    s.render_frame().unwrap();
    assert!(close(px(&s, 1, 1), [0x4a, 0x90, 0xe2, 255], 8));
}

#[test]
fn resize_reallocates_and_rebuilds_before_next_blit() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    let rebuilds = s.cache_stats().background_rebuilds;
    s.apply(Command::Resize {
        logical: Size::new(300.0, 200.0),
        device_scale: 2.0,
    })
    .unwrap();
    assert_eq!(s.surface().backing_size(), PixelSize::new(600, 400));
    assert_eq!(s.cache().backing(), PixelSize::new(600, 400));
    assert_eq!(s.cache_stats().background_rebuilds, rebuilds);

    s.apply(Command::Resize {
        logical: Size::new(320.0, 200.0),
        device_scale: 2.0,
    })
    .unwrap();
    assert_eq!(s.surface().backing_size(), PixelSize::new(640, 400));
    assert_eq!(s.cache().backing(), PixelSize::new(640, 400));
    assert_eq!(s.cache_stats().background_rebuilds, rebuilds + 1);
    let bg = s.cache().background().unwrap();
    assert_eq!(bg.raster().size(), PixelSize::new(640, 400));

    let frame = s.render_frame().unwrap();
    assert_eq!((frame.width(), frame.height()), (640, 400));
}

#[test]
fn resize_to_the_same_size_is_a_no_op() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    let generation = s.surface().generation();
    let stats = s.cache_stats();
    s.apply(Command::Resize {
        logical: Size::new(600.0, 400.0),
        device_scale: 1.0,
    })
    .unwrap();
    assert_eq!(s.surface().generation(), generation);
    assert_eq!(s.cache_stats(), stats);
}

#[test]
fn photo_load_and_clear_report_status() {
    let mut s = CompositorSession::new(small(SceneMode::Stars)).unwrap();
    let bitmap = Bitmap::new(4, 2, vec![200; 4 * 2 * 4]).unwrap();
    s.apply(Command::LoadImage(bitmap)).unwrap();
    assert_eq!(s.message(), Some("Image loaded"));
    assert!(s.cache().photo().is_some());
    s.render_frame().unwrap();

    s.apply(Command::ClearImage).unwrap();
    assert_eq!(s.message(), Some("Photo cleared"));
    assert!(s.cache().photo().is_none());

    s.apply(Command::ImageLoadFailed("permission denied".into()))
        .unwrap();
    assert_eq!(s.message(), Some("Image load failed: permission denied"));

    let broken = Bitmap {
        width: 2,
        height: 2,
        rgba: vec![0; 3],
    };
    s.apply(Command::LoadImage(broken)).unwrap();
    assert!(s.message().unwrap().starts_with("Image load failed"));
    // The placeholder still renders.
    s.render_frame().unwrap();
}

#[test]
fn image_in_sticker_mode_replaces_the_background() {
    let mut s = CompositorSession::new(SessionConfig::default()).unwrap();
    let bitmap = Bitmap::new(2, 2, [10, 200, 30, 255].repeat(4)).unwrap();
    s.apply(Command::LoadImage(bitmap)).unwrap();
    s.render_frame().unwrap();
    assert!(close(px(&s, 1, 1), [10, 200, 30, 255], 2));

    s.apply(Command::ClearImage).unwrap();
    assert_eq!(s.message(), Some("Background reset"));
    s.render_frame().unwrap();
    assert!(close(px(&s, 1, 1), [0x4a, 0x90, 0xe2, 255], 8));
}

#[test]
fn oversized_image_is_rejected_and_rendering_continues() {
    for scene in [SceneMode::Stars, SceneMode::Stickers] {
        let mut s = CompositorSession::new(small(scene)).unwrap();
        let wide = Bitmap::new(70_000, 1, vec![255; 70_000 * 4]).unwrap();
        s.apply(Command::LoadImage(wide)).unwrap();
        let message = s.message().unwrap();
        assert!(message.starts_with("Image load failed"), "{message}");
        assert!(message.contains("70000x1"), "{message}");
        assert!(s.cache().photo().is_none());
        s.render_frame().unwrap();

        let clock = ManualClock::new(0.0);
        let timing = TimingConfig {
            duration_ms: 100.0,
            warmup_ms: 0.0,
            ..TimingConfig::default()
        };
        let mut sched = Scheduler::new(ScriptedFrames::uniform(20.0, 10));
        let report = sched.run(&clock, &mut s, &timing, 20.0).unwrap();
        assert_eq!(report.reason, StopReason::Completed);
        assert_eq!(report.frames, 5);
    }
}

#[test]
fn photo_fits_inside_padding() {
    let r = fit_contain(Size::new(1000.0, 500.0), Size::new(600.0, 400.0), 24.0).unwrap();
    assert!((r.width() - 552.0).abs() < 1e-9);
    assert!((r.height() - 276.0).abs() < 1e-9);
    assert!((r.x0 - 24.0).abs() < 1e-9);
    assert!((r.y0 - 62.0).abs() < 1e-9);
    assert!(fit_contain(Size::new(0.0, 10.0), Size::new(600.0, 400.0), 24.0).is_none());
    assert!(fit_contain(Size::new(10.0, 10.0), Size::new(40.0, 40.0), 24.0).is_none());
}

#[test]
fn snow_scene_advances_flakes() {
    let mut s = CompositorSession::new(small(SceneMode::Snow)).unwrap();
    let before: Vec<f64> = s.snow().flakes().iter().map(|f| f.position.y).collect();
    s.advance(16.0);
    s.render_frame().unwrap();
    let moved = s
        .snow()
        .flakes()
        .iter()
        .zip(&before)
        .filter(|(f, y)| f.position.y != **y)
        .count();
    assert_eq!(moved, before.len());
    assert!((s.time_ms() - 16.0).abs() < 1e-9);
}

#[test]
fn particle_scene_draws_motes() {
    let mut s = CompositorSession::new(small(SceneMode::Particles)).unwrap();
    assert_eq!(s.motes().motes().len(), 200);
    s.advance(16.0);
    let frame = s.render_frame().unwrap();
    let covered = frame.data().chunks_exact(4).filter(|p| p[3] > 0).count();
    assert!(covered > 0);
}

#[test]
fn cached_and_full_tiles_render_the_same_frame() {
    let mut cached = CompositorSession::new(small(SceneMode::Tiles)).unwrap();
    let mut full = CompositorSession::new(SessionConfig {
        render_mode: RenderMode::Full,
        ..small(SceneMode::Tiles)
    })
    .unwrap();

    for s in [&mut cached, &mut full] {
        s.advance(100.0);
        s.render_frame().unwrap();
        s.render_frame().unwrap();
    }
    assert_eq!(cached.frame().data(), full.frame().data());
    assert_eq!(cached.cache_stats().tile_rebuilds, 1);
    assert_eq!(full.cache_stats().tile_rebuilds, 0);
}

#[test]
fn tile_count_and_regenerate_rebuild_the_cached_tiles() {
    let mut s = CompositorSession::new(small(SceneMode::Tiles)).unwrap();
    s.render_frame().unwrap();
    s.apply(Command::SetTileCount(10)).unwrap();
    s.render_frame().unwrap();
    assert_eq!(s.cache_stats().tile_rebuilds, 2);
    s.apply(Command::RegenerateBackground).unwrap();
    s.render_frame().unwrap();
    assert_eq!(s.cache_stats().tile_rebuilds, 3);

    s.apply(Command::SetRenderMode(RenderMode::Full)).unwrap();
    s.render_frame().unwrap();
    s.apply(Command::SetRenderMode(RenderMode::Cached)).unwrap();
    s.render_frame().unwrap();
    assert_eq!(s.cache_stats().tile_rebuilds, 4);
}

#[test]
fn session_runs_under_the_scheduler() {
    let mut s = CompositorSession::new(small(SceneMode::Tiles)).unwrap();
    let start = s.ball().position;
    let clock = ManualClock::new(0.0);
    let timing = TimingConfig {
        duration_ms: 400.0,
        warmup_ms: 0.0,
        ..TimingConfig::default()
    };
    let mut sched = Scheduler::new(ScriptedFrames::uniform(20.0, 100));
    let report = sched.run(&clock, &mut s, &timing, 20.0).unwrap();

    assert_eq!(report.reason, StopReason::Completed);
    assert_eq!(s.frames_rendered(), report.frames);
    assert_ne!(s.ball().position, start);
    assert_eq!(report.frames, 20);
    // 16 frames over the first 300 ms window.
    assert_eq!(s.fps(), Some(53));
    assert_eq!(s.fps_band(), Some(FpsBand::High));
}
