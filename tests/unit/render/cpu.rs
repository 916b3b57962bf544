use super::*;
use crate::foundation::core::Rgba8Premul;

fn close(a: [u8; 4], b: [u8; 4], tol: u8) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.abs_diff(*y) <= tol)
}

#[test]
fn fill_rect_covers_interior_pixels() {
    let mut target = Raster::new(16, 16).unwrap();
    let mut r = CpuRenderer::new();
    r.draw_layer(&mut target, BlendMode::SourceOver, 1.0, |p| {
        p.fill_rect(
            Rect::new(4.0, 4.0, 12.0, 12.0),
            Affine::IDENTITY,
            Rgba8::opaque(255, 0, 0),
        );
        Ok(())
    })
    .unwrap();
    assert!(close(target.pixel(8, 8).unwrap(), [255, 0, 0, 255], 1));
    assert_eq!(target.pixel(1, 1).unwrap(), [0, 0, 0, 0]);
    assert_eq!(r.layers_drawn(), 1);
}

#[test]
fn layer_opacity_and_blend_are_applied_at_composite_time() {
    let mut target = Raster::filled(8, 8, Rgba8Premul::from_straight_rgba(100, 0, 255, 255)).unwrap();
    let mut r = CpuRenderer::new();
    r.draw_layer(&mut target, BlendMode::Difference, 1.0, |p| {
        p.fill_rect(
            Rect::new(0.0, 0.0, 8.0, 8.0),
            Affine::IDENTITY,
            Rgba8::WHITE,
        );
        Ok(())
    })
    .unwrap();
    assert!(close(target.pixel(4, 4).unwrap(), [155, 255, 0, 255], 1));
}

#[test]
fn transform_moves_geometry() {
    let mut target = Raster::new(20, 20).unwrap();
    let mut r = CpuRenderer::new();
    r.draw_layer(&mut target, BlendMode::SourceOver, 1.0, |p| {
        p.fill_rect(
            Rect::new(0.0, 0.0, 4.0, 4.0),
            Affine::translate((10.0, 10.0)) * Affine::scale(2.0),
            Rgba8::opaque(0, 0, 255),
        );
        Ok(())
    })
    .unwrap();
    assert!(close(target.pixel(14, 14).unwrap(), [0, 0, 255, 255], 1));
    assert_eq!(target.pixel(5, 5).unwrap(), [0, 0, 0, 0]);
}

#[test]
fn same_size_blit_copies_exactly() {
    let src = Raster::filled(6, 4, Rgba8Premul::from_straight_rgba(10, 20, 30, 255)).unwrap();
    let mut target = Raster::new(6, 4).unwrap();
    let mut r = CpuRenderer::new();
    r.blit_raster(
        &mut target,
        ImageKey(1),
        &src,
        Rect::new(0.0, 0.0, 6.0, 4.0),
        Affine::IDENTITY,
        1.0,
    )
    .unwrap();
    assert_eq!(target, src);
}

#[test]
fn scaled_blit_stretches_source() {
    let src = Raster::filled(2, 2, Rgba8Premul::from_straight_rgba(0, 200, 0, 255)).unwrap();
    let mut target = Raster::new(16, 16).unwrap();
    let mut r = CpuRenderer::new();
    r.blit_raster(
        &mut target,
        ImageKey(7),
        &src,
        Rect::new(0.0, 0.0, 8.0, 8.0),
        Affine::scale(2.0),
        1.0,
    )
    .unwrap();
    assert!(close(target.pixel(8, 8).unwrap(), [0, 200, 0, 255], 2));
}

#[test]
fn mismatched_same_size_blit_is_an_error() {
    let src = Raster::new(2, 2).unwrap();
    let mut target = Raster::new(3, 3).unwrap();
    let mut r = CpuRenderer::new();
    assert!(
        r.blit_same_size(&mut target, &src, BlendMode::SourceOver, 1.0)
            .is_err()
    );
}

#[test]
fn zero_opacity_source_over_draws_nothing() {
    let mut target = Raster::new(4, 4).unwrap();
    let mut r = CpuRenderer::new();
    r.draw_layer(&mut target, BlendMode::SourceOver, 0.0, |p| {
        p.fill_rect(
            Rect::new(0.0, 0.0, 4.0, 4.0),
            Affine::IDENTITY,
            Rgba8::WHITE,
        );
        Ok(())
    })
    .unwrap();
    assert!(target.data().iter().all(|&b| b == 0));
    assert_eq!(r.layers_drawn(), 0);
}

#[test]
fn render_context_is_reused_and_reset_between_layers() {
    let mut r = CpuRenderer::new();
    let mut first = Raster::new(16, 16).unwrap();
    r.draw_layer(&mut first, BlendMode::SourceOver, 1.0, |p| {
        p.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Affine::IDENTITY, Rgba8::opaque(255, 0, 0));
        Ok(())
    })
    .unwrap();

    let mut second = Raster::new(16, 16).unwrap();
    r.draw_layer(&mut second, BlendMode::SourceOver, 1.0, |p| {
        p.fill_rect(Rect::new(10.0, 10.0, 14.0, 14.0), Affine::IDENTITY, Rgba8::opaque(0, 255, 0));
        Ok(())
    })
    .unwrap();
    assert_eq!(r.contexts_built(), 1);
    // Nothing from the first layer leaks into the second.
    assert_eq!(second.pixel(2, 2).unwrap(), [0, 0, 0, 0]);
    assert!(close(second.pixel(12, 12).unwrap(), [0, 255, 0, 255], 1));

    let mut bigger = Raster::new(32, 8).unwrap();
    r.draw_layer(&mut bigger, BlendMode::SourceOver, 1.0, |_| Ok(())).unwrap();
    assert_eq!(r.contexts_built(), 2);
}

#[test]
fn failed_layer_leaves_target_untouched_and_renderer_usable() {
    let mut r = CpuRenderer::new();
    let mut target = Raster::new(8, 8).unwrap();
    let err = r.draw_layer(&mut target, BlendMode::SourceOver, 1.0, |p| {
        p.fill_rect(Rect::new(0.0, 0.0, 8.0, 8.0), Affine::IDENTITY, Rgba8::WHITE);
        Err(CanvasError::render("painter gave up"))
    });
    assert!(err.is_err());
    assert_eq!(target.pixel(4, 4).unwrap(), [0, 0, 0, 0]);

    r.draw_layer(&mut target, BlendMode::SourceOver, 1.0, |p| {
        p.fill_rect(Rect::new(0.0, 0.0, 8.0, 8.0), Affine::IDENTITY, Rgba8::WHITE);
        Ok(())
    })
    .unwrap();
    assert_eq!(target.pixel(4, 4).unwrap(), [255, 255, 255, 255]);
    assert_eq!(r.contexts_built(), 1);
}
