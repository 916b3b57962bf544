use crate::foundation::error::{CanvasError, CanvasResult};
use crate::foundation::math::mul_div255_u8;
use crate::render::blend::BlendMode;

pub type PremulRgba8 = [u8; 4];

/// Composite a premultiplied `src` layer onto `dst` with a global alpha and operator.
///
/// Both buffers are tightly packed premultiplied RGBA8 of identical length.
pub fn composite_rgba8_premul(
    dst: &mut [u8],
    src: &[u8],
    opacity: f32,
    blend: BlendMode,
) -> CanvasResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(CanvasError::render(
            "composite_rgba8_premul expects equal-length rgba8 buffers",
        ));
    }
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return Ok(());
    }

    if !blend.is_supported() {
        tracing::warn!(operator = %blend, "compositing operator not supported, using source-over");
    }

    // Operator dispatch happens once per layer; each branch monomorphizes its own kernel.
    match blend.effective() {
        BlendMode::SourceOver
        | BlendMode::Hue
        | BlendMode::Saturation
        | BlendMode::Color
        | BlendMode::Luminosity => over_in_place(dst, src, opacity),
        BlendMode::SourceIn => porter_duff(dst, src, opacity, |_, da| (da, 0.0)),
        BlendMode::SourceOut => porter_duff(dst, src, opacity, |_, da| (1.0 - da, 0.0)),
        BlendMode::SourceAtop => porter_duff(dst, src, opacity, |sa, da| (da, 1.0 - sa)),
        BlendMode::DestinationOver => porter_duff(dst, src, opacity, |_, da| (1.0 - da, 1.0)),
        BlendMode::DestinationIn => porter_duff(dst, src, opacity, |sa, _| (0.0, sa)),
        BlendMode::DestinationOut => porter_duff(dst, src, opacity, |sa, _| (0.0, 1.0 - sa)),
        BlendMode::DestinationAtop => porter_duff(dst, src, opacity, |sa, da| (1.0 - da, sa)),
        BlendMode::Copy => porter_duff(dst, src, opacity, |_, _| (1.0, 0.0)),
        BlendMode::Xor => porter_duff(dst, src, opacity, |sa, da| (1.0 - da, 1.0 - sa)),
        BlendMode::Lighter => porter_duff(dst, src, opacity, |_, _| (1.0, 1.0)),
        BlendMode::Multiply => separable(dst, src, opacity, |s, d| s * d),
        BlendMode::Screen => separable(dst, src, opacity, |s, d| s + d - s * d),
        BlendMode::Overlay => separable(dst, src, opacity, |s, d| {
            if d <= 0.5 {
                2.0 * s * d
            } else {
                1.0 - 2.0 * (1.0 - s) * (1.0 - d)
            }
        }),
        BlendMode::Darken => separable(dst, src, opacity, |s, d| s.min(d)),
        BlendMode::Lighten => separable(dst, src, opacity, |s, d| s.max(d)),
        BlendMode::ColorDodge => separable(dst, src, opacity, |s, d| {
            if d <= 0.0 {
                0.0
            } else if s >= 1.0 {
                1.0
            } else {
                (d / (1.0 - s)).min(1.0)
            }
        }),
        BlendMode::ColorBurn => separable(dst, src, opacity, |s, d| {
            if d >= 1.0 {
                1.0
            } else if s <= 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - d) / s).min(1.0)
            }
        }),
        BlendMode::HardLight => separable(dst, src, opacity, |s, d| {
            if s <= 0.5 {
                2.0 * s * d
            } else {
                1.0 - 2.0 * (1.0 - s) * (1.0 - d)
            }
        }),
        BlendMode::SoftLight => separable(dst, src, opacity, |s, d| {
            if s <= 0.5 {
                d - (1.0 - 2.0 * s) * d * (1.0 - d)
            } else {
                let g = if d <= 0.25 {
                    ((16.0 * d - 12.0) * d + 4.0) * d
                } else {
                    d.sqrt()
                };
                d + (2.0 * s - 1.0) * (g - d)
            }
        }),
        BlendMode::Difference => separable(dst, src, opacity, |s, d| (d - s).abs()),
        BlendMode::Exclusion => separable(dst, src, opacity, |s, d| d + s - 2.0 * d * s),
    }
    Ok(())
}

/// Integer source-over for a single pixel.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        if s[3] == 0 {
            continue;
        }
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
}

#[inline(always)]
fn porter_duff<F>(dst: &mut [u8], src: &[u8], opacity: f32, factors: F)
where
    F: Fn(f32, f32) -> (f32, f32),
{
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = (f32::from(s[3]) / 255.0) * opacity;
        let da = f32::from(d[3]) / 255.0;
        let (fa, fb) = factors(sa, da);
        for c in 0..3 {
            let sp = (f32::from(s[c]) / 255.0) * opacity;
            let dp = f32::from(d[c]) / 255.0;
            d[c] = unit_to_u8(sp * fa + dp * fb);
        }
        d[3] = unit_to_u8(sa * fa + da * fb);
    }
}

#[inline(always)]
fn separable<F>(dst: &mut [u8], src: &[u8], opacity: f32, blend_fn: F)
where
    F: Fn(f32, f32) -> f32,
{
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        if s[3] == 0 {
            continue;
        }
        // Source-over with the blend applied to unpremultiplied channels:
        // out_a = sa + da * (1 - sa)
        // out_p = sp * (1 - da) + dp * (1 - sa) + B(sc, dc) * sa * da
        let sa = (f32::from(s[3]) / 255.0) * opacity;
        let da = f32::from(d[3]) / 255.0;
        let inv_sa = 1.0 - sa;

        for c in 0..3 {
            let sp = (f32::from(s[c]) / 255.0) * opacity;
            let dp = f32::from(d[c]) / 255.0;
            let sc = if sa > 0.0 {
                (sp / sa).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let dc = if da > 0.0 {
                (dp / da).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let b = blend_fn(sc, dc).clamp(0.0, 1.0);
            d[c] = unit_to_u8(sp * (1.0 - da) + dp * inv_sa + b * sa * da);
        }
        d[3] = unit_to_u8(sa + da * inv_sa);
    }
}

fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
