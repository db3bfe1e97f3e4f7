//! Thermal blend engine
//!
//! Blends a composited frame toward the false-color palette by a progress
//! value in [0, 1]. This is the dominant per-frame cost: every pixel is
//! independent, so rows are processed in parallel with rayon.

use rayon::prelude::*;

use crate::palette;
use crate::types::FrameBuffer;

/// Rec. 601 luma weights, matching the original display pipeline.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Blend `frame` toward its false-color remap, in place.
///
/// `progress <= 0` is an identity no-op; `progress >= 1` replaces every
/// pixel with its palette color. Output channels truncate toward zero.
/// Pure function of `(frame, progress)` — blending twice from the same
/// original yields identical results.
pub fn apply(frame: &mut FrameBuffer, progress: f32) {
    if progress <= 0.0 {
        return;
    }
    let p = progress.min(1.0);
    let inv = 1.0 - p;
    let lut = palette::lut();

    let row_bytes = frame.row_bytes();
    frame
        .as_bytes_mut()
        .par_chunks_mut(row_bytes)
        .for_each(|row| {
            for px in row.chunks_exact_mut(3) {
                let luminance = LUMA_R * f32::from(px[0])
                    + LUMA_G * f32::from(px[1])
                    + LUMA_B * f32::from(px[2]);
                let (tr, tg, tb) = lut[(luminance as usize).min(255)];
                px[0] = (f32::from(px[0]) * inv + f32::from(tr) * p) as u8;
                px[1] = (f32::from(px[1]) * inv + f32::from(tg) * p) as u8;
                px[2] = (f32::from(px[2]) * inv + f32::from(tb) * p) as u8;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame() -> FrameBuffer {
        let mut buf = FrameBuffer::black(16, 9);
        for y in 0..9 {
            for x in 0..16 {
                buf.set_pixel(x, y, ((x * 16) as u8, (y * 28) as u8, ((x + y) * 9) as u8));
            }
        }
        buf
    }

    fn luminance(rgb: (u8, u8, u8)) -> u8 {
        (LUMA_R * f32::from(rgb.0) + LUMA_G * f32::from(rgb.1) + LUMA_B * f32::from(rgb.2))
            .min(255.0) as u8
    }

    #[test]
    fn progress_zero_is_identity() {
        let original = test_frame();
        let mut frame = original.clone();
        apply(&mut frame, 0.0);
        assert_eq!(frame, original);
        apply(&mut frame, -1.0);
        assert_eq!(frame, original);
    }

    #[test]
    fn progress_one_is_full_palette_replacement() {
        let original = test_frame();
        let mut frame = original.clone();
        apply(&mut frame, 1.0);
        for y in 0..frame.height() {
            for x in 0..frame.width() {
                let expected = palette::color_for(luminance(original.pixel(x, y)));
                assert_eq!(frame.pixel(x, y), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn progress_above_one_clamps() {
        let original = test_frame();
        let mut a = original.clone();
        let mut b = original;
        apply(&mut a, 1.0);
        apply(&mut b, 7.5);
        assert_eq!(a, b);
    }

    #[test]
    fn pure_function_of_frame_and_progress() {
        let original = test_frame();
        let mut a = original.clone();
        let mut b = original;
        apply(&mut a, 0.4);
        apply(&mut b, 0.4);
        assert_eq!(a, b);
    }

    #[test]
    fn midpoint_blend_truncates_toward_zero() {
        let mut frame = FrameBuffer::black(1, 1);
        frame.set_pixel(0, 0, (200, 100, 50));
        let (tr, tg, tb) = palette::color_for(luminance((200, 100, 50)));
        apply(&mut frame, 0.5);
        let expected = (
            (200.0 * 0.5 + f32::from(tr) * 0.5) as u8,
            (100.0 * 0.5 + f32::from(tg) * 0.5) as u8,
            (50.0 * 0.5 + f32::from(tb) * 0.5) as u8,
        );
        assert_eq!(frame.pixel(0, 0), expected);
    }
}
