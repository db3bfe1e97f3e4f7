//! Frame compositor
//!
//! Converts a raw camera frame into the fixed output resolution with cover
//! semantics: the target is filled completely on both axes and the overflow
//! on the longer axis is center-cropped. Optionally mirrors horizontally for
//! a front-facing "selfie" view.
//!
//! Geometry is recomputed from the two aspect ratios every frame, never
//! cached, so a source that resizes mid-session is handled on the next
//! frame.

use crate::types::{FrameBuffer, RawFrame};

/// Source-space crop region selected for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Stateless compositor for a fixed target resolution.
#[derive(Debug, Clone, Copy)]
pub struct FrameCompositor {
    target_w: u32,
    target_h: u32,
}

impl FrameCompositor {
    pub fn new(target_w: u32, target_h: u32) -> Self {
        Self { target_w, target_h }
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.target_w, self.target_h)
    }

    /// Compute the source crop for cover semantics.
    ///
    /// If the source is wider than the target aspect, the sides are cropped
    /// symmetrically; otherwise the top and bottom are.
    pub fn crop_region(&self, source_w: u32, source_h: u32) -> CropRegion {
        let sw = source_w as f32;
        let sh = source_h as f32;
        let source_aspect = sw / sh;
        let target_aspect = self.target_w as f32 / self.target_h as f32;

        if source_aspect > target_aspect {
            let crop_w = sh * target_aspect;
            CropRegion {
                x: (sw - crop_w) / 2.0,
                y: 0.0,
                width: crop_w,
                height: sh,
            }
        } else {
            let crop_h = sw / target_aspect;
            CropRegion {
                x: 0.0,
                y: (sh - crop_h) / 2.0,
                width: sw,
                height: crop_h,
            }
        }
    }

    /// Produce a target-sized buffer from `src`, center-cropped to cover and
    /// optionally mirrored. Nearest-neighbor sampling; deterministic for
    /// fixed inputs.
    ///
    /// A degenerate source (zero-sized or malformed pixel vector) yields a
    /// black buffer rather than a panic — the session treats it like any
    /// other frame.
    pub fn compose(&self, src: &RawFrame, mirror: bool) -> FrameBuffer {
        let mut dest = FrameBuffer::black(self.target_w, self.target_h);
        if src.width == 0 || src.height == 0 || !src.is_well_formed() {
            tracing::warn!(
                width = src.width,
                height = src.height,
                bytes = src.pixels.len(),
                "Degenerate source frame — emitting black buffer"
            );
            return dest;
        }

        let crop = self.crop_region(src.width, src.height);
        let step_x = crop.width / self.target_w as f32;
        let step_y = crop.height / self.target_h as f32;
        let src_row = src.width as usize * 3;

        let dest_row_bytes = dest.row_bytes();
        let bytes = dest.as_bytes_mut();
        for ty in 0..self.target_h {
            let sy = (crop.y + (ty as f32 + 0.5) * step_y) as u32;
            let sy = sy.min(src.height - 1) as usize;
            let drow = ty as usize * dest_row_bytes;
            for tx in 0..self.target_w {
                // Mirroring samples the source from the opposite side
                let lx = if mirror { self.target_w - 1 - tx } else { tx };
                let sx = (crop.x + (lx as f32 + 0.5) * step_x) as u32;
                let sx = sx.min(src.width - 1) as usize;
                let si = sy * src_row + sx * 3;
                let di = drow + tx as usize * 3;
                bytes[di] = src.pixels[si];
                bytes[di + 1] = src.pixels[si + 1];
                bytes[di + 2] = src.pixels[si + 2];
            }
        }

        dest
    }
}
