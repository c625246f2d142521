// SPDX-License-Identifier: MIT
//! # Scaling Plans and Payload Presets
//!
//! A [`ScalePlan`] is computed once from the input size, a [`ScaleTarget`]
//! and an [`AspectMode`], and tells the scaler the exact output canvas and,
//! when letterboxing, the sub-rectangle the scaled content lands in.
//!
//! - No upscaling, except letterboxing onto an exact canvas, which always
//!   fills the canvas along its limiting side
//! - Dimensions are clamped to a minimum of 1px

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// Defines how aspect ratio differences are handled during scaling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AspectMode {
    /// Keep original aspect ratio; output fits entirely within target bounds.
    Preserve,
    /// Stretch/squeeze image to exactly match target dimensions.
    Distort,
    /// Letterbox: keep the aspect ratio and pad to the exact target canvas.
    /// Object detectors expect this for their square input.
    Pad { bg_rgb: [u8; 3] },
}

/// Defines the target size constraint for scaling operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleTarget {
    /// Clamp the longest side to a maximum value, derive the other side proportionally.
    MaxLongSide(u32),
    /// Force output to exact dimensions (used with AspectMode::Distort/Pad).
    Exact(Size),
}

/// Complete scaling plan computed from input parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalePlan {
    /// Original input dimensions
    pub input: Size,
    /// Target size constraint used for planning
    pub target: ScaleTarget,
    /// Aspect ratio handling strategy
    pub aspect: AspectMode,
    /// Final computed output dimensions
    pub out: Size,
    /// If padding is used, specifies the sub-rectangle where scaled content is placed.
    /// Format: (x, y, width, height) in output coordinate space.
    pub dst_roi: Option<(u32, u32, u32, u32)>,
}

impl ScalePlan {
    /// True when the plan leaves the input untouched.
    pub fn is_identity(&self) -> bool {
        self.out == self.input && self.dst_roi.is_none()
    }

    /// Map a point in output coordinates back to input coordinates.
    ///
    /// Used to project detector boxes from the letterboxed canvas onto the
    /// original frame. Points in the padding are clamped to the frame edge.
    pub fn to_input(&self, x: f32, y: f32) -> (f32, f32) {
        let (ox, oy, cw, ch) = self
            .dst_roi
            .unwrap_or((0, 0, self.out.w, self.out.h));
        let sx = self.input.w as f32 / cw.max(1) as f32;
        let sy = self.input.h as f32 / ch.max(1) as f32;
        let ix = ((x - ox as f32) * sx).clamp(0.0, self.input.w as f32);
        let iy = ((y - oy as f32) * sy).clamp(0.0, self.input.h as f32);
        (ix, iy)
    }
}

/// Compute a complete scaling plan from input parameters.
///
/// # Arguments
/// * `input` - Source image dimensions
/// * `target` - Size constraint to apply
/// * `aspect` - How to handle aspect ratio differences
pub fn build_plan(input: Size, target: ScaleTarget, aspect: AspectMode) -> ScalePlan {
    let (out, dst_roi) = match (target, aspect) {
        (ScaleTarget::MaxLongSide(max_side), AspectMode::Preserve) => {
            let (w, h) = fit_preserve(input, max_side);
            (Size { w, h }, None)
        }
        (ScaleTarget::MaxLongSide(max_side), AspectMode::Distort) => (
            Size {
                w: max_side,
                h: max_side,
            },
            None,
        ),
        (ScaleTarget::MaxLongSide(max_side), AspectMode::Pad { .. }) => {
            let out = Size {
                w: max_side,
                h: max_side,
            };
            let (rw, rh) = fit_preserve(input, max_side);
            (out, Some(((out.w - rw) / 2, (out.h - rh) / 2, rw, rh)))
        }
        (ScaleTarget::Exact(out), AspectMode::Distort) => (out, None),
        (ScaleTarget::Exact(out), AspectMode::Preserve) => {
            let (w, h) = fit_within(input, out, false);
            (Size { w, h }, None)
        }
        (ScaleTarget::Exact(out), AspectMode::Pad { .. }) => {
            let (rw, rh) = fit_within(input, out, true);
            (out, Some(((out.w - rw) / 2, (out.h - rh) / 2, rw, rh)))
        }
    };

    ScalePlan {
        input,
        target,
        aspect,
        out,
        dst_roi,
    }
}

/// Fit image within max_side constraint while preserving aspect ratio.
/// Never upscales.
fn fit_preserve(input: Size, max_long: u32) -> (u32, u32) {
    let (w, h) = (input.w as f64, input.h as f64);
    let long = w.max(h).max(1.0);
    let s = (max_long as f64 / long).min(1.0);
    (
        ((w * s).round() as u32).max(1),
        ((h * s).round() as u32).max(1),
    )
}

/// Fit image within a bounding box while preserving aspect ratio.
fn fit_within(input: Size, box_: Size, upscale: bool) -> (u32, u32) {
    let (w, h) = (input.w.max(1) as f64, input.h.max(1) as f64);
    let (bw, bh) = (box_.w as f64, box_.h as f64);
    let mut s = (bw / w).min(bh / h);
    if !upscale {
        s = s.min(1.0);
    }
    (
        ((w * s).round() as u32).clamp(1, box_.w.max(1)),
        ((h * s).round() as u32).clamp(1, box_.h.max(1)),
    )
}

/// Payload presets for the cloud vision request.
///
/// Token cost grows with pixel count while ingredient recognition needs
/// little detail, so the frame is clamped before encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PayloadPreset {
    /// 384px longest side, cheapest request
    #[clap(name = "small")]
    Small384,
    /// 768px longest side
    #[clap(name = "medium")]
    Medium768,
    /// 1024px longest side
    #[clap(name = "large")]
    Large1024,
    /// Send the frame at capture resolution
    #[clap(name = "original")]
    Original,
}

impl PayloadPreset {
    /// Longest side in pixels, `None` for [`PayloadPreset::Original`].
    pub fn max_side(self) -> Option<u32> {
        match self {
            PayloadPreset::Small384 => Some(384),
            PayloadPreset::Medium768 => Some(768),
            PayloadPreset::Large1024 => Some(1024),
            PayloadPreset::Original => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserve_clamps_long_side() {
        let plan = build_plan(
            Size { w: 1920, h: 1080 },
            ScaleTarget::MaxLongSide(640),
            AspectMode::Preserve,
        );
        assert_eq!(plan.out, Size { w: 640, h: 360 });
        assert!(plan.dst_roi.is_none());
    }

    #[test]
    fn preserve_never_upscales() {
        let input = Size { w: 320, h: 240 };
        let plan = build_plan(input, ScaleTarget::MaxLongSide(640), AspectMode::Preserve);
        assert_eq!(plan.out, input);
        assert!(plan.is_identity());
    }

    #[test]
    fn pad_centres_content_on_square_canvas() {
        let plan = build_plan(
            Size { w: 1280, h: 720 },
            ScaleTarget::Exact(Size { w: 640, h: 640 }),
            AspectMode::Pad { bg_rgb: [114; 3] },
        );
        assert_eq!(plan.out, Size { w: 640, h: 640 });
        assert_eq!(plan.dst_roi, Some((0, 140, 640, 360)));
    }

    #[test]
    fn to_input_undoes_letterbox() {
        let plan = build_plan(
            Size { w: 1280, h: 720 },
            ScaleTarget::Exact(Size { w: 640, h: 640 }),
            AspectMode::Pad { bg_rgb: [0; 3] },
        );
        let (x, y) = plan.to_input(320.0, 320.0);
        assert!((x - 640.0).abs() < 1e-3);
        assert!((y - 360.0).abs() < 1e-3);

        // padding projects onto the frame edge
        let (_, top) = plan.to_input(0.0, 10.0);
        assert_eq!(top, 0.0);
    }

    #[test]
    fn pad_scales_small_frames_up_to_the_canvas() {
        let plan = build_plan(
            Size { w: 320, h: 240 },
            ScaleTarget::Exact(Size { w: 640, h: 640 }),
            AspectMode::Pad { bg_rgb: [114; 3] },
        );
        assert_eq!(plan.dst_roi, Some((0, 80, 640, 480)));
        let (x, y) = plan.to_input(640.0, 560.0);
        assert!((x - 320.0).abs() < 1e-3 && (y - 240.0).abs() < 1e-3);
    }

    #[test]
    fn exact_preserve_still_never_upscales() {
        let input = Size { w: 320, h: 240 };
        let plan = build_plan(input, ScaleTarget::Exact(Size { w: 640, h: 640 }), AspectMode::Preserve);
        assert!(plan.is_identity());
    }

    #[test]
    fn only_original_preset_has_no_limit() {
        assert_eq!(PayloadPreset::Original.max_side(), None);
        assert_eq!(PayloadPreset::Medium768.max_side(), Some(768));
    }
}
