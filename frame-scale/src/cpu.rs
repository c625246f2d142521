// SPDX-License-Identifier: MIT
// CPU scaler built on fast_image_resize (SIMD-accelerated).
// RGB8 in → RGB8 out, direct write into caller-provided dst buffer.

use fast_image_resize as fir;
use fir::images::{TypedCroppedImageMut, TypedImage, TypedImageRef};
use fir::pixels::U8x3;
use fir::{ResizeOptions, Resizer};

use crate::presets::{AspectMode, ScalePlan, Size};

#[derive(Debug, thiserror::Error)]
pub enum ScaleError {
    #[error("Input buffer is {actual} bytes, expected {expected}")]
    InputSize { expected: usize, actual: usize },
    #[error("Output buffer too small")]
    BufferTooSmall,
    #[error("Fast image resize error: {0}")]
    Fir(#[from] fir::ResizeError),
    #[error("Image buffer error: {0}")]
    ImageBuf(#[from] fir::ImageBufferError),
    #[error("Crop error: {0}")]
    Crop(#[from] fir::CropBoxError),
}

/// Bytes needed for a tightly packed RGB8 image of `size`.
pub fn rgb_len(size: Size) -> usize {
    (size.w as usize) * (size.h as usize) * 3
}

/// Main scaling entry point.
/// `src_rgb` must be tightly packed (`src.w * 3` bytes per row).
/// `dst` must be at least `plan.out.w * plan.out.h * 3` bytes.
pub fn scale_rgb_cpu(
    resizer: &mut Resizer,
    src_rgb: &[u8],
    src: Size,
    plan: &ScalePlan,
    dst: &mut [u8],
) -> Result<(), ScaleError> {
    let src_len = rgb_len(src);
    if src_rgb.len() != src_len {
        return Err(ScaleError::InputSize {
            expected: src_len,
            actual: src_rgb.len(),
        });
    }
    let dst_len = rgb_len(plan.out);
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall);
    }
    let dst = &mut dst[..dst_len];

    if plan.is_identity() {
        dst.copy_from_slice(src_rgb);
        return Ok(());
    }

    let src_view = TypedImageRef::<U8x3>::from_buffer(src.w, src.h, src_rgb)?;

    // Letterbox background fill must happen before the canvas is borrowed
    if let AspectMode::Pad { bg_rgb } = plan.aspect {
        fill_rgb(dst, bg_rgb);
    }
    let mut dst_image = TypedImage::<U8x3>::from_buffer(plan.out.w, plan.out.h, dst)?;

    let opts = ResizeOptions::new();
    match plan.dst_roi {
        Some((x, y, w, h)) => {
            let mut roi = TypedCroppedImageMut::from_ref(&mut dst_image, x, y, w, h)?;
            resizer.resize_typed::<U8x3>(&src_view, &mut roi, &opts)?;
        }
        None => resizer.resize_typed::<U8x3>(&src_view, &mut dst_image, &opts)?,
    }

    Ok(())
}

/// Allocating convenience wrapper around [`scale_rgb_cpu`].
pub fn scale_rgb(src_rgb: &[u8], src: Size, plan: &ScalePlan) -> Result<Vec<u8>, ScaleError> {
    let mut resizer = Resizer::new();
    let mut out = vec![0u8; rgb_len(plan.out)];
    scale_rgb_cpu(&mut resizer, src_rgb, src, plan, &mut out)?;
    Ok(out)
}

#[inline]
fn fill_rgb(dst: &mut [u8], bg: [u8; 3]) {
    for px in dst.chunks_exact_mut(3) {
        px.copy_from_slice(&bg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{build_plan, ScaleTarget};

    fn solid(size: Size, rgb: [u8; 3]) -> Vec<u8> {
        let mut buf = vec![0u8; rgb_len(size)];
        fill_rgb(&mut buf, rgb);
        buf
    }

    fn assert_close(px: &[u8], expected: [u8; 3]) {
        for (got, want) in px.iter().zip(expected) {
            assert!(got.abs_diff(want) <= 1, "pixel {px:?} != {expected:?}");
        }
    }

    #[test]
    fn downscale_keeps_solid_colour() {
        let input = Size { w: 200, h: 100 };
        let src = solid(input, [200, 100, 50]);
        let plan = build_plan(input, ScaleTarget::MaxLongSide(50), AspectMode::Preserve);

        let out = scale_rgb(&src, input, &plan).unwrap();
        assert_eq!(out.len(), 50 * 25 * 3);
        for px in out.chunks_exact(3) {
            assert_close(px, [200, 100, 50]);
        }
    }

    #[test]
    fn letterbox_fills_padding() {
        let input = Size { w: 200, h: 100 };
        let src = solid(input, [255, 255, 255]);
        let plan = build_plan(
            input,
            ScaleTarget::Exact(Size { w: 100, h: 100 }),
            AspectMode::Pad { bg_rgb: [114, 114, 114] },
        );

        let out = scale_rgb(&src, input, &plan).unwrap();
        let (_, y, _, h) = plan.dst_roi.unwrap();
        // top row is padding, centre row is content
        assert_eq!(&out[0..3], &[114, 114, 114]);
        let centre = ((y + h / 2) * 100 + 50) as usize * 3;
        assert_close(&out[centre..centre + 3], [255, 255, 255]);
    }

    #[test]
    fn rejects_short_input() {
        let input = Size { w: 10, h: 10 };
        let plan = build_plan(input, ScaleTarget::MaxLongSide(5), AspectMode::Preserve);
        let err = scale_rgb(&[0u8; 12], input, &plan).unwrap_err();
        assert!(matches!(err, ScaleError::InputSize { .. }));
    }
}
