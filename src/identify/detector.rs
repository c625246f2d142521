//! Object detector seam and the ONNX implementation behind it.
//!
//! The trained ingredient model is a YOLO export. Both output layouts are
//! accepted:
//!
//! - YOLOv5: `[1, N, 5 + C]`, rows of `cx, cy, w, h, objectness, scores..`
//! - YOLOv8: `[1, 4 + C, N]`, columns of `cx, cy, w, h, scores..`
//!
//! Boxes are produced in model-input pixels and mapped back onto the
//! original frame through the letterbox [`ScalePlan`].

use frame_scale::presets::ScalePlan;

use crate::error::{BakeError, BakeResult};
use crate::frame::Frame;

pub(crate) const BACKEND: &str = "local detector";

/// Axis-aligned box in frame pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f64 {
        (self.w.max(0.0) as f64) * (self.h.max(0.0) as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_index: usize,
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

pub trait Detector: Send + Sync {
    /// Detections above the confidence threshold, most confident first.
    fn detect(&self, frame: &Frame) -> BakeResult<Vec<Detection>>;
}

/// Decode a raw YOLO output tensor.
pub fn parse_yolo_output(
    shape: &[usize],
    data: &[f32],
    threshold: f32,
    classes: &[String],
    plan: &ScalePlan,
) -> BakeResult<Vec<Detection>> {
    let &[1, d1, d2] = shape else {
        return Err(BakeError::backend(BACKEND, format!("unexpected output shape {shape:?}")));
    };
    if data.len() != d1 * d2 {
        return Err(BakeError::backend(
            BACKEND,
            format!("output has {} values, shape {shape:?}", data.len()),
        ));
    }

    // v8 puts the attribute axis first; fall back to "attributes are the
    // short axis" when the class count does not pin the layout down
    let c = classes.len();
    let transposed = if c > 0 && d2 == 5 + c {
        false
    } else if c > 0 && d1 == 4 + c {
        true
    } else {
        d1 < d2
    };
    let (count, attrs) = if transposed { (d2, d1) } else { (d1, d2) };
    let has_objectness = !transposed;
    let first_score = if has_objectness { 5 } else { 4 };
    if attrs <= first_score {
        return Err(BakeError::backend(
            BACKEND,
            format!("output shape {shape:?} carries no class scores"),
        ));
    }
    let at = |i: usize, a: usize| {
        if transposed {
            data[a * count + i]
        } else {
            data[i * attrs + a]
        }
    };

    let mut detections = Vec::new();
    for i in 0..count {
        let Some((class_index, score)) = (first_score..attrs)
            .map(|a| (a - first_score, at(i, a)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            continue;
        };
        let confidence = if has_objectness { score * at(i, 4) } else { score };
        if !(confidence >= threshold) {
            continue;
        }

        let (cx, cy, w, h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
        let (x1, y1) = plan.to_input(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = plan.to_input(cx + w / 2.0, cy + h / 2.0);
        detections.push(Detection {
            class_index,
            label: classes
                .get(class_index)
                .cloned()
                .unwrap_or_else(|| format!("class {class_index}")),
            confidence,
            bbox: BoundingBox {
                x: x1,
                y: y1,
                w: x2 - x1,
                h: y2 - y1,
            },
        });
    }

    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    Ok(detections)
}

#[cfg(feature = "local-detector")]
pub use onnx::TractDetector;

#[cfg(feature = "local-detector")]
mod onnx {
    use std::path::Path;

    use frame_scale::presets::{AspectMode, ScaleTarget, Size, build_plan};
    use tract_onnx::prelude::*;
    use tracing::info;

    use super::{BACKEND, Detection, Detector, parse_yolo_output};
    use crate::error::{BakeError, BakeResult};
    use crate::frame::Frame;

    /// Letterbox grey used by YOLO training pipelines.
    const PAD_RGB: [u8; 3] = [114, 114, 114];

    pub struct TractDetector {
        model: SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>,
        input: Size,
        threshold: f32,
        classes: Vec<String>,
    }

    impl TractDetector {
        pub fn load(
            path: &Path,
            input_size: u32,
            threshold: f32,
            classes: Vec<String>,
        ) -> BakeResult<Self> {
            let side = input_size as usize;
            let model = tract_onnx::onnx()
                .model_for_path(path)
                .and_then(|m| m.with_input_fact(0, f32::fact([1, 3, side, side]).into()))
                .and_then(|m| m.into_optimized())
                .and_then(|m| m.into_runnable())
                .map_err(|e| BakeError::backend(BACKEND, format!("{}: {e}", path.display())))?;
            info!(model = %path.display(), input_size, classes = classes.len(), "detector loaded");

            Ok(Self {
                model,
                input: Size {
                    w: input_size,
                    h: input_size,
                },
                threshold,
                classes,
            })
        }
    }

    impl Detector for TractDetector {
        fn detect(&self, frame: &Frame) -> BakeResult<Vec<Detection>> {
            let plan = build_plan(
                frame.size(),
                ScaleTarget::Exact(self.input),
                AspectMode::Pad { bg_rgb: PAD_RGB },
            );
            let rgb = frame_scale::cpu::scale_rgb(&frame.pixels, frame.size(), &plan)?;
            let (w, h) = (self.input.w as usize, self.input.h as usize);
            let tensor = tract_ndarray::Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
                rgb[(y * w + x) * 3 + c] as f32 / 255.0
            });

            let outputs = self
                .model
                .run(tvec!(tensor.into_tensor().into_tvalue()))
                .map_err(|e| BakeError::backend(BACKEND, e))?;
            let output = outputs[0]
                .to_array_view::<f32>()
                .map_err(|e| BakeError::backend(BACKEND, e))?;
            let data: Vec<f32> = output.iter().copied().collect();

            parse_yolo_output(output.shape(), &data, self.threshold, &self.classes, &plan)
        }
    }
}
