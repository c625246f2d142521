// SPDX-License-Identifier: MIT
//! # frame-scale: RGB8 Frame Scaling for Vision Model Input
//!
//! Camera frames are usually far larger than what a vision model needs.
//! This crate computes scaling plans and runs a SIMD CPU resize so frames can
//! be shrunk before they are JPEG-encoded for a cloud model, or letterboxed to
//! the fixed square input of a local object detector.
//!
//! ## Key Components
//!
//! - [`presets`]: Scaling plan computation and payload presets
//! - [`cpu`]: CPU scaling of tightly packed RGB8 buffers via fast_image_resize
//!
//! ## Usage Example
//!
//! ```rust
//! use frame_scale::cpu::scale_rgb;
//! use frame_scale::presets::{build_plan, AspectMode, ScaleTarget, Size};
//!
//! let input = Size { w: 1280, h: 720 };
//! let pixels = vec![0u8; (input.w * input.h * 3) as usize];
//!
//! // Clamp the longest side to 640 for a cloud payload
//! let plan = build_plan(input, ScaleTarget::MaxLongSide(640), AspectMode::Preserve);
//! let scaled = scale_rgb(&pixels, input, &plan).unwrap();
//! assert_eq!(scaled.len(), (plan.out.w * plan.out.h * 3) as usize);
//! assert_eq!((plan.out.w, plan.out.h), (640, 360));
//! ```

pub mod cpu;
pub mod presets;
