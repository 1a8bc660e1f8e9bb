//! # canvas-resample
//!
//! Fixed-point filter-kernel resampling and multi-resolution caching for
//! interactive display of large raster canvases.
//!
//! - Separable resampling with 24.8 fixed-point positions and 8-bit kernel
//!   weights that always sum to 255
//! - A closed set of interpolation kernels (Box through Lanczos3) and a
//!   name-keyed registry
//! - In-place affine transforms decomposed into an exact quarter turn plus
//!   two scanline passes
//! - Exact mirrors and quarter-turn rotations
//! - An image pyramid of 2x2 box-filtered levels with incremental updates
//! - A viewport-sized prescaled projection that repaints only what changed
//!
//! ## Architecture
//!
//! Resampling runs one scanline at a time:
//!
//! 1. **Filter Strategy**: kernel shape and support radius
//! 2. **Weights Buffer**: 256 precomputed integer kernels, one per subpixel phase
//! 3. **Weights Applicator**: maps each destination pixel to a blend span and mixes
//! 4. **Transform Worker**: drives the applicator across a whole device
//!
//! The display side builds on top of it:
//!
//! 1. **Image Pyramid**: level 0 in the monitor color model, then halvings
//! 2. **Image Patch**: pixels around a requested rect from the best level
//! 3. **Prescaled Projection**: patches drawn into a viewport buffer

// Phase 1: Foundation Types & Math
pub mod basics;
pub mod fixed_point;
pub mod trans_affine;

// Phase 2: Pixel Storage
pub mod color_model;
pub mod paint_device;

// Phase 3: Filter Kernels
pub mod filter_registry;
pub mod filter_strategy;
pub mod filter_weights_buffer;

// Phase 4: Scanline Resampling
pub mod filter_weights_applicator;
pub mod transform_worker;

// Phase 5: Display Cache
pub mod image_patch;
pub mod image_pyramid;
pub mod prescaled_projection;
