//! Effect engine: pure Rust, built on the `image` crate.
//!
//! | Effect | Operation |
//! |---|---|
//! | **None** | no-op, the original is served |
//! | **Grayscale** | single-channel luma |
//! | **Negative** | `255 - v` per channel |
//! | **Sepia** | fixed 3×3 colour matrix, clamped |
//! | **Thumbnail** | fit inside a bounding box, never upscale |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for geometry and colour math (unit testable)
//! - **Parameters**: Data structures describing effect runs
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining parameters + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, ImageInfo};
pub use operations::{EffectConfig, apply_effect, describe};
pub use params::{BoundingBox, Effect, EffectParams, Quality};
pub use rust_backend::RustBackend;
