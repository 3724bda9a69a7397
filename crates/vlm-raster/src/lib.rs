//! Software rasterization kernel shared by the bake stages.
//!
//! Everything here works on pixel-space triangles (`[[f32; 2]; 3]`) and
//! flat row-major buffers whose row 0 is `v = 0`. Nothing in this crate
//! knows about meshes, images on disk or lighting scenarios.
//!
//! Two inclusion policies are provided:
//!
//! - [`fill_triangle`]: plain pixel-center coverage.
//! - [`dilated_triangle`]: conservative coverage grown by about one pixel
//!   along every edge, never dropping a triangle entirely. This is the
//!   policy used to build [`VisibilityMap`]s and island coverage masks.

/// Edge functions and triangle scan conversion.
pub mod edge;

/// Binary coverage buffers.
pub mod coverage;

/// Per-pixel face lists.
pub mod visibility;

/// Max-filter downscaling of light renders.
pub mod influence;

pub use coverage::Coverage;
pub use edge::{dilated_triangle, fill_triangle, orient2d, Bounds};
pub use influence::{luma, max_channel, max_pool};
pub use visibility::VisibilityMap;
