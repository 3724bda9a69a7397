//! Boundary with the external renderer.
//!
//! The bake stages never talk to a scene graph; they ask a [`Renderer`] for
//! images and cache whatever comes back. Renders must be deterministic for
//! identical inputs since the cache is keyed by name only.

use crate::error::BakeError;
use crate::group::AlphaMask;
use crate::types::{BakeObject, HdrImage, LightingScenario};
use vlm_raster::{fill_triangle, Coverage};

pub trait Renderer {
    /// Alpha mask of a single object seen from the bake camera.
    fn render_mask(
        &mut self,
        object: &BakeObject,
        width: u32,
        height: u32,
    ) -> Result<AlphaMask, BakeError>;

    /// Linear RGBA render of `objects` lit by `scenario`, everything else
    /// of the scene hidden.
    fn render_scenario(
        &mut self,
        objects: &[&BakeObject],
        scenario: &LightingScenario,
        width: u32,
        height: u32,
    ) -> Result<HdrImage, BakeError>;
}

/// Renderer that derives masks from the objects' projected UVs.
///
/// Projected UVs are the screen position of each loop, so rasterizing them
/// gives exactly the camera-space silhouette. It cannot light anything:
/// light renders must already be in the cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct UvMaskRenderer;

impl Renderer for UvMaskRenderer {
    fn render_mask(
        &mut self,
        object: &BakeObject,
        width: u32,
        height: u32,
    ) -> Result<AlphaMask, BakeError> {
        let mut coverage = Coverage::new(width, height);
        let (fw, fh) = (width as f32, height as f32);
        for face in &object.mesh.faces {
            let tri = face.uv.map(|p| [p[0] * fw, p[1] * fh]);
            fill_triangle(&tri, width, height, |x, y| coverage.set(x, y));
        }
        Ok(AlphaMask::from_coverage(&coverage))
    }

    fn render_scenario(
        &mut self,
        _objects: &[&BakeObject],
        scenario: &LightingScenario,
        _width: u32,
        _height: u32,
    ) -> Result<HdrImage, BakeError> {
        Err(BakeError::MissingInput(format!(
            "no light renderer available, render '{}' must be provided in the cache",
            scenario.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::quad;

    #[test]
    fn test_uv_mask_matches_quad() {
        let object = BakeObject::new("quad", quad(0.25, 0.25, 0.75, 0.75, 0));
        let mask = UvMaskRenderer.render_mask(&object, 8, 8).unwrap();
        let opaque = mask.alpha.iter().filter(|&&a| a > 0.0).count();
        assert_eq!(opaque, 16);
        assert_eq!(mask.get(2, 2), 1.0);
        assert_eq!(mask.get(1, 1), 0.0);
    }
}
