//! Lightmap pruning.
//!
//! A lightmap mesh only needs the faces a light actually reaches. The mesh
//! is rasterized once into a [`VisibilityMap`] (its projected UVs are screen
//! positions, so this is a per-pixel face list of the camera view). For each
//! lighting scenario the influence map then tells which pixels are lit, and
//! every face seen through a lit pixel of its own render group is kept.
//!
//! Kept faces get a one-ring of neighbours so the real-time shader can fade
//! the lightmap out through vertex colors instead of cutting it hard.

use crate::error::BakeError;
use crate::influence::InfluenceMap;
use crate::mesh::Mesh;
use vlm_raster::VisibilityMap;

/// Face list per pixel of the mesh's projected UVs.
pub fn build_visibility_map(mesh: &Mesh, width: u32, height: u32) -> VisibilityMap {
    VisibilityMap::build(
        width,
        height,
        mesh.faces
            .iter()
            .enumerate()
            .map(|(i, face)| (i as u32, face.uv)),
    )
}

/// Statistics of one pruning pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneOutcome {
    /// Largest color channel seen on a lit, covered pixel.
    pub hdr_range: f32,
    /// Faces that passed the influence test.
    pub influenced: usize,
    /// Faces left in the mesh (influenced plus their one-ring).
    pub kept: usize,
    /// Faces deleted.
    pub removed: usize,
}

/// Delete the faces of `mesh` that no light of the scenario reaches.
///
/// A pixel is lit when the global max channel exceeds `threshold`; a face
/// covering a lit pixel passes when its own render group's luma there also
/// exceeds `threshold`. When faces are deleted, loops at a vertex of a
/// passing face get fade weight 1 and all others 0.
pub fn prune(
    mesh: &mut Mesh,
    vmap: &VisibilityMap,
    influence: &InfluenceMap,
    threshold: f32,
) -> Result<PruneOutcome, BakeError> {
    if (vmap.width, vmap.height) != (influence.width, influence.height) {
        return Err(BakeError::Validation(format!(
            "visibility map is {}x{} but influence map is {}x{}",
            vmap.width, vmap.height, influence.width, influence.height
        )));
    }
    let n_faces = mesh.faces.len();

    // Phase 1: tag faces that are directly influenced.
    let mut hdr_range = 0.0f32;
    let mut influenced = vec![false; n_faces];
    for (xy, &max) in influence.global_max.iter().enumerate() {
        let faces = vmap.cell(xy);
        if faces.is_empty() || max <= threshold {
            continue;
        }
        hdr_range = hdr_range.max(max);
        for &f in faces {
            let Some(face) = mesh.faces.get(f as usize) else {
                continue;
            };
            if influence.group_luma(face.material as usize, xy) > threshold {
                influenced[f as usize] = true;
            }
        }
    }

    // Phase 2: grow by one ring of vertex neighbours.
    let vertex_faces = mesh.vertex_faces();
    let mut kept = influenced.clone();
    let mut lit_vertex = vec![false; mesh.positions.len()];
    for (f, _) in influenced.iter().enumerate().filter(|&(_, &t)| t) {
        for &v in &mesh.faces[f].verts {
            let Some(neighbours) = vertex_faces.get(v as usize) else {
                continue;
            };
            lit_vertex[v as usize] = true;
            for &n in neighbours {
                kept[n as usize] = true;
            }
        }
    }

    // Phase 3: fade weights, then rebuild without the unkept faces.
    let removed = kept.iter().filter(|&&k| !k).count();
    if removed > 0 {
        for face in &mut mesh.faces {
            for k in 0..3 {
                let lit = lit_vertex.get(face.verts[k] as usize).copied().unwrap_or(false);
                face.color[k] = if lit { 1.0 } else { 0.0 };
            }
        }
        mesh.retain_faces(&kept);
    }

    Ok(PruneOutcome {
        hdr_range,
        influenced: influenced.iter().filter(|&&t| t).count(),
        kept: mesh.faces.len(),
        removed,
    })
}

/// Whether a pruned lightmap contributes too little light to be exported.
pub fn should_discard(mesh: &Mesh, hdr_range: f32, threshold: f32) -> bool {
    mesh.is_empty() || hdr_range <= 2.0 * threshold
}
