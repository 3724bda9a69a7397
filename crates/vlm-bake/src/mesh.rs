//! Triangle mesh with the two UV channels the bake stages work on.
//!
//! Every face carries its own per-loop attributes (projected UV, nested UV,
//! fade weight) so faces can be deleted or moved between meshes without
//! touching their neighbours. Positions are shared through vertex indices,
//! which is what "sharing a vertex" means for adjacency.

use std::collections::HashMap;

use glam::Vec3;

/// A triangle and its per-loop attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Indices into [`Mesh::positions`].
    pub verts: [u32; 3],
    /// Projected UV of each loop ("UVMap"), normalized render coordinates.
    pub uv: [[f32; 2]; 3],
    /// Packed UV of each loop ("UVMap Nested"), normalized page coordinates.
    pub nested_uv: [[f32; 2]; 3],
    /// Fade weight of each loop (vertex color), 1.0 means fully visible.
    pub color: [f32; 3],
    /// Render group of the face.
    pub material: u32,
}

impl Face {
    pub fn new(verts: [u32; 3], uv: [[f32; 2]; 3], material: u32) -> Self {
        Self {
            verts,
            uv,
            nested_uv: [[0.0; 2]; 3],
            color: [1.0; 3],
            material,
        }
    }
}

/// Triangulated mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub faces: Vec<Face>,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, faces: Vec<Face>) -> Self {
        Self { positions, faces }
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Append another mesh, offsetting its vertex indices.
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.faces.extend(other.faces.iter().map(|f| Face {
            verts: f.verts.map(|v| v + offset),
            ..*f
        }));
    }

    /// Stamp every face with the same render group.
    pub fn set_material(&mut self, material: u32) {
        for face in &mut self.faces {
            face.material = material;
        }
    }

    /// Keep only the faces whose flag is set, then drop unreferenced vertices.
    ///
    /// Faces past the end of `keep` are removed. Returns the number of faces
    /// removed.
    pub fn retain_faces(&mut self, keep: &[bool]) -> usize {
        let before = self.faces.len();
        let faces: Vec<Face> = self
            .faces
            .iter()
            .enumerate()
            .filter(|(i, _)| keep.get(*i).copied().unwrap_or(false))
            .map(|(_, f)| *f)
            .collect();

        // Compact positions, preserving their relative order.
        let mut used = vec![false; self.positions.len()];
        for face in &faces {
            for &v in &face.verts {
                if let Some(slot) = used.get_mut(v as usize) {
                    *slot = true;
                }
            }
        }
        let mut remap = vec![0u32; self.positions.len()];
        let mut positions = Vec::new();
        for (old, _) in used.iter().enumerate().filter(|&(_, &u)| u) {
            remap[old] = positions.len() as u32;
            positions.push(self.positions[old]);
        }
        self.faces = faces
            .into_iter()
            .map(|f| Face {
                verts: f.verts.map(|v| remap.get(v as usize).copied().unwrap_or(0)),
                ..f
            })
            .collect();
        self.positions = positions;
        before - self.faces.len()
    }

    fn corners(&self, face: usize) -> [Vec3; 3] {
        self.faces[face]
            .verts
            .map(|v| self.positions.get(v as usize).copied().unwrap_or(Vec3::ZERO))
    }

    /// Unit normal of a face, zero for degenerate triangles.
    pub fn face_normal(&self, face: usize) -> Vec3 {
        let [a, b, c] = self.corners(face);
        (b - a).cross(c - a).normalize_or_zero()
    }

    /// Center of the face's bounding box.
    pub fn face_center(&self, face: usize) -> Vec3 {
        let [a, b, c] = self.corners(face);
        (a.min(b).min(c) + a.max(b).max(c)) * 0.5
    }

    /// Delete faces turned away from `eye` by more than `limit_angle` degrees.
    ///
    /// Faces with a degenerate normal are always kept. With `keep_reflection`,
    /// a face hidden from the eye survives if it is visible through the
    /// mirror image of the scene in the `z = 0` plane. A limit of 90 degrees
    /// or more disables the removal. Returns the number of faces removed.
    pub fn remove_backfaces(&mut self, eye: Vec3, limit_angle: f32, keep_reflection: bool) -> usize {
        if limit_angle >= 90.0 || self.faces.is_empty() {
            return 0;
        }
        let dot_limit = (limit_angle + 90.0).to_radians().cos();
        let keep: Vec<bool> = (0..self.faces.len())
            .map(|i| {
                let normal = self.face_normal(i);
                if normal.length_squared() < 0.5 {
                    return true;
                }
                let center = self.face_center(i);
                if normal.dot((eye - center).normalize_or_zero()) >= dot_limit {
                    return true;
                }
                if keep_reflection {
                    let mirrored = Vec3::new(center.x, center.y, -center.z);
                    let mut reflected = (mirrored - eye).normalize_or_zero();
                    reflected.z = -reflected.z;
                    return -normal.dot(reflected) >= dot_limit;
                }
                false
            })
            .collect();
        self.retain_faces(&keep)
    }

    /// Order faces by distance of their center to `eye`, nearest first, or
    /// farthest first when `back_to_front` is set. Ties keep their order.
    pub fn sort_faces_by_distance(&mut self, eye: Vec3, back_to_front: bool) {
        let mut keyed: Vec<(f32, Face)> = (0..self.faces.len())
            .map(|i| (self.face_center(i).distance_squared(eye), self.faces[i]))
            .collect();
        if back_to_front {
            keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
        } else {
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        }
        self.faces = keyed.into_iter().map(|(_, f)| f).collect();
    }

    /// For every vertex, the faces using it.
    pub fn vertex_faces(&self) -> Vec<Vec<u32>> {
        let mut out = vec![Vec::new(); self.positions.len()];
        for (i, face) in self.faces.iter().enumerate() {
            for &v in &face.verts {
                if let Some(list) = out.get_mut(v as usize) {
                    if list.last() != Some(&(i as u32)) {
                        list.push(i as u32);
                    }
                }
            }
        }
        out
    }

    /// Split edges whose projected length is at least `threshold`, pass
    /// after pass, until none is left or `max_passes` is reached.
    ///
    /// Lengths are measured in projected UV with `u` scaled by `aspect`
    /// (render width over height). Each long edge gets one midpoint shared
    /// by the faces around it; loop attributes are interpolated linearly.
    /// Returns the number of edges split.
    pub fn subdivide_long_edges(&mut self, aspect: f32, threshold: f32, max_passes: u32) -> usize {
        let mut split = 0;
        for _ in 0..max_passes {
            let n = self.split_long_edges(aspect, threshold);
            if n == 0 {
                break;
            }
            split += n;
        }
        split
    }

    fn split_long_edges(&mut self, aspect: f32, threshold: f32) -> usize {
        let key = |a: u32, b: u32| (a.min(b), a.max(b));
        let mut long: HashMap<(u32, u32), u32> = HashMap::new();
        for face in &self.faces {
            for k in 0..3 {
                let (a, b) = (face.uv[k], face.uv[(k + 1) % 3]);
                let (du, dv) = ((b[0] - a[0]) * aspect, b[1] - a[1]);
                if (du * du + dv * dv).sqrt() >= threshold {
                    long.insert(key(face.verts[k], face.verts[(k + 1) % 3]), 0);
                }
            }
        }
        if long.is_empty() {
            return 0;
        }

        // Midpoints in a stable order so vertex indices are deterministic.
        let mut edges: Vec<(u32, u32)> = long.keys().copied().collect();
        edges.sort_unstable();
        for (a, b) in edges {
            let mid = (self.positions[a as usize] + self.positions[b as usize]) * 0.5;
            long.insert((a, b), self.positions.len() as u32);
            self.positions.push(mid);
        }

        let mut faces = Vec::with_capacity(self.faces.len() * 2);
        for face in &self.faces {
            let corner = |k: usize| Corner::of(face, k);
            let mid = |k: usize| {
                let (a, b) = (face.verts[k], face.verts[(k + 1) % 3]);
                long.get(&key(a, b))
                    .map(|&v| Corner::between(v, &corner(k), &corner((k + 1) % 3)))
            };
            let mids = [mid(0), mid(1), mid(2)];
            let tris: Vec<[Corner; 3]> = match mids {
                [None, None, None] => {
                    faces.push(*face);
                    continue;
                }
                [Some(m0), Some(m1), Some(m2)] => vec![
                    [corner(0), m0, m2],
                    [m0, corner(1), m1],
                    [m2, m1, corner(2)],
                    [m0, m1, m2],
                ],
                _ => {
                    let cut = mids.iter().filter(|m| m.is_some()).count();
                    // Rotate so the corner layout is the same for every case.
                    let k = if cut == 1 {
                        (0..3).find(|&k| mids[k].is_some()).unwrap_or(0)
                    } else {
                        (0..3).find(|&k| mids[k].is_none()).unwrap_or(0)
                    };
                    let c = [corner(k), corner((k + 1) % 3), corner((k + 2) % 3)];
                    match [mids[k], mids[(k + 1) % 3], mids[(k + 2) % 3]] {
                        [Some(m), None, None] => vec![[c[0], m, c[2]], [m, c[1], c[2]]],
                        [None, Some(m1), Some(m2)] => {
                            vec![[m1, c[2], m2], [c[0], c[1], m1], [c[0], m1, m2]]
                        }
                        _ => vec![[c[0], c[1], c[2]]],
                    }
                }
            };
            for t in tris {
                faces.push(Face {
                    verts: t.map(|c| c.vert),
                    uv: t.map(|c| c.uv),
                    nested_uv: t.map(|c| c.nested_uv),
                    color: t.map(|c| c.color),
                    material: face.material,
                });
            }
        }
        self.faces = faces;
        long.len()
    }

    /// Bounding box of the projected UVs, `None` for an empty mesh.
    pub fn uv_bounds(&self) -> Option<([f32; 2], [f32; 2])> {
        let mut loops = self.faces.iter().flat_map(|f| f.uv.iter());
        let first = *loops.next()?;
        Some(loops.fold((first, first), |(lo, hi), uv| {
            (
                [lo[0].min(uv[0]), lo[1].min(uv[1])],
                [hi[0].max(uv[0]), hi[1].max(uv[1])],
            )
        }))
    }
}

/// One loop of a face, used while splitting faces.
#[derive(Debug, Clone, Copy)]
struct Corner {
    vert: u32,
    uv: [f32; 2],
    nested_uv: [f32; 2],
    color: f32,
}

impl Corner {
    fn of(face: &Face, k: usize) -> Self {
        Self {
            vert: face.verts[k],
            uv: face.uv[k],
            nested_uv: face.nested_uv[k],
            color: face.color[k],
        }
    }

    fn between(vert: u32, a: &Corner, b: &Corner) -> Self {
        let lerp = |p: [f32; 2], q: [f32; 2]| [(p[0] + q[0]) * 0.5, (p[1] + q[1]) * 0.5];
        Self {
            vert,
            uv: lerp(a.uv, b.uv),
            nested_uv: lerp(a.nested_uv, b.nested_uv),
            color: (a.color + b.color) * 0.5,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Unit quad in the z = 0 plane facing +z, UVs mapped over `[u0, u1] x [v0, v1]`.
    pub(crate) fn quad(u0: f32, v0: f32, u1: f32, v1: f32, material: u32) -> Mesh {
        Mesh::new(
            vec![
                Vec3::new(u0, v0, 0.0),
                Vec3::new(u1, v0, 0.0),
                Vec3::new(u1, v1, 0.0),
                Vec3::new(u0, v1, 0.0),
            ],
            vec![
                Face::new([0, 1, 2], [[u0, v0], [u1, v0], [u1, v1]], material),
                Face::new([0, 2, 3], [[u0, v0], [u1, v1], [u0, v1]], material),
            ],
        )
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut a = quad(0.0, 0.0, 0.5, 0.5, 0);
        let b = quad(0.5, 0.5, 1.0, 1.0, 1);
        a.merge(&b);
        assert_eq!(a.positions.len(), 8);
        assert_eq!(a.triangle_count(), 4);
        assert_eq!(a.faces[2].verts, [4, 5, 6]);
        assert_eq!(a.faces[3].material, 1);
    }

    #[test]
    fn test_retain_faces_compacts_vertices() {
        let mut m = quad(0.0, 0.0, 1.0, 1.0, 0);
        let removed = m.retain_faces(&[false, true]);
        assert_eq!(removed, 1);
        assert_eq!(m.positions.len(), 3);
        assert_eq!(m.faces[0].verts, [0, 1, 2]);
        assert_eq!(m.positions[1], Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_retain_faces_short_mask_drops_rest() {
        let mut m = quad(0.0, 0.0, 1.0, 1.0, 0);
        m.retain_faces(&[true]);
        assert_eq!(m.triangle_count(), 1);
    }

    #[test]
    fn test_face_normal_degenerate() {
        let m = Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0],
            vec![Face::new([0, 1, 2], [[0.0; 2]; 3], 0)],
        );
        assert_eq!(m.face_normal(0), Vec3::ZERO);
    }

    #[test]
    fn test_remove_backfaces() {
        let mut m = quad(0.0, 0.0, 1.0, 1.0, 0);
        // Flip the second face so it points down.
        m.faces[1].verts = [0, 3, 2];
        let removed = m.remove_backfaces(Vec3::new(0.5, 0.5, 10.0), 0.0, false);
        assert_eq!(removed, 1);
        assert_eq!(m.triangle_count(), 1);
    }

    #[test]
    fn test_remove_backfaces_disabled_at_90() {
        let mut m = quad(0.0, 0.0, 1.0, 1.0, 0);
        m.faces[1].verts = [0, 3, 2];
        assert_eq!(m.remove_backfaces(Vec3::new(0.5, 0.5, 10.0), 90.0, false), 0);
    }

    #[test]
    fn test_remove_backfaces_keeps_reflected() {
        // A face above the playfield pointing down is seen through the reflection.
        let mut m = Mesh::new(
            vec![
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(0.0, 1.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
            ],
            vec![Face::new([0, 1, 2], [[0.0; 2]; 3], 0)],
        );
        assert!(m.face_normal(0).z < 0.0);
        let mut no_reflection = m.clone();
        assert_eq!(no_reflection.remove_backfaces(Vec3::new(0.3, 0.3, 10.0), 0.0, false), 1);
        assert_eq!(m.remove_backfaces(Vec3::new(0.3, 0.3, 10.0), 0.0, true), 0);
    }

    #[test]
    fn test_sort_faces_by_distance() {
        let mut m = quad(0.0, 0.0, 1.0, 1.0, 0);
        m.merge(&quad(5.0, 5.0, 6.0, 6.0, 1));
        m.sort_faces_by_distance(Vec3::new(6.0, 6.0, 1.0), false);
        assert_eq!(m.faces[0].material, 1);
        m.sort_faces_by_distance(Vec3::new(6.0, 6.0, 1.0), true);
        assert_eq!(m.faces[0].material, 0);
    }

    #[test]
    fn test_vertex_faces() {
        let m = quad(0.0, 0.0, 1.0, 1.0, 0);
        let vf = m.vertex_faces();
        assert_eq!(vf[0], vec![0, 1]);
        assert_eq!(vf[1], vec![0]);
        assert_eq!(vf[3], vec![1]);
    }

    fn longest_edge(m: &Mesh, aspect: f32) -> f32 {
        m.faces
            .iter()
            .flat_map(|f| {
                (0..3).map(move |k| {
                    let (a, b) = (f.uv[k], f.uv[(k + 1) % 3]);
                    (((b[0] - a[0]) * aspect).powi(2) + (b[1] - a[1]).powi(2)).sqrt()
                })
            })
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_subdivide_single_pass_shares_midpoints() {
        let mut m = quad(0.0, 0.0, 0.5, 0.5, 3);
        // Four sides and the diagonal are all longer than 0.3.
        assert_eq!(m.subdivide_long_edges(1.0, 0.3, 1), 5);
        assert_eq!(m.triangle_count(), 8);
        assert_eq!(m.positions.len(), 9);
        assert!(m.faces.iter().all(|f| f.material == 3));
    }

    #[test]
    fn test_subdivide_converges_below_threshold() {
        let mut m = quad(0.0, 0.0, 1.0, 1.0, 0);
        let split = m.subdivide_long_edges(1.0, 0.1, 8);
        assert!(split > 0);
        assert!(longest_edge(&m, 1.0) < 0.1);

        // Same surface, same winding.
        let area: f32 = m
            .faces
            .iter()
            .map(|f| {
                let [a, b, c] = f.uv;
                ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])) * 0.5
            })
            .sum();
        assert!((area - 1.0).abs() < 1e-4);
        for i in 0..m.triangle_count() {
            assert!(m.face_normal(i).z > 0.0);
        }
    }

    #[test]
    fn test_subdivide_interpolates_loop_attributes() {
        let mut m = quad(0.0, 0.0, 0.5, 0.5, 0);
        m.faces[0].color = [1.0, 0.0, 0.0];
        m.faces[1].color = [1.0, 0.0, 0.0];
        m.subdivide_long_edges(1.0, 0.3, 1);
        let centre = m
            .positions
            .iter()
            .position(|p| (*p - Vec3::new(0.25, 0.25, 0.0)).length() < 1e-6)
            .unwrap() as u32;
        for f in m.faces.iter() {
            for k in 0..3 {
                if f.verts[k] == centre {
                    assert_eq!(f.uv[k], [0.25, 0.25]);
                    assert_eq!(f.color[k], 0.5);
                }
            }
        }
    }

    #[test]
    fn test_subdivide_scales_u_by_aspect() {
        let mut m = quad(0.0, 0.0, 0.25, 0.25, 0);
        assert_eq!(m.subdivide_long_edges(1.0, 0.4, 8), 0);
        assert_eq!(m.triangle_count(), 2);
        assert!(m.subdivide_long_edges(4.0, 0.4, 8) > 0);
        assert!(longest_edge(&m, 4.0) < 0.4);
    }

    #[test]
    fn test_subdivide_zero_passes_is_noop() {
        let mut m = quad(0.0, 0.0, 1.0, 1.0, 0);
        let before = m.clone();
        assert_eq!(m.subdivide_long_edges(1.0, 0.1, 0), 0);
        assert_eq!(m, before);
    }

    #[test]
    fn test_uv_bounds() {
        let m = quad(0.25, 0.5, 0.75, 1.0, 0);
        assert_eq!(m.uv_bounds(), Some(([0.25, 0.5], [0.75, 1.0])));
        assert_eq!(Mesh::default().uv_bounds(), None);
    }
}
