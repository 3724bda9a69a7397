//! UV island extraction and discretized island masks.
//!
//! An island is a set of faces connected through loops that share a vertex,
//! a projected UV (rounded to 5 decimals) and a render group. Islands are
//! the unit the nesting engine moves around.
//!
//! Masks are computed at the source render resolution: projected UVs map
//! to render pixels, so an island placed at an integer offset copies render
//! pixels one to one. The mask is stored as per-column opaque spans for the
//! identity orientation; the three other orientations are derived from that
//! table without rasterizing again.

use std::collections::{HashMap, VecDeque};

use crate::mesh::Mesh;
use vlm_raster::Coverage;

/// Allowed island orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// As rendered.
    Identity,
    /// Quarter turn, implemented as a swap of the u and v axes.
    Rotate90,
    /// Mirrored along x.
    FlipX,
    /// Axis swap, then mirrored along x.
    Rotate90FlipX,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Identity,
        Orientation::Rotate90,
        Orientation::FlipX,
        Orientation::Rotate90FlipX,
    ];

    fn index(self) -> usize {
        match self {
            Orientation::Identity => 0,
            Orientation::Rotate90 => 1,
            Orientation::FlipX => 2,
            Orientation::Rotate90FlipX => 3,
        }
    }

    pub fn swaps_axes(self) -> bool {
        matches!(self, Orientation::Rotate90 | Orientation::Rotate90FlipX)
    }

    /// Orientations to try, most promising first: long islands are first
    /// tried standing up.
    pub fn search_order(width: u32, height: u32) -> [Orientation; 4] {
        if width > height {
            [
                Orientation::Rotate90,
                Orientation::Rotate90FlipX,
                Orientation::Identity,
                Orientation::FlipX,
            ]
        } else {
            [
                Orientation::Identity,
                Orientation::FlipX,
                Orientation::Rotate90,
                Orientation::Rotate90FlipX,
            ]
        }
    }
}

/// Loop identity used for UV adjacency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LoopKey {
    u: i64,
    v: i64,
    vert: u32,
    material: u32,
}

impl LoopKey {
    fn new(uv: [f32; 2], vert: u32, material: u32) -> Self {
        Self {
            u: (uv[0] as f64 * 1e5).round() as i64,
            v: (uv[1] as f64 * 1e5).round() as i64,
            vert,
            material,
        }
    }
}

/// Split the faces of a mesh into UV islands.
///
/// Each island lists its faces in breadth-first order; islands are returned
/// in order of their lowest face index.
pub fn extract_islands(mesh: &Mesh) -> Vec<Vec<u32>> {
    let mut key_faces: HashMap<LoopKey, Vec<u32>> = HashMap::new();
    for (i, face) in mesh.faces.iter().enumerate() {
        for k in 0..3 {
            let key = LoopKey::new(face.uv[k], face.verts[k], face.material);
            key_faces.entry(key).or_default().push(i as u32);
        }
    }

    let mut visited = vec![false; mesh.faces.len()];
    let mut islands = Vec::new();
    for start in 0..mesh.faces.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut island = Vec::new();
        let mut queue = VecDeque::from([start as u32]);
        while let Some(f) = queue.pop_front() {
            island.push(f);
            let face = &mesh.faces[f as usize];
            for k in 0..3 {
                let key = LoopKey::new(face.uv[k], face.verts[k], face.material);
                for &n in key_faces.get(&key).map(Vec::as_slice).unwrap_or(&[]) {
                    if !visited[n as usize] {
                        visited[n as usize] = true;
                        queue.push_back(n);
                    }
                }
            }
        }
        islands.push(island);
    }
    islands
}

/// Per-column opaque spans, half-open `[start, end)`.
pub type ColumnSpans = Vec<Vec<(u32, u32)>>;

/// Discretized, padded footprint of an island in all four orientations.
#[derive(Debug, Clone)]
pub struct IslandMask {
    /// Source pixel of the mask's `(0, 0)` corner.
    pub origin: [i64; 2],
    /// Size in the identity orientation.
    pub width: u32,
    pub height: u32,
    /// Opaque pixel count, padding included.
    pub pixel_count: usize,
    /// Render group of the island.
    pub material: u32,
    columns: [ColumnSpans; 4],
}

impl IslandMask {
    /// Rasterize `faces` of `mesh` at `src_w x src_h` and grow the result
    /// by `padding` pixels on every side.
    pub fn compute(mesh: &Mesh, faces: &[u32], src_w: u32, src_h: u32, padding: u32) -> Self {
        let (sw, sh) = (src_w as f32, src_h as f32);
        let pad = padding as i64;
        let mut lo = [f32::INFINITY; 2];
        let mut hi = [f32::NEG_INFINITY; 2];
        for &f in faces {
            for uv in &mesh.faces[f as usize].uv {
                lo = [lo[0].min(uv[0]), lo[1].min(uv[1])];
                hi = [hi[0].max(uv[0]), hi[1].max(uv[1])];
            }
        }
        if faces.is_empty() || !(lo[0].is_finite() && lo[1].is_finite() && hi[0].is_finite() && hi[1].is_finite()) {
            lo = [0.0; 2];
            hi = [0.0; 2];
        }
        let origin = [
            (lo[0] * sw).floor() as i64 - pad,
            (lo[1] * sh).floor() as i64 - pad,
        ];
        let width = ((hi[0] * sw).ceil() as i64 + pad - origin[0]).max(1) as u32;
        let height = ((hi[1] * sh).ceil() as i64 + pad - origin[1]).max(1) as u32;

        let mut coverage = Coverage::new(width, height);
        for &f in faces {
            let face = &mesh.faces[f as usize];
            let tri = face.uv.map(|uv| {
                [
                    uv[0] * sw - origin[0] as f32,
                    uv[1] * sh - origin[1] as f32,
                ]
            });
            coverage.add_triangle(&tri);
        }
        let coverage = coverage.dilate(padding);
        let material = faces
            .first()
            .map(|&f| mesh.faces[f as usize].material)
            .unwrap_or(0);
        Self::from_columns(origin, width, height, material, coverage.column_spans())
    }

    /// Build the four orientations from identity column spans.
    pub fn from_columns(
        origin: [i64; 2],
        width: u32,
        height: u32,
        material: u32,
        identity: ColumnSpans,
    ) -> Self {
        let pixel_count = identity
            .iter()
            .flat_map(|c| c.iter())
            .map(|&(s, e)| (e - s) as usize)
            .sum();
        let swapped = transpose(&identity, height);
        let flipped: ColumnSpans = identity.iter().rev().cloned().collect();
        let swapped_flipped: ColumnSpans = swapped.iter().rev().cloned().collect();
        Self {
            origin,
            width,
            height,
            pixel_count,
            material,
            columns: [identity, swapped, flipped, swapped_flipped],
        }
    }

    /// Mask size `(columns, rows)` in the given orientation.
    pub fn size(&self, orientation: Orientation) -> (u32, u32) {
        if orientation.swaps_axes() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    pub fn columns(&self, orientation: Orientation) -> &ColumnSpans {
        &self.columns[orientation.index()]
    }

    /// Local continuous coordinates of a projected UV, in source pixels.
    pub fn local(&self, uv: [f32; 2], src_w: u32, src_h: u32) -> [f32; 2] {
        [
            uv[0] * src_w as f32 - self.origin[0] as f32,
            uv[1] * src_h as f32 - self.origin[1] as f32,
        ]
    }

    /// Page position of a local continuous point for a placement at `(x, y)`.
    pub fn place_point(&self, orientation: Orientation, x: u32, y: u32, p: [f32; 2]) -> [f32; 2] {
        let (x, y) = (x as f32, y as f32);
        let (w, h) = (self.width as f32, self.height as f32);
        match orientation {
            Orientation::Identity => [x + p[0], y + p[1]],
            Orientation::Rotate90 => [x + p[1], y + p[0]],
            Orientation::FlipX => [x + w - p[0], y + p[1]],
            Orientation::Rotate90FlipX => [x + h - p[1], y + p[0]],
        }
    }

    /// Page pixel of local pixel `(px, py)` for a placement at `(x, y)`.
    pub fn place_pixel(&self, orientation: Orientation, x: u32, y: u32, px: u32, py: u32) -> (u32, u32) {
        match orientation {
            Orientation::Identity => (x + px, y + py),
            Orientation::Rotate90 => (x + py, y + px),
            Orientation::FlipX => (x + self.width - 1 - px, y + py),
            Orientation::Rotate90FlipX => (x + self.height - 1 - py, y + px),
        }
    }

    /// Opaque local pixels in the identity orientation.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.columns[0]
            .iter()
            .enumerate()
            .flat_map(|(x, spans)| {
                spans
                    .iter()
                    .flat_map(move |&(s, e)| (s..e).map(move |y| (x as u32, y)))
            })
    }
}

/// Swap the axes of a column span table whose columns are `rows` tall.
fn transpose(columns: &ColumnSpans, rows: u32) -> ColumnSpans {
    let mut out: ColumnSpans = vec![Vec::new(); rows as usize];
    for (x, spans) in columns.iter().enumerate() {
        let x = x as u32;
        for &(s, e) in spans {
            for row in s..e {
                let runs = &mut out[row as usize];
                match runs.last_mut() {
                    Some(last) if last.1 == x => last.1 = x + 1,
                    _ => runs.push((x, x + 1)),
                }
            }
        }
    }
    out
}
