use crate::edge::dilated_triangle;

/// For every pixel of a `width x height` grid, the faces whose conservative
/// footprint covers it.
///
/// Built once per mesh from triangles in normalized UV space and read-only
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct VisibilityMap {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<Vec<u32>>,
}

impl VisibilityMap {
    /// Rasterize `(face index, uv triangle)` pairs into a new map.
    ///
    /// UVs are scaled by the map size before rasterization. Triangles with
    /// non-finite coordinates are skipped. Within a cell, face indices
    /// appear in the order the triangles were supplied.
    pub fn build<I>(width: u32, height: u32, triangles: I) -> Self
    where
        I: IntoIterator<Item = (u32, [[f32; 2]; 3])>,
    {
        let mut cells = vec![Vec::new(); width as usize * height as usize];
        let (fw, fh) = (width as f32, height as f32);
        for (face, uv) in triangles {
            let tri = uv.map(|p| [p[0] * fw, p[1] * fh]);
            dilated_triangle(&tri, width, height, |x, y| {
                cells[y as usize * width as usize + x as usize].push(face);
            });
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Faces covering pixel `(x, y)`; empty outside the grid.
    pub fn faces_at(&self, x: u32, y: u32) -> &[u32] {
        if x >= self.width || y >= self.height {
            return &[];
        }
        self.cell(y as usize * self.width as usize + x as usize)
    }

    /// Faces of the cell at flat index `y * width + x`.
    pub fn cell(&self, index: usize) -> &[u32] {
        self.cells.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of cells covered by at least one face.
    pub fn covered_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }
}
