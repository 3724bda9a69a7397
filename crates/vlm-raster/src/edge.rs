/// Evaluate on which side of the directed edge `a -> b` the point `p` lies.
///
/// Positive on the left of the edge, so every interior point of a
/// counter-clockwise triangle gives a positive value for all three edges.
#[inline]
pub fn orient2d(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Integer flavour of [`orient2d`] used on snapped vertices.
#[inline]
fn orient2d_i(ax: i64, ay: i64, bx: i64, by: i64, x: i64, y: i64) -> i64 {
    (bx - ax) * (y - ay) - (by - ay) * (x - ax)
}

/// Inclusive pixel rectangle clipped to a `width x height` raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Bounds {
    /// Clip an inclusive integer box to the raster.
    ///
    /// Returns `None` when the box does not intersect `[0, width) x [0, height)`.
    pub fn clip(lo_x: i64, lo_y: i64, hi_x: i64, hi_y: i64, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let (w, h) = (width as i64, height as i64);
        if hi_x < 0 || hi_y < 0 || lo_x >= w || lo_y >= h || lo_x > hi_x || lo_y > hi_y {
            return None;
        }
        Some(Self {
            min_x: lo_x.clamp(0, w - 1) as u32,
            min_y: lo_y.clamp(0, h - 1) as u32,
            max_x: hi_x.clamp(0, w - 1) as u32,
            max_y: hi_y.clamp(0, h - 1) as u32,
        })
    }

    /// Pixel bounding box of a triangle, grown by `margin` pixels on every side.
    pub fn of_triangle(tri: &[[f32; 2]; 3], margin: i64, width: u32, height: u32) -> Option<Self> {
        let min_x = tri[0][0].min(tri[1][0]).min(tri[2][0]).floor() as i64;
        let min_y = tri[0][1].min(tri[1][1]).min(tri[2][1]).floor() as i64;
        let max_x = tri[0][0].max(tri[1][0]).max(tri[2][0]).floor() as i64;
        let max_y = tri[0][1].max(tri[1][1]).max(tri[2][1]).floor() as i64;
        Self::clip(
            min_x - margin,
            min_y - margin,
            max_x + margin,
            max_y + margin,
            width,
            height,
        )
    }

    /// Number of pixels inside the rectangle.
    pub fn area(&self) -> usize {
        (self.max_x - self.min_x + 1) as usize * (self.max_y - self.min_y + 1) as usize
    }
}

fn is_finite(tri: &[[f32; 2]; 3]) -> bool {
    tri.iter().all(|v| v[0].is_finite() && v[1].is_finite())
}

/// Rasterize a triangle with the plain pixel-center rule.
///
/// A pixel `(x, y)` is covered when its center `(x + 0.5, y + 0.5)` gives
/// edge function values of a consistent sign for the three edges (zero
/// included). Either winding is accepted. Zero-area and non-finite
/// triangles cover nothing.
///
/// Returns the number of pixels passed to `plot`.
pub fn fill_triangle<F>(tri: &[[f32; 2]; 3], width: u32, height: u32, mut plot: F) -> usize
where
    F: FnMut(u32, u32),
{
    if !is_finite(tri) {
        return 0;
    }
    let [a, b, c] = *tri;
    let area = orient2d(a, b, c);
    if area == 0.0 {
        return 0;
    }
    let Some(bounds) = Bounds::of_triangle(tri, 0, width, height) else {
        return 0;
    };
    let sign = area.signum();

    let mut count = 0;
    for y in bounds.min_y..=bounds.max_y {
        for x in bounds.min_x..=bounds.max_x {
            let p = [x as f32 + 0.5, y as f32 + 0.5];
            let w0 = orient2d(b, c, p) * sign;
            let w1 = orient2d(c, a, p) * sign;
            let w2 = orient2d(a, b, p) * sign;
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                plot(x, y);
                count += 1;
            }
        }
    }
    count
}

/// Rasterize a triangle conservatively (visibility-map policy).
///
/// Vertices are snapped to the pixel grid and each edge function is
/// compared against the negated edge length instead of zero, which keeps
/// every pixel lying within about one pixel of the triangle. The scan is
/// limited to the bounding box grown by one pixel. A triangle that covers
/// no pixel under that rule (zero area, sub-pixel) still marks the top-left
/// pixel of its clipped bounding box, so no face is ever lost. Triangles
/// entirely outside the raster, or with non-finite vertices, cover nothing.
///
/// Returns the number of pixels passed to `plot`.
pub fn dilated_triangle<F>(tri: &[[f32; 2]; 3], width: u32, height: u32, mut plot: F) -> usize
where
    F: FnMut(u32, u32),
{
    if !is_finite(tri) {
        return 0;
    }
    let snap = |v: [f32; 2]| (v[0].floor() as i64, v[1].floor() as i64);
    let (ax, ay) = snap(tri[0]);
    let (mut bx, mut by) = snap(tri[1]);
    let (mut cx, mut cy) = snap(tri[2]);
    // Normalize to counter-clockwise so the inside test is `>= -length`.
    if orient2d_i(ax, ay, bx, by, cx, cy) < 0 {
        std::mem::swap(&mut bx, &mut cx);
        std::mem::swap(&mut by, &mut cy);
    }

    let Some(bounds) = Bounds::clip(
        ax.min(bx).min(cx) - 1,
        ay.min(by).min(cy) - 1,
        ax.max(bx).max(cx) + 1,
        ay.max(by).max(cy) + 1,
        width,
        height,
    ) else {
        return 0;
    };

    let edge_len = |x0: i64, y0: i64, x1: i64, y1: i64| -> f64 {
        let (dx, dy) = ((x1 - x0) as f64, (y1 - y0) as f64);
        -(dx * dx + dy * dy).sqrt()
    };
    let lab = edge_len(ax, ay, bx, by);
    let lac = edge_len(ax, ay, cx, cy);
    let lbc = edge_len(bx, by, cx, cy);

    let (a01, b01) = (ay - by, bx - ax);
    let (a12, b12) = (by - cy, cx - bx);
    let (a20, b20) = (cy - ay, ax - cx);

    let (min_x, min_y) = (bounds.min_x as i64, bounds.min_y as i64);
    let mut w0_row = orient2d_i(bx, by, cx, cy, min_x, min_y);
    let mut w1_row = orient2d_i(cx, cy, ax, ay, min_x, min_y);
    let mut w2_row = orient2d_i(ax, ay, bx, by, min_x, min_y);

    let mut count = 0;
    for y in bounds.min_y..=bounds.max_y {
        let (mut w0, mut w1, mut w2) = (w0_row, w1_row, w2_row);
        for x in bounds.min_x..=bounds.max_x {
            if w0 as f64 >= lbc && w1 as f64 >= lac && w2 as f64 >= lab {
                plot(x, y);
                count += 1;
            }
            w0 += a12;
            w1 += a20;
            w2 += a01;
        }
        w0_row += b12;
        w1_row += b20;
        w2_row += b01;
    }

    if count == 0 {
        plot(bounds.min_x, bounds.min_y);
        count = 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_fill(tri: [[f32; 2]; 3], w: u32, h: u32) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        fill_triangle(&tri, w, h, |x, y| out.push((x, y)));
        out
    }

    fn collect_dilated(tri: [[f32; 2]; 3], w: u32, h: u32) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        dilated_triangle(&tri, w, h, |x, y| out.push((x, y)));
        out
    }

    #[test]
    fn test_orient2d_sign() {
        let a = [0.0, 0.0];
        let b = [4.0, 0.0];
        assert!(orient2d(a, b, [1.0, 1.0]) > 0.0);
        assert!(orient2d(a, b, [1.0, -1.0]) < 0.0);
        assert_eq!(orient2d(a, b, [2.0, 0.0]), 0.0);
    }

    #[test]
    fn test_bounds_outside_raster() {
        assert!(Bounds::clip(-5, -5, -1, -1, 8, 8).is_none());
        assert!(Bounds::clip(8, 0, 12, 4, 8, 8).is_none());
        let b = Bounds::clip(-2, -2, 20, 3, 8, 8).unwrap();
        assert_eq!(b, Bounds { min_x: 0, min_y: 0, max_x: 7, max_y: 3 });
        assert_eq!(b.area(), 32);
    }

    #[test]
    fn test_fill_right_triangle_count() {
        // Half of a 4x4 square: centers strictly below the diagonal plus the diagonal itself.
        let px = collect_fill([[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]], 8, 8);
        assert_eq!(px.len(), 10);
        assert!(px.contains(&(0, 0)));
        assert!(px.contains(&(3, 0)));
        assert!(!px.contains(&(3, 3)));
    }

    #[test]
    fn test_fill_winding_independent() {
        let ccw = collect_fill([[0.0, 0.0], [6.0, 0.0], [0.0, 6.0]], 8, 8);
        let cw = collect_fill([[0.0, 0.0], [0.0, 6.0], [6.0, 0.0]], 8, 8);
        assert_eq!(ccw, cw);
    }

    #[test]
    fn test_fill_degenerate_is_empty() {
        assert!(collect_fill([[0.0, 0.0], [4.0, 4.0], [2.0, 2.0]], 8, 8).is_empty());
        assert!(collect_fill([[f32::NAN, 0.0], [4.0, 0.0], [0.0, 4.0]], 8, 8).is_empty());
    }

    #[test]
    fn test_dilated_contains_plain_coverage() {
        let tri = [[1.0, 1.0], [7.0, 2.0], [3.0, 6.0]];
        let plain = collect_fill(tri, 10, 10);
        let dilated = collect_dilated(tri, 10, 10);
        for p in &plain {
            assert!(dilated.contains(p), "pixel {:?} lost by dilation", p);
        }
        assert!(dilated.len() > plain.len());
    }

    #[test]
    fn test_dilated_subpixel_marks_top_left() {
        let px = collect_dilated([[3.2, 4.1], [3.3, 4.1], [3.25, 4.2]], 8, 8);
        assert!(!px.is_empty());
    }

    #[test]
    fn test_dilated_zero_area_not_lost() {
        let px = collect_dilated([[5.0, 5.0], [5.0, 5.0], [5.0, 5.0]], 8, 8);
        assert!(px.contains(&(4, 4)));
    }

    #[test]
    fn test_dilated_outside_is_empty() {
        assert!(collect_dilated([[20.0, 20.0], [24.0, 20.0], [20.0, 24.0]], 8, 8).is_empty());
        assert!(collect_dilated([[-9.0, -9.0], [-6.0, -9.0], [-9.0, -6.0]], 8, 8).is_empty());
    }

    #[test]
    fn test_dilated_clockwise_same_as_ccw() {
        let ccw = collect_dilated([[1.0, 1.0], [6.0, 1.0], [1.0, 6.0]], 10, 10);
        let cw = collect_dilated([[1.0, 1.0], [1.0, 6.0], [6.0, 1.0]], 10, 10);
        assert_eq!(ccw.len(), cw.len());
    }
}
