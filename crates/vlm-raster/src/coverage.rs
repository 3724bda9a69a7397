use crate::edge::dilated_triangle;

/// Binary pixel coverage buffer, row-major, row 0 first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coverage {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Coverage {
    /// Create an empty buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether pixel `(x, y)` is covered. Out-of-range pixels are not.
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[self.index(x, y)]
    }

    /// Mark pixel `(x, y)`. Out-of-range pixels are ignored.
    pub fn set(&mut self, x: u32, y: u32) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.data[i] = true;
        }
    }

    /// Number of covered pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&b| b)
    }

    /// Rasterize a pixel-space triangle with the conservative policy.
    pub fn add_triangle(&mut self, tri: &[[f32; 2]; 3]) {
        let (w, h) = (self.width, self.height);
        let mut marked = Vec::new();
        dilated_triangle(tri, w, h, |x, y| marked.push((x, y)));
        for (x, y) in marked {
            self.set(x, y);
        }
    }

    /// Square dilation: a pixel becomes covered when any pixel within
    /// `radius` on both axes is covered. The buffer size is unchanged.
    pub fn dilate(&self, radius: u32) -> Coverage {
        if radius == 0 || self.is_empty() {
            return self.clone();
        }
        let (w, h) = (self.width as usize, self.height as usize);
        let r = radius as usize;

        // Separable: horizontal pass then vertical pass.
        let mut horizontal = vec![false; w * h];
        for y in 0..h {
            let row = &self.data[y * w..(y + 1) * w];
            for x in 0..w {
                let lo = x.saturating_sub(r);
                let hi = (x + r).min(w - 1);
                horizontal[y * w + x] = row[lo..=hi].iter().any(|&b| b);
            }
        }
        let mut data = vec![false; w * h];
        for x in 0..w {
            for y in 0..h {
                let lo = y.saturating_sub(r);
                let hi = (y + r).min(h - 1);
                data[y * w + x] = (lo..=hi).any(|yy| horizontal[yy * w + x]);
            }
        }
        Coverage {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Covered pixels of each column as half-open `[start, end)` runs,
    /// ordered by `start`.
    pub fn column_spans(&self) -> Vec<Vec<(u32, u32)>> {
        (0..self.width)
            .map(|x| {
                let mut spans = Vec::new();
                let mut start = None;
                for y in 0..self.height {
                    match (self.get(x, y), start) {
                        (true, None) => start = Some(y),
                        (false, Some(s)) => {
                            spans.push((s, y));
                            start = None;
                        }
                        _ => {}
                    }
                }
                if let Some(s) = start {
                    spans.push((s, self.height));
                }
                spans
            })
            .collect()
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_out_of_range() {
        let mut c = Coverage::new(4, 3);
        c.set(10, 10);
        c.set(3, 2);
        assert!(c.get(3, 2));
        assert!(!c.get(10, 10));
        assert_eq!(c.count(), 1);
    }

    #[test]
    fn test_dilate_single_pixel() {
        let mut c = Coverage::new(9, 9);
        c.set(4, 4);
        let d = c.dilate(2);
        assert_eq!(d.count(), 25);
        assert!(d.get(2, 2));
        assert!(d.get(6, 6));
        assert!(!d.get(1, 4));
    }

    #[test]
    fn test_dilate_clamps_at_border() {
        let mut c = Coverage::new(5, 5);
        c.set(0, 0);
        let d = c.dilate(1);
        assert_eq!(d.count(), 4);
    }

    #[test]
    fn test_dilate_zero_is_identity() {
        let mut c = Coverage::new(3, 3);
        c.set(1, 1);
        assert_eq!(c.dilate(0), c);
    }

    #[test]
    fn test_column_spans() {
        let mut c = Coverage::new(2, 6);
        for y in [0, 1, 3, 5] {
            c.set(0, y);
        }
        let spans = c.column_spans();
        assert_eq!(spans[0], vec![(0, 2), (3, 4), (5, 6)]);
        assert!(spans[1].is_empty());
    }

    #[test]
    fn test_add_triangle_marks_pixels() {
        let mut c = Coverage::new(8, 8);
        c.add_triangle(&[[1.0, 1.0], [6.0, 1.0], [1.0, 6.0]]);
        assert!(c.get(1, 1));
        assert!(c.get(2, 2));
        assert!(!c.get(7, 7));
    }
}
